//! Response models for the proxy's own endpoints
//!
//! Proxied traffic is passed through untouched; these DTOs only cover the
//! admin routes and error bodies.

pub mod responses;

// Re-export commonly used types
pub use responses::{ErrorResponse, HealthResponse, StatsResponse};
