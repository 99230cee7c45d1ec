//! API Module
//!
//! HTTP handlers and routing for the caching proxy.
//!
//! # Endpoints
//! - `GET /__cache/health` - Health check endpoint
//! - `GET /__cache/stats` - Cache statistics
//! - everything else - cached proxy to the upstream origin

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::{create_router, ADMIN_PREFIX};
