//! Cache Proxy - A caching layer in front of an HTTP reverse proxy
//!
//! Derives a deterministic storage key per request, serves repeated requests
//! from on-disk storage and invalidates entries on mutating requests.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod proxy;

pub use api::{create_router, AppState};
pub use config::Config;
pub use error::CacheError;
