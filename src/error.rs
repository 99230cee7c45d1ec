//! Error types for the caching proxy
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Unified error type for the caching proxy.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Storage key cannot be resolved below the cache root
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    /// Storage backend I/O failure
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// Upstream origin could not be reached or returned an unreadable response
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Inbound request could not be buffered
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Inbound request body exceeds the buffering limit
    #[error("Request body too large: limit is {limit} bytes")]
    PayloadTooLarge { limit: usize },

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::InvalidKey(_) | CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            CacheError::Upstream(_) => StatusCode::BAD_GATEWAY,
            CacheError::Storage(_) | CacheError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the caching proxy.
pub type Result<T> = std::result::Result<T, CacheError>;
