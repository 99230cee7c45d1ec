//! Response DTOs for the admin endpoints
//!
//! Defines the structure of outgoing JSON bodies the proxy produces itself.

use serde::Serialize;

use crate::cache::CacheStats;

/// Response body for the stats endpoint (GET /__cache/stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Exact-key hits
    pub hits: u64,
    /// Approximate-match hits
    pub fuzzy_hits: u64,
    /// Lookups forwarded upstream
    pub misses: u64,
    /// Entries written
    pub writes: u64,
    /// Entries removed by mutating requests
    pub invalidations: u64,
    /// Failed storage operations
    pub storage_errors: u64,
    /// Failed upstream calls
    pub upstream_errors: u64,
    /// Hit rate ((hits + fuzzy_hits) / lookups)
    pub hit_rate: f64,
    /// Whether caching is enabled
    pub cache_enabled: bool,
}

impl StatsResponse {
    /// Creates a new StatsResponse from cache statistics
    pub fn new(stats: &CacheStats, cache_enabled: bool) -> Self {
        Self {
            hits: stats.hits,
            fuzzy_hits: stats.fuzzy_hits,
            misses: stats.misses,
            writes: stats.writes,
            invalidations: stats.invalidations,
            storage_errors: stats.storage_errors,
            upstream_errors: stats.upstream_errors,
            hit_rate: stats.hit_rate(),
            cache_enabled,
        }
    }
}

/// Response body for the health endpoint (GET /__cache/health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_response_hit_rate() {
        let stats = CacheStats {
            hits: 60,
            fuzzy_hits: 20,
            misses: 20,
            ..CacheStats::default()
        };
        let resp = StatsResponse::new(&stats, true);
        assert!((resp.hit_rate - 0.8).abs() < 0.001);
        assert!(resp.cache_enabled);
    }

    #[test]
    fn test_stats_response_zero_requests() {
        let resp = StatsResponse::new(&CacheStats::default(), false);
        assert_eq!(resp.hit_rate, 0.0);
    }

    #[test]
    fn test_health_response_serialize() {
        let resp = HealthResponse::healthy();
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
    }

    #[test]
    fn test_error_response_serialize() {
        let resp = ErrorResponse::new("upstream unreachable");
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("error"));
        assert!(json.contains("upstream unreachable"));
    }
}
