//! Configuration Module
//!
//! Handles loading and managing proxy configuration from environment variables.

use std::env;
use std::path::PathBuf;

/// Default upper bound on a buffered request or response body (32 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

/// Proxy configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
/// The struct is built once at startup and shared read-only by every handler.
#[derive(Debug, Clone)]
pub struct Config {
    /// Environment tag, first segment of every storage key
    pub environment: String,
    /// Resource category tag, second segment of every storage key
    pub resource_type: String,
    /// Whether lookups and writes are performed at all
    pub cache_enabled: bool,
    /// Whether a miss falls back to approximate sibling matching
    pub fuzzy_matching: bool,
    /// Root directory of the on-disk store
    pub cache_dir: PathBuf,
    /// Origin every request is forwarded to on a miss
    pub upstream_url: String,
    /// HTTP server port
    pub server_port: u16,
    /// Request header carrying the client identifier
    pub client_id_header: String,
    /// Maximum buffered body size in bytes
    pub max_body_bytes: usize,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `PROXY_ENV` - Environment tag (default: LOCAL)
    /// - `PROXY_TYPE` - Resource type tag (default: API)
    /// - `CACHE_ENABLED` - Enable caching (default: true)
    /// - `FUZZY_MATCH` - Enable approximate lookup on miss (default: false)
    /// - `CACHE_DIR` - Store root directory (default: cache)
    /// - `UPSTREAM_URL` - Upstream origin (default: http://localhost:8080)
    /// - `SERVER_PORT` - HTTP server port (default: 9090)
    /// - `CLIENT_ID_HEADER` - Client identifier header (default: UUID)
    /// - `MAX_BODY_BYTES` - Body buffering limit (default: 32 MiB)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            environment: env::var("PROXY_ENV").unwrap_or(defaults.environment),
            resource_type: env::var("PROXY_TYPE").unwrap_or(defaults.resource_type),
            cache_enabled: env::var("CACHE_ENABLED")
                .ok()
                .and_then(|v| parse_bool(&v))
                .unwrap_or(defaults.cache_enabled),
            fuzzy_matching: env::var("FUZZY_MATCH")
                .ok()
                .and_then(|v| parse_bool(&v))
                .unwrap_or(defaults.fuzzy_matching),
            cache_dir: env::var("CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            upstream_url: env::var("UPSTREAM_URL").unwrap_or(defaults.upstream_url),
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.server_port),
            client_id_header: env::var("CLIENT_ID_HEADER").unwrap_or(defaults.client_id_header),
            max_body_bytes: env::var("MAX_BODY_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_body_bytes),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: "LOCAL".to_string(),
            resource_type: "API".to_string(),
            cache_enabled: true,
            fuzzy_matching: false,
            cache_dir: PathBuf::from("cache"),
            upstream_url: "http://localhost:8080".to_string(),
            server_port: 9090,
            client_id_header: "UUID".to_string(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.environment, "LOCAL");
        assert_eq!(config.resource_type, "API");
        assert!(config.cache_enabled);
        assert!(!config.fuzzy_matching);
        assert_eq!(config.server_port, 9090);
        assert_eq!(config.client_id_header, "UUID");
        assert_eq!(config.max_body_bytes, DEFAULT_MAX_BODY_BYTES);
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        for var in [
            "PROXY_ENV",
            "PROXY_TYPE",
            "CACHE_ENABLED",
            "FUZZY_MATCH",
            "CACHE_DIR",
            "UPSTREAM_URL",
            "SERVER_PORT",
            "CLIENT_ID_HEADER",
            "MAX_BODY_BYTES",
        ] {
            env::remove_var(var);
        }

        let config = Config::from_env();
        assert_eq!(config.environment, "LOCAL");
        assert_eq!(config.upstream_url, "http://localhost:8080");
        assert_eq!(config.cache_dir, PathBuf::from("cache"));
        assert!(config.cache_enabled);
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool(" off "), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
