//! API Routes
//!
//! Configures the Axum router: admin endpoints under `/__cache`, everything
//! else through the caching proxy handler.

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use super::handlers::{health_handler, proxy_handler, stats_handler, AppState};

/// Path prefix reserved for the proxy's own endpoints; never forwarded.
pub const ADMIN_PREFIX: &str = "/__cache";

/// Creates the main router.
///
/// # Endpoints
/// - `GET /__cache/health` - Health check endpoint
/// - `GET /__cache/stats` - Cache statistics
/// - any other method and path - cached proxy to the upstream
///
/// # Middleware
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route(&format!("{}/health", ADMIN_PREFIX), get(health_handler))
        .route(&format!("{}/stats", ADMIN_PREFIX), get(stats_handler))
        .fallback(proxy_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheStore;
    use crate::config::Config;
    use crate::error::{CacheError, Result};
    use crate::proxy::{ProxyTransport, UpstreamRequest, UpstreamResponse};
    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use std::sync::Arc;
    use tempfile::TempDir;
    use tower::util::ServiceExt;

    struct DownUpstream;

    #[async_trait]
    impl ProxyTransport for DownUpstream {
        async fn forward(&self, _request: UpstreamRequest) -> Result<UpstreamResponse> {
            Err(CacheError::Upstream("connection refused".to_string()))
        }
    }

    async fn create_test_app(dir: &TempDir) -> Router {
        let config = Config {
            cache_dir: dir.path().to_path_buf(),
            ..Config::default()
        };
        let cache = CacheStore::open(dir.path()).await.unwrap();
        create_router(AppState::new(config, cache, Arc::new(DownUpstream)))
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let dir = TempDir::new().unwrap();
        let app = create_test_app(&dir).await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/__cache/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_stats_endpoint() {
        let dir = TempDir::new().unwrap();
        let app = create_test_app(&dir).await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/__cache/stats")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_bad_gateway() {
        let dir = TempDir::new().unwrap();
        let app = create_test_app(&dir).await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/anything?x=1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
