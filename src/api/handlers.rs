//! API Handlers
//!
//! The caching proxy handler that every non-admin request falls through to,
//! plus the admin health and stats handlers.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use http_body_util::LengthLimitError;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::cache::{CacheEntry, CacheStore, FormatTag, MatchKind, StorageKey};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{HealthResponse, StatsResponse};
use crate::proxy::{ProxyTransport, ReqwestTransport, UpstreamRequest, UpstreamResponse};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Startup configuration
    pub config: Arc<Config>,
    /// On-disk response store
    pub cache: Arc<CacheStore>,
    /// Upstream transport
    pub proxy: Arc<dyn ProxyTransport>,
}

impl AppState {
    /// Creates a new AppState from its parts.
    pub fn new(config: Config, cache: CacheStore, proxy: Arc<dyn ProxyTransport>) -> Self {
        Self {
            config: Arc::new(config),
            cache: Arc::new(cache),
            proxy,
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Opens the store under `cache_dir` and a reqwest transport to `upstream_url`.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let cache = CacheStore::open(&config.cache_dir).await?;
        let proxy = ReqwestTransport::new(&config.upstream_url)?;
        Ok(Self::new(config.clone(), cache, Arc::new(proxy)))
    }
}

/// True for methods with create/replace semantics.
pub fn is_mutating(method: &Method) -> bool {
    *method == Method::POST || *method == Method::PUT
}

/// Fallback handler for every proxied request.
///
/// Builds the storage key, then:
/// - mutating methods invalidate the key before forwarding;
/// - other methods try the store (exact, then fuzzy if enabled) and are
///   served from it on a hit;
/// - on a miss the request is forwarded and the upstream body is written to
///   the store before being returned unchanged.
///
/// Storage failures are logged and never block the proxied response.
pub async fn proxy_handler(State(state): State<AppState>, request: Request) -> Result<Response> {
    let (parts, body) = request.into_parts();

    let client_id = parts
        .headers
        .get(state.config.client_id_header.as_str())
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    let key = StorageKey::build(
        &state.config,
        parts.method.as_str(),
        client_id,
        parts.uri.path(),
        parts.uri.query(),
    );
    debug!(key = %key, "Cache key built");

    if is_mutating(&parts.method) {
        let cache = state.cache.clone();
        let task_key = key.clone();
        let task = tokio::spawn(async move { cache.invalidate(&task_key).await.map(|_| ()) });
        settle(&state, "invalidate", &key, task).await;
    } else if state.config.cache_enabled {
        match state.cache.lookup(&key, state.config.fuzzy_matching).await {
            Ok(Some(entry)) => return Ok(serve_cached(&key, entry)),
            Ok(None) => debug!(key = %key, "Cache miss"),
            Err(err) => {
                state.cache.counters().record_storage_error();
                warn!(key = %key, error = %err, "Cache lookup failed, forwarding upstream");
            }
        }
    }

    let limit = state.config.max_body_bytes;
    let body = axum::body::to_bytes(body, limit)
        .await
        .map_err(|err| body_error(err, limit))?;

    let upstream = match state
        .proxy
        .forward(UpstreamRequest {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body,
        })
        .await
    {
        Ok(upstream) => upstream,
        Err(err) => {
            state.cache.counters().record_upstream_error();
            error!(key = %key, error = %err, "Upstream request failed");
            return Err(err);
        }
    };

    if state.config.cache_enabled {
        let format = FormatTag::classify(upstream.content_type());
        let cache = state.cache.clone();
        let task_key = key.clone();
        let body = upstream.body.clone();
        let task = tokio::spawn(async move { cache.put(&task_key, format, body).await });
        settle(&state, "write", &key, task).await;
    }

    Ok(into_response(upstream))
}

/// Awaits a storage task spawned off the request.
///
/// The task owns its work, so it runs to completion even if this handler is
/// dropped when the client disconnects.
async fn settle(state: &AppState, operation: &str, key: &StorageKey, task: JoinHandle<Result<()>>) {
    let outcome = task
        .await
        .unwrap_or_else(|err| Err(CacheError::Internal(format!("storage task failed: {}", err))));

    if let Err(err) = outcome {
        state.cache.counters().record_storage_error();
        warn!(key = %key, error = %err, "Cache {} failed, continuing without cache", operation);
    }
}

/// Maps a buffering failure to 413 when the length limit tripped, 400 otherwise.
fn body_error(err: axum::Error, limit: usize) -> CacheError {
    let mut cause: Option<&(dyn std::error::Error + 'static)> = Some(&err);
    while let Some(current) = cause {
        if current.is::<LengthLimitError>() {
            return CacheError::PayloadTooLarge { limit };
        }
        cause = current.source();
    }
    CacheError::InvalidRequest(format!("unreadable request body: {}", err))
}

fn serve_cached(key: &StorageKey, entry: CacheEntry) -> Response {
    match entry.matched {
        MatchKind::Exact => info!(key = %key, path = %entry.path, "Served from cache"),
        MatchKind::Fuzzy { ratio } => {
            info!(key = %key, path = %entry.path, ratio, "Served from cache (fuzzy match)")
        }
    }

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, entry.content_type())],
        entry.body,
    )
        .into_response()
}

fn into_response(upstream: UpstreamResponse) -> Response {
    let mut response = Response::new(Body::from(upstream.body));
    *response.status_mut() = upstream.status;
    *response.headers_mut() = upstream.headers;
    response
}

/// Handler for GET /__cache/stats
///
/// Returns current cache statistics.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.cache.stats();
    Json(StatsResponse::new(&stats, state.config.cache_enabled))
}

/// Handler for GET /__cache/health
///
/// Returns health status of the proxy.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
