//! Upstream Transport
//!
//! Forwards a buffered request to a fixed upstream origin.

use std::time::Duration;

use async_trait::async_trait;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use bytes::Bytes;
use reqwest::{redirect, Url};
use tracing::debug;

use crate::error::{CacheError, Result};

/// Headers that describe a single connection and are never forwarded.
pub const HOP_BY_HOP_HEADERS: [&str; 9] = [
    "connection",
    "keep-alive",
    "proxy-connection",
    "transfer-encoding",
    "te",
    "trailer",
    "upgrade",
    "host",
    "content-length",
];

/// Copies `headers` without the hop-by-hop set.
pub fn strip_hop_by_hop(headers: &HeaderMap) -> HeaderMap {
    let mut forwarded = headers.clone();
    for name in HOP_BY_HOP_HEADERS {
        forwarded.remove(name);
    }
    forwarded
}

/// Headers for the outbound request.
///
/// Drops the hop-by-hop set and `Accept-Encoding`, so the upstream answers
/// with an identity body that can be stored and replayed without its
/// `Content-Encoding`.
pub fn outbound_headers(headers: &HeaderMap) -> HeaderMap {
    let mut forwarded = strip_hop_by_hop(headers);
    forwarded.remove(header::ACCEPT_ENCODING);
    forwarded
}

// == Upstream Request ==
/// A fully buffered inbound request, ready to forward.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl UpstreamRequest {
    /// Path plus query of the inbound URI, `/` when absent.
    pub fn path_and_query(&self) -> &str {
        self.uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/")
    }
}

// == Upstream Response ==
/// A fully buffered upstream response.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl UpstreamResponse {
    /// Value of `name` if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Declared media type, empty when absent.
    pub fn content_type(&self) -> &str {
        self.header(header::CONTENT_TYPE.as_str()).unwrap_or_default()
    }
}

// == Proxy Transport Trait ==
/// Forwards requests to the upstream origin.
#[async_trait]
pub trait ProxyTransport: Send + Sync {
    async fn forward(&self, request: UpstreamRequest) -> Result<UpstreamResponse>;
}

// == Reqwest Transport ==
/// HTTP transport backed by a pooled reqwest client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    upstream: Url,
}

impl ReqwestTransport {
    /// Creates a transport for `upstream_url` (`http` or `https`).
    pub fn new(upstream_url: &str) -> Result<Self> {
        let upstream = Url::parse(upstream_url)
            .map_err(|err| CacheError::Upstream(format!("invalid upstream url {}: {}", upstream_url, err)))?;
        if !matches!(upstream.scheme(), "http" | "https") {
            return Err(CacheError::Upstream(format!(
                "unsupported upstream scheme: {}",
                upstream.scheme()
            )));
        }

        let client = reqwest::Client::builder()
            .redirect(redirect::Policy::none())
            .connect_timeout(Duration::from_secs(30))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|err| CacheError::Upstream(err.to_string()))?;

        Ok(Self { client, upstream })
    }

    /// Absolute upstream URL for an inbound path and query.
    pub fn target_url(&self, path_and_query: &str) -> String {
        let base = self.upstream.as_str().trim_end_matches('/');
        format!("{}{}", base, path_and_query)
    }
}

#[async_trait]
impl ProxyTransport for ReqwestTransport {
    async fn forward(&self, request: UpstreamRequest) -> Result<UpstreamResponse> {
        let url = self.target_url(request.path_and_query());
        debug!("Forwarding {} {}", request.method, url);

        let response = self
            .client
            .request(request.method, &url)
            .headers(outbound_headers(&request.headers))
            .body(request.body)
            .send()
            .await
            .map_err(|err| CacheError::Upstream(err.to_string()))?;

        let status = response.status();
        let headers = strip_hop_by_hop(response.headers());
        let body = response
            .bytes()
            .await
            .map_err(|err| CacheError::Upstream(err.to_string()))?;

        Ok(UpstreamResponse {
            status,
            headers,
            body,
        })
    }
}
