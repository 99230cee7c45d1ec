//! Proxy Module
//!
//! The upstream transport the cache wraps. The router only needs
//! `forward(request) -> response`; dialing and pooling live behind it.

mod transport;

pub use transport::{
    outbound_headers, strip_hop_by_hop, ProxyTransport, ReqwestTransport, UpstreamRequest, UpstreamResponse,
    HOP_BY_HOP_HEADERS,
};
