//! Outbound registry request construction.
//!
//! # Responsibilities
//! - Point the request at the resolved registry and normalized path
//! - Forward the header allowlist plus `Authorization`
//! - Carry the advisory cache hint
//!
//! # Design Decisions
//! - Exactly one outbound request per inbound request, no retries
//! - Redirects are left to the response rewriter

use std::time::Duration;

use axum::body::Bytes;
use axum::http::{HeaderMap, Method};
use reqwest::Client;
use url::Url;

use crate::error::{ProxyError, Result};
use crate::routing::ProxyRequestContext;
use crate::security::HeaderRewritePolicy;

/// Advisory cache lifetime for registry responses.
pub const UPSTREAM_CACHE_TTL: Duration = Duration::from_secs(3600);

/// A fully built registry request, ready to send.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Hint for a caching layer below the proxy. Nothing here caches.
    pub cache_ttl: Duration,
}

impl UpstreamRequest {
    /// Build the registry request for a resolved context.
    pub fn build(
        ctx: &ProxyRequestContext,
        scheme: &str,
        method: &Method,
        inbound: &HeaderMap,
        body: Bytes,
    ) -> Result<Self> {
        let raw = format!(
            "{}://{}{}{}",
            scheme,
            ctx.resolved_upstream_host,
            ctx.upstream_path,
            ctx.query_suffix()
        );
        let url = Url::parse(&raw).map_err(|e| ProxyError::InvalidUrl {
            url: raw.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            method: method.clone(),
            headers: HeaderRewritePolicy.upstream_request_headers(inbound, &ctx.resolved_upstream_host),
            url,
            body,
            cache_ttl: UPSTREAM_CACHE_TTL,
        })
    }

    /// Issue the request once.
    pub async fn send(self, client: &Client) -> Result<reqwest::Response> {
        tracing::debug!(
            method = %self.method,
            url = %self.url,
            cache_ttl_secs = self.cache_ttl.as_secs(),
            "Forwarding to registry"
        );

        let mut builder = client
            .request(self.method, self.url)
            .headers(self.headers);
        if !self.body.is_empty() {
            builder = builder.body(self.body);
        }
        Ok(builder.send().await?)
    }
}
