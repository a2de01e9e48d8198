//! Docker Hub web API passthrough.
//!
//! Browser-style paths on landing hosts (`/v2/repositories`, `/_/...`,
//! `/r/...`) are served from the Docker Hub web API rather than the
//! registry.

use axum::body::Bytes;
use axum::http::{header, HeaderMap, HeaderValue, Method};
use axum::response::Response;
use reqwest::Client;
use url::Url;

use crate::error::{ProxyError, Result};
use crate::http::response::into_axum_response;
use crate::proxy::token::host_header;
use crate::routing::ProxyRequestContext;
use crate::security::headers::strip_hop_by_hop;

/// Hub API URL for the request: base + path + query.
pub fn hub_url(hub_api_url: &Url, ctx: &ProxyRequestContext) -> Result<Url> {
    let raw = format!(
        "{}{}{}",
        hub_api_url.as_str().trim_end_matches('/'),
        ctx.path,
        ctx.query_suffix()
    );
    Url::parse(&raw).map_err(|e| ProxyError::InvalidUrl {
        url: raw.clone(),
        reason: e.to_string(),
    })
}

/// Forward the request to the Hub web API with its headers, `Host` replaced.
pub async fn proxy_hub_api(
    client: &Client,
    hub_api_url: &Url,
    ctx: &ProxyRequestContext,
    method: &Method,
    inbound: &HeaderMap,
    body: Bytes,
) -> Result<Response> {
    let url = hub_url(hub_api_url, ctx)?;

    let mut headers = inbound.clone();
    strip_hop_by_hop(&mut headers);
    headers.remove(header::CONTENT_LENGTH);
    if let Ok(host) = HeaderValue::from_str(&host_header(&url)) {
        headers.insert(header::HOST, host);
    }

    tracing::debug!(url = %url, "Proxying to Docker Hub web API");

    let mut builder = client.request(method.clone(), url).headers(headers);
    if method != Method::GET && method != Method::HEAD {
        builder = builder.body(body);
    }
    let response = builder.send().await.map_err(ProxyError::HubApi)?;
    Ok(into_axum_response(response))
}
