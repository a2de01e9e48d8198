//! Bearer token relay.
//!
//! Token requests go straight to the auth server and the answer comes back
//! untouched: no header policy, no `WWW-Authenticate` rewriting.

use axum::body::Bytes;
use axum::http::{HeaderMap, Method};
use axum::response::Response;
use reqwest::Client;
use url::Url;

use crate::error::{ProxyError, Result};
use crate::http::response::into_axum_response;
use crate::routing::ProxyRequestContext;
use crate::security::HeaderRewritePolicy;

/// Auth server URL for a token request: base + original path + query.
pub fn token_url(auth_url: &Url, ctx: &ProxyRequestContext) -> Result<Url> {
    let raw = format!(
        "{}{}{}",
        auth_url.as_str().trim_end_matches('/'),
        ctx.path,
        ctx.query_suffix()
    );
    Url::parse(&raw).map_err(|e| ProxyError::InvalidUrl {
        url: raw.clone(),
        reason: e.to_string(),
    })
}

/// `host[:port]` of a URL, as sent in the `Host` header.
pub fn host_header(url: &Url) -> String {
    match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{}:{}", host, port),
        (Some(host), None) => host.to_string(),
        _ => String::new(),
    }
}

/// Forward a token request to the auth server and return its answer as is.
pub async fn relay_token_request(
    client: &Client,
    auth_url: &Url,
    ctx: &ProxyRequestContext,
    method: &Method,
    inbound: &HeaderMap,
    body: Bytes,
) -> Result<Response> {
    let url = token_url(auth_url, ctx)?;
    let headers = HeaderRewritePolicy.token_request_headers(inbound, &host_header(&url));

    tracing::debug!(url = %url, "Relaying token request");

    let mut builder = client.request(method.clone(), url).headers(headers);
    if !body.is_empty() {
        builder = builder.body(body);
    }
    let response = builder.send().await?;
    Ok(into_axum_response(response))
}
