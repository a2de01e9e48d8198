//! Response handling and transformation.
//!
//! # Responsibilities
//! - Convert upstream responses into streamed client responses
//! - Point `WWW-Authenticate` realms at the proxy instead of the auth server
//! - Follow `Location` redirects through the proxy
//! - Apply the response header policy
//!
//! # Design Decisions
//! - Streaming responses avoid buffering entire body
//! - Hop-by-hop headers stripped automatically
//! - Token responses never pass through here

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::Response;
use reqwest::Client;

use crate::config::HeaderPolicyMode;
use crate::error::Result;
use crate::proxy::redirect::follow_redirect;
use crate::routing::ProxyRequestContext;
use crate::security::headers::strip_hop_by_hop;
use crate::security::HeaderRewritePolicy;

/// Split an upstream response into status, relayable headers and a streamed body.
pub fn into_axum_parts(upstream: reqwest::Response) -> (StatusCode, HeaderMap, Body) {
    let status = upstream.status();
    let mut headers = upstream.headers().clone();
    strip_hop_by_hop(&mut headers);
    let body = Body::from_stream(upstream.bytes_stream());
    (status, headers, body)
}

/// Relay an upstream response without changing anything but hop-by-hop headers.
pub fn into_axum_response(upstream: reqwest::Response) -> Response {
    let (status, headers, body) = into_axum_parts(upstream);
    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

/// Replace every occurrence of `auth_url` in each `WWW-Authenticate` value.
pub fn rewrite_www_authenticate(headers: &mut HeaderMap, auth_url: &str, public_base_url: &str) {
    if auth_url.is_empty() {
        return;
    }
    let rewritten: Vec<HeaderValue> = headers
        .get_all(header::WWW_AUTHENTICATE)
        .iter()
        .map(|value| match value.to_str() {
            Ok(text) if text.contains(auth_url) => {
                HeaderValue::from_str(&text.replace(auth_url, public_base_url))
                    .unwrap_or_else(|_| value.clone())
            }
            _ => value.clone(),
        })
        .collect();

    if rewritten.is_empty() {
        return;
    }
    headers.remove(header::WWW_AUTHENTICATE);
    for value in rewritten {
        headers.append(header::WWW_AUTHENTICATE, value);
    }
}

/// Post-processes registry responses for the client.
#[derive(Debug, Clone)]
pub struct ResponseRewriter<'a> {
    /// Client used for the second hop of a redirect.
    pub client: &'a Client,
    /// Auth server base URL as it appears in `WWW-Authenticate`.
    pub auth_url: &'a str,
    pub mode: HeaderPolicyMode,
}

impl ResponseRewriter<'_> {
    /// Rewrite a registry response.
    ///
    /// The inbound method, headers and body are needed when a `Location`
    /// forces a second fetch.
    pub async fn rewrite_response(
        &self,
        ctx: &ProxyRequestContext,
        upstream: reqwest::Response,
        method: &Method,
        inbound: &HeaderMap,
        body: Bytes,
    ) -> Result<Response> {
        let location = upstream
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|loc| upstream.url().join(loc).ok());

        if let Some(location) = location {
            tracing::debug!(
                status = %upstream.status(),
                location = %location,
                "Upstream redirected"
            );
            return follow_redirect(self.client, method, inbound, body, location, None).await;
        }

        let mut response = into_axum_response(upstream);
        rewrite_www_authenticate(response.headers_mut(), self.auth_url, &ctx.public_base_url);
        self.apply_policy(response.headers_mut());
        Ok(response)
    }

    /// Sanitize a directly relayed response according to the mode.
    pub fn apply_policy(&self, headers: &mut HeaderMap) {
        apply_policy(self.mode, headers);
    }
}

/// Header policy for responses that did not go through a redirect.
pub fn apply_policy(mode: HeaderPolicyMode, headers: &mut HeaderMap) {
    if mode == HeaderPolicyMode::Uniform {
        HeaderRewritePolicy.sanitize(headers);
    }
}
