//! Header forwarding and response sanitization policy.
//!
//! # Responsibilities
//! - Allowlist of inbound headers forwarded to registries
//! - Denylist of security headers stripped from responses
//! - CORS and cache headers injected into responses
//!
//! # Design Decisions
//! - The policy is data: constant lists evaluated per request
//! - Token exchanges never carry `Authorization`
//! - Hop-by-hop headers never cross the proxy

use axum::http::{
    header::{self, HeaderName},
    HeaderMap, HeaderValue,
};

/// Inbound headers copied to every outbound registry request.
pub const FORWARDED_HEADERS: [HeaderName; 4] = [
    header::USER_AGENT,
    header::ACCEPT,
    header::ACCEPT_LANGUAGE,
    header::ACCEPT_ENCODING,
];

/// Headers removed from sanitized responses.
pub const STRIPPED_RESPONSE_HEADERS: [&str; 3] = [
    "content-security-policy",
    "content-security-policy-report-only",
    "clear-site-data",
];

/// Connection-scoped headers that must not be relayed.
pub const HOP_BY_HOP_HEADERS: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Cache lifetime advertised on redirect-followed responses.
pub const REDIRECT_CACHE_CONTROL: &str = "max-age=1500";

/// Diagnostic header used for redirect length mismatches.
pub const ERROR_HEADER: &str = "--error";

pub const PREFLIGHT_ALLOW_METHODS: &str = "GET,POST,PUT,PATCH,TRACE,DELETE,HEAD,OPTIONS";
pub const PREFLIGHT_MAX_AGE: &str = "1728000";

/// Fixed header sets applied at each stage.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderRewritePolicy;

impl HeaderRewritePolicy {
    /// Headers for an auth token request: allowlist only.
    pub fn token_request_headers(&self, inbound: &HeaderMap, host: &str) -> HeaderMap {
        self.outbound_headers(inbound, host, false)
    }

    /// Headers for a registry request: allowlist plus `Authorization`.
    pub fn upstream_request_headers(&self, inbound: &HeaderMap, host: &str) -> HeaderMap {
        self.outbound_headers(inbound, host, true)
    }

    fn outbound_headers(&self, inbound: &HeaderMap, host: &str, with_auth: bool) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(host) {
            headers.insert(header::HOST, value);
        }
        for name in FORWARDED_HEADERS.iter() {
            if let Some(value) = inbound.get(name) {
                headers.insert(name.clone(), value.clone());
            }
        }
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
        if with_auth {
            if let Some(value) = inbound.get(header::AUTHORIZATION) {
                headers.insert(header::AUTHORIZATION, value.clone());
            }
        }
        headers
    }

    /// Inbound headers relayed to a redirect target: everything except
    /// `Host` and hop-by-hop headers. The client recomputes `Content-Length`.
    pub fn redirect_request_headers(&self, inbound: &HeaderMap) -> HeaderMap {
        let mut headers = inbound.clone();
        headers.remove(header::HOST);
        headers.remove(header::CONTENT_LENGTH);
        strip_hop_by_hop(&mut headers);
        headers
    }

    /// Remove the security headers and add permissive CORS.
    pub fn sanitize(&self, headers: &mut HeaderMap) {
        for name in STRIPPED_RESPONSE_HEADERS {
            headers.remove(name);
        }
        headers.insert(
            header::ACCESS_CONTROL_EXPOSE_HEADERS,
            HeaderValue::from_static("*"),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        );
    }

    /// Full treatment for responses fetched through a redirect.
    pub fn sanitize_redirected(&self, headers: &mut HeaderMap) {
        self.sanitize(headers);
        headers.insert(
            header::CACHE_CONTROL,
            HeaderValue::from_static(REDIRECT_CACHE_CONTROL),
        );
    }

    /// Headers answering a CORS preflight.
    pub fn preflight_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(PREFLIGHT_ALLOW_METHODS),
        );
        headers.insert(
            header::ACCESS_CONTROL_MAX_AGE,
            HeaderValue::from_static(PREFLIGHT_MAX_AGE),
        );
        headers
    }
}

/// Drop connection-scoped headers in place.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP_HEADERS {
        headers.remove(name);
    }
}
