//! Per-request routing context.
//!
//! Everything later stages need to know about a request's destination is
//! computed once here and threaded through explicitly. Nothing in this
//! module touches shared state.

use axum::http::{header, HeaderMap, Uri};
use url::form_urlencoded;

use crate::routing::path::{is_v2_image_path, normalize_path, repair_encoded_query};
use crate::routing::router::RouteTable;

/// Query parameter selecting an explicit upstream registry.
pub const NS_PARAM: &str = "ns";

/// Query parameter overriding the host used for label routing.
pub const HUBHOST_PARAM: &str = "hubhost";

/// Routing decisions for a single inbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyRequestContext {
    /// Inbound URL as seen by the client, after query repair.
    pub original_url: String,
    /// Request host name without port.
    pub hostname: String,
    /// First DNS label used for routing.
    pub host_label: String,
    pub resolved_upstream_host: String,
    /// Route name that matched: table label, `ns` or `default`.
    pub route: String,
    pub needs_landing_page: bool,
    pub is_token_request: bool,
    pub is_v2_image_path: bool,
    /// Inbound path, untouched.
    pub path: String,
    /// Path sent to the registry (implicit namespace applied).
    pub upstream_path: String,
    /// Raw query string after `%3A` repair.
    pub query: Option<String>,
    /// `https://<hostname>`, the proxy's public base URL.
    pub public_base_url: String,
}

impl ProxyRequestContext {
    /// Resolve a request against the route table.
    pub fn resolve(uri: &Uri, headers: &HeaderMap, routes: &RouteTable) -> Self {
        let query = uri.query().map(|q| repair_encoded_query(q).unwrap_or_else(|| q.to_string()));
        if let (Some(before), Some(after)) = (uri.query(), query.as_deref()) {
            if before != after {
                tracing::debug!(query = %after, "Repaired encoded image reference");
            }
        }

        let hostname = request_hostname(uri, headers);
        let (ns, hubhost) = routing_params(query.as_deref());

        let routing_host = hubhost.as_deref().unwrap_or(&hostname);
        let host_label = routing_host.split('.').next().unwrap_or_default().to_string();

        let resolution = routes.resolve(ns.as_deref(), &host_label);

        let path = uri.path().to_string();
        let upstream_path = normalize_path(
            &path,
            &resolution.upstream_host,
            routes.default_registry(),
        );

        let original_url = match &query {
            Some(q) => format!("https://{}{}?{}", hostname, path, q),
            None => format!("https://{}{}", hostname, path),
        };

        Self {
            original_url,
            public_base_url: format!("https://{}", hostname),
            hostname,
            host_label,
            needs_landing_page: resolution.needs_landing_page,
            resolved_upstream_host: resolution.upstream_host,
            route: resolution.route,
            is_token_request: path.contains("/token"),
            is_v2_image_path: is_v2_image_path(&path),
            path,
            upstream_path,
            query,
        }
    }

    /// `?query` suffix, or empty.
    pub fn query_suffix(&self) -> String {
        self.query
            .as_deref()
            .map(|q| format!("?{}", q))
            .unwrap_or_default()
    }
}

fn routing_params(query: Option<&str>) -> (Option<String>, Option<String>) {
    let mut ns = None;
    let mut hubhost = None;
    if let Some(query) = query {
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                NS_PARAM if ns.is_none() => ns = Some(value.into_owned()),
                HUBHOST_PARAM if hubhost.is_none() && !value.is_empty() => {
                    hubhost = Some(value.into_owned())
                }
                _ => {}
            }
        }
    }
    (ns, hubhost)
}

/// Host name of the request, without port.
fn request_hostname(uri: &Uri, headers: &HeaderMap) -> String {
    let authority = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
        .or_else(|| uri.host().map(str::to_string))
        .unwrap_or_else(|| "localhost".to_string());
    strip_port(&authority).to_string()
}

fn strip_port(authority: &str) -> &str {
    if authority.starts_with('[') {
        // IPv6 literal
        return match authority.find(']') {
            Some(end) => &authority[..=end],
            None => authority,
        };
    }
    match authority.rsplit_once(':') {
        Some((host, port)) if port.chars().all(|c| c.is_ascii_digit()) => host,
        _ => authority,
    }
}
