//! Landing dispatch for browser-style requests.
//!
//! Hosts without a route label double as a web front door. Requests that
//! look like a browser visiting Docker Hub get a landing page, a configured
//! redirect, or the Hub web API instead of raw registry bytes. The page
//! contents are supplied by a [`LandingPage`] implementation.

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use reqwest::Client;
use url::Url;
use uuid::Uuid;

use crate::config::LandingConfig;
use crate::error::{ProxyError, Result};
use crate::http::response::into_axum_response;
use crate::routing::ProxyRequestContext;
use crate::security::HeaderRewritePolicy;

/// Host label that always gets landing treatment.
pub const DOCKER_LABEL: &str = "docker";

/// Landing value selecting the decoy page.
pub const DECOY_SENTINEL: &str = "nginx";

const BROWSER_PATH_FRAGMENTS: [&str; 9] = [
    "/_",
    "/r/",
    "/v2/repositories",
    "/v2/user",
    "/v2/orgs",
    "/v2/_catalog",
    "/v2/categories",
    "/v2/feature-flags",
    "source",
];

const BROWSER_EXACT_PATHS: [&str; 3] = ["/", "/favicon.ico", "/auth/profile"];

/// Presentation seam for HTML pages served by the proxy.
pub trait LandingPage: Send + Sync {
    /// Home page for `hostname`.
    fn home(&self, hostname: &str) -> Response;

    /// Decoy page shown to blocked crawlers.
    fn decoy(&self) -> Response;
}

/// Minimal built-in pages.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticLandingPage;

impl LandingPage for StaticLandingPage {
    fn home(&self, hostname: &str) -> Response {
        html(format!(
            "<!DOCTYPE html>\n<html><head><title>{host}</title></head><body>\
             <h1>Container registry mirror</h1>\
             <p><code>docker pull {host}/library/nginx:latest</code></p>\
             </body></html>\n",
            host = hostname
        ))
    }

    fn decoy(&self) -> Response {
        html(
            "<!DOCTYPE html>\n<html><head><title>Welcome to nginx!</title></head><body>\
             <h1>Welcome to nginx!</h1>\
             <p>If you see this page, the nginx web server is successfully installed and \
             working. Further configuration is required.</p>\
             </body></html>\n"
                .to_string(),
        )
    }
}

fn html(body: String) -> Response {
    (
        [(header::CONTENT_TYPE, "text/html; charset=UTF-8")],
        body,
    )
        .into_response()
}

/// What a landing request is answered with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LandingAction {
    /// 302 to the configured URL.
    Redirect(String),
    /// Decoy page.
    Decoy,
    /// Fetch the configured landing URL on behalf of the client.
    Fetch(String),
    /// Built-in home page.
    Home,
    /// Docker Hub web API passthrough.
    HubApi,
}

/// True when the first path segment is a v4 UUID.
fn starts_with_uuid(path: &str) -> bool {
    let first = path.trim_start_matches('/').split('/').next().unwrap_or_default();
    first.len() == 36
        && Uuid::parse_str(first)
            .map(|id| id.get_version_num() == 4 && id.get_variant() == uuid::Variant::RFC4122)
            .unwrap_or(false)
}

/// Paths a browser produces when visiting Docker Hub.
pub fn is_browser_path(path: &str) -> bool {
    starts_with_uuid(path)
        || BROWSER_PATH_FRAGMENTS.iter().any(|f| path.contains(f))
        || BROWSER_EXACT_PATHS.contains(&path)
}

/// Whether the request should get the landing experience.
pub fn wants_landing(ctx: &ProxyRequestContext) -> bool {
    (ctx.needs_landing_page || ctx.host_label == DOCKER_LABEL) && is_browser_path(&ctx.path)
}

/// Pick the landing answer for a path.
pub fn landing_action(config: &LandingConfig, path: &str) -> LandingAction {
    if let Some(url) = config.redirect_url.as_deref().filter(|u| !u.is_empty()) {
        return LandingAction::Redirect(url.to_string());
    }
    match config.url.as_deref().filter(|u| !u.is_empty()) {
        Some(url) if url.eq_ignore_ascii_case(DECOY_SENTINEL) => LandingAction::Decoy,
        Some(url) => LandingAction::Fetch(url.to_string()),
        None if path == "/" => LandingAction::Home,
        None => LandingAction::HubApi,
    }
}

/// 302 redirect.
pub fn redirect_to(url: &str) -> Response {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::FOUND;
    if let Ok(value) = HeaderValue::from_str(url) {
        response.headers_mut().insert(header::LOCATION, value);
    }
    response
}

/// Fetch the configured landing URL with the inbound method, headers and body.
pub async fn fetch_landing(
    client: &Client,
    url: &str,
    method: &Method,
    inbound: &HeaderMap,
    body: Bytes,
) -> Result<Response> {
    let url = Url::parse(url).map_err(|e| ProxyError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    let mut builder = client
        .request(method.clone(), url)
        .headers(HeaderRewritePolicy.redirect_request_headers(inbound));
    if !body.is_empty() {
        builder = builder.body(body);
    }
    Ok(into_axum_response(builder.send().await?))
}
