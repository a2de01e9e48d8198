//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the catch-all proxy handler
//! - Wire up middleware (request ID, tracing, panic recovery)
//! - Apply the response header policy to everything but relayed tokens
//! - Resolve each request to a registry and dispatch to the proxy stages
//! - Graceful shutdown

use std::any::Any;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{request::Parts, Request},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use url::Url;

use crate::config::{HeaderPolicyMode, ProxyConfig};
use crate::error::{plain_text, ProxyError, StartupError, UNAVAILABLE_MESSAGE};
use crate::http::request::{
    propagate_request_id_layer, read_body, request_id, set_request_id_layer,
};
use crate::http::response::{apply_policy, ResponseRewriter};
use crate::observability::metrics;
use crate::proxy::landing::{self, LandingAction, LandingPage, StaticLandingPage};
use crate::proxy::{hub, token, UpstreamClients, UpstreamRequest};
use crate::routing::{ProxyRequestContext, RouteTable};
use crate::security::UserAgentBlocklist;

/// Application state injected into handlers. Read-only after startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ProxyConfig>,
    pub routes: Arc<RouteTable>,
    pub clients: UpstreamClients,
    pub blocklist: Arc<UserAgentBlocklist>,
    pub landing_page: Arc<dyn LandingPage>,
    pub auth_url: Arc<Url>,
    pub hub_api_url: Arc<Url>,
}

impl AppState {
    pub fn new(config: ProxyConfig, landing_page: Arc<dyn LandingPage>) -> Result<Self, StartupError> {
        let auth_url = Url::parse(&config.upstream.auth_url).map_err(|source| {
            StartupError::InvalidUrl {
                field: "upstream.auth_url",
                source,
            }
        })?;
        let hub_api_url = Url::parse(&config.upstream.hub_api_url).map_err(|source| {
            StartupError::InvalidUrl {
                field: "upstream.hub_api_url",
                source,
            }
        })?;

        let blocklist = UserAgentBlocklist::new(&config.security.blocked_user_agents);
        tracing::info!(
            routes = config.upstream.routes.len(),
            default_registry = %config.upstream.default_registry,
            blocked_agents = blocklist.entries().len(),
            "Routing state initialized"
        );

        Ok(Self {
            routes: Arc::new(RouteTable::from_config(&config.upstream)),
            clients: UpstreamClients::new(&config.timeouts)?,
            blocklist: Arc::new(blocklist),
            landing_page,
            auth_url: Arc::new(auth_url),
            hub_api_url: Arc::new(hub_api_url),
            config: Arc::new(config),
        })
    }

    /// Response rewriter bound to this state.
    fn rewriter(&self) -> ResponseRewriter<'_> {
        ResponseRewriter {
            client: &self.clients.following,
            auth_url: self.config.upstream.auth_url.trim_end_matches('/'),
            mode: self.config.security.header_policy,
        }
    }
}

/// HTTP server for the registry proxy.
pub struct HttpServer {
    router: Router,
    config: Arc<ProxyConfig>,
}

impl HttpServer {
    /// Create a new HTTP server with the built-in landing pages.
    pub fn new(config: ProxyConfig) -> Result<Self, StartupError> {
        Self::with_landing_page(config, Arc::new(StaticLandingPage))
    }

    /// Create a server whose HTML pages come from `landing_page`.
    pub fn with_landing_page(
        config: ProxyConfig,
        landing_page: Arc<dyn LandingPage>,
    ) -> Result<Self, StartupError> {
        let state = AppState::new(config, landing_page)?;
        let config = state.config.clone();
        let router = Self::build_router(state);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Deadlines live on the outbound clients, so a stalled registry
    /// surfaces as a 502 from the handler rather than a server-side timeout.
    fn build_router(state: AppState) -> Router {
        let mode = state.config.security.header_policy;
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(set_request_id_layer())
                    .layer(TraceLayer::new_for_http())
                    .layer(propagate_request_id_layer())
                    .layer(CatchPanicLayer::custom(move |err: Box<dyn Any + Send + 'static>| {
                        panic_response(mode, err)
                    })),
            )
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// The fully layered router, for embedding.
    pub fn into_router(self) -> Router {
        self.router
    }
}

/// Converts a handler panic into the generic 503.
fn panic_response(mode: HeaderPolicyMode, err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = %detail, "Request handler panicked");
    let mut response = plain_text(
        axum::http::StatusCode::SERVICE_UNAVAILABLE,
        UNAVAILABLE_MESSAGE,
    );
    apply_policy(mode, response.headers_mut());
    response
}

/// How a dispatched response is finished.
enum Outcome {
    /// Auth server answer, passed through untouched.
    Relayed(Response),
    /// Anything produced or fetched by the proxy; gets the header policy.
    Proxied(Response),
}

/// Main proxy handler.
/// Resolves the registry, then hands off to the matching proxy stage.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let (parts, body) = request.into_parts();
    let request_id = request_id(&parts.headers);

    let ctx = ProxyRequestContext::resolve(&parts.uri, &parts.headers, &state.routes);

    tracing::debug!(
        request_id = %request_id,
        method = %parts.method,
        url = %ctx.original_url,
        host_label = %ctx.host_label,
        upstream = %ctx.resolved_upstream_host,
        landing = ctx.needs_landing_page,
        "Proxying request"
    );

    let response = match dispatch(&state, &ctx, &parts, body).await {
        Ok(Outcome::Relayed(response)) => response,
        Ok(Outcome::Proxied(mut response)) => {
            apply_policy(state.config.security.header_policy, response.headers_mut());
            response
        }
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Proxy stage failed");
            let mut response = e.into_response();
            apply_policy(state.config.security.header_policy, response.headers_mut());
            response
        }
    };

    tracing::debug!(
        request_id = %request_id,
        status = %response.status(),
        elapsed_ms = start_time.elapsed().as_millis() as u64,
        "Request complete"
    );
    metrics::record_request(
        parts.method.as_str(),
        response.status().as_u16(),
        &ctx.route,
        start_time,
    );
    response
}

async fn dispatch(
    state: &AppState,
    ctx: &ProxyRequestContext,
    parts: &Parts,
    body: Body,
) -> Result<Outcome, ProxyError> {
    if state.blocklist.is_blocked(&parts.headers) {
        tracing::info!(host = %ctx.hostname, "Blocked crawler user agent");
        return Ok(Outcome::Proxied(state.landing_page.decoy()));
    }

    let body = read_body(body, state.config.security.max_body_size).await?;

    if landing::wants_landing(ctx) {
        return serve_landing(state, ctx, parts, body)
            .await
            .map(Outcome::Proxied);
    }

    if ctx.is_token_request {
        return token::relay_token_request(
            &state.clients.direct,
            &state.auth_url,
            ctx,
            &parts.method,
            &parts.headers,
            body,
        )
        .await
        .map(Outcome::Relayed);
    }

    let upstream = UpstreamRequest::build(
        ctx,
        &state.config.upstream.scheme,
        &parts.method,
        &parts.headers,
        body.clone(),
    )?
    .send(&state.clients.direct)
    .await?;

    state
        .rewriter()
        .rewrite_response(ctx, upstream, &parts.method, &parts.headers, body)
        .await
        .map(Outcome::Proxied)
}

async fn serve_landing(
    state: &AppState,
    ctx: &ProxyRequestContext,
    parts: &Parts,
    body: axum::body::Bytes,
) -> Result<Response, ProxyError> {
    let action = landing::landing_action(&state.config.landing, &ctx.path);
    tracing::debug!(action = ?action, path = %ctx.path, "Landing request");

    let response = match action {
        LandingAction::Redirect(url) => landing::redirect_to(&url),
        LandingAction::Decoy => state.landing_page.decoy(),
        LandingAction::Home => state.landing_page.home(&ctx.hostname),
        LandingAction::Fetch(url) => {
            landing::fetch_landing(
                &state.clients.following,
                &url,
                &parts.method,
                &parts.headers,
                body,
            )
            .await?
        }
        LandingAction::HubApi => {
            hub::proxy_hub_api(
                &state.clients.following,
                &state.hub_api_url,
                ctx,
                &parts.method,
                &parts.headers,
                body,
            )
            .await?
        }
    };
    Ok(response)
}
