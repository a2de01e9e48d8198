//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Canonical Docker Hub registry host.
pub const DOCKER_HUB_REGISTRY: &str = "registry-1.docker.io";

/// Docker Hub token issuer.
pub const DOCKER_HUB_AUTH_URL: &str = "https://auth.docker.io";

/// Docker Hub web API used by browser-style requests.
pub const DOCKER_HUB_API_URL: &str = "https://registry.hub.docker.com";

/// Root configuration for the registry proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Upstream registries and the host label routing table.
    pub upstream: UpstreamConfig,

    /// Landing page overrides for browser-style requests.
    pub landing: LandingConfig,

    /// Header policy, crawler blocklist and body limits.
    pub security: SecurityConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Upstream registry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Registry used when no route label matches.
    pub default_registry: String,

    /// Base URL of the token issuer. Occurrences of it in
    /// `WWW-Authenticate` are replaced by the proxy's own base URL.
    pub auth_url: String,

    /// Base URL of the Docker Hub web API.
    pub hub_api_url: String,

    /// Scheme used to reach registries ("https" outside of tests).
    pub scheme: String,

    /// Host label routing table.
    pub routes: Vec<RouteConfig>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            default_registry: DOCKER_HUB_REGISTRY.to_string(),
            auth_url: DOCKER_HUB_AUTH_URL.to_string(),
            hub_api_url: DOCKER_HUB_API_URL.to_string(),
            scheme: "https".to_string(),
            routes: default_routes(),
        }
    }
}

/// Maps the first DNS label of the request host to an upstream registry.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct RouteConfig {
    /// Host label to match (exact, case-sensitive).
    pub label: String,

    /// Registry host to forward to.
    pub upstream: String,
}

impl RouteConfig {
    pub fn new(label: impl Into<String>, upstream: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            upstream: upstream.into(),
        }
    }
}

fn default_routes() -> Vec<RouteConfig> {
    vec![
        RouteConfig::new("quay", "quay.io"),
        RouteConfig::new("gcr", "gcr.io"),
        RouteConfig::new("k8s-gcr", "k8s.gcr.io"),
        RouteConfig::new("k8s", "registry.k8s.io"),
        RouteConfig::new("ghcr", "ghcr.io"),
        RouteConfig::new("cloudsmith", "docker.cloudsmith.io"),
        RouteConfig::new("nvcr", "nvcr.io"),
        RouteConfig::new("test", DOCKER_HUB_REGISTRY),
    ]
}

/// Landing overrides for browser-style requests on landing hosts.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct LandingConfig {
    /// Page to serve instead of the home page. The literal "nginx"
    /// selects the decoy page.
    pub url: Option<String>,

    /// Answer every landing request with a 302 to this URL.
    pub redirect_url: Option<String>,
}

/// How the response header policy applies to non-token responses.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum HeaderPolicyMode {
    /// CORS injection and security header stripping on every response.
    #[default]
    Uniform,
    /// Only responses fetched through a `Location` redirect are sanitized.
    RedirectOnly,
}

/// Security configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Additional crawler User-Agent substrings, in the same delimited form
    /// accepted by `BLOCK_UA`.
    pub blocked_user_agents: Vec<String>,

    /// Response header policy mode.
    pub header_policy: HeaderPolicyMode,

    /// Maximum buffered request body in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            blocked_user_agents: Vec::new(),
            header_policy: HeaderPolicyMode::Uniform,
            max_body_size: 64 * 1024 * 1024, // 64MB
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Longest an upstream may stay silent on a read, in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 10,
            request_secs: 60,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
