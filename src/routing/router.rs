//! Host label → upstream registry lookup.
//!
//! # Responsibilities
//! - Store the compiled route table
//! - Resolve the first DNS label of the request host to a registry
//! - Honor the `ns` query override
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(1) label lookup via HashMap, case-sensitive
//! - No match is not an error: it falls back to the default registry and
//!   flags the request as a landing candidate

use std::collections::HashMap;

use crate::config::schema::{RouteConfig, UpstreamConfig};

/// `ns` value that selects the default (Docker Hub) registry.
const DOCKER_IO: &str = "docker.io";

/// Route name reported for an `ns` override.
pub const NS_ROUTE: &str = "ns";

/// Route name reported for the fallback registry.
pub const DEFAULT_ROUTE: &str = "default";

/// One row of the routing table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    pub label: String,
    pub upstream_host: String,
    pub is_default_fallback: bool,
}

/// Outcome of resolving a request to a registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub upstream_host: String,
    /// Table label, [`NS_ROUTE`] or [`DEFAULT_ROUTE`]. Bounded by configuration.
    pub route: String,
    /// Browser-style requests to this host get the landing experience.
    pub needs_landing_page: bool,
}

/// Immutable label routing table.
#[derive(Debug, Clone)]
pub struct RouteTable {
    entries: HashMap<String, RouteEntry>,
    fallback: RouteEntry,
}

impl RouteTable {
    /// Compile the table from configuration.
    ///
    /// Labels are validated unique at load time; a later duplicate would
    /// replace the earlier one here.
    pub fn from_config(config: &UpstreamConfig) -> Self {
        Self::new(&config.routes, &config.default_registry)
    }

    pub fn new(routes: &[RouteConfig], default_registry: &str) -> Self {
        let entries = routes
            .iter()
            .map(|r| {
                (
                    r.label.clone(),
                    RouteEntry {
                        label: r.label.clone(),
                        upstream_host: r.upstream.clone(),
                        is_default_fallback: false,
                    },
                )
            })
            .collect();

        Self {
            entries,
            fallback: RouteEntry {
                label: String::new(),
                upstream_host: default_registry.to_string(),
                is_default_fallback: true,
            },
        }
    }

    /// Host used when nothing matches.
    pub fn default_registry(&self) -> &str {
        &self.fallback.upstream_host
    }

    /// Look up a table entry, falling back to the default registry.
    pub fn lookup(&self, host_label: &str) -> &RouteEntry {
        self.entries.get(host_label).unwrap_or(&self.fallback)
    }

    /// Resolve a host label to its upstream registry.
    pub fn resolve_route(&self, host_label: &str) -> Resolution {
        let entry = self.lookup(host_label);
        let route = if entry.is_default_fallback {
            DEFAULT_ROUTE.to_string()
        } else {
            entry.label.clone()
        };
        Resolution {
            upstream_host: entry.upstream_host.clone(),
            route,
            needs_landing_page: entry.is_default_fallback,
        }
    }

    /// Resolve with the `ns` query parameter taking precedence over the label.
    ///
    /// `ns=docker.io` selects the configured default registry, so the
    /// implicit `library/` namespace still applies.
    pub fn resolve(&self, ns: Option<&str>, host_label: &str) -> Resolution {
        match ns.filter(|ns| !ns.is_empty()) {
            Some(DOCKER_IO) => Resolution {
                upstream_host: self.default_registry().to_string(),
                route: NS_ROUTE.to_string(),
                needs_landing_page: false,
            },
            Some(ns) => Resolution {
                upstream_host: ns.to_string(),
                route: NS_ROUTE.to_string(),
                needs_landing_page: false,
            },
            None => self.resolve_route(host_label),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::from_config(&UpstreamConfig::default())
    }
}
