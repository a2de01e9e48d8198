//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Unique route labels, non-empty upstream hosts
//! - Parseable base URLs, supported scheme, non-zero timeouts
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::fmt;

use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a fully loaded configuration.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let upstream = &config.upstream;

    if upstream.default_registry.trim().is_empty() {
        errors.push(ValidationError::new(
            "upstream.default_registry",
            "must not be empty",
        ));
    }

    if upstream.scheme != "http" && upstream.scheme != "https" {
        errors.push(ValidationError::new(
            "upstream.scheme",
            format!("unsupported scheme '{}'", upstream.scheme),
        ));
    }

    check_url(&mut errors, "upstream.auth_url", &upstream.auth_url);
    check_url(&mut errors, "upstream.hub_api_url", &upstream.hub_api_url);

    let mut seen = HashSet::new();
    for (i, route) in upstream.routes.iter().enumerate() {
        if route.label.is_empty() {
            errors.push(ValidationError::new(
                format!("upstream.routes[{}].label", i),
                "must not be empty",
            ));
        }
        if route.upstream.trim().is_empty() {
            errors.push(ValidationError::new(
                format!("upstream.routes[{}].upstream", i),
                "must not be empty",
            ));
        }
        if !seen.insert(route.label.as_str()) {
            errors.push(ValidationError::new(
                format!("upstream.routes[{}].label", i),
                format!("duplicate label '{}'", route.label),
            ));
        }
    }

    if let Some(url) = &config.landing.redirect_url {
        check_url(&mut errors, "landing.redirect_url", url);
    }
    if let Some(url) = &config.landing.url {
        if !url.eq_ignore_ascii_case("nginx") {
            check_url(&mut errors, "landing.url", url);
        }
    }

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::new("timeouts.connect_secs", "must be > 0"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be > 0"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_url(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    if let Err(e) = Url::parse(value) {
        errors.push(ValidationError::new(field, format!("invalid url: {}", e)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::RouteConfig;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&ProxyConfig::default()).is_ok());
    }

    #[test]
    fn test_reports_all_errors() {
        let mut config = ProxyConfig::default();
        config.upstream.scheme = "ftp".into();
        config.upstream.auth_url = "not a url".into();
        config.upstream.routes.push(RouteConfig::new("quay", "other.io"));
        config.timeouts.request_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"upstream.scheme"));
        assert!(fields.contains(&"upstream.auth_url"));
        assert!(fields.contains(&"timeouts.request_secs"));
        assert!(errors.iter().any(|e| e.message.contains("duplicate label 'quay'")));
    }

    #[test]
    fn test_nginx_landing_url_is_accepted() {
        let mut config = ProxyConfig::default();
        config.landing.url = Some("NGINX".into());
        assert!(validate_config(&config).is_ok());
    }
}
