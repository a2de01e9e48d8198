//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load a TOML file, apply the process environment and validate.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: ProxyConfig = toml::from_str(&content)?;
    finish(config)
}

/// Build a configuration from defaults plus the process environment.
pub fn load_from_env() -> Result<ProxyConfig, ConfigError> {
    finish(ProxyConfig::default())
}

fn finish(mut config: ProxyConfig) -> Result<ProxyConfig, ConfigError> {
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Overlay deployment variables on top of file settings.
///
/// - `HOST` / `PORT`: listener bind address parts
/// - `CUSTOM_URL`: landing page override
/// - `REDIRECT_URL`: landing redirect target
/// - `BLOCK_UA`: extra crawler User-Agent substrings
pub fn apply_env_overrides<F>(config: &mut ProxyConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    let host = non_empty("HOST");
    let port = non_empty("PORT");
    if host.is_some() || port.is_some() {
        let (current_host, current_port) = config
            .listener
            .bind_address
            .rsplit_once(':')
            .map(|(h, p)| (h.to_string(), p.to_string()))
            .unwrap_or_else(|| ("0.0.0.0".to_string(), "8080".to_string()));
        config.listener.bind_address = format!(
            "{}:{}",
            host.unwrap_or(current_host),
            port.unwrap_or(current_port)
        );
    }

    if let Some(url) = non_empty("CUSTOM_URL") {
        config.landing.url = Some(url);
    }
    if let Some(url) = non_empty("REDIRECT_URL") {
        config.landing.redirect_url = Some(url);
    }
    if let Some(agents) = non_empty("BLOCK_UA") {
        config.security.blocked_user_agents.push(agents);
    }
}
