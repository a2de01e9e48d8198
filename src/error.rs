//! Request-scoped error types.
//!
//! Every failure while handling a request ends as an HTTP response; nothing
//! here is fatal to the process.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Plain-text body of the 503 returned when a handler panics.
pub const UNAVAILABLE_MESSAGE: &str =
    "Service temporarily unavailable. Docker registry proxy is still functional for pull operations.";

/// Errors produced while proxying a single request.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Outbound fetch to a registry, auth server or redirect target failed.
    #[error("upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    /// Docker Hub web API passthrough failed.
    #[error("hub api request failed: {0}")]
    HubApi(#[source] reqwest::Error),

    /// The inbound request body could not be read.
    #[error("failed to read request body: {0}")]
    Body(String),

    /// An outbound URL could not be constructed.
    #[error("invalid upstream url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

pub type Result<T> = std::result::Result<T, ProxyError>;

/// Errors building the server from a configuration.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("invalid {field}: {source}")]
    InvalidUrl {
        field: &'static str,
        #[source]
        source: url::ParseError,
    },
}

impl ProxyError {
    /// Status code the client receives for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::Upstream(_) | ProxyError::InvalidUrl { .. } => StatusCode::BAD_GATEWAY,
            ProxyError::HubApi(_) => StatusCode::BAD_GATEWAY,
            ProxyError::Body(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::error!(error = %self, status = %status, "Request failed");

        let body = match self {
            ProxyError::Upstream(_) | ProxyError::InvalidUrl { .. } => "Proxy error",
            ProxyError::HubApi(_) => "Unable to fetch from Docker Hub",
            ProxyError::Body(_) => "Bad request body",
        };
        plain_text(status, body)
    }
}

/// Build a plain-text response with the given status.
pub fn plain_text(status: StatusCode, body: &'static str) -> Response {
    let mut response = (status, body).into_response();
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=UTF-8"),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ProxyError::Body("eof".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ProxyError::InvalidUrl {
                url: "::".into(),
                reason: "bad".into()
            }
            .status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_error_body_is_plain_text() {
        let response = ProxyError::Body("eof".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/plain; charset=UTF-8"
        );
    }
}
