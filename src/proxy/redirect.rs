//! Second-hop fetch for registry redirects.
//!
//! Blob downloads usually answer with a `Location` pointing at a CDN. The
//! proxy fetches that location itself so the client never leaves the proxy
//! domain, then sanitizes the response headers.

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use axum::response::Response;
use reqwest::Client;
use url::Url;

use crate::error::Result;
use crate::http::response::{into_axum_response, into_axum_parts};
use crate::security::headers::ERROR_HEADER;
use crate::security::HeaderRewritePolicy;

/// True for a CORS preflight.
pub fn is_preflight(method: &Method, headers: &HeaderMap) -> bool {
    method == Method::OPTIONS && headers.contains_key(header::ACCESS_CONTROL_REQUEST_HEADERS)
}

/// Answer a CORS preflight without contacting anyone.
pub fn preflight_response() -> Response {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::NO_CONTENT;
    *response.headers_mut() = HeaderRewritePolicy.preflight_headers();
    response
}

/// Fetch `location` on behalf of the client.
///
/// `expected_len` is checked against the target's `Content-Length` when
/// given; current callers never supply one.
pub async fn follow_redirect(
    client: &Client,
    method: &Method,
    inbound: &HeaderMap,
    body: Bytes,
    location: Url,
    expected_len: Option<u64>,
) -> Result<Response> {
    if is_preflight(method, inbound) {
        return Ok(preflight_response());
    }

    tracing::debug!(location = %location, "Following registry redirect");

    let mut builder = client
        .request(method.clone(), location)
        .headers(HeaderRewritePolicy.redirect_request_headers(inbound));
    if !body.is_empty() {
        builder = builder.body(body);
    }
    let upstream = builder.send().await?;

    if let Some(expected) = expected_len {
        let got = upstream
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if got != expected.to_string() {
            tracing::warn!(got = %got, expected, "Redirect target length mismatch");
            return Ok(length_mismatch(upstream, &got, expected));
        }
    }

    let mut response = into_axum_response(upstream);
    HeaderRewritePolicy.sanitize_redirected(response.headers_mut());
    Ok(response)
}

fn length_mismatch(upstream: reqwest::Response, got: &str, expected: u64) -> Response {
    let (_, _, body) = into_axum_parts(upstream);
    let mut response = Response::new(body);
    *response.status_mut() = StatusCode::BAD_REQUEST;

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&format!("bad len: {}, except: {}", got, expected)) {
        headers.insert(HeaderName::from_static(ERROR_HEADER), value);
    }
    headers.insert(
        header::ACCESS_CONTROL_EXPOSE_HEADERS,
        HeaderValue::from_static(ERROR_HEADER),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preflight_detection() {
        let mut headers = HeaderMap::new();
        assert!(!is_preflight(&Method::OPTIONS, &headers));
        headers.insert(
            header::ACCESS_CONTROL_REQUEST_HEADERS,
            HeaderValue::from_static("authorization"),
        );
        assert!(is_preflight(&Method::OPTIONS, &headers));
        assert!(!is_preflight(&Method::GET, &headers));
    }

    #[test]
    fn test_preflight_response() {
        let response = preflight_response();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let h = response.headers();
        assert_eq!(h.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), "*");
        assert_eq!(
            h.get(header::ACCESS_CONTROL_ALLOW_METHODS).unwrap(),
            "GET,POST,PUT,PATCH,TRACE,DELETE,HEAD,OPTIONS"
        );
        assert_eq!(h.get(header::ACCESS_CONTROL_MAX_AGE).unwrap(), "1728000");
    }

    #[tokio::test]
    async fn test_preflight_short_circuits_without_network() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCESS_CONTROL_REQUEST_HEADERS,
            HeaderValue::from_static("authorization"),
        );
        // Port 9 is discard; nothing is contacted for a preflight.
        let location = Url::parse("http://127.0.0.1:9/blob").unwrap();
        let response = follow_redirect(
            &Client::new(),
            &Method::OPTIONS,
            &headers,
            Bytes::new(),
            location,
            None,
        )
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_length_mismatch_is_bad_request() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            let _ = socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\nConnection: close\r\n\r\nhello")
                .await;
        });

        let location = Url::parse(&format!("http://{}/blob", addr)).unwrap();
        let response = follow_redirect(
            &Client::new(),
            &Method::GET,
            &HeaderMap::new(),
            Bytes::new(),
            location,
            Some(10),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get(ERROR_HEADER).unwrap(),
            "bad len: 5, except: 10"
        );
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_EXPOSE_HEADERS)
                .unwrap(),
            ERROR_HEADER
        );
    }
}
