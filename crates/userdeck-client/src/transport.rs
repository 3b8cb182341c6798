//! HTTP transport abstraction.
//!
//! The dispatcher never talks to the network directly. It hands a fully built
//! [`TransportRequest`] to a [`Transport`] and classifies whatever comes back.
//! [`ReqwestTransport`] is the production implementation.

use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::request::Method;

/// Maximum redirects followed when redirects are enabled.
const MAX_REDIRECTS: usize = 10;

/// A single outgoing HTTP exchange.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    pub timeout: Duration,
}

/// What the transport observed about an exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportMeta {
    /// HTTP status code.
    pub status: u16,
    /// Final URL after redirects.
    pub url: String,
    /// Wall time of the exchange.
    pub total_time: Duration,
    /// Size in bytes of the raw header block.
    pub header_size: usize,
}

/// A response obtained from the server, whatever its status.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    /// Raw header block: status line followed by `Name: Value` lines.
    pub head: String,
    /// Response body, undecoded.
    pub body: String,
    pub meta: TransportMeta,
}

/// Category of a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    Connect,
    Timeout,
    Redirect,
    Body,
    Request,
    Other,
}

impl TransportErrorKind {
    /// Stable numeric code reported through [`crate::Error::code`].
    pub fn code(self) -> u16 {
        match self {
            TransportErrorKind::Request => 3,
            TransportErrorKind::Connect => 7,
            TransportErrorKind::Timeout => 28,
            TransportErrorKind::Redirect => 47,
            TransportErrorKind::Body => 56,
            TransportErrorKind::Other => 1,
        }
    }
}

/// Failure to obtain any response.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        let kind = if e.is_timeout() {
            TransportErrorKind::Timeout
        } else if e.is_connect() {
            TransportErrorKind::Connect
        } else if e.is_redirect() {
            TransportErrorKind::Redirect
        } else if e.is_body() || e.is_decode() {
            TransportErrorKind::Body
        } else if e.is_builder() || e.is_request() {
            TransportErrorKind::Request
        } else {
            TransportErrorKind::Other
        };
        TransportError::new(kind, e.to_string())
    }
}

/// Capability to perform one HTTP exchange.
///
/// Implementations must return a [`TransportResponse`] for every response,
/// including 4xx/5xx; only a missing response is a [`TransportError`].
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    async fn send(
        &self,
        request: TransportRequest,
    ) -> std::result::Result<TransportResponse, TransportError>;
}

/// [`Transport`] backed by a `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a transport.
    pub fn new(
        follow_redirects: bool,
        user_agent: &str,
    ) -> std::result::Result<Self, TransportError> {
        let redirect = if follow_redirects {
            reqwest::redirect::Policy::limited(MAX_REDIRECTS)
        } else {
            reqwest::redirect::Policy::none()
        };

        let http = reqwest::Client::builder()
            .redirect(redirect)
            .user_agent(user_agent)
            .build()?;

        Ok(Self { http })
    }

    /// Wrap an existing `reqwest` client.
    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(
        &self,
        request: TransportRequest,
    ) -> std::result::Result<TransportResponse, TransportError> {
        let started = Instant::now();

        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self
            .http
            .request(method, &request.url)
            .timeout(request.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;

        let status = response.status();
        let url = response.url().to_string();
        let head = render_head(response.version(), status, response.headers());
        let body = response.text().await?;

        Ok(TransportResponse {
            meta: TransportMeta {
                status: status.as_u16(),
                url,
                total_time: started.elapsed(),
                header_size: head.len(),
            },
            head,
            body,
        })
    }
}

/// Render response headers as a raw header block.
fn render_head(
    version: reqwest::Version,
    status: reqwest::StatusCode,
    headers: &reqwest::header::HeaderMap,
) -> String {
    let mut head = format!("{:?} {}\r\n", version, status);
    for (name, value) in headers {
        head.push_str(name.as_str());
        head.push_str(": ");
        head.push_str(&String::from_utf8_lossy(value.as_bytes()));
        head.push_str("\r\n");
    }
    head.push_str("\r\n");
    head
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue};

    #[test]
    fn test_render_head() {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("application/json"));
        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("99"));

        let head = render_head(reqwest::Version::HTTP_11, reqwest::StatusCode::OK, &headers);
        assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(head.contains("content-type: application/json\r\n"));
        assert!(head.contains("x-ratelimit-remaining: 99\r\n"));
        assert!(head.ends_with("\r\n\r\n"));
    }

    #[test]
    fn test_error_codes_are_distinct() {
        let kinds = [
            TransportErrorKind::Connect,
            TransportErrorKind::Timeout,
            TransportErrorKind::Redirect,
            TransportErrorKind::Body,
            TransportErrorKind::Request,
            TransportErrorKind::Other,
        ];
        let mut codes: Vec<u16> = kinds.iter().map(|k| k.code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), kinds.len());
    }
}
