//! HTTP client seam and per-request customization hooks
//!
//! Workers talk to the network through the [`HttpClient`] trait so that runs
//! can execute against a mock in tests. The default implementation wraps
//! [`reqwest`]. A [`RequestResolver`] can rewrite individual requests before
//! dispatch, for workloads where urls, headers, or bodies vary per request.

use async_trait::async_trait;
use thiserror::Error;

use crate::error::{EngineResult, ErrorKind};
use crate::spec::{HttpMethod, ResolvedEndpoint};

// ============================================================================
// HTTP Client Trait
// ============================================================================

/// A fully prepared request, ready for dispatch
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    /// 1-indexed dispatch number
    pub request_number: u64,
    /// Target url
    pub url: String,
    /// HTTP method
    pub method: HttpMethod,
    /// Headers in send order
    pub headers: Vec<(String, String)>,
    /// Request body
    pub body: Option<String>,
}

/// A completed HTTP exchange
#[derive(Debug, Clone)]
pub struct Exchange {
    /// Response status code
    pub status: u16,
    /// Response headers
    pub headers: Vec<(String, String)>,
    /// Raw response body
    pub body: Vec<u8>,
}

/// Transport-level failures from executing a request.
///
/// Status-code mismatches are not errors here; the worker classifies those
/// after a successful exchange.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// Could not reach the server
    #[error("connection failed: {0}")]
    Connect(String),

    /// The exchange did not finish in time
    #[error("request timed out")]
    TimedOut,

    /// The request could not be constructed
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Any other transport failure
    #[error("transport error: {0}")]
    Transport(String),
}

impl ExchangeError {
    /// Classification for metrics
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Connect(_) => ErrorKind::Connect,
            Self::TimedOut => ErrorKind::Timeout,
            Self::InvalidRequest(_) | Self::Transport(_) => ErrorKind::Transport,
        }
    }
}

impl From<reqwest::Error> for ExchangeError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::TimedOut
        } else if error.is_connect() {
            Self::Connect(error.to_string())
        } else if error.is_builder() {
            Self::InvalidRequest(error.to_string())
        } else {
            Self::Transport(error.to_string())
        }
    }
}

/// Executes prepared requests.
///
/// Implementations report wall-clock behavior only; latency measurement and
/// the per-request deadline are applied by the worker around each call.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Execute one request and return the raw exchange
    async fn execute(&self, request: &PreparedRequest) -> Result<Exchange, ExchangeError>;
}

// ============================================================================
// Request Resolver Trait
// ============================================================================

/// Errors surfaced by a [`RequestResolver`]
pub type ResolverError = Box<dyn std::error::Error + Send + Sync>;

/// Per-request overrides produced by a [`RequestResolver`].
///
/// Unset fields keep the endpoint's values; resolver headers replace
/// same-named endpoint headers.
#[derive(Debug, Clone, Default)]
pub struct RequestValues {
    /// Replacement url
    pub url: Option<String>,
    /// Headers to add or replace
    pub headers: Vec<(String, String)>,
    /// Replacement body
    pub body: Option<String>,
}

/// Rewrites requests just before dispatch.
///
/// Runs once per request with the dispatch number and the selected endpoint.
/// A resolver failure fails that one request, not the run.
#[async_trait]
pub trait RequestResolver: Send + Sync {
    /// Produce overrides for the given request
    async fn resolve(
        &self,
        request_number: u64,
        endpoint: &ResolvedEndpoint,
    ) -> Result<RequestValues, ResolverError>;
}

// ============================================================================
// Reqwest Implementation
// ============================================================================

/// The default [`HttpClient`] backed by a shared [`reqwest::Client`]
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Build a client with connection pooling shared across workers
    pub fn new() -> EngineResult<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self { client })
    }
}

fn to_reqwest_method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Delete => reqwest::Method::DELETE,
        HttpMethod::Patch => reqwest::Method::PATCH,
        HttpMethod::Head => reqwest::Method::HEAD,
        HttpMethod::Options => reqwest::Method::OPTIONS,
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn execute(&self, request: &PreparedRequest) -> Result<Exchange, ExchangeError> {
        let mut builder = self
            .client
            .request(to_reqwest_method(request.method), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.to_string(),
                    String::from_utf8_lossy(value.as_bytes()).to_string(),
                )
            })
            .collect();
        let body = response.bytes().await?.to_vec();

        Ok(Exchange {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exchange_error_kinds() {
        assert_eq!(
            ExchangeError::Connect("refused".into()).kind(),
            ErrorKind::Connect
        );
        assert_eq!(ExchangeError::TimedOut.kind(), ErrorKind::Timeout);
        assert_eq!(
            ExchangeError::Transport("reset".into()).kind(),
            ErrorKind::Transport
        );
        assert_eq!(
            ExchangeError::InvalidRequest("bad header".into()).kind(),
            ErrorKind::Transport
        );
    }

    #[test]
    fn test_method_conversion() {
        assert_eq!(to_reqwest_method(HttpMethod::Get), reqwest::Method::GET);
        assert_eq!(to_reqwest_method(HttpMethod::Post), reqwest::Method::POST);
        assert_eq!(
            to_reqwest_method(HttpMethod::Options),
            reqwest::Method::OPTIONS
        );
    }

    #[test]
    fn test_request_values_default_keeps_endpoint() {
        let values = RequestValues::default();
        assert!(values.url.is_none());
        assert!(values.body.is_none());
        assert!(values.headers.is_empty());
    }
}
