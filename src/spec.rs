//! Test specification types
//!
//! A [`TestSpec`] describes one load test: the target endpoint or endpoints,
//! the request budget, concurrency, optional rate and timeout, and the
//! thresholds a finished run is judged against. The JSON wire shape accepts
//! either bare `url`/`method`/`headers`/`body` fields or an `endpoints` list;
//! parsing resolves that choice into an [`EndpointsSource`] up front, so a
//! spec without any target is unrepresentable after deserialization.

use std::collections::BTreeMap;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::EngineResult;
use crate::thresholds::Thresholds;

/// Per-request deadline applied when `timeout_seconds` is unset
pub const DEFAULT_TIMEOUT_SECS: f64 = 30.0;

/// Spec validation and endpoint resolution errors
#[derive(Debug, Error)]
pub enum SpecError {
    /// Neither a url nor a non-empty endpoints list was given
    #[error("spec defines neither `url` nor a non-empty `endpoints` list")]
    NoEndpoints,

    /// Invalid total request count
    #[error("invalid total_requests: {0}")]
    InvalidTotalRequests(String),

    /// Invalid concurrency value
    #[error("invalid concurrency: {0}")]
    InvalidConcurrency(String),

    /// Invalid rate value
    #[error("invalid requests_per_second: {0}")]
    InvalidRate(String),

    /// Invalid timeout value
    #[error("invalid timeout_seconds: {0}")]
    InvalidTimeout(String),

    /// An endpoint failed validation
    #[error("invalid endpoint `{name}`: {message}")]
    InvalidEndpoint {
        /// Endpoint name, or the spec url for single-target specs
        name: String,
        /// What was wrong with it
        message: String,
    },

    /// Two endpoints share a name
    #[error("duplicate endpoint name `{0}`")]
    DuplicateEndpoint(String),

    /// A url could not be parsed or uses an unsupported scheme
    #[error("invalid url `{url}`: {message}")]
    InvalidUrl {
        /// The offending url
        url: String,
        /// Parse or scheme failure
        message: String,
    },

    /// Weighted or sequential distribution with every weight zero
    #[error("no selectable endpoints: every weight is zero")]
    AllWeightsZero,
}

/// Supported HTTP methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// DELETE
    Delete,
    /// PATCH
    Patch,
    /// HEAD
    Head,
    /// OPTIONS
    Options,
}

impl HttpMethod {
    /// Uppercase wire form
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }
}

impl Default for HttpMethod {
    fn default() -> Self {
        Self::Get
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How requests are spread across a multi-endpoint spec
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionStrategy {
    /// Cycle through endpoints by request number, ignoring weights
    RoundRobin,
    /// Random draw proportional to endpoint weight
    Weighted,
    /// Contiguous per-endpoint blocks proportional to weight, in list order
    Sequential,
}

impl Default for DistributionStrategy {
    fn default() -> Self {
        Self::RoundRobin
    }
}

/// One named target in a multi-endpoint spec
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointSpec {
    /// Name, unique within the spec
    pub name: String,

    /// Target url
    pub url: String,

    /// HTTP method, GET when omitted
    #[serde(default)]
    pub method: HttpMethod,

    /// Request headers
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,

    /// Request body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,

    /// Selection weight for the weighted and sequential strategies
    #[serde(default = "default_weight")]
    pub weight: u32,

    /// Status codes counted as success for this endpoint, overriding the
    /// spec-level default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_status_codes: Option<Vec<u16>>,
}

fn default_weight() -> u32 {
    1
}

impl EndpointSpec {
    /// Create an endpoint with defaults (GET, weight 1, no headers or body)
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            method: HttpMethod::default(),
            headers: BTreeMap::new(),
            body: None,
            weight: 1,
            expected_status_codes: None,
        }
    }

    /// Set the method
    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    /// Add one header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set the body
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set the selection weight
    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

    /// Set the expected status codes for this endpoint
    pub fn with_expected_status_codes(mut self, codes: Vec<u16>) -> Self {
        self.expected_status_codes = Some(codes);
        self
    }
}

/// The bare target of a single-endpoint spec
#[derive(Debug, Clone, PartialEq)]
pub struct RequestTarget {
    /// Target url
    pub url: String,
    /// HTTP method
    pub method: HttpMethod,
    /// Request headers
    pub headers: BTreeMap<String, String>,
    /// Request body
    pub body: Option<String>,
}

/// Where a run's endpoints come from, fixed at parse time
#[derive(Debug, Clone, PartialEq)]
pub enum EndpointsSource {
    /// A bare url/method/headers/body target
    Single(RequestTarget),
    /// Named endpoints spread by a distribution strategy
    Multi {
        /// The ordered endpoint list
        endpoints: Vec<EndpointSpec>,
        /// How requests are assigned to it
        strategy: DistributionStrategy,
    },
}

/// Static authentication material folded into request headers at run start.
///
/// Token acquisition and refresh stay outside the engine; a
/// [`RequestResolver`](crate::client::RequestResolver) covers credentials
/// that must vary per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthConfig {
    /// `Authorization: Bearer <token>`
    Bearer {
        /// The token value
        token: String,
    },
    /// `Authorization: Basic <credentials>`
    Basic {
        /// Username
        username: String,
        /// Password
        password: String,
    },
    /// An arbitrary static header
    Header {
        /// Header name
        name: String,
        /// Header value
        value: String,
    },
}

impl AuthConfig {
    /// The header this config contributes
    fn header(&self) -> (String, String) {
        match self {
            Self::Bearer { token } => ("Authorization".to_string(), format!("Bearer {token}")),
            Self::Basic { username, password } => {
                let credentials = BASE64.encode(format!("{username}:{password}"));
                ("Authorization".to_string(), format!("Basic {credentials}"))
            }
            Self::Header { name, value } => (name.clone(), value.clone()),
        }
    }
}

/// The set of status codes an endpoint counts as success
#[derive(Debug, Clone, PartialEq)]
pub enum ExpectedStatus {
    /// Any 2xx status
    Success,
    /// An explicit allow list
    Listed(Vec<u16>),
}

impl ExpectedStatus {
    /// Whether the observed status counts as success
    pub fn matches(&self, status: u16) -> bool {
        match self {
            Self::Success => (200..300).contains(&status),
            Self::Listed(codes) => codes.contains(&status),
        }
    }
}

/// An endpoint after resolution: single/multi folded into one shape, auth
/// applied, url checked. This is what workers dispatch against.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedEndpoint {
    /// Endpoint name; `None` for single-target specs
    pub name: Option<String>,
    /// Validated target url
    pub url: String,
    /// HTTP method
    pub method: HttpMethod,
    /// Headers in send order
    pub headers: Vec<(String, String)>,
    /// Request body
    pub body: Option<String>,
    /// Selection weight
    pub weight: u32,
    /// Effective success-status set
    pub expected: ExpectedStatus,
}

/// A complete load-test specification.
///
/// Immutable once a run starts; the run keeps its own snapshot. Construct
/// programmatically via [`TestSpec::single`] / [`TestSpec::multi`] or parse
/// from JSON with [`TestSpec::from_json`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTestSpec", into = "RawTestSpec")]
pub struct TestSpec {
    /// Human-readable spec name
    pub name: String,

    /// Optional free-form description
    pub description: Option<String>,

    /// The endpoint or endpoints under test
    pub source: EndpointsSource,

    /// How many requests the run dispatches in total
    pub total_requests: u64,

    /// Worker count; the run's concurrency ceiling
    pub concurrency: usize,

    /// Optional request-start rate, requests per second
    pub requests_per_second: Option<f64>,

    /// Optional per-request deadline, seconds
    pub timeout_seconds: Option<f64>,

    /// Pass/fail boundaries evaluated at completion
    pub thresholds: Thresholds,

    /// Spec-level success statuses; any 2xx when unset
    pub expected_status_codes: Option<Vec<u16>>,

    /// Free-form variables carried for external templating
    pub variables: BTreeMap<String, String>,

    /// Optional static authentication material
    pub auth: Option<AuthConfig>,
}

impl TestSpec {
    /// Minimal single-target spec: one request, one worker
    pub fn single(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            source: EndpointsSource::Single(RequestTarget {
                url: url.into(),
                method: HttpMethod::default(),
                headers: BTreeMap::new(),
                body: None,
            }),
            total_requests: 1,
            concurrency: 1,
            requests_per_second: None,
            timeout_seconds: None,
            thresholds: Thresholds::default(),
            expected_status_codes: None,
            variables: BTreeMap::new(),
            auth: None,
        }
    }

    /// Multi-endpoint spec with the given distribution strategy
    pub fn multi(
        name: impl Into<String>,
        endpoints: Vec<EndpointSpec>,
        strategy: DistributionStrategy,
    ) -> Self {
        let mut spec = Self::single(name, String::new());
        spec.source = EndpointsSource::Multi {
            endpoints,
            strategy,
        };
        spec
    }

    /// Set the total request budget
    pub fn with_total_requests(mut self, total: u64) -> Self {
        self.total_requests = total;
        self
    }

    /// Set the worker count
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set the request-start rate
    pub fn with_requests_per_second(mut self, rate: f64) -> Self {
        self.requests_per_second = Some(rate);
        self
    }

    /// Set the per-request deadline in seconds
    pub fn with_timeout_seconds(mut self, seconds: f64) -> Self {
        self.timeout_seconds = Some(seconds);
        self
    }

    /// Set the thresholds
    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Set the spec-level expected status codes
    pub fn with_expected_status_codes(mut self, codes: Vec<u16>) -> Self {
        self.expected_status_codes = Some(codes);
        self
    }

    /// Set static authentication
    pub fn with_auth(mut self, auth: AuthConfig) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Parse a spec from its JSON wire form
    pub fn from_json(json: &str) -> EngineResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to the canonical JSON wire form
    pub fn to_json(&self) -> EngineResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// The effective per-request deadline
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    /// The distribution strategy; round-robin is reported for single-target
    /// specs, where no selection happens
    pub fn distribution_strategy(&self) -> DistributionStrategy {
        match &self.source {
            EndpointsSource::Single(_) => DistributionStrategy::default(),
            EndpointsSource::Multi { strategy, .. } => *strategy,
        }
    }

    /// Whether the run tracks per-endpoint metrics
    pub fn is_multi_endpoint(&self) -> bool {
        matches!(&self.source, EndpointsSource::Multi { .. })
    }

    /// Validate field ranges and endpoint naming
    pub fn validate(&self) -> Result<(), SpecError> {
        if self.total_requests == 0 {
            return Err(SpecError::InvalidTotalRequests(
                "must be at least 1".into(),
            ));
        }
        if self.concurrency == 0 {
            return Err(SpecError::InvalidConcurrency("must be at least 1".into()));
        }
        if let Some(rate) = self.requests_per_second {
            if rate <= 0.0 || !rate.is_finite() {
                return Err(SpecError::InvalidRate(format!(
                    "must be positive, got {rate}"
                )));
            }
        }
        if let Some(timeout) = self.timeout_seconds {
            if timeout <= 0.0 || !timeout.is_finite() {
                return Err(SpecError::InvalidTimeout(format!(
                    "must be positive, got {timeout}"
                )));
            }
        }

        match &self.source {
            EndpointsSource::Single(target) => {
                if target.url.is_empty() {
                    return Err(SpecError::InvalidEndpoint {
                        name: self.name.clone(),
                        message: "url must not be empty".into(),
                    });
                }
            }
            EndpointsSource::Multi { endpoints, .. } => {
                let mut seen = std::collections::BTreeSet::new();
                for endpoint in endpoints {
                    if endpoint.name.is_empty() {
                        return Err(SpecError::InvalidEndpoint {
                            name: endpoint.url.clone(),
                            message: "name must not be empty".into(),
                        });
                    }
                    if endpoint.url.is_empty() {
                        return Err(SpecError::InvalidEndpoint {
                            name: endpoint.name.clone(),
                            message: "url must not be empty".into(),
                        });
                    }
                    if !seen.insert(endpoint.name.as_str()) {
                        return Err(SpecError::DuplicateEndpoint(endpoint.name.clone()));
                    }
                }
            }
        }
        Ok(())
    }

    /// Resolve the spec into the uniform endpoint list workers dispatch
    /// against: auth folded into headers, urls parsed and scheme-checked,
    /// effective success statuses fixed per endpoint.
    pub fn resolve_endpoints(&self) -> Result<Vec<ResolvedEndpoint>, SpecError> {
        let auth_header = self.auth.as_ref().map(AuthConfig::header);

        let resolved: Vec<ResolvedEndpoint> = match &self.source {
            EndpointsSource::Single(target) => vec![resolve_one(
                None,
                &target.url,
                target.method,
                &target.headers,
                target.body.clone(),
                1,
                None,
                self.expected_status_codes.as_ref(),
                auth_header.as_ref(),
            )?],
            EndpointsSource::Multi { endpoints, .. } => endpoints
                .iter()
                .map(|endpoint| {
                    resolve_one(
                        Some(endpoint.name.clone()),
                        &endpoint.url,
                        endpoint.method,
                        &endpoint.headers,
                        endpoint.body.clone(),
                        endpoint.weight,
                        endpoint.expected_status_codes.as_ref(),
                        self.expected_status_codes.as_ref(),
                        auth_header.as_ref(),
                    )
                })
                .collect::<Result<_, _>>()?,
        };

        if resolved.is_empty() {
            return Err(SpecError::NoEndpoints);
        }
        let needs_weight = matches!(
            self.distribution_strategy(),
            DistributionStrategy::Weighted | DistributionStrategy::Sequential
        );
        if self.is_multi_endpoint()
            && needs_weight
            && resolved.iter().all(|endpoint| endpoint.weight == 0)
        {
            return Err(SpecError::AllWeightsZero);
        }
        Ok(resolved)
    }
}

#[allow(clippy::too_many_arguments)]
fn resolve_one(
    name: Option<String>,
    url: &str,
    method: HttpMethod,
    headers: &BTreeMap<String, String>,
    body: Option<String>,
    weight: u32,
    endpoint_statuses: Option<&Vec<u16>>,
    spec_statuses: Option<&Vec<u16>>,
    auth_header: Option<&(String, String)>,
) -> Result<ResolvedEndpoint, SpecError> {
    let parsed = url::Url::parse(url).map_err(|e| SpecError::InvalidUrl {
        url: url.to_string(),
        message: e.to_string(),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(SpecError::InvalidUrl {
            url: url.to_string(),
            message: format!("unsupported scheme `{}`", parsed.scheme()),
        });
    }

    let mut send_headers: Vec<(String, String)> = headers
        .iter()
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();
    if let Some((name, value)) = auth_header {
        // Explicit endpoint headers win over spec-level auth.
        let already_set = send_headers
            .iter()
            .any(|(existing, _)| existing.eq_ignore_ascii_case(name));
        if !already_set {
            send_headers.push((name.clone(), value.clone()));
        }
    }

    let expected = endpoint_statuses
        .or(spec_statuses)
        .map(|codes| ExpectedStatus::Listed(codes.clone()))
        .unwrap_or(ExpectedStatus::Success);

    Ok(ResolvedEndpoint {
        name,
        url: url.to_string(),
        method,
        headers: send_headers,
        body,
        weight,
        expected,
    })
}

/// JSON wire shape: single-target fields and the endpoints list are both
/// optional here, with precedence resolved in the conversion to [`TestSpec`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawTestSpec {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    method: Option<HttpMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    headers: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    endpoints: Option<Vec<EndpointSpec>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    distribution_strategy: Option<DistributionStrategy>,
    total_requests: u64,
    concurrency: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    requests_per_second: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timeout_seconds: Option<f64>,
    #[serde(default, skip_serializing_if = "Thresholds::is_empty")]
    thresholds: Thresholds,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expected_status_codes: Option<Vec<u16>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    variables: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    auth: Option<AuthConfig>,
}

impl TryFrom<RawTestSpec> for TestSpec {
    type Error = SpecError;

    fn try_from(raw: RawTestSpec) -> Result<Self, Self::Error> {
        let source = match raw.endpoints {
            Some(endpoints) if !endpoints.is_empty() => EndpointsSource::Multi {
                endpoints,
                strategy: raw.distribution_strategy.unwrap_or_default(),
            },
            _ => {
                let url = raw.url.ok_or(SpecError::NoEndpoints)?;
                EndpointsSource::Single(RequestTarget {
                    url,
                    method: raw.method.unwrap_or_default(),
                    headers: raw.headers.unwrap_or_default(),
                    body: raw.body,
                })
            }
        };
        Ok(TestSpec {
            name: raw.name,
            description: raw.description,
            source,
            total_requests: raw.total_requests,
            concurrency: raw.concurrency,
            requests_per_second: raw.requests_per_second,
            timeout_seconds: raw.timeout_seconds,
            thresholds: raw.thresholds,
            expected_status_codes: raw.expected_status_codes,
            variables: raw.variables,
            auth: raw.auth,
        })
    }
}

impl From<TestSpec> for RawTestSpec {
    fn from(spec: TestSpec) -> Self {
        let mut raw = RawTestSpec {
            name: spec.name,
            description: spec.description,
            url: None,
            method: None,
            headers: None,
            body: None,
            endpoints: None,
            distribution_strategy: None,
            total_requests: spec.total_requests,
            concurrency: spec.concurrency,
            requests_per_second: spec.requests_per_second,
            timeout_seconds: spec.timeout_seconds,
            thresholds: spec.thresholds,
            expected_status_codes: spec.expected_status_codes,
            variables: spec.variables,
            auth: spec.auth,
        };
        match spec.source {
            EndpointsSource::Single(target) => {
                raw.url = Some(target.url);
                raw.method = Some(target.method);
                if !target.headers.is_empty() {
                    raw.headers = Some(target.headers);
                }
                raw.body = target.body;
            }
            EndpointsSource::Multi {
                endpoints,
                strategy,
            } => {
                raw.endpoints = Some(endpoints);
                raw.distribution_strategy = Some(strategy);
            }
        }
        raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_url_spec() {
        let json = r#"{
            "name": "smoke",
            "url": "https://example.com/health",
            "method": "POST",
            "headers": {"content-type": "application/json"},
            "body": "{}",
            "total_requests": 50,
            "concurrency": 5
        }"#;
        let spec = TestSpec::from_json(json).unwrap();
        assert_eq!(spec.name, "smoke");
        assert_eq!(spec.total_requests, 50);
        assert_eq!(spec.concurrency, 5);
        match &spec.source {
            EndpointsSource::Single(target) => {
                assert_eq!(target.url, "https://example.com/health");
                assert_eq!(target.method, HttpMethod::Post);
                assert_eq!(target.headers.len(), 1);
                assert_eq!(target.body.as_deref(), Some("{}"));
            }
            other => panic!("expected single source, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_multi_endpoint_spec() {
        let json = r#"{
            "name": "mixed",
            "endpoints": [
                {"name": "list", "url": "https://api.test/items", "weight": 3},
                {"name": "create", "url": "https://api.test/items", "method": "POST", "body": "{}"}
            ],
            "distribution_strategy": "weighted",
            "total_requests": 100,
            "concurrency": 10
        }"#;
        let spec = TestSpec::from_json(json).unwrap();
        assert!(spec.is_multi_endpoint());
        assert_eq!(spec.distribution_strategy(), DistributionStrategy::Weighted);
        match &spec.source {
            EndpointsSource::Multi { endpoints, .. } => {
                assert_eq!(endpoints.len(), 2);
                assert_eq!(endpoints[0].weight, 3);
                assert_eq!(endpoints[1].weight, 1);
                assert_eq!(endpoints[1].method, HttpMethod::Post);
            }
            other => panic!("expected multi source, got {other:?}"),
        }
    }

    #[test]
    fn test_endpoints_take_precedence_over_url() {
        let json = r#"{
            "name": "both",
            "url": "https://ignored.test/",
            "endpoints": [{"name": "a", "url": "https://api.test/a"}],
            "total_requests": 1,
            "concurrency": 1
        }"#;
        let spec = TestSpec::from_json(json).unwrap();
        assert!(spec.is_multi_endpoint());
    }

    #[test]
    fn test_rejects_spec_without_target() {
        let json = r#"{"name": "empty", "total_requests": 1, "concurrency": 1}"#;
        let err = TestSpec::from_json(json).unwrap_err();
        assert!(err.to_string().contains("neither"));
    }

    #[test]
    fn test_empty_endpoints_list_falls_back_to_url() {
        let json = r#"{
            "name": "fallback",
            "url": "https://example.com/",
            "endpoints": [],
            "total_requests": 1,
            "concurrency": 1
        }"#;
        let spec = TestSpec::from_json(json).unwrap();
        assert!(!spec.is_multi_endpoint());
    }

    #[test]
    fn test_validate_zero_total_requests() {
        let spec = TestSpec::single("bad", "https://example.com/").with_total_requests(0);
        assert!(matches!(
            spec.validate(),
            Err(SpecError::InvalidTotalRequests(_))
        ));
    }

    #[test]
    fn test_validate_zero_concurrency() {
        let spec = TestSpec::single("bad", "https://example.com/").with_concurrency(0);
        assert!(matches!(
            spec.validate(),
            Err(SpecError::InvalidConcurrency(_))
        ));
    }

    #[test]
    fn test_validate_negative_rate() {
        let spec = TestSpec::single("bad", "https://example.com/").with_requests_per_second(-5.0);
        assert!(matches!(spec.validate(), Err(SpecError::InvalidRate(_))));
    }

    #[test]
    fn test_validate_zero_timeout() {
        let spec = TestSpec::single("bad", "https://example.com/").with_timeout_seconds(0.0);
        assert!(matches!(spec.validate(), Err(SpecError::InvalidTimeout(_))));
    }

    #[test]
    fn test_validate_duplicate_endpoint_names() {
        let spec = TestSpec::multi(
            "dup",
            vec![
                EndpointSpec::new("a", "https://api.test/1"),
                EndpointSpec::new("a", "https://api.test/2"),
            ],
            DistributionStrategy::RoundRobin,
        );
        assert!(matches!(
            spec.validate(),
            Err(SpecError::DuplicateEndpoint(name)) if name == "a"
        ));
    }

    #[test]
    fn test_validate_ok() {
        let spec = TestSpec::single("ok", "https://example.com/")
            .with_total_requests(100)
            .with_concurrency(4)
            .with_requests_per_second(50.0)
            .with_timeout_seconds(5.0);
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_resolve_single_target() {
        let spec = TestSpec::single("one", "https://example.com/health");
        let resolved = spec.resolve_endpoints().unwrap();
        assert_eq!(resolved.len(), 1);
        assert!(resolved[0].name.is_none());
        assert!(resolved[0].expected.matches(200));
        assert!(resolved[0].expected.matches(204));
        assert!(!resolved[0].expected.matches(301));
    }

    #[test]
    fn test_resolve_applies_bearer_auth() {
        let spec = TestSpec::single("auth", "https://example.com/")
            .with_auth(AuthConfig::Bearer {
                token: "secret".into(),
            });
        let resolved = spec.resolve_endpoints().unwrap();
        assert!(resolved[0]
            .headers
            .iter()
            .any(|(name, value)| name == "Authorization" && value == "Bearer secret"));
    }

    #[test]
    fn test_resolve_basic_auth_encodes_credentials() {
        let spec = TestSpec::single("auth", "https://example.com/").with_auth(AuthConfig::Basic {
            username: "user".into(),
            password: "pass".into(),
        });
        let resolved = spec.resolve_endpoints().unwrap();
        let (_, value) = resolved[0]
            .headers
            .iter()
            .find(|(name, _)| name == "Authorization")
            .unwrap();
        // base64("user:pass")
        assert_eq!(value, "Basic dXNlcjpwYXNz");
    }

    #[test]
    fn test_endpoint_header_wins_over_auth() {
        let spec = TestSpec::multi(
            "override",
            vec![EndpointSpec::new("a", "https://api.test/")
                .with_header("authorization", "custom")],
            DistributionStrategy::RoundRobin,
        )
        .with_auth(AuthConfig::Bearer {
            token: "unused".into(),
        });
        let resolved = spec.resolve_endpoints().unwrap();
        let auth_headers: Vec<_> = resolved[0]
            .headers
            .iter()
            .filter(|(name, _)| name.eq_ignore_ascii_case("authorization"))
            .collect();
        assert_eq!(auth_headers.len(), 1);
        assert_eq!(auth_headers[0].1, "custom");
    }

    #[test]
    fn test_resolve_rejects_invalid_url() {
        let spec = TestSpec::single("bad", "not a url");
        assert!(matches!(
            spec.resolve_endpoints(),
            Err(SpecError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_resolve_rejects_unsupported_scheme() {
        let spec = TestSpec::single("bad", "ftp://example.com/file");
        let err = spec.resolve_endpoints().unwrap_err();
        assert!(err.to_string().contains("unsupported scheme"));
    }

    #[test]
    fn test_resolve_all_zero_weights() {
        let spec = TestSpec::multi(
            "zeros",
            vec![
                EndpointSpec::new("a", "https://api.test/a").with_weight(0),
                EndpointSpec::new("b", "https://api.test/b").with_weight(0),
            ],
            DistributionStrategy::Weighted,
        );
        assert!(matches!(
            spec.resolve_endpoints(),
            Err(SpecError::AllWeightsZero)
        ));
    }

    #[test]
    fn test_zero_weights_allowed_for_round_robin() {
        let spec = TestSpec::multi(
            "zeros",
            vec![
                EndpointSpec::new("a", "https://api.test/a").with_weight(0),
                EndpointSpec::new("b", "https://api.test/b").with_weight(0),
            ],
            DistributionStrategy::RoundRobin,
        );
        assert_eq!(spec.resolve_endpoints().unwrap().len(), 2);
    }

    #[test]
    fn test_expected_status_override_per_endpoint() {
        let spec = TestSpec::multi(
            "statuses",
            vec![
                EndpointSpec::new("missing", "https://api.test/gone")
                    .with_expected_status_codes(vec![404]),
                EndpointSpec::new("ok", "https://api.test/ok"),
            ],
            DistributionStrategy::RoundRobin,
        )
        .with_expected_status_codes(vec![200, 201]);
        let resolved = spec.resolve_endpoints().unwrap();
        assert!(resolved[0].expected.matches(404));
        assert!(!resolved[0].expected.matches(200));
        assert!(resolved[1].expected.matches(201));
        assert!(!resolved[1].expected.matches(204));
    }

    #[test]
    fn test_canonical_serialization_round_trips() {
        let single = TestSpec::single("s", "https://example.com/")
            .with_total_requests(10)
            .with_requests_per_second(5.0);
        let json = single.to_json().unwrap();
        assert!(json.contains("\"url\""));
        assert!(!json.contains("\"endpoints\""));
        assert_eq!(TestSpec::from_json(&json).unwrap(), single);

        let multi = TestSpec::multi(
            "m",
            vec![EndpointSpec::new("a", "https://api.test/a").with_weight(2)],
            DistributionStrategy::Sequential,
        )
        .with_total_requests(10);
        let json = multi.to_json().unwrap();
        assert!(json.contains("\"endpoints\""));
        assert!(json.contains("\"sequential\""));
        assert_eq!(TestSpec::from_json(&json).unwrap(), multi);
    }

    #[test]
    fn test_timeout_defaults_to_thirty_seconds() {
        let spec = TestSpec::single("t", "https://example.com/");
        assert_eq!(spec.timeout(), Duration::from_secs(30));
        let spec = spec.with_timeout_seconds(2.5);
        assert_eq!(spec.timeout(), Duration::from_millis(2500));
    }
}
