//! Per-request outcome records
//!
//! Every dispatched request produces exactly one [`RequestOutcome`], success
//! or failure. Workers emit them as requests finish; the collector folds them
//! into metrics and keeps a bounded sample for the final report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;

/// Captured headers and bodies for a sampled exchange.
///
/// Bodies are truncated to the collector's capture limit before they reach
/// this struct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeDetail {
    /// Headers sent with the request
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub request_headers: Vec<(String, String)>,

    /// Body sent with the request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<String>,

    /// Headers received in the response
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub response_headers: Vec<(String, String)>,

    /// Response body, lossily decoded and truncated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_body: Option<String>,
}

/// The result of one dispatched request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestOutcome {
    /// 1-indexed dispatch number, unique within the run
    pub request_number: u64,

    /// Which endpoint served it; `None` for single-target runs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_name: Option<String>,

    /// Response status, when a response arrived at all
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,

    /// Wall-clock latency of the exchange in milliseconds
    pub latency_ms: f64,

    /// Failure classification; `None` means success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,

    /// Human-readable failure message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// When the request completed
    pub timestamp: DateTime<Utc>,

    /// Response body size in bytes, zero on failure
    pub response_size_bytes: u64,

    /// Captured exchange detail, present only for sampled requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<ExchangeDetail>,
}

impl RequestOutcome {
    /// A successful exchange
    pub fn success(
        request_number: u64,
        latency_ms: f64,
        status_code: u16,
        response_size_bytes: u64,
    ) -> Self {
        Self {
            request_number,
            endpoint_name: None,
            status_code: Some(status_code),
            latency_ms,
            error_kind: None,
            error: None,
            timestamp: Utc::now(),
            response_size_bytes,
            detail: None,
        }
    }

    /// A failed exchange
    pub fn failure(
        request_number: u64,
        latency_ms: f64,
        kind: ErrorKind,
        error: impl Into<String>,
    ) -> Self {
        Self {
            request_number,
            endpoint_name: None,
            status_code: None,
            latency_ms,
            error_kind: Some(kind),
            error: Some(error.into()),
            timestamp: Utc::now(),
            response_size_bytes: 0,
            detail: None,
        }
    }

    /// Attach the endpoint name
    pub fn with_endpoint(mut self, name: Option<String>) -> Self {
        self.endpoint_name = name;
        self
    }

    /// Attach a status code; used for failures that did get a response
    pub fn with_status(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    /// Attach the received byte count; used for failures that did get a body
    pub fn with_response_size(mut self, bytes: u64) -> Self {
        self.response_size_bytes = bytes;
        self
    }

    /// Attach captured exchange detail
    pub fn with_detail(mut self, detail: ExchangeDetail) -> Self {
        self.detail = Some(detail);
        self
    }

    /// Whether this outcome counts toward successful_requests
    pub fn is_success(&self) -> bool {
        self.error_kind.is_none()
    }
}
