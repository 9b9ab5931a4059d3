//! Error types for the engine

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::spec::SpecError;

/// Top-level error type for spec validation, builders, and run setup.
///
/// Per-request failures (connect errors, timeouts, unexpected statuses) are
/// never surfaced through this type; they are absorbed into run metrics and
/// classified by [`ErrorKind`].
#[derive(Error, Debug)]
pub enum EngineError {
    /// Spec validation or endpoint resolution failed
    #[error(transparent)]
    Spec(#[from] SpecError),

    /// Spec could not be parsed from JSON
    #[error("spec parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A builder was asked to build without a required part
    #[error("missing configuration: {0}")]
    MissingConfig(String),

    /// The HTTP client could not be constructed
    #[error("http client error: {0}")]
    Client(#[from] reqwest::Error),

    /// The worker pool could not complete the run
    #[error("dispatch error: {0}")]
    Dispatch(String),
}

impl EngineError {
    /// Missing builder field error
    pub fn missing_config(what: impl Into<String>) -> Self {
        Self::MissingConfig(what.into())
    }

    /// Worker-pool level failure
    pub fn dispatch(message: impl Into<String>) -> Self {
        Self::Dispatch(message.into())
    }
}

/// Result type alias
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Classification of a failed request outcome.
///
/// Used as the key set of `errors_by_type` in run metrics. A request with no
/// kind attached counts as a success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// DNS, TCP, or TLS failure before any response arrived
    Connect,
    /// The exchange exceeded the per-request deadline
    Timeout,
    /// A response arrived with a status outside the expected set
    UnexpectedStatus,
    /// The exchange failed after connecting, or the request could not be built
    Transport,
}

impl ErrorKind {
    /// Stable string form, matching the serialized name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Timeout => "timeout",
            Self::UnexpectedStatus => "unexpected_status",
            Self::Transport => "transport",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
