//! Run identity, lifecycle, and the final report
//!
//! A run moves from `Pending` to `Running` and then to exactly one terminal
//! state. `Completed` means dispatch finished, even when thresholds failed;
//! `Cancelled` means it was stopped short; `Failed` is reserved for runs the
//! engine could not carry out at all.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EngineResult;
use crate::metrics::Metrics;
use crate::outcome::RequestOutcome;
use crate::spec::TestSpec;

/// Unique identifier for one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(Uuid);

impl RunId {
    /// Generate a fresh random id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Lifecycle state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Created but not started
    Pending,
    /// Dispatching requests
    Running,
    /// Dispatch finished; thresholds may still have failed
    Completed,
    /// Stopped before the request budget was exhausted
    Cancelled,
    /// The engine could not execute the run
    Failed,
}

impl RunStatus {
    /// Wire name, matching the serialized form
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        }
    }

    /// Whether the run has finished; terminal states never change again
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A live snapshot of run progress, published after every recorded outcome
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunProgress {
    /// Current lifecycle state
    pub status: RunStatus,
    /// Outcomes recorded so far
    pub requests_completed: u64,
    /// Successes among them
    pub successful_requests: u64,
    /// Failures among them
    pub failed_requests: u64,
}

impl RunProgress {
    /// The snapshot before a run starts
    pub fn pending() -> Self {
        Self {
            status: RunStatus::Pending,
            requests_completed: 0,
            successful_requests: 0,
            failed_requests: 0,
        }
    }
}

/// The final report for one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    /// Run identifier
    pub id: RunId,

    /// The spec snapshot this run executed
    pub spec: TestSpec,

    /// Terminal lifecycle state
    pub status: RunStatus,

    /// When dispatch began
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    /// When the run reached its terminal state
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    /// Outcomes recorded before the run ended
    pub requests_completed: u64,

    /// Aggregated metrics; absent when setup failed before dispatch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Metrics>,

    /// Per-endpoint metrics for multi-endpoint runs
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub endpoint_metrics: BTreeMap<String, Metrics>,

    /// Threshold verdict; absent for cancelled and failed runs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passed: Option<bool>,

    /// One reason per violated threshold
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failure_reasons: Vec<String>,

    /// Why the run failed, verbatim from the underlying error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Bounded sample of individual outcomes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sampled_requests: Vec<RequestOutcome>,
}

impl Run {
    /// A fresh report in the pending state
    pub fn pending(id: RunId, spec: TestSpec) -> Self {
        Self {
            id,
            spec,
            status: RunStatus::Pending,
            started_at: None,
            completed_at: None,
            requests_completed: 0,
            metrics: None,
            endpoint_metrics: BTreeMap::new(),
            passed: None,
            failure_reasons: Vec::new(),
            error_message: None,
            sampled_requests: Vec::new(),
        }
    }

    /// Serialize the report as JSON
    pub fn to_json(&self) -> EngineResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
