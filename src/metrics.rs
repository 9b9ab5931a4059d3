//! Metrics aggregation and percentile calculation
//!
//! Outcomes stream into a [`MetricsAggregator`] one at a time; nothing here
//! buffers raw exchanges beyond the latency values needed for exact
//! percentiles. [`MetricsAggregator::finalize`] is a read-only snapshot, so
//! it can be taken mid-run for progress reporting and again at the end.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::outcome::RequestOutcome;

/// Latency summary over every recorded outcome, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatencySummary {
    /// Minimum observed latency
    pub latency_min_ms: f64,
    /// Maximum observed latency
    pub latency_max_ms: f64,
    /// Mean latency
    pub latency_mean_ms: f64,
    /// 50th percentile
    pub latency_p50_ms: f64,
    /// 90th percentile
    pub latency_p90_ms: f64,
    /// 95th percentile
    pub latency_p95_ms: f64,
    /// 99th percentile
    pub latency_p99_ms: f64,
}

impl LatencySummary {
    /// Calculate the summary from raw latency values.
    ///
    /// Returns `None` when no values were recorded, which keeps the latency
    /// fields out of serialized reports instead of publishing fake zeros.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let mut sorted: Vec<f64> = values.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let len = sorted.len();
        let mean = sorted.iter().sum::<f64>() / len as f64;

        Some(Self {
            latency_min_ms: sorted[0],
            latency_max_ms: sorted[len - 1],
            latency_mean_ms: mean,
            latency_p50_ms: percentile(&sorted, 0.50),
            latency_p90_ms: percentile(&sorted, 0.90),
            latency_p95_ms: percentile(&sorted, 0.95),
            latency_p99_ms: percentile(&sorted, 0.99),
        })
    }
}

/// Calculate percentile from sorted values using linear interpolation
fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }

    let idx = p * (sorted.len() - 1) as f64;
    let lower = idx.floor() as usize;
    let upper = idx.ceil() as usize;
    let frac = idx - lower as f64;

    if upper >= sorted.len() {
        sorted[sorted.len() - 1]
    } else {
        sorted[lower] * (1.0 - frac) + sorted[upper] * frac
    }
}

/// Aggregated metrics for a run or for one endpoint within it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Requests recorded
    pub total_requests: u64,
    /// Requests that succeeded
    pub successful_requests: u64,
    /// Requests that failed
    pub failed_requests: u64,
    /// failed / total, 0.0 when nothing was recorded
    pub error_rate: f64,
    /// total / duration, 0.0 for a zero-length window
    pub requests_per_second: f64,
    /// Measurement window in seconds
    pub duration_seconds: f64,
    /// Response bytes received across all requests
    pub total_bytes_received: u64,

    /// Latency summary; absent when no requests were recorded
    #[serde(flatten)]
    pub latency: Option<LatencySummary>,

    /// Occurrences per observed status code
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub status_code_counts: BTreeMap<u16, u64>,

    /// Failure counts keyed by error kind name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub errors_by_type: BTreeMap<String, u64>,
}

/// Streaming tallies for one metrics bucket
#[derive(Debug, Clone, Default)]
struct Accumulator {
    latencies: Vec<f64>,
    successful: u64,
    failed: u64,
    total_bytes: u64,
    status_codes: BTreeMap<u16, u64>,
    errors_by_type: BTreeMap<String, u64>,
}

impl Accumulator {
    fn record(&mut self, outcome: &RequestOutcome) {
        self.latencies.push(outcome.latency_ms);
        self.total_bytes += outcome.response_size_bytes;
        if let Some(status) = outcome.status_code {
            *self.status_codes.entry(status).or_insert(0) += 1;
        }
        match outcome.error_kind {
            None => self.successful += 1,
            Some(kind) => {
                self.failed += 1;
                *self.errors_by_type.entry(kind.as_str().to_string()).or_insert(0) += 1;
            }
        }
    }

    fn finalize(&self, duration: Duration) -> Metrics {
        let total = self.successful + self.failed;
        let error_rate = if total > 0 {
            self.failed as f64 / total as f64
        } else {
            0.0
        };
        let duration_secs = duration.as_secs_f64();
        let requests_per_second = if duration_secs > 0.0 {
            total as f64 / duration_secs
        } else {
            0.0
        };

        Metrics {
            total_requests: total,
            successful_requests: self.successful,
            failed_requests: self.failed,
            error_rate,
            requests_per_second,
            duration_seconds: duration_secs,
            total_bytes_received: self.total_bytes,
            latency: LatencySummary::from_values(&self.latencies),
            status_code_counts: self.status_codes.clone(),
            errors_by_type: self.errors_by_type.clone(),
        }
    }
}

/// Folds a stream of outcomes into overall and per-endpoint metrics
#[derive(Debug, Clone)]
pub struct MetricsAggregator {
    overall: Accumulator,
    per_endpoint: BTreeMap<String, Accumulator>,
    track_endpoints: bool,
}

impl MetricsAggregator {
    /// Create an aggregator; endpoint tracking is enabled for
    /// multi-endpoint runs only
    pub fn new(track_endpoints: bool) -> Self {
        Self {
            overall: Accumulator::default(),
            per_endpoint: BTreeMap::new(),
            track_endpoints,
        }
    }

    /// Record one outcome
    pub fn record(&mut self, outcome: &RequestOutcome) {
        self.overall.record(outcome);
        if self.track_endpoints {
            if let Some(name) = &outcome.endpoint_name {
                self.per_endpoint
                    .entry(name.clone())
                    .or_default()
                    .record(outcome);
            }
        }
    }

    /// How many outcomes have been recorded
    pub fn total_recorded(&self) -> u64 {
        self.overall.successful + self.overall.failed
    }

    /// (total, successful, failed) recorded so far
    pub fn counts(&self) -> (u64, u64, u64) {
        (
            self.total_recorded(),
            self.overall.successful,
            self.overall.failed,
        )
    }

    /// Snapshot the overall metrics for the given measurement window
    pub fn finalize(&self, duration: Duration) -> Metrics {
        self.overall.finalize(duration)
    }

    /// Snapshot per-endpoint metrics; empty unless endpoint tracking is on
    pub fn finalize_endpoints(&self, duration: Duration) -> BTreeMap<String, Metrics> {
        self.per_endpoint
            .iter()
            .map(|(name, acc)| (name.clone(), acc.finalize(duration)))
            .collect()
    }
}
