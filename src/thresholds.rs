//! Pass/fail thresholds evaluated against final metrics
//!
//! Evaluation is pure: it reads a [`Metrics`] snapshot and produces a
//! verdict with one human-readable reason per violated threshold. A
//! threshold violation makes the run fail its gate, it never aborts
//! dispatch.

use serde::{Deserialize, Serialize};

use crate::metrics::Metrics;

/// Optional pass/fail boundaries for a run.
///
/// Unset fields are not evaluated; a spec with no thresholds always passes.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Thresholds {
    /// Highest acceptable p50 latency in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_latency_p50_ms: Option<f64>,

    /// Highest acceptable p95 latency in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_latency_p95_ms: Option<f64>,

    /// Highest acceptable p99 latency in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_latency_p99_ms: Option<f64>,

    /// Highest acceptable error rate, 0.0 to 1.0
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_error_rate: Option<f64>,

    /// Lowest acceptable throughput in requests per second
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_requests_per_second: Option<f64>,
}

/// The verdict from evaluating thresholds against metrics
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdReport {
    /// Whether every configured threshold was met
    pub passed: bool,
    /// One reason per violated threshold, in declaration order
    pub reasons: Vec<String>,
}

impl Thresholds {
    /// Whether no threshold is configured
    pub fn is_empty(&self) -> bool {
        self.max_latency_p50_ms.is_none()
            && self.max_latency_p95_ms.is_none()
            && self.max_latency_p99_ms.is_none()
            && self.max_error_rate.is_none()
            && self.min_requests_per_second.is_none()
    }

    /// Set the p50 latency ceiling
    pub fn with_max_latency_p50_ms(mut self, limit: f64) -> Self {
        self.max_latency_p50_ms = Some(limit);
        self
    }

    /// Set the p95 latency ceiling
    pub fn with_max_latency_p95_ms(mut self, limit: f64) -> Self {
        self.max_latency_p95_ms = Some(limit);
        self
    }

    /// Set the p99 latency ceiling
    pub fn with_max_latency_p99_ms(mut self, limit: f64) -> Self {
        self.max_latency_p99_ms = Some(limit);
        self
    }

    /// Set the error-rate ceiling
    pub fn with_max_error_rate(mut self, limit: f64) -> Self {
        self.max_error_rate = Some(limit);
        self
    }

    /// Set the throughput floor
    pub fn with_min_requests_per_second(mut self, limit: f64) -> Self {
        self.min_requests_per_second = Some(limit);
        self
    }

    /// Evaluate every configured threshold against the given metrics.
    ///
    /// Latency thresholds configured for a run that recorded no requests
    /// count as violated, with a reason saying the observation is missing.
    /// Values exactly at a limit pass.
    pub fn evaluate(&self, metrics: &Metrics) -> ThresholdReport {
        let mut reasons = Vec::new();

        check_max(
            "latency_p50_ms",
            metrics.latency.map(|l| l.latency_p50_ms),
            self.max_latency_p50_ms,
            &mut reasons,
        );
        check_max(
            "latency_p95_ms",
            metrics.latency.map(|l| l.latency_p95_ms),
            self.max_latency_p95_ms,
            &mut reasons,
        );
        check_max(
            "latency_p99_ms",
            metrics.latency.map(|l| l.latency_p99_ms),
            self.max_latency_p99_ms,
            &mut reasons,
        );
        check_max(
            "error_rate",
            Some(metrics.error_rate),
            self.max_error_rate,
            &mut reasons,
        );

        if let Some(limit) = self.min_requests_per_second {
            if metrics.total_requests == 0 {
                reasons.push(format!(
                    "requests_per_second unavailable (no requests completed), minimum {limit:.2}"
                ));
            } else if metrics.requests_per_second < limit {
                reasons.push(format!(
                    "requests_per_second {:.2} below minimum {limit:.2}",
                    metrics.requests_per_second
                ));
            }
        }

        ThresholdReport {
            passed: reasons.is_empty(),
            reasons,
        }
    }
}

fn check_max(name: &str, observed: Option<f64>, limit: Option<f64>, reasons: &mut Vec<String>) {
    let Some(limit) = limit else { return };
    match observed {
        Some(value) if value > limit => {
            reasons.push(format!("{name} {value:.2} exceeded limit {limit:.2}"));
        }
        Some(_) => {}
        None => {
            reasons.push(format!(
                "{name} unavailable (no requests completed), limit {limit:.2}"
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{LatencySummary, MetricsAggregator};
    use crate::outcome::RequestOutcome;
    use std::time::Duration;

    fn metrics_with_latency(p50: f64, p95: f64, p99: f64) -> Metrics {
        let mut metrics = MetricsAggregator::new(false).finalize(Duration::from_secs(1));
        metrics.total_requests = 100;
        metrics.successful_requests = 100;
        metrics.requests_per_second = 100.0;
        metrics.latency = Some(LatencySummary {
            latency_min_ms: 1.0,
            latency_max_ms: p99,
            latency_mean_ms: p50,
            latency_p50_ms: p50,
            latency_p90_ms: p95,
            latency_p95_ms: p95,
            latency_p99_ms: p99,
        });
        metrics
    }

    #[test]
    fn test_empty_thresholds_pass() {
        let report = Thresholds::default().evaluate(&metrics_with_latency(50.0, 90.0, 99.0));
        assert!(report.passed);
        assert!(report.reasons.is_empty());
    }

    #[test]
    fn test_latency_threshold_exceeded() {
        let thresholds = Thresholds::default().with_max_latency_p95_ms(80.0);
        let report = thresholds.evaluate(&metrics_with_latency(50.0, 90.0, 99.0));
        assert!(!report.passed);
        assert_eq!(report.reasons.len(), 1);
        assert!(report.reasons[0].contains("latency_p95_ms"));
        assert!(report.reasons[0].contains("exceeded"));
    }

    #[test]
    fn test_value_at_limit_passes() {
        let thresholds = Thresholds::default()
            .with_max_latency_p50_ms(50.0)
            .with_max_error_rate(0.0);
        let report = thresholds.evaluate(&metrics_with_latency(50.0, 90.0, 99.0));
        assert!(report.passed);
    }

    #[test]
    fn test_error_rate_threshold() {
        let mut metrics = metrics_with_latency(50.0, 90.0, 99.0);
        metrics.failed_requests = 10;
        metrics.error_rate = 0.1;
        let thresholds = Thresholds::default().with_max_error_rate(0.05);
        let report = thresholds.evaluate(&metrics);
        assert!(!report.passed);
        assert!(report.reasons[0].contains("error_rate 0.10 exceeded limit 0.05"));
    }

    #[test]
    fn test_zero_error_rate_limit_rejects_any_failure() {
        let mut metrics = metrics_with_latency(50.0, 90.0, 99.0);
        metrics.successful_requests = 99;
        metrics.failed_requests = 1;
        metrics.error_rate = 0.01;
        let thresholds = Thresholds::default().with_max_error_rate(0.0);
        let report = thresholds.evaluate(&metrics);
        assert!(!report.passed);
        assert_eq!(report.reasons.len(), 1);
        assert!(report.reasons[0].contains("error_rate"));
    }

    #[test]
    fn test_min_throughput_threshold() {
        let mut metrics = metrics_with_latency(50.0, 90.0, 99.0);
        metrics.requests_per_second = 20.0;
        let thresholds = Thresholds::default().with_min_requests_per_second(25.0);
        let report = thresholds.evaluate(&metrics);
        assert!(!report.passed);
        assert!(report.reasons[0].contains("below minimum 25.00"));
    }

    #[test]
    fn test_reasons_follow_declaration_order() {
        let mut metrics = metrics_with_latency(100.0, 200.0, 300.0);
        metrics.error_rate = 1.0;
        metrics.requests_per_second = 1.0;
        let thresholds = Thresholds::default()
            .with_min_requests_per_second(50.0)
            .with_max_error_rate(0.5)
            .with_max_latency_p50_ms(10.0);
        let report = thresholds.evaluate(&metrics);
        assert_eq!(report.reasons.len(), 3);
        assert!(report.reasons[0].contains("latency_p50_ms"));
        assert!(report.reasons[1].contains("error_rate"));
        assert!(report.reasons[2].contains("requests_per_second"));
    }

    #[test]
    fn test_latency_threshold_with_no_requests() {
        let empty = MetricsAggregator::new(false).finalize(Duration::from_secs(1));
        let thresholds = Thresholds::default().with_max_latency_p99_ms(100.0);
        let report = thresholds.evaluate(&empty);
        assert!(!report.passed);
        assert!(report.reasons[0].contains("unavailable"));
    }

    #[test]
    fn test_no_requests_passes_error_rate_only_gate() {
        let empty = MetricsAggregator::new(false).finalize(Duration::from_secs(1));
        let thresholds = Thresholds::default().with_max_error_rate(0.1);
        assert!(thresholds.evaluate(&empty).passed);
    }

    #[test]
    fn test_evaluation_on_aggregated_metrics() {
        let mut aggregator = MetricsAggregator::new(false);
        for n in 1..=4 {
            aggregator.record(&RequestOutcome::success(n, 10.0 * n as f64, 200, 0));
        }
        let metrics = aggregator.finalize(Duration::from_secs(2));
        let thresholds = Thresholds::default()
            .with_max_latency_p50_ms(30.0)
            .with_min_requests_per_second(1.0);
        assert!(thresholds.evaluate(&metrics).passed);
    }

    #[test]
    fn test_serialization_skips_unset_fields() {
        assert_eq!(serde_json::to_string(&Thresholds::default()).unwrap(), "{}");
        let json =
            serde_json::to_string(&Thresholds::default().with_max_error_rate(0.01)).unwrap();
        assert_eq!(json, "{\"max_error_rate\":0.01}");
    }
}
