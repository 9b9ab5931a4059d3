//! Outcome collection, sampling, and progress publication

use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::metrics::MetricsAggregator;
use crate::outcome::RequestOutcome;
use crate::run::RunProgress;

/// Buffer and sampling limits for a run's outcome pipeline
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Outcome channel buffer size (workers -> collector)
    pub channel_buffer: usize,

    /// The first N requests keep their full outcome in the report sample
    pub sample_head: u64,

    /// Failures beyond the head retained in the sample, at most
    pub sample_max_failures: usize,

    /// Captured request and response bodies are truncated to this many bytes
    pub body_capture_limit: usize,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            channel_buffer: 10_000,
            sample_head: 10,
            sample_max_failures: 100,
            body_capture_limit: 16 * 1024,
        }
    }
}

impl CollectorConfig {
    /// Set the outcome channel buffer size
    pub fn with_channel_buffer(mut self, size: usize) -> Self {
        self.channel_buffer = size;
        self
    }

    /// Set how many leading requests are fully sampled
    pub fn with_sample_head(mut self, head: u64) -> Self {
        self.sample_head = head;
        self
    }

    /// Set the retained-failure cap
    pub fn with_sample_max_failures(mut self, max: usize) -> Self {
        self.sample_max_failures = max;
        self
    }

    /// Set the body capture truncation limit
    pub fn with_body_capture_limit(mut self, limit: usize) -> Self {
        self.body_capture_limit = limit;
        self
    }
}

/// Bounded retention of individual outcomes for the final report.
///
/// Keeps every outcome in the head window plus failures up to the cap, so
/// reports stay small no matter how large the run.
#[derive(Debug)]
pub(crate) struct SampleBuffer {
    head: u64,
    max_failures: usize,
    retained_failures: usize,
    records: Vec<RequestOutcome>,
}

impl SampleBuffer {
    pub(crate) fn new(head: u64, max_failures: usize) -> Self {
        Self {
            head,
            max_failures,
            retained_failures: 0,
            records: Vec::new(),
        }
    }

    /// Retain the outcome if it falls in the head window or under the
    /// failure cap; drop it otherwise
    pub(crate) fn offer(&mut self, outcome: RequestOutcome) {
        if outcome.request_number <= self.head {
            self.records.push(outcome);
        } else if !outcome.is_success() && self.retained_failures < self.max_failures {
            self.retained_failures += 1;
            self.records.push(outcome);
        }
    }

    /// The retained sample in dispatch order
    pub(crate) fn into_records(mut self) -> Vec<RequestOutcome> {
        self.records.sort_by_key(|outcome| outcome.request_number);
        self.records
    }
}

/// Drains the outcome channel for one run.
///
/// Running as a single task makes outcome recording serial, so the
/// aggregator needs no lock; workers only ever touch the channel sender.
pub(crate) struct Collector {
    aggregator: MetricsAggregator,
    samples: SampleBuffer,
    progress_tx: Arc<watch::Sender<RunProgress>>,
}

impl Collector {
    pub(crate) fn new(
        track_endpoints: bool,
        config: &CollectorConfig,
        progress_tx: Arc<watch::Sender<RunProgress>>,
    ) -> Self {
        Self {
            aggregator: MetricsAggregator::new(track_endpoints),
            samples: SampleBuffer::new(config.sample_head, config.sample_max_failures),
            progress_tx,
        }
    }

    /// Record outcomes until every sender is gone, publishing progress
    /// after each one
    pub(crate) async fn collect(
        mut self,
        mut outcomes_rx: mpsc::Receiver<RequestOutcome>,
    ) -> (MetricsAggregator, Vec<RequestOutcome>) {
        while let Some(outcome) = outcomes_rx.recv().await {
            self.aggregator.record(&outcome);
            let (total, successful, failed) = self.aggregator.counts();
            self.progress_tx.send_modify(|progress| {
                progress.requests_completed = total;
                progress.successful_requests = successful;
                progress.failed_requests = failed;
            });
            self.samples.offer(outcome);
        }
        (self.aggregator, self.samples.into_records())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn ok(n: u64) -> RequestOutcome {
        RequestOutcome::success(n, 1.0, 200, 0)
    }

    fn failed(n: u64) -> RequestOutcome {
        RequestOutcome::failure(n, 1.0, ErrorKind::Connect, "refused")
    }

    #[test]
    fn test_collector_config_defaults() {
        let config = CollectorConfig::default();
        assert_eq!(config.channel_buffer, 10_000);
        assert_eq!(config.sample_head, 10);
        assert_eq!(config.sample_max_failures, 100);
        assert_eq!(config.body_capture_limit, 16 * 1024);
    }

    #[test]
    fn test_collector_config_builders() {
        let config = CollectorConfig::default()
            .with_channel_buffer(500)
            .with_sample_head(3)
            .with_sample_max_failures(7)
            .with_body_capture_limit(1024);
        assert_eq!(config.channel_buffer, 500);
        assert_eq!(config.sample_head, 3);
        assert_eq!(config.sample_max_failures, 7);
        assert_eq!(config.body_capture_limit, 1024);
    }

    #[test]
    fn test_sample_buffer_keeps_head() {
        let mut buffer = SampleBuffer::new(3, 10);
        for n in 1..=5 {
            buffer.offer(ok(n));
        }
        let records = buffer.into_records();
        let numbers: Vec<u64> = records.iter().map(|o| o.request_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn test_sample_buffer_caps_failures() {
        let mut buffer = SampleBuffer::new(0, 2);
        for n in 1..=5 {
            buffer.offer(failed(n));
        }
        assert_eq!(buffer.into_records().len(), 2);
    }

    #[test]
    fn test_sample_buffer_head_failure_does_not_consume_cap() {
        let mut buffer = SampleBuffer::new(1, 1);
        buffer.offer(failed(1));
        buffer.offer(failed(5));
        buffer.offer(failed(6));
        // Head slot plus one capped failure
        assert_eq!(buffer.into_records().len(), 2);
    }

    #[test]
    fn test_sample_buffer_orders_by_request_number() {
        let mut buffer = SampleBuffer::new(2, 10);
        buffer.offer(failed(9));
        buffer.offer(ok(1));
        buffer.offer(ok(2));
        let numbers: Vec<u64> = buffer
            .into_records()
            .iter()
            .map(|o| o.request_number)
            .collect();
        assert_eq!(numbers, vec![1, 2, 9]);
    }

    #[tokio::test]
    async fn test_collector_drains_channel_and_publishes_progress() {
        let (progress_tx, progress_rx) = watch::channel(RunProgress::pending());
        let collector = Collector::new(
            false,
            &CollectorConfig::default(),
            Arc::new(progress_tx),
        );
        let (tx, rx) = mpsc::channel(16);
        let handle = tokio::spawn(collector.collect(rx));

        tx.send(ok(1)).await.unwrap();
        tx.send(failed(2)).await.unwrap();
        tx.send(ok(3)).await.unwrap();
        drop(tx);

        let (aggregator, sampled) = handle.await.unwrap();
        assert_eq!(aggregator.counts(), (3, 2, 1));
        assert_eq!(sampled.len(), 3);

        let progress = *progress_rx.borrow();
        assert_eq!(progress.requests_completed, 3);
        assert_eq!(progress.successful_requests, 2);
        assert_eq!(progress.failed_requests, 1);
    }
}
