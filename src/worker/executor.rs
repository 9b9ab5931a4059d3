//! Worker execution loop

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

use crate::client::{Exchange, HttpClient, PreparedRequest, RequestResolver, RequestValues};
use crate::error::ErrorKind;
use crate::limiter::RequestRateLimiter;
use crate::outcome::{ExchangeDetail, RequestOutcome};
use crate::selector::EndpointSelector;
use crate::spec::ResolvedEndpoint;

use super::summary::WorkerSummary;

/// Worker executes requests in a loop: claim -> select -> execute -> report.
///
/// Workers are stateless tokio tasks managed by the Runner. They share the
/// HTTP client, endpoint list, selector, limiter, and request counter via
/// Arc, and send every outcome through an mpsc channel to the collector.
pub struct Worker {
    /// Worker identifier, unique within the run
    pub(super) id: usize,

    /// HTTP client (shared across workers)
    pub(super) client: Arc<dyn HttpClient>,

    /// Optional per-request rewrite hook
    pub(super) resolver: Option<Arc<dyn RequestResolver>>,

    /// Resolved endpoints, indexed by the selector
    pub(super) endpoints: Arc<Vec<ResolvedEndpoint>>,

    /// Maps request numbers onto endpoint indices
    pub(super) selector: Arc<EndpointSelector>,

    /// Shared request-start limiter
    pub(super) limiter: Arc<RequestRateLimiter>,

    /// Shared dispatch counter for claiming request numbers
    pub(super) counter: Arc<AtomicU64>,

    /// The run's request budget
    pub(super) total_requests: u64,

    /// Per-request deadline
    pub(super) timeout: Duration,

    /// Successful requests up to this number capture exchange detail
    pub(super) detail_head: u64,

    /// Captured bodies are truncated to this many bytes
    pub(super) body_capture_limit: usize,

    /// Channel sender for outcomes
    pub(super) outcomes_tx: mpsc::Sender<RequestOutcome>,
}

impl Worker {
    /// Run the worker loop until the budget is drained or the run is
    /// cancelled.
    ///
    /// Cancellation is observed before each claim and while waiting on the
    /// rate limiter. A request already dispatched when cancellation arrives
    /// finishes and its outcome is still reported.
    pub async fn run(self, mut cancel: watch::Receiver<bool>) -> WorkerSummary {
        let mut summary = WorkerSummary::new();
        tracing::debug!(worker_id = self.id, "worker started");

        loop {
            // Check for cancellation BEFORE claiming a request number
            if *cancel.borrow() {
                tracing::debug!(worker_id = self.id, "worker observed cancellation");
                break;
            }

            let Some(request_number) = self.claim_next() else {
                tracing::debug!(worker_id = self.id, "request budget drained, worker stopping");
                break;
            };

            tokio::select! {
                biased;

                _ = cancelled(&mut cancel) => {
                    tracing::debug!(
                        worker_id = self.id,
                        request_number,
                        "worker cancelled while awaiting rate limiter"
                    );
                    break;
                }

                _ = self.limiter.acquire() => {}
            }

            let outcome = self.execute_one(request_number).await;
            summary.record(&outcome);
            if let Some(error) = &outcome.error {
                tracing::debug!(
                    worker_id = self.id,
                    request_number,
                    error = %error,
                    "request failed"
                );
            }

            if self.outcomes_tx.send(outcome).await.is_err() {
                tracing::debug!(worker_id = self.id, "outcome channel closed, worker stopping");
                break;
            }
        }

        tracing::debug!(
            worker_id = self.id,
            dispatched = summary.dispatched,
            failed = summary.failed,
            "worker finished"
        );
        summary
    }

    /// Claim the next request number, or `None` when the budget is drained
    fn claim_next(&self) -> Option<u64> {
        let claimed = self.counter.fetch_add(1, Ordering::SeqCst);
        if claimed >= self.total_requests {
            // Rollback: we over-claimed due to concurrent access near the
            // limit. Keeps the counter accurate for other workers.
            self.counter.fetch_sub(1, Ordering::SeqCst);
            return None;
        }
        Some(claimed + 1)
    }

    /// Execute one request and classify the result
    async fn execute_one(&self, request_number: u64) -> RequestOutcome {
        // 1. Pick the endpoint serving this request number
        let endpoint = &self.endpoints[self.selector.select(request_number)];

        // 2. Apply per-request overrides, if a resolver is configured
        let values = match &self.resolver {
            Some(resolver) => match resolver.resolve(request_number, endpoint).await {
                Ok(values) => values,
                Err(e) => {
                    return RequestOutcome::failure(
                        request_number,
                        0.0,
                        ErrorKind::Transport,
                        format!("resolver failed: {e}"),
                    )
                    .with_endpoint(endpoint.name.clone());
                }
            },
            None => RequestValues::default(),
        };
        let prepared = prepare(request_number, endpoint, values);

        // 3. Execute under the per-request deadline and measure latency
        let start = Instant::now();
        let result = tokio::time::timeout(self.timeout, self.client.execute(&prepared)).await;
        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;

        // 4. Classify. Failures always keep request evidence; successes only
        //    within the sampled head.
        let outcome = match result {
            Ok(Ok(exchange)) => {
                if endpoint.expected.matches(exchange.status) {
                    let mut outcome = RequestOutcome::success(
                        request_number,
                        latency_ms,
                        exchange.status,
                        exchange.body.len() as u64,
                    );
                    if request_number <= self.detail_head {
                        outcome = outcome.with_detail(self.capture(&prepared, Some(&exchange)));
                    }
                    outcome
                } else {
                    RequestOutcome::failure(
                        request_number,
                        latency_ms,
                        ErrorKind::UnexpectedStatus,
                        format!("unexpected status {}", exchange.status),
                    )
                    .with_status(exchange.status)
                    .with_response_size(exchange.body.len() as u64)
                    .with_detail(self.capture(&prepared, Some(&exchange)))
                }
            }
            Ok(Err(error)) => RequestOutcome::failure(
                request_number,
                latency_ms,
                error.kind(),
                error.to_string(),
            )
            .with_detail(self.capture(&prepared, None)),
            Err(_) => RequestOutcome::failure(
                request_number,
                latency_ms,
                ErrorKind::Timeout,
                format!("timed out after {:.1}s", self.timeout.as_secs_f64()),
            )
            .with_detail(self.capture(&prepared, None)),
        };
        outcome.with_endpoint(endpoint.name.clone())
    }

    fn capture(&self, prepared: &PreparedRequest, exchange: Option<&Exchange>) -> ExchangeDetail {
        ExchangeDetail {
            request_headers: prepared.headers.clone(),
            request_body: prepared
                .body
                .as_deref()
                .map(|body| truncate_utf8(body, self.body_capture_limit)),
            response_headers: exchange.map(|e| e.headers.clone()).unwrap_or_default(),
            response_body: exchange
                .map(|e| truncate_utf8(&String::from_utf8_lossy(&e.body), self.body_capture_limit)),
        }
    }
}

/// Resolves on a dropped cancellation sender only after cancellation can no
/// longer arrive, never spuriously
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    if cancel.wait_for(|cancelled| *cancelled).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Merge endpoint values with resolver overrides into a dispatchable request
fn prepare(
    request_number: u64,
    endpoint: &ResolvedEndpoint,
    values: RequestValues,
) -> PreparedRequest {
    let mut headers = endpoint.headers.clone();
    for (name, value) in values.headers {
        match headers
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(&name))
        {
            Some(slot) => slot.1 = value,
            None => headers.push((name, value)),
        }
    }
    PreparedRequest {
        request_number,
        url: values.url.unwrap_or_else(|| endpoint.url.clone()),
        method: endpoint.method,
        headers,
        body: values.body.or_else(|| endpoint.body.clone()),
    }
}

/// Truncate to at most `limit` bytes without splitting a character
fn truncate_utf8(text: &str, limit: usize) -> String {
    if text.len() <= limit {
        return text.to_string();
    }
    let mut end = limit;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("id", &self.id)
            .field("endpoints", &self.endpoints.len())
            .field("total_requests", &self.total_requests)
            .field("timeout", &self.timeout)
            .field("limiter", &self.limiter)
            .finish()
    }
}
