//! Run execution: worker pool, collector task, and verdict

use std::sync::atomic::AtomicU64;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

use crate::client::{HttpClient, RequestResolver, ReqwestClient};
use crate::error::{EngineError, EngineResult};
use crate::limiter::RequestRateLimiter;
use crate::outcome::RequestOutcome;
use crate::run::{Run, RunId, RunProgress, RunStatus};
use crate::selector::EndpointSelector;
use crate::spec::{ResolvedEndpoint, TestSpec};
use crate::worker::{Worker, WorkerBuilder};

use super::collector::{Collector, CollectorConfig};

/// Cloneable handle for observing and cancelling a run while it executes
#[derive(Debug, Clone)]
pub struct RunHandle {
    id: RunId,
    cancel_tx: Arc<watch::Sender<bool>>,
    progress_rx: watch::Receiver<RunProgress>,
}

impl RunHandle {
    pub(crate) fn new(
        id: RunId,
        cancel_tx: Arc<watch::Sender<bool>>,
        progress_rx: watch::Receiver<RunProgress>,
    ) -> Self {
        Self {
            id,
            cancel_tx,
            progress_rx,
        }
    }

    /// The id of the run this handle observes
    pub fn id(&self) -> RunId {
        self.id
    }

    /// Request cancellation.
    ///
    /// Workers stop claiming new requests; whatever is already in flight
    /// finishes and is recorded. Cancelling more than once, or after the
    /// run ended, is a no-op.
    pub fn cancel(&self) {
        let _ = self.cancel_tx.send(true);
    }

    /// The latest progress snapshot
    pub fn progress(&self) -> RunProgress {
        *self.progress_rx.borrow()
    }

    /// The run's current lifecycle state
    pub fn status(&self) -> RunStatus {
        self.progress_rx.borrow().status
    }

    /// Outcomes recorded so far
    pub fn requests_completed(&self) -> u64 {
        self.progress_rx.borrow().requests_completed
    }

    /// A watch receiver for awaiting progress changes
    pub fn subscribe(&self) -> watch::Receiver<RunProgress> {
        self.progress_rx.clone()
    }
}

/// Everything resolved up front, shared by every worker
struct RunSetup {
    endpoints: Arc<Vec<ResolvedEndpoint>>,
    selector: Arc<EndpointSelector>,
    limiter: Arc<RequestRateLimiter>,
    client: Arc<dyn HttpClient>,
}

/// Executes one run end to end.
///
/// Built by [`RunnerBuilder`](super::RunnerBuilder) together with the
/// [`RunHandle`] that observes it. Consumed by [`Runner::run`].
pub struct Runner {
    pub(crate) id: RunId,
    pub(crate) spec: TestSpec,
    pub(crate) client: Option<Arc<dyn HttpClient>>,
    pub(crate) resolver: Option<Arc<dyn RequestResolver>>,
    pub(crate) collector_config: CollectorConfig,
    pub(crate) progress_tx: Arc<watch::Sender<RunProgress>>,
    pub(crate) cancel_rx: watch::Receiver<bool>,
}

impl Runner {
    /// Execute the run to a terminal state.
    ///
    /// Never returns an error: anything that prevents dispatch produces a
    /// report with status `Failed` and the cause in `error_message`.
    pub async fn run(self) -> Run {
        let Runner {
            id,
            spec,
            client,
            resolver,
            collector_config,
            progress_tx,
            cancel_rx,
        } = self;

        let mut run = Run::pending(id, spec);
        run.started_at = Some(Utc::now());

        tracing::info!(
            run_id = %id,
            name = %run.spec.name,
            total_requests = run.spec.total_requests,
            concurrency = run.spec.concurrency,
            rate = ?run.spec.requests_per_second,
            "run starting"
        );

        let setup = match prepare(&run.spec, client) {
            Ok(setup) => setup,
            Err(error) => {
                tracing::error!(run_id = %id, error = %error, "run setup failed");
                return finish_failed(run, &progress_tx, error.to_string());
            }
        };

        let counter = Arc::new(AtomicU64::new(0));
        let (outcomes_tx, outcomes_rx) = mpsc::channel(collector_config.channel_buffer);
        let workers = match build_workers(
            &run.spec,
            &setup,
            &collector_config,
            resolver.as_ref(),
            &counter,
            &outcomes_tx,
        ) {
            Ok(workers) => workers,
            Err(error) => {
                tracing::error!(run_id = %id, error = %error, "worker construction failed");
                return finish_failed(run, &progress_tx, error.to_string());
            }
        };

        progress_tx.send_modify(|progress| progress.status = RunStatus::Running);
        let started = Instant::now();

        let collector = Collector::new(
            run.spec.is_multi_endpoint(),
            &collector_config,
            Arc::clone(&progress_tx),
        );
        let collector_handle = tokio::spawn(collector.collect(outcomes_rx));

        let mut worker_handles = Vec::with_capacity(workers.len());
        for worker in workers {
            let cancel = cancel_rx.clone();
            worker_handles.push(tokio::spawn(worker.run(cancel)));
        }
        // Workers hold the only remaining senders; the collector stops once
        // the last one exits.
        drop(outcomes_tx);

        let mut panicked = 0usize;
        for (worker_id, handle) in worker_handles.into_iter().enumerate() {
            match handle.await {
                Ok(summary) => {
                    tracing::debug!(
                        run_id = %id,
                        worker_id,
                        dispatched = summary.dispatched,
                        failed = summary.failed,
                        "worker joined"
                    );
                }
                Err(error) => {
                    panicked += 1;
                    tracing::warn!(run_id = %id, worker_id, error = %error, "worker task panicked");
                }
            }
        }

        let (aggregator, sampled) = match collector_handle.await {
            Ok(result) => result,
            Err(error) => {
                tracing::error!(run_id = %id, error = %error, "collector task panicked");
                let error = EngineError::dispatch(format!("collector task panicked: {error}"));
                return finish_failed(run, &progress_tx, error.to_string());
            }
        };
        let duration = started.elapsed();
        let total_recorded = aggregator.total_recorded();

        if panicked == run.spec.concurrency && total_recorded == 0 {
            let error = EngineError::dispatch(format!(
                "all {panicked} workers panicked before recording any outcome"
            ));
            return finish_failed(run, &progress_tx, error.to_string());
        }

        run.requests_completed = total_recorded;
        run.sampled_requests = sampled;
        let metrics = aggregator.finalize(duration);
        if run.spec.is_multi_endpoint() {
            run.endpoint_metrics = aggregator.finalize_endpoints(duration);
        }

        let was_cancelled = *cancel_rx.borrow() && total_recorded < run.spec.total_requests;
        if was_cancelled {
            run.status = RunStatus::Cancelled;
        } else {
            if total_recorded < run.spec.total_requests {
                tracing::warn!(
                    run_id = %id,
                    expected = run.spec.total_requests,
                    recorded = total_recorded,
                    "run ended short of its request budget"
                );
            }
            run.status = RunStatus::Completed;
            let report = run.spec.thresholds.evaluate(&metrics);
            run.passed = Some(report.passed);
            run.failure_reasons = report.reasons;
        }
        run.metrics = Some(metrics);
        run.completed_at = Some(Utc::now());
        progress_tx.send_modify(|progress| progress.status = run.status);

        tracing::info!(
            run_id = %id,
            status = %run.status,
            requests_completed = run.requests_completed,
            passed = ?run.passed,
            duration_secs = duration.as_secs_f64(),
            "run finished"
        );
        run
    }
}

/// Resolve endpoints and assemble the pieces every worker shares
fn prepare(spec: &TestSpec, client: Option<Arc<dyn HttpClient>>) -> EngineResult<RunSetup> {
    spec.validate()?;
    let endpoints = spec.resolve_endpoints()?;
    let selector = EndpointSelector::for_run(
        &endpoints,
        spec.distribution_strategy(),
        spec.total_requests,
    );
    let client = match client {
        Some(client) => client,
        None => Arc::new(ReqwestClient::new()?),
    };
    Ok(RunSetup {
        endpoints: Arc::new(endpoints),
        selector: Arc::new(selector),
        limiter: Arc::new(RequestRateLimiter::new(spec.requests_per_second)),
        client,
    })
}

fn build_workers(
    spec: &TestSpec,
    setup: &RunSetup,
    config: &CollectorConfig,
    resolver: Option<&Arc<dyn RequestResolver>>,
    counter: &Arc<AtomicU64>,
    outcomes_tx: &mpsc::Sender<RequestOutcome>,
) -> EngineResult<Vec<Worker>> {
    let mut workers = Vec::with_capacity(spec.concurrency);
    for worker_id in 0..spec.concurrency {
        let mut builder = WorkerBuilder::new(worker_id)
            .client(Arc::clone(&setup.client))
            .endpoints(Arc::clone(&setup.endpoints))
            .selector(Arc::clone(&setup.selector))
            .limiter(Arc::clone(&setup.limiter))
            .budget(Arc::clone(counter), spec.total_requests)
            .timeout(spec.timeout())
            .detail_head(config.sample_head)
            .body_capture_limit(config.body_capture_limit)
            .outcomes_tx(outcomes_tx.clone());
        if let Some(resolver) = resolver {
            builder = builder.resolver(Arc::clone(resolver));
        }
        workers.push(builder.build()?);
    }
    Ok(workers)
}

/// Stamp the report as failed and publish the terminal state
fn finish_failed(
    mut run: Run,
    progress_tx: &watch::Sender<RunProgress>,
    message: String,
) -> Run {
    run.status = RunStatus::Failed;
    run.error_message = Some(message);
    run.completed_at = Some(Utc::now());
    progress_tx.send_modify(|progress| progress.status = RunStatus::Failed);
    run
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("id", &self.id)
            .field("spec", &self.spec.name)
            .field("has_client", &self.client.is_some())
            .field("has_resolver", &self.resolver.is_some())
            .field("collector_config", &self.collector_config)
            .finish()
    }
}
