//! Builder pattern for Worker construction

use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::client::{HttpClient, RequestResolver};
use crate::error::{EngineError, EngineResult};
use crate::limiter::RequestRateLimiter;
use crate::outcome::RequestOutcome;
use crate::selector::EndpointSelector;
use crate::spec::{DEFAULT_TIMEOUT_SECS, ResolvedEndpoint};

use super::executor::Worker;

const DEFAULT_BODY_CAPTURE_LIMIT: usize = 16 * 1024;

/// Builder for creating Worker instances
///
/// # Example
/// ```ignore
/// let worker = WorkerBuilder::new(0)
///     .client(client)
///     .endpoints(endpoints)
///     .selector(selector)
///     .budget(counter, 100)
///     .outcomes_tx(tx)
///     .build()?;
/// ```
pub struct WorkerBuilder {
    id: usize,
    client: Option<Arc<dyn HttpClient>>,
    resolver: Option<Arc<dyn RequestResolver>>,
    endpoints: Option<Arc<Vec<ResolvedEndpoint>>>,
    selector: Option<Arc<EndpointSelector>>,
    limiter: Option<Arc<RequestRateLimiter>>,
    counter: Option<Arc<AtomicU64>>,
    total_requests: Option<u64>,
    timeout: Option<Duration>,
    detail_head: u64,
    body_capture_limit: usize,
    outcomes_tx: Option<mpsc::Sender<RequestOutcome>>,
}

impl WorkerBuilder {
    /// Create a new builder with the given worker ID
    pub fn new(id: usize) -> Self {
        Self {
            id,
            client: None,
            resolver: None,
            endpoints: None,
            selector: None,
            limiter: None,
            counter: None,
            total_requests: None,
            timeout: None,
            detail_head: 0,
            body_capture_limit: DEFAULT_BODY_CAPTURE_LIMIT,
            outcomes_tx: None,
        }
    }

    /// Set the HTTP client
    pub fn client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Set the per-request rewrite hook
    pub fn resolver(mut self, resolver: Arc<dyn RequestResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Set the resolved endpoint list
    pub fn endpoints(mut self, endpoints: Arc<Vec<ResolvedEndpoint>>) -> Self {
        self.endpoints = Some(endpoints);
        self
    }

    /// Set the endpoint selector
    pub fn selector(mut self, selector: Arc<EndpointSelector>) -> Self {
        self.selector = Some(selector);
        self
    }

    /// Set the shared rate limiter; unlimited when unset
    pub fn limiter(mut self, limiter: Arc<RequestRateLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// Set the shared dispatch counter and the run's request budget
    pub fn budget(mut self, counter: Arc<AtomicU64>, total_requests: u64) -> Self {
        self.counter = Some(counter);
        self.total_requests = Some(total_requests);
        self
    }

    /// Set the per-request deadline
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Capture exchange detail for successful requests up to this number
    pub fn detail_head(mut self, head: u64) -> Self {
        self.detail_head = head;
        self
    }

    /// Truncate captured bodies to this many bytes
    pub fn body_capture_limit(mut self, limit: usize) -> Self {
        self.body_capture_limit = limit;
        self
    }

    /// Set the outcome channel sender
    pub fn outcomes_tx(mut self, tx: mpsc::Sender<RequestOutcome>) -> Self {
        self.outcomes_tx = Some(tx);
        self
    }

    /// Build the Worker
    ///
    /// # Errors
    /// Returns an error if any required field is missing.
    pub fn build(self) -> EngineResult<Worker> {
        let client = self.client.ok_or(EngineError::missing_config("client"))?;
        let endpoints = self
            .endpoints
            .ok_or(EngineError::missing_config("endpoints"))?;
        let selector = self
            .selector
            .ok_or(EngineError::missing_config("selector"))?;
        let counter = self.counter.ok_or(EngineError::missing_config("counter"))?;
        let total_requests = self
            .total_requests
            .ok_or(EngineError::missing_config("total_requests"))?;
        let outcomes_tx = self
            .outcomes_tx
            .ok_or(EngineError::missing_config("outcomes_tx"))?;

        Ok(Worker {
            id: self.id,
            client,
            resolver: self.resolver,
            endpoints,
            selector,
            limiter: self
                .limiter
                .unwrap_or_else(|| Arc::new(RequestRateLimiter::unlimited())),
            counter,
            total_requests,
            timeout: self
                .timeout
                .unwrap_or_else(|| Duration::from_secs_f64(DEFAULT_TIMEOUT_SECS)),
            detail_head: self.detail_head,
            body_capture_limit: self.body_capture_limit,
            outcomes_tx,
        })
    }
}
