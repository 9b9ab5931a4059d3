//! Builder wiring a spec, transport, and channels into a runnable pair

use std::sync::Arc;

use tokio::sync::watch;

use crate::client::{HttpClient, RequestResolver};
use crate::error::{EngineError, EngineResult};
use crate::run::{RunId, RunProgress};
use crate::spec::TestSpec;

use super::collector::CollectorConfig;
use super::executor::{RunHandle, Runner};

/// Builder for a [`Runner`] and its paired [`RunHandle`]
#[derive(Default)]
pub struct RunnerBuilder {
    spec: Option<TestSpec>,
    client: Option<Arc<dyn HttpClient>>,
    resolver: Option<Arc<dyn RequestResolver>>,
    collector_config: CollectorConfig,
}

impl RunnerBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self {
            spec: None,
            client: None,
            resolver: None,
            collector_config: CollectorConfig::default(),
        }
    }

    /// The spec to execute (required)
    pub fn spec(mut self, spec: TestSpec) -> Self {
        self.spec = Some(spec);
        self
    }

    /// Replace the default HTTP transport
    pub fn client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Install a per-request resolver
    pub fn resolver(mut self, resolver: Arc<dyn RequestResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Override buffer and sampling limits
    pub fn collector_config(mut self, config: CollectorConfig) -> Self {
        self.collector_config = config;
        self
    }

    /// Validate the spec and assemble the runner together with the handle
    /// that can observe and cancel it.
    pub fn build(self) -> EngineResult<(Runner, RunHandle)> {
        let spec = self.spec.ok_or(EngineError::missing_config("spec"))?;
        spec.validate()?;

        let id = RunId::new();
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let (progress_tx, progress_rx) = watch::channel(RunProgress::pending());

        let runner = Runner {
            id,
            spec,
            client: self.client,
            resolver: self.resolver,
            collector_config: self.collector_config,
            progress_tx: Arc::new(progress_tx),
            cancel_rx,
        };
        let handle = RunHandle::new(id, Arc::new(cancel_tx), progress_rx);
        Ok((runner, handle))
    }
}

impl std::fmt::Debug for RunnerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunnerBuilder")
            .field("spec", &self.spec.as_ref().map(|s| s.name.as_str()))
            .field("has_client", &self.client.is_some())
            .field("has_resolver", &self.resolver.is_some())
            .field("collector_config", &self.collector_config)
            .finish()
    }
}
