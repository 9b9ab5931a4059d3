//! Run orchestration.
//!
//! The runner owns everything above a single worker:
//!
//! 1. Validates the spec and resolves its endpoints
//! 2. Spawns exactly `concurrency` workers over one shared request counter
//! 3. Collects outcomes on a channel, folding them into metrics as they land
//! 4. Publishes live progress through a watch channel
//! 5. Evaluates thresholds and stamps the final report
//!
//! # Example
//!
//! ```ignore
//! use loadgate::runner::RunnerBuilder;
//! use loadgate::spec::TestSpec;
//!
//! let spec = TestSpec::single("smoke", "https://example.com/health")
//!     .with_total_requests(100)
//!     .with_concurrency(4);
//! let (runner, handle) = RunnerBuilder::new().spec(spec).build()?;
//! let report = runner.run().await;
//! assert!(report.status.is_terminal());
//! ```

mod builder;
mod collector;
mod executor;

pub use builder::RunnerBuilder;
pub use collector::CollectorConfig;
pub use executor::{RunHandle, Runner};
