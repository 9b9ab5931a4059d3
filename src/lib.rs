//! loadgate: HTTP load generation with pass/fail gating
//!
//! This crate drives a configured volume of HTTP requests against one or
//! more endpoints and reduces what happened into a verdict, including:
//!
//! - Declarative test specs (endpoints, distribution, rate, thresholds)
//! - A fixed-size worker pool sharing one request budget
//! - Token-bucket request pacing
//! - Latency, throughput, and error-rate aggregation with exact percentiles
//! - Threshold evaluation for CI-style pass/fail gating

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod error;
pub mod limiter;
pub mod metrics;
pub mod outcome;
pub mod run;
pub mod runner;
pub mod selector;
pub mod spec;
pub mod thresholds;
pub mod worker;

pub use client::*;
pub use error::*;
pub use limiter::*;
pub use metrics::*;
pub use outcome::*;
pub use run::*;
pub use selector::*;
pub use spec::*;
pub use thresholds::*;

pub use runner::{CollectorConfig, RunHandle, Runner, RunnerBuilder};
pub use worker::{Worker, WorkerBuilder, WorkerSummary};
