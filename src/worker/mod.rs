//! Worker pool executing the request budget
//!
//! Workers are the engine's execution unit and its only source of request
//! concurrency: a run gets exactly as many workers as its configured
//! concurrency, with no semaphore on top. Each Worker is a stateless tokio
//! task that:
//!
//! 1. Checks for cancellation
//! 2. Claims the next request number from a shared atomic counter
//! 3. Waits on the shared rate limiter
//! 4. Selects the endpoint for that number and prepares the request
//! 5. Executes it under the per-request deadline and classifies the result
//! 6. Sends the outcome to the collector via channel
//! 7. Repeats until the budget is drained or the run is cancelled
//!
//! Every claimed-and-dispatched request produces exactly one outcome,
//! success or failure; workers never retry.
//!
//! # Example
//!
//! ```ignore
//! use loadgate::worker::WorkerBuilder;
//!
//! let worker = WorkerBuilder::new(0)
//!     .client(client)
//!     .endpoints(endpoints)
//!     .selector(selector)
//!     .budget(counter, 100)
//!     .outcomes_tx(tx)
//!     .build()?;
//!
//! let summary = worker.run(cancel_rx).await;
//! println!("dispatched: {}", summary.dispatched);
//! ```

mod builder;
mod executor;
mod summary;

pub use builder::WorkerBuilder;
pub use executor::Worker;
pub use summary::WorkerSummary;
