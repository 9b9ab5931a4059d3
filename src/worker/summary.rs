//! Per-worker dispatch tallies

use crate::outcome::RequestOutcome;

/// What one worker dispatched before stopping.
///
/// Authoritative metrics come from the collector; this is for worker exit
/// logging and for detecting runs where no worker made progress.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WorkerSummary {
    /// Outcomes this worker produced
    pub dispatched: u64,

    /// Successes among them
    pub succeeded: u64,

    /// Failures among them
    pub failed: u64,
}

impl WorkerSummary {
    /// Create empty tallies
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one outcome
    pub fn record(&mut self, outcome: &RequestOutcome) {
        self.dispatched += 1;
        if outcome.is_success() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }

    /// Fraction of dispatched requests that failed
    pub fn error_rate(&self) -> f64 {
        if self.dispatched == 0 {
            0.0
        } else {
            self.failed as f64 / self.dispatched as f64
        }
    }
}
