//! Progress cadence
//!
//! Decides which processed-line counts produce a [`ProgressEvent`]. Events
//! are emitted every `every_lines` lines and/or whenever the fraction has
//! advanced by `min_fraction_step`. Emitted fractions never decrease and the
//! same count is never reported twice.

use sdlink_core::{ProgressEvent, ProgressPolicy};

/// Tracks what has been reported for one transfer
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    policy: ProgressPolicy,
    total: u64,
    last_processed: Option<u64>,
    last_fraction: f64,
}

impl ProgressTracker {
    /// Create a tracker for a source with `total` raw lines
    pub fn new(policy: ProgressPolicy, total: u64) -> Self {
        Self {
            policy,
            total,
            last_processed: None,
            last_fraction: 0.0,
        }
    }

    /// Record that `processed` lines are done; returns an event if one is due
    pub fn record(&mut self, processed: u64) -> Option<ProgressEvent> {
        let processed = processed.min(self.total);
        let event = ProgressEvent::new(processed, self.total);

        let by_lines = self.policy.every_lines > 0 && processed % self.policy.every_lines == 0;
        let by_step = self
            .policy
            .min_fraction_step
            .is_some_and(|step| event.fraction - self.last_fraction >= step);

        if (by_lines || by_step) && processed > 0 {
            return self.emit(event);
        }
        None
    }

    /// Final event once the transfer completed, if the policy asks for one
    pub fn finish(&mut self) -> Option<ProgressEvent> {
        if !self.policy.emit_final {
            return None;
        }
        self.emit(ProgressEvent::new(self.total, self.total))
    }

    fn emit(&mut self, event: ProgressEvent) -> Option<ProgressEvent> {
        if self.last_processed == Some(event.processed) || event.fraction < self.last_fraction {
            return None;
        }
        self.last_processed = Some(event.processed);
        self.last_fraction = event.fraction;
        Some(event)
    }
}
