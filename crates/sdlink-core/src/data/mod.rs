//! Data models for SD-card transfers
//!
//! This module provides:
//! - The transfer state machine states and their legal transitions
//! - Progress events reported to observers
//! - Policies controlling timeout classification and progress cadence

use crate::constants::DEFAULT_PROGRESS_EVERY_LINES;
use serde::{Deserialize, Serialize};
use std::fmt;

/// State of a single SD-card transfer
///
/// States only move forward. `Failed` and `Aborted` are absorbing and can be
/// entered from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TransferState {
    /// Created, nothing sent yet
    #[default]
    Idle,
    /// Connection open, SD card and remote file being prepared
    Initializing,
    /// Streaming program lines into the remote file
    Writing,
    /// Closing the remote file
    Finalizing,
    /// Transfer finished and acknowledged
    Completed,
    /// Transfer terminated by an error
    Failed,
    /// Transfer terminated by a cancellation request
    Aborted,
}

impl TransferState {
    /// Check if no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransferState::Completed | TransferState::Failed | TransferState::Aborted
        )
    }

    /// Check if this state is the successful end state
    pub fn is_success(&self) -> bool {
        matches!(self, TransferState::Completed)
    }

    fn position(&self) -> u8 {
        match self {
            TransferState::Idle => 0,
            TransferState::Initializing => 1,
            TransferState::Writing => 2,
            TransferState::Finalizing => 3,
            TransferState::Completed => 4,
            TransferState::Failed | TransferState::Aborted => 5,
        }
    }

    /// Check whether moving from `self` to `next` is a legal forward step
    pub fn can_transition_to(&self, next: TransferState) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            TransferState::Failed | TransferState::Aborted => true,
            TransferState::Idle => false,
            _ => next.position() == self.position() + 1,
        }
    }
}

impl fmt::Display for TransferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferState::Idle => write!(f, "Idle"),
            TransferState::Initializing => write!(f, "Initializing"),
            TransferState::Writing => write!(f, "Writing"),
            TransferState::Finalizing => write!(f, "Finalizing"),
            TransferState::Completed => write!(f, "Completed"),
            TransferState::Failed => write!(f, "Failed"),
            TransferState::Aborted => write!(f, "Aborted"),
        }
    }
}

/// Progress snapshot handed to a progress observer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Source lines processed so far (sent or skipped)
    pub processed: u64,
    /// Total raw source lines, including comments and blanks
    pub total: u64,
    /// `processed / total`, in `[0, 1]`
    pub fraction: f64,
}

impl ProgressEvent {
    /// Build an event; an empty source counts as fully processed
    pub fn new(processed: u64, total: u64) -> Self {
        let fraction = if total == 0 {
            1.0
        } else {
            (processed as f64 / total as f64).clamp(0.0, 1.0)
        };
        Self {
            processed,
            total,
            fraction,
        }
    }

    /// Fraction expressed as a percentage
    pub fn percent(&self) -> f64 {
        self.fraction * 100.0
    }
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.2}% ({}/{})",
            self.percent(),
            self.processed,
            self.total
        )
    }
}

/// How an acknowledgment wait that ends in a read timeout is judged
///
/// Older firmware sometimes goes quiet instead of answering, so the default
/// treats silence as success. `Fail` turns silence into a command error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TimeoutPolicy {
    /// Silence after a command counts as success
    #[default]
    AssumeSuccess,
    /// Silence after a command counts as failure
    Fail,
}

impl fmt::Display for TimeoutPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeoutPolicy::AssumeSuccess => write!(f, "assume-success"),
            TimeoutPolicy::Fail => write!(f, "fail"),
        }
    }
}

/// Cadence at which progress events are emitted
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressPolicy {
    /// Emit after every N processed lines (0 disables the line trigger)
    pub every_lines: u64,
    /// Emit whenever the fraction advanced by at least this much
    pub min_fraction_step: Option<f64>,
    /// Emit a final 100% event once the transfer completes
    pub emit_final: bool,
}

impl Default for ProgressPolicy {
    fn default() -> Self {
        Self {
            every_lines: DEFAULT_PROGRESS_EVERY_LINES,
            min_fraction_step: None,
            emit_final: true,
        }
    }
}
