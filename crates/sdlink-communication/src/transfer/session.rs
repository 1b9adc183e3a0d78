//! SD-card transfer session
//!
//! Drives one file transfer through
//! `Idle -> Initializing -> Writing -> Finalizing -> Completed`.
//! Any failure moves the session to `Failed`, a cancellation request to
//! `Aborted`. The connection is opened once and closed on every exit path.

use super::{transmittable_line, CancelToken, GcodeSource, ProgressTracker};
use crate::communication::{Command, CommandChannel, ConnectionParams, OpenConnection, Transport};
use crate::firmware::marlin::{validate_file_name, CommandCreator};
use chrono::{DateTime, Utc};
use sdlink_core::{
    CommandError, Error, ProgressEvent, ProgressPolicy, Result, TimeoutPolicy, TransferError,
    TransferState,
};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Settings for one transfer
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// Serial link parameters
    pub connection: ConnectionParams,
    /// How a silent firmware is judged
    pub timeout_policy: TimeoutPolicy,
    /// Progress cadence
    pub progress: ProgressPolicy,
    /// Name of the file on the SD card; defaults to the source's base name
    pub remote_name: Option<String>,
}

/// Final report of a transfer
#[derive(Debug)]
pub struct TransferOutcome {
    /// Session identifier, also used in log lines
    pub session_id: Uuid,
    /// Name of the file on the SD card
    pub remote_name: String,
    /// Terminal state
    pub state: TransferState,
    /// Human-readable summary
    pub message: String,
    /// The error that ended the transfer, if any
    pub error: Option<Error>,
    /// Response lines of the last command sent
    pub responses: Vec<String>,
    /// Source lines processed (sent or skipped)
    pub lines_processed: u64,
    /// Data lines actually transmitted
    pub lines_sent: u64,
    /// Raw source lines, comments and blanks included
    pub total_lines: u64,
    /// When the session started
    pub started_at: DateTime<Utc>,
    /// When the session reached its terminal state
    pub finished_at: DateTime<Utc>,
}

impl TransferOutcome {
    /// Check whether the file was stored successfully
    pub fn success(&self) -> bool {
        self.state.is_success()
    }
}

/// A single-use SD-card transfer
pub struct TransferSession {
    id: Uuid,
    source_path: PathBuf,
    remote_name: String,
    config: SessionConfig,
    cancel: CancelToken,
    state: TransferState,
    total_lines: u64,
    lines_processed: u64,
    lines_sent: u64,
    responses: Vec<String>,
}

impl TransferSession {
    /// Create a session that will store `source_path` on the SD card
    pub fn new(source_path: impl Into<PathBuf>, config: SessionConfig) -> Self {
        let source_path = source_path.into();
        let remote_name = config
            .remote_name
            .clone()
            .unwrap_or_else(|| remote_name_for(&source_path));
        Self {
            id: Uuid::new_v4(),
            source_path,
            remote_name,
            config,
            cancel: CancelToken::new(),
            state: TransferState::Idle,
            total_lines: 0,
            lines_processed: 0,
            lines_sent: 0,
            responses: Vec::new(),
        }
    }

    /// Use a cancellation token shared with the caller
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// A handle that can cancel this session from another thread
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Current state
    pub fn state(&self) -> TransferState {
        self.state
    }

    /// Name of the file on the SD card
    pub fn remote_name(&self) -> &str {
        &self.remote_name
    }

    /// Run the transfer to a terminal state
    ///
    /// Blocks until the transfer ends. Device and file failures are reported
    /// in the returned outcome; `Err` is only returned when the session has
    /// already been run.
    ///
    /// A panic raised by `on_progress` or the transport is propagated after
    /// the connection has been closed. A session that had not yet completed
    /// is moved to `Failed` first.
    pub fn run<T, F>(&mut self, transport: &mut T, mut on_progress: F) -> Result<TransferOutcome>
    where
        T: Transport + ?Sized,
        F: FnMut(&ProgressEvent),
    {
        if self.state != TransferState::Idle {
            return Err(TransferError::InvalidStateTransition {
                current: self.state.to_string(),
                requested: TransferState::Initializing.to_string(),
            }
            .into());
        }

        let span = tracing::info_span!("transfer", session_id = %self.id);
        let _entered = span.enter();

        let started_at = Utc::now();
        tracing::info!(
            "Sending {} to SD card as {}",
            self.source_path.display(),
            self.remote_name
        );

        let result = match panic::catch_unwind(AssertUnwindSafe(|| {
            self.execute(transport, &mut on_progress)
        })) {
            Ok(result) => result,
            Err(payload) => {
                self.terminate(TransferState::Failed);
                tracing::error!("Transfer of {} panicked", self.remote_name);
                panic::resume_unwind(payload);
            }
        };

        let (message, error) = match result {
            Ok(()) => {
                let message =
                    format!("Successfully sent {} to printer's SD card", self.remote_name);
                tracing::info!("{}", message);
                (message, None)
            }
            Err(e) if e.is_abort() => {
                self.terminate(TransferState::Aborted);
                let message = format!(
                    "Transfer of {} aborted after {}/{} lines",
                    self.remote_name, self.lines_processed, self.total_lines
                );
                tracing::warn!("{}", message);
                (message, Some(e))
            }
            Err(e) => {
                self.terminate(TransferState::Failed);
                let message = format!("Failed to send {}: {}", self.remote_name, e);
                tracing::error!("{}", message);
                (message, Some(e))
            }
        };

        Ok(TransferOutcome {
            session_id: self.id,
            remote_name: self.remote_name.clone(),
            state: self.state,
            message,
            error,
            responses: std::mem::take(&mut self.responses),
            lines_processed: self.lines_processed,
            lines_sent: self.lines_sent,
            total_lines: self.total_lines,
            started_at,
            finished_at: Utc::now(),
        })
    }

    fn execute<T, F>(&mut self, transport: &mut T, on_progress: &mut F) -> Result<()>
    where
        T: Transport + ?Sized,
        F: FnMut(&ProgressEvent),
    {
        validate_file_name(&self.remote_name)?;
        let source = GcodeSource::load(&self.source_path)?;
        self.total_lines = source.total_lines();
        tracing::info!(
            "{} of {} source lines carry commands",
            source.data_lines(),
            self.total_lines
        );
        self.check_cancelled()?;

        self.advance(TransferState::Initializing)?;
        let mut connection = OpenConnection::open(transport, &self.config.connection)?;
        let mut channel = CommandChannel::new(&mut *connection, self.config.timeout_policy);

        tracing::info!("Initializing SD card...");
        self.send_required(&mut channel, &CommandCreator::init_sd_card())?;
        self.check_cancelled()?;

        tracing::info!("Starting file write: {}", self.remote_name);
        let begin = CommandCreator::begin_file_write(&self.remote_name);
        self.send_required(&mut channel, &begin)?;
        self.advance(TransferState::Writing)?;

        let mut tracker = ProgressTracker::new(self.config.progress, self.total_lines);
        for raw in source.lines() {
            self.check_cancelled()?;
            if let Some(line) = transmittable_line(raw) {
                self.send_required(&mut channel, &CommandCreator::data_line(line))?;
                self.lines_sent += 1;
            }
            self.lines_processed += 1;

            if let Some(event) = tracker.record(self.lines_processed) {
                tracing::info!("Progress: {}", event);
                on_progress(&event);
            }
        }
        self.check_cancelled()?;

        self.advance(TransferState::Finalizing)?;
        tracing::info!("Ending file write...");
        self.send_required(&mut channel, &CommandCreator::end_file_write())?;
        self.advance(TransferState::Completed)?;

        drop(channel);
        drop(connection);

        if let Some(event) = tracker.finish() {
            on_progress(&event);
        }
        Ok(())
    }

    /// Send a command whose acknowledgment is required for the transfer to go on
    fn send_required<T>(
        &mut self,
        channel: &mut CommandChannel<'_, T>,
        command: &Command,
    ) -> Result<()>
    where
        T: Transport + ?Sized,
    {
        let outcome = channel.send(command)?;
        self.responses = outcome.lines.clone();
        if outcome.success {
            return Ok(());
        }

        match outcome.error_line() {
            Some(line) => Err(CommandError::Rejected {
                command: command.text().to_string(),
                response: line.to_string(),
            }
            .into()),
            None => Err(CommandError::NoAcknowledgment {
                command: command.text().to_string(),
                timeout_ms: channel.timeout_ms(),
            }
            .into()),
        }
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(TransferError::AbortRequested.into());
        }
        Ok(())
    }

    fn advance(&mut self, next: TransferState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(TransferError::InvalidStateTransition {
                current: self.state.to_string(),
                requested: next.to_string(),
            }
            .into());
        }
        tracing::debug!("{} -> {}", self.state, next);
        self.state = next;
        Ok(())
    }

    fn terminate(&mut self, terminal: TransferState) {
        if let Err(e) = self.advance(terminal) {
            tracing::warn!("{}", e);
        }
    }
}

/// Base name of `path`, used as the SD-card file name
fn remote_name_for(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
