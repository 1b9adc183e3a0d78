//! Request/acknowledgment command channel
//!
//! Sends one command at a time and, when asked to, reads response lines until
//! the firmware acknowledges, reports an error, or goes quiet.
//!
//! # Protocol
//! - The command line is always written.
//! - Commands that do not expect an acknowledgment return at once without
//!   reading.
//! - Otherwise lines are read and classified: `ok` ends the wait with
//!   success, an `error` line ends it with failure, informational lines are
//!   collected and the wait continues.
//! - A read timeout or a blank line ends the wait; the [`TimeoutPolicy`]
//!   decides whether that counts as success.

use super::{Command, Transport};
use crate::firmware::marlin::{classify, MarlinResponse};
use sdlink_core::{Result, TimeoutPolicy};

/// Result of sending one command
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutcome {
    /// Whether the command is considered successful
    pub success: bool,
    /// Classified responses in arrival order
    pub responses: Vec<MarlinResponse>,
    /// Raw response lines in arrival order
    pub lines: Vec<String>,
    /// Whether the wait ended without an `ok` or `error` line, either
    /// because the read timed out or because a blank line arrived
    pub went_quiet: bool,
}

impl CommandOutcome {
    /// Outcome of a command that was written without waiting
    pub fn fire_and_forget() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    /// The error line that ended the wait, if any
    pub fn error_line(&self) -> Option<&str> {
        self.responses.iter().find_map(|response| match response {
            MarlinResponse::Error(line) => Some(line.as_str()),
            _ => None,
        })
    }

    fn push(&mut self, raw: &str, response: MarlinResponse) {
        self.lines.push(raw.trim().to_string());
        self.responses.push(response);
    }
}

/// Command channel over an open transport
///
/// Holding the channel borrows the transport mutably, so a second command
/// cannot be started while one is waiting.
pub struct CommandChannel<'a, T: Transport + ?Sized> {
    transport: &'a mut T,
    timeout_policy: TimeoutPolicy,
}

impl<'a, T: Transport + ?Sized> CommandChannel<'a, T> {
    /// Create a channel with the given timeout policy
    pub fn new(transport: &'a mut T, timeout_policy: TimeoutPolicy) -> Self {
        Self {
            transport,
            timeout_policy,
        }
    }

    /// Read timeout of the underlying connection, in milliseconds
    pub fn timeout_ms(&self) -> u64 {
        self.transport
            .connection_params()
            .map(|params| params.timeout_ms)
            .unwrap_or_default()
    }

    /// Send a command and collect its responses
    ///
    /// Transport failures are returned as `Err`; firmware errors and timeouts
    /// are reported through [`CommandOutcome::success`].
    pub fn send(&mut self, command: &Command) -> Result<CommandOutcome> {
        tracing::debug!("Sending command: {}", command);
        self.transport.write_line(command.text())?;

        if !command.expects_ack() {
            return Ok(CommandOutcome::fire_and_forget());
        }

        let mut outcome = CommandOutcome::default();
        loop {
            let line = self.transport.read_line()?.unwrap_or_default();
            match classify(&line) {
                MarlinResponse::Empty => {
                    outcome.went_quiet = true;
                    outcome.success = match self.timeout_policy {
                        TimeoutPolicy::AssumeSuccess => true,
                        TimeoutPolicy::Fail => {
                            tracing::warn!("No acknowledgment for '{}'", command);
                            false
                        }
                    };
                    return Ok(outcome);
                }
                MarlinResponse::Ack => {
                    tracing::debug!("Received: {}", line.trim());
                    outcome.push(&line, MarlinResponse::Ack);
                    outcome.success = true;
                    return Ok(outcome);
                }
                MarlinResponse::Error(message) => {
                    tracing::error!("Error: {}", message);
                    outcome.push(&line, MarlinResponse::Error(message));
                    outcome.success = false;
                    return Ok(outcome);
                }
                info => {
                    tracing::debug!("Received: {}", line.trim());
                    outcome.push(&line, info);
                }
            }
        }
    }
}
