//! Error handling for SDLink
//!
//! Provides error types for every layer of a transfer:
//! - Connection errors (opening, writing to, or losing the serial device)
//! - Command errors (firmware rejected a command)
//! - Transfer errors (source file, remote naming, cancellation, state machine)
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Connection error type
///
/// Represents errors related to the serial link with the printer.
#[derive(Error, Debug, Clone)]
pub enum ConnectionError {
    /// Failed to open port
    #[error("Failed to open port {port}: {reason}")]
    FailedToOpen {
        /// The name of the port that failed to open.
        port: String,
        /// The reason the port failed to open.
        reason: String,
    },

    /// An operation needed an open connection
    #[error("Connection is not open")]
    NotOpen,

    /// Connection lost
    #[error("Connection lost: {reason}")]
    ConnectionLost {
        /// The reason the connection was lost.
        reason: String,
    },

    /// Invalid connection parameters
    #[error("Invalid connection parameters: {reason}")]
    InvalidParameters {
        /// The reason the parameters are invalid.
        reason: String,
    },
}

/// Command error type
///
/// Raised when the firmware answers a command with an error, or when a
/// strict timeout policy is in force and the firmware never answered.
#[derive(Error, Debug, Clone)]
pub enum CommandError {
    /// Command was rejected by the firmware
    #[error("Command '{command}' rejected: {response}")]
    Rejected {
        /// The command text that was sent.
        command: String,
        /// The error line returned by the firmware.
        response: String,
    },

    /// No acknowledgment arrived before the read timeout
    #[error("No acknowledgment for '{command}' within {timeout_ms}ms")]
    NoAcknowledgment {
        /// The command text that was sent.
        command: String,
        /// The read timeout in milliseconds.
        timeout_ms: u64,
    },
}

/// Transfer error type
///
/// Represents errors raised by the transfer session itself rather than the
/// device.
#[derive(Error, Debug, Clone)]
pub enum TransferError {
    /// The G-code source could not be read
    #[error("Cannot read source file {path}: {reason}")]
    SourceUnreadable {
        /// The source file path.
        path: String,
        /// The reason the file could not be read.
        reason: String,
    },

    /// The remote file name cannot be used with the open-file command
    #[error("Invalid remote file name '{name}'")]
    InvalidRemoteName {
        /// The rejected name.
        name: String,
    },

    /// Cancellation was requested by the caller
    #[error("Transfer aborted by request")]
    AbortRequested,

    /// Invalid state transition
    #[error("Invalid state transition from {current} to {requested}")]
    InvalidStateTransition {
        /// The current state name.
        current: String,
        /// The requested state name.
        requested: String,
    },
}

/// Main error type for SDLink
///
/// A unified error type that can represent any error from all layers.
/// This is the primary error type used in public APIs.
#[derive(Error, Debug)]
pub enum Error {
    /// Connection error
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Command error
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Transfer error
    #[error(transparent)]
    Transfer(#[from] TransferError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Check if this is a connection error
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Error::Connection(_))
    }

    /// Check if this is a command error
    pub fn is_command_error(&self) -> bool {
        matches!(self, Error::Command(_))
    }

    /// Check if this is an I/O error, either on the link or on the source file
    pub fn is_io_error(&self) -> bool {
        matches!(
            self,
            Error::Io(_) | Error::Transfer(TransferError::SourceUnreadable { .. })
        )
    }

    /// Check if this error represents a caller-requested abort
    pub fn is_abort(&self) -> bool {
        matches!(self, Error::Transfer(TransferError::AbortRequested))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;
