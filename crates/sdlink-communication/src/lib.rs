//! # SDLink Communication
//!
//! Serial transport, Marlin protocol handling, and SD-card transfer sessions.
//!
//! The layers, leaves first:
//! - [`Transport`]: line-framed serial I/O with a read timeout
//! - [`classify`]: maps a received line to a [`MarlinResponse`]
//! - [`CommandChannel`]: one command at a time, waiting for `ok`
//! - [`TransferSession`]: the SD-card write state machine

pub mod communication;
pub mod firmware;
pub mod transfer;

pub use communication::{
    Command, CommandChannel, CommandOutcome, ConnectionParams, OpenConnection, ReadWrite,
    SerialTransport, Transport,
};

pub use firmware::{classify, validate_file_name, CommandCreator, MarlinResponse, SdCommand};

pub use transfer::{
    transmittable_line, CancelToken, GcodeSource, ProgressTracker, SessionConfig,
    TransferOutcome, TransferSession,
};
