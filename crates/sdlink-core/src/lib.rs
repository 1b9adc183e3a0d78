//! # SDLink Core
//!
//! Core types, errors, and the transfer data model shared by the SDLink
//! crates.

pub mod constants;
pub mod data;
pub mod error;
pub mod types;

pub use data::{ProgressEvent, ProgressPolicy, TimeoutPolicy, TransferState};

pub use error::{CommandError, ConnectionError, Error, Result, TransferError};

pub use types::{thread_safe, ProgressCallback, ThreadSafe};
