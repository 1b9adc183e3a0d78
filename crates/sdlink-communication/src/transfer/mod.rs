//! SD-card file transfer
//!
//! A [`TransferSession`] stores one G-code program on the printer's SD card:
//! initialize the card, open the remote file, stream the program lines,
//! close the remote file. Progress is reported through a callback and the
//! result is returned as a [`TransferOutcome`].

pub mod cancel;
pub mod progress;
pub mod session;
pub mod source;

pub use cancel::CancelToken;
pub use progress::ProgressTracker;
pub use session::{SessionConfig, TransferOutcome, TransferSession};
pub use source::{transmittable_line, GcodeSource};
