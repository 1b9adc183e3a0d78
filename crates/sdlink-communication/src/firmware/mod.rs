//! Firmware protocol implementations
//!
//! Supported firmware:
//! - Marlin: SD-card file writing over the serial console (M21/M28/M29)

pub mod marlin;

pub use marlin::{classify, validate_file_name, CommandCreator, MarlinResponse, SdCommand};
