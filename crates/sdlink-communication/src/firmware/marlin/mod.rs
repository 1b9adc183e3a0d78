//! Marlin firmware protocol
//!
//! Marlin acknowledges every processed line with `ok`, reports failures with
//! lines containing `error`, and emits informational `echo:` lines in
//! between. SD-card writes are bracketed by `M28 <file>` and `M29`.

pub mod command_creator;
pub mod response_parser;

pub use command_creator::{validate_file_name, CommandCreator, SdCommand};
pub use response_parser::{classify, MarlinResponse};
