//! Marlin response classification
//!
//! Maps one received line to the kind of answer it represents.

use std::fmt;

/// Classified Marlin response line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarlinResponse {
    /// Command was processed (`ok`)
    Ack,
    /// Error response with the full line
    Error(String),
    /// Any other non-empty line (`echo:`, temperatures, `start`, ...)
    Info(String),
    /// Nothing arrived before the read timeout
    Empty,
}

impl fmt::Display for MarlinResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarlinResponse::Ack => write!(f, "ok"),
            MarlinResponse::Error(line) | MarlinResponse::Info(line) => f.write_str(line),
            MarlinResponse::Empty => Ok(()),
        }
    }
}

/// Classify a single line received from the firmware
///
/// Blank lines are checked first, then the case-sensitive `ok` prefix, then a
/// case-insensitive `error` anywhere in the line.
pub fn classify(line: &str) -> MarlinResponse {
    let line = line.trim();

    if line.is_empty() {
        return MarlinResponse::Empty;
    }

    if line.starts_with("ok") {
        return MarlinResponse::Ack;
    }

    if line.to_ascii_lowercase().contains("error") {
        return MarlinResponse::Error(line.to_string());
    }

    MarlinResponse::Info(line.to_string())
}
