//! G-code source documents
//!
//! The whole source is read before the printer is touched, so an unreadable
//! file fails the transfer without sending a single command.

use sdlink_core::constants::COMMENT_MARKER;
use sdlink_core::{Result, TransferError};
use std::path::Path;

/// A G-code program loaded into memory
#[derive(Debug, Clone, Default)]
pub struct GcodeSource {
    lines: Vec<String>,
}

impl GcodeSource {
    /// Read a program from disk
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            tracing::error!("Failed to read {}: {}", path.display(), e);
            TransferError::SourceUnreadable {
                path: path.display().to_string(),
                reason: e.to_string(),
            }
        })?;
        Ok(Self::from_text(&content))
    }

    /// Build a program from text already in memory
    pub fn from_text(content: &str) -> Self {
        Self {
            lines: content.lines().map(str::to_string).collect(),
        }
    }

    /// Every raw line, comments and blanks included
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    /// Number of raw lines, comments and blanks included
    pub fn total_lines(&self) -> u64 {
        self.lines.len() as u64
    }

    /// Number of lines that will actually be transmitted
    pub fn data_lines(&self) -> u64 {
        self.lines().filter_map(transmittable_line).count() as u64
    }
}

/// The text to transmit for a raw source line, or `None` for comments and
/// blank lines
pub fn transmittable_line(raw: &str) -> Option<&str> {
    let line = raw.trim();
    if line.is_empty() || line.starts_with(COMMENT_MARKER) {
        None
    } else {
        Some(line)
    }
}
