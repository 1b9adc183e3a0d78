//! Marlin Command Creator
//!
//! Builds the SD-card commands used to store a program on the printer and
//! wraps program lines as data commands.

use crate::communication::Command;
use sdlink_core::{Result, TransferError};

/// SD-card commands understood by Marlin
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SdCommand {
    /// Initialize (mount) the SD card
    InitCard,
    /// Open a file on the card for writing
    BeginWrite(String),
    /// Close the file being written
    EndWrite,
}

impl SdCommand {
    /// Get the G-code text of the command
    pub fn to_gcode(&self) -> String {
        match self {
            Self::InitCard => "M21".to_string(),
            Self::BeginWrite(name) => format!("M28 {}", name),
            Self::EndWrite => "M29".to_string(),
        }
    }
}

/// Marlin command creator
///
/// Every command produced here waits for an acknowledgment.
#[derive(Debug, Default)]
pub struct CommandCreator;

impl CommandCreator {
    /// `M21`
    pub fn init_sd_card() -> Command {
        Command::acknowledged(SdCommand::InitCard.to_gcode())
    }

    /// `M28 <name>`
    pub fn begin_file_write(name: &str) -> Command {
        Command::acknowledged(SdCommand::BeginWrite(name.to_string()).to_gcode())
    }

    /// `M29`
    pub fn end_file_write() -> Command {
        Command::acknowledged(SdCommand::EndWrite.to_gcode())
    }

    /// A program line forwarded verbatim
    pub fn data_line(line: &str) -> Command {
        Command::acknowledged(line)
    }
}

/// Check that `name` can be passed as the single argument of `M28`
pub fn validate_file_name(name: &str) -> Result<()> {
    if name.is_empty() || name.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(TransferError::InvalidRemoteName {
            name: name.to_string(),
        }
        .into());
    }
    Ok(())
}
