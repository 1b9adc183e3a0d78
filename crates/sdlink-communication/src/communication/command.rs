//! Outgoing command lines

use std::fmt;

/// A single command line and whether its acknowledgment is awaited
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    text: String,
    expects_ack: bool,
}

impl Command {
    /// Create a command
    pub fn new(text: impl Into<String>, expects_ack: bool) -> Self {
        Self {
            text: text.into(),
            expects_ack,
        }
    }

    /// Create a command whose `ok` must be awaited before the next one is sent
    pub fn acknowledged(text: impl Into<String>) -> Self {
        Self::new(text, true)
    }

    /// Create a command that is written without reading anything back
    pub fn fire_and_forget(text: impl Into<String>) -> Self {
        Self::new(text, false)
    }

    /// The raw line, without terminator
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether the sender waits for an acknowledgment
    pub fn expects_ack(&self) -> bool {
        self.expects_ack
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
