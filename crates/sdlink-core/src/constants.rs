//! Protocol and connection defaults.

/// Serial baud rate used by most Marlin boards
pub const DEFAULT_BAUD_RATE: u32 = 250_000;

/// Read timeout for a single response line
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 1_000;

/// Pause after opening the port while the board resets
pub const DEFAULT_SETTLE_MS: u64 = 2_000;

/// Progress is reported after this many processed source lines
pub const DEFAULT_PROGRESS_EVERY_LINES: u64 = 100;

/// Line terminator appended to every outgoing command
pub const LINE_TERMINATOR: &str = "\n";

/// Marker that starts a G-code comment line
pub const COMMENT_MARKER: char = ';';
