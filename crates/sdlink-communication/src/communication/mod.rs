//! Line-oriented link to the printer
//!
//! A [`Transport`] owns the device connection and moves whole text lines in
//! both directions. [`OpenConnection`] scopes an open connection so that it is
//! closed on every exit path, and [`CommandChannel`] layers the
//! send-and-wait-for-`ok` protocol on top of it.

pub mod channel;
pub mod command;
pub mod serial;

pub use channel::{CommandChannel, CommandOutcome};
pub use command::Command;
pub use serial::{ReadWrite, SerialTransport};

use sdlink_core::constants::{DEFAULT_BAUD_RATE, DEFAULT_READ_TIMEOUT_MS, DEFAULT_SETTLE_MS};
use sdlink_core::{ConnectionError, Result};
use std::ops::{Deref, DerefMut};
use std::time::Duration;

/// Parameters of a serial connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    /// Port name (e.g., "/dev/ttyUSB0", "COM7")
    pub port: String,
    /// Baud rate, must match the firmware
    pub baud_rate: u32,
    /// Maximum wait for one response line
    pub timeout_ms: u64,
    /// Pause after opening while the board resets
    pub settle_ms: u64,
}

impl ConnectionParams {
    /// Create parameters for a port with default link settings
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            ..Self::default()
        }
    }

    /// Set the baud rate
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Set the read timeout
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set the post-open settle delay
    pub fn with_settle_ms(mut self, settle_ms: u64) -> Self {
        self.settle_ms = settle_ms;
        self
    }

    /// Read timeout as a `Duration`
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Settle delay as a `Duration`
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    /// Reject parameters that can never open a working link
    pub fn validate(&self) -> Result<()> {
        if self.port.trim().is_empty() {
            return Err(ConnectionError::InvalidParameters {
                reason: "port name is empty".to_string(),
            }
            .into());
        }
        if self.baud_rate == 0 {
            return Err(ConnectionError::InvalidParameters {
                reason: "baud rate must be > 0".to_string(),
            }
            .into());
        }
        if self.timeout_ms == 0 {
            return Err(ConnectionError::InvalidParameters {
                reason: "read timeout must be > 0".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

impl Default for ConnectionParams {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
            timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            settle_ms: DEFAULT_SETTLE_MS,
        }
    }
}

/// Line-framed, blocking access to a printer connection
///
/// Implementations own their connection exclusively. Only one command may be
/// in flight at a time, which `&mut self` enforces.
pub trait Transport: Send {
    /// Open the connection and wait for the device to settle
    fn open(&mut self, params: &ConnectionParams) -> Result<()>;

    /// Write one line, appending the terminator, and flush
    fn write_line(&mut self, line: &str) -> Result<()>;

    /// Read one line, or `None` if the read timeout elapsed without one
    fn read_line(&mut self) -> Result<Option<String>>;

    /// Close the connection; a no-op when already closed or never opened
    fn close(&mut self);

    /// Check whether the connection is open
    fn is_open(&self) -> bool;

    /// Parameters of the current or last connection
    fn connection_params(&self) -> Option<&ConnectionParams>;
}

/// An open connection that is closed when dropped
///
/// Dropping happens on normal return, on early `?` return, and while
/// unwinding from a panic.
pub struct OpenConnection<'a, T: Transport + ?Sized> {
    transport: &'a mut T,
}

impl<'a, T: Transport + ?Sized> OpenConnection<'a, T> {
    /// Open `transport` with `params`
    ///
    /// A failed open still calls `close` so a half-opened device is released.
    pub fn open(transport: &'a mut T, params: &ConnectionParams) -> Result<Self> {
        if let Err(e) = transport.open(params) {
            transport.close();
            return Err(e);
        }
        Ok(Self { transport })
    }
}

impl<T: Transport + ?Sized> Deref for OpenConnection<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.transport
    }
}

impl<T: Transport + ?Sized> DerefMut for OpenConnection<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.transport
    }
}

impl<T: Transport + ?Sized> Drop for OpenConnection<'_, T> {
    fn drop(&mut self) {
        self.transport.close();
    }
}
