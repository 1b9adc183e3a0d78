//! Serial port transport
//!
//! Provides blocking, line-framed access to a printer over USB or RS-232.
//!
//! Supports:
//! - Baud rate and read timeout configuration
//! - A settle pause after opening while the board resets
//! - Reassembly of lines that arrive split across several reads
//! - Idempotent close

use super::{ConnectionParams, Transport};
use sdlink_core::constants::LINE_TERMINATOR;
use sdlink_core::{ConnectionError, Result};
use std::io::{self, Read, Write};
use std::time::Instant;

/// Trait for serial port I/O operations
pub trait ReadWrite: Read + Write + Send {}
impl<T: Read + Write + Send> ReadWrite for T {}

const READ_CHUNK: usize = 256;

/// Serial transport backed by the `serialport` crate
pub struct SerialTransport {
    params: Option<ConnectionParams>,
    port: Option<Box<dyn ReadWrite>>,
    pending: Vec<u8>,
}

impl SerialTransport {
    /// Create a closed transport
    pub fn new() -> Self {
        Self {
            params: None,
            port: None,
            pending: Vec::new(),
        }
    }

    /// Wrap an already-open byte stream
    ///
    /// The stream's own read timeout is used as-is; no settle pause is taken.
    pub fn from_stream(params: ConnectionParams, stream: Box<dyn ReadWrite>) -> Self {
        Self {
            params: Some(params),
            port: Some(stream),
            pending: Vec::new(),
        }
    }

    /// Take one complete line out of the pending buffer
    fn take_line(&mut self) -> Option<String> {
        let end = self.pending.iter().position(|b| *b == b'\n')?;
        let raw: Vec<u8> = self.pending.drain(..=end).collect();
        let line = String::from_utf8_lossy(&raw[..end]);
        Some(line.trim_end_matches('\r').to_string())
    }
}

fn connection_lost(reason: &str) -> sdlink_core::Error {
    tracing::error!("Serial link lost: {}", reason);
    ConnectionError::ConnectionLost {
        reason: reason.to_string(),
    }
    .into()
}

impl Default for SerialTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for SerialTransport {
    fn open(&mut self, params: &ConnectionParams) -> Result<()> {
        params.validate()?;
        if self.is_open() {
            tracing::warn!("Reopening serial transport; closing previous connection first");
            self.close();
        }

        tracing::info!(
            "Connecting to printer on {} at {} baud...",
            params.port,
            params.baud_rate
        );

        let port = serialport::new(&params.port, params.baud_rate)
            .timeout(params.read_timeout())
            .open()
            .map_err(|e| {
                tracing::warn!("Failed to open serial port {}: {}", params.port, e);
                ConnectionError::FailedToOpen {
                    port: params.port.clone(),
                    reason: e.to_string(),
                }
            })?;

        // Opening the port toggles DTR, which resets most boards.
        std::thread::sleep(params.settle_delay());

        self.port = Some(Box::new(port));
        self.params = Some(params.clone());
        self.pending.clear();
        tracing::info!("Connected to {}", params.port);
        Ok(())
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        let port = self.port.as_mut().ok_or(ConnectionError::NotOpen)?;
        let mut data = String::with_capacity(line.len() + LINE_TERMINATOR.len());
        data.push_str(line);
        data.push_str(LINE_TERMINATOR);
        port.write_all(data.as_bytes())?;
        port.flush()?;
        Ok(())
    }

    fn read_line(&mut self) -> Result<Option<String>> {
        if self.port.is_none() {
            return Err(ConnectionError::NotOpen.into());
        }
        if let Some(line) = self.take_line() {
            return Ok(Some(line));
        }

        let deadline = self
            .params
            .as_ref()
            .map(|params| Instant::now() + params.read_timeout());
        let mut chunk = [0u8; READ_CHUNK];

        loop {
            let Some(port) = self.port.as_mut() else {
                return Err(ConnectionError::NotOpen.into());
            };
            match port.read(&mut chunk) {
                Ok(0) => return Err(connection_lost("end of stream")),
                Ok(n) => {
                    self.pending.extend_from_slice(&chunk[..n]);
                    if let Some(line) = self.take_line() {
                        return Ok(Some(line));
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::TimedOut => return Ok(None),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(None),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::BrokenPipe | io::ErrorKind::UnexpectedEof
                    ) =>
                {
                    return Err(connection_lost(&e.to_string()));
                }
                Err(e) => return Err(e.into()),
            }

            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                // Partial data stays buffered for the next call.
                return Ok(None);
            }
        }
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            tracing::info!("Disconnecting from printer...");
            self.pending.clear();
            tracing::info!("Disconnected");
        }
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn connection_params(&self) -> Option<&ConnectionParams> {
        self.params.as_ref()
    }
}
