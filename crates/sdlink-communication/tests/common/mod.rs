//! Scripted in-memory transport shared by the integration tests.

#![allow(dead_code)]

use sdlink_communication::{ConnectionParams, Transport};
use sdlink_core::{thread_safe, ConnectionError, Result, ThreadSafe};
use std::collections::VecDeque;
use std::io::Write;

/// Produces the lines the "firmware" answers to one written line
pub type Responder = Box<dyn FnMut(&str) -> Vec<String> + Send>;

/// Everything the mock observed
#[derive(Debug, Default)]
pub struct MockLog {
    pub written: Vec<String>,
    pub reads: usize,
    pub opens: usize,
    pub closes: usize,
    pub close_calls: usize,
}

pub struct MockTransport {
    log: ThreadSafe<MockLog>,
    params: Option<ConnectionParams>,
    open: bool,
    fail_open: bool,
    hang_up_after: Option<usize>,
    inbox: VecDeque<String>,
    responder: Responder,
}

impl MockTransport {
    pub fn new(responder: impl FnMut(&str) -> Vec<String> + Send + 'static) -> Self {
        Self {
            log: thread_safe(MockLog::default()),
            params: None,
            open: false,
            fail_open: false,
            hang_up_after: None,
            inbox: VecDeque::new(),
            responder: Box::new(responder),
        }
    }

    /// Firmware that answers `ok` to everything
    pub fn always_ok() -> Self {
        Self::new(|_| vec!["ok".to_string()])
    }

    /// Firmware that never answers
    pub fn silent() -> Self {
        Self::new(|_| Vec::new())
    }

    /// A device that cannot be opened
    pub fn failing_open() -> Self {
        let mut transport = Self::always_ok();
        transport.fail_open = true;
        transport
    }

    /// A link that drops once `writes` lines have been written
    pub fn hanging_up_after(mut self, writes: usize) -> Self {
        self.hang_up_after = Some(writes);
        self
    }

    /// Mark the mock as already open, for channel-level tests
    pub fn attached(mut self) -> Self {
        self.open = true;
        self.params = Some(test_params());
        self
    }

    pub fn log(&self) -> ThreadSafe<MockLog> {
        self.log.clone()
    }

    pub fn written(&self) -> Vec<String> {
        self.log.lock().written.clone()
    }

    pub fn reads(&self) -> usize {
        self.log.lock().reads
    }

    pub fn closes(&self) -> usize {
        self.log.lock().closes
    }

    pub fn close_calls(&self) -> usize {
        self.log.lock().close_calls
    }
}

impl Transport for MockTransport {
    fn open(&mut self, params: &ConnectionParams) -> Result<()> {
        self.log.lock().opens += 1;
        if self.fail_open {
            return Err(ConnectionError::FailedToOpen {
                port: params.port.clone(),
                reason: "device busy".to_string(),
            }
            .into());
        }
        self.open = true;
        self.params = Some(params.clone());
        Ok(())
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        if !self.open {
            return Err(ConnectionError::NotOpen.into());
        }
        self.log.lock().written.push(line.to_string());
        let replies = (self.responder)(line);
        self.inbox.extend(replies);
        Ok(())
    }

    fn read_line(&mut self) -> Result<Option<String>> {
        self.log.lock().reads += 1;
        if !self.open {
            return Err(ConnectionError::NotOpen.into());
        }
        if let Some(limit) = self.hang_up_after {
            if self.log.lock().written.len() >= limit {
                return Err(ConnectionError::ConnectionLost {
                    reason: "end of stream".to_string(),
                }
                .into());
            }
        }
        Ok(self.inbox.pop_front())
    }

    fn close(&mut self) {
        let mut log = self.log.lock();
        log.close_calls += 1;
        if self.open {
            self.open = false;
            log.closes += 1;
        }
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn connection_params(&self) -> Option<&ConnectionParams> {
        self.params.as_ref()
    }
}

pub fn test_params() -> ConnectionParams {
    ConnectionParams::new("/dev/ttyMOCK0")
        .with_timeout_ms(10)
        .with_settle_ms(0)
}

/// Write `lines` to a temporary `.gcode` file
pub fn write_source(lines: &[&str]) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".gcode")
        .tempfile()
        .expect("create temp source");
    for line in lines {
        writeln!(file, "{}", line).expect("write temp source");
    }
    file
}

/// Ten lines: comments on lines 3 and 7, blank line 5
pub fn ten_line_program() -> Vec<&'static str> {
    vec![
        "G28",
        "M104 S200",
        "; heat the nozzle",
        "G1 Z0.2 F3000",
        "",
        "G1 X10 Y10 E1",
        ";LAYER:1",
        "G1 X20 Y10 E2",
        "G1 X20 Y20 E3",
        "M84",
    ]
}

/// `n` data lines `G1 X<i>`
pub fn data_program(n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("G1 X{}", i)).collect()
}

/// Lines that are neither SD-card control commands
pub fn data_lines_sent(written: &[String]) -> Vec<String> {
    written
        .iter()
        .filter(|line| !matches!(line.split_whitespace().next(), Some("M21" | "M28" | "M29")))
        .cloned()
        .collect()
}
