//! End-to-end SD-card transfer sessions against a scripted printer

mod common;

use common::{
    data_lines_sent, data_program, ten_line_program, test_params, write_source, MockTransport,
};
use sdlink_communication::{CancelToken, SessionConfig, TransferSession};
use sdlink_core::{
    thread_safe, ProgressEvent, ProgressPolicy, ThreadSafe, TimeoutPolicy, TransferState,
};
use std::io::Write;
use std::panic::{catch_unwind, AssertUnwindSafe};

fn config() -> SessionConfig {
    SessionConfig {
        connection: test_params(),
        ..SessionConfig::default()
    }
}

#[test]
fn test_ten_line_program_sends_seven_data_lines() {
    let source = write_source(&ten_line_program());
    let mut transport = MockTransport::always_ok();
    let mut session = TransferSession::new(source.path(), config());
    let mut events: Vec<ProgressEvent> = Vec::new();

    let outcome = session.run(&mut transport, |e| events.push(*e)).unwrap();

    assert!(outcome.success(), "{}", outcome.message);
    assert_eq!(outcome.state, TransferState::Completed);
    assert_eq!(outcome.total_lines, 10);
    assert_eq!(outcome.lines_processed, 10);
    assert_eq!(outcome.lines_sent, 7);

    let written = transport.written();
    assert_eq!(written.len(), 10);
    assert_eq!(written[0], "M21");
    assert_eq!(written[1], format!("M28 {}", session.remote_name()));
    assert_eq!(written[9], "M29");
    assert_eq!(
        data_lines_sent(&written),
        vec![
            "G28",
            "M104 S200",
            "G1 Z0.2 F3000",
            "G1 X10 Y10 E1",
            "G1 X20 Y10 E2",
            "G1 X20 Y20 E3",
            "M84"
        ]
    );

    assert_eq!(events.last().map(|e| e.fraction), Some(1.0));
    assert_eq!(transport.closes(), 1);
    assert!(!sdlink_communication::Transport::is_open(&transport));
}

#[test]
fn test_progress_every_hundred_lines() {
    let lines = data_program(250);
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    let source = write_source(&refs);
    let mut transport = MockTransport::always_ok();
    let mut session = TransferSession::new(source.path(), config());
    let mut events: Vec<ProgressEvent> = Vec::new();

    let outcome = session.run(&mut transport, |e| events.push(*e)).unwrap();

    assert!(outcome.success());
    let processed: Vec<u64> = events.iter().map(|e| e.processed).collect();
    assert_eq!(processed, vec![100, 200, 250]);
    assert_eq!(events[0].fraction, 0.4);
    assert!(events.windows(2).all(|w| w[0].fraction <= w[1].fraction));
}

#[test]
fn test_open_file_error_fails_without_data() {
    let source = write_source(&["G28", "G1 X1"]);
    let mut transport = MockTransport::new(|line| {
        if line.starts_with("M28") {
            vec!["echo:open failed, File: part.gco. error".to_string()]
        } else {
            vec!["ok".to_string()]
        }
    });
    let mut session = TransferSession::new(source.path(), config());

    let outcome = session.run(&mut transport, |_| {}).unwrap();

    assert_eq!(outcome.state, TransferState::Failed);
    assert!(!outcome.success());
    assert!(outcome.error.as_ref().is_some_and(|e| e.is_command_error()));
    assert_eq!(
        outcome.responses,
        vec!["echo:open failed, File: part.gco. error"]
    );
    assert_eq!(outcome.lines_sent, 0);

    let written = transport.written();
    assert_eq!(written.len(), 2);
    assert!(data_lines_sent(&written).is_empty());
    assert_eq!(transport.closes(), 1);
    assert_eq!(transport.close_calls(), 1);
}

#[test]
fn test_sd_init_error_fails_before_open_file() {
    let source = write_source(&["G28"]);
    let mut transport = MockTransport::new(|_| {
        vec![
            "echo:No SD card".to_string(),
            "Error:volume.init failed".to_string(),
        ]
    });
    let mut session = TransferSession::new(source.path(), config());

    let outcome = session.run(&mut transport, |_| {}).unwrap();

    assert_eq!(outcome.state, TransferState::Failed);
    assert_eq!(transport.written(), vec!["M21"]);
    assert_eq!(transport.closes(), 1);
}

#[test]
fn test_data_line_error_stops_transfer() {
    let source = write_source(&["G28", "G1 X1", "BAD", "G1 X2"]);
    let mut transport = MockTransport::new(|line| {
        if line == "BAD" {
            vec!["Error:Unknown command: \"BAD\"".to_string()]
        } else {
            vec!["ok".to_string()]
        }
    });
    let mut session = TransferSession::new(source.path(), config());

    let outcome = session.run(&mut transport, |_| {}).unwrap();

    assert_eq!(outcome.state, TransferState::Failed);
    assert_eq!(outcome.lines_sent, 2);
    assert_eq!(outcome.lines_processed, 2);
    let written = transport.written();
    assert_eq!(written.last().map(String::as_str), Some("BAD"));
    assert!(!written.iter().any(|line| line == "G1 X2" || line == "M29"));
    assert_eq!(transport.closes(), 1);
}

#[test]
fn test_empty_source_completes() {
    let source = write_source(&[]);
    let mut transport = MockTransport::always_ok();
    let mut session = TransferSession::new(source.path(), config());
    let mut events: Vec<ProgressEvent> = Vec::new();

    let outcome = session.run(&mut transport, |e| events.push(*e)).unwrap();

    assert!(outcome.success());
    assert_eq!(outcome.total_lines, 0);
    assert_eq!(outcome.lines_processed, 0);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].fraction, 1.0);
    assert!(events.iter().all(|e| e.fraction.is_finite()));
    assert_eq!(transport.written().len(), 3);
}

#[test]
fn test_comment_only_source_runs_full_protocol() {
    let source = write_source(&["; generated", "", ";end"]);
    let mut transport = MockTransport::always_ok();
    let mut session = TransferSession::new(source.path(), config());

    let outcome = session.run(&mut transport, |_| {}).unwrap();

    assert!(outcome.success());
    assert_eq!(outcome.lines_processed, 3);
    assert_eq!(outcome.lines_sent, 0);
    let written = transport.written();
    assert_eq!(written[0], "M21");
    assert!(written[1].starts_with("M28 "));
    assert_eq!(written[2], "M29");
    assert_eq!(written.len(), 3);
}

#[test]
fn test_cancel_after_line_fifty() {
    let lines = data_program(200);
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    let source = write_source(&refs);

    let cancel = CancelToken::new();
    let trigger = cancel.clone();
    let mut transport = MockTransport::new(move |line| {
        if line == "G1 X50" {
            trigger.cancel();
        }
        vec!["ok".to_string()]
    });
    let mut session = TransferSession::new(source.path(), config()).with_cancel_token(cancel);

    let outcome = session.run(&mut transport, |_| {}).unwrap();

    assert_eq!(outcome.state, TransferState::Aborted);
    assert!(outcome.error.as_ref().is_some_and(|e| e.is_abort()));
    assert_eq!(outcome.lines_sent, 50);
    assert_eq!(outcome.lines_processed, 50);

    let written = transport.written();
    assert_eq!(written.last().map(String::as_str), Some("G1 X50"));
    assert!(!written.iter().any(|line| line == "M29"));
    // The acknowledgment of line 50 was still read.
    assert_eq!(transport.reads(), 52);
    assert_eq!(transport.closes(), 1);
}

#[test]
fn test_cancel_before_start_never_opens() {
    let source = write_source(&["G28"]);
    let mut transport = MockTransport::always_ok();
    let mut session = TransferSession::new(source.path(), config());
    session.cancel_token().cancel();

    let outcome = session.run(&mut transport, |_| {}).unwrap();

    assert_eq!(outcome.state, TransferState::Aborted);
    assert!(transport.written().is_empty());
    assert_eq!(transport.log().lock().opens, 0);
}

#[test]
fn test_connection_failure() {
    let source = write_source(&["G28"]);
    let mut transport = MockTransport::failing_open();
    let mut session = TransferSession::new(source.path(), config());

    let outcome = session.run(&mut transport, |_| {}).unwrap();

    assert_eq!(outcome.state, TransferState::Failed);
    assert!(outcome.error.as_ref().is_some_and(|e| e.is_connection_error()));
    assert!(transport.written().is_empty());
    assert_eq!(transport.close_calls(), 1);
}

#[test]
fn test_unreadable_source_touches_no_device() {
    let mut transport = MockTransport::always_ok();
    let mut session = TransferSession::new("/nonexistent/sdlink/part.gcode", config());

    let outcome = session.run(&mut transport, |_| {}).unwrap();

    assert_eq!(outcome.state, TransferState::Failed);
    assert!(outcome.error.as_ref().is_some_and(|e| e.is_io_error()));
    assert_eq!(transport.log().lock().opens, 0);
}

#[test]
fn test_invalid_remote_name_rejected() {
    let source = write_source(&["G28"]);
    let mut transport = MockTransport::always_ok();
    let config = SessionConfig {
        remote_name: Some("my part.gco".to_string()),
        ..config()
    };
    let mut session = TransferSession::new(source.path(), config);

    let outcome = session.run(&mut transport, |_| {}).unwrap();

    assert_eq!(outcome.state, TransferState::Failed);
    assert!(transport.written().is_empty());
}

#[test]
fn test_strict_timeout_policy_fails_silent_firmware() {
    let source = write_source(&["G28"]);
    let mut transport = MockTransport::silent();
    let config = SessionConfig {
        timeout_policy: TimeoutPolicy::Fail,
        ..config()
    };
    let mut session = TransferSession::new(source.path(), config);

    let outcome = session.run(&mut transport, |_| {}).unwrap();

    assert_eq!(outcome.state, TransferState::Failed);
    assert!(outcome.error.as_ref().is_some_and(|e| e.is_command_error()));
    assert_eq!(transport.written(), vec!["M21"]);
}

#[test]
fn test_silent_firmware_succeeds_under_legacy_policy() {
    let source = write_source(&["G28", "G1 X1"]);
    let mut transport = MockTransport::silent();
    let mut session = TransferSession::new(source.path(), config());

    let outcome = session.run(&mut transport, |_| {}).unwrap();

    assert!(outcome.success());
    assert_eq!(outcome.lines_sent, 2);
}

#[test]
fn test_final_progress_can_be_disabled() {
    let source = write_source(&ten_line_program());
    let mut transport = MockTransport::always_ok();
    let config = SessionConfig {
        progress: ProgressPolicy {
            emit_final: false,
            ..ProgressPolicy::default()
        },
        ..config()
    };
    let mut session = TransferSession::new(source.path(), config);
    let mut events = 0;

    session.run(&mut transport, |_| events += 1).unwrap();

    assert_eq!(events, 0);
}

#[test]
fn test_session_is_single_use() {
    let source = write_source(&["G28"]);
    let mut transport = MockTransport::always_ok();
    let mut session = TransferSession::new(source.path(), config());

    session.run(&mut transport, |_| {}).unwrap();
    assert!(session.run(&mut transport, |_| {}).is_err());
    assert_eq!(session.state(), TransferState::Completed);
}

#[test]
fn test_panic_in_observer_still_closes_connection() {
    let lines = data_program(150);
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    let source = write_source(&refs);
    let mut transport = MockTransport::always_ok();
    let log = transport.log();
    let mut session = TransferSession::new(source.path(), config());

    let result = catch_unwind(AssertUnwindSafe(|| {
        session.run(&mut transport, |_| panic!("observer failed"))
    }));

    assert!(result.is_err());
    assert_eq!(log.lock().closes, 1);
    assert_eq!(session.state(), TransferState::Failed);
}

#[test]
fn test_link_hang_up_fails_transfer() {
    let lines = data_program(20);
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    let source = write_source(&refs);
    // M21, M28 and five data lines go out before the link drops
    let mut transport = MockTransport::always_ok().hanging_up_after(7);
    let mut session = TransferSession::new(source.path(), config());

    let outcome = session.run(&mut transport, |_| {}).unwrap();

    assert_eq!(outcome.state, TransferState::Failed);
    assert!(outcome.error.as_ref().is_some_and(|e| e.is_connection_error()));
    assert_eq!(outcome.lines_sent, 4);
    assert!(!transport.written().contains(&"M29".to_string()));
    assert_eq!(transport.closes(), 1);
}

/// Log sink shared with the test body
struct LogCapture(ThreadSafe<Vec<u8>>);

impl Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_log_lines_carry_session_id() {
    let source = write_source(&["G28", "G1 X1"]);
    let mut transport = MockTransport::always_ok();
    let mut session = TransferSession::new(source.path(), config());

    let captured = thread_safe(Vec::new());
    let sink = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .with_writer(move || LogCapture(sink.clone()))
        .finish();

    let outcome = tracing::subscriber::with_default(subscriber, || {
        session.run(&mut transport, |_| {}).unwrap()
    });
    assert!(outcome.success());

    let logs = String::from_utf8_lossy(&captured.lock()).into_owned();
    let tag = format!("session_id={}", outcome.session_id);
    let lines: Vec<&str> = logs.lines().collect();
    assert!(lines.iter().any(|line| line.contains("Initializing SD card")));
    assert!(lines.iter().any(|line| line.contains("Sending command: M29")));
    for line in lines {
        assert!(line.contains(&tag), "untagged log line: {}", line);
    }
}
