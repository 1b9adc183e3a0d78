//! # SDLink
//!
//! Stores G-code programs on a Marlin 3D printer's SD card over a serial
//! link, using the firmware's line-by-line `ok` flow control.
//!
//! ## Architecture
//!
//! SDLink is organized as a workspace with multiple crates:
//!
//! 1. **sdlink-core** - Errors, transfer states, progress events, policies
//! 2. **sdlink-communication** - Serial transport, Marlin protocol, transfer sessions
//! 3. **sdlink-settings** - TOML/JSON configuration
//! 4. **sdlink** - Command-line binary that integrates all crates

pub use sdlink_communication::{
    classify, CancelToken, Command, CommandChannel, CommandOutcome, ConnectionParams,
    GcodeSource, MarlinResponse, SerialTransport, SessionConfig, TransferOutcome,
    TransferSession, Transport,
};

pub use sdlink_core::{
    CommandError, ConnectionError, Error, ProgressCallback, ProgressEvent, ProgressPolicy,
    Result, TimeoutPolicy, TransferError, TransferState,
};

pub use sdlink_settings::{default_config_path, Config, ConnectionSettings, TransferSettings};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging
///
/// Sets up structured logging with:
/// - Output on stderr, leaving stdout for progress and results
/// - RUST_LOG environment variable support
/// - `info` level by default, `debug` when `verbose` is set
pub fn init_logging(verbose: bool) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let default_level = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_thread_names(true)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
