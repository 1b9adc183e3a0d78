//! Configuration for SDLink
//!
//! Provides configuration file handling and validation. Supports JSON and
//! TOML file formats, chosen by file extension.
//!
//! Configuration is organized into sections:
//! - Connection settings (port, baud rate, timeouts)
//! - Transfer settings (progress cadence, timeout policy)

use crate::error::{ConfigError, SettingsError, SettingsResult};
use sdlink_communication::{ConnectionParams, SessionConfig};
use sdlink_core::constants::{
    DEFAULT_BAUD_RATE, DEFAULT_PROGRESS_EVERY_LINES, DEFAULT_READ_TIMEOUT_MS, DEFAULT_SETTLE_MS,
};
use sdlink_core::{ProgressPolicy, TimeoutPolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionSettings {
    /// Serial port (e.g., "/dev/ttyUSB0", "COM7")
    pub port: String,
    /// Baud rate for the serial link
    pub baud_rate: u32,
    /// Read timeout for one response line in milliseconds
    pub timeout_ms: u64,
    /// Pause after opening the port in milliseconds
    pub settle_ms: u64,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
            timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            settle_ms: DEFAULT_SETTLE_MS,
        }
    }
}

/// Transfer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferSettings {
    /// Report progress after this many processed lines (0 disables)
    pub progress_every_lines: u64,
    /// Also report whenever progress advanced by this fraction
    pub progress_min_step: Option<f64>,
    /// Report 100% once the transfer completes
    pub emit_final_progress: bool,
    /// How a command that got no answer before the timeout is judged
    pub timeout_policy: TimeoutPolicy,
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            progress_every_lines: DEFAULT_PROGRESS_EVERY_LINES,
            progress_min_step: None,
            emit_final_progress: true,
            timeout_policy: TimeoutPolicy::default(),
        }
    }
}

impl TransferSettings {
    /// Progress policy described by these settings
    pub fn progress_policy(&self) -> ProgressPolicy {
        ProgressPolicy {
            every_lines: self.progress_every_lines,
            min_fraction_step: self.progress_min_step,
            emit_final: self.emit_final_progress,
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Connection settings
    pub connection: ConnectionSettings,
    /// Transfer settings
    pub transfer: TransferSettings,
}

enum Format {
    Json,
    Toml,
}

fn format_of(path: &Path) -> SettingsResult<Format> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => Ok(Format::Json),
        Some("toml") => Ok(Format::Toml),
        other => Err(ConfigError::UnsupportedFormat(other.unwrap_or("").to_string()).into()),
    }
}

fn out_of_range(key: &str, value: impl ToString) -> SettingsError {
    ConfigError::ValueOutOfRange {
        key: key.to_string(),
        value: value.to_string(),
    }
    .into()
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let format = format_of(path)?;
        let content = std::fs::read_to_string(path).map_err(|e| {
            SettingsError::LoadError(format!("{}: {}", path.display(), e))
        })?;

        let config: Self = match format {
            Format::Json => serde_json::from_str(&content)?,
            Format::Toml => toml::from_str(&content)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Load config from file if it exists, defaults otherwise
    pub fn load_or_default(path: &Path) -> SettingsResult<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = match format_of(path)? {
            Format::Json => serde_json::to_string_pretty(self)?,
            Format::Toml => toml::to_string_pretty(self)?,
        };

        std::fs::write(path, content)
            .map_err(|e| SettingsError::SaveError(format!("{}: {}", path.display(), e)))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> SettingsResult<()> {
        if self.connection.baud_rate == 0 {
            return Err(out_of_range("connection.baud_rate", self.connection.baud_rate));
        }

        if self.connection.timeout_ms == 0 {
            return Err(out_of_range("connection.timeout_ms", self.connection.timeout_ms));
        }

        if let Some(step) = self.transfer.progress_min_step {
            if !(step > 0.0 && step <= 1.0) {
                return Err(out_of_range("transfer.progress_min_step", step));
            }
        }

        if self.transfer.progress_every_lines == 0 && self.transfer.progress_min_step.is_none() {
            return Err(out_of_range(
                "transfer.progress_every_lines",
                self.transfer.progress_every_lines,
            ));
        }

        Ok(())
    }

    /// Connection parameters described by this config
    pub fn connection_params(&self) -> ConnectionParams {
        ConnectionParams::new(self.connection.port.clone())
            .with_baud_rate(self.connection.baud_rate)
            .with_timeout_ms(self.connection.timeout_ms)
            .with_settle_ms(self.connection.settle_ms)
    }

    /// Session configuration described by this config
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            connection: self.connection_params(),
            timeout_policy: self.transfer.timeout_policy,
            progress: self.transfer.progress_policy(),
            remote_name: None,
        }
    }
}

/// Default location of the config file
///
/// `<config dir>/sdlink/config.toml`, falling back to the home directory.
pub fn default_config_path() -> PathBuf {
    let mut path = dirs::config_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."));
    path.push("sdlink");
    path.push("config.toml");
    path
}
