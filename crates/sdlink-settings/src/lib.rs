//! SDLink Settings Crate
//!
//! Handles configuration files for connections and transfers.

pub mod config;
pub mod error;

pub use config::{default_config_path, Config, ConnectionSettings, TransferSettings};
pub use error::{ConfigError, SettingsError, SettingsResult};
