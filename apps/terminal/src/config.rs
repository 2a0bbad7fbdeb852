//! # Station Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     TALLY_DB_PATH=/srv/tally/tally.db                                  │
//! │     TALLY_TAKE_CODE=TAKE                                               │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     --config <path>, or                                                │
//! │     ~/.config/tally/tally.toml (Linux)                                 │
//! │     ~/Library/Application Support/com.tally.tally/tally.toml (macOS)   │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     markers 1 / 2 / 3, store in the platform data directory            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [store]
//! path = "/var/lib/tally/tally.db"
//!
//! [markers]
//! take = "1"
//! return = "2"
//! cancel = "3"
//!
//! [display]
//! history_limit = 20
//! format = "text"   # text | json
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, warn};

use tally_core::validation::validate_markers;
use tally_core::{ScanMarkers, ValidationError};

const CONFIG_FILE_NAME: &str = "tally.toml";
const DB_FILE_NAME: &str = "tally.db";

// =============================================================================
// Errors
// =============================================================================

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    ParseFailed(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(#[from] ValidationError),

    #[error("could not determine the platform data directory")]
    NoDataDir,
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Settings
// =============================================================================

/// `[store]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Database file. Defaults to the platform data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// How reports are written to stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Status lines and a table for people at the station.
    #[default]
    Text,

    /// One JSON object per line for a wrapping process.
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown output format: {}", other)),
        }
    }
}

/// `[display]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplaySettings {
    /// Rows shown by `/history` without an argument.
    #[serde(default = "default_history_limit")]
    pub history_limit: u32,

    #[serde(default)]
    pub format: OutputFormat,
}

fn default_history_limit() -> u32 {
    20
}

impl Default for DisplaySettings {
    fn default() -> Self {
        DisplaySettings {
            history_limit: default_history_limit(),
            format: OutputFormat::default(),
        }
    }
}

/// Everything the station reads at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub store: StoreSettings,

    #[serde(default)]
    pub markers: ScanMarkers,

    #[serde(default)]
    pub display: DisplaySettings,
}

impl AppConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file: `config_path` if given (must exist), else the
    ///    platform config file when present
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = match config_path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_config_path() {
                Some(path) if path.exists() => Self::from_file(path)?,
                Some(path) => {
                    debug!(?path, "Config file not found, using defaults");
                    Self::default()
                }
                None => Self::default(),
            },
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Parses a TOML file.
    pub fn from_file(path: PathBuf) -> ConfigResult<Self> {
        info!(?path, "Loading config from file");
        let contents = std::fs::read_to_string(&path)
            .map_err(|source| ConfigError::ReadFailed { path, source })?;
        Self::from_toml(&contents)
    }

    /// Parses TOML text. Missing sections take their defaults.
    pub fn from_toml(contents: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Marker codes must be non-empty and pairwise distinct.
    pub fn validate(&self) -> ConfigResult<()> {
        validate_markers(&self.markers)?;
        Ok(())
    }

    /// The configured store path, or `<data dir>/tally.db`.
    pub fn database_path(&self) -> ConfigResult<PathBuf> {
        if let Some(path) = &self.store.path {
            return Ok(path.clone());
        }

        directories::ProjectDirs::from("com", "tally", "tally")
            .map(|dirs| dirs.data_dir().join(DB_FILE_NAME))
            .ok_or(ConfigError::NoDataDir)
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies `TALLY_*` overrides from `lookup`.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("TALLY_DB_PATH") {
            debug!(path = %path, "Overriding store path from environment");
            self.store.path = Some(PathBuf::from(path));
        }

        if let Some(code) = lookup("TALLY_TAKE_CODE") {
            self.markers.take = code;
        }

        if let Some(code) = lookup("TALLY_RETURN_CODE") {
            self.markers.return_ = code;
        }

        if let Some(code) = lookup("TALLY_CANCEL_CODE") {
            self.markers.cancel = code;
        }

        if let Some(format) = lookup("TALLY_OUTPUT") {
            match format.parse() {
                Ok(parsed) => self.display.format = parsed,
                Err(e) => warn!("Ignoring TALLY_OUTPUT: {}", e),
            }
        }

        if let Some(limit) = lookup("TALLY_HISTORY_LIMIT") {
            match limit.parse::<u32>() {
                Ok(n) => self.display.history_limit = n,
                Err(_) => warn!(value = %limit, "Ignoring non-numeric TALLY_HISTORY_LIMIT"),
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "tally", "tally")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }
}
