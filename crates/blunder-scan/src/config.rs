//! Configuration file loading for the blunder scanner.
//!
//! Settings come from an optional TOML file (`blunder-scan.toml` in the
//! current directory by default). Command-line flags are applied on top by
//! the binary.

use blunder_analysis::classifier::{
    DEFAULT_MATE_HORIZON, DEFAULT_MAX_CENTIPAWN_DROP, DEFAULT_MIN_PLY,
};
use blunder_analysis::engine::{DEFAULT_MAX_DEPTH, DEFAULT_MOVETIME_MS};
use blunder_analysis::{SearchLimits, Thresholds};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur when loading or parsing configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse the configuration file as valid TOML.
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    /// A setting is out of range.
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Where findings are stored.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SinkConfig {
    /// Path to the SQLite database file.
    /// Defaults to "data/blunders.db".
    #[serde(default = "default_database")]
    pub database: PathBuf,
    /// Table findings are written to. Defaults to "positions".
    #[serde(default = "default_table")]
    pub table: String,
}

fn default_database() -> PathBuf {
    PathBuf::from("data/blunders.db")
}

fn default_table() -> String {
    "positions".to_string()
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
            table: default_table(),
        }
    }
}

/// Engine search settings.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SearchConfig {
    /// Think time per search in milliseconds. Defaults to 1000.
    #[serde(default = "default_movetime")]
    pub movetime_ms: u64,
    /// Depth cap, only sent when `depth_capped` is set. Defaults to 25.
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,
    /// Send `depth <max_depth>` with every search.
    #[serde(default)]
    pub depth_capped: bool,
}

fn default_movetime() -> u64 {
    DEFAULT_MOVETIME_MS
}

fn default_max_depth() -> u32 {
    DEFAULT_MAX_DEPTH
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            movetime_ms: default_movetime(),
            max_depth: default_max_depth(),
            depth_capped: false,
        }
    }
}

/// Blunder thresholds.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ThresholdConfig {
    /// First evaluated ply. Defaults to 12.
    #[serde(default = "default_min_ply")]
    pub min_ply: u32,
    /// Centipawn drop that counts as a blunder. Defaults to 300.
    #[serde(default = "default_max_centipawn_drop")]
    pub max_centipawn_drop: i32,
    /// Mate horizon in moves. Defaults to 5.
    #[serde(default = "default_mate_horizon")]
    pub mate_horizon: i32,
}

fn default_min_ply() -> u32 {
    DEFAULT_MIN_PLY
}

fn default_max_centipawn_drop() -> i32 {
    DEFAULT_MAX_CENTIPAWN_DROP
}

fn default_mate_horizon() -> i32 {
    DEFAULT_MATE_HORIZON
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            min_ply: default_min_ply(),
            max_centipawn_drop: default_max_centipawn_drop(),
            mate_horizon: default_mate_horizon(),
        }
    }
}

/// Main scanner configuration.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ScanConfig {
    /// Path to the UCI engine.
    /// Defaults to "stockfish" (assumes it's in PATH).
    #[serde(default = "default_engine")]
    pub engine: PathBuf,
    #[serde(default)]
    pub sink: SinkConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub thresholds: ThresholdConfig,
}

fn default_engine() -> PathBuf {
    PathBuf::from("stockfish")
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            engine: default_engine(),
            sink: SinkConfig::default(),
            search: SearchConfig::default(),
            thresholds: ThresholdConfig::default(),
        }
    }
}

impl ScanConfig {
    /// Loads the configuration from the default path.
    ///
    /// Returns the default configuration if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ReadError`] if the file exists but cannot be read,
    /// or [`ConfigError::ParseError`] if the file contains invalid TOML.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads the configuration from an explicit path, which must exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Returns the path to the configuration file.
    ///
    /// Currently returns `blunder-scan.toml` in the current working directory.
    pub fn config_path() -> PathBuf {
        PathBuf::from("blunder-scan.toml")
    }

    /// Check that every setting is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.search.movetime_ms == 0 {
            return Err(ConfigError::Invalid("movetime_ms must be positive".to_string()));
        }
        if self.thresholds.max_centipawn_drop <= 0 {
            return Err(ConfigError::Invalid(
                "max_centipawn_drop must be positive".to_string(),
            ));
        }
        if self.thresholds.mate_horizon < 0 {
            return Err(ConfigError::Invalid(
                "mate_horizon must not be negative".to_string(),
            ));
        }
        if !is_identifier(&self.sink.table) {
            return Err(ConfigError::Invalid(format!(
                "table name '{}' must match [A-Za-z_][A-Za-z0-9_]*",
                self.sink.table
            )));
        }
        Ok(())
    }

    /// Search limits handed to the engine session.
    pub fn search_limits(&self) -> SearchLimits {
        SearchLimits {
            movetime_ms: self.search.movetime_ms,
            depth: self.search.depth_capped.then_some(self.search.max_depth),
        }
    }

    /// Classifier thresholds.
    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            min_ply: self.thresholds.min_ply,
            max_centipawn_drop: self.thresholds.max_centipawn_drop,
            mate_horizon: self.thresholds.mate_horizon,
        }
    }
}

/// SQL identifier check for user-supplied table names.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
