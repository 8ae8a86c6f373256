//! Blunder Scan - finds blunders in EPD move streams.
//!
//! This crate wires the [`blunder_analysis`] pipeline to its outer surfaces.
//!
//! # Modules
//!
//! - [`config`] - TOML configuration with defaults
//! - [`storage`] - SQLite sink for confirmed findings
//! - [`json_output`] - JSON-lines sink used by dry runs
//! - [`progress`] - In-place game counter on the console

pub mod config;
pub mod json_output;
pub mod progress;
pub mod storage;
