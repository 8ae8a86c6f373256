//! UCI (Universal Chess Interface) line grammar for driving an engine.
//!
//! This crate covers the GUI side of the protocol: formatting the commands a
//! driver sends and classifying the lines an engine answers with.
//!
//! # Commands
//!
//! - `uci` - Initialize engine, answered by `id ...` lines and `uciok`
//! - `isready` / `readyok` - Synchronization
//! - `position fen <fen>` - Set position
//! - `go [depth <d>] movetime <ms> [searchmoves <move>...]` - Start search
//! - `quit` - Exit engine
//!
//! # Engine output
//!
//! - `info ... score cp <n> ...` / `info ... score mate <n> ...` - Search progress
//! - `bestmove <move> [ponder <move>]` - Search result

mod command;
mod info;

pub use command::{GoOptions, GuiCommand};
pub use info::ScoreTokens;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum UciError {
    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Lines sent from engine to GUI.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineLine {
    /// Engine identification (`id name ...`).
    Id { name: String },
    /// UCI initialization complete.
    UciOk,
    /// Engine is ready.
    ReadyOk,
    /// Search information, kept verbatim for later score extraction.
    Info(String),
    /// Best move found. `mv` is empty when the engine reported no legal move.
    /// A trailing `ponder` suggestion is ignored.
    BestMove { mv: String },
    /// Anything else (banners, options, `id author`, ...).
    Other(String),
}

impl EngineLine {
    /// Classify a single line of engine output.
    ///
    /// `uciok` and `readyok` must match the whole (trimmed) line; `info` and
    /// `bestmove` only need to prefix it.
    pub fn parse(line: &str) -> Self {
        let line = line.trim();

        if line == "uciok" {
            return EngineLine::UciOk;
        }
        if line == "readyok" {
            return EngineLine::ReadyOk;
        }
        if let Some(name) = line.strip_prefix("id name ") {
            return EngineLine::Id {
                name: name.to_string(),
            };
        }
        if line.starts_with("bestmove") {
            let mv = line
                .split_whitespace()
                .nth(1)
                .map(move_token)
                .unwrap_or_default();
            return EngineLine::BestMove { mv };
        }
        if line.starts_with("info") {
            return EngineLine::Info(line.to_string());
        }
        EngineLine::Other(line.to_string())
    }
}

/// Leading run of lowercase letters and digits, e.g. `e7e8q` from `e7e8q`
/// and nothing from `(none)`.
fn move_token(token: &str) -> String {
    token
        .chars()
        .take_while(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect()
}
