//! Blunder detection with a UCI analysis engine.
//!
//! This crate reads `ply,fen,move` records, scores each played move with an
//! engine such as Stockfish, and flags moves whose score falls sharply
//! compared to the mover's previous score.
//!
//! # Overview
//!
//! - [`EngineSession`] - Command/response channel to a UCI engine
//! - [`EngineProcess`] - A spawned engine that is killed when dropped
//! - [`Evaluation`] - Centipawn and mate scores of one search
//! - [`MoveStream`] - Decodes the input record stream
//! - [`BlunderClassifier`] - Per-game state machine that flags and confirms blunders
//! - [`Scanner`] - Runs records through the classifier into a [`FindingSink`]
//!
//! # Example
//!
//! ```ignore
//! use blunder_analysis::{
//!     EngineProcess, MemorySink, MoveStream, Scanner, SearchLimits, Thresholds,
//! };
//!
//! let mut engine = EngineProcess::spawn("stockfish", SearchLimits::default())?;
//! let mut sink = MemorySink::new();
//! let records = MoveStream::new(std::io::stdin().lock());
//! let summary = Scanner::new(Thresholds::default()).run(records, &mut engine, &mut sink, |_| {})?;
//! println!("{} blunders", summary.findings);
//! ```

pub mod classifier;
pub mod engine;
pub mod evaluation;
pub mod finding;
pub mod records;
pub mod scan;

pub use classifier::{BlunderClassifier, Step, Thresholds};
pub use engine::{EngineError, EngineProcess, EngineSession, PositionEvaluator, SearchLimits};
pub use evaluation::Evaluation;
pub use finding::Finding;
pub use records::{MoveRecord, MoveStream, RecordError};
pub use scan::{FindingSink, MemorySink, RecordOutcome, ScanError, ScanSummary, Scanner, SinkError};
