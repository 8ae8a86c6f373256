//! Confirmed blunders.

use serde::Serialize;

/// Severity assigned to moves that walk into a forced mate.
pub const MATE_SEVERITY: i32 = 10_000;

/// A confirmed blunder, ready to be recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    /// Position the blunder was played from, in FEN.
    pub position: String,
    /// The move that was played.
    pub played_move: String,
    /// Engine score of the played move, in centipawns.
    pub centipawns: i32,
    /// Mate distance after the played move (0 if none).
    pub mate_distance: i32,
    /// The engine's preferred move.
    pub best_move: String,
    /// Score drop in centipawns, or [`MATE_SEVERITY`] for mates.
    pub severity: i32,
}
