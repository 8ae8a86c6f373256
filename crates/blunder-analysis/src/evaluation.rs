//! Engine evaluation of a single move or position.

use serde::Serialize;
use uci::{ScoreTokens, UciError};

/// Result of one engine query.
///
/// Scores are from the side to move's perspective, exactly as the engine
/// reports them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Evaluation {
    /// The move the engine settled on (in UCI notation, e.g. "e2e4").
    pub best_move: String,
    /// Centipawn score, 0 when the engine reported none.
    pub centipawns: i32,
    /// Mate distance (negative = side to move is being mated), 0 when none.
    pub mate_in: i32,
}

impl Evaluation {
    /// Build an evaluation from the last `info` line of a search.
    ///
    /// An empty line or a line without score tokens gives `(0, 0)`. A score
    /// token with a malformed value is an error.
    ///
    /// # Examples
    ///
    /// ```
    /// use blunder_analysis::Evaluation;
    ///
    /// let line = "info depth 20 score cp 35 nodes 10";
    /// let eval = Evaluation::from_info_line("e2e4", line).unwrap();
    /// assert_eq!(eval.centipawns, 35);
    /// assert_eq!(eval.mate_in, 0);
    /// ```
    pub fn from_info_line(best_move: impl Into<String>, line: &str) -> Result<Self, UciError> {
        let tokens = ScoreTokens::scan(line)?;
        Ok(Self {
            best_move: best_move.into(),
            centipawns: tokens.centipawns(),
            mate_in: tokens.mate_in(),
        })
    }

    /// True when the side to move is being mated within `horizon`.
    pub fn is_mated_within(&self, horizon: i32) -> bool {
        self.mate_in < 0 && self.mate_in >= -horizon
    }
}
