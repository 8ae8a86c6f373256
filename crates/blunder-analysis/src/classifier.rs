//! Blunder classification over a stream of played moves.
//!
//! This module provides the [`BlunderClassifier`], a per-game state machine
//! fed one [`MoveRecord`] at a time, in ply order.

use crate::engine::{EngineError, PositionEvaluator};
use crate::evaluation::Evaluation;
use crate::finding::{Finding, MATE_SEVERITY};
use crate::records::MoveRecord;
use tracing::debug;

/// Default first ply that is evaluated (12 half-moves played).
pub const DEFAULT_MIN_PLY: u32 = 12;

/// Default score drop, in centipawns, that counts as a blunder.
pub const DEFAULT_MAX_CENTIPAWN_DROP: i32 = 300;

/// Default mate horizon in moves.
pub const DEFAULT_MATE_HORIZON: i32 = 5;

/// Thresholds used to flag and confirm blunders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    /// Plies below this are skipped; this ply seeds the score memory.
    pub min_ply: u32,
    /// Minimum score drop (inclusive) for a centipawn blunder.
    pub max_centipawn_drop: i32,
    /// Mates at most this far away count.
    pub mate_horizon: i32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_ply: DEFAULT_MIN_PLY,
            max_centipawn_drop: DEFAULT_MAX_CENTIPAWN_DROP,
            mate_horizon: DEFAULT_MATE_HORIZON,
        }
    }
}

/// Side to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    White,
    Black,
}

impl Side {
    fn flip(self) -> Self {
        match self {
            Side::White => Side::Black,
            Side::Black => Side::White,
        }
    }
}

/// Running per-side memory of the last score seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnState {
    /// Whose move the next record is assumed to be.
    pub side: Side,
    /// Last score of a white move.
    pub last_white: i32,
    /// Last score of a black move.
    pub last_black: i32,
    /// Games whose baseline has been passed, for progress reporting.
    pub games: u32,
}

impl Default for TurnState {
    fn default() -> Self {
        Self {
            side: Side::White,
            last_white: 0,
            last_black: 0,
            games: 0,
        }
    }
}

impl TurnState {
    fn slot_mut(&mut self) -> &mut i32 {
        match self.side {
            Side::White => &mut self.last_white,
            Side::Black => &mut self.last_black,
        }
    }

    /// Store `score` for the side to move and return the previous value.
    fn replace(&mut self, score: i32) -> i32 {
        std::mem::replace(self.slot_mut(), score)
    }

    /// Flip the side to move; returns true when a new game is counted.
    fn flip(&mut self, count_game: bool) -> bool {
        self.side = self.side.flip();
        if count_game && self.side == Side::White {
            self.games += 1;
            return true;
        }
        false
    }
}

/// What processing one record amounted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Below the minimum ply; nothing was evaluated.
    Skipped,
    /// The baseline ply seeded the score memory.
    Baseline {
        /// Whether this baseline completed a game count.
        new_game: bool,
    },
    /// Evaluated, no blunder.
    Clean,
    /// Flagged, but the best-move check did not confirm it.
    Rejected {
        /// Severity the move was flagged with.
        severity: i32,
    },
    /// Flagged and confirmed.
    Blunder(Finding),
}

/// Severity of the played move given the mover's previous score, if any.
///
/// A move that lets the mover be mated within the horizon scores
/// [`MATE_SEVERITY`]. Any other mate against the mover is not checked for a
/// centipawn drop. Otherwise the move must leave the mover worse off than
/// zero and than before, by at least `max_centipawn_drop`.
///
/// # Examples
///
/// ```
/// use blunder_analysis::classifier::{classify_drop, Thresholds};
/// use blunder_analysis::Evaluation;
///
/// let played = Evaluation { centipawns: -150, ..Evaluation::default() };
/// assert_eq!(classify_drop(200, &played, &Thresholds::default()), Some(350));
/// ```
pub fn classify_drop(prev: i32, played: &Evaluation, thresholds: &Thresholds) -> Option<i32> {
    let cur = played.centipawns;

    if played.mate_in < 0 {
        return played
            .is_mated_within(thresholds.mate_horizon)
            .then_some(MATE_SEVERITY);
    }

    let drop = prev.saturating_sub(cur);
    (cur < 0 && cur < prev && drop >= thresholds.max_centipawn_drop).then_some(drop)
}

/// Whether the engine's own choice confirms a flagged blunder.
///
/// The best move must differ from the played one and either be positive and
/// at least `max_centipawn_drop` better, or mate the opponent inside the
/// horizon.
pub fn confirms(
    played_move: &str,
    played: &Evaluation,
    best: &Evaluation,
    thresholds: &Thresholds,
) -> bool {
    if best.best_move == played_move {
        return false;
    }

    let better_score = best.centipawns > 0
        && best.centipawns.saturating_sub(played.centipawns) >= thresholds.max_centipawn_drop;
    let mates = best.mate_in > 0 && best.mate_in < thresholds.mate_horizon;

    better_score || mates
}

/// Streaming blunder detector.
///
/// Holds the [`TurnState`] for the stream; the engine is borrowed per call so
/// the caller keeps ownership of the session.
#[derive(Debug, Clone, Default)]
pub struct BlunderClassifier {
    thresholds: Thresholds,
    state: TurnState,
}

impl BlunderClassifier {
    /// Creates a classifier with the given thresholds.
    pub fn new(thresholds: Thresholds) -> Self {
        Self {
            thresholds,
            state: TurnState::default(),
        }
    }

    /// Thresholds in use.
    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Current score memory.
    pub fn state(&self) -> &TurnState {
        &self.state
    }

    /// Number of games counted so far.
    pub fn games(&self) -> u32 {
        self.state.games
    }

    /// Process the next record of the stream.
    ///
    /// 1. Plies below `min_ply` are skipped without touching the engine.
    /// 2. The `min_ply` record resets both sides' memory and seeds the mover's.
    /// 3. Later records are scored, the mover's memory is updated, and the
    ///    move is checked with [`classify_drop`].
    /// 4. Flagged moves are confirmed against the engine's best move with
    ///    [`confirms`].
    ///
    /// # Errors
    ///
    /// Any engine error is returned unchanged; the state is left as it was
    /// before the failing query.
    pub fn process<E: PositionEvaluator + ?Sized>(
        &mut self,
        engine: &mut E,
        record: &MoveRecord,
    ) -> Result<Step, EngineError> {
        let thresholds = self.thresholds;
        let min_ply = i64::from(thresholds.min_ply);

        if record.ply < min_ply {
            return Ok(Step::Skipped);
        }

        let played = engine.evaluate_move(&record.position, &record.played_move)?;

        if record.ply == min_ply {
            self.state.last_white = 0;
            self.state.last_black = 0;
            self.state.replace(played.centipawns);
            let new_game = self.state.flip(true);
            return Ok(Step::Baseline { new_game });
        }

        let prev = self.state.replace(played.centipawns);

        let step = match classify_drop(prev, &played, &thresholds) {
            None => Step::Clean,
            Some(severity) => {
                debug!(
                    ply = record.ply,
                    played = %record.played_move,
                    prev,
                    cp = played.centipawns,
                    mate = played.mate_in,
                    severity,
                    "move flagged"
                );
                let best = match engine.best_move(&record.position) {
                    Ok(best) => best,
                    Err(e) => {
                        self.state.replace(prev);
                        return Err(e);
                    }
                };

                if confirms(&record.played_move, &played, &best, &thresholds) {
                    Step::Blunder(Finding {
                        position: record.position.clone(),
                        played_move: record.played_move.clone(),
                        centipawns: played.centipawns,
                        mate_distance: played.mate_in,
                        best_move: best.best_move,
                        severity,
                    })
                } else {
                    Step::Rejected { severity }
                }
            }
        };

        self.state.flip(false);
        Ok(step)
    }
}
