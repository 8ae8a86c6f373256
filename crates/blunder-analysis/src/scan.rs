//! The record → engine → sink pipeline.

use crate::classifier::{BlunderClassifier, Step, Thresholds};
use crate::engine::{EngineError, PositionEvaluator};
use crate::finding::Finding;
use crate::records::{MoveRecord, RecordError};
use serde::Serialize;
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, info};

/// Error reported by a [`FindingSink`].
#[derive(Error, Debug)]
#[error("Finding sink failed: {0}")]
pub struct SinkError(#[source] pub Box<dyn std::error::Error + Send + Sync>);

impl SinkError {
    /// Wrap a backend error.
    pub fn new<E: std::error::Error + Send + Sync + 'static>(err: E) -> Self {
        Self(Box::new(err))
    }
}

/// Errors that abort a scan.
#[derive(Error, Debug)]
pub enum ScanError {
    /// The input stream was malformed or unreadable.
    #[error(transparent)]
    Record(#[from] RecordError),
    /// The engine failed.
    #[error(transparent)]
    Engine(#[from] EngineError),
    /// The sink rejected a finding for a reason other than a duplicate.
    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// Result of handing a finding to a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Stored as a new entry.
    Inserted {
        /// Identifier assigned by the sink.
        id: i64,
    },
    /// The same position and move were already recorded.
    Duplicate,
}

/// Destination for confirmed findings.
///
/// Inserting a finding whose `(position, played_move)` pair is already
/// stored must return [`RecordOutcome::Duplicate`], not an error.
pub trait FindingSink {
    fn record(&mut self, finding: &Finding) -> Result<RecordOutcome, SinkError>;
}

/// Sink that keeps findings in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    seen: HashSet<(String, String)>,
    findings: Vec<Finding>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Findings stored so far, in insertion order.
    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }
}

impl FindingSink for MemorySink {
    fn record(&mut self, finding: &Finding) -> Result<RecordOutcome, SinkError> {
        let key = (finding.position.clone(), finding.played_move.clone());
        if !self.seen.insert(key) {
            return Ok(RecordOutcome::Duplicate);
        }
        self.findings.push(finding.clone());
        Ok(RecordOutcome::Inserted {
            id: self.findings.len() as i64,
        })
    }
}

/// Counters for a finished scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    /// Records read from the input.
    pub records: u64,
    /// Records that were evaluated by the engine.
    pub evaluated: u64,
    /// Moves flagged before confirmation.
    pub flagged: u64,
    /// Findings newly stored.
    pub findings: u64,
    /// Findings the sink already had.
    pub duplicates: u64,
    /// Games counted.
    pub games: u32,
}

/// Drives records through the classifier and stores what it confirms.
#[derive(Debug, Clone, Default)]
pub struct Scanner {
    classifier: BlunderClassifier,
}

impl Scanner {
    pub fn new(thresholds: Thresholds) -> Self {
        Self {
            classifier: BlunderClassifier::new(thresholds),
        }
    }

    /// The underlying classifier.
    pub fn classifier(&self) -> &BlunderClassifier {
        &self.classifier
    }

    /// Process every record until the stream ends.
    ///
    /// `on_game` is called with the new game count each time it grows.
    ///
    /// # Errors
    ///
    /// The first record, engine or sink error stops the scan. Duplicates are
    /// not errors.
    pub fn run<I, E, S, P>(
        &mut self,
        records: I,
        engine: &mut E,
        sink: &mut S,
        mut on_game: P,
    ) -> Result<ScanSummary, ScanError>
    where
        I: IntoIterator<Item = Result<MoveRecord, RecordError>>,
        E: PositionEvaluator + ?Sized,
        S: FindingSink + ?Sized,
        P: FnMut(u32),
    {
        let mut summary = ScanSummary::default();

        for record in records {
            let record = record?;
            summary.records += 1;

            match self.classifier.process(engine, &record)? {
                Step::Skipped => {}
                Step::Baseline { new_game } => {
                    summary.evaluated += 1;
                    if new_game {
                        on_game(self.classifier.games());
                    }
                }
                Step::Clean => summary.evaluated += 1,
                Step::Rejected { severity } => {
                    summary.evaluated += 1;
                    summary.flagged += 1;
                    debug!(
                        ply = record.ply,
                        played = %record.played_move,
                        severity,
                        "flagged move not confirmed by best move"
                    );
                }
                Step::Blunder(finding) => {
                    summary.evaluated += 1;
                    summary.flagged += 1;
                    match sink.record(&finding)? {
                        RecordOutcome::Inserted { id } => {
                            summary.findings += 1;
                            info!(
                                id,
                                fen = %finding.position,
                                played = %finding.played_move,
                                cp = finding.centipawns,
                                mate = finding.mate_distance,
                                best = %finding.best_move,
                                severity = finding.severity,
                                "recorded blunder"
                            );
                        }
                        RecordOutcome::Duplicate => {
                            summary.duplicates += 1;
                            debug!(
                                fen = %finding.position,
                                played = %finding.played_move,
                                "blunder already recorded"
                            );
                        }
                    }
                }
            }
        }

        summary.games = self.classifier.games();
        Ok(summary)
    }
}
