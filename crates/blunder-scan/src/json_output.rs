//! JSON-lines output of confirmed blunders.
//!
//! Used for dry runs: every new finding is written and flushed as one JSON
//! object per line the moment it is confirmed, so findings made before a
//! fatal error are not lost.

use blunder_analysis::{Finding, FindingSink, RecordOutcome, SinkError};
use chrono::Utc;
use serde::Serialize;
use std::collections::HashSet;
use std::io::Write;

/// One output line.
#[derive(Serialize)]
struct FindingJson<'a> {
    /// Sequence number of the finding within this run, starting at 1.
    id: i64,
    #[serde(flatten)]
    finding: &'a Finding,
    /// ISO 8601 timestamp when the finding was written.
    created_at: String,
}

/// [`FindingSink`] that streams findings as JSON lines.
///
/// A `(position, played_move)` pair is written once per run; repeats are
/// reported as [`RecordOutcome::Duplicate`].
///
/// # Example
///
/// ```ignore
/// let mut sink = JsonLinesSink::new(std::io::stdout());
/// sink.record(&finding)?;
/// ```
pub struct JsonLinesSink<W: Write> {
    out: W,
    seen: HashSet<(String, String)>,
    written: i64,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            seen: HashSet::new(),
            written: 0,
        }
    }

    /// Number of findings written so far.
    pub fn written(&self) -> i64 {
        self.written
    }
}

impl<W: Write> FindingSink for JsonLinesSink<W> {
    fn record(&mut self, finding: &Finding) -> Result<RecordOutcome, SinkError> {
        let key = (finding.position.clone(), finding.played_move.clone());
        if self.seen.contains(&key) {
            return Ok(RecordOutcome::Duplicate);
        }

        let id = self.written + 1;
        let line = FindingJson {
            id,
            finding,
            created_at: Utc::now().to_rfc3339(),
        };
        serde_json::to_writer(&mut self.out, &line).map_err(SinkError::new)?;
        writeln!(self.out).map_err(SinkError::new)?;
        self.out.flush().map_err(SinkError::new)?;

        self.seen.insert(key);
        self.written = id;
        Ok(RecordOutcome::Inserted { id })
    }
}
