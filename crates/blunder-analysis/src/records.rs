//! Decoding of the `ply,fen,move` record stream.
//!
//! Records come from an EPD extraction step upstream; one record per line,
//! comma separated, at least three fields. Anything past the third field is
//! ignored. A malformed record means the upstream pipeline is broken, so it
//! is reported as an error rather than skipped.

use serde::Serialize;
use std::io::BufRead;
use thiserror::Error;

/// Errors produced while reading the record stream.
#[derive(Error, Debug)]
pub enum RecordError {
    /// Reading the underlying stream failed.
    #[error("Failed to read record stream: {0}")]
    Io(#[from] std::io::Error),
    /// A record had fewer than three fields.
    #[error("Line {line}: record has {count} fields, expected at least 3")]
    TooFewFields { line: usize, count: usize },
    /// The ply field was not an integer.
    #[error("Line {line}: invalid ply '{value}'")]
    InvalidPly { line: usize, value: String },
}

/// One position from the input stream and the move played from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveRecord {
    /// Half-move number within the game. Any integer is accepted; values
    /// below the minimum ply, negatives included, are warm-up.
    pub ply: i64,
    /// Position before the move, in FEN.
    pub position: String,
    /// The move that was played from `position`.
    pub played_move: String,
}

impl MoveRecord {
    /// Decode a single record line.
    pub fn parse(line: &str, line_no: usize) -> Result<Self, RecordError> {
        let fields: Vec<&str> = line.split(',').map(clean_field).collect();
        if fields.len() < 3 {
            return Err(RecordError::TooFewFields {
                line: line_no,
                count: fields.len(),
            });
        }

        let ply = fields[0].parse().map_err(|_| RecordError::InvalidPly {
            line: line_no,
            value: fields[0].to_string(),
        })?;

        Ok(Self {
            ply,
            position: fields[1].to_string(),
            played_move: fields[2].to_string(),
        })
    }
}

fn clean_field(field: &str) -> &str {
    let field = field.trim();
    field
        .strip_prefix('"')
        .and_then(|f| f.strip_suffix('"'))
        .unwrap_or(field)
}

/// Iterator over the records of a line-oriented stream.
///
/// Blank lines are skipped. Iteration ends at end of stream.
pub struct MoveStream<R: BufRead> {
    reader: R,
    line_no: usize,
    buf: String,
}

impl<R: BufRead> MoveStream<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line_no: 0,
            buf: String::new(),
        }
    }
}

impl<R: BufRead> Iterator for MoveStream<R> {
    type Item = Result<MoveRecord, RecordError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            match self.reader.read_line(&mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {
                    self.line_no += 1;
                    if self.buf.trim().is_empty() {
                        continue;
                    }
                    return Some(MoveRecord::parse(&self.buf, self.line_no));
                }
                Err(e) => return Some(Err(e.into())),
            }
        }
    }
}
