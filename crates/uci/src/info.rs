//! Score extraction from UCI `info` lines.

use crate::UciError;

/// Score fields found on an engine `info` line.
///
/// Only the first `cp <n>` and the first `mate <n>` occurrence count; both are
/// captured independently, so a line carrying both reports both. Free text
/// after a `string` token is never scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScoreTokens {
    /// Centipawn score from the side to move's perspective.
    pub cp: Option<i32>,
    /// Mate distance in moves (negative = side to move is being mated).
    pub mate: Option<i32>,
}

impl ScoreTokens {
    /// Scan a line for `cp` and `mate` tokens.
    ///
    /// A line without either token yields an empty result. A keyword followed
    /// by a value that is not a signed 32-bit integer is a [`UciError::ParseError`].
    pub fn scan(line: &str) -> Result<Self, UciError> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let mut tokens = ScoreTokens::default();

        for pair in parts.windows(2) {
            match pair[0] {
                "string" => break,
                "cp" if tokens.cp.is_none() => {
                    tokens.cp = Some(parse_value("cp", pair[1])?);
                }
                "mate" if tokens.mate.is_none() => {
                    tokens.mate = Some(parse_value("mate", pair[1])?);
                }
                _ => {}
            }
        }

        Ok(tokens)
    }

    /// Centipawn score, 0 when absent.
    pub fn centipawns(&self) -> i32 {
        self.cp.unwrap_or(0)
    }

    /// Mate distance, 0 when absent.
    pub fn mate_in(&self) -> i32 {
        self.mate.unwrap_or(0)
    }
}

fn parse_value(keyword: &str, value: &str) -> Result<i32, UciError> {
    value.parse().map_err(|_| {
        UciError::ParseError(format!("Invalid {} value '{}'", keyword, value))
    })
}
