//! Commands sent from the driver to the engine.

use crate::UciError;

/// Commands sent from GUI to engine.
#[derive(Debug, Clone, PartialEq)]
pub enum GuiCommand {
    /// Initialize UCI mode.
    Uci,
    /// Check if engine is ready.
    IsReady,
    /// Set up a position from FEN.
    Position { fen: String },
    /// Start calculating.
    Go(GoOptions),
    /// Quit the engine.
    Quit,
}

/// Options for the `go` command.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GoOptions {
    /// Search for exactly this time in milliseconds.
    pub movetime: Option<u64>,
    /// Search to this depth.
    pub depth: Option<u32>,
    /// Restrict the search to these moves.
    pub searchmoves: Vec<String>,
}

impl GoOptions {
    /// Fixed think-time search.
    pub fn movetime(ms: u64) -> Self {
        Self {
            movetime: Some(ms),
            ..Self::default()
        }
    }

    /// Cap the search depth.
    pub fn with_depth(mut self, depth: Option<u32>) -> Self {
        self.depth = depth;
        self
    }

    /// Restrict the search to a single candidate move.
    pub fn restrict_to(mut self, mv: &str) -> Self {
        self.searchmoves = vec![mv.to_string()];
        self
    }
}

impl GuiCommand {
    /// Format the command as a single protocol line (without newline).
    pub fn to_uci(&self) -> String {
        match self {
            GuiCommand::Uci => "uci".to_string(),
            GuiCommand::IsReady => "isready".to_string(),
            GuiCommand::Position { fen } => format!("position fen {}", fen),
            GuiCommand::Go(opts) => {
                let mut parts = vec!["go".to_string()];
                if let Some(d) = opts.depth {
                    parts.push(format!("depth {}", d));
                }
                if let Some(ms) = opts.movetime {
                    parts.push(format!("movetime {}", ms));
                }
                if !opts.searchmoves.is_empty() {
                    parts.push(format!("searchmoves {}", opts.searchmoves.join(" ")));
                }
                parts.join(" ")
            }
            GuiCommand::Quit => "quit".to_string(),
        }
    }

    /// Parse a UCI command string. Commands this driver never sends are
    /// rejected.
    pub fn parse(input: &str) -> Result<Self, UciError> {
        let input = input.trim();
        let mut parts = input.split_whitespace();

        let cmd = parts.next().unwrap_or("");

        match cmd {
            "uci" => Ok(GuiCommand::Uci),
            "isready" => Ok(GuiCommand::IsReady),
            "quit" => Ok(GuiCommand::Quit),
            "position" => Self::parse_position(parts),
            "go" => Self::parse_go(parts),
            "" => Err(UciError::ParseError("Empty command".to_string())),
            _ => Err(UciError::ParseError(format!("Unknown command '{}'", cmd))),
        }
    }

    fn parse_position<'a>(mut parts: impl Iterator<Item = &'a str>) -> Result<Self, UciError> {
        match parts.next() {
            Some("fen") => {
                let fen: Vec<&str> = parts.collect();
                if fen.is_empty() {
                    return Err(UciError::ParseError("Missing FEN".to_string()));
                }
                Ok(GuiCommand::Position { fen: fen.join(" ") })
            }
            Some(other) => Err(UciError::ParseError(format!(
                "Expected 'fen', got '{}'",
                other
            ))),
            None => Err(UciError::ParseError("Expected 'fen'".to_string())),
        }
    }

    fn parse_go<'a>(parts: impl Iterator<Item = &'a str>) -> Result<Self, UciError> {
        let mut opts = GoOptions::default();
        let parts: Vec<&str> = parts.collect();
        let mut i = 0;

        while i < parts.len() {
            match parts[i] {
                "movetime" => {
                    i += 1;
                    if i < parts.len() {
                        opts.movetime = parts[i].parse().ok();
                    }
                }
                "depth" => {
                    i += 1;
                    if i < parts.len() {
                        opts.depth = parts[i].parse().ok();
                    }
                }
                "searchmoves" => {
                    i += 1;
                    while i < parts.len() && !is_go_keyword(parts[i]) {
                        opts.searchmoves.push(parts[i].to_string());
                        i += 1;
                    }
                    continue;
                }
                _ => {}
            }
            i += 1;
        }

        Ok(GuiCommand::Go(opts))
    }
}

fn is_go_keyword(s: &str) -> bool {
    matches!(s, "movetime" | "depth" | "searchmoves")
}
