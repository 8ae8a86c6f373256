//! UCI engine session for position evaluation.
//!
//! The protocol is strictly half-duplex: every method takes `&mut self` and
//! blocks until the engine's answer (if any) has been read, so exactly one
//! exchange is in flight at a time.

use crate::Evaluation;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use thiserror::Error;
use tracing::{debug, trace};
use uci::{EngineLine, GoOptions, GuiCommand, UciError};

/// Default think time per search in milliseconds.
pub const DEFAULT_MOVETIME_MS: u64 = 1000;

/// Default depth cap, only sent when depth capping is enabled.
pub const DEFAULT_MAX_DEPTH: u32 = 25;

/// Errors that can occur when working with chess engines.
///
/// Every variant is fatal for the session: there is no retry.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Failed to spawn the engine process.
    #[error("Failed to spawn engine '{path}': {source}")]
    SpawnError {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// Engine process did not expose its standard streams.
    #[error("Engine initialization failed")]
    InitFailed,
    /// Writing to or reading from the engine failed.
    #[error("Engine I/O failed: {0}")]
    Io(#[from] std::io::Error),
    /// Engine closed its output before the expected sentinel line.
    #[error("Engine closed unexpectedly while waiting for {0}")]
    Closed(&'static str),
    /// Engine output could not be parsed.
    #[error("Invalid engine output: {0}")]
    Parse(#[from] UciError),
}

/// Search modifiers applied to every `go` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchLimits {
    /// Fixed engine-side think time in milliseconds.
    pub movetime_ms: u64,
    /// Optional depth cap.
    pub depth: Option<u32>,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            movetime_ms: DEFAULT_MOVETIME_MS,
            depth: None,
        }
    }
}

/// Outcome of a `go` command.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchResult {
    /// Move from the `bestmove` line, empty if the engine gave none.
    pub best_move: String,
    /// The last `info` line before `bestmove`, empty if there was none.
    pub last_info: String,
}

/// Something that can score moves and find best moves for a position.
///
/// Implemented by [`EngineSession`] and [`EngineProcess`]; the classifier
/// depends only on this trait.
pub trait PositionEvaluator {
    /// Evaluate `fen` with the search restricted to `mv`.
    fn evaluate_move(&mut self, fen: &str, mv: &str) -> Result<Evaluation, EngineError>;

    /// Evaluate `fen` with an unrestricted search.
    fn best_move(&mut self, fen: &str) -> Result<Evaluation, EngineError>;
}

/// Command/response channel to a UCI engine.
///
/// Generic over the line source and sink so the protocol logic can run
/// against in-memory transcripts as well as a child process.
pub struct EngineSession<R: BufRead, W: Write> {
    reader: R,
    writer: W,
    limits: SearchLimits,
    /// The engine's name (reported via UCI id).
    name: String,
}

impl<R: BufRead, W: Write> EngineSession<R, W> {
    /// Create a session over an engine's output (`reader`) and input (`writer`).
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            limits: SearchLimits::default(),
            name: String::new(),
        }
    }

    /// Replace the search limits used by [`PositionEvaluator`] queries.
    pub fn with_limits(mut self, limits: SearchLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Returns the engine's name as reported via UCI protocol.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Perform the `uci` handshake, then synchronise with `isready`.
    ///
    /// Every line up to and including `uciok` is consumed; only `id name` is
    /// kept. Lines before `readyok` are discarded.
    pub fn initialize(&mut self) -> Result<(), EngineError> {
        self.send(&GuiCommand::Uci)?;

        loop {
            match EngineLine::parse(&self.read_line("uciok")?) {
                EngineLine::UciOk => break,
                EngineLine::Id { name } => self.name = name,
                _ => {}
            }
        }

        if self.name.is_empty() {
            self.name = "Unknown Engine".to_string();
        }

        self.send(&GuiCommand::IsReady)?;
        while EngineLine::parse(&self.read_line("readyok")?) != EngineLine::ReadyOk {}

        debug!(engine = %self.name, "UCI handshake complete");
        Ok(())
    }

    /// Set the position to analyse. The engine sends no reply.
    pub fn set_position(&mut self, fen: &str) -> Result<(), EngineError> {
        self.send(&GuiCommand::Position {
            fen: fen.to_string(),
        })
    }

    /// Run a search and wait for `bestmove`.
    ///
    /// Each `info` line replaces the previous one, so only the deepest report
    /// survives in [`SearchResult::last_info`].
    pub fn search(&mut self, options: GoOptions) -> Result<SearchResult, EngineError> {
        self.send(&GuiCommand::Go(options))?;

        let mut last_info = String::new();
        loop {
            match EngineLine::parse(&self.read_line("bestmove")?) {
                EngineLine::BestMove { mv, .. } => {
                    trace!(best_move = %mv, info = %last_info, "search finished");
                    return Ok(SearchResult {
                        best_move: mv,
                        last_info,
                    });
                }
                EngineLine::Info(line) => last_info = line,
                _ => {}
            }
        }
    }

    /// Set `fen` and evaluate it, optionally restricting the search to `played`.
    pub fn evaluate(&mut self, fen: &str, played: Option<&str>) -> Result<Evaluation, EngineError> {
        self.set_position(fen)?;

        let mut options =
            GoOptions::movetime(self.limits.movetime_ms).with_depth(self.limits.depth);
        if let Some(mv) = played {
            options = options.restrict_to(mv);
        }

        let result = self.search(options)?;
        Ok(Evaluation::from_info_line(result.best_move, &result.last_info)?)
    }

    /// Ask the engine to exit.
    pub fn quit(&mut self) -> Result<(), EngineError> {
        self.send(&GuiCommand::Quit)
    }

    /// Send a command to the engine.
    fn send(&mut self, command: &GuiCommand) -> Result<(), EngineError> {
        let line = command.to_uci();
        debug!(command = %line, "-> engine");
        writeln!(self.writer, "{}", line)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Read a line from the engine's output.
    fn read_line(&mut self, waiting_for: &'static str) -> Result<String, EngineError> {
        let mut line = String::new();
        let bytes = self.reader.read_line(&mut line)?;
        if bytes == 0 {
            return Err(EngineError::Closed(waiting_for));
        }
        trace!(line = %line.trim_end(), "<- engine");
        Ok(line.trim().to_string())
    }
}

impl<R: BufRead, W: Write> PositionEvaluator for EngineSession<R, W> {
    fn evaluate_move(&mut self, fen: &str, mv: &str) -> Result<Evaluation, EngineError> {
        self.evaluate(fen, Some(mv))
    }

    fn best_move(&mut self, fen: &str) -> Result<Evaluation, EngineError> {
        self.evaluate(fen, None)
    }
}

/// Session over a spawned engine process's pipes.
pub type ProcessSession = EngineSession<BufReader<ChildStdout>, ChildStdin>;

/// A spawned engine process and its session.
///
/// Dropping the value sends `quit` and kills the child, so the engine never
/// outlives the run, including when a fatal error unwinds the caller.
pub struct EngineProcess {
    /// The engine process handle.
    process: Child,
    session: ProcessSession,
}

impl EngineProcess {
    /// Spawn the engine and perform the UCI handshake.
    ///
    /// # Errors
    ///
    /// - `EngineError::SpawnError` if the engine process fails to start
    /// - `EngineError::Closed` if the engine exits before `uciok`
    pub fn spawn<P: AsRef<Path>>(path: P, limits: SearchLimits) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let mut process = Command::new(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| EngineError::SpawnError {
                path: path.display().to_string(),
                source,
            })?;

        let (stdin, stdout) = match (process.stdin.take(), process.stdout.take()) {
            (Some(stdin), Some(stdout)) => (stdin, stdout),
            _ => {
                let _ = process.kill();
                let _ = process.wait();
                return Err(EngineError::InitFailed);
            }
        };

        let mut engine = Self {
            process,
            session: EngineSession::new(BufReader::new(stdout), stdin).with_limits(limits),
        };
        engine.session.initialize()?;

        Ok(engine)
    }

    /// Returns the engine's name as reported via UCI protocol.
    pub fn name(&self) -> &str {
        self.session.name()
    }

    /// Direct access to the protocol session.
    pub fn session_mut(&mut self) -> &mut ProcessSession {
        &mut self.session
    }

    /// Send `quit` and wait for the process to exit.
    pub fn shutdown(mut self) -> Result<(), EngineError> {
        self.session.quit()?;
        self.process.wait()?;
        Ok(())
    }
}

impl PositionEvaluator for EngineProcess {
    fn evaluate_move(&mut self, fen: &str, mv: &str) -> Result<Evaluation, EngineError> {
        self.session.evaluate_move(fen, mv)
    }

    fn best_move(&mut self, fen: &str) -> Result<Evaluation, EngineError> {
        self.session.best_move(fen)
    }
}

impl Drop for EngineProcess {
    fn drop(&mut self) {
        let _ = self.session.quit();
        let _ = self.process.kill();
        let _ = self.process.wait();
    }
}
