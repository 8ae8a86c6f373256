//! End-to-end tests for blunder-analysis.
//!
//! Most tests drive a real [`EngineSession`] against `FakeEngine`, which
//! parses the commands it is sent and answers from a script. The Stockfish
//! test requires Stockfish in PATH.
//! Run with: `cargo test -p blunder-analysis --test integration -- --ignored`

use blunder_analysis::{
    EngineProcess, EngineSession, FindingSink, MemorySink, MoveStream, RecordOutcome, ScanError,
    Scanner, SearchLimits, Thresholds,
};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::io::{BufReader, Cursor, Read, Write};
use std::rc::Rc;
use uci::{GuiCommand, ScoreTokens};

const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
const AFTER_E4: &str = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1";
const AFTER_E5: &str = "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq e6 0 2";

/// Scripted engine state shared by the reader and writer halves.
#[derive(Default)]
struct Script {
    /// Score line for a restricted search, keyed by (fen, move).
    moves: HashMap<(String, String), String>,
    /// Best move and score line for an unrestricted search, keyed by fen.
    best: HashMap<String, (String, String)>,
    position: String,
    partial: Vec<u8>,
    output: VecDeque<u8>,
    commands: Vec<GuiCommand>,
}

impl Script {
    fn respond(&mut self, line: &str) {
        let command = GuiCommand::parse(line).expect("driver sent an unparsable command");
        match &command {
            GuiCommand::Uci => self.emit("id name FakeFish 1\nid author nobody\nuciok\n"),
            GuiCommand::IsReady => self.emit("readyok\n"),
            GuiCommand::Position { fen } => self.position = fen.clone(),
            GuiCommand::Go(opts) => {
                let (mv, score) = match opts.searchmoves.first() {
                    Some(mv) => {
                        let key = (self.position.clone(), mv.clone());
                        let score = self.moves.get(&key).cloned().unwrap_or_default();
                        (mv.clone(), score)
                    }
                    None => self.best.get(&self.position).cloned().unwrap_or_default(),
                };
                let reply = format!(
                    "info depth 1 seldepth 1 score cp 1 nodes 20 pv {mv}\n\
                     info depth 20 seldepth 28 multipv 1 {score} nodes 99999 pv {mv}\n\
                     bestmove {mv}\n"
                );
                self.emit(&reply);
            }
            _ => {}
        }
        self.commands.push(command);
    }

    fn emit(&mut self, text: &str) {
        self.output.extend(text.as_bytes());
    }
}

#[derive(Clone, Default)]
struct FakeEngine(Rc<RefCell<Script>>);

impl FakeEngine {
    fn score_move(&self, fen: &str, mv: &str, score: &str) -> &Self {
        self.0
            .borrow_mut()
            .moves
            .insert((fen.to_string(), mv.to_string()), score.to_string());
        self
    }

    fn best_move(&self, fen: &str, mv: &str, score: &str) -> &Self {
        self.0
            .borrow_mut()
            .best
            .insert(fen.to_string(), (mv.to_string(), score.to_string()));
        self
    }

    fn session(&self) -> EngineSession<BufReader<FakeEngine>, FakeEngine> {
        let mut session = EngineSession::new(BufReader::new(self.clone()), self.clone());
        session.initialize().expect("handshake with fake engine");
        session
    }

    fn searches(&self) -> Vec<String> {
        self.0
            .borrow()
            .commands
            .iter()
            .filter(|c| matches!(c, GuiCommand::Go(_)))
            .map(GuiCommand::to_uci)
            .collect()
    }
}

impl Read for FakeEngine {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let mut script = self.0.borrow_mut();
        let n = buf.len().min(script.output.len());
        for (slot, byte) in buf.iter_mut().zip(script.output.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl Write for FakeEngine {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut script = self.0.borrow_mut();
        for &byte in buf {
            if byte == b'\n' {
                let line = String::from_utf8(std::mem::take(&mut script.partial)).unwrap();
                script.respond(&line);
            } else {
                script.partial.push(byte);
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn records(lines: &[String]) -> MoveStream<Cursor<String>> {
    MoveStream::new(Cursor::new(lines.join("\n")))
}

/// White seeds +50 at the baseline, black plays a quiet move, then white
/// drops to -400 while the engine preferred d2d4 at +80.
fn blunder_game(engine: &FakeEngine) -> Vec<String> {
    engine
        .score_move(START, "e2e4", "score cp 50")
        .score_move(AFTER_E4, "e7e5", "score cp 0")
        .score_move(AFTER_E5, "a2a3", "score cp -400")
        .best_move(AFTER_E5, "d2d4", "score cp 80");

    vec![
        format!("10,{},g1f3", START),
        format!("11,{},g8f6", START),
        format!("12,{},e2e4", START),
        format!("13,{},e7e5", AFTER_E4),
        format!("14,{},a2a3", AFTER_E5),
    ]
}

#[test]
fn handshake_reports_engine_name() {
    let engine = FakeEngine::default();
    let session = engine.session();
    assert_eq!(session.name(), "FakeFish 1");
}

#[test]
fn baseline_ply_seeds_white_and_records_nothing() {
    let engine = FakeEngine::default();
    engine.score_move(START, "e4", "score cp 900");
    let mut session = engine.session();
    let mut sink = MemorySink::new();
    let mut scanner = Scanner::new(Thresholds::default());

    let summary = scanner
        .run(
            records(&[format!("12,{},e4", START)]),
            &mut session,
            &mut sink,
            |_| {},
        )
        .unwrap();

    assert_eq!(summary.evaluated, 1);
    assert_eq!(summary.findings, 0);
    assert!(sink.findings().is_empty());
    assert_eq!(scanner.classifier().state().last_white, 900);
    assert_eq!(engine.searches(), vec!["go movetime 1000 searchmoves e4"]);
}

#[test]
fn steady_state_blunder_yields_one_finding() {
    let engine = FakeEngine::default();
    let input = blunder_game(&engine);
    let mut session = engine.session();
    let mut sink = MemorySink::new();

    let summary = Scanner::default()
        .run(records(&input), &mut session, &mut sink, |_| {})
        .unwrap();

    assert_eq!(summary.records, 5);
    assert_eq!(summary.evaluated, 3);
    assert_eq!(summary.flagged, 1);
    assert_eq!(summary.findings, 1);

    let finding = &sink.findings()[0];
    assert_eq!(finding.position, AFTER_E5);
    assert_eq!(finding.played_move, "a2a3");
    assert_eq!(finding.centipawns, -400);
    assert_eq!(finding.mate_distance, 0);
    assert_eq!(finding.best_move, "d2d4");
    assert_eq!(finding.severity, 450);

    // Warm-up plies never reach the engine; only the flagged ply gets a
    // second, unrestricted search.
    assert_eq!(
        engine.searches(),
        vec![
            "go movetime 1000 searchmoves e2e4",
            "go movetime 1000 searchmoves e7e5",
            "go movetime 1000 searchmoves a2a3",
            "go movetime 1000",
        ]
    );
}

#[test]
fn walking_into_mate_is_recorded_with_mate_severity() {
    let engine = FakeEngine::default();
    engine
        .score_move(START, "e2e4", "score cp 20")
        .score_move(AFTER_E4, "g7g5", "score mate -3")
        .best_move(AFTER_E4, "e7e5", "score cp 320");
    let mut session = engine.session();
    let mut sink = MemorySink::new();

    let input = vec![
        format!("12,{},e2e4", START),
        format!("13,{},g7g5", AFTER_E4),
    ];
    Scanner::default()
        .run(records(&input), &mut session, &mut sink, |_| {})
        .unwrap();

    assert_eq!(sink.findings().len(), 1);
    assert_eq!(sink.findings()[0].severity, 10_000);
    assert_eq!(sink.findings()[0].mate_distance, -3);
}

#[test]
fn best_move_equal_to_played_records_nothing() {
    let engine = FakeEngine::default();
    engine
        .score_move(START, "e2e4", "score cp 50")
        .score_move(AFTER_E4, "e7e5", "score cp 0")
        .score_move(AFTER_E5, "a2a3", "score cp -400")
        .best_move(AFTER_E5, "a2a3", "score cp 900");
    let mut session = engine.session();
    let mut sink = MemorySink::new();

    let input = vec![
        format!("12,{},e2e4", START),
        format!("13,{},e7e5", AFTER_E4),
        format!("14,{},a2a3", AFTER_E5),
    ];
    let summary = Scanner::default()
        .run(records(&input), &mut session, &mut sink, |_| {})
        .unwrap();

    assert_eq!(summary.flagged, 1);
    assert_eq!(summary.findings, 0);
    assert!(sink.findings().is_empty());
}

#[test]
fn replaying_a_stream_adds_nothing() {
    let engine = FakeEngine::default();
    let input = blunder_game(&engine);
    let mut session = engine.session();
    let mut sink = MemorySink::new();

    let first = Scanner::default()
        .run(records(&input), &mut session, &mut sink, |_| {})
        .unwrap();
    let second = Scanner::default()
        .run(records(&input), &mut session, &mut sink, |_| {})
        .unwrap();

    assert_eq!(first.findings, 1);
    assert_eq!(second.findings, 0);
    assert_eq!(second.duplicates, 1);
    assert_eq!(sink.findings().len(), 1);
}

#[test]
fn games_are_reported_as_they_complete() {
    let engine = FakeEngine::default();
    engine
        .score_move(START, "e2e4", "score cp 30")
        .score_move(AFTER_E4, "e7e5", "score cp 10");
    let mut session = engine.session();

    // Two games whose tracked stretch ends on a white move, so the second
    // baseline is black's and completes the count.
    let input = vec![
        format!("12,{},e2e4", START),
        format!("13,{},e7e5", AFTER_E4),
        format!("14,{},e2e4", START),
        format!("12,{},e7e5", AFTER_E4),
    ];
    let mut reported = Vec::new();
    let summary = Scanner::default()
        .run(records(&input), &mut session, &mut MemorySink::new(), |games| {
            reported.push(games)
        })
        .unwrap();

    assert_eq!(reported, vec![1]);
    assert_eq!(summary.games, 1);
}

#[test]
fn malformed_record_aborts_scan() {
    let engine = FakeEngine::default();
    let mut session = engine.session();

    let input = vec![format!("12,{}", START)];
    let mut sink = MemorySink::new();
    let result = Scanner::default().run(records(&input), &mut session, &mut sink, |_| {});

    assert!(matches!(result, Err(ScanError::Record(_))));
    assert!(engine.searches().is_empty());
}

#[test]
fn malformed_engine_score_aborts_scan() {
    let engine = FakeEngine::default();
    engine.score_move(START, "e2e4", "score cp 12abc");
    let mut session = engine.session();

    let input = vec![format!("12,{},e2e4", START)];
    let mut sink = MemorySink::new();
    let result = Scanner::default().run(records(&input), &mut session, &mut sink, |_| {});

    assert!(matches!(result, Err(ScanError::Engine(_))));
}

#[test]
fn sink_duplicate_is_not_an_error() {
    struct AlwaysDuplicate;
    impl FindingSink for AlwaysDuplicate {
        fn record(
            &mut self,
            _: &blunder_analysis::Finding,
        ) -> Result<RecordOutcome, blunder_analysis::SinkError> {
            Ok(RecordOutcome::Duplicate)
        }
    }

    let engine = FakeEngine::default();
    let input = blunder_game(&engine);
    let mut session = engine.session();

    let summary = Scanner::default()
        .run(records(&input), &mut session, &mut AlwaysDuplicate, |_| {})
        .unwrap();

    assert_eq!(summary.duplicates, 1);
    assert_eq!(summary.findings, 0);
}

#[test]
fn depth_cap_reaches_the_engine() {
    let engine = FakeEngine::default();
    engine.score_move(START, "e2e4", "score cp 30");
    let mut session = engine.session().with_limits(SearchLimits {
        movetime_ms: 250,
        depth: Some(25),
    });

    let input = vec![format!("12,{},e2e4", START)];
    Scanner::default()
        .run(records(&input), &mut session, &mut MemorySink::new(), |_| {})
        .unwrap();

    assert_eq!(engine.searches(), vec!["go depth 25 movetime 250 searchmoves e2e4"]);
}

/// Check if Stockfish is available in PATH.
fn stockfish_available() -> bool {
    std::process::Command::new("stockfish")
        .arg("--version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .is_ok()
}

#[test]
#[ignore = "requires Stockfish"]
fn stockfish_scores_a_hanging_queen() {
    if !stockfish_available() {
        eprintln!("Skipping test: Stockfish not available");
        return;
    }

    let mut engine = EngineProcess::spawn(
        "stockfish",
        SearchLimits {
            movetime_ms: 200,
            depth: None,
        },
    )
    .expect("Failed to spawn Stockfish");
    assert!(engine.name().to_lowercase().contains("stockfish"));

    // 1.e4 e5 2.Qh5 Nc6 3.Bc4, black to move: Nf6?? allows Qxf7#.
    let fen = "r1bqkbnr/pppp1ppp/2n5/4p2Q/2B1P3/8/PPPP1PPP/RNB1K1NR b KQkq - 3 3";
    let session = engine.session_mut();
    session.set_position(fen).unwrap();
    let result = session
        .search(uci::GoOptions::movetime(200).restrict_to("g8f6"))
        .unwrap();
    let tokens = ScoreTokens::scan(&result.last_info).unwrap();

    assert_eq!(result.best_move, "g8f6");
    assert!(tokens.mate_in() < 0, "Nf6 should allow mate: {}", result.last_info);

    engine.shutdown().expect("Stockfish should quit cleanly");
}
