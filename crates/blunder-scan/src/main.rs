//! Blunder Scan - records engine-confirmed blunders from an EPD move stream.
//!
//! Reads `ply,fen,move` records (stdin by default), evaluates every move from
//! the minimum ply on with a UCI engine, and stores confirmed blunders in a
//! SQLite table.

use anyhow::Context;
use blunder_analysis::{EngineProcess, MoveStream, ScanSummary, Scanner};
use blunder_scan::config::ScanConfig;
use blunder_scan::json_output::JsonLinesSink;
use blunder_scan::progress::Progress;
use blunder_scan::storage::SqliteSink;
use clap::Parser;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Blunder Scan - finds blunders in EPD move streams.
#[derive(Parser, Debug)]
#[command(name = "blunder-scan")]
#[command(about = "Finds blunders in EPD move streams with a UCI engine")]
struct Cli {
    /// Configuration file (default: blunder-scan.toml if present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to the UCI engine executable
    #[arg(long, env = "BLUNDER_ENGINE")]
    engine: Option<PathBuf>,

    /// Path to SQLite database
    #[arg(long, env = "BLUNDER_DB")]
    database: Option<PathBuf>,

    /// Table findings are written to
    #[arg(long, env = "BLUNDER_TABLE")]
    table: Option<String>,

    /// Engine think time per search in milliseconds
    #[arg(long)]
    movetime: Option<u64>,

    /// Depth cap sent with every search when --depth-capped is set
    #[arg(long)]
    max_depth: Option<u32>,

    /// Send the depth cap with every search
    #[arg(long)]
    depth_capped: bool,

    /// Centipawn drop that counts as a blunder
    #[arg(long)]
    max_cp_drop: Option<i32>,

    /// Mate horizon in moves
    #[arg(long)]
    mate_horizon: Option<i32>,

    /// First ply that is evaluated
    #[arg(long)]
    min_ply: Option<u32>,

    /// Read records from this file instead of stdin
    #[arg(long)]
    input: Option<PathBuf>,

    /// Do not print the game counter
    #[arg(short, long)]
    quiet: bool,

    /// Print findings as JSON lines instead of storing them
    #[arg(long)]
    dry_run: bool,

    /// Print the run summary as JSON when done
    #[arg(long)]
    json: bool,
}

impl Cli {
    /// Apply command-line overrides on top of file settings.
    fn apply(&self, config: &mut ScanConfig) {
        if let Some(engine) = &self.engine {
            config.engine = engine.clone();
        }
        if let Some(database) = &self.database {
            config.sink.database = database.clone();
        }
        if let Some(table) = &self.table {
            config.sink.table = table.clone();
        }
        if let Some(ms) = self.movetime {
            config.search.movetime_ms = ms;
        }
        if let Some(depth) = self.max_depth {
            config.search.max_depth = depth;
        }
        if self.depth_capped {
            config.search.depth_capped = true;
        }
        if let Some(drop) = self.max_cp_drop {
            config.thresholds.max_centipawn_drop = drop;
        }
        if let Some(horizon) = self.mate_horizon {
            config.thresholds.mate_horizon = horizon;
        }
        if let Some(ply) = self.min_ply {
            config.thresholds.min_ply = ply;
        }
    }

    fn load_config(&self) -> anyhow::Result<ScanConfig> {
        let mut config = match &self.config {
            Some(path) => ScanConfig::load_from(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => ScanConfig::load().context("loading blunder-scan.toml")?,
        };
        self.apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    fn open_input(&self) -> anyhow::Result<Box<dyn BufRead>> {
        Ok(match &self.input {
            Some(path) => Box::new(BufReader::new(
                File::open(path).with_context(|| format!("opening {}", path.display()))?,
            )),
            None => Box::new(std::io::stdin().lock()),
        })
    }
}

fn open_sink(config: &ScanConfig) -> anyhow::Result<SqliteSink> {
    let path = &config.sink.database;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    SqliteSink::open(path, &config.sink.table)
        .with_context(|| format!("opening database {}", path.display()))
}

/// Log filter from `RUST_LOG` directives, `info` when unset or invalid.
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

fn main() -> anyhow::Result<()> {
    // stdout carries findings and the summary; logs go to stderr.
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(directives.as_deref()))
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();
    let config = cli.load_config()?;

    tracing::info!("Starting engine: {}", config.engine.display());
    tracing::info!(
        "Movetime: {}ms, depth cap: {:?}",
        config.search.movetime_ms,
        config.search_limits().depth
    );
    tracing::info!("Thresholds: {:?}", config.thresholds());

    let mut engine = EngineProcess::spawn(&config.engine, config.search_limits())
        .with_context(|| format!("starting engine {}", config.engine.display()))?;
    tracing::info!("Engine: {}", engine.name());

    let records = MoveStream::new(cli.open_input()?);
    let mut scanner = Scanner::new(config.thresholds());
    let mut progress = Progress::new(std::io::stdout(), !cli.quiet && !cli.dry_run);

    let summary: ScanSummary = if cli.dry_run {
        let mut sink = JsonLinesSink::new(std::io::stdout());
        scanner.run(records, &mut engine, &mut sink, |games| progress.games(games))?
    } else {
        let mut sink = open_sink(&config)?;
        tracing::info!(
            "Database: {} (table {})",
            config.sink.database.display(),
            config.sink.table
        );
        scanner.run(records, &mut engine, &mut sink, |games| progress.games(games))?
    };
    progress.finish();

    engine.shutdown().context("stopping engine")?;

    tracing::info!(
        "Done: {} records, {} evaluated, {} flagged, {} recorded, {} already known, {} games",
        summary.records,
        summary.evaluated,
        summary.flagged,
        summary.findings,
        summary.duplicates,
        summary.games
    );
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    Ok(())
}
