//! SQLite storage for confirmed blunders.
//!
//! Each finding becomes one row. The `(fen, sm)` pair is unique, so a
//! re-run over the same input leaves the table unchanged.

use blunder_analysis::{Finding, FindingSink, RecordOutcome, SinkError};
use chrono::Utc;
use rusqlite::{ffi, Connection};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use crate::config::is_identifier;

/// Errors that can occur when opening or writing the findings table.
#[derive(Error, Debug)]
pub enum StorageError {
    /// SQLite reported an error other than a duplicate finding.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// The table name is not a plain SQL identifier.
    #[error("Invalid table name '{0}'")]
    InvalidTable(String),
    /// An existing table has no unique key over `(fen, sm)`, so duplicates
    /// could not be detected.
    #[error("Table '{0}' has no UNIQUE (fen, sm) key")]
    MissingUniqueKey(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// SQLite-backed [`FindingSink`].
///
/// # Example
///
/// ```ignore
/// let mut sink = SqliteSink::open("data/blunders.db", "positions")?;
/// sink.record(&finding)?;
/// println!("{} findings stored", sink.count()?);
/// ```
pub struct SqliteSink {
    conn: Connection,
    table: String,
}

impl SqliteSink {
    /// Opens or creates a SQLite database at the given path.
    ///
    /// The findings table is created if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened, if `table` is not a
    /// plain identifier, or if an existing table lacks the `(fen, sm)` key.
    pub fn open<P: AsRef<Path>>(path: P, table: &str) -> StorageResult<Self> {
        Self::with_connection(Connection::open(path)?, table)
    }

    /// Uses an already open connection, e.g. `Connection::open_in_memory()`.
    pub fn with_connection(conn: Connection, table: &str) -> StorageResult<Self> {
        if !is_identifier(table) {
            return Err(StorageError::InvalidTable(table.to_string()));
        }
        let sink = Self {
            conn,
            table: table.to_string(),
        };
        sink.init_schema()?;
        if !sink.has_unique_key()? {
            return Err(StorageError::MissingUniqueKey(sink.table));
        }
        Ok(sink)
    }

    /// Initializes the database schema if the table does not exist.
    fn init_schema(&self) -> StorageResult<()> {
        self.conn.execute_batch(&format!(
            "
            CREATE TABLE IF NOT EXISTS {table} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                fen TEXT NOT NULL,
                sm TEXT NOT NULL,
                cp INTEGER,
                dm INTEGER,
                bm TEXT,
                blunder INTEGER,
                created_at TEXT NOT NULL,
                UNIQUE (fen, sm)
            );
            ",
            table = self.table
        ))?;
        Ok(())
    }

    /// Whether some unique index covers exactly the `fen` and `sm` columns.
    fn has_unique_key(&self) -> StorageResult<bool> {
        let mut list = self
            .conn
            .prepare(&format!("PRAGMA index_list({})", self.table))?;
        let unique: Vec<String> = list
            .query_map([], |row| {
                Ok((row.get::<_, String>("name")?, row.get::<_, bool>("unique")?))
            })?
            .filter_map(|r| match r {
                Ok((name, true)) => Some(Ok(name)),
                Ok(_) => None,
                Err(e) => Some(Err(e)),
            })
            .collect::<Result<_, _>>()?;

        for index in unique {
            let mut info = self.conn.prepare("SELECT name FROM pragma_index_info(?1)")?;
            let mut columns: Vec<String> = info
                .query_map([&index], |row| row.get(0))?
                .collect::<Result<_, _>>()?;
            columns.sort();
            if columns == ["fen", "sm"] {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Inserts a finding.
    ///
    /// Returns `Ok(None)` if the position and move are already stored. Any
    /// other failure, including other constraint violations, is an error.
    pub fn insert(&self, finding: &Finding) -> StorageResult<Option<i64>> {
        let result = self.conn.execute(
            &format!(
                "INSERT INTO {} (fen, sm, cp, dm, bm, blunder, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                self.table
            ),
            (
                &finding.position,
                &finding.played_move,
                finding.centipawns,
                finding.mate_distance,
                &finding.best_move,
                finding.severity,
                Utc::now().to_rfc3339(),
            ),
        );

        match result {
            Ok(rows) => {
                let id = self.conn.last_insert_rowid();
                debug!(id, rows, "inserted finding");
                Ok(Some(id))
            }
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Number of stored findings.
    pub fn count(&self) -> StorageResult<i64> {
        let count = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", self.table),
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

impl FindingSink for SqliteSink {
    fn record(&mut self, finding: &Finding) -> Result<RecordOutcome, SinkError> {
        match self.insert(finding).map_err(SinkError::new)? {
            Some(id) => Ok(RecordOutcome::Inserted { id }),
            None => Ok(RecordOutcome::Duplicate),
        }
    }
}
