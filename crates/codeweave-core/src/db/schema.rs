//! Database schema and initialization

use crate::error::Result;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Main database handle
pub struct Database {
    conn: Mutex<Connection>,
}

const SCHEMA_VERSION: i32 = 1;

const CREATE_TABLES: &str = r#"
-- Indexed source files
CREATE TABLE IF NOT EXISTS files (
    path TEXT PRIMARY KEY,
    hash TEXT NOT NULL,
    mtime INTEGER NOT NULL,
    size INTEGER NOT NULL,
    content TEXT,
    language TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Chunk metadata; offsets are bytes into files.content
CREATE TABLE IF NOT EXISTS chunks (
    chunk_id TEXT PRIMARY KEY,
    file_path TEXT NOT NULL,
    file_hash TEXT NOT NULL,
    chunk_index INTEGER NOT NULL,
    raw_start INTEGER NOT NULL,
    raw_end INTEGER NOT NULL,
    vec_start INTEGER NOT NULL,
    vec_end INTEGER NOT NULL,
    breadcrumb TEXT NOT NULL,
    language TEXT NOT NULL,
    UNIQUE(file_path, chunk_index)
);

-- Chunk embeddings, little-endian f32
CREATE TABLE IF NOT EXISTS chunk_vectors (
    chunk_id TEXT PRIMARY KEY,
    model TEXT NOT NULL,
    embedding BLOB NOT NULL,
    created_at TEXT NOT NULL
);

-- Field-weighted full-text index over chunks
CREATE VIRTUAL TABLE IF NOT EXISTS chunks_fts USING fts5(
    chunk_id UNINDEXED,
    file_path UNINDEXED,
    symbols,
    body,
    comments,
    tokenize='unicode61'
);

-- Implicit feedback log
CREATE TABLE IF NOT EXISTS retrieval_events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    created_at INTEGER NOT NULL,
    session TEXT,
    query TEXT NOT NULL,
    technical_terms TEXT NOT NULL,
    seed_count INTEGER NOT NULL,
    file_count INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS retrieval_event_chunks (
    event_id INTEGER NOT NULL,
    rank INTEGER NOT NULL,
    chunk_id TEXT NOT NULL,
    file_path TEXT NOT NULL,
    chunk_index INTEGER NOT NULL,
    score REAL NOT NULL,
    source TEXT NOT NULL,
    PRIMARY KEY (event_id, rank)
);

CREATE TABLE IF NOT EXISTS retrieval_signals (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    created_at INTEGER NOT NULL,
    source_event_id INTEGER NOT NULL,
    target_event_id INTEGER NOT NULL,
    signal_type TEXT NOT NULL,
    weight REAL NOT NULL,
    target_chunk_id TEXT,
    target_file_path TEXT,
    evidence TEXT NOT NULL
);

-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_chunks_file_path ON chunks(file_path);
CREATE INDEX IF NOT EXISTS idx_retrieval_events_created_at ON retrieval_events(created_at);
CREATE INDEX IF NOT EXISTS idx_retrieval_events_session ON retrieval_events(session);
CREATE INDEX IF NOT EXISTS idx_retrieval_chunks_event_id ON retrieval_event_chunks(event_id);
CREATE INDEX IF NOT EXISTS idx_retrieval_signals_created_at ON retrieval_signals(created_at);
CREATE INDEX IF NOT EXISTS idx_retrieval_signals_source_event ON retrieval_signals(source_event_id);
CREATE INDEX IF NOT EXISTS idx_retrieval_signals_target_file ON retrieval_signals(target_file_path);
"#;

impl Database {
    /// Open database at path, creating if necessary
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Connection guard; a poisoned lock is recovered since every write is a single statement or transaction
    pub(crate) fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Initialize database schema
    pub fn initialize(&self) -> Result<()> {
        let conn = self.conn();
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -64000;
             PRAGMA busy_timeout = 5000;",
        )?;

        conn.execute_batch(CREATE_TABLES)?;

        conn.execute(
            "INSERT OR REPLACE INTO schema_version (version) VALUES (?1)",
            params![SCHEMA_VERSION],
        )?;

        Ok(())
    }

    /// Get current schema version
    pub fn schema_version(&self) -> Result<Option<i32>> {
        let version = self
            .conn()
            .query_row(
                "SELECT version FROM schema_version ORDER BY version DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .ok();
        Ok(version)
    }
}
