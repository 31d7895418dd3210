//! File, chunk and full-text storage
//!
//! Written by an external indexer, read by the retrieval pipeline.

use super::Database;
use crate::error::Result;
use crate::search::{ChunkRecord, ChunkStore, LexicalChannel, LexicalHit, SearchFilter};
use async_trait::async_trait;
use chrono::Utc;
use lazy_static::lazy_static;
use regex::Regex;
use rusqlite::{params, params_from_iter, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref FTS_TERM: Regex = Regex::new(r"[A-Za-z0-9_]+").unwrap();
}

/// bm25 weights for chunk_id, file_path, symbols, body, comments
const BM25_WEIGHTS: &str = "0.0, 0.0, 3.0, 1.0, 0.5";

const CHUNK_COLUMNS: &str = "chunk_id, file_path, chunk_index, file_hash, raw_start, raw_end, \
                             vec_start, vec_end, breadcrumb, language";

/// An indexed source file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: String,
    pub hash: String,
    pub mtime: i64,
    pub size: i64,
    pub content: Option<String>,
    pub language: String,
}

/// Full-text fields of one chunk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkText {
    pub symbols: String,
    pub body: String,
    pub comments: String,
}

fn chunk_from_row(row: &Row<'_>) -> rusqlite::Result<ChunkRecord> {
    Ok(ChunkRecord {
        chunk_id: row.get(0)?,
        file_path: row.get(1)?,
        chunk_index: row.get::<_, i64>(2)? as usize,
        file_hash: row.get(3)?,
        raw_start: row.get::<_, i64>(4)? as usize,
        raw_end: row.get::<_, i64>(5)? as usize,
        vec_start: row.get::<_, i64>(6)? as usize,
        vec_end: row.get::<_, i64>(7)? as usize,
        breadcrumb: row.get(8)?,
        language: row.get(9)?,
    })
}

/// Turn free text into an FTS5 OR query of quoted terms; `None` when nothing is searchable
pub fn sanitize_fts_query(query: &str) -> Option<String> {
    let mut terms: Vec<String> = Vec::new();
    for m in FTS_TERM.find_iter(query) {
        let term = format!("\"{}\"", m.as_str());
        if !terms.contains(&term) {
            terms.push(term);
        }
    }
    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" OR "))
    }
}

impl Database {
    /// Insert or update a file. A changed hash drops the file's stale chunks.
    pub fn upsert_file(&self, file: &FileRecord) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let conn = self.conn();

        let previous: Option<String> = conn
            .query_row(
                "SELECT hash FROM files WHERE path = ?1",
                params![file.path],
                |row| row.get(0),
            )
            .optional()?;

        conn.execute("BEGIN IMMEDIATE", [])?;
        let result = (|| -> Result<()> {
            if previous.as_deref().is_some_and(|h| h != file.hash) {
                delete_file_chunks(&conn, &file.path)?;
            }
            conn.execute(
                "INSERT INTO files (path, hash, mtime, size, content, language, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(path) DO UPDATE SET
                    hash = ?2, mtime = ?3, size = ?4, content = ?5, language = ?6, updated_at = ?7",
                params![
                    file.path,
                    file.hash,
                    file.mtime,
                    file.size,
                    file.content,
                    file.language,
                    now
                ],
            )?;
            Ok(())
        })();

        if result.is_ok() {
            conn.execute("COMMIT", [])?;
        } else {
            let _ = conn.execute("ROLLBACK", []);
        }
        result
    }

    /// Insert or replace a chunk together with its full-text row
    pub fn insert_chunk(&self, chunk: &ChunkRecord, text: &ChunkText) -> Result<()> {
        let conn = self.conn();
        conn.execute("BEGIN IMMEDIATE", [])?;
        let result = (|| -> Result<()> {
            conn.execute(
                "INSERT OR REPLACE INTO chunks (chunk_id, file_path, chunk_index, file_hash,
                    raw_start, raw_end, vec_start, vec_end, breadcrumb, language)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    chunk.chunk_id,
                    chunk.file_path,
                    chunk.chunk_index as i64,
                    chunk.file_hash,
                    chunk.raw_start as i64,
                    chunk.raw_end as i64,
                    chunk.vec_start as i64,
                    chunk.vec_end as i64,
                    chunk.breadcrumb,
                    chunk.language
                ],
            )?;
            conn.execute(
                "DELETE FROM chunks_fts WHERE chunk_id = ?1",
                params![chunk.chunk_id],
            )?;
            conn.execute(
                "INSERT INTO chunks_fts (chunk_id, file_path, symbols, body, comments)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    chunk.chunk_id,
                    chunk.file_path,
                    text.symbols,
                    text.body,
                    text.comments
                ],
            )?;
            Ok(())
        })();

        if result.is_ok() {
            conn.execute("COMMIT", [])?;
        } else {
            let _ = conn.execute("ROLLBACK", []);
        }
        result
    }

    /// Remove a file and everything indexed from it
    pub fn delete_file(&self, path: &str) -> Result<bool> {
        let conn = self.conn();
        delete_file_chunks(&conn, path)?;
        let rows = conn.execute("DELETE FROM files WHERE path = ?1", params![path])?;
        Ok(rows > 0)
    }

    pub fn get_chunks_by_ids(&self, ids: &[String]) -> Result<Vec<ChunkRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; ids.len()].join(",");
        let sql = format!(
            "SELECT {} FROM chunks WHERE chunk_id IN ({})",
            CHUNK_COLUMNS, placeholders
        );
        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let chunks = stmt
            .query_map(params_from_iter(ids.iter()), chunk_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(chunks)
    }

    pub fn get_file_chunks(&self, file_path: &str) -> Result<Vec<ChunkRecord>> {
        let sql = format!(
            "SELECT {} FROM chunks WHERE file_path = ?1 ORDER BY chunk_index",
            CHUNK_COLUMNS
        );
        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let chunks = stmt
            .query_map(params![file_path], chunk_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(chunks)
    }

    pub fn get_file_content(&self, file_path: &str) -> Result<Option<String>> {
        let content: Option<Option<String>> = self
            .conn()
            .query_row(
                "SELECT content FROM files WHERE path = ?1",
                params![file_path],
                |row| row.get(0),
            )
            .optional()?;
        Ok(content.flatten())
    }

    pub fn get_all_file_paths(&self) -> Result<Vec<String>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT path FROM files ORDER BY path")?;
        let paths = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(paths)
    }

    /// Field-weighted BM25 search over chunks
    pub fn search_chunks_fts(
        &self,
        query: &str,
        limit: usize,
        filter: &SearchFilter,
    ) -> Result<Vec<LexicalHit>> {
        let Some(fts_query) = sanitize_fts_query(query) else {
            return Ok(Vec::new());
        };

        let sql = format!(
            "SELECT f.chunk_id, bm25(chunks_fts, {}) AS rank, c.file_path, c.language
             FROM chunks_fts f
             JOIN chunks c ON c.chunk_id = f.chunk_id
             WHERE chunks_fts MATCH ?1
             ORDER BY rank, f.chunk_id",
            BM25_WEIGHTS
        );
        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params![fts_query])?;

        let mut hits = Vec::new();
        while hits.len() < limit {
            let Some(row) = rows.next()? else {
                break;
            };
            let file_path: String = row.get(2)?;
            let language: String = row.get(3)?;
            if !filter.allows(&file_path, &language) {
                continue;
            }
            let rank: f64 = row.get(1)?;
            hits.push(LexicalHit {
                chunk_id: row.get(0)?,
                score: -rank,
            });
        }
        Ok(hits)
    }
}

fn delete_file_chunks(conn: &rusqlite::Connection, path: &str) -> Result<()> {
    conn.execute(
        "DELETE FROM chunk_vectors WHERE chunk_id IN (SELECT chunk_id FROM chunks WHERE file_path = ?1)",
        params![path],
    )?;
    conn.execute("DELETE FROM chunks_fts WHERE file_path = ?1", params![path])?;
    conn.execute("DELETE FROM chunks WHERE file_path = ?1", params![path])?;
    Ok(())
}

#[async_trait]
impl ChunkStore for Database {
    async fn chunks_by_ids(&self, ids: &[String]) -> Result<Vec<ChunkRecord>> {
        self.get_chunks_by_ids(ids)
    }

    async fn file_chunks(&self, file_path: &str) -> Result<Vec<ChunkRecord>> {
        self.get_file_chunks(file_path)
    }

    async fn file_content(&self, file_path: &str) -> Result<Option<String>> {
        self.get_file_content(file_path)
    }

    async fn all_file_paths(&self) -> Result<Vec<String>> {
        self.get_all_file_paths()
    }
}

#[async_trait]
impl LexicalChannel for Database {
    async fn search(
        &self,
        query: &str,
        limit: usize,
        filter: &SearchFilter,
    ) -> Result<Vec<LexicalHit>> {
        self.search_chunks_fts(query, limit, filter)
    }
}
