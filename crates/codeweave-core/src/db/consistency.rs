//! Vector / full-text index consistency checks

use super::Database;
use crate::error::Result;
use rusqlite::params;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Chunk ids present in one index but not the other
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsistencyReport {
    pub vector_count: usize,
    pub fts_count: usize,
    pub missing_in_fts: Vec<String>,
    pub missing_in_vector: Vec<String>,
}

impl ConsistencyReport {
    pub fn from_ids(vector_ids: &[String], fts_ids: &[String]) -> Self {
        let vector_set: HashSet<&str> = vector_ids.iter().map(String::as_str).collect();
        let fts_set: HashSet<&str> = fts_ids.iter().map(String::as_str).collect();
        Self {
            vector_count: vector_ids.len(),
            fts_count: fts_ids.len(),
            missing_in_fts: vector_ids
                .iter()
                .filter(|id| !fts_set.contains(id.as_str()))
                .cloned()
                .collect(),
            missing_in_vector: fts_ids
                .iter()
                .filter(|id| !vector_set.contains(id.as_str()))
                .cloned()
                .collect(),
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.missing_in_fts.is_empty() && self.missing_in_vector.is_empty()
    }
}

impl Database {
    /// Every chunk id in the full-text index, sorted
    pub fn fts_chunk_ids(&self) -> Result<Vec<String>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT chunk_id FROM chunks_fts ORDER BY chunk_id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(ids)
    }

    pub fn chunk_index_consistency(&self) -> Result<ConsistencyReport> {
        let vector_ids = self.vector_chunk_ids()?;
        let fts_ids = self.fts_chunk_ids()?;
        Ok(ConsistencyReport::from_ids(&vector_ids, &fts_ids))
    }

    /// Drop full-text rows whose chunk has no vector; returns the number removed
    pub fn repair_chunk_index_consistency(&self) -> Result<usize> {
        let report = self.chunk_index_consistency()?;
        if report.missing_in_vector.is_empty() {
            return Ok(0);
        }

        let conn = self.conn();
        conn.execute("BEGIN IMMEDIATE", [])?;
        let result = (|| -> Result<usize> {
            let mut removed = 0;
            for id in &report.missing_in_vector {
                removed += conn.execute("DELETE FROM chunks_fts WHERE chunk_id = ?1", params![id])?;
            }
            Ok(removed)
        })();

        if result.is_ok() {
            conn.execute("COMMIT", [])?;
        } else {
            let _ = conn.execute("ROLLBACK", []);
        }
        if let Ok(removed) = result {
            tracing::info!(removed, "removed orphaned full-text rows");
        }
        result
    }
}
