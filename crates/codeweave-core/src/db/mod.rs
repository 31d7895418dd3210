//! Database layer for codeweave
//!
//! Provides SQLite-based storage with:
//! - FTS5 chunk search with field-weighted BM25
//! - BLOB embeddings scored by cosine similarity
//! - The implicit feedback event log

mod consistency;
mod content;
mod feedback;
mod schema;
mod store;
pub mod vectors;

pub use consistency::ConsistencyReport;
pub use content::{hash_content, project_id};
pub use schema::Database;
pub use store::{sanitize_fts_query, ChunkText, FileRecord};
use crate::error::Result;
use std::path::{Path, PathBuf};

impl Database {
    /// Default index location for a repository
    pub fn default_path(repo_path: impl AsRef<Path>) -> Result<PathBuf> {
        let id = project_id(repo_path)?;
        Ok(dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(crate::CACHE_DIR_NAME)
            .join(id)
            .join("index.sqlite"))
    }
}
