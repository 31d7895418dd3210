//! Retrieval backend contracts

use super::{ChunkRecord, SearchFilter};
use crate::error::Result;
use async_trait::async_trait;

/// A vector channel hit; smaller distance is closer
#[derive(Debug, Clone, PartialEq)]
pub struct VectorHit {
    pub chunk_id: String,
    pub distance: f64,
}

/// A lexical channel hit; larger score is better
#[derive(Debug, Clone, PartialEq)]
pub struct LexicalHit {
    pub chunk_id: String,
    pub score: f64,
}

/// Nearest-neighbour search over chunk embeddings
#[async_trait]
pub trait VectorChannel: Send + Sync {
    /// Return up to `limit` chunk ids ordered by ascending distance
    async fn search(
        &self,
        embedding: &[f32],
        limit: usize,
        filter: &SearchFilter,
    ) -> Result<Vec<VectorHit>>;
}

/// Ranked full-text search over chunk symbols, body and comments
#[async_trait]
pub trait LexicalChannel: Send + Sync {
    /// Return up to `limit` chunk ids ordered by descending relevance
    async fn search(
        &self,
        query: &str,
        limit: usize,
        filter: &SearchFilter,
    ) -> Result<Vec<LexicalHit>>;
}

/// Read access to chunk metadata and file content
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Chunk records for the given ids; unknown ids are omitted
    async fn chunks_by_ids(&self, ids: &[String]) -> Result<Vec<ChunkRecord>>;

    /// All chunks of a file ordered by chunk index
    async fn file_chunks(&self, file_path: &str) -> Result<Vec<ChunkRecord>>;

    /// Full text of a file, `None` when the file is not indexed
    async fn file_content(&self, file_path: &str) -> Result<Option<String>>;

    /// Every indexed file path, sorted
    async fn all_file_paths(&self) -> Result<Vec<String>>;
}
