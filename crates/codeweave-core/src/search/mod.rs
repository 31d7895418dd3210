//! Retrieval pipeline
//!
//! Provides:
//! - Weighted reciprocal rank fusion of vector and lexical rankings
//! - Query channel construction and search filters
//! - The orchestrator driving fusion, rerank, expansion and packing

mod channels;
mod cutoff;
mod filter;
mod fusion;
mod orchestrator;
mod traits;

pub use channels::QueryChannels;
pub use cutoff::{CutoffStrategy, PassThrough};
pub use filter::{
    code_languages, is_known_language, language_for_path, FilePathFilter, LanguageFilter,
    SearchFilter,
};
pub use fusion::{fuse, fuse_scored, FusedCandidate, FusionConfig};
pub use orchestrator::{apply_per_file_cap, ContextPack, Retriever, SearchRequest, StageTimings};
pub use traits::{ChunkStore, LexicalChannel, LexicalHit, VectorChannel, VectorHit};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Chunk metadata as stored by the indexer.
///
/// Byte offsets index into the file content returned by [`ChunkStore::file_content`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub chunk_id: String,
    pub file_path: String,
    pub chunk_index: usize,
    pub file_hash: String,
    pub raw_start: usize,
    pub raw_end: usize,
    pub vec_start: usize,
    pub vec_end: usize,
    pub breadcrumb: String,
    pub language: String,
}

/// Which stage produced a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkSource {
    Vector,
    Lexical,
    Rerank,
    Neighbor,
    Breadcrumb,
    Import,
}

impl ChunkSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vector => "vector",
            Self::Lexical => "lexical",
            Self::Rerank => "rerank",
            Self::Neighbor => "neighbor",
            Self::Breadcrumb => "breadcrumb",
            Self::Import => "import",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "vector" => Some(Self::Vector),
            "lexical" => Some(Self::Lexical),
            "rerank" => Some(Self::Rerank),
            "neighbor" => Some(Self::Neighbor),
            "breadcrumb" => Some(Self::Breadcrumb),
            "import" => Some(Self::Import),
            _ => None,
        }
    }
}

impl fmt::Display for ChunkSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a chunk: file path plus chunk index
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkKey {
    pub file_path: String,
    pub chunk_index: usize,
}

impl ChunkKey {
    pub fn new(file_path: impl Into<String>, chunk_index: usize) -> Self {
        Self {
            file_path: file_path.into(),
            chunk_index,
        }
    }
}

impl fmt::Display for ChunkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.file_path, self.chunk_index)
    }
}

/// A ranked candidate chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub file_path: String,
    pub chunk_index: usize,
    pub score: f64,
    pub source: ChunkSource,
    pub record: ChunkRecord,
}

impl ScoredChunk {
    pub fn new(record: ChunkRecord, score: f64, source: ChunkSource) -> Self {
        Self {
            file_path: record.file_path.clone(),
            chunk_index: record.chunk_index,
            score,
            source,
            record,
        }
    }

    pub fn key(&self) -> ChunkKey {
        ChunkKey::new(self.file_path.clone(), self.chunk_index)
    }
}
