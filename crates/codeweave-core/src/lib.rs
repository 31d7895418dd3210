//! Codeweave Core Library
//!
//! Ranking fusion and context assembly for code retrieval.
//!
//! # Features
//! - Weighted Reciprocal Rank Fusion (RRF) of vector and lexical channels
//! - Per-file candidate capping and cross-encoder rerank with fallback
//! - Graph expansion: same-file neighbors, shared-definition siblings, imports
//! - Budgeted context packing into merged per-file segments
//! - Implicit feedback signals inferred from consecutive queries
//! - Offline benchmark metrics and fusion auto-tuning
//! - SQLite FTS5 + embedding store as the reference backend

pub mod config;
pub mod db;
pub mod error;
pub mod eval;
pub mod feedback;
pub mod graph;
pub mod llm;
pub mod pack;
pub mod search;

pub use config::{Config, SearchConfig, ServiceConfig};
pub use db::{ConsistencyReport, Database};
pub use error::{CodeweaveError, Error, Result};
pub use eval::{
    evaluate_benchmark_cases, run_auto_tune, AutoTuneCase, AutoTuneOptions, AutoTuneResult,
    BenchmarkCase, BenchmarkSummary,
};
pub use feedback::{FeedbackSummary, InferredSignal, RetrievalEventInput, SignalKind};
pub use graph::{ExpansionLimits, GraphExpander, ImportResolver};
pub use llm::{Embedder, HttpEmbedder, HttpReranker, Reranker};
pub use pack::{ContextPacker, PackLimits, PackedFile, RawCodeBlock, Segment};
pub use search::{
    fuse, ChunkKey, ChunkRecord, ChunkSource, ContextPack, FusionConfig, QueryChannels, Retriever,
    ScoredChunk, SearchFilter, SearchRequest,
};

/// Default cache directory name
pub const CACHE_DIR_NAME: &str = "codeweave";

/// Default config directory name
pub const CONFIG_DIR_NAME: &str = "codeweave";
