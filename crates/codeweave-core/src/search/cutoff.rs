//! Score-based trimming of the seed list

use super::ScoredChunk;

/// Trims the long tail of reranked seeds.
///
/// Implementations receive seeds in final rank order and return the prefix to keep.
pub trait CutoffStrategy: Send + Sync {
    fn apply(&self, seeds: Vec<ScoredChunk>) -> Vec<ScoredChunk>;

    fn name(&self) -> &str;
}

/// Keeps every seed
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl CutoffStrategy for PassThrough {
    fn apply(&self, seeds: Vec<ScoredChunk>) -> Vec<ScoredChunk> {
        seeds
    }

    fn name(&self) -> &str {
        "pass-through"
    }
}
