//! Retrieval orchestration
//!
//! channels -> fusion -> per-file cap -> rerank -> cutoff -> expansion -> packing

use super::{
    fuse_scored, ChunkKey, ChunkSource, ChunkStore, CutoffStrategy, LexicalChannel, PassThrough,
    QueryChannels, ScoredChunk, SearchFilter, VectorChannel,
};
use crate::config::SearchConfig;
use crate::error::{CodeweaveError, Result};
use crate::graph::{ExpansionLimits, GraphExpander};
use crate::llm::{Embedder, RerankDocument, Reranker};
use crate::pack::{floor_boundary, ContextPacker, PackLimits, PackedFile};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// One retrieval request
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub channels: QueryChannels,
    pub filter: SearchFilter,
}

impl SearchRequest {
    pub fn new(channels: QueryChannels) -> Self {
        Self {
            channels,
            filter: SearchFilter::default(),
        }
    }

    pub fn with_filter(mut self, filter: SearchFilter) -> Self {
        self.filter = filter;
        self
    }
}

/// Wall-clock time per stage, in milliseconds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageTimings {
    pub retrieve_ms: u64,
    pub rerank_ms: u64,
    pub expand_ms: u64,
    pub pack_ms: u64,
    pub total_ms: u64,
}

/// Final result bundle of a search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextPack {
    pub seeds: Vec<ScoredChunk>,
    pub expanded: Vec<ScoredChunk>,
    pub files: Vec<PackedFile>,
    pub timing: StageTimings,
}

impl ContextPack {
    pub fn segment_count(&self) -> usize {
        self.files.iter().map(|f| f.segments.len()).sum()
    }
}

/// Keep the `cap` highest scored candidates per file, ordered by score descending.
/// Equal scores keep their input order. `cap <= 0` keeps everything unchanged.
pub fn apply_per_file_cap(mut candidates: Vec<ScoredChunk>, cap: i64) -> Vec<ScoredChunk> {
    if cap <= 0 {
        return candidates;
    }
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
    let cap = cap as usize;
    let mut per_file: HashMap<String, usize> = HashMap::new();
    candidates
        .into_iter()
        .filter(|c| {
            let count = per_file.entry(c.file_path.clone()).or_insert(0);
            *count += 1;
            *count <= cap
        })
        .collect()
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// Run a collaborator call under a deadline, tagging failures with the stage
async fn staged<T, F>(stage: &'static str, budget: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(budget, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(CodeweaveError::Channel {
            stage,
            message: e.to_string(),
        }),
        Err(_) => Err(CodeweaveError::Timeout {
            stage,
            after_ms: budget.as_millis() as u64,
        }),
    }
}

/// The online retrieval pipeline over pluggable collaborators
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    vector: Arc<dyn VectorChannel>,
    lexical: Arc<dyn LexicalChannel>,
    store: Arc<dyn ChunkStore>,
    reranker: Option<Arc<dyn Reranker>>,
    cutoff: Box<dyn CutoffStrategy>,
    config: SearchConfig,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        vector: Arc<dyn VectorChannel>,
        lexical: Arc<dyn LexicalChannel>,
        store: Arc<dyn ChunkStore>,
        config: SearchConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            embedder,
            vector,
            lexical,
            store,
            reranker: None,
            cutoff: Box::new(PassThrough),
            config,
        })
    }

    pub fn with_reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    pub fn with_cutoff(mut self, cutoff: Box<dyn CutoffStrategy>) -> Self {
        self.cutoff = cutoff;
        self
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn store(&self) -> Arc<dyn ChunkStore> {
        Arc::clone(&self.store)
    }

    /// Run the full pipeline for one request
    pub async fn search(&self, request: &SearchRequest) -> Result<ContextPack> {
        let started = Instant::now();
        let mut timing = StageTimings::default();

        let stage = Instant::now();
        let candidates = self.retrieve(request).await?;
        let candidates = apply_per_file_cap(candidates, self.config.pre_rerank_per_file_cap);
        timing.retrieve_ms = elapsed_ms(stage);

        let stage = Instant::now();
        let mut seeds = self.rerank(&request.channels.rerank_query, candidates).await;
        if self.config.enable_smart_cutoff {
            let before = seeds.len();
            seeds = self.cutoff.apply(seeds);
            tracing::debug!(
                strategy = self.cutoff.name(),
                before,
                after = seeds.len(),
                "cutoff applied"
            );
        }
        timing.rerank_ms = elapsed_ms(stage);

        let stage = Instant::now();
        let seed_keys: HashSet<ChunkKey> = seeds.iter().map(ScoredChunk::key).collect();
        let expander = GraphExpander::new(self.store(), ExpansionLimits::from_config(&self.config));
        let expanded = expander.expand(&seeds, &seed_keys).await;
        timing.expand_ms = elapsed_ms(stage);

        let stage = Instant::now();
        let packer = ContextPacker::new(self.store(), PackLimits::from_config(&self.config));
        let mut all = seeds.clone();
        all.extend(expanded.iter().cloned());
        let files = packer.pack(&all).await;
        timing.pack_ms = elapsed_ms(stage);
        timing.total_ms = elapsed_ms(started);

        tracing::info!(
            seeds = seeds.len(),
            expanded = expanded.len(),
            files = files.len(),
            total_ms = timing.total_ms,
            "search complete"
        );

        Ok(ContextPack {
            seeds,
            expanded,
            files,
            timing,
        })
    }

    /// Query both channels, fuse, hydrate and filter
    async fn retrieve(&self, request: &SearchRequest) -> Result<Vec<ScoredChunk>> {
        let channels = &request.channels;
        let filter = &request.filter;
        let budget = self.config.channel_timeout();

        let vector_side = async {
            let embedding = staged(
                "embedding",
                budget,
                self.embedder.embed(&channels.vector_query),
            )
            .await?;
            staged(
                "vector",
                budget,
                self.vector
                    .search(&embedding, self.config.vector_top_k, filter),
            )
            .await
        };
        let lexical_side = staged(
            "lexical",
            budget,
            self.lexical
                .search(&channels.lexical_query, self.config.lexical_top_k, filter),
        );

        let (vector_hits, lexical_hits) = tokio::try_join!(vector_side, lexical_side)?;
        tracing::debug!(
            vector = vector_hits.len(),
            lexical = lexical_hits.len(),
            "channel hits"
        );

        let vector_ids: Vec<&str> = vector_hits.iter().map(|h| h.chunk_id.as_str()).collect();
        let lexical_ids: Vec<&str> = lexical_hits.iter().map(|h| h.chunk_id.as_str()).collect();
        let fused = fuse_scored(&vector_ids, &lexical_ids, &self.config.fusion);

        let ids: Vec<String> = fused.iter().map(|c| c.id.clone()).collect();
        let records: HashMap<String, _> = self
            .store
            .chunks_by_ids(&ids)
            .await?
            .into_iter()
            .map(|r| (r.chunk_id.clone(), r))
            .collect();

        let mut seen: HashSet<ChunkKey> = HashSet::new();
        let mut candidates = Vec::with_capacity(fused.len());
        for candidate in fused {
            let Some(record) = records.get(&candidate.id) else {
                tracing::debug!(chunk_id = %candidate.id, "fused id has no chunk record");
                continue;
            };
            if !filter.allows(&record.file_path, &record.language) {
                continue;
            }
            let chunk = ScoredChunk::new(record.clone(), candidate.score, candidate.source());
            if seen.insert(chunk.key()) {
                candidates.push(chunk);
            }
        }
        Ok(candidates)
    }

    /// Rerank and truncate to `rerank_top_n`; any rerank failure falls back to fused order
    async fn rerank(&self, query: &str, candidates: Vec<ScoredChunk>) -> Vec<ScoredChunk> {
        let top_n = self.config.rerank_top_n;
        let Some(reranker) = &self.reranker else {
            return candidates.into_iter().take(top_n).collect();
        };
        if candidates.is_empty() {
            return candidates;
        }

        let budget = self.config.rerank_timeout();
        let outcome = tokio::time::timeout(
            budget,
            self.rerank_with(reranker.as_ref(), query, &candidates),
        )
        .await;

        match outcome {
            Ok(Ok(scores)) => {
                let mut reranked: Vec<ScoredChunk> = candidates
                    .into_iter()
                    .zip(scores)
                    .map(|(mut chunk, score)| {
                        chunk.score = score;
                        chunk.source = ChunkSource::Rerank;
                        chunk
                    })
                    .collect();
                reranked.sort_by(|a, b| b.score.total_cmp(&a.score));
                reranked.truncate(top_n);
                reranked
            }
            Ok(Err(e)) => {
                tracing::warn!(stage = "rerank", error = %e, "rerank failed, using fused order");
                candidates.into_iter().take(top_n).collect()
            }
            Err(_) => {
                tracing::warn!(
                    stage = "rerank",
                    after_ms = budget.as_millis() as u64,
                    "rerank timed out, using fused order"
                );
                candidates.into_iter().take(top_n).collect()
            }
        }
    }

    /// Scores aligned to `candidates`
    async fn rerank_with(
        &self,
        reranker: &dyn Reranker,
        query: &str,
        candidates: &[ScoredChunk],
    ) -> Result<Vec<f64>> {
        let mut paths: Vec<&str> = Vec::new();
        for c in candidates {
            if !paths.contains(&c.file_path.as_str()) {
                paths.push(&c.file_path);
            }
        }
        let loaded = join_all(paths.iter().map(|p| self.store.file_content(p))).await;
        let mut contents: HashMap<&str, String> = HashMap::new();
        for (path, result) in paths.into_iter().zip(loaded) {
            if let Some(content) = result? {
                contents.insert(path, content);
            }
        }

        let documents: Vec<RerankDocument> = candidates
            .iter()
            .map(|c| {
                let text = contents
                    .get(c.file_path.as_str())
                    .map(|content| {
                        let start = floor_boundary(content, c.record.vec_start);
                        let end = floor_boundary(content, c.record.vec_end).max(start);
                        content[start..end].to_string()
                    })
                    .unwrap_or_default();
                RerankDocument {
                    id: c.record.chunk_id.clone(),
                    text,
                }
            })
            .collect();

        let results = reranker.rerank(query, &documents).await?;
        if results.len() != documents.len() {
            return Err(CodeweaveError::Rerank(format!(
                "expected {} scores, got {}",
                documents.len(),
                results.len()
            )));
        }
        Ok(results.into_iter().map(|r| r.score).collect())
    }
}
