//! Context expansion around seed chunks
//!
//! Three strategies run in a fixed order, each disabled by a zero limit:
//! - neighbor: adjacent chunks in the same file
//! - breadcrumb: siblings sharing the seed's enclosing definition
//! - import: leading chunks of files the seed's file imports
//!
//! A chunk reachable by several strategies is emitted once, tagged with the
//! first strategy that reached it.

use super::resolvers::ImportResolver;
use crate::config::SearchConfig;
use crate::error::{CodeweaveError, Result};
use crate::search::{ChunkKey, ChunkRecord, ChunkSource, ChunkStore, ScoredChunk};
use futures::future::join_all;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

const NEIGHBOR_DECAY: f64 = 0.8;
const BREADCRUMB_DECAY: f64 = 0.7;
const IMPORT_DECAY: f64 = 0.5;

/// Per-strategy limits; zero disables a strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpansionLimits {
    pub neighbor_hops: usize,
    pub breadcrumb_expand_limit: usize,
    pub import_files_per_seed: usize,
    pub chunks_per_import_file: usize,
}

impl ExpansionLimits {
    pub fn from_config(config: &SearchConfig) -> Self {
        Self {
            neighbor_hops: config.neighbor_hops,
            breadcrumb_expand_limit: config.breadcrumb_expand_limit,
            import_files_per_seed: config.import_files_per_seed,
            chunks_per_import_file: config.chunks_per_import_file,
        }
    }

    fn imports_enabled(&self) -> bool {
        self.import_files_per_seed > 0 && self.chunks_per_import_file > 0
    }
}

/// Lower a seed score by `decay`, staying strictly below the seed for zero and negative scores too
fn decayed(score: f64, decay: f64) -> f64 {
    if score == 0.0 {
        return -(1.0 - decay);
    }
    score - score.abs() * (1.0 - decay)
}

/// Adds neighbor, sibling and imported chunks to a seed set
pub struct GraphExpander {
    store: Arc<dyn ChunkStore>,
    limits: ExpansionLimits,
}

impl GraphExpander {
    pub fn new(store: Arc<dyn ChunkStore>, limits: ExpansionLimits) -> Self {
        Self { store, limits }
    }

    /// Expand `seeds`, never returning a chunk in `already_included` or among the seeds
    pub async fn expand(
        &self,
        seeds: &[ScoredChunk],
        already_included: &HashSet<ChunkKey>,
    ) -> Vec<ScoredChunk> {
        let mut seen: HashSet<ChunkKey> = already_included.clone();
        seen.extend(seeds.iter().map(|s| s.key()));

        let needs_listings =
            self.limits.neighbor_hops > 0 || self.limits.breadcrumb_expand_limit > 0;
        let listings = if needs_listings {
            self.load_listings(seeds).await
        } else {
            HashMap::new()
        };

        let mut expanded = Vec::new();
        expanded.extend(self.expand_neighbors(seeds, &listings, &mut seen));
        expanded.extend(self.expand_breadcrumbs(seeds, &listings, &mut seen));
        expanded.extend(self.expand_imports(seeds, &mut seen).await);

        tracing::debug!(
            seeds = seeds.len(),
            expanded = expanded.len(),
            "graph expansion complete"
        );
        expanded
    }

    /// Chunk listings of every seed file, fetched concurrently; failed files are absent
    async fn load_listings(&self, seeds: &[ScoredChunk]) -> HashMap<String, Vec<ChunkRecord>> {
        let mut files: Vec<&str> = Vec::new();
        for seed in seeds {
            if !files.contains(&seed.file_path.as_str()) {
                files.push(&seed.file_path);
            }
        }

        let fetches = files.iter().map(|file| self.store.file_chunks(file));
        let results = join_all(fetches).await;

        let mut listings = HashMap::new();
        for (file, result) in files.into_iter().zip(results) {
            match result {
                Ok(chunks) => {
                    listings.insert(file.to_string(), chunks);
                }
                Err(e) => {
                    tracing::warn!(file = %file, error = %e, "skipping expansion for file");
                }
            }
        }
        listings
    }

    pub(crate) fn expand_neighbors(
        &self,
        seeds: &[ScoredChunk],
        listings: &HashMap<String, Vec<ChunkRecord>>,
        seen: &mut HashSet<ChunkKey>,
    ) -> Vec<ScoredChunk> {
        let hops = self.limits.neighbor_hops;
        if hops == 0 {
            return Vec::new();
        }

        let mut out = Vec::new();
        for seed in seeds {
            let Some(listing) = listings.get(&seed.file_path) else {
                continue;
            };
            let by_index: HashMap<usize, &ChunkRecord> =
                listing.iter().map(|c| (c.chunk_index, c)).collect();

            for hop in 1..=hops {
                let before = seed.chunk_index.checked_sub(hop);
                let after = seed.chunk_index.checked_add(hop);
                for index in [before, after].into_iter().flatten() {
                    let Some(record) = by_index.get(&index) else {
                        continue;
                    };
                    let key = ChunkKey::new(record.file_path.clone(), record.chunk_index);
                    if seen.insert(key) {
                        let score = decayed(seed.score, NEIGHBOR_DECAY.powi(hop as i32));
                        out.push(ScoredChunk::new(
                            (*record).clone(),
                            score,
                            ChunkSource::Neighbor,
                        ));
                    }
                }
            }
        }
        out
    }

    pub(crate) fn expand_breadcrumbs(
        &self,
        seeds: &[ScoredChunk],
        listings: &HashMap<String, Vec<ChunkRecord>>,
        seen: &mut HashSet<ChunkKey>,
    ) -> Vec<ScoredChunk> {
        let limit = self.limits.breadcrumb_expand_limit;
        if limit == 0 {
            return Vec::new();
        }

        let mut out = Vec::new();
        for seed in seeds {
            let breadcrumb = &seed.record.breadcrumb;
            if breadcrumb.is_empty() {
                continue;
            }
            let Some(listing) = listings.get(&seed.file_path) else {
                continue;
            };

            let mut siblings: Vec<&ChunkRecord> = listing
                .iter()
                .filter(|c| c.chunk_index != seed.chunk_index && &c.breadcrumb == breadcrumb)
                .collect();
            siblings.sort_by_key(|c| (c.chunk_index.abs_diff(seed.chunk_index), c.chunk_index));

            let mut added = 0;
            for record in siblings {
                if added >= limit {
                    break;
                }
                let key = ChunkKey::new(record.file_path.clone(), record.chunk_index);
                if seen.insert(key) {
                    out.push(ScoredChunk::new(
                        record.clone(),
                        decayed(seed.score, BREADCRUMB_DECAY),
                        ChunkSource::Breadcrumb,
                    ));
                    added += 1;
                }
            }
        }
        out
    }

    async fn expand_imports(
        &self,
        seeds: &[ScoredChunk],
        seen: &mut HashSet<ChunkKey>,
    ) -> Vec<ScoredChunk> {
        if !self.limits.imports_enabled() || seeds.is_empty() {
            return Vec::new();
        }

        let all_files: BTreeSet<String> = match self.store.all_file_paths().await {
            Ok(paths) => paths.into_iter().collect(),
            Err(e) => {
                tracing::warn!(error = %e, "import expansion skipped: file list unavailable");
                return Vec::new();
            }
        };

        let mut targets_by_file: HashMap<String, Vec<String>> = HashMap::new();
        let mut target_chunks: HashMap<String, Vec<ChunkRecord>> = HashMap::new();
        let mut out = Vec::new();

        for seed in seeds {
            if !targets_by_file.contains_key(&seed.file_path) {
                match self.resolve_imports(&seed.file_path, &all_files).await {
                    Ok(targets) => {
                        targets_by_file.insert(seed.file_path.clone(), targets);
                    }
                    Err(e) => {
                        tracing::warn!(
                            file = %seed.file_path,
                            error = %e,
                            "import resolution failed"
                        );
                        targets_by_file.insert(seed.file_path.clone(), Vec::new());
                    }
                }
            }
            let targets = targets_by_file
                .get(&seed.file_path)
                .cloned()
                .unwrap_or_default();

            for target in targets.iter().take(self.limits.import_files_per_seed) {
                if !target_chunks.contains_key(target) {
                    match self.store.file_chunks(target).await {
                        Ok(chunks) => {
                            target_chunks.insert(target.clone(), chunks);
                        }
                        Err(e) => {
                            tracing::warn!(file = %target, error = %e, "skipping import target");
                            continue;
                        }
                    }
                }
                let Some(chunks) = target_chunks.get(target) else {
                    continue;
                };

                let mut added = 0;
                for record in chunks {
                    if added >= self.limits.chunks_per_import_file {
                        break;
                    }
                    let key = ChunkKey::new(record.file_path.clone(), record.chunk_index);
                    if seen.insert(key) {
                        out.push(ScoredChunk::new(
                            record.clone(),
                            decayed(seed.score, IMPORT_DECAY),
                            ChunkSource::Import,
                        ));
                        added += 1;
                    }
                }
            }
        }
        out
    }

    /// Resolved import targets of one file, in source order
    async fn resolve_imports(
        &self,
        file_path: &str,
        all_files: &BTreeSet<String>,
    ) -> Result<Vec<String>> {
        let resolvers = ImportResolver::for_file(file_path);
        if resolvers.is_empty() {
            return Ok(Vec::new());
        }
        let content = self
            .store
            .file_content(file_path)
            .await?
            .ok_or_else(|| CodeweaveError::Expansion(format!("no content for {}", file_path)))?;

        let mut targets: Vec<String> = Vec::new();
        for resolver in resolvers {
            for target in resolver.resolve_all(&content, file_path, all_files) {
                if !targets.contains(&target) {
                    targets.push(target);
                }
            }
        }
        Ok(targets)
    }
}
