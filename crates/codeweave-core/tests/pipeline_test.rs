//! Retrieval pipeline tests over in-memory collaborators
//!
//! Tests:
//! 1. Query channel routing to embedder, lexical channel and reranker
//! 2. Channel failures fail the request with the stage named
//! 3. Rerank success, failure and timeout
//! 4. Graph expansion limits, provenance and de-duplication
//! 5. Packing of seeds and expansion into merged segments

use async_trait::async_trait;
use codeweave_core::error::{CodeweaveError, Result};
use codeweave_core::graph::{ExpansionLimits, GraphExpander};
use codeweave_core::llm::{Embedder, RerankDocument, RerankResult, Reranker};
use codeweave_core::search::{
    ChunkKey, ChunkRecord, ChunkSource, ChunkStore, LexicalChannel, LexicalHit, QueryChannels,
    Retriever, ScoredChunk, SearchFilter, SearchRequest, VectorChannel, VectorHit,
};
use codeweave_core::SearchConfig;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

struct FakeFile {
    content: Option<String>,
    chunks: Vec<ChunkRecord>,
}

#[derive(Default)]
struct FakeStore {
    files: BTreeMap<String, FakeFile>,
    unreadable: HashSet<String>,
    file_chunk_calls: AtomicUsize,
    file_list_calls: AtomicUsize,
}

impl FakeStore {
    /// One chunk per line; `breadcrumbs[i]` labels line `i`
    fn with_file(mut self, path: &str, lines: &[&str], breadcrumbs: &[&str]) -> Self {
        let mut content = String::new();
        let mut chunks = Vec::new();
        for (i, line) in lines.iter().enumerate() {
            let start = content.len();
            content.push_str(line);
            content.push('\n');
            chunks.push(ChunkRecord {
                chunk_id: format!("{}#{}", path, i),
                file_path: path.to_string(),
                chunk_index: i,
                file_hash: "hash".to_string(),
                raw_start: start,
                raw_end: content.len(),
                vec_start: start,
                vec_end: start + line.len(),
                breadcrumb: breadcrumbs.get(i).copied().unwrap_or("").to_string(),
                language: "typescript".to_string(),
            });
        }
        self.files.insert(
            path.to_string(),
            FakeFile {
                content: Some(content),
                chunks,
            },
        );
        self
    }

    fn without_content(mut self, path: &str) -> Self {
        if let Some(file) = self.files.get_mut(path) {
            file.content = None;
        }
        self
    }

    /// Content reads for `path` fail with an error
    fn with_unreadable_content(mut self, path: &str) -> Self {
        self.unreadable.insert(path.to_string());
        self
    }

    fn record(&self, path: &str, index: usize) -> ChunkRecord {
        self.files[path].chunks[index].clone()
    }

    fn seed(&self, path: &str, index: usize, score: f64) -> ScoredChunk {
        ScoredChunk::new(self.record(path, index), score, ChunkSource::Vector)
    }
}

#[async_trait]
impl ChunkStore for FakeStore {
    async fn chunks_by_ids(&self, ids: &[String]) -> Result<Vec<ChunkRecord>> {
        Ok(self
            .files
            .values()
            .flat_map(|f| f.chunks.iter())
            .filter(|c| ids.contains(&c.chunk_id))
            .cloned()
            .collect())
    }

    async fn file_chunks(&self, file_path: &str) -> Result<Vec<ChunkRecord>> {
        self.file_chunk_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .files
            .get(file_path)
            .map(|f| f.chunks.clone())
            .unwrap_or_default())
    }

    async fn file_content(&self, file_path: &str) -> Result<Option<String>> {
        if self.unreadable.contains(file_path) {
            return Err(CodeweaveError::ExternalError(format!(
                "unreadable {}",
                file_path
            )));
        }
        Ok(self.files.get(file_path).and_then(|f| f.content.clone()))
    }

    async fn all_file_paths(&self) -> Result<Vec<String>> {
        self.file_list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.files.keys().cloned().collect())
    }
}

#[derive(Default)]
struct RecordingEmbedder {
    queries: Mutex<Vec<String>>,
}

#[async_trait]
impl Embedder for RecordingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.queries.lock().unwrap().push(text.to_string());
        Ok(vec![0.5, 0.25])
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::new();
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    fn dimensions(&self) -> usize {
        2
    }

    fn model_name(&self) -> &str {
        "fake-embedder"
    }
}

struct FixedVector {
    ids: Vec<String>,
    embeddings: Mutex<Vec<Vec<f32>>>,
}

impl FixedVector {
    fn new(ids: &[&str]) -> Self {
        Self {
            ids: ids.iter().map(|s| s.to_string()).collect(),
            embeddings: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl VectorChannel for FixedVector {
    async fn search(
        &self,
        embedding: &[f32],
        limit: usize,
        _filter: &SearchFilter,
    ) -> Result<Vec<VectorHit>> {
        self.embeddings.lock().unwrap().push(embedding.to_vec());
        Ok(self
            .ids
            .iter()
            .take(limit)
            .enumerate()
            .map(|(i, id)| VectorHit {
                chunk_id: id.clone(),
                distance: i as f64 * 0.1,
            })
            .collect())
    }
}

struct FixedLexical {
    ids: Vec<String>,
    fail: bool,
    queries: Mutex<Vec<String>>,
}

impl FixedLexical {
    fn new(ids: &[&str]) -> Self {
        Self {
            ids: ids.iter().map(|s| s.to_string()).collect(),
            fail: false,
            queries: Mutex::new(Vec::new()),
        }
    }

    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(&[])
        }
    }
}

#[async_trait]
impl LexicalChannel for FixedLexical {
    async fn search(
        &self,
        query: &str,
        limit: usize,
        _filter: &SearchFilter,
    ) -> Result<Vec<LexicalHit>> {
        self.queries.lock().unwrap().push(query.to_string());
        if self.fail {
            return Err(CodeweaveError::ExternalError("fts unavailable".to_string()));
        }
        Ok(self
            .ids
            .iter()
            .take(limit)
            .enumerate()
            .map(|(i, id)| LexicalHit {
                chunk_id: id.clone(),
                score: 10.0 - i as f64,
            })
            .collect())
    }
}

enum RerankBehavior {
    /// Score documents in reverse of the order received
    Reverse,
    Fail,
    Hang,
}

struct FakeReranker {
    behavior: RerankBehavior,
    queries: Mutex<Vec<String>>,
}

impl FakeReranker {
    fn new(behavior: RerankBehavior) -> Self {
        Self {
            behavior,
            queries: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Reranker for FakeReranker {
    async fn rerank(&self, query: &str, documents: &[RerankDocument]) -> Result<Vec<RerankResult>> {
        self.queries.lock().unwrap().push(query.to_string());
        match self.behavior {
            RerankBehavior::Reverse => Ok(documents
                .iter()
                .enumerate()
                .map(|(i, d)| RerankResult {
                    id: d.id.clone(),
                    score: i as f64,
                })
                .collect()),
            RerankBehavior::Fail => Err(CodeweaveError::Rerank("model offline".to_string())),
            RerankBehavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(Vec::new())
            }
        }
    }

    fn model_name(&self) -> &str {
        "fake-reranker"
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn repo() -> FakeStore {
    FakeStore::default()
        .with_file(
            "src/app.ts",
            &[
                "import { b } from './util';",
                "export function start() {",
                "  return boot();",
                "}",
                "function boot() {",
                "  return 1;",
            ],
            &["", "start", "start", "start", "boot", "boot"],
        )
        .with_file(
            "src/util.ts",
            &["export const b = 2;", "export const c = 3;"],
            &["", ""],
        )
        .with_file("src/auth.ts", &["export class AuthService {}"], &["AuthService"])
}

/// Config with expansion off so seeds can be inspected alone
fn seeds_only_config() -> SearchConfig {
    SearchConfig {
        neighbor_hops: 0,
        breadcrumb_expand_limit: 0,
        import_files_per_seed: 0,
        chunks_per_import_file: 0,
        pre_rerank_per_file_cap: 0,
        ..SearchConfig::default()
    }
}

fn ids(chunks: &[ScoredChunk]) -> Vec<String> {
    chunks.iter().map(|c| c.record.chunk_id.clone()).collect()
}

fn terms(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_channel_routing() {
    let store = Arc::new(repo());
    let embedder = Arc::new(RecordingEmbedder::default());
    let vector = Arc::new(FixedVector::new(&["src/auth.ts#0"]));
    let lexical = Arc::new(FixedLexical::new(&["src/app.ts#1"]));
    let reranker = Arc::new(FakeReranker::new(RerankBehavior::Reverse));

    let retriever = Retriever::new(
        embedder.clone(),
        vector.clone(),
        lexical.clone(),
        store,
        seeds_only_config(),
    )
    .unwrap()
    .with_reranker(reranker.clone());

    let request = SearchRequest::new(QueryChannels::build(
        "where is login handled",
        &terms(&["AuthService", " ", "AuthService"]),
    ));
    retriever.search(&request).await.unwrap();

    assert_eq!(
        *embedder.queries.lock().unwrap(),
        vec!["where is login handled"]
    );
    assert_eq!(*vector.embeddings.lock().unwrap(), vec![vec![0.5f32, 0.25]]);
    assert_eq!(
        *lexical.queries.lock().unwrap(),
        vec!["AuthService where is login handled"]
    );
    assert_eq!(
        *reranker.queries.lock().unwrap(),
        vec!["where is login handled AuthService"]
    );
}

#[tokio::test]
async fn test_lexical_failure_names_stage() {
    let retriever = Retriever::new(
        Arc::new(RecordingEmbedder::default()),
        Arc::new(FixedVector::new(&["src/auth.ts#0"])),
        Arc::new(FixedLexical::failing()),
        Arc::new(repo()),
        seeds_only_config(),
    )
    .unwrap();

    let err = retriever
        .search(&SearchRequest::new(QueryChannels::single("auth")))
        .await
        .unwrap_err();
    match err {
        CodeweaveError::Channel { stage, message } => {
            assert_eq!(stage, "lexical");
            assert!(message.contains("fts unavailable"));
        }
        other => panic!("expected channel error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_fused_order_without_reranker() {
    let retriever = Retriever::new(
        Arc::new(RecordingEmbedder::default()),
        Arc::new(FixedVector::new(&["src/auth.ts#0", "src/util.ts#0"])),
        Arc::new(FixedLexical::new(&["src/util.ts#0", "src/app.ts#1"])),
        Arc::new(repo()),
        seeds_only_config(),
    )
    .unwrap();

    let pack = retriever
        .search(&SearchRequest::new(QueryChannels::single("b")))
        .await
        .unwrap();
    assert_eq!(
        ids(&pack.seeds),
        vec!["src/util.ts#0", "src/auth.ts#0", "src/app.ts#1"]
    );
    assert!(pack.expanded.is_empty());
    assert_eq!(pack.seeds[1].source, ChunkSource::Vector);
    assert_eq!(pack.seeds[2].source, ChunkSource::Lexical);
}

#[tokio::test]
async fn test_rerank_reorders_seeds() {
    let retriever = Retriever::new(
        Arc::new(RecordingEmbedder::default()),
        Arc::new(FixedVector::new(&["src/auth.ts#0", "src/util.ts#0"])),
        Arc::new(FixedLexical::new(&[])),
        Arc::new(repo()),
        seeds_only_config(),
    )
    .unwrap()
    .with_reranker(Arc::new(FakeReranker::new(RerankBehavior::Reverse)));

    let pack = retriever
        .search(&SearchRequest::new(QueryChannels::single("b")))
        .await
        .unwrap();
    assert_eq!(ids(&pack.seeds), vec!["src/util.ts#0", "src/auth.ts#0"]);
    assert!(pack.seeds.iter().all(|s| s.source == ChunkSource::Rerank));
}

#[tokio::test]
async fn test_rerank_failure_falls_back_to_fused_order() {
    let config = SearchConfig {
        rerank_top_n: 1,
        ..seeds_only_config()
    };
    let retriever = Retriever::new(
        Arc::new(RecordingEmbedder::default()),
        Arc::new(FixedVector::new(&["src/auth.ts#0", "src/util.ts#0"])),
        Arc::new(FixedLexical::new(&[])),
        Arc::new(repo()),
        config,
    )
    .unwrap()
    .with_reranker(Arc::new(FakeReranker::new(RerankBehavior::Fail)));

    let pack = retriever
        .search(&SearchRequest::new(QueryChannels::single("auth")))
        .await
        .unwrap();
    assert_eq!(ids(&pack.seeds), vec!["src/auth.ts#0"]);
    assert_eq!(pack.seeds[0].source, ChunkSource::Vector);
}

#[tokio::test(start_paused = true)]
async fn test_rerank_timeout_falls_back_to_fused_order() {
    let config = SearchConfig {
        rerank_timeout_ms: 20,
        ..seeds_only_config()
    };
    let retriever = Retriever::new(
        Arc::new(RecordingEmbedder::default()),
        Arc::new(FixedVector::new(&["src/auth.ts#0", "src/util.ts#0"])),
        Arc::new(FixedLexical::new(&[])),
        Arc::new(repo()),
        config,
    )
    .unwrap()
    .with_reranker(Arc::new(FakeReranker::new(RerankBehavior::Hang)));

    let pack = retriever
        .search(&SearchRequest::new(QueryChannels::single("auth")))
        .await
        .unwrap();
    assert_eq!(ids(&pack.seeds), vec!["src/auth.ts#0", "src/util.ts#0"]);
    assert!(pack.seeds.iter().all(|s| s.source != ChunkSource::Rerank));
}

#[tokio::test]
async fn test_per_file_cap_applies_before_rerank() {
    let config = SearchConfig {
        pre_rerank_per_file_cap: 1,
        ..seeds_only_config()
    };
    let retriever = Retriever::new(
        Arc::new(RecordingEmbedder::default()),
        Arc::new(FixedVector::new(&["src/app.ts#1", "src/app.ts#2", "src/util.ts#1"])),
        Arc::new(FixedLexical::new(&[])),
        Arc::new(repo()),
        config,
    )
    .unwrap();

    let pack = retriever
        .search(&SearchRequest::new(QueryChannels::single("start")))
        .await
        .unwrap();
    assert_eq!(ids(&pack.seeds), vec!["src/app.ts#1", "src/util.ts#1"]);
}

#[tokio::test]
async fn test_search_packs_seeds_with_expansion() {
    let config = SearchConfig {
        neighbor_hops: 1,
        breadcrumb_expand_limit: 0,
        import_files_per_seed: 0,
        chunks_per_import_file: 0,
        ..SearchConfig::default()
    };
    let retriever = Retriever::new(
        Arc::new(RecordingEmbedder::default()),
        Arc::new(FixedVector::new(&["src/app.ts#2"])),
        Arc::new(FixedLexical::new(&[])),
        Arc::new(repo()),
        config,
    )
    .unwrap();

    let pack = retriever
        .search(&SearchRequest::new(QueryChannels::single("boot")))
        .await
        .unwrap();
    assert_eq!(ids(&pack.expanded), vec!["src/app.ts#1", "src/app.ts#3"]);
    assert_eq!(pack.files.len(), 1);
    assert_eq!(pack.segment_count(), 1);
    let segment = &pack.files[0].segments[0];
    assert_eq!(segment.start_line, 2);
    assert_eq!(
        segment.text,
        "export function start() {\n  return boot();\n}\n"
    );
}

#[tokio::test]
async fn test_unreadable_import_target_is_dropped_from_pack() {
    let config = SearchConfig {
        neighbor_hops: 0,
        breadcrumb_expand_limit: 0,
        import_files_per_seed: 1,
        chunks_per_import_file: 1,
        ..SearchConfig::default()
    };
    let retriever = Retriever::new(
        Arc::new(RecordingEmbedder::default()),
        Arc::new(FixedVector::new(&["src/app.ts#0"])),
        Arc::new(FixedLexical::new(&[])),
        Arc::new(repo().with_unreadable_content("src/util.ts")),
        config,
    )
    .unwrap();

    let pack = retriever
        .search(&SearchRequest::new(QueryChannels::single("imports")))
        .await
        .unwrap();
    assert_eq!(ids(&pack.seeds), vec!["src/app.ts#0"]);
    assert_eq!(ids(&pack.expanded), vec!["src/util.ts#0"]);
    assert_eq!(pack.files.len(), 1);
    assert_eq!(pack.files[0].file_path, "src/app.ts");
    assert_eq!(
        pack.files[0].segments[0].text,
        "import { b } from './util';\n"
    );
}

// ---------------------------------------------------------------------------
// Graph expansion
// ---------------------------------------------------------------------------

fn limits(
    hops: usize,
    breadcrumbs: usize,
    import_files: usize,
    import_chunks: usize,
) -> ExpansionLimits {
    ExpansionLimits {
        neighbor_hops: hops,
        breadcrumb_expand_limit: breadcrumbs,
        import_files_per_seed: import_files,
        chunks_per_import_file: import_chunks,
    }
}

#[tokio::test]
async fn test_expansion_disabled_touches_nothing() {
    let store = Arc::new(repo());
    let seed = store.seed("src/app.ts", 2, 1.0);
    let expander = GraphExpander::new(store.clone(), limits(0, 0, 0, 0));

    let expanded = expander.expand(&[seed], &HashSet::new()).await;
    assert!(expanded.is_empty());
    assert_eq!(store.file_chunk_calls.load(Ordering::SeqCst), 0);
    assert_eq!(store.file_list_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_zero_import_limit_skips_import_lookups() {
    let store = Arc::new(repo());
    let seed = store.seed("src/app.ts", 0, 1.0);
    let expander = GraphExpander::new(store.clone(), limits(0, 0, 3, 0));

    assert!(expander.expand(&[seed], &HashSet::new()).await.is_empty());
    assert_eq!(store.file_chunk_calls.load(Ordering::SeqCst), 0);
    assert_eq!(store.file_list_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_expansion_provenance_and_scores() {
    let store = Arc::new(repo());
    let seed = store.seed("src/app.ts", 2, 1.0);
    let expander = GraphExpander::new(store.clone(), limits(1, 2, 1, 1));

    let expanded = expander.expand(&[seed], &HashSet::new()).await;
    let summary: Vec<(String, ChunkSource)> = expanded
        .iter()
        .map(|c| (c.key().to_string(), c.source))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("src/app.ts#1".to_string(), ChunkSource::Neighbor),
            ("src/app.ts#3".to_string(), ChunkSource::Neighbor),
            ("src/util.ts#0".to_string(), ChunkSource::Import),
        ]
    );
    assert!((expanded[0].score - 0.8).abs() < 1e-9);
    assert!((expanded[2].score - 0.5).abs() < 1e-9);
}

#[tokio::test]
async fn test_breadcrumb_siblings_nearest_first() {
    let store = Arc::new(
        FakeStore::default().with_file(
            "src/big.ts",
            &["a", "b", "c", "d", "e", "f"],
            &["X", "X", "X", "Y", "X", "X"],
        ),
    );
    let seed = store.seed("src/big.ts", 2, 2.0);
    let expander = GraphExpander::new(store.clone(), limits(0, 2, 0, 0));

    let expanded = expander.expand(&[seed], &HashSet::new()).await;
    assert_eq!(ids(&expanded), vec!["src/big.ts#1", "src/big.ts#0"]);
    assert!(expanded.iter().all(|c| c.source == ChunkSource::Breadcrumb));
    assert!((expanded[0].score - 1.4).abs() < 1e-9);
}

#[tokio::test]
async fn test_expansion_skips_already_included_and_seeds() {
    let store = Arc::new(repo());
    let seeds = vec![store.seed("src/app.ts", 2, 1.0), store.seed("src/app.ts", 3, 0.9)];
    let included: HashSet<ChunkKey> = [ChunkKey::new("src/app.ts", 1)].into_iter().collect();
    let expander = GraphExpander::new(store.clone(), limits(1, 0, 0, 0));

    let expanded = expander.expand(&seeds, &included).await;
    assert_eq!(ids(&expanded), vec!["src/app.ts#4"]);
}

#[tokio::test]
async fn test_missing_content_skips_only_imports() {
    let store = Arc::new(repo().without_content("src/app.ts"));
    let seed = store.seed("src/app.ts", 0, 1.0);
    let expander = GraphExpander::new(store.clone(), limits(1, 0, 2, 2));

    let expanded = expander.expand(&[seed], &HashSet::new()).await;
    assert_eq!(ids(&expanded), vec!["src/app.ts#1"]);
}
