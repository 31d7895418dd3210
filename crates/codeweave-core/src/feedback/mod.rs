//! Implicit feedback inference
//!
//! Consecutive retrieval events are compared to derive weak relevance signals:
//! a follow-up query naming a file from the previous results pins that file,
//! and a near-identical rewrite of a query that found nothing is a negative
//! signal. Persistence lives in [`crate::db`].

use crate::error::{CodeweaveError, Result};
use crate::search::{QueryChannels, ScoredChunk};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::Path;

/// Minimum token overlap for a zero-hit query to count as rewritten
pub const REWRITE_SIMILARITY_THRESHOLD: f64 = 0.4;
pub const PATH_PIN_WEIGHT: f64 = 1.0;
pub const NO_HIT_REWRITE_WEIGHT: f64 = -0.6;

lazy_static! {
    static ref TOKEN: Regex = Regex::new(r"[a-z0-9_]+").unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    PathPin,
    /// Stored and summarized, never inferred
    AnchorReuse,
    NoHitRewrite,
}

impl SignalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PathPin => "path_pin",
            Self::AnchorReuse => "anchor_reuse",
            Self::NoHitRewrite => "no_hit_rewrite",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "path_pin" => Some(Self::PathPin),
            "anchor_reuse" => Some(Self::AnchorReuse),
            "no_hit_rewrite" => Some(Self::NoHitRewrite),
            _ => None,
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One seed as recorded with an event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackSeed {
    pub chunk_id: String,
    pub file_path: String,
    pub chunk_index: usize,
    pub score: f64,
    pub source: String,
}

impl From<&ScoredChunk> for FeedbackSeed {
    fn from(chunk: &ScoredChunk) -> Self {
        Self {
            chunk_id: chunk.record.chunk_id.clone(),
            file_path: chunk.file_path.clone(),
            chunk_index: chunk.chunk_index,
            score: chunk.score,
            source: chunk.source.to_string(),
        }
    }
}

/// A retrieval event to be recorded
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrievalEventInput {
    pub query: String,
    #[serde(default)]
    pub technical_terms: Vec<String>,
    #[serde(default)]
    pub seeds: Vec<FeedbackSeed>,
    #[serde(default)]
    pub created_at_ms: Option<i64>,
    /// Events are only compared within the same session; `None` is one shared session
    #[serde(default)]
    pub session: Option<String>,
}

impl RetrievalEventInput {
    pub fn from_search(channels: &QueryChannels, seeds: &[ScoredChunk]) -> Self {
        Self {
            query: channels.information_request.clone(),
            technical_terms: channels.technical_terms.clone(),
            seeds: seeds.iter().map(FeedbackSeed::from).collect(),
            created_at_ms: None,
            session: None,
        }
    }

    /// Trimmed copy; fails when the query is blank
    pub fn normalized(&self) -> Result<Self> {
        let query = self.query.trim();
        if query.is_empty() {
            return Err(CodeweaveError::InvalidInput(
                "feedback query must not be empty".to_string(),
            ));
        }
        Ok(Self {
            query: query.to_string(),
            technical_terms: self
                .technical_terms
                .iter()
                .map(|t| t.trim())
                .filter(|t| !t.is_empty())
                .map(String::from)
                .collect(),
            seeds: self.seeds.clone(),
            created_at_ms: self.created_at_ms,
            session: self.session.clone(),
        })
    }
}

/// A recorded event as needed for comparison
#[derive(Debug, Clone, PartialEq)]
pub struct EventSnapshot {
    pub id: i64,
    pub query: String,
    pub technical_terms: Vec<String>,
    pub seed_count: usize,
    pub chunks: Vec<FeedbackSeed>,
}

impl EventSnapshot {
    /// Lower-cased, whitespace-collapsed query plus terms
    pub fn search_text(&self) -> String {
        let mut parts = vec![self.query.as_str()];
        parts.extend(self.technical_terms.iter().map(String::as_str));
        normalize_text(&parts.join(" "))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferredSignal {
    pub kind: SignalKind,
    pub weight: f64,
    pub target_chunk_id: Option<String>,
    pub target_file_path: Option<String>,
    pub evidence: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedEvent {
    pub event_id: i64,
    pub inferred_signals: Vec<InferredSignal>,
}

/// Window and size of a feedback summary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryOptions {
    pub days: u32,
    pub top: usize,
    pub now_ms: i64,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            days: 7,
            top: 10,
            now_ms: chrono::Utc::now().timestamp_millis(),
        }
    }
}

impl SummaryOptions {
    /// Earliest `created_at` included in the window
    pub fn cutoff_ms(&self) -> i64 {
        self.now_ms - i64::from(self.days) * 24 * 60 * 60 * 1000
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileFeedback {
    pub file_path: String,
    pub hit_count: u64,
    pub total_weight: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackSummary {
    pub total_events: u64,
    pub zero_hit_rate: f64,
    pub implicit_success_rate: f64,
    pub positive_signals: u64,
    pub negative_signals: u64,
    pub signal_breakdown: BTreeMap<String, u64>,
    pub top_files: Vec<FileFeedback>,
}

pub fn normalize_text(text: &str) -> String {
    WHITESPACE
        .replace_all(&text.to_lowercase(), " ")
        .trim()
        .to_string()
}

pub fn tokenize(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    TOKEN
        .find_iter(&lower)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Jaccard similarity of two token sets; two empty sets score 0
pub fn jaccard_similarity(left: &[String], right: &[String]) -> f64 {
    let left: HashSet<&str> = left.iter().map(String::as_str).collect();
    let right: HashSet<&str> = right.iter().map(String::as_str).collect();
    if left.is_empty() && right.is_empty() {
        return 0.0;
    }
    let intersection = left.intersection(&right).count();
    let union = left.len() + right.len() - intersection;
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

/// Lower-cased file name without its last extension
pub fn file_stem(file_path: &str) -> String {
    Path::new(file_path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_lowercase()
}

fn round4(value: f64) -> f64 {
    (value * 1e4).round() / 1e4
}

/// Signals implied by `current` following `previous`
pub fn infer_signals(previous: &EventSnapshot, current: &EventSnapshot) -> Vec<InferredSignal> {
    let mut signals = Vec::new();

    let current_text = current.search_text();
    let current_tokens = tokenize(&current_text);
    let token_set: HashSet<&str> = current_tokens.iter().map(String::as_str).collect();

    let mut pinned: HashSet<(&str, usize)> = HashSet::new();
    for chunk in &previous.chunks {
        let stem = file_stem(&chunk.file_path);
        if stem.is_empty() {
            continue;
        }
        let compact = stem.replace(['_', '-'], "");
        let token_hit = token_set.contains(stem.as_str()) || token_set.contains(compact.as_str());
        let text_hit = current_text.contains(&stem) || current_text.contains(&compact);
        if !token_hit && !text_hit {
            continue;
        }
        if !pinned.insert((chunk.file_path.as_str(), chunk.chunk_index)) {
            continue;
        }
        signals.push(InferredSignal {
            kind: SignalKind::PathPin,
            weight: PATH_PIN_WEIGHT,
            target_chunk_id: Some(chunk.chunk_id.clone()),
            target_file_path: Some(chunk.file_path.clone()),
            evidence: json!({
                "stem": stem,
                "matched_by": if token_hit { "token" } else { "text" },
            }),
        });
    }

    if previous.seed_count == 0 {
        let similarity = jaccard_similarity(&tokenize(&previous.search_text()), &current_tokens);
        if similarity >= REWRITE_SIMILARITY_THRESHOLD {
            signals.push(InferredSignal {
                kind: SignalKind::NoHitRewrite,
                weight: NO_HIT_REWRITE_WEIGHT,
                target_chunk_id: None,
                target_file_path: None,
                evidence: json!({ "similarity": round4(similarity) }),
            });
        }
    }

    signals
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed(path: &str, index: usize) -> FeedbackSeed {
        FeedbackSeed {
            chunk_id: format!("{}#h#{}", path, index),
            file_path: path.to_string(),
            chunk_index: index,
            score: 0.9,
            source: "vector".to_string(),
        }
    }

    fn snapshot(id: i64, query: &str, terms: &[&str], chunks: Vec<FeedbackSeed>) -> EventSnapshot {
        EventSnapshot {
            id,
            query: query.to_string(),
            technical_terms: terms.iter().map(|t| t.to_string()).collect(),
            seed_count: chunks.len(),
            chunks,
        }
    }

    #[test]
    fn test_tokenize_and_jaccard() {
        let a = tokenize("Payment retry-handler");
        assert_eq!(a, vec!["payment", "retry", "handler"]);
        let b = tokenize("payment retry");
        assert!((jaccard_similarity(&a, &b) - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(jaccard_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("src/auth/AuthService.ts"), "authservice");
        assert_eq!(file_stem("Makefile"), "makefile");
        assert_eq!(file_stem("a/b.test.ts"), "b.test");
    }

    #[test]
    fn test_path_pin_on_follow_up() {
        let prev = snapshot(
            1,
            "where is auth service",
            &["AuthService"],
            vec![seed("src/auth/AuthService.ts", 0), seed("src/auth/AuthService.ts", 0)],
        );
        let current = snapshot(
            2,
            "open AuthService login function",
            &["AuthService", "login"],
            vec![seed("src/auth/AuthService.ts", 1)],
        );
        let signals = infer_signals(&prev, &current);
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].kind, SignalKind::PathPin);
        assert_eq!(signals[0].weight, 1.0);
        assert_eq!(signals[0].evidence["matched_by"], "token");
    }

    #[test]
    fn test_compact_stem_matches() {
        let prev = snapshot(1, "q", &[], vec![seed("src/user_store.py", 0)]);
        let current = snapshot(2, "show userstore internals", &[], vec![]);
        let signals = infer_signals(&prev, &current);
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].target_file_path.as_deref(), Some("src/user_store.py"));
    }

    #[test]
    fn test_no_hit_rewrite() {
        let prev = snapshot(3, "payment retry handler", &["paymentRetry"], vec![]);
        let current = snapshot(
            4,
            "payment retry handler implementation",
            &["paymentRetry", "handler"],
            vec![seed("src/pay/retry.ts", 0)],
        );
        let signals = infer_signals(&prev, &current);
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].kind, SignalKind::NoHitRewrite);
        assert_eq!(signals[0].weight, -0.6);
        assert_eq!(signals[0].evidence["similarity"], 0.8);
    }

    #[test]
    fn test_unrelated_follow_up_emits_nothing() {
        let prev = snapshot(1, "database pool", &[], vec![]);
        let current = snapshot(2, "render markdown table", &[], vec![]);
        assert!(infer_signals(&prev, &current).is_empty());
    }

    #[test]
    fn test_normalized_rejects_blank_query() {
        let input = RetrievalEventInput {
            query: "   ".to_string(),
            ..Default::default()
        };
        assert!(input.normalized().is_err());
    }
}
