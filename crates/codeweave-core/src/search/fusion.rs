//! Weighted reciprocal rank fusion

use super::ChunkSource;
use crate::error::{CodeweaveError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Channel weights and RRF smoothing for one fusion run.
///
/// `w_vec + w_lex == 1` is enforced by the constructors and by [`FusionConfig::validate`];
/// deserialized values are only trusted after validation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    pub w_vec: f64,
    pub w_lex: f64,
    pub rrf_k0: f64,
    pub fused_top_m: usize,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            w_vec: 0.6,
            w_lex: 0.4,
            rrf_k0: 20.0,
            fused_top_m: 60,
        }
    }
}

const WEIGHT_EPSILON: f64 = 1e-6;

impl FusionConfig {
    /// Build from the vector weight; the lexical weight is derived as `1 - w_vec`
    /// rounded to six decimals.
    pub fn new(w_vec: f64, rrf_k0: f64, fused_top_m: usize) -> Result<Self> {
        let config = Self {
            w_vec,
            w_lex: round6(1.0 - w_vec),
            rrf_k0,
            fused_top_m,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.w_vec.is_finite() || !self.w_lex.is_finite() {
            return Err(CodeweaveError::Config(
                "fusion weights must be finite".to_string(),
            ));
        }
        if self.w_vec < 0.0 || self.w_lex < 0.0 {
            return Err(CodeweaveError::Config(
                "fusion weights must be non-negative".to_string(),
            ));
        }
        if (self.w_vec + self.w_lex - 1.0).abs() > WEIGHT_EPSILON {
            return Err(CodeweaveError::Config(format!(
                "fusion weights must sum to 1 (w_vec={}, w_lex={})",
                self.w_vec, self.w_lex
            )));
        }
        if !self.rrf_k0.is_finite() || self.rrf_k0 <= 0.0 {
            return Err(CodeweaveError::Config(format!(
                "rrf_k0 must be positive, got {}",
                self.rrf_k0
            )));
        }
        if self.fused_top_m == 0 {
            return Err(CodeweaveError::Config(
                "fused_top_m must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

pub(crate) fn round6(value: f64) -> f64 {
    (value * 1e6).round() / 1e6
}

/// A fused id with its accumulated score and per-channel ranks
#[derive(Debug, Clone, PartialEq)]
pub struct FusedCandidate {
    pub id: String,
    pub score: f64,
    pub vector_rank: Option<usize>,
    pub lexical_rank: Option<usize>,
    vector_contribution: f64,
    lexical_contribution: f64,
}

impl FusedCandidate {
    fn empty(id: &str) -> Self {
        Self {
            id: id.to_string(),
            score: 0.0,
            vector_rank: None,
            lexical_rank: None,
            vector_contribution: 0.0,
            lexical_contribution: 0.0,
        }
    }

    /// Channel that contributed the larger share of the score
    pub fn source(&self) -> ChunkSource {
        if self.lexical_contribution > self.vector_contribution {
            ChunkSource::Lexical
        } else {
            ChunkSource::Vector
        }
    }
}

/// Fuse two ranked id lists and return the fused ids
pub fn fuse<S: AsRef<str>>(
    vector_ranked: &[S],
    lexical_ranked: &[S],
    config: &FusionConfig,
) -> Vec<String> {
    fuse_scored(vector_ranked, lexical_ranked, config)
        .into_iter()
        .map(|c| c.id)
        .collect()
}

/// Fuse two ranked id lists, keeping scores and channel ranks.
///
/// Rank `r` is zero-based; each occurrence adds `w / (rrf_k0 + r)`. Ties keep
/// first-insertion order (vector list first, then lexical).
pub fn fuse_scored<S: AsRef<str>>(
    vector_ranked: &[S],
    lexical_ranked: &[S],
    config: &FusionConfig,
) -> Vec<FusedCandidate> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut fused: Vec<FusedCandidate> = Vec::new();

    let channels = [
        (vector_ranked, config.w_vec, ChunkSource::Vector),
        (lexical_ranked, config.w_lex, ChunkSource::Lexical),
    ];
    for (ranked, weight, channel) in channels {
        for (rank, id) in ranked.iter().enumerate() {
            let id = id.as_ref();
            let contribution = weight / (config.rrf_k0 + rank as f64);
            let idx = *positions.entry(id.to_string()).or_insert_with(|| {
                fused.push(FusedCandidate::empty(id));
                fused.len() - 1
            });
            let entry = &mut fused[idx];
            entry.score += contribution;
            if channel == ChunkSource::Vector {
                entry.vector_contribution += contribution;
                entry.vector_rank.get_or_insert(rank);
            } else {
                entry.lexical_contribution += contribution;
                entry.lexical_rank.get_or_insert(rank);
            }
        }
    }

    // sort_by is stable, so equal scores keep insertion order
    fused.sort_by(|a, b| b.score.total_cmp(&a.score));
    fused.truncate(config.fused_top_m);
    fused
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn config(w_vec: f64, k0: f64, top_m: usize) -> FusionConfig {
        FusionConfig::new(w_vec, k0, top_m).unwrap()
    }

    #[test]
    fn test_fuse_accumulates_both_channels() {
        let fused = fuse(&["a", "b", "c"], &["c", "a"], &config(0.5, 10.0, 10));
        // a: 0.5/10 + 0.5/11, c: 0.5/12 + 0.5/10, b: 0.5/11
        assert_eq!(fused, vec!["a", "c", "b"]);
    }

    #[test]
    fn test_fuse_truncates_to_top_m() {
        let fused = fuse(&["a", "b", "c", "d"], &[], &config(0.6, 20.0, 2));
        assert_eq!(fused, vec!["a", "b"]);
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        // Equal weights and ranks give equal scores; vector list inserts first
        let fused = fuse(&["v"], &["l"], &config(0.5, 20.0, 10));
        assert_eq!(fused, vec!["v", "l"]);
    }

    #[test]
    fn test_source_follows_larger_contribution() {
        let fused = fuse_scored(&["x", "y"], &["y"], &config(0.3, 10.0, 10));
        let y = fused.iter().find(|c| c.id == "y").unwrap();
        assert_eq!(y.source(), ChunkSource::Lexical);
        assert_eq!(y.vector_rank, Some(1));
        assert_eq!(y.lexical_rank, Some(0));
        let x = fused.iter().find(|c| c.id == "x").unwrap();
        assert_eq!(x.source(), ChunkSource::Vector);
    }

    #[test]
    fn test_new_derives_lexical_weight() {
        let cfg = config(0.7, 20.0, 60);
        assert_eq!(cfg.w_lex, 0.3);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(FusionConfig::new(0.5, 0.0, 10).is_err());
        assert!(FusionConfig::new(0.5, 10.0, 0).is_err());
        assert!(FusionConfig::new(f64::NAN, 10.0, 10).is_err());
        let unbalanced = FusionConfig {
            w_vec: 0.6,
            w_lex: 0.6,
            ..FusionConfig::default()
        };
        assert!(unbalanced.validate().is_err());
    }

    fn id_list() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec("[a-h]", 0..12)
    }

    proptest! {
        #[test]
        fn prop_fusion_is_deterministic(v in id_list(), l in id_list(), w in 0.05f64..0.95, k in 1.0f64..80.0) {
            let cfg = FusionConfig::new(w, k, 50).unwrap();
            prop_assert_eq!(fuse(&v, &l, &cfg), fuse(&v, &l, &cfg));
        }

        #[test]
        fn prop_output_is_subset_of_inputs(v in id_list(), l in id_list(), top in 1usize..20) {
            let cfg = FusionConfig::new(0.6, 20.0, top).unwrap();
            let fused = fuse(&v, &l, &cfg);
            prop_assert!(fused.len() <= top);
            for id in &fused {
                prop_assert!(v.contains(id) || l.contains(id));
            }
            let mut unique = fused.clone();
            unique.sort();
            unique.dedup();
            prop_assert_eq!(unique.len(), fused.len());
        }

        #[test]
        fn prop_shared_ids_score_at_least_single_channel(v in id_list(), l in id_list(), w in 0.05f64..0.95) {
            let cfg = FusionConfig::new(w, 20.0, 100).unwrap();
            for c in fuse_scored(&v, &l, &cfg) {
                if let (Some(rv), Some(rl)) = (c.vector_rank, c.lexical_rank) {
                    prop_assert!(c.score >= cfg.w_vec / (cfg.rrf_k0 + rv as f64));
                    prop_assert!(c.score >= cfg.w_lex / (cfg.rrf_k0 + rl as f64));
                }
            }
        }
    }
}
