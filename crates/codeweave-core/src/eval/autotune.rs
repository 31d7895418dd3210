//! Offline grid search over fusion parameters

use super::metrics::{evaluate_benchmark_cases, normalize_k_values, BenchmarkSummary};
use super::{AutoTuneCase, BenchmarkCase};
use crate::error::{CodeweaveError, Result};
use crate::search::{fuse, FusionConfig};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_W_VEC_GRID: [f64; 3] = [0.5, 0.6, 0.7];
pub const DEFAULT_RRF_K0_GRID: [f64; 3] = [10.0, 20.0, 40.0];
pub const DEFAULT_FUSED_TOP_M_GRID: [usize; 2] = [40, 60];
pub const DEFAULT_LEADERBOARD_SIZE: usize = 5;

/// Candidate values per fusion parameter; an empty dimension takes its default
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoTuneGrid {
    #[serde(alias = "wVec")]
    pub w_vec: Vec<f64>,
    #[serde(alias = "rrfK0")]
    pub rrf_k0: Vec<f64>,
    #[serde(alias = "fusedTopM")]
    pub fused_top_m: Vec<usize>,
}

/// Metric the grid search maximises; serialises as its display form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub enum TuneTarget {
    Mrr,
    RecallAt(usize),
    NdcgAt(usize),
}

impl TuneTarget {
    /// Parse `mrr`, `recall@k`, `ndcg@k`, or bare `recall`/`ndcg` (meaning the largest k)
    pub fn parse(raw: &str, k_values: &[usize]) -> Result<Self> {
        let target = raw.trim().to_lowercase();
        let max_k = k_values.iter().copied().max().unwrap_or(0);
        let parsed = match target.as_str() {
            "mrr" => Some(Self::Mrr),
            "recall" => Some(Self::RecallAt(max_k)),
            "ndcg" => Some(Self::NdcgAt(max_k)),
            other => match other.split_once('@') {
                Some(("recall", k)) => k.parse().ok().map(Self::RecallAt),
                Some(("ndcg", k)) => k.parse().ok().map(Self::NdcgAt),
                _ => None,
            },
        };

        let parsed = parsed.ok_or_else(|| {
            CodeweaveError::tune_input("target", format!("unsupported target: {}", raw))
        })?;
        match parsed {
            Self::RecallAt(k) | Self::NdcgAt(k) if !k_values.contains(&k) => {
                Err(CodeweaveError::tune_input(
                    "target",
                    format!("k={} is not among the evaluated k values {:?}", k, k_values),
                ))
            }
            _ => Ok(parsed),
        }
    }

    pub fn score(&self, summary: &BenchmarkSummary) -> f64 {
        match self {
            Self::Mrr => summary.mrr,
            Self::RecallAt(k) => summary.recall_at_k.get(k).copied().unwrap_or(0.0),
            Self::NdcgAt(k) => summary.ndcg_at_k.get(k).copied().unwrap_or(0.0),
        }
    }
}

impl From<TuneTarget> for String {
    fn from(target: TuneTarget) -> Self {
        target.to_string()
    }
}

impl fmt::Display for TuneTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mrr => f.write_str("mrr"),
            Self::RecallAt(k) => write!(f, "recall@{}", k),
            Self::NdcgAt(k) => write!(f, "ndcg@{}", k),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AutoTuneOptions {
    pub target: String,
    pub k_values: Vec<usize>,
    pub top_n: usize,
    pub grid: AutoTuneGrid,
}

impl Default for AutoTuneOptions {
    fn default() -> Self {
        Self {
            target: "mrr".to_string(),
            k_values: vec![1, 3, 5],
            top_n: DEFAULT_LEADERBOARD_SIZE,
            grid: AutoTuneGrid::default(),
        }
    }
}

/// One scored grid point
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TuneCandidate {
    pub config: FusionConfig,
    pub summary: BenchmarkSummary,
    pub target_score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AutoTuneResult {
    pub target: TuneTarget,
    pub k_values: Vec<usize>,
    pub total_candidates: usize,
    pub best: TuneCandidate,
    pub leaderboard: Vec<TuneCandidate>,
}

fn sorted_unique_f64(values: &[f64]) -> Vec<f64> {
    let mut values = values.to_vec();
    values.sort_by(|a, b| a.total_cmp(b));
    values.dedup();
    values
}

fn sorted_unique_usize(values: &[usize]) -> Vec<usize> {
    let mut values = values.to_vec();
    values.sort_unstable();
    values.dedup();
    values
}

impl AutoTuneGrid {
    /// Fill empty dimensions with defaults, validate, de-duplicate and sort
    pub fn normalized(&self) -> Result<Self> {
        let w_vec = if self.w_vec.is_empty() {
            DEFAULT_W_VEC_GRID.to_vec()
        } else {
            self.w_vec.clone()
        };
        let rrf_k0 = if self.rrf_k0.is_empty() {
            DEFAULT_RRF_K0_GRID.to_vec()
        } else {
            self.rrf_k0.clone()
        };
        let fused_top_m = if self.fused_top_m.is_empty() {
            DEFAULT_FUSED_TOP_M_GRID.to_vec()
        } else {
            self.fused_top_m.clone()
        };

        if let Some(bad) = w_vec.iter().find(|w| !w.is_finite() || **w <= 0.0 || **w >= 1.0) {
            return Err(CodeweaveError::tune_input(
                "grid.w_vec",
                format!("{} is outside (0, 1)", bad),
            ));
        }
        if let Some(bad) = rrf_k0.iter().find(|k| !k.is_finite() || **k <= 0.0) {
            return Err(CodeweaveError::tune_input(
                "grid.rrf_k0",
                format!("{} must be a positive number", bad),
            ));
        }
        if fused_top_m.contains(&0) {
            return Err(CodeweaveError::tune_input(
                "grid.fused_top_m",
                "0 must be a positive integer",
            ));
        }

        Ok(Self {
            w_vec: sorted_unique_f64(&w_vec),
            rrf_k0: sorted_unique_f64(&rrf_k0),
            fused_top_m: sorted_unique_usize(&fused_top_m),
        })
    }

    /// Cartesian product in `w_vec`, `rrf_k0`, `fused_top_m` order
    pub fn configs(&self) -> Result<Vec<FusionConfig>> {
        let mut configs =
            Vec::with_capacity(self.w_vec.len() * self.rrf_k0.len() * self.fused_top_m.len());
        for &w_vec in &self.w_vec {
            for &rrf_k0 in &self.rrf_k0 {
                for &top_m in &self.fused_top_m {
                    configs.push(FusionConfig::new(w_vec, rrf_k0, top_m)?);
                }
            }
        }
        Ok(configs)
    }
}

/// Re-fuse every case's stored rankings under `config`
fn replay(cases: &[AutoTuneCase], config: &FusionConfig) -> Vec<BenchmarkCase> {
    cases
        .iter()
        .map(|case| BenchmarkCase {
            id: case.id.clone(),
            query: case.query.clone(),
            retrieved: fuse(&case.vector_retrieved, &case.lexical_retrieved, config),
            relevant: case.relevant.clone(),
        })
        .collect()
}

/// Score every grid point against the dataset and rank them.
///
/// All input is validated before any scoring. Candidates sort by target score,
/// then MRR, then `w_vec`, all descending.
pub fn run_auto_tune(cases: &[AutoTuneCase], options: &AutoTuneOptions) -> Result<AutoTuneResult> {
    if cases.is_empty() {
        return Err(CodeweaveError::tune_input("dataset", "dataset is empty"));
    }
    let k_values = normalize_k_values(&options.k_values);
    if k_values.is_empty() {
        return Err(CodeweaveError::tune_input(
            "k_values",
            "at least one positive k is required",
        ));
    }
    let grid = options.grid.normalized()?;
    let target = TuneTarget::parse(&options.target, &k_values)?;
    let top_n = if options.top_n == 0 {
        DEFAULT_LEADERBOARD_SIZE
    } else {
        options.top_n
    };
    let configs = grid.configs()?;

    let mut candidates: Vec<TuneCandidate> = configs
        .par_iter()
        .map(|config| {
            let summary = evaluate_benchmark_cases(&replay(cases, config), &k_values);
            TuneCandidate {
                config: *config,
                target_score: target.score(&summary),
                summary,
            }
        })
        .collect();

    candidates.sort_by(|a, b| {
        b.target_score
            .total_cmp(&a.target_score)
            .then_with(|| b.summary.mrr.total_cmp(&a.summary.mrr))
            .then_with(|| b.config.w_vec.total_cmp(&a.config.w_vec))
    });

    let total_candidates = candidates.len();
    let best = candidates
        .first()
        .cloned()
        .ok_or_else(|| CodeweaveError::tune_input("grid", "grid produced no candidates"))?;
    candidates.truncate(top_n);

    tracing::info!(
        target_metric = %target,
        candidates = total_candidates,
        best_w_vec = best.config.w_vec,
        best_rrf_k0 = best.config.rrf_k0,
        best_fused_top_m = best.config.fused_top_m,
        best_score = best.target_score,
        "auto-tune complete"
    );

    Ok(AutoTuneResult {
        target,
        k_values,
        total_candidates,
        best,
        leaderboard: candidates,
    })
}
