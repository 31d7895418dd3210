//! Offline evaluation and fusion calibration
//!
//! Rank metrics, labeled dataset loading, benchmark summaries and the
//! auto-tune grid search over [`FusionConfig`](crate::search::FusionConfig).

mod autotune;
mod dataset;
mod metrics;

pub use autotune::{
    run_auto_tune, AutoTuneGrid, AutoTuneOptions, AutoTuneResult, TuneCandidate, TuneTarget,
    DEFAULT_FUSED_TOP_M_GRID, DEFAULT_LEADERBOARD_SIZE, DEFAULT_RRF_K0_GRID, DEFAULT_W_VEC_GRID,
};
pub use dataset::{
    load_auto_tune_dataset, load_benchmark_dataset, parse_json, parse_jsonl, AutoTuneCase,
    BenchmarkCase,
};
pub use metrics::{
    dcg_at_k, evaluate_benchmark_cases, ideal_dcg_at_k, ndcg_at_k, normalize_k_values,
    recall_at_k, reciprocal_rank, BenchmarkSummary,
};

/// k values reported by the offline benchmark when none are given
pub const DEFAULT_BENCHMARK_K: [usize; 4] = [1, 3, 5, 10];

/// Load a benchmark dataset and summarise it at `k_values`
pub fn run_benchmark(
    path: impl AsRef<std::path::Path>,
    k_values: &[usize],
) -> crate::error::Result<BenchmarkSummary> {
    let cases = load_benchmark_dataset(path)?;
    let summary = evaluate_benchmark_cases(&cases, k_values);
    tracing::info!(
        queries = summary.query_count,
        mrr = summary.mrr,
        "offline benchmark evaluated"
    );
    Ok(summary)
}
