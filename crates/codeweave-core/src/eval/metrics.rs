//! Rank-quality metrics over ranked id lists

use super::BenchmarkCase;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// Mean metrics over a set of benchmark queries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkSummary {
    pub query_count: usize,
    pub mrr: f64,
    pub recall_at_k: BTreeMap<usize, f64>,
    pub ndcg_at_k: BTreeMap<usize, f64>,
}

/// First `k` distinct ids in rank order
fn take_top_unique<S: AsRef<str>>(ranked: &[S], k: usize) -> Vec<&str> {
    let mut seen = HashSet::new();
    let mut top = Vec::with_capacity(k.min(ranked.len()));
    for id in ranked {
        if top.len() >= k {
            break;
        }
        let id = id.as_ref();
        if seen.insert(id) {
            top.push(id);
        }
    }
    top
}

fn positive_gains(relevance: &HashMap<String, f64>) -> impl Iterator<Item = (&str, f64)> {
    relevance
        .iter()
        .filter(|(_, gain)| gain.is_finite() && **gain > 0.0)
        .map(|(id, gain)| (id.as_str(), *gain))
}

/// Fraction of the relevant set found among the first `k` distinct ids
pub fn recall_at_k<S: AsRef<str>>(ranked: &[S], relevant: &HashSet<String>, k: usize) -> f64 {
    if k == 0 || relevant.is_empty() {
        return 0.0;
    }
    let hits = take_top_unique(ranked, k)
        .into_iter()
        .filter(|id| relevant.contains(*id))
        .count();
    hits as f64 / relevant.len() as f64
}

/// `1 / rank` of the first relevant id, ranks counted over distinct ids
pub fn reciprocal_rank<S: AsRef<str>>(ranked: &[S], relevant: &HashSet<String>) -> f64 {
    if relevant.is_empty() {
        return 0.0;
    }
    let mut seen = HashSet::new();
    let mut rank = 0usize;
    for id in ranked {
        let id = id.as_ref();
        if !seen.insert(id) {
            continue;
        }
        rank += 1;
        if relevant.contains(id) {
            return 1.0 / rank as f64;
        }
    }
    0.0
}

fn discount(position: usize) -> f64 {
    (position as f64 + 2.0).log2()
}

pub fn dcg_at_k<S: AsRef<str>>(ranked: &[S], relevance: &HashMap<String, f64>, k: usize) -> f64 {
    if k == 0 {
        return 0.0;
    }
    let gains: HashMap<&str, f64> = positive_gains(relevance).collect();
    take_top_unique(ranked, k)
        .into_iter()
        .enumerate()
        .filter_map(|(i, id)| gains.get(id).map(|gain| gain / discount(i)))
        .sum()
}

pub fn ideal_dcg_at_k(relevance: &HashMap<String, f64>, k: usize) -> f64 {
    let mut gains: Vec<f64> = positive_gains(relevance).map(|(_, gain)| gain).collect();
    gains.sort_by(|a, b| b.total_cmp(a));
    gains
        .into_iter()
        .take(k)
        .enumerate()
        .map(|(i, gain)| gain / discount(i))
        .sum()
}

/// Normalized DCG; zero when the case has no positive gain
pub fn ndcg_at_k<S: AsRef<str>>(ranked: &[S], relevance: &HashMap<String, f64>, k: usize) -> f64 {
    let ideal = ideal_dcg_at_k(relevance, k);
    if ideal == 0.0 {
        return 0.0;
    }
    dcg_at_k(ranked, relevance, k) / ideal
}

/// Positive k values, de-duplicated and ascending
pub fn normalize_k_values(k_values: &[usize]) -> Vec<usize> {
    k_values
        .iter()
        .copied()
        .filter(|k| *k > 0)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Mean MRR, recall@k and nDCG@k over every case
pub fn evaluate_benchmark_cases(cases: &[BenchmarkCase], k_values: &[usize]) -> BenchmarkSummary {
    let ks = normalize_k_values(k_values);
    let mut recall_sums: BTreeMap<usize, f64> = ks.iter().map(|k| (*k, 0.0)).collect();
    let mut ndcg_sums: BTreeMap<usize, f64> = ks.iter().map(|k| (*k, 0.0)).collect();

    if cases.is_empty() {
        return BenchmarkSummary {
            query_count: 0,
            mrr: 0.0,
            recall_at_k: recall_sums,
            ndcg_at_k: ndcg_sums,
        };
    }

    let mut mrr_sum = 0.0;
    for case in cases {
        let relevant = case.relevant_ids();
        mrr_sum += reciprocal_rank(&case.retrieved, &relevant);
        for k in &ks {
            *recall_sums.entry(*k).or_default() += recall_at_k(&case.retrieved, &relevant, *k);
            *ndcg_sums.entry(*k).or_default() += ndcg_at_k(&case.retrieved, &case.relevant, *k);
        }
    }

    let n = cases.len() as f64;
    for value in recall_sums.values_mut().chain(ndcg_sums.values_mut()) {
        *value /= n;
    }

    BenchmarkSummary {
        query_count: cases.len(),
        mrr: mrr_sum / n,
        recall_at_k: recall_sums,
        ndcg_at_k: ndcg_sums,
    }
}
