//! Offline benchmark command

use crate::app::{BenchmarkArgs, OutputFormat};
use anyhow::Result;
use codeweave_core::eval::run_benchmark;
use codeweave_core::BenchmarkSummary;
use serde_json::json;

pub fn run(args: BenchmarkArgs, format: OutputFormat) -> Result<()> {
    let summary = run_benchmark(&args.dataset, &args.k)?;
    let dataset = args.dataset.display().to_string();

    match format {
        OutputFormat::Json => {
            let value = json!({ "dataset": dataset, "summary": summary });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        _ => print!("{}", format_summary(&dataset, &summary)),
    }
    Ok(())
}

fn format_summary(dataset: &str, summary: &BenchmarkSummary) -> String {
    let mut out = String::new();
    out.push_str("=== Offline Benchmark Summary ===\n");
    out.push_str(&format!("Dataset:  {}\n", dataset));
    out.push_str(&format!("Queries:  {}\n", summary.query_count));
    out.push_str(&format!("MRR:      {:.6}\n", summary.mrr));
    for (k, value) in &summary.recall_at_k {
        out.push_str(&format!("Recall@{}: {:.6}\n", k, value));
    }
    for (k, value) in &summary.ndcg_at_k {
        out.push_str(&format!("nDCG@{}:   {:.6}\n", k, value));
    }
    out
}
