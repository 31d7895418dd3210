//! Tune command

use crate::app::{OutputFormat, TuneArgs};
use anyhow::Result;
use codeweave_core::eval::{load_auto_tune_dataset, AutoTuneGrid, TuneCandidate};
use codeweave_core::{run_auto_tune, AutoTuneOptions, AutoTuneResult, CodeweaveError};
use serde_json::json;

pub fn run(args: TuneArgs, format: OutputFormat) -> Result<()> {
    let grid = match &args.grid {
        Some(raw) => parse_grid(raw)?,
        None => AutoTuneGrid::default(),
    };
    let cases = load_auto_tune_dataset(&args.dataset)?;
    let options = AutoTuneOptions {
        target: args.target.clone(),
        k_values: args.k.clone(),
        top_n: args.top,
        grid,
    };
    let result = run_auto_tune(&cases, &options)?;
    let dataset = args.dataset.display().to_string();

    match format {
        OutputFormat::Json => {
            let value = json!({ "dataset": dataset, "result": result });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        _ => print!("{}", format_summary(&dataset, &result)),
    }
    Ok(())
}

fn parse_grid(raw: &str) -> Result<AutoTuneGrid> {
    let grid = serde_json::from_str(raw).map_err(|e| CodeweaveError::InvalidTuneInput {
        field: "grid".to_string(),
        message: format!("expected a JSON object of value lists: {}", e),
    })?;
    Ok(grid)
}

fn candidate_params(candidate: &TuneCandidate) -> String {
    format!(
        "w_vec={:.4} | w_lex={:.4} | rrf_k0={} | fused_top_m={}",
        candidate.config.w_vec,
        candidate.config.w_lex,
        candidate.config.rrf_k0,
        candidate.config.fused_top_m
    )
}

fn format_summary(dataset: &str, result: &AutoTuneResult) -> String {
    let k_values = result
        .k_values
        .iter()
        .map(|k| k.to_string())
        .collect::<Vec<_>>()
        .join(",");

    let mut out = String::new();
    out.push_str("=== Auto Tune Summary ===\n");
    out.push_str(&format!("Dataset:     {}\n", dataset));
    out.push_str(&format!("Target:      {}\n", result.target));
    out.push_str(&format!("K Values:    {}\n", k_values));
    out.push_str(&format!("Candidates:  {}\n", result.total_candidates));
    out.push_str(&format!("Best:        {}\n", candidate_params(&result.best)));
    out.push_str(&format!("Best Score:  {:.6}\n", result.best.target_score));
    out.push_str(&format!("Best MRR:    {:.6}\n", result.best.summary.mrr));
    out.push('\n');
    out.push_str("--- Leaderboard ---\n");
    for (i, candidate) in result.leaderboard.iter().enumerate() {
        out.push_str(&format!(
            "{}. score={:.6} | mrr={:.6} | {}\n",
            i + 1,
            candidate.target_score,
            candidate.summary.mrr,
            candidate_params(candidate)
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_grid_accepts_camel_case() {
        let grid = parse_grid(r#"{"wVec":[0.4],"fused_top_m":[10]}"#).unwrap();
        assert_eq!(grid.w_vec, vec![0.4]);
        assert!(grid.rrf_k0.is_empty());
        assert_eq!(grid.fused_top_m, vec![10]);
    }

    #[test]
    fn test_parse_grid_rejects_malformed_json() {
        let err = parse_grid("{w_vec").unwrap_err();
        let err = err.downcast_ref::<CodeweaveError>().unwrap();
        assert!(matches!(err, CodeweaveError::InvalidTuneInput { field, .. } if field == "grid"));
        assert_eq!(err.exit_code(), 3);
    }
}
