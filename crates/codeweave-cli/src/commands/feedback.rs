//! Feedback summary command

use crate::app::{FeedbackArgs, OutputFormat};
use anyhow::Result;
use codeweave_core::feedback::SummaryOptions;
use codeweave_core::FeedbackSummary;

pub fn run(args: FeedbackArgs, format: OutputFormat) -> Result<()> {
    let db = crate::open_database(&args.path)?;
    let options = SummaryOptions {
        days: args.days,
        top: args.top,
        ..SummaryOptions::default()
    };
    let summary = db.feedback_summary(&options)?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        _ => print!("{}", format_summary(args.days, &summary)),
    }
    Ok(())
}

fn format_summary(days: u32, summary: &FeedbackSummary) -> String {
    let mut out = String::new();
    out.push_str(&format!("=== Retrieval Feedback (last {} days) ===\n", days));
    out.push_str(&format!("Events:            {}\n", summary.total_events));
    out.push_str(&format!(
        "Zero-hit rate:     {:.2}%\n",
        summary.zero_hit_rate * 100.0
    ));
    out.push_str(&format!(
        "Implicit success:  {:.2}%\n",
        summary.implicit_success_rate * 100.0
    ));
    out.push_str(&format!("Positive signals:  {}\n", summary.positive_signals));
    out.push_str(&format!("Negative signals:  {}\n", summary.negative_signals));

    if !summary.signal_breakdown.is_empty() {
        out.push('\n');
        out.push_str("Signals:\n");
        for (kind, count) in &summary.signal_breakdown {
            out.push_str(&format!("  {:<16} {}\n", kind, count));
        }
    }

    if !summary.top_files.is_empty() {
        out.push('\n');
        out.push_str("Top files:\n");
        for (i, file) in summary.top_files.iter().enumerate() {
            out.push_str(&format!(
                "  {}. {} (hits={}, weight={:.2})\n",
                i + 1,
                file.file_path,
                file.hit_count,
                file.total_weight
            ));
        }
    }
    out
}
