//! Index consistency command

use crate::app::{DoctorArgs, OutputFormat};
use anyhow::Result;
use serde_json::json;

/// Ids listed per side before eliding
const MAX_LISTED: usize = 20;

pub fn run(args: DoctorArgs, format: OutputFormat) -> Result<()> {
    let db = crate::open_database(&args.path)?;
    let report = db.chunk_index_consistency()?;
    let removed = if args.repair {
        db.repair_chunk_index_consistency()?
    } else {
        0
    };
    if removed > 0 {
        tracing::info!(removed, "removed full-text rows without vectors");
    }

    if format == OutputFormat::Json {
        let value = json!({ "report": report, "repaired": removed });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("Vector chunks:     {}", report.vector_count);
    println!("Full-text chunks:  {}", report.fts_count);
    if report.is_consistent() {
        println!("Status:            consistent");
        return Ok(());
    }

    println!("Status:            inconsistent");
    print_ids("Missing in full-text", &report.missing_in_fts);
    print_ids("Missing in vector", &report.missing_in_vector);
    if args.repair {
        println!();
        println!("Repaired: removed {} full-text rows", removed);
    } else if !report.missing_in_vector.is_empty() {
        println!();
        println!("Run with --repair to remove full-text rows that have no vector");
    }
    Ok(())
}

fn print_ids(label: &str, ids: &[String]) {
    if ids.is_empty() {
        return;
    }
    println!();
    println!("{} ({}):", label, ids.len());
    for id in ids.iter().take(MAX_LISTED) {
        println!("  {}", id);
    }
    if ids.len() > MAX_LISTED {
        println!("  ... and {} more", ids.len() - MAX_LISTED);
    }
}
