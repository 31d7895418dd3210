//! Codeweave CLI
//!
//! Retrieval, calibration and feedback tooling over a per-repository index.

use codeweave_core::error::exit_codes;
use codeweave_core::{CodeweaveError, Database};
use clap::Parser;
use std::path::{Path, PathBuf};

mod app;
mod commands;
mod output;

use app::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .init();

    let usage = usage_hint(&cli.command);
    let result = match cli.command {
        Commands::Search(args) => commands::search::run(args, cli.format).await,
        Commands::Tune(args) => commands::tune::run(args, cli.format),
        Commands::Benchmark(args) => commands::benchmark::run(args, cli.format),
        Commands::Feedback(args) => commands::feedback::run(args, cli.format),
        Commands::Doctor(args) => commands::doctor::run(args, cli.format),
    };

    if let Err(err) = result {
        eprintln!("Error: {:#}", err);
        eprintln!("{}", usage);
        std::process::exit(exit_code(&err));
    }
}

/// Open the index for `repo`, honouring `CODEWEAVE_DB`
pub fn open_database(repo: &Path) -> anyhow::Result<Database> {
    let db_path = match std::env::var("CODEWEAVE_DB") {
        Ok(path) => PathBuf::from(path),
        Err(_) => Database::default_path(repo)?,
    };
    let db = Database::open(&db_path)?;
    db.initialize()?;
    tracing::info!(path = %db_path.display(), "opened index");
    Ok(db)
}

fn exit_code(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<CodeweaveError>()
        .map(CodeweaveError::exit_code)
        .unwrap_or(exit_codes::GENERAL_ERROR)
}

fn usage_hint(command: &Commands) -> &'static str {
    match command {
        Commands::Search(_) => {
            "Usage: codeweave search <information-request> [-C repo] [--term T]... [--mode overview|raw]"
        }
        Commands::Tune(_) => {
            "Usage: codeweave tune <dataset.json|jsonl> [--target mrr|recall@k|ndcg@k] [--k 1,3,5] [--top 5] [--grid JSON]"
        }
        Commands::Benchmark(_) => "Usage: codeweave benchmark <dataset.json|jsonl> [--k 1,3,5,10]",
        Commands::Feedback(_) => "Usage: codeweave feedback [path] [--days 7] [--top 10]",
        Commands::Doctor(_) => "Usage: codeweave doctor [path] [--repair]",
    }
}
