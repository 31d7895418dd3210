//! CLI argument definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "codeweave")]
#[command(
    author,
    version,
    about = "Code retrieval for agents: fused vector and lexical search with packed context"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "cli")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Retrieve and pack code context for an information request
    Search(SearchArgs),

    /// Grid-search fusion parameters over a labeled dataset
    Tune(TuneArgs),

    /// Score precomputed rankings against relevance labels
    Benchmark(BenchmarkArgs),

    /// Summarise implicit feedback signals
    Feedback(FeedbackArgs),

    /// Check vector and full-text index consistency
    Doctor(DoctorArgs),
}

#[derive(Args)]
pub struct SearchArgs {
    /// Natural-language description of the code you need
    pub information_request: String,

    /// Repository root whose index is searched
    #[arg(short = 'C', long, default_value = ".")]
    pub repo: PathBuf,

    /// Exact identifiers to favour (repeatable)
    #[arg(short = 't', long = "term")]
    pub terms: Vec<String>,

    /// Only search these languages
    #[arg(long = "lang", value_delimiter = ',')]
    pub include_languages: Vec<String>,

    /// Never return these languages
    #[arg(long = "exclude-lang", value_delimiter = ',')]
    pub exclude_languages: Vec<String>,

    /// Skip documentation and config files
    #[arg(long)]
    pub source_code_only: bool,

    /// Path globs a result must match
    #[arg(long)]
    pub include: Vec<String>,

    /// Path globs that remove a result
    #[arg(long)]
    pub exclude: Vec<String>,

    /// Response layout
    #[arg(long, value_enum, default_value = "overview")]
    pub mode: ResponseMode,

    /// Raw blocks to print in raw mode (1-20)
    #[arg(long)]
    pub raw_top_n: Option<usize>,

    /// Session key used to relate consecutive searches
    #[arg(long, env = "CODEWEAVE_SESSION")]
    pub session: Option<String>,
}

#[derive(Args)]
pub struct TuneArgs {
    /// Dataset file (.json or .jsonl)
    pub dataset: PathBuf,

    /// Metric to maximise: mrr, recall@k or ndcg@k
    #[arg(long, default_value = "mrr")]
    pub target: String,

    /// k values to evaluate
    #[arg(long, value_delimiter = ',', default_value = "1,3,5")]
    pub k: Vec<usize>,

    /// Leaderboard size
    #[arg(long, default_value = "5")]
    pub top: usize,

    /// Grid override as JSON, e.g. '{"w_vec":[0.4,0.6],"rrf_k0":[20]}'
    #[arg(long)]
    pub grid: Option<String>,
}

#[derive(Args)]
pub struct BenchmarkArgs {
    /// Dataset file (.json or .jsonl)
    pub dataset: PathBuf,

    /// k values to evaluate
    #[arg(long, value_delimiter = ',', default_value = "1,3,5,10")]
    pub k: Vec<usize>,
}

#[derive(Args)]
pub struct FeedbackArgs {
    /// Repository root
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Window in days
    #[arg(long, default_value = "7")]
    pub days: u32,

    /// Number of files to list
    #[arg(long, default_value = "10")]
    pub top: usize,
}

#[derive(Args)]
pub struct DoctorArgs {
    /// Repository root
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Delete full-text rows that have no vector
    #[arg(long)]
    pub repair: bool,
}

#[derive(Clone, Copy, ValueEnum, Default, PartialEq, Eq, Debug)]
pub enum OutputFormat {
    #[default]
    Cli,
    Json,
    Md,
}

#[derive(Clone, Copy, ValueEnum, Default, PartialEq, Eq, Debug)]
pub enum ResponseMode {
    #[default]
    Overview,
    Raw,
}

impl ResponseMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseMode::Overview => "overview",
            ResponseMode::Raw => "raw",
        }
    }
}
