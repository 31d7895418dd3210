//! Error types for codeweave

use thiserror::Error;

/// Result type alias using CodeweaveError
pub type Result<T> = std::result::Result<T, CodeweaveError>;

/// Error type alias for convenience
pub type Error = CodeweaveError;

/// Exit codes for CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const NOT_FOUND: i32 = 2;
    pub const INVALID_INPUT: i32 = 3;
}

/// Main error type for codeweave
#[derive(Debug, Error)]
pub enum CodeweaveError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Vector or lexical retrieval failed; the request cannot be fused.
    #[error("{stage} channel failed: {message}")]
    Channel { stage: &'static str, message: String },

    #[error("{stage} timed out after {after_ms}ms")]
    Timeout { stage: &'static str, after_ms: u64 },

    #[error("Rerank error: {0}")]
    Rerank(String),

    #[error("Expansion error: {0}")]
    Expansion(String),

    #[error("File not found in index: {0}")]
    FileNotFound(String),

    #[error("Invalid auto-tune input ({field}): {message}")]
    InvalidTuneInput { field: String, message: String },

    #[error("Invalid dataset row {row}: {message}")]
    InvalidDataset { row: usize, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Glob pattern error: {0}")]
    GlobPattern(#[from] glob::PatternError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("External service error: {0}")]
    ExternalError(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl CodeweaveError {
    pub(crate) fn tune_input(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidTuneInput {
            field: field.into(),
            message: message.into(),
        }
    }

    pub(crate) fn dataset_row(row: usize, message: impl Into<String>) -> Self {
        Self::InvalidDataset {
            row,
            message: message.into(),
        }
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::FileNotFound(_) => exit_codes::NOT_FOUND,
            Self::InvalidInput(_)
            | Self::Config(_)
            | Self::GlobPattern(_)
            | Self::InvalidTuneInput { .. }
            | Self::InvalidDataset { .. } => exit_codes::INVALID_INPUT,
            _ => exit_codes::GENERAL_ERROR,
        }
    }
}
