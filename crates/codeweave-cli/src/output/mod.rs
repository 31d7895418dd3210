//! Output formatters

pub mod json;
pub mod markdown;

use crate::app::{OutputFormat, ResponseMode};
use anyhow::Result;
use codeweave_core::{ContextPack, RawCodeBlock, SearchFilter};
use std::path::Path;

/// Everything a search prints
pub struct SearchView<'a> {
    pub mode: ResponseMode,
    pub pack: &'a ContextPack,
    pub raw_blocks: &'a [RawCodeBlock],
    pub raw_top_n: usize,
    pub filter: &'a SearchFilter,
}

/// Format a search result bundle
pub fn format_search(view: &SearchView<'_>, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => json::format_search(view),
        OutputFormat::Md => Ok(markdown::format_search(view, false)),
        OutputFormat::Cli => Ok(markdown::format_search(view, true)),
    }
}

/// Fence language hint for a file path
pub fn code_fence_language(path: &str) -> String {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase);

    let Some(ext) = ext else {
        return "plaintext".to_string();
    };
    let lang = match ext.as_str() {
        "ts" | "tsx" => "typescript",
        "js" | "jsx" => "javascript",
        "py" => "python",
        "rs" => "rust",
        "go" => "go",
        "java" => "java",
        "c" | "h" => "c",
        "cpp" | "hpp" => "cpp",
        "cs" => "csharp",
        "rb" => "ruby",
        "php" => "php",
        "swift" => "swift",
        "kt" => "kotlin",
        "scala" => "scala",
        "sql" => "sql",
        "sh" | "bash" | "zsh" => "bash",
        "json" => "json",
        "yaml" | "yml" => "yaml",
        "xml" => "xml",
        "html" => "html",
        "css" => "css",
        "scss" => "scss",
        "less" => "less",
        "md" => "markdown",
        "toml" => "toml",
        other => other,
    };
    lang.to_string()
}
