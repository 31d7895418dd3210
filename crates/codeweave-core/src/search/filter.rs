//! Language and path filters applied to retrieval

use crate::error::{CodeweaveError, Result};
use glob::Pattern;
use std::path::Path;

/// Extension to language tag
const LANGUAGE_MAP: &[(&str, &str)] = &[
    ("ts", "typescript"),
    ("tsx", "typescript"),
    ("js", "javascript"),
    ("jsx", "javascript"),
    ("mjs", "javascript"),
    ("cjs", "javascript"),
    ("md", "markdown"),
    ("py", "python"),
    ("go", "go"),
    ("rs", "rust"),
    ("java", "java"),
    ("kt", "kotlin"),
    ("swift", "swift"),
    ("cs", "c_sharp"),
    ("csx", "c_sharp"),
    ("cpp", "cpp"),
    ("cc", "cpp"),
    ("cxx", "cpp"),
    ("hpp", "cpp"),
    ("h", "cpp"),
    ("c", "c"),
    ("sh", "shell"),
    ("bash", "shell"),
    ("zsh", "shell"),
    ("fish", "shell"),
    ("ps1", "powershell"),
    ("sql", "sql"),
    ("yaml", "yaml"),
    ("yml", "yaml"),
    ("json", "json"),
    ("toml", "toml"),
    ("xml", "xml"),
    ("html", "html"),
    ("css", "css"),
    ("scss", "scss"),
    ("sass", "sass"),
    ("less", "less"),
    ("vue", "vue"),
    ("svelte", "svelte"),
    ("rb", "ruby"),
    ("php", "php"),
    ("dart", "dart"),
    ("lua", "lua"),
    ("r", "r"),
];

const DOC_LANGUAGES: &[&str] = &["markdown"];
const CONFIG_LANGUAGES: &[&str] = &["json", "yaml", "toml", "xml"];

/// Language tag for a file path, `"unknown"` when the extension is not recognized
pub fn language_for_path(path: &str) -> &'static str {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());
    match ext {
        Some(ext) => LANGUAGE_MAP
            .iter()
            .find(|(e, _)| *e == ext)
            .map(|(_, lang)| *lang)
            .unwrap_or("unknown"),
        None => "unknown",
    }
}

/// All recognized language tags, de-duplicated, in table order
fn all_languages() -> Vec<&'static str> {
    let mut langs: Vec<&'static str> = Vec::new();
    for (_, lang) in LANGUAGE_MAP {
        if !langs.contains(lang) {
            langs.push(*lang);
        }
    }
    langs
}

/// Languages that count as source code (everything except docs and config)
pub fn code_languages() -> Vec<&'static str> {
    all_languages()
        .into_iter()
        .filter(|l| !DOC_LANGUAGES.contains(l) && !CONFIG_LANGUAGES.contains(l))
        .collect()
}

pub fn is_known_language(lang: &str) -> bool {
    lang == "unknown" || LANGUAGE_MAP.iter().any(|(_, l)| *l == lang)
}

/// Normalized language filter.
///
/// `allow` is a whitelist passed to the channels; `deny` is applied on top of it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LanguageFilter {
    pub allow: Option<Vec<String>>,
    pub deny: Vec<String>,
}

impl LanguageFilter {
    /// Validate and normalize the three user-facing language options
    pub fn new(source_code_only: bool, include: &[String], exclude: &[String]) -> Result<Self> {
        if source_code_only && !include.is_empty() {
            return Err(CodeweaveError::InvalidInput(
                "source_code_only and include_languages are mutually exclusive".to_string(),
            ));
        }

        let overlap: Vec<&str> = include
            .iter()
            .filter(|l| exclude.contains(*l))
            .map(|l| l.as_str())
            .collect();
        if !overlap.is_empty() {
            return Err(CodeweaveError::InvalidInput(format!(
                "include_languages and exclude_languages overlap: {}",
                overlap.join(", ")
            )));
        }

        let unknown: Vec<&str> = include
            .iter()
            .chain(exclude.iter())
            .filter(|l| !is_known_language(l))
            .map(|l| l.as_str())
            .collect();
        if !unknown.is_empty() {
            return Err(CodeweaveError::InvalidInput(format!(
                "unknown language: {}",
                unknown.join(", ")
            )));
        }

        let allow = if source_code_only {
            Some(code_languages().into_iter().map(String::from).collect())
        } else if !include.is_empty() {
            Some(include.to_vec())
        } else {
            None
        };

        let allow = allow
            .map(|langs: Vec<String>| {
                langs
                    .into_iter()
                    .filter(|l| !exclude.contains(l))
                    .collect::<Vec<_>>()
            })
            .filter(|langs| !langs.is_empty());

        Ok(Self {
            allow,
            deny: exclude.to_vec(),
        })
    }

    pub fn allows(&self, language: &str) -> bool {
        if self.deny.iter().any(|l| l == language) {
            return false;
        }
        match &self.allow {
            Some(allow) => allow.iter().any(|l| l == language),
            None => true,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.allow.is_none() && self.deny.is_empty()
    }
}

/// Include/exclude glob filter over repository-relative paths
#[derive(Debug, Clone, Default)]
pub struct FilePathFilter {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
    include_raw: Vec<String>,
    exclude_raw: Vec<String>,
}

impl FilePathFilter {
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self> {
        let include_raw = normalize_globs(include);
        let exclude_raw = normalize_globs(exclude);
        Ok(Self {
            include: compile(&include_raw)?,
            exclude: compile(&exclude_raw)?,
            include_raw,
            exclude_raw,
        })
    }

    pub fn matches(&self, path: &str) -> bool {
        let included = self.include.is_empty() || self.include.iter().any(|p| p.matches(path));
        included && !self.exclude.iter().any(|p| p.matches(path))
    }

    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    pub fn include_globs(&self) -> &[String] {
        &self.include_raw
    }

    pub fn exclude_globs(&self) -> &[String] {
        &self.exclude_raw
    }
}

fn normalize_globs(globs: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for glob in globs {
        let glob = glob.trim();
        if !glob.is_empty() && !out.iter().any(|g| g == glob) {
            out.push(glob.to_string());
        }
    }
    out
}

fn compile(globs: &[String]) -> Result<Vec<Pattern>> {
    globs
        .iter()
        .map(|g| Pattern::new(g).map_err(Into::into))
        .collect()
}

/// Filter handed to both retrieval channels and re-checked after fusion
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    pub languages: LanguageFilter,
    pub paths: FilePathFilter,
}

impl SearchFilter {
    pub fn allows(&self, file_path: &str, language: &str) -> bool {
        self.languages.allows(language) && self.paths.matches(file_path)
    }

    pub fn is_empty(&self) -> bool {
        self.languages.is_empty() && self.paths.is_empty()
    }
}
