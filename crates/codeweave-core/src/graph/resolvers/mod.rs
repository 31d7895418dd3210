//! Per-language import resolution
//!
//! Each language extracts raw import strings from source text and maps them to
//! repository-relative file paths. Resolution is uniform: normalize the import
//! to a path suffix, match files ending with it, fall back to the leaf name,
//! and break ties by the longest common prefix with the importing file.

mod common;
mod csharp;
mod dart;
mod go;
mod java;
mod kotlin;
mod php;
mod python;
mod ruby;
mod rust;
mod swift;
mod typescript;

pub use common::common_prefix_len;
pub use csharp::CSharpResolver;
pub use dart::DartResolver;
pub use go::GoResolver;
pub use java::JavaResolver;
pub use kotlin::KotlinResolver;
pub use php::PhpResolver;
pub use python::PythonResolver;
pub use ruby::RubyResolver;
pub use rust::RustResolver;
pub use swift::SwiftResolver;
pub use typescript::TypeScriptResolver;

use std::collections::BTreeSet;

/// Capability set every language resolver provides
pub trait ImportStrategy: Send + Sync {
    /// Whether this resolver handles files with this path
    fn supports(&self, file_path: &str) -> bool;

    /// Raw import strings in order of first occurrence
    fn extract(&self, content: &str) -> Vec<String>;

    /// Repository-relative path the import refers to, if any
    fn resolve(
        &self,
        import: &str,
        current_file: &str,
        all_files: &BTreeSet<String>,
    ) -> Option<String>;
}

/// Enum-based resolver dispatch over the supported languages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportResolver {
    TypeScript(TypeScriptResolver),
    Python(PythonResolver),
    Go(GoResolver),
    Rust(RustResolver),
    Java(JavaResolver),
    Kotlin(KotlinResolver),
    CSharp(CSharpResolver),
    Php(PhpResolver),
    Ruby(RubyResolver),
    Swift(SwiftResolver),
    Dart(DartResolver),
}

impl ImportResolver {
    /// Every built-in resolver
    pub fn all() -> Vec<Self> {
        vec![
            Self::TypeScript(TypeScriptResolver),
            Self::Python(PythonResolver),
            Self::Go(GoResolver),
            Self::Rust(RustResolver),
            Self::Java(JavaResolver),
            Self::Kotlin(KotlinResolver),
            Self::CSharp(CSharpResolver),
            Self::Php(PhpResolver),
            Self::Ruby(RubyResolver),
            Self::Swift(SwiftResolver),
            Self::Dart(DartResolver),
        ]
    }

    /// Resolvers whose `supports` matches `file_path`
    pub fn for_file(file_path: &str) -> Vec<Self> {
        Self::all()
            .into_iter()
            .filter(|r| r.supports(file_path))
            .collect()
    }

    fn strategy(&self) -> &dyn ImportStrategy {
        match self {
            Self::TypeScript(s) => s,
            Self::Python(s) => s,
            Self::Go(s) => s,
            Self::Rust(s) => s,
            Self::Java(s) => s,
            Self::Kotlin(s) => s,
            Self::CSharp(s) => s,
            Self::Php(s) => s,
            Self::Ruby(s) => s,
            Self::Swift(s) => s,
            Self::Dart(s) => s,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::TypeScript(_) => "typescript",
            Self::Python(_) => "python",
            Self::Go(_) => "go",
            Self::Rust(_) => "rust",
            Self::Java(_) => "java",
            Self::Kotlin(_) => "kotlin",
            Self::CSharp(_) => "c_sharp",
            Self::Php(_) => "php",
            Self::Ruby(_) => "ruby",
            Self::Swift(_) => "swift",
            Self::Dart(_) => "dart",
        }
    }

    pub fn supports(&self, file_path: &str) -> bool {
        self.strategy().supports(file_path)
    }

    pub fn extract(&self, content: &str) -> Vec<String> {
        self.strategy().extract(content)
    }

    pub fn resolve(
        &self,
        import: &str,
        current_file: &str,
        all_files: &BTreeSet<String>,
    ) -> Option<String> {
        self.strategy().resolve(import, current_file, all_files)
    }

    /// Extract and resolve every import of `content`, de-duplicated in source order.
    ///
    /// Self-references are dropped.
    pub fn resolve_all(
        &self,
        content: &str,
        current_file: &str,
        all_files: &BTreeSet<String>,
    ) -> Vec<String> {
        let mut resolved: Vec<String> = Vec::new();
        for import in self.extract(content) {
            if let Some(path) = self.resolve(&import, current_file, all_files) {
                if path != current_file && !resolved.contains(&path) {
                    resolved.push(path);
                }
            }
        }
        resolved
    }
}

#[cfg(test)]
pub(crate) fn file_set(paths: &[&str]) -> BTreeSet<String> {
    paths.iter().map(|p| p.to_string()).collect()
}
