//! Kotlin imports, including wildcard package imports

use super::common::{closest_candidate, resolve_by_suffix};
use super::ImportStrategy;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeSet;

lazy_static! {
    static ref IMPORT: Regex =
        Regex::new(r"(?m)^\s*import\s+([\w.]+(?:\.\*|\.[A-Z]\w*))(?:\s+as\s+\w+)?\s*$").unwrap();
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KotlinResolver;

impl ImportStrategy for KotlinResolver {
    fn supports(&self, file_path: &str) -> bool {
        file_path.ends_with(".kt")
    }

    fn extract(&self, content: &str) -> Vec<String> {
        IMPORT
            .captures_iter(content)
            .map(|caps| caps[1].to_string())
            .collect()
    }

    fn resolve(
        &self,
        import: &str,
        current_file: &str,
        all_files: &BTreeSet<String>,
    ) -> Option<String> {
        if let Some(package) = import.strip_suffix(".*") {
            let marker = format!("/{}/", package.replace('.', "/"));
            let candidates = all_files
                .iter()
                .filter(|p| p.ends_with(".kt"))
                .filter(|p| format!("/{}", p).contains(&marker))
                .cloned()
                .collect();
            return closest_candidate(current_file, candidates);
        }

        let class_path = import.replace('.', "/");
        let class_name = import.rsplit('.').next().unwrap_or(import);
        resolve_by_suffix(
            all_files,
            current_file,
            &[format!("{}.kt", class_path)],
            &[format!("{}.kt", class_name)],
        )
    }
}
