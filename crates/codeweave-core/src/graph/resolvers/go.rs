//! Go package imports mapped to package directories

use super::common::{closest_candidate, in_source_order, leaf, parent_dir, path_ends_with};
use super::ImportStrategy;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeSet;

lazy_static! {
    static ref SINGLE: Regex = Regex::new(r#"(?m)^\s*import\s+(?:[\w.]+\s+)?"([^"]+)""#).unwrap();
    static ref BLOCK: Regex = Regex::new(r"(?ms)^\s*import\s*\((.*?)\)").unwrap();
    static ref BLOCK_ENTRY: Regex = Regex::new(r#"(?m)^\s*(?:[\w.]+\s+)?"([^"]+)""#).unwrap();
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GoResolver;

fn is_package_file(path: &str) -> bool {
    path.ends_with(".go") && !path.ends_with("_test.go")
}

impl ImportStrategy for GoResolver {
    fn supports(&self, file_path: &str) -> bool {
        file_path.ends_with(".go")
    }

    fn extract(&self, content: &str) -> Vec<String> {
        let mut found = Vec::new();
        for caps in SINGLE.captures_iter(content) {
            if let Some(m) = caps.get(1) {
                found.push((m.start(), m.as_str().to_string()));
            }
        }
        for caps in BLOCK.captures_iter(content) {
            let Some(body) = caps.get(1) else { continue };
            for entry in BLOCK_ENTRY.captures_iter(body.as_str()) {
                if let Some(m) = entry.get(1) {
                    found.push((body.start() + m.start(), m.as_str().to_string()));
                }
            }
        }
        in_source_order(found)
    }

    /// An import path names a directory; the package directory is the
    /// longest trailing run of the import path that exists in the repository.
    fn resolve(
        &self,
        import: &str,
        current_file: &str,
        all_files: &BTreeSet<String>,
    ) -> Option<String> {
        let package_files: Vec<&String> = all_files.iter().filter(|p| is_package_file(p)).collect();

        let mut best_len = 0;
        let mut candidates: Vec<String> = Vec::new();
        for path in &package_files {
            let dir = parent_dir(path);
            if dir.is_empty() || !path_ends_with(import, dir) {
                continue;
            }
            if dir.len() > best_len {
                best_len = dir.len();
                candidates.clear();
            }
            if dir.len() == best_len {
                candidates.push(path.to_string());
            }
        }

        if candidates.is_empty() {
            let package = leaf(import);
            candidates = package_files
                .iter()
                .filter(|p| leaf(parent_dir(p)) == package)
                .map(|p| p.to_string())
                .collect();
        }
        closest_candidate(current_file, candidates)
    }
}
