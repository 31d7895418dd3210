//! Java imports, static and wildcard forms included

use super::common::{closest_candidate, resolve_by_suffix};
use super::ImportStrategy;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeSet;

lazy_static! {
    static ref IMPORT: Regex =
        Regex::new(r"(?m)^\s*import\s+(static\s+)?([\w.]+(?:\.\*)?)\s*;").unwrap();
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JavaResolver;

impl ImportStrategy for JavaResolver {
    fn supports(&self, file_path: &str) -> bool {
        file_path.ends_with(".java")
    }

    fn extract(&self, content: &str) -> Vec<String> {
        IMPORT
            .captures_iter(content)
            .map(|caps| {
                let path = &caps[2];
                if caps.get(1).is_some() {
                    // static member import: drop the member name
                    match path.rsplit_once('.') {
                        Some((class, _)) => class.to_string(),
                        None => path.to_string(),
                    }
                } else {
                    path.to_string()
                }
            })
            .collect()
    }

    fn resolve(
        &self,
        import: &str,
        current_file: &str,
        all_files: &BTreeSet<String>,
    ) -> Option<String> {
        if import.starts_with("java.") || import.starts_with("javax.") {
            return None;
        }

        if let Some(package) = import.strip_suffix(".*") {
            let dir = package.replace('.', "/");
            let candidates = all_files
                .iter()
                .filter(|p| p.ends_with(".java"))
                .filter(|p| {
                    let parent = super::common::parent_dir(p);
                    super::common::path_ends_with(parent, &dir)
                })
                .cloned()
                .collect();
            return closest_candidate(current_file, candidates);
        }

        let class_path = import.replace('.', "/");
        let class_name = import.rsplit('.').next().unwrap_or(import);
        resolve_by_suffix(
            all_files,
            current_file,
            &[format!("{}.java", class_path)],
            &[format!("{}.java", class_name)],
        )
    }
}
