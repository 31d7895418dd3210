//! Swift `import` and `@testable import`

use super::common::{closest_candidate, path_ends_with};
use super::ImportStrategy;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeSet;

lazy_static! {
    static ref IMPORT: Regex = Regex::new(
        r"(?m)^\s*(?:@testable\s+)?import\s+(?:(?:typealias|struct|class|enum|protocol|let|var|func)\s+)?([\w.]+)\s*;?\s*$"
    )
    .unwrap();
}

const SWIFT_EXTENSION: &str = ".swift";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SwiftResolver;

impl ImportStrategy for SwiftResolver {
    fn supports(&self, file_path: &str) -> bool {
        file_path.ends_with(SWIFT_EXTENSION)
    }

    fn extract(&self, content: &str) -> Vec<String> {
        IMPORT
            .captures_iter(content)
            .map(|caps| caps[1].to_string())
            .collect()
    }

    /// Exact declaration path first, then any file of the module
    fn resolve(
        &self,
        import: &str,
        current_file: &str,
        all_files: &BTreeSet<String>,
    ) -> Option<String> {
        let swift_files: Vec<&String> = all_files
            .iter()
            .filter(|p| p.ends_with(SWIFT_EXTENSION))
            .collect();
        if swift_files.is_empty() {
            return None;
        }

        let exact = format!("{}{}", import.replace('.', "/"), SWIFT_EXTENSION);
        let exact_matches: Vec<String> = swift_files
            .iter()
            .filter(|p| path_ends_with(p, &exact))
            .map(|p| p.to_string())
            .collect();
        if !exact_matches.is_empty() {
            return closest_candidate(current_file, exact_matches);
        }

        let module = import.split('.').next().unwrap_or(import);
        let module_file = format!("{}{}", module, SWIFT_EXTENSION);
        let module_dir = format!("/{}/", module);
        let candidates = swift_files
            .iter()
            .filter(|p| path_ends_with(p, &module_file) || format!("/{}", p).contains(&module_dir))
            .map(|p| p.to_string())
            .collect();
        closest_candidate(current_file, candidates)
    }
}
