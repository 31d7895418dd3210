//! Rust `use crate::...` paths and `mod` declarations

use super::common::{closest_candidate, in_source_order, parent_dir, suffix_candidates};
use super::ImportStrategy;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeSet;

lazy_static! {
    static ref USE: Regex =
        Regex::new(r"(?m)^\s*(?:pub(?:\([\w\s:]+\))?\s+)?use\s+((?:crate|self|super)(?:::\w+)*)(?:::\{([^}]*)\})?").unwrap();
    static ref MOD: Regex = Regex::new(r"(?m)^\s*(?:pub(?:\([\w\s:]+\))?\s+)?mod\s+(\w+)\s*;").unwrap();
}

const MOD_PREFIX: &str = "mod:";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RustResolver;

/// Directory holding the child modules of `current_file`
fn module_dir(current_file: &str) -> String {
    let dir = parent_dir(current_file);
    let file_name = current_file.rsplit('/').next().unwrap_or(current_file);
    match file_name {
        "mod.rs" | "lib.rs" | "main.rs" => dir.to_string(),
        _ => {
            let stem = file_name.strip_suffix(".rs").unwrap_or(file_name);
            if dir.is_empty() {
                stem.to_string()
            } else {
                format!("{}/{}", dir, stem)
            }
        }
    }
}

impl ImportStrategy for RustResolver {
    fn supports(&self, file_path: &str) -> bool {
        file_path.ends_with(".rs")
    }

    fn extract(&self, content: &str) -> Vec<String> {
        let mut found = Vec::new();
        for caps in USE.captures_iter(content) {
            let Some(path) = caps.get(1) else { continue };
            match caps.get(2) {
                Some(group) => {
                    for member in group.as_str().split(',') {
                        let member = member.split_whitespace().next().unwrap_or("");
                        let member = member.trim_end_matches(';');
                        if member.is_empty() || member == "self" || member == "*" {
                            continue;
                        }
                        let member = member.split("::").next().unwrap_or(member);
                        found.push((path.start(), format!("{}::{}", path.as_str(), member)));
                    }
                }
                None => found.push((path.start(), path.as_str().to_string())),
            }
        }
        for caps in MOD.captures_iter(content) {
            if let Some(name) = caps.get(1) {
                found.push((name.start(), format!("{}{}", MOD_PREFIX, name.as_str())));
            }
        }
        in_source_order(found)
    }

    /// `mod x;` resolves next to the declaring file. `use` paths try the
    /// longest module prefix first, so `crate::a::b::Item` lands on `a/b.rs`.
    fn resolve(
        &self,
        import: &str,
        current_file: &str,
        all_files: &BTreeSet<String>,
    ) -> Option<String> {
        if let Some(name) = import.strip_prefix(MOD_PREFIX) {
            let dir = module_dir(current_file);
            let base = if dir.is_empty() {
                name.to_string()
            } else {
                format!("{}/{}", dir, name)
            };
            return [format!("{}.rs", base), format!("{}/mod.rs", base)]
                .into_iter()
                .find(|candidate| all_files.contains(candidate));
        }

        let segments: Vec<&str> = import
            .split("::")
            .filter(|s| !matches!(*s, "crate" | "self" | "super"))
            .collect();
        for len in (1..=segments.len()).rev() {
            let module_path = segments[..len].join("/");
            let candidates = suffix_candidates(
                all_files,
                &[
                    format!("{}.rs", module_path),
                    format!("{}/mod.rs", module_path),
                ],
            );
            if !candidates.is_empty() {
                return closest_candidate(current_file, candidates);
            }
        }
        None
    }
}
