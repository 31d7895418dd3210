//! Ruby `require`, `require_relative` and `autoload`

use super::common::{first_existing, in_source_order, join_relative, resolve_by_suffix};
use super::ImportStrategy;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeSet;

lazy_static! {
    static ref REQUIRE: Regex = Regex::new(r#"(?m)^\s*require\s+['"]([^'"]+)['"]"#).unwrap();
    static ref REQUIRE_RELATIVE: Regex =
        Regex::new(r#"(?m)^\s*require_relative\s+['"]([^'"]+)['"]"#).unwrap();
    static ref AUTOLOAD: Regex =
        Regex::new(r#"(?m)^\s*autoload\s+:\w+\s*,\s*['"]([^'"]+)['"]"#).unwrap();
}

const REQUIRE_PREFIX: &str = "require:";
const RELATIVE_PREFIX: &str = "require_relative:";
const AUTOLOAD_PREFIX: &str = "autoload:";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RubyResolver;

impl RubyResolver {
    fn resolve_logical(
        logical: &str,
        current_file: &str,
        all_files: &BTreeSet<String>,
    ) -> Option<String> {
        let normalized = logical.trim_start_matches('/');
        let normalized = normalized.strip_suffix(".rb").unwrap_or(normalized);
        if normalized.is_empty() {
            return None;
        }
        let name = normalized.rsplit('/').next().unwrap_or(normalized);
        resolve_by_suffix(
            all_files,
            current_file,
            &[
                format!("{}.rb", normalized),
                format!("{}/index.rb", normalized),
            ],
            &[format!("{}.rb", name), format!("{}/index.rb", name)],
        )
    }
}

impl ImportStrategy for RubyResolver {
    fn supports(&self, file_path: &str) -> bool {
        file_path.ends_with(".rb")
    }

    fn extract(&self, content: &str) -> Vec<String> {
        let mut found = Vec::new();
        let patterns: [(&Regex, &str); 3] = [
            (&*REQUIRE, REQUIRE_PREFIX),
            (&*REQUIRE_RELATIVE, RELATIVE_PREFIX),
            (&*AUTOLOAD, AUTOLOAD_PREFIX),
        ];
        for (pattern, prefix) in patterns {
            for caps in pattern.captures_iter(content) {
                if let Some(m) = caps.get(1) {
                    found.push((m.start(), format!("{}{}", prefix, m.as_str())));
                }
            }
        }
        in_source_order(found)
    }

    fn resolve(
        &self,
        import: &str,
        current_file: &str,
        all_files: &BTreeSet<String>,
    ) -> Option<String> {
        if let Some(relative) = import.strip_prefix(RELATIVE_PREFIX) {
            if relative.is_empty() {
                return None;
            }
            let base = join_relative(current_file, relative)?;
            return first_existing(all_files, &base, &[".rb"]);
        }
        if let Some(path) = import.strip_prefix(REQUIRE_PREFIX) {
            return Self::resolve_logical(path, current_file, all_files);
        }
        if let Some(path) = import.strip_prefix(AUTOLOAD_PREFIX) {
            return Self::resolve_logical(path, current_file, all_files);
        }
        None
    }
}
