//! TypeScript and JavaScript module specifiers

use super::common::{first_existing, in_source_order, join_relative, resolve_by_suffix};
use super::ImportStrategy;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeSet;

lazy_static! {
    static ref FROM: Regex =
        Regex::new(r#"(?m)^\s*(?:import|export)\s[^'"]*?\bfrom\s*['"]([^'"]+)['"]"#).unwrap();
    static ref SIDE_EFFECT: Regex = Regex::new(r#"(?m)^\s*import\s*['"]([^'"]+)['"]"#).unwrap();
    static ref CALL: Regex =
        Regex::new(r#"\b(?:require|import)\s*\(\s*['"]([^'"]+)['"]\s*\)"#).unwrap();
}

const EXTENSIONS: &[&str] = &[".ts", ".tsx", ".js", ".jsx", ".mjs", ".cjs"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TypeScriptResolver;

impl ImportStrategy for TypeScriptResolver {
    fn supports(&self, file_path: &str) -> bool {
        EXTENSIONS.iter().any(|ext| file_path.ends_with(ext))
    }

    fn extract(&self, content: &str) -> Vec<String> {
        let mut found = Vec::new();
        for pattern in [&*FROM, &*SIDE_EFFECT, &*CALL] {
            for caps in pattern.captures_iter(content) {
                if let Some(m) = caps.get(1) {
                    found.push((m.start(), m.as_str().to_string()));
                }
            }
        }
        in_source_order(found)
    }

    /// Relative specifiers resolve against the importing file; `@/` and `~/`
    /// aliases resolve by suffix; bare package names are external.
    fn resolve(
        &self,
        import: &str,
        current_file: &str,
        all_files: &BTreeSet<String>,
    ) -> Option<String> {
        if import.starts_with('.') {
            let base = join_relative(current_file, import)?;
            // "./x.js" may point at "./x.ts" in TypeScript projects
            let stem = EXTENSIONS
                .iter()
                .find_map(|ext| base.strip_suffix(ext))
                .unwrap_or(&base);
            return first_existing(all_files, &base, EXTENSIONS)
                .or_else(|| first_existing(all_files, stem, EXTENSIONS));
        }

        let aliased = import
            .strip_prefix("@/")
            .or_else(|| import.strip_prefix("~/"))?;
        let name = aliased.rsplit('/').next().unwrap_or(aliased);
        let primary: Vec<String> = EXTENSIONS
            .iter()
            .map(|ext| format!("{}{}", aliased, ext))
            .chain(EXTENSIONS.iter().map(|ext| format!("{}/index{}", aliased, ext)))
            .collect();
        let fallback: Vec<String> = EXTENSIONS
            .iter()
            .map(|ext| format!("{}{}", name, ext))
            .collect();
        resolve_by_suffix(all_files, current_file, &primary, &fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::super::file_set;
    use super::*;

    #[test]
    fn test_extract_all_forms_in_order() {
        let content = "import React from 'react';\nimport { a,\n  b } from \"./util\";\nimport './styles.css';\nexport * from './types';\nconst x = require('../lib/x');\nconst y = await import('./lazy');\n";
        assert_eq!(
            TypeScriptResolver.extract(content),
            vec!["react", "./util", "./styles.css", "./types", "../lib/x", "./lazy"]
        );
    }

    #[test]
    fn test_resolve_relative_with_index_and_extension() {
        let all = file_set(&["src/util.ts", "src/types/index.ts", "lib/x.js", "src/app.ts"]);
        let current = "src/app.ts";
        assert_eq!(
            TypeScriptResolver.resolve("./util", current, &all).as_deref(),
            Some("src/util.ts")
        );
        assert_eq!(
            TypeScriptResolver.resolve("./types", current, &all).as_deref(),
            Some("src/types/index.ts")
        );
        assert_eq!(
            TypeScriptResolver.resolve("../lib/x", current, &all).as_deref(),
            Some("lib/x.js")
        );
        assert_eq!(
            TypeScriptResolver.resolve("./util.js", current, &all).as_deref(),
            Some("src/util.ts")
        );
        assert_eq!(TypeScriptResolver.resolve("react", current, &all), None);
    }

    #[test]
    fn test_resolve_alias_by_suffix() {
        let all = file_set(&["web/src/components/Button.tsx"]);
        assert_eq!(
            TypeScriptResolver
                .resolve("@/components/Button", "web/src/pages/index.tsx", &all)
                .as_deref(),
            Some("web/src/components/Button.tsx")
        );
    }
}
