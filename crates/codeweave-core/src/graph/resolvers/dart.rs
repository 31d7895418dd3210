//! Dart relative `import`, `export` and `part` directives

use super::common::join_relative;
use super::ImportStrategy;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeSet;

lazy_static! {
    static ref DIRECTIVE: Regex =
        Regex::new(r#"(?m)^\s*(?:import|export|part(?:\s+of)?)\s+['"](\.{1,2}/[^'"]+)['"][^\n;]*;?"#)
            .unwrap();
}

const DART_EXTENSION: &str = ".dart";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DartResolver;

impl ImportStrategy for DartResolver {
    fn supports(&self, file_path: &str) -> bool {
        file_path.ends_with(DART_EXTENSION)
    }

    fn extract(&self, content: &str) -> Vec<String> {
        DIRECTIVE
            .captures_iter(content)
            .map(|caps| caps[1].to_string())
            .collect()
    }

    /// Only relative directives resolve; `package:` and `dart:` URIs are external
    fn resolve(
        &self,
        import: &str,
        current_file: &str,
        all_files: &BTreeSet<String>,
    ) -> Option<String> {
        if !import.starts_with('.') {
            return None;
        }
        let path = join_relative(current_file, import)?;
        if all_files.contains(&path) {
            return Some(path);
        }
        if !path.ends_with(DART_EXTENSION) {
            let with_ext = format!("{}{}", path, DART_EXTENSION);
            if all_files.contains(&with_ext) {
                return Some(with_ext);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::super::file_set;
    use super::*;

    #[test]
    fn test_extract_relative_only() {
        let content = "import 'package:flutter/material.dart';\nimport '../models/order.dart' as m;\npart './cart_state.dart';\nexport './widgets.dart' show Button;\n";
        assert_eq!(
            DartResolver.extract(content),
            vec!["../models/order.dart", "./cart_state.dart", "./widgets.dart"]
        );
    }

    #[test]
    fn test_resolve_relative() {
        let all = file_set(&["lib/models/order.dart", "lib/ui/cart_state.dart"]);
        assert_eq!(
            DartResolver
                .resolve("../models/order.dart", "lib/ui/cart.dart", &all)
                .as_deref(),
            Some("lib/models/order.dart")
        );
        assert_eq!(
            DartResolver.resolve("./cart_state", "lib/ui/cart.dart", &all).as_deref(),
            Some("lib/ui/cart_state.dart")
        );
        assert_eq!(
            DartResolver.resolve("package:shop/order.dart", "lib/ui/cart.dart", &all),
            None
        );
    }
}
