//! PHP `use` statements mapped to PSR-4 style paths

use super::common::resolve_by_suffix;
use super::ImportStrategy;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeSet;

lazy_static! {
    static ref USE: Regex = Regex::new(r"(?m)^\s*use\s+(?:(?:function|const)\s+)?([^;]+);").unwrap();
    static ref GROUPED: Regex = Regex::new(r"^(.*?)\\\s*\{([^}]+)\}$").unwrap();
    static ref ALIAS: Regex = Regex::new(r"(?i)\s+as\s+").unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhpResolver;

impl PhpResolver {
    /// Expand `Foo\{A, B as C}` and `Foo\A, Foo\B` into individual paths
    fn expand_use_body(body: &str) -> Vec<String> {
        if let Some(caps) = GROUPED.captures(body) {
            let prefix = WHITESPACE.replace_all(caps[1].trim(), "").to_string();
            return caps[2]
                .split(',')
                .map(|member| strip_alias(member.trim()))
                .filter(|member| !member.is_empty())
                .map(|member| format!("{}\\{}", prefix, member))
                .collect();
        }

        body.split(',')
            .map(|part| strip_alias(part.trim()))
            .filter(|part| !part.is_empty())
            .collect()
    }
}

fn strip_alias(clause: &str) -> String {
    let path = ALIAS.split(clause).next().unwrap_or(clause).trim();
    WHITESPACE.replace_all(path, "").to_string()
}

impl ImportStrategy for PhpResolver {
    fn supports(&self, file_path: &str) -> bool {
        file_path.ends_with(".php")
    }

    fn extract(&self, content: &str) -> Vec<String> {
        let mut imports = Vec::new();
        for caps in USE.captures_iter(content) {
            let body = caps[1].trim();
            if body.is_empty() {
                continue;
            }
            for path in Self::expand_use_body(body) {
                let normalized = path.trim_start_matches('\\').trim();
                if !normalized.is_empty() {
                    imports.push(normalized.to_string());
                }
            }
        }
        imports
    }

    fn resolve(
        &self,
        import: &str,
        current_file: &str,
        all_files: &BTreeSet<String>,
    ) -> Option<String> {
        let module_path = import.trim_start_matches('\\').replace('\\', "/");
        if module_path.is_empty() {
            return None;
        }
        let name = module_path.rsplit('/').next().unwrap_or(&module_path);
        if name.is_empty() {
            return None;
        }
        resolve_by_suffix(
            all_files,
            current_file,
            &[
                format!("{}.php", module_path),
                format!("{}/index.php", module_path),
            ],
            &[format!("{}.php", name), format!("{}/index.php", name)],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::super::file_set;
    use super::*;

    #[test]
    fn test_extract_grouped_and_aliased() {
        let content = "<?php\nuse App\\Models\\User;\nuse App\\Services\\{Mailer, Billing as Pay};\nuse function App\\Support\\helper;\nuse \\Vendor\\Lib as L, App\\Http\\Kernel;\n";
        assert_eq!(
            PhpResolver.extract(content),
            vec![
                "App\\Models\\User",
                "App\\Services\\Mailer",
                "App\\Services\\Billing",
                "App\\Support\\helper",
                "Vendor\\Lib",
                "App\\Http\\Kernel",
            ]
        );
    }

    #[test]
    fn test_resolve_namespace_and_index() {
        let all = file_set(&["src/App/Models/User.php", "src/App/Services/Mailer/index.php"]);
        let current = "src/App/Http/Controller.php";
        assert_eq!(
            PhpResolver.resolve("App\\Models\\User", current, &all).as_deref(),
            Some("src/App/Models/User.php")
        );
        assert_eq!(
            PhpResolver.resolve("App\\Services\\Mailer", current, &all).as_deref(),
            Some("src/App/Services/Mailer/index.php")
        );
    }

    #[test]
    fn test_resolve_falls_back_to_class_name() {
        let all = file_set(&["app/Models/User.php"]);
        assert_eq!(
            PhpResolver.resolve("Domain\\Accounts\\User", "app/x.php", &all).as_deref(),
            Some("app/Models/User.php")
        );
    }
}
