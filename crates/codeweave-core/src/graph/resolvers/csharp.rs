//! C# `using` directives mapped to namespace paths

use super::common::resolve_by_suffix;
use super::ImportStrategy;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeSet;

lazy_static! {
    // using X.Y; using A = X.Y; using static X.Y; global using ...; global::X
    static ref USING: Regex = Regex::new(
        r"(?m)^\s*(?:global\s+)?using\s+(?:static\s+)?(?:@?\w+\s*=\s*)?((?:@?\w+::)?@?\w+(?:\.@?\w+)*)\s*;"
    )
    .unwrap();
    static ref ALIAS_QUALIFIER: Regex = Regex::new(r"^@?\w+::").unwrap();
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CSharpResolver;

impl ImportStrategy for CSharpResolver {
    fn supports(&self, file_path: &str) -> bool {
        file_path.ends_with(".cs")
    }

    fn extract(&self, content: &str) -> Vec<String> {
        USING
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
        let normalized = ALIAS_QUALIFIER.replace(import, "").replace('@', "");
        if normalized.is_empty() {
            return None;
        }
        let namespace_path = normalized.replace('.', "/");
        let type_name = normalized.rsplit('.').next().unwrap_or(&normalized);
        resolve_by_suffix(
            all_files,
            current_file,
            &[format!("{}.cs", namespace_path)],
            &[format!("{}.cs", type_name)],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::super::file_set;
    use super::*;

    #[test]
    fn test_extract_using_forms() {
        let content = "using System;\nglobal using static Shop.Util.Math;\nusing Repo = Shop.Data.Repository;\nusing global::Shop.Models.@Order;\n";
        assert_eq!(
            CSharpResolver.extract(content),
            vec![
                "System",
                "Shop.Util.Math",
                "Shop.Data.Repository",
                "global::Shop.Models.@Order"
            ]
        );
    }

    #[test]
    fn test_resolve_namespace_path() {
        let all = file_set(&["src/Shop/Models/Order.cs", "src/Shop/Api/Controller.cs"]);
        assert_eq!(
            CSharpResolver
                .resolve("global::Shop.Models.@Order", "src/Shop/Api/Controller.cs", &all)
                .as_deref(),
            Some("src/Shop/Models/Order.cs")
        );
    }

    #[test]
    fn test_resolve_falls_back_to_type_name() {
        let all = file_set(&["lib/Collections/List.cs"]);
        assert_eq!(
            CSharpResolver
                .resolve("System.Collections.Generic.List", "app/Main.cs", &all)
                .as_deref(),
            Some("lib/Collections/List.cs")
        );
        assert_eq!(CSharpResolver.resolve("System", "app/Main.cs", &all), None);
    }
}
