//! Python `import` and `from ... import` statements

use super::common::{in_source_order, parent_dir, resolve_by_suffix};
use super::ImportStrategy;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeSet;

lazy_static! {
    static ref IMPORT: Regex = Regex::new(r"(?m)^[ \t]*import[ \t]+([\w.]+(?:[ \t]+as[ \t]+\w+)?(?:[ \t]*,[ \t]*[\w.]+(?:[ \t]+as[ \t]+\w+)?)*)").unwrap();
    static ref FROM: Regex =
        Regex::new(r"(?m)^[ \t]*from[ \t]+(\.*[\w.]*)[ \t]+import[ \t]+\(?[ \t]*([\w, \t]+)").unwrap();
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PythonResolver;

impl ImportStrategy for PythonResolver {
    fn supports(&self, file_path: &str) -> bool {
        file_path.ends_with(".py") || file_path.ends_with(".pyi")
    }

    fn extract(&self, content: &str) -> Vec<String> {
        let mut found = Vec::new();
        for caps in IMPORT.captures_iter(content) {
            if let Some(m) = caps.get(1) {
                for module in m.as_str().split(',') {
                    let module = module.split_whitespace().next().unwrap_or("");
                    if !module.is_empty() {
                        found.push((m.start(), module.to_string()));
                    }
                }
            }
        }
        for caps in FROM.captures_iter(content) {
            let (Some(module), Some(names)) = (caps.get(1), caps.get(2)) else {
                continue;
            };
            let module_str = module.as_str();
            if module_str.chars().all(|c| c == '.') {
                // `from . import a, b` imports sibling modules
                for name in names.as_str().split(',') {
                    let name = name.split_whitespace().next().unwrap_or("");
                    if !name.is_empty() {
                        found.push((module.start(), format!("{}{}", module_str, name)));
                    }
                }
            } else {
                found.push((module.start(), module_str.to_string()));
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
        let dots = import.chars().take_while(|c| *c == '.').count();
        let module = &import[dots..];
        if module.is_empty() {
            return None;
        }
        let module_path = module.replace('.', "/");

        if dots > 0 {
            let mut dir = parent_dir(current_file).to_string();
            for _ in 1..dots {
                if dir.is_empty() {
                    return None;
                }
                dir = parent_dir(&dir).to_string();
            }
            let base = if dir.is_empty() {
                module_path
            } else {
                format!("{}/{}", dir, module_path)
            };
            return [format!("{}.py", base), format!("{}/__init__.py", base)]
                .into_iter()
                .find(|candidate| all_files.contains(candidate));
        }

        let name = module_path.rsplit('/').next().unwrap_or(&module_path);
        resolve_by_suffix(
            all_files,
            current_file,
            &[
                format!("{}.py", module_path),
                format!("{}/__init__.py", module_path),
            ],
            &[format!("{}.py", name)],
        )
    }
}
