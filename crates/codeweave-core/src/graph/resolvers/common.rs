//! Path helpers shared by the import resolvers

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

/// Number of leading characters two paths share.
///
/// Used to break ties between candidate files: the candidate sharing the most
/// leading characters with the importing file is closest in the directory tree.
pub fn common_prefix_len(a: &str, b: &str) -> usize {
    a.chars().zip(b.chars()).take_while(|(x, y)| x == y).count()
}

/// Pick the candidate closest to `current_file`; earlier candidates win ties
pub fn closest_candidate(current_file: &str, candidates: Vec<String>) -> Option<String> {
    let mut best: Option<(usize, String)> = None;
    for candidate in candidates {
        let len = common_prefix_len(current_file, &candidate);
        match &best {
            Some((best_len, _)) if len <= *best_len => {}
            _ => best = Some((len, candidate)),
        }
    }
    best.map(|(_, path)| path)
}

/// `path` ends with `suffix` at a path-segment boundary
pub fn path_ends_with(path: &str, suffix: &str) -> bool {
    let suffix = suffix.trim_start_matches('/');
    if suffix.is_empty() {
        return false;
    }
    path == suffix
        || (path.ends_with(suffix) && path[..path.len() - suffix.len()].ends_with('/'))
}

/// Files matching any of `suffixes`, in `all_files` order
pub fn suffix_candidates(all_files: &BTreeSet<String>, suffixes: &[String]) -> Vec<String> {
    all_files
        .iter()
        .filter(|path| suffixes.iter().any(|s| path_ends_with(path, s)))
        .cloned()
        .collect()
}

/// Suffix match with a leaf-name fallback and nearest-path tie-break
pub fn resolve_by_suffix(
    all_files: &BTreeSet<String>,
    current_file: &str,
    primary: &[String],
    fallback: &[String],
) -> Option<String> {
    let mut candidates = suffix_candidates(all_files, primary);
    if candidates.is_empty() {
        candidates = suffix_candidates(all_files, fallback);
    }
    closest_candidate(current_file, candidates)
}

/// Directory part of a repository-relative path
pub fn parent_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

/// Last `/`-separated segment
pub fn leaf(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Join `relative` onto the directory of `current_file`, normalizing `.` and `..`.
///
/// Returns `None` when `..` would climb above the repository root.
pub fn join_relative(current_file: &str, relative: &str) -> Option<String> {
    let base = PathBuf::from(parent_dir(current_file));
    let mut normalized = PathBuf::new();
    for component in base.join(relative).components() {
        match component {
            Component::ParentDir => {
                if !normalized.pop() {
                    return None;
                }
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
            Component::Normal(part) => normalized.push(part),
        }
    }
    let joined = path_to_slash(&normalized);
    if joined.is_empty() {
        None
    } else {
        Some(joined)
    }
}

fn path_to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// First of `base` + each extension, then `base/index` + each extension, that exists
pub fn first_existing(all_files: &BTreeSet<String>, base: &str, exts: &[&str]) -> Option<String> {
    if all_files.contains(base) && exts.iter().any(|ext| base.ends_with(ext)) {
        return Some(base.to_string());
    }
    exts.iter()
        .map(|ext| format!("{}{}", base, ext))
        .chain(exts.iter().map(|ext| format!("{}/index{}", base, ext)))
        .find(|candidate| all_files.contains(candidate))
}

/// Collect `(offset, import)` pairs from several patterns and return them in source order
pub fn in_source_order(mut found: Vec<(usize, String)>) -> Vec<String> {
    found.sort_by_key(|(offset, _)| *offset);
    found.into_iter().map(|(_, import)| import).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(paths: &[&str]) -> BTreeSet<String> {
        paths.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_common_prefix_len() {
        assert_eq!(common_prefix_len("src/a/b.rs", "src/a/c.rs"), 6);
        assert_eq!(common_prefix_len("src/a/c.rs", "src/a/b.rs"), 6);
        assert_eq!(common_prefix_len("", "src"), 0);
        assert_eq!(common_prefix_len("lib/x", "src/x"), 0);
    }

    #[test]
    fn test_closest_candidate_prefers_shared_prefix() {
        let picked = closest_candidate(
            "app/billing/Invoice.cs",
            vec!["app/auth/User.cs".into(), "app/billing/User.cs".into()],
        );
        assert_eq!(picked.as_deref(), Some("app/billing/User.cs"));
    }

    #[test]
    fn test_closest_candidate_ties_keep_first() {
        let picked = closest_candidate("x.cs", vec!["a/User.cs".into(), "b/User.cs".into()]);
        assert_eq!(picked.as_deref(), Some("a/User.cs"));
    }

    #[test]
    fn test_path_ends_with_respects_boundary() {
        assert!(path_ends_with("src/models/user.rb", "models/user.rb"));
        assert!(path_ends_with("models/user.rb", "/models/user.rb"));
        assert!(!path_ends_with("src/supermodels/user.rb", "models/user.rb"));
    }

    #[test]
    fn test_join_relative() {
        assert_eq!(
            join_relative("lib/src/a.dart", "../b.dart").as_deref(),
            Some("lib/b.dart")
        );
        assert_eq!(
            join_relative("lib/a.dart", "./util/x.dart").as_deref(),
            Some("lib/util/x.dart")
        );
        assert_eq!(join_relative("a.dart", "../../x.dart"), None);
    }

    #[test]
    fn test_resolve_by_suffix_falls_back_to_leaf() {
        let all = files(&["src/Domain/Order.cs", "tests/Order.cs"]);
        let picked = resolve_by_suffix(
            &all,
            "src/Api/Controller.cs",
            &["Shop/Domain/Order.cs".to_string()],
            &["Order.cs".to_string()],
        );
        assert_eq!(picked.as_deref(), Some("src/Domain/Order.cs"));
    }
}
