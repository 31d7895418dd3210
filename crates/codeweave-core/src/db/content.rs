//! Content hashing and project identity

use crate::error::Result;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Hash content using SHA-256
pub fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Stable id of a repository: first 16 hex chars of SHA-256 over its canonical path
pub fn project_id(repo_path: impl AsRef<Path>) -> Result<String> {
    let canonical = std::fs::canonicalize(repo_path.as_ref())?;
    let hash = hash_content(&canonical.to_string_lossy());
    Ok(hash.chars().take(16).collect())
}
