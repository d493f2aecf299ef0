//! Canonical asset paths used to deduplicate materials.

use std::path::{Component, Path, PathBuf};

/// Canonical form of an asset path.
///
/// Existing files resolve through the filesystem (symlinks, `..`). Paths that
/// do not exist locally, such as those inside a template written on another
/// machine, are made absolute and cleaned lexically so equal spellings still
/// compare equal.
pub fn canonical_path(path: &Path) -> PathBuf {
    if let Ok(resolved) = std::fs::canonicalize(path) {
        return resolved;
    }
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut cleaned = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                cleaned.pop();
            }
            other => cleaned.push(other.as_os_str()),
        }
    }
    cleaned
}
