use std::collections::{BTreeSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{ImportError, Result};

/// Directories below the search root deeper than this are never visited.
pub const MAX_SEARCH_DEPTH: usize = 8;

pub fn has_required_files(dir: &Path, required: &[&str]) -> bool {
    required.iter().all(|name| dir.join(name).is_file())
}

/// Finds every directory under `root` that holds all `required` files.
///
/// A qualifying root is returned alone. Otherwise the walk is breadth-first,
/// skips hidden entries, and stops descending at the first qualifying
/// directory on each branch. Paths come back canonicalized and sorted.
pub fn collect_dataset_dirs(root: &Path, required: &[&str]) -> Vec<PathBuf> {
    let root = fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());
    if has_required_files(&root, required) {
        return vec![root];
    }

    let mut found = BTreeSet::new();
    let mut queue = VecDeque::from([(root, 0usize)]);

    while let Some((current, depth)) = queue.pop_front() {
        let entries = match fs::read_dir(&current) {
            Ok(entries) => entries,
            Err(err) => {
                debug!(path = %current.display(), error = %err, "skipping unreadable directory");
                continue;
            }
        };

        for entry in entries.flatten() {
            if entry.file_name().to_string_lossy().starts_with('.') {
                continue;
            }
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            if has_required_files(&path, required) {
                found.insert(fs::canonicalize(&path).unwrap_or(path));
            } else if depth + 1 < MAX_SEARCH_DEPTH {
                queue.push_back((path, depth + 1));
            }
        }
    }

    found.into_iter().collect()
}

/// Like [`collect_dataset_dirs`] but an empty result is an error.
pub fn require_datasets(root: &Path, required: &[&str], scope: &str) -> Result<Vec<PathBuf>> {
    let dirs = collect_dataset_dirs(root, required);
    if dirs.is_empty() {
        return Err(ImportError::DatasetNotFound {
            scope: scope.to_string(),
            root: root.to_path_buf(),
        });
    }
    Ok(dirs)
}

pub fn require_single_dataset(root: &Path, required: &[&str], scope: &str) -> Result<PathBuf> {
    let mut dirs = require_datasets(root, required, scope)?;
    if dirs.len() > 1 {
        return Err(ImportError::AmbiguousDataset {
            scope: scope.to_string(),
            root: root.to_path_buf(),
            found: dirs.len(),
        });
    }
    Ok(dirs.remove(0))
}
