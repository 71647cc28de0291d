//! Source tree traversal shared by the scanner and the copy strategy.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use jwalk::{Parallelism, WalkDir};

use super::AssetError;

/// One entry below a walked root (the root itself is never yielded).
#[derive(Debug, Clone)]
pub struct WalkEntry {
    pub path: PathBuf,
    pub is_dir: bool,
    pub modified: Option<SystemTime>,
}

/// Walk `root` in sorted, depth-first order.
///
/// Non-recursive walks stop at the first level: subdirectories are yielded
/// but never entered. Any unreadable entry aborts the whole walk.
pub fn walk(root: &Path, recursive: bool) -> Result<Vec<WalkEntry>, AssetError> {
    fs::metadata(root).map_err(|source| AssetError::Walk {
        path: root.to_path_buf(),
        source,
    })?;

    // Requests are already served from a pool, keep the walk on this thread
    let mut walker = WalkDir::new(root)
        .sort(true)
        .skip_hidden(false)
        .parallelism(Parallelism::Serial);
    if !recursive {
        walker = walker.max_depth(1);
    }

    let mut entries = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|err| AssetError::walk(root, err))?;
        if entry.depth == 0 {
            continue;
        }

        let metadata = entry.metadata().map_err(|err| AssetError::walk(root, err))?;
        entries.push(WalkEntry {
            path: entry.path(),
            is_dir: metadata.is_dir(),
            modified: metadata.modified().ok(),
        });
    }

    Ok(entries)
}
