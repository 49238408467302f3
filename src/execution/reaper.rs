//! Empty-folder cleanup after a sort.

use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// What the reaper removed
#[derive(Debug, Clone, Default)]
pub struct ReapReport {
    pub removed: Vec<PathBuf>,
    pub failed: usize,
}

/// Delete every empty directory below `base` (never `base` itself or
/// anything in `keep`).
///
/// Deepest directories go first so a parent emptied by removing its children
/// is removed in the same pass. Best effort: failures are logged and counted.
/// `keep` holds folders that were moved as items; an empty one is still data.
pub fn remove_empty_folders(base: &Path, keep: &[PathBuf]) -> ReapReport {
    let mut report = ReapReport::default();

    let mut directories: Vec<(usize, PathBuf)> = WalkDir::new(base)
        .min_depth(1)
        .into_iter()
        // Kept folders are not descended into: their insides belong to them
        .filter_entry(|entry| !keep.iter().any(|k| k == entry.path()))
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::debug!(error = %e, "Skipping unreadable entry during cleanup");
                None
            }
        })
        .filter(|entry| entry.file_type().is_dir())
        .map(|entry| (entry.depth(), entry.into_path()))
        .collect();

    directories.sort_by(|a, b| b.0.cmp(&a.0));

    for (_, dir) in directories {
        let is_empty = match fs::read_dir(&dir) {
            Ok(mut entries) => entries.next().is_none(),
            Err(e) => {
                tracing::debug!(path = %dir.display(), error = %e, "Cannot inspect folder");
                continue;
            }
        };
        if !is_empty {
            continue;
        }

        match fs::remove_dir(&dir) {
            Ok(()) => {
                tracing::debug!(path = %dir.display(), "Removed empty folder");
                report.removed.push(dir);
            }
            Err(e) => {
                tracing::warn!(path = %dir.display(), error = %e, "Failed to remove empty folder");
                report.failed += 1;
            }
        }
    }

    if !report.removed.is_empty() {
        tracing::info!(removed = report.removed.len(), "Removed empty folders");
    }
    report
}
