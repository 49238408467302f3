//! Folder classification and existing-structure summary.
//!
//! Separates already-categorized folders from folders that still need
//! sorting, and walks the base directory (bounded depth) to give the
//! oracle a picture of what is already organized.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Folder names treated as already-organized categories
pub const CATEGORY_VOCABULARY: &[&str] = &[
    "Documents",
    "Music",
    "Pictures",
    "Videos",
    "Games",
    "Applications",
    "Software",
    "Development",
    "Projects",
    "Work",
    "Personal",
    "Archives",
    "Torrents",
    "Torrent",
    "Books",
    "PDFs",
    "Install Files",
    "Programs",
    "Installers",
    "Temp",
    "Images",
];

/// Key used for the base directory in the structure summary
pub const ROOT_KEY: &str = ".";

/// Result of classifying one directory level
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FolderClassification {
    pub categorized: Vec<String>,
    pub to_sort: Vec<String>,
}

/// Existing folder structure: relative folder path -> immediate subfolder names
pub type StructureSummary = BTreeMap<String, Vec<String>>;

/// Whether a folder name equals or starts with a category name (case-insensitive)
pub fn is_category_folder(name: &str) -> bool {
    let lower = name.to_lowercase();
    CATEGORY_VOCABULARY.iter().any(|category| {
        let category = category.to_lowercase();
        lower == category || lower.starts_with(&category)
    })
}

/// Split folder names into already-categorized and to-sort, preserving input order
pub fn classify_folders<S: AsRef<str>>(folders: &[S]) -> FolderClassification {
    let mut result = FolderClassification::default();
    for folder in folders {
        let folder = folder.as_ref();
        if is_category_folder(folder) {
            result.categorized.push(folder.to_string());
        } else {
            result.to_sort.push(folder.to_string());
        }
    }
    result
}

/// Build the existing-structure summary for `base`, walking at most `max_depth`
/// levels below it.
///
/// Directories that vanish or cannot be read are logged and skipped. A folder
/// matching the category vocabulary has its immediate subfolders recorded but
/// is not descended into further.
pub fn build_structure_summary(base: &Path, max_depth: usize) -> StructureSummary {
    explore(base, ROOT_KEY, 0, max_depth, true)
}

fn explore(
    dir: &Path,
    relative: &str,
    depth: usize,
    max_depth: usize,
    descend: bool,
) -> StructureSummary {
    let mut summary = StructureSummary::new();
    if depth > max_depth {
        return summary;
    }

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!(path = %dir.display(), error = %e, "Skipping unreadable folder");
            return summary;
        }
    };

    let mut subfolders = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!(path = %dir.display(), error = %e, "Skipping unreadable entry");
                continue;
            }
        };
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        if !is_dir {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') {
            continue;
        }
        subfolders.push(name);
    }
    subfolders.sort();

    if descend {
        for name in &subfolders {
            let child_relative = if relative == ROOT_KEY {
                name.clone()
            } else {
                format!("{}/{}", relative, name)
            };
            // Category folders get one listing level and no deeper walk
            let child_descends = !is_category_folder(name);
            let child = explore(
                &dir.join(name),
                &child_relative,
                depth + 1,
                max_depth,
                child_descends,
            );
            summary.extend(child);
        }
    }

    summary.insert(relative.to_string(), subfolders);
    summary
}
