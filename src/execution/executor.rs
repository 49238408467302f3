//! Move Planner & Executor
//!
//! Applies a categorization plan to the base directory and produces the
//! move ledger. Moves run strictly in document order: duplicate handling,
//! collision renaming and the overflow pass all depend on it.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::OVERFLOW_FOLDER;
use crate::history::{ItemType, MoveRecord};
use crate::plan::{CategorizationDocument, PlanEntry, PlanSection};
use crate::utils::{move_path, unique_dir_path, unique_file_path};

/// Policy for handling an existing destination path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Leave both in place and count the item as failed
    Fail,
    /// Generate unique name (_1, _2, etc.) and proceed
    AutoRename,
}

impl ConflictPolicy {
    fn for_type(item_type: ItemType) -> Self {
        match item_type {
            ItemType::File => ConflictPolicy::Fail,
            ItemType::Folder => ConflictPolicy::AutoRename,
        }
    }
}

/// Outcome of a single planned item
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    /// Moved to the planned path
    Completed(MoveRecord),
    /// Moved, but to a suffixed path because the planned one was taken
    CompletedWithRename(MoveRecord),
    /// Not attempted (includes reason)
    Skipped(String),
}

/// Result of applying a plan
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionReport {
    /// Executed moves in order, overflow moves last
    pub moves: Vec<MoveRecord>,
    /// Moves to the overflow folder (also included in `moves`)
    pub overflow_count: usize,
    /// Number of folder moves completed with a collision suffix
    pub renamed_count: usize,
    /// Number of items that were attempted and failed
    pub failed_count: usize,
    /// Number of items skipped (duplicates, missing sources, bad names)
    pub skipped_count: usize,
    /// Error messages from failed items
    pub errors: Vec<String>,
    /// Reasons for skipped items
    pub skipped: Vec<String>,
}

impl ExecutionReport {
    fn record_outcome(&mut self, outcome: Result<ExecutionOutcome, String>) {
        match outcome {
            Ok(ExecutionOutcome::Completed(record)) => self.moves.push(record),
            Ok(ExecutionOutcome::CompletedWithRename(record)) => {
                self.renamed_count += 1;
                self.moves.push(record);
            }
            Ok(ExecutionOutcome::Skipped(reason)) => {
                tracing::info!(reason = %reason, "Skipped item");
                self.skipped_count += 1;
                self.skipped.push(reason);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Move failed");
                self.failed_count += 1;
                self.errors.push(e);
            }
        }
    }
}

/// Applies plans to one base directory
pub struct PlanExecutor {
    base: PathBuf,
    moved_files: HashSet<String>,
    moved_folders: HashSet<String>,
    report: ExecutionReport,
}

impl PlanExecutor {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            moved_files: HashSet::new(),
            moved_folders: HashSet::new(),
            report: ExecutionReport::default(),
        }
    }

    /// Apply `document` and sweep leftovers into the overflow folder.
    ///
    /// Never fails as a whole: each item's error is caught, logged and counted.
    pub fn execute(mut self, document: &CategorizationDocument) -> ExecutionReport {
        let top_level_files = list_top_level_files(&self.base);

        let files = dedupe_section(document, PlanSection::Files);
        let folders = dedupe_section(document, PlanSection::Folders);

        tracing::info!(
            base = %self.base.display(),
            file_destinations = files.len(),
            folder_destinations = folders.len(),
            "Executing plan"
        );

        for entry in &files {
            self.apply_entry(entry, ItemType::File);
        }
        for entry in &folders {
            self.apply_entry(entry, ItemType::Folder);
        }

        self.sweep_overflow(&top_level_files);

        tracing::info!(
            moved = self.report.moves.len(),
            overflow = self.report.overflow_count,
            renamed = self.report.renamed_count,
            failed = self.report.failed_count,
            skipped = self.report.skipped_count,
            "Plan executed"
        );

        self.report
    }

    fn apply_entry(&mut self, entry: &PlanEntry, item_type: ItemType) {
        let target_folder = match normalize_destination(&entry.destination) {
            Some(target) => target,
            None => {
                for _ in &entry.items {
                    self.report.record_outcome(Ok(ExecutionOutcome::Skipped(format!(
                        "Unusable destination \"{}\"",
                        entry.destination
                    ))));
                }
                return;
            }
        };

        let destination_dir = join_relative(&self.base, &target_folder);

        // Ensure the destination exists before any item is moved into it
        if let Err(e) = fs::create_dir_all(&destination_dir) {
            for item in &entry.items {
                self.report.record_outcome(Err(format!(
                    "Cannot create {} for {}: {}",
                    destination_dir.display(),
                    item,
                    e
                )));
            }
            return;
        }

        for item in &entry.items {
            let outcome = self.move_item(item, &destination_dir, &target_folder, item_type);
            self.report.record_outcome(outcome);
        }
    }

    fn move_item(
        &mut self,
        item: &str,
        destination_dir: &Path,
        target_folder: &str,
        item_type: ItemType,
    ) -> Result<ExecutionOutcome, String> {
        if !is_plain_name(item) {
            return Ok(ExecutionOutcome::Skipped(format!(
                "Invalid item name \"{}\"",
                item
            )));
        }

        let moved = match item_type {
            ItemType::File => &self.moved_files,
            ItemType::Folder => &self.moved_folders,
        };
        if moved.contains(item) {
            return Ok(ExecutionOutcome::Skipped(format!("{} already moved", item)));
        }

        let source = self.base.join(item);
        let source_present = match item_type {
            ItemType::File => source.is_file(),
            ItemType::Folder => source.is_dir(),
        };
        if !source_present {
            return Ok(ExecutionOutcome::Skipped(format!(
                "{} {} not found in {}",
                item_type,
                item,
                self.base.display()
            )));
        }

        if item_type == ItemType::Folder && destination_dir.starts_with(&source) {
            return Err(format!(
                "Cannot move folder {} into itself ({})",
                item, target_folder
            ));
        }

        let planned = destination_dir.join(item);
        let (destination, renamed) = if planned.exists() {
            match ConflictPolicy::for_type(item_type) {
                ConflictPolicy::Fail => {
                    return Err(format!(
                        "Destination already exists: {}",
                        planned.display()
                    ));
                }
                ConflictPolicy::AutoRename => (unique_dir_path(&planned), true),
            }
        } else {
            (planned, false)
        };

        move_path(&source, &destination)
            .map_err(|e| format!("Failed to move {}: {}", item, e))?;

        tracing::debug!(
            item = %item,
            target = %target_folder,
            destination = %destination.display(),
            "Moved"
        );

        match item_type {
            ItemType::File => self.moved_files.insert(item.to_string()),
            ItemType::Folder => self.moved_folders.insert(item.to_string()),
        };

        let record = MoveRecord {
            source,
            destination,
            item: item.to_string(),
            target_folder: target_folder.to_string(),
            item_type,
        };
        Ok(if renamed {
            ExecutionOutcome::CompletedWithRename(record)
        } else {
            ExecutionOutcome::Completed(record)
        })
    }

    /// Move every pre-existing top-level file the plan did not claim into
    /// the overflow folder.
    fn sweep_overflow(&mut self, top_level_files: &[OsString]) {
        // Plan items are UTF-8, so the moved set is matched on the lossy form
        let leftovers: Vec<&OsString> = top_level_files
            .iter()
            .filter(|name| !self.moved_files.contains(name.to_string_lossy().as_ref()))
            .filter(|name| self.base.join(name).is_file())
            .collect();

        if leftovers.is_empty() {
            return;
        }

        let overflow_dir = self.base.join(OVERFLOW_FOLDER);
        if let Err(e) = fs::create_dir_all(&overflow_dir) {
            for name in leftovers {
                self.report.record_outcome(Err(format!(
                    "Cannot create {} for {}: {}",
                    overflow_dir.display(),
                    name.to_string_lossy(),
                    e
                )));
            }
            return;
        }

        for name in leftovers {
            let source = self.base.join(name);
            let mut destination = overflow_dir.join(name);
            if destination.exists() {
                destination = unique_file_path(&destination);
            }

            let item = name.to_string_lossy().to_string();
            match move_path(&source, &destination) {
                Ok(()) => {
                    tracing::debug!(item = %item, "Moved to overflow");
                    self.moved_files.insert(item.clone());
                    self.report.overflow_count += 1;
                    self.report.moves.push(MoveRecord {
                        source,
                        destination,
                        item,
                        target_folder: OVERFLOW_FOLDER.to_string(),
                        item_type: ItemType::File,
                    });
                }
                Err(e) => {
                    self.report
                        .record_outcome(Err(format!("Failed to move {} to overflow: {}", item, e)));
                }
            }
        }
    }
}

/// Convenience wrapper: apply `document` to `base`
pub fn execute_plan(document: &CategorizationDocument, base: &Path) -> ExecutionReport {
    PlanExecutor::new(base).execute(document)
}

/// Drop repeat listings of an item within a section, keeping the first
/// destination. Entries keep document order.
fn dedupe_section(document: &CategorizationDocument, section: PlanSection) -> Vec<PlanEntry> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut entries = Vec::new();

    for entry in document.section(section) {
        let mut items = Vec::with_capacity(entry.items.len());
        for item in &entry.items {
            if seen.insert(item.as_str()) {
                items.push(item.clone());
            } else {
                tracing::warn!(
                    section = %section,
                    item = %item,
                    ignored = %entry.destination,
                    "Duplicate item in plan, keeping first destination"
                );
            }
        }
        entries.push(PlanEntry {
            destination: entry.destination.clone(),
            items,
        });
    }
    entries
}

/// Normalize a destination key to a relative `/`-separated path.
///
/// Backslashes become separators; empty, `.` and `..` segments are dropped.
/// Returns `None` when nothing is left.
pub fn normalize_destination(destination: &str) -> Option<String> {
    let segments: Vec<&str> = destination
        .split(['/', '\\'])
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .collect();

    if segments.is_empty() {
        None
    } else {
        Some(segments.join("/"))
    }
}

fn join_relative(base: &Path, relative: &str) -> PathBuf {
    relative
        .split('/')
        .fold(base.to_path_buf(), |path, segment| path.join(segment))
}

/// A bare entry name: no separators, not `.` or `..`
fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
}

/// Top-level file names as the filesystem reports them, so names that are not
/// valid UTF-8 can still be moved
fn list_top_level_files(base: &Path) -> Vec<OsString> {
    let entries = match fs::read_dir(base) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(path = %base.display(), error = %e, "Cannot list base directory");
            return Vec::new();
        }
    };

    let mut files: Vec<OsString> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|entry| entry.file_name())
        .collect();
    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::document::KeyRequirement;
    use serde_json::json;
    use tempfile::tempdir;

    fn plan(value: serde_json::Value) -> CategorizationDocument {
        CategorizationDocument::from_value(&value, KeyRequirement::Both).unwrap()
    }

    fn top_level(base: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(base)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_example_scenario() {
        let dir = tempdir().unwrap();
        let base = dir.path();
        fs::write(base.join("report.docx"), "r").unwrap();
        fs::write(base.join("skyrim_mod.zip"), "s").unwrap();
        fs::create_dir(base.join("Minecraft_Server")).unwrap();
        fs::write(base.join("Minecraft_Server/server.jar"), "j").unwrap();

        let document = plan(json!({
            "files": {
                "Documents/Work": ["report.docx"],
                "Games/Skyrim/Mods": ["skyrim_mod.zip"]
            },
            "folders": {"Games/Minecraft": ["Minecraft_Server"]}
        }));

        let report = execute_plan(&document, base);

        assert_eq!(report.moves.len(), 3);
        assert_eq!(report.failed_count, 0);
        assert!(base.join("Documents/Work/report.docx").is_file());
        assert!(base.join("Games/Skyrim/Mods/skyrim_mod.zip").is_file());
        assert!(base.join("Games/Minecraft/Minecraft_Server/server.jar").is_file());
        assert_eq!(top_level(base), vec!["Documents", "Games"]);

        let folder_move = &report.moves[2];
        assert_eq!(folder_move.item_type, ItemType::Folder);
        assert_eq!(folder_move.target_folder, "Games/Minecraft");
        assert_eq!(folder_move.source, base.join("Minecraft_Server"));
    }

    #[test]
    fn test_duplicate_moves_once_to_first_destination() {
        let dir = tempdir().unwrap();
        let base = dir.path();
        fs::write(base.join("a.txt"), "a").unwrap();

        let document = plan(json!({
            "files": {"First": ["a.txt"], "Second": ["a.txt"]},
            "folders": {}
        }));

        let report = execute_plan(&document, base);

        assert_eq!(report.moves.len(), 1);
        assert!(base.join("First/a.txt").is_file());
        assert!(!base.join("Second/a.txt").exists());
    }

    #[test]
    fn test_folder_collision_gets_numeric_suffix() {
        let dir = tempdir().unwrap();
        let base = dir.path();
        fs::create_dir_all(base.join("Projects/app")).unwrap();
        fs::write(base.join("Projects/app/old.txt"), "old").unwrap();
        fs::create_dir(base.join("app")).unwrap();
        fs::write(base.join("app/new.txt"), "new").unwrap();

        let document = plan(json!({"files": {}, "folders": {"Projects": ["app"]}}));

        let report = execute_plan(&document, base);

        assert_eq!(report.renamed_count, 1);
        let record = &report.moves[0];
        assert_eq!(record.destination, base.join("Projects/app_1"));
        assert_eq!(record.source, base.join("app"));
        assert!(base.join("Projects/app/old.txt").is_file());
        assert!(base.join("Projects/app_1/new.txt").is_file());
    }

    #[test]
    fn test_existing_file_destination_falls_through_to_overflow() {
        let dir = tempdir().unwrap();
        let base = dir.path();
        fs::create_dir(base.join("Documents")).unwrap();
        fs::write(base.join("Documents/a.txt"), "already there").unwrap();
        fs::write(base.join("a.txt"), "incoming").unwrap();

        let document = plan(json!({"files": {"Documents": ["a.txt"]}, "folders": {}}));

        let report = execute_plan(&document, base);

        assert_eq!(report.failed_count, 1);
        assert_eq!(
            fs::read_to_string(base.join("Documents/a.txt")).unwrap(),
            "already there"
        );
        assert_eq!(
            fs::read_to_string(base.join("Unsorted/a.txt")).unwrap(),
            "incoming"
        );
        assert_eq!(report.overflow_count, 1);
    }

    #[test]
    fn test_unclaimed_files_go_to_overflow() {
        let dir = tempdir().unwrap();
        let base = dir.path();
        fs::write(base.join("planned.txt"), "p").unwrap();
        fs::write(base.join("stray.bin"), "s").unwrap();
        fs::create_dir(base.join("Unsorted")).unwrap();
        fs::write(base.join("Unsorted/stray.bin"), "older").unwrap();

        let document = plan(json!({"files": {"Docs": ["planned.txt"]}, "folders": {}}));

        let report = execute_plan(&document, base);

        assert_eq!(report.moves.len(), 2);
        let overflow = report.moves.last().unwrap();
        assert_eq!(overflow.target_folder, "Unsorted");
        assert_eq!(overflow.destination, base.join("Unsorted/stray_1.bin"));
        assert_eq!(top_level(base), vec!["Docs", "Unsorted"]);
    }

    #[test]
    fn test_missing_and_invalid_items_are_skipped() {
        let dir = tempdir().unwrap();
        let base = dir.path();
        fs::write(base.join("real.txt"), "r").unwrap();

        let document = plan(json!({
            "files": {"Docs": ["ghost.txt", "../escape.txt", "real.txt"]},
            "folders": {"Docs": ["real.txt"]}
        }));

        let report = execute_plan(&document, base);

        assert_eq!(report.moves.len(), 1);
        // ghost, escape, and the file listed as a folder
        assert_eq!(report.skipped_count, 3);
        assert!(base.join("Docs/real.txt").is_file());
    }

    #[test]
    fn test_folder_into_itself_is_a_failure() {
        let dir = tempdir().unwrap();
        let base = dir.path();
        fs::create_dir(base.join("stuff")).unwrap();

        let document = plan(json!({"files": {}, "folders": {"stuff/inner": ["stuff"]}}));

        let report = execute_plan(&document, base);

        assert_eq!(report.failed_count, 1);
        assert!(report.moves.is_empty());
        assert!(base.join("stuff").is_dir());
    }

    #[test]
    fn test_duplicate_folder_moves_once_to_first_destination() {
        let dir = tempdir().unwrap();
        let base = dir.path();
        fs::create_dir(base.join("python_project")).unwrap();
        fs::write(base.join("python_project/main.py"), "print()").unwrap();

        let document = plan(json!({
            "files": {},
            "folders": {
                "Development/Python": ["python_project"],
                "Projects/Old": ["python_project"]
            }
        }));

        let report = execute_plan(&document, base);

        assert_eq!(report.moves.len(), 1);
        assert_eq!(report.failed_count, 0);
        assert_eq!(report.moves[0].target_folder, "Development/Python");
        assert!(base.join("Development/Python/python_project/main.py").is_file());
        assert!(!base.join("Projects/Old/python_project").exists());
    }

    // Linux filesystems accept arbitrary bytes in names; macOS ones do not
    #[cfg(target_os = "linux")]
    #[test]
    fn test_non_utf8_file_still_reaches_overflow() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempdir().unwrap();
        let base = dir.path();
        let name = OsStr::from_bytes(b"bad\xff.txt");
        fs::write(base.join(name), "x").unwrap();

        let report = execute_plan(&CategorizationDocument::empty(), base);

        assert_eq!(report.overflow_count, 1);
        assert!(base.join("Unsorted").join(name).is_file());
        assert!(!base.join(name).exists());
        assert_eq!(report.moves[0].source, base.join(name));
    }

    #[test]
    fn test_normalize_destination() {
        assert_eq!(normalize_destination("Games\\Skyrim/"), Some("Games/Skyrim".to_string()));
        assert_eq!(normalize_destination("/../Docs/./Work"), Some("Docs/Work".to_string()));
        assert_eq!(normalize_destination("../.."), None);
        assert_eq!(normalize_destination(""), None);
    }

    #[test]
    fn test_empty_plan_still_sweeps_overflow() {
        let dir = tempdir().unwrap();
        let base = dir.path();
        fs::write(base.join("x.txt"), "x").unwrap();
        fs::create_dir(base.join("SomeFolder")).unwrap();

        let report = execute_plan(&CategorizationDocument::empty(), base);

        assert_eq!(report.overflow_count, 1);
        assert!(base.join("Unsorted/x.txt").is_file());
        assert!(base.join("SomeFolder").is_dir());
    }
}
