//! Folder sorting service.
//!
//! Runs one sort end to end (classification, oracle, plan salvage,
//! execution, history, cleanup) and undoes the latest sort on request.
//! Neither entry point returns an error: failures degrade to
//! `success = false` or to counted per-item failures.

use chrono::{DateTime, Local, Utc};
use fs2::FileExt;
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::ai::{CategorizationOracle, CredentialManager, OracleRequest};
use crate::classifier::{build_structure_summary, classify_folders};
use crate::config::SorterConfig;
use crate::error::{Result, SorterError};
use crate::execution::{execute_plan, remove_empty_folders};
use crate::history::{
    undo_session, ActiveSession, HistoryStore, ItemType, MoveRecord, SessionSlot, UndoResult,
};
use crate::plan::{salvage_plan, SalvageReport};

/// Folder names never offered to the oracle
const IGNORED_FOLDERS: &[&str] = &["__pycache__"];

/// Result of a sort attempt
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SortOutcome {
    /// The pipeline ran to completion (individual items may still have failed)
    pub success: bool,
    pub moves: Vec<MoveRecord>,
    /// Why the attempt failed, when it did
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SortOutcome {
    fn failed(error: &SorterError) -> Self {
        Self {
            success: false,
            moves: Vec::new(),
            error: Some(error.to_string()),
        }
    }
}

/// Top-level entries of the folder being sorted
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Candidates {
    pub files: Vec<String>,
    pub folders: Vec<String>,
}

/// Sort and undo entry points over injected collaborators
pub struct FolderSorter {
    config: SorterConfig,
    oracle: Arc<dyn CategorizationOracle>,
    credentials: CredentialManager,
    store: HistoryStore,
    slot: Arc<SessionSlot>,
    /// Serializes sort and undo within this process
    gate: Mutex<()>,
}

impl FolderSorter {
    /// Build a sorter and prime `slot` from the session the history's undo
    /// pointer names, so a fresh process can still undo a sort made moments ago.
    pub fn new(
        config: SorterConfig,
        oracle: Arc<dyn CategorizationOracle>,
        credentials: CredentialManager,
        slot: Arc<SessionSlot>,
    ) -> Self {
        let store = HistoryStore::new(config.history_dir.clone());

        if slot.snapshot().is_none() {
            match store.undoable_session() {
                Ok(Some(stored)) => {
                    tracing::debug!(path = %stored.path.display(), "Restored last session from history");
                    slot.restore(ActiveSession {
                        session: stored.session,
                        file: Some(stored.path),
                    });
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(error = %e, "Could not read sort history"),
            }
        }

        Self {
            config,
            oracle,
            credentials,
            store,
            slot,
            gate: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &SorterConfig {
        &self.config
    }

    pub fn history(&self) -> &HistoryStore {
        &self.store
    }

    /// Sort the top level of `path`.
    pub async fn sort_folder(&self, path: &Path, use_web_search: bool) -> SortOutcome {
        // Held for the whole attempt; a concurrent sort or undo is refused
        let _gate = match self.gate.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                tracing::warn!(path = %path.display(), "Sort refused, another operation is running");
                return SortOutcome::failed(&SorterError::Busy);
            }
        };
        let _lock = match acquire_process_lock(&self.config.lock_path()) {
            Ok(lock) => lock,
            Err(e) => {
                tracing::warn!(error = %e, "Sort refused");
                return SortOutcome::failed(&e);
            }
        };

        let started_at = Utc::now();
        self.slot.begin(path.to_path_buf(), started_at);

        match self.run_sort(path, use_web_search, started_at).await {
            Ok(moves) => {
                if moves.is_empty() {
                    self.slot.clear();
                }
                SortOutcome {
                    success: true,
                    moves,
                    error: None,
                }
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Sort failed");
                self.slot.clear();
                self.record_undoable(None);
                SortOutcome::failed(&e)
            }
        }
    }

    async fn run_sort(
        &self,
        path: &Path,
        use_web_search: bool,
        started_at: DateTime<Utc>,
    ) -> Result<Vec<MoveRecord>> {
        // Everything up to the oracle call must fail before touching the filesystem
        let base = resolve_base(path)?;
        let api_key = self.credentials.resolve_api_key()?;

        let candidates = list_candidates(&base)?;
        if candidates.files.is_empty() && candidates.folders.is_empty() {
            return Err(SorterError::NothingToSort(base));
        }

        let classification = classify_folders(&candidates.folders);
        tracing::info!(
            base = %base.display(),
            files = candidates.files.len(),
            folders = classification.to_sort.len(),
            categorized = classification.categorized.len(),
            "Sorting folder"
        );
        if candidates.files.is_empty() && classification.to_sort.is_empty() {
            return Err(SorterError::NothingToSort(base));
        }

        let request = OracleRequest {
            files: candidates.files,
            folders: classification.to_sort,
            structure: build_structure_summary(&base, self.config.structure_depth),
            use_web_search,
        };

        let raw = self.oracle.categorize(&api_key, &request).await?;

        let salvaged = salvage_plan(&raw);
        if self.config.save_diagnostics {
            save_diagnostics(&self.config.debug_dir, &salvaged);
        }

        let report = execute_plan(&salvaged.document, &base);

        let mut session = crate::history::SortSession::new(started_at, base.clone());
        session.moves = report.moves;

        // A sort that already moved things is not undone by a history write failure
        let file = match self.store.save_session(&session) {
            Ok(file) => file,
            Err(e) => {
                tracing::error!(error = %e, "Failed to save sort history");
                None
            }
        };

        self.record_undoable(file.as_deref());

        let moved_folders: Vec<PathBuf> = session
            .moves
            .iter()
            .filter(|m| m.item_type == ItemType::Folder)
            .map(|m| m.destination.clone())
            .collect();
        remove_empty_folders(&base, &moved_folders);

        tracing::info!(
            moves = session.moves.len(),
            failed = report.failed_count,
            skipped = report.skipped_count,
            "Sort complete"
        );

        self.slot.complete(session.moves.clone(), file);
        Ok(session.moves)
    }

    /// Persist which session the latest attempt left undoable. Failures are
    /// only logged; the in-process slot stays authoritative.
    fn record_undoable(&self, file: Option<&Path>) {
        if let Err(e) = self.store.set_undoable(file) {
            tracing::warn!(error = %e, "Failed to update undo pointer");
        }
    }

    /// Whether the latest sort can still be undone
    pub fn can_undo(&self) -> bool {
        self.can_undo_at(Utc::now())
    }

    pub fn can_undo_at(&self, now: DateTime<Utc>) -> bool {
        self.slot.can_undo_at(now)
    }

    /// Reverse the latest sort. One-shot: the session is dropped afterwards
    /// regardless of how many items failed.
    pub async fn undo(&self) -> UndoResult {
        self.undo_at(Utc::now()).await
    }

    pub async fn undo_at(&self, now: DateTime<Utc>) -> UndoResult {
        let _gate = match self.gate.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                tracing::warn!("Undo refused, another operation is running");
                return UndoResult::default();
            }
        };
        let _lock = match acquire_process_lock(&self.config.lock_path()) {
            Ok(lock) => lock,
            Err(e) => {
                tracing::warn!(error = %e, "Undo refused");
                return UndoResult::default();
            }
        };

        if !self.slot.can_undo_at(now) {
            tracing::info!("Nothing to undo, no recent sort or the undo window has passed");
            return UndoResult::default();
        }
        let active = match self.slot.take() {
            Some(active) => active,
            None => return UndoResult::default(),
        };

        let result = undo_session(&active.session);
        self.record_undoable(None);

        let restored_folders: Vec<PathBuf> = active
            .session
            .moves
            .iter()
            .filter(|m| m.item_type == ItemType::Folder)
            .map(|m| m.source.clone())
            .collect();
        remove_empty_folders(&active.session.base_path, &restored_folders);

        if let Some(file) = &active.file {
            if let Err(e) = self
                .store
                .mark_undone(file, result.success_count, result.fail_count)
            {
                tracing::warn!(error = %e, "Failed to mark session as undone");
            }
        }

        result
    }
}

/// Validate the folder to sort, returning its canonical path
fn resolve_base(path: &Path) -> Result<PathBuf> {
    if path.as_os_str().is_empty() {
        return Err(SorterError::MissingFolder);
    }
    if !path.is_dir() {
        return Err(SorterError::NotADirectory(path.to_path_buf()));
    }
    Ok(path.canonicalize()?)
}

/// Top-level files and folders of `base`, sorted by name.
///
/// Hidden folders and `__pycache__` are left out.
pub fn list_candidates(base: &Path) -> Result<Candidates> {
    let mut candidates = Candidates::default();

    for entry in fs::read_dir(base)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!(error = %e, "Skipping unreadable entry");
                continue;
            }
        };
        let file_type = match entry.file_type() {
            Ok(file_type) => file_type,
            Err(_) => continue,
        };
        let name = entry.file_name().to_string_lossy().to_string();

        if file_type.is_file() {
            candidates.files.push(name);
        } else if file_type.is_dir() {
            if name.starts_with('.') || IGNORED_FOLDERS.contains(&name.as_str()) {
                continue;
            }
            candidates.folders.push(name);
        }
    }

    candidates.files.sort();
    candidates.folders.sort();
    Ok(candidates)
}

/// Write each salvage stage's text to `debug_dir`. Failures are only logged.
fn save_diagnostics(debug_dir: &Path, report: &SalvageReport) {
    if let Err(e) = fs::create_dir_all(debug_dir) {
        tracing::warn!(path = %debug_dir.display(), error = %e, "Cannot create debug directory");
        return;
    }

    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    for stage in &report.trace {
        let path = debug_dir.join(format!("{}_{}.txt", stage.stage.label(), stamp));
        if let Err(e) = fs::write(&path, &stage.text) {
            tracing::warn!(path = %path.display(), error = %e, "Failed to write diagnostics");
        }
    }
}

/// Exclusive lock on the lock file, held until the returned file is dropped
fn acquire_process_lock(lock_path: &Path) -> Result<File> {
    if let Some(parent) = lock_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let lock_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(lock_path)?;

    match lock_file.try_lock_exclusive() {
        Ok(()) => Ok(lock_file),
        Err(e) if e.kind() == fs2::lock_contended_error().kind() => Err(SorterError::Busy),
        Err(e) => Err(e.into()),
    }
}
