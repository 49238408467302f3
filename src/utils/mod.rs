//! Shared utility functions
//!
//! Common filesystem helpers used by the history store, settings and
//! the executor.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Atomically write pretty JSON to a file
///
/// Writes to a sibling temp file, fsyncs it, then renames over the target.
pub fn atomic_write_json<T: serde::Serialize>(path: &Path, data: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension("tmp");
    let file = File::create(&temp_path)?;
    let mut writer = BufWriter::new(file);

    serde_json::to_writer_pretty(&mut writer, data)?;
    writer.flush()?;
    writer.get_ref().sync_all()?;

    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(e.into());
    }

    Ok(())
}

/// Move a file or directory, falling back to copy + delete across filesystems.
///
/// Never overwrites: an existing destination is an error.
pub fn move_path(source: &Path, destination: &Path) -> std::io::Result<()> {
    if destination.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!("Destination already exists: {}", destination.display()),
        ));
    }

    if let Some(parent) = destination.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    // Try rename first (same filesystem), fall back to copy+delete
    if fs::rename(source, destination).is_err() {
        if source.is_dir() {
            copy_dir_all(source, destination)?;
            fs::remove_dir_all(source)?;
        } else {
            fs::copy(source, destination)?;
            fs::remove_file(source)?;
        }
    }
    Ok(())
}

/// Copy a directory recursively
fn copy_dir_all(src: &Path, dst: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dst)?;

    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if entry.file_type()?.is_dir() {
            copy_dir_all(&src_path, &dst_path)?;
        } else {
            fs::copy(&src_path, &dst_path)?;
        }
    }

    Ok(())
}

/// Return `base/name_N` for the first N >= 1 that does not exist yet.
///
/// Used for folders, so the suffix goes after the whole name.
pub fn unique_dir_path(original: &Path) -> PathBuf {
    let parent = original.parent().unwrap_or(Path::new("."));
    let name = original
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "folder".to_string());

    let mut counter = 1;
    loop {
        let candidate = parent.join(format!("{}_{}", name, counter));
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
        if counter > 1000 {
            return parent.join(format!("{}_{}", name, uuid::Uuid::new_v4()));
        }
    }
}

/// Return `stem_N.ext` for the first N >= 1 that does not exist yet.
pub fn unique_file_path(original: &Path) -> PathBuf {
    let parent = original.parent().unwrap_or(Path::new("."));
    let stem = original
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "file".to_string());
    let ext = original
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut counter = 1;
    loop {
        let candidate = parent.join(format!("{}_{}{}", stem, counter, ext));
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
        if counter > 1000 {
            return parent.join(format!("{}_{}{}", stem, uuid::Uuid::new_v4(), ext));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_atomic_write_json_creates_parent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("data.json");

        atomic_write_json(&path, &serde_json::json!({"a": 1})).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"a\": 1"));
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_move_path_refuses_to_overwrite() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        fs::write(&a, "a").unwrap();
        fs::write(&b, "b").unwrap();

        let err = move_path(&a, &b).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::AlreadyExists);
        assert_eq!(fs::read_to_string(&b).unwrap(), "b");
        assert!(a.exists());
    }

    #[test]
    fn test_move_path_creates_parent() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.txt");
        fs::write(&a, "a").unwrap();
        let dest = dir.path().join("x").join("y").join("a.txt");

        move_path(&a, &dest).unwrap();

        assert!(!a.exists());
        assert_eq!(fs::read_to_string(&dest).unwrap(), "a");
    }

    #[test]
    fn test_unique_dir_path_appends_numeric_suffix() {
        let dir = tempdir().unwrap();
        let taken = dir.path().join("Project");
        fs::create_dir(&taken).unwrap();
        fs::create_dir(dir.path().join("Project_1")).unwrap();

        assert_eq!(unique_dir_path(&taken), dir.path().join("Project_2"));
    }

    #[test]
    fn test_unique_file_path_keeps_extension() {
        let dir = tempdir().unwrap();
        let taken = dir.path().join("notes.txt");
        fs::write(&taken, "x").unwrap();

        assert_eq!(unique_file_path(&taken), dir.path().join("notes_1.txt"));
    }
}
