//! Project folders written by the translators.
//!
//! A folder is held through a lock file for the whole write and released
//! when the handle is dropped, also on error paths. Every file is written
//! to a temporary sibling and renamed into place.

use crate::error::DragonflyError;
use anyhow::{Context, Result};
use log::debug;
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub const LOCK_FILE: &str = ".dragonfly.lock";

fn fs_failure(action: &str, path: &Path, err: std::io::Error) -> anyhow::Error {
    DragonflyError::ExternalFailure(format!("Failed to {} {}: {}", action, path.display(), err)).into()
}

/// Writes `bytes` to `path` through a temporary file and a rename.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| DragonflyError::InvalidInput(format!("{} is not a file path", path.display())))?;
    let tmp = path.with_file_name(format!(".{}.tmp", name));
    let result = (|| -> Result<()> {
        let file = File::create(&tmp).map_err(|e| fs_failure("create", &tmp, e))?;
        let mut writer = BufWriter::new(file);
        writer.write_all(bytes).map_err(|e| fs_failure("write", &tmp, e))?;
        writer
            .into_inner()
            .map_err(|e| fs_failure("flush", &tmp, e.into_error()))?
            .sync_all()
            .map_err(|e| fs_failure("sync", &tmp, e))?;
        fs::rename(&tmp, path).map_err(|e| fs_failure("rename", path, e))?;
        Ok(())
    })();
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

/// Exclusive hold on a project folder.
#[derive(Debug)]
pub struct ProjectFolder {
    root: PathBuf,
    lock: PathBuf,
}

impl ProjectFolder {
    /// Creates the folder if needed and takes its lock.
    ///
    /// Fails with `ExternalFailure` when another writer holds the lock.
    pub fn acquire(root: &Path) -> Result<Self> {
        fs::create_dir_all(root).map_err(|e| fs_failure("create folder", root, e))?;
        let lock = root.join(LOCK_FILE);
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock)
            .map_err(|e| fs_failure("lock", root, e))?;
        writeln!(file, "{}", std::process::id()).with_context(|| format!("Failed to write {}", lock.display()))?;
        debug!("Locked project folder {}", root.display());
        Ok(Self {
            root: root.to_path_buf(),
            lock,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.root.join(relative)
    }

    /// Writes a file below the root, creating parent folders.
    pub fn write(&self, relative: impl AsRef<Path>, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| fs_failure("create folder", parent, e))?;
        }
        write_atomic(&path, bytes)?;
        Ok(path)
    }

    pub fn write_json<T: Serialize + ?Sized>(&self, relative: impl AsRef<Path>, value: &T) -> Result<PathBuf> {
        let bytes = serde_json::to_vec_pretty(value).context("Failed to serialize JSON")?;
        self.write(relative, &bytes)
    }
}

impl Drop for ProjectFolder {
    fn drop(&mut self) {
        if fs::remove_file(&self.lock).is_ok() {
            debug!("Released project folder {}", self.root.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_released_on_drop() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let root = dir.path().join("district");
        {
            let project = ProjectFolder::acquire(&root)?;
            assert!(root.join(LOCK_FILE).exists());
            let err = ProjectFolder::acquire(&root).unwrap_err();
            assert!(matches!(crate::error::kind(&err), Some(DragonflyError::ExternalFailure(_))));
            let path = project.write_json("hb_json/Office.json", &serde_json::json!({"a": 1}))?;
            assert!(path.exists());
            assert!(!root.join("hb_json/.Office.json.tmp").exists());
        }
        assert!(!root.join(LOCK_FILE).exists());
        ProjectFolder::acquire(&root)?;
        Ok(())
    }

    #[test]
    fn test_write_atomic_replaces() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("scenario.csv");
        write_atomic(&path, b"old")?;
        write_atomic(&path, b"new")?;
        assert_eq!(fs::read_to_string(&path)?, "new");
        Ok(())
    }
}
