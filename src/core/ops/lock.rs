//! core::ops::lock
//!
//! Exclusive working-tree lock for content mutations.
//!
//! Publish, resync and content writes all mutate the same checkout. Two of
//! them interleaving (say a `reset --hard` between `add` and `commit`) would
//! leave the tree in a state neither asked for, so each holds this lock for
//! its whole duration.
//!
//! # Invariants
//!
//! - Acquisition is non-blocking: a held lock fails fast with
//!   [`LockError::AlreadyLocked`]
//! - The lock is released on drop
//! - The lock file lives in the git dir and never appears in the change set
//!
//! # Example
//!
//! ```no_run
//! use sitecms::core::ops::lock::WorktreeLock;
//! use sitecms::core::paths::SitePaths;
//! use std::path::Path;
//!
//! let paths = SitePaths::discover(Path::new("/srv/site"));
//! let _lock = WorktreeLock::acquire(&paths)?;
//! // mutate the working tree
//! # Ok::<(), sitecms::core::ops::lock::LockError>(())
//! ```

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;

use crate::core::paths::SitePaths;

/// Errors from locking operations.
#[derive(Debug, Error)]
pub enum LockError {
    /// Another operation already holds the lock.
    #[error("another content operation is in progress")]
    AlreadyLocked,

    /// Failed to create the lock file or its directory.
    #[error("failed to create lock: {0}")]
    CreateFailed(String),

    /// Failed to acquire the OS lock.
    #[error("failed to acquire lock: {0}")]
    AcquireFailed(String),
}

/// An exclusive lock on the site working tree, released on drop.
#[derive(Debug)]
pub struct WorktreeLock {
    path: PathBuf,
    file: Option<File>,
}

impl WorktreeLock {
    /// Try to take the lock at `<git dir>/sitecms/lock`.
    ///
    /// # Errors
    ///
    /// - [`LockError::AlreadyLocked`] if another holder exists, in this
    ///   process or another
    /// - [`LockError::CreateFailed`] if the lock file cannot be created
    /// - [`LockError::AcquireFailed`] if the OS lock call fails
    pub fn acquire(paths: &SitePaths) -> Result<Self, LockError> {
        let dir = paths.state_dir();
        fs::create_dir_all(&dir).map_err(|e| {
            LockError::CreateFailed(format!("cannot create {}: {}", dir.display(), e))
        })?;

        let path = paths.lock_path();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| {
                LockError::CreateFailed(format!("cannot open {}: {}", path.display(), e))
            })?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(Self {
                path,
                file: Some(file),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Err(LockError::AlreadyLocked),
            Err(e) => Err(LockError::AcquireFailed(e.to_string())),
        }
    }

    /// Whether this guard still holds the lock.
    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }

    /// Path of the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for WorktreeLock {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = file.unlock();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn site() -> (TempDir, SitePaths) {
        let temp = TempDir::new().expect("create temp dir");
        let paths = SitePaths::new(temp.path().to_path_buf(), temp.path().join(".git"));
        (temp, paths)
    }

    #[test]
    fn acquire_creates_state_dir() {
        let (_temp, paths) = site();
        assert!(!paths.state_dir().exists());

        let lock = WorktreeLock::acquire(&paths).expect("acquire lock");

        assert!(lock.is_held());
        assert_eq!(lock.path(), paths.lock_path());
        assert!(paths.state_dir().exists());
    }

    #[test]
    fn second_acquire_fails_fast() {
        let (_temp, paths) = site();
        let _held = WorktreeLock::acquire(&paths).expect("first acquire");

        let result = WorktreeLock::acquire(&paths);

        assert!(matches!(result, Err(LockError::AlreadyLocked)));
    }

    #[test]
    fn released_on_drop() {
        let (_temp, paths) = site();
        {
            let _held = WorktreeLock::acquire(&paths).expect("first acquire");
        }

        let lock = WorktreeLock::acquire(&paths).expect("second acquire");
        assert!(lock.is_held());
    }

    #[test]
    fn already_locked_message() {
        assert_eq!(
            LockError::AlreadyLocked.to_string(),
            "another content operation is in progress"
        );
    }
}
