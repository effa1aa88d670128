//! store::lock
//!
//! Exclusive writer lock for a file-backed store.
//!
//! # Storage
//!
//! - `<root>/store.lock` - lock file with an OS-level exclusive lock
//!
//! # Invariants
//!
//! - Held for the whole of every write (save, delete)
//! - Released on drop, on every exit path
//! - Works across processes; readers never take it
//!
//! # Example
//!
//! ```
//! use corpus_forest::store::lock::StoreLock;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let lock = StoreLock::acquire(dir.path()).unwrap();
//! assert!(lock.is_held());
//! assert!(StoreLock::try_acquire(dir.path()).unwrap().is_none());
//! ```

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;

/// Name of the lock file under the store root.
pub const LOCK_FILE: &str = "store.lock";

/// Errors from the store lock.
#[derive(Debug, Error)]
pub enum LockError {
    #[error("cannot open store lock {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot lock store {}: {source}", .path.display())]
    Lock {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot unlock store {}: {source}", .path.display())]
    Unlock {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// An exclusive lock on a store directory.
#[derive(Debug)]
pub struct StoreLock {
    path: PathBuf,
    /// `Some` while the lock is held.
    file: Option<File>,
}

impl StoreLock {
    fn open(root: &Path) -> Result<(PathBuf, File), LockError> {
        let path = root.join(LOCK_FILE);
        let opened = fs::create_dir_all(root).and_then(|()| {
            OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(&path)
        });
        match opened {
            Ok(file) => Ok((path, file)),
            Err(source) => Err(LockError::Open { path, source }),
        }
    }

    /// Block until the lock is acquired.
    ///
    /// # Errors
    ///
    /// - [`LockError::Open`] if the lock file cannot be created
    /// - [`LockError::Lock`] if the OS lock cannot be taken
    pub fn acquire(root: &Path) -> Result<Self, LockError> {
        let (path, file) = Self::open(root)?;
        if let Err(source) = file.lock_exclusive() {
            return Err(LockError::Lock { path, source });
        }
        Ok(Self {
            path,
            file: Some(file),
        })
    }

    /// Take the lock without blocking, returning `None` if it is held.
    pub fn try_acquire(root: &Path) -> Result<Option<Self>, LockError> {
        let (path, file) = Self::open(root)?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(Self {
                path,
                file: Some(file),
            })),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(source) => Err(LockError::Lock { path, source }),
        }
    }

    /// Whether this guard still holds the lock.
    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }

    /// Path to the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release early. Safe to call more than once.
    pub fn release(&mut self) -> Result<(), LockError> {
        if let Some(file) = self.file.take() {
            file.unlock().map_err(|source| LockError::Unlock {
                path: self.path.clone(),
                source,
            })?;
        }
        Ok(())
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = file.unlock();
        }
    }
}
