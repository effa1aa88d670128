//! store
//!
//! Versioned persistence for corpus records.
//!
//! # Design
//!
//! The backend is an external collaborator behind [`VersionedDataStore`].
//! Every save produces a new immutable version with its own
//! [`StorageId`]; the corpus uuid is the stable key across versions.
//!
//! Saves are optimistic: the caller passes the version it last read
//! (`None` for a corpus that has never been saved) and the store refuses
//! the write if the live version differs.
//!
//! A deleted uuid is tombstoned and never accepted again.
//!
//! # Implementations
//!
//! - [`memory::MemoryStore`] - in-process, with failure injection for tests
//! - [`file::FileStore`] - one directory per corpus, JSON per version,
//!   writes serialized by [`lock::StoreLock`]

pub mod file;
pub mod lock;
pub mod memory;

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::core::record::{CorpusRecord, RecordError};
use crate::core::types::{CorpusId, StorageId};
use lock::LockError;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Errors from store operations.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// No live record or version matches.
    #[error("not found: {0}")]
    NotFound(String),

    /// The live version is not the one the caller read.
    #[error("version conflict on {uuid}: expected {expected:?}, found {actual:?}")]
    Conflict {
        uuid: CorpusId,
        expected: Option<u64>,
        actual: Option<u64>,
    },

    /// The uuid was deleted and cannot be written again.
    #[error("corpus {0} has been deleted")]
    Deleted(CorpusId),

    /// The backend could not be reached. Safe to retry reads.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A persisted record could not be read back.
    #[error("corrupt record: {0}")]
    Corrupt(String),

    /// I/O failure in the backend.
    #[error("store i/o error: {0}")]
    Io(String),
}

impl StoreError {
    /// Whether a read may be retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e.to_string())
    }
}

impl From<RecordError> for StoreError {
    fn from(e: RecordError) -> Self {
        StoreError::Corrupt(e.to_string())
    }
}

impl From<LockError> for StoreError {
    fn from(e: LockError) -> Self {
        match e {
            LockError::Lock { .. } => StoreError::Unavailable(e.to_string()),
            other => StoreError::Io(other.to_string()),
        }
    }
}

/// Outcome of a successful save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReceipt {
    pub storage_id: StorageId,
    pub version: u64,
}

/// Versioned record storage.
///
/// Implementations must be safe to share across tasks.
#[async_trait]
pub trait VersionedDataStore: Send + Sync {
    /// Persist a new version of `record.corpus_uuid`.
    ///
    /// The store assigns `version`, `storage_id` and `created_at`; whatever
    /// the caller put there is ignored.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Conflict`] if the live version is not `expected_version`
    /// - [`StoreError::Deleted`] if the uuid has been deleted
    async fn save(
        &self,
        record: CorpusRecord,
        expected_version: Option<u64>,
    ) -> Result<SaveReceipt, StoreError>;

    /// Latest live version, or `None` if unknown or deleted.
    async fn load(&self, uuid: CorpusId) -> Result<Option<CorpusRecord>, StoreError>;

    /// Latest live versions of several corpora. Missing uuids are absent
    /// from the result.
    async fn load_many(
        &self,
        uuids: &[CorpusId],
    ) -> Result<HashMap<CorpusId, CorpusRecord>, StoreError> {
        let mut found = HashMap::with_capacity(uuids.len());
        for &uuid in uuids {
            if let Some(record) = self.load(uuid).await? {
                found.insert(uuid, record);
            }
        }
        Ok(found)
    }

    /// A specific historical version, live or not.
    async fn load_version(
        &self,
        uuid: CorpusId,
        version: u64,
    ) -> Result<Option<CorpusRecord>, StoreError>;

    /// Delete the corpus whose latest version has `storage_id`.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] if no live corpus has that storage id
    /// - [`StoreError::Conflict`] if `storage_id` names an older version
    async fn delete(&self, storage_id: &StorageId) -> Result<(), StoreError>;

    /// Uuids of every live corpus, sorted.
    async fn list_live(&self) -> Result<Vec<CorpusId>, StoreError>;
}

/// Check an optimistic save against the live and deleted state.
pub(crate) fn check_expected(
    uuid: CorpusId,
    deleted: bool,
    live_version: Option<u64>,
    expected_version: Option<u64>,
) -> Result<u64, StoreError> {
    if deleted {
        return Err(StoreError::Deleted(uuid));
    }
    if live_version != expected_version {
        return Err(StoreError::Conflict {
            uuid,
            expected: expected_version,
            actual: live_version,
        });
    }
    Ok(live_version.unwrap_or(0) + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_save_expects_nothing() {
        let id = CorpusId::new();
        assert_eq!(check_expected(id, false, None, None).unwrap(), 1);
        assert_eq!(check_expected(id, false, Some(4), Some(4)).unwrap(), 5);
    }

    #[test]
    fn stale_version_conflicts() {
        let id = CorpusId::new();
        let err = check_expected(id, false, Some(3), Some(2)).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Conflict {
                expected: Some(2),
                actual: Some(3),
                ..
            }
        ));
        assert!(matches!(
            check_expected(id, false, Some(1), None),
            Err(StoreError::Conflict { .. })
        ));
    }

    #[test]
    fn deleted_wins_over_version() {
        let id = CorpusId::new();
        assert!(matches!(
            check_expected(id, true, None, None),
            Err(StoreError::Deleted(_))
        ));
    }

    #[test]
    fn only_unavailable_is_transient() {
        assert!(StoreError::Unavailable("timeout".into()).is_transient());
        assert!(!StoreError::Io("disk".into()).is_transient());
        assert!(!StoreError::NotFound("x".into()).is_transient());
    }
}
