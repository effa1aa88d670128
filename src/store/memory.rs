//! store::memory
//!
//! In-process versioned store.
//!
//! # Design
//!
//! Keeps every version of every corpus in memory and records each call so
//! tests can assert on access patterns. Failures can be injected per
//! operation, optionally per uuid and for a limited number of calls, to
//! exercise partial-commit and retry paths.
//!
//! # Example
//!
//! ```
//! use corpus_forest::core::record::CorpusRecord;
//! use corpus_forest::core::types::CorpusId;
//! use corpus_forest::store::{MemoryStore, VersionedDataStore};
//!
//! # tokio_test::block_on(async {
//! let store = MemoryStore::new();
//! let id = CorpusId::new();
//!
//! let receipt = store
//!     .save(CorpusRecord::empty(id, "names", "wordlist_names", "en"), None)
//!     .await
//!     .unwrap();
//! assert_eq!(receipt.version, 1);
//!
//! let loaded = store.load(id).await.unwrap().unwrap();
//! assert_eq!(loaded.storage_id, Some(receipt.storage_id));
//! # });
//! ```

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tracing::debug;

use super::{check_expected, SaveReceipt, StoreError, VersionedDataStore};
use crate::core::record::CorpusRecord;
use crate::core::types::{CorpusId, StorageId, UtcTimestamp};

/// In-memory store.
///
/// Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryStoreInner>>,
}

#[derive(Debug, Default)]
struct MemoryStoreInner {
    /// All versions per corpus, oldest first.
    versions: HashMap<CorpusId, Vec<CorpusRecord>>,
    deleted: HashSet<CorpusId>,
    fail_on: Option<FailOn>,
    /// Remaining injected failures; `None` means unlimited.
    fail_times: Option<u32>,
    operations: Vec<StoreOperation>,
}

/// Which operation should fail.
#[derive(Debug, Clone)]
pub enum FailOn {
    /// Every save.
    Save(StoreError),
    /// Saves of one corpus.
    SaveOf(CorpusId, StoreError),
    /// `load` and `load_many`.
    Load(StoreError),
    /// Every delete.
    Delete(StoreError),
    /// Deletes of one corpus.
    DeleteOf(CorpusId, StoreError),
}

/// Recorded call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOperation {
    Save {
        uuid: CorpusId,
        expected_version: Option<u64>,
    },
    Load {
        uuid: CorpusId,
    },
    LoadMany {
        uuids: Vec<CorpusId>,
    },
    LoadVersion {
        uuid: CorpusId,
        version: u64,
    },
    Delete {
        storage_id: StorageId,
    },
    ListLive,
}

fn storage_id_for(uuid: CorpusId, version: u64) -> Result<StorageId, StoreError> {
    StorageId::new(format!("mem:{}@{}", uuid, version))
        .map_err(|e| StoreError::Corrupt(e.to_string()))
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryStoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inject a failure until cleared.
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        {
            let mut inner = self.lock();
            inner.fail_on = Some(fail_on);
            inner.fail_times = None;
        }
        self
    }

    /// Inject a failure for the next `times` matching calls.
    pub fn fail_times(&self, fail_on: FailOn, times: u32) {
        let mut inner = self.lock();
        inner.fail_on = Some(fail_on);
        inner.fail_times = Some(times);
    }

    /// Inject a failure on an existing handle until cleared.
    pub fn set_fail_on(&self, fail_on: FailOn) {
        let mut inner = self.lock();
        inner.fail_on = Some(fail_on);
        inner.fail_times = None;
    }

    /// Clear any injected failure.
    pub fn clear_fail_on(&self) {
        let mut inner = self.lock();
        inner.fail_on = None;
        inner.fail_times = None;
    }

    /// All recorded calls.
    pub fn operations(&self) -> Vec<StoreOperation> {
        self.lock().operations.clone()
    }

    /// Forget recorded calls.
    pub fn clear_operations(&self) {
        self.lock().operations.clear();
    }

    /// Number of versions ever written for `uuid`.
    pub fn version_count(&self, uuid: CorpusId) -> usize {
        self.lock().versions.get(&uuid).map_or(0, Vec::len)
    }

    /// Whether `uuid` has been deleted.
    pub fn is_deleted(&self, uuid: CorpusId) -> bool {
        self.lock().deleted.contains(&uuid)
    }

    /// Write a record as a new version without any checks.
    ///
    /// Lets tests plant states the manager would never produce, such as
    /// cycles or dangling children.
    pub fn insert_unchecked(&self, mut record: CorpusRecord) -> Result<SaveReceipt, StoreError> {
        let mut inner = self.lock();
        let uuid = record.corpus_uuid;
        let version = inner.versions.get(&uuid).map_or(0, Vec::len) as u64 + 1;
        let storage_id = storage_id_for(uuid, version)?;
        record.version = version;
        record.storage_id = Some(storage_id.clone());
        record.created_at = UtcTimestamp::now();
        inner.versions.entry(uuid).or_default().push(record);
        inner.deleted.remove(&uuid);
        Ok(SaveReceipt {
            storage_id,
            version,
        })
    }

    fn record_op(inner: &mut MemoryStoreInner, op: StoreOperation) {
        inner.operations.push(op);
    }

    fn check_fail(
        inner: &mut MemoryStoreInner,
        matches: impl Fn(&FailOn) -> Option<StoreError>,
    ) -> Result<(), StoreError> {
        let Some(err) = inner.fail_on.as_ref().and_then(matches) else {
            return Ok(());
        };
        if let Some(remaining) = inner.fail_times.as_mut() {
            *remaining = remaining.saturating_sub(1);
            if *remaining == 0 {
                inner.fail_on = None;
                inner.fail_times = None;
            }
        }
        Err(err)
    }

    fn live(inner: &MemoryStoreInner, uuid: CorpusId) -> Option<&CorpusRecord> {
        if inner.deleted.contains(&uuid) {
            return None;
        }
        inner.versions.get(&uuid).and_then(|v| v.last())
    }
}

#[async_trait]
impl VersionedDataStore for MemoryStore {
    async fn save(
        &self,
        mut record: CorpusRecord,
        expected_version: Option<u64>,
    ) -> Result<SaveReceipt, StoreError> {
        let mut inner = self.lock();
        let uuid = record.corpus_uuid;
        Self::record_op(
            &mut inner,
            StoreOperation::Save {
                uuid,
                expected_version,
            },
        );
        Self::check_fail(&mut inner, |f| match f {
            FailOn::Save(e) => Some(e.clone()),
            FailOn::SaveOf(id, e) if *id == uuid => Some(e.clone()),
            _ => None,
        })?;

        let live_version = Self::live(&inner, uuid).map(|r| r.version);
        let version = check_expected(
            uuid,
            inner.deleted.contains(&uuid),
            live_version,
            expected_version,
        )?;

        let storage_id = storage_id_for(uuid, version)?;
        record.version = version;
        record.storage_id = Some(storage_id.clone());
        record.created_at = UtcTimestamp::now();
        inner.versions.entry(uuid).or_default().push(record);

        debug!(corpus = %uuid, version, "memory store saved version");
        Ok(SaveReceipt {
            storage_id,
            version,
        })
    }

    async fn load(&self, uuid: CorpusId) -> Result<Option<CorpusRecord>, StoreError> {
        let mut inner = self.lock();
        Self::record_op(&mut inner, StoreOperation::Load { uuid });
        Self::check_fail(&mut inner, |f| match f {
            FailOn::Load(e) => Some(e.clone()),
            _ => None,
        })?;
        Ok(Self::live(&inner, uuid).cloned())
    }

    async fn load_many(
        &self,
        uuids: &[CorpusId],
    ) -> Result<HashMap<CorpusId, CorpusRecord>, StoreError> {
        let mut inner = self.lock();
        Self::record_op(
            &mut inner,
            StoreOperation::LoadMany {
                uuids: uuids.to_vec(),
            },
        );
        Self::check_fail(&mut inner, |f| match f {
            FailOn::Load(e) => Some(e.clone()),
            _ => None,
        })?;
        Ok(uuids
            .iter()
            .filter_map(|&id| Self::live(&inner, id).map(|r| (id, r.clone())))
            .collect())
    }

    async fn load_version(
        &self,
        uuid: CorpusId,
        version: u64,
    ) -> Result<Option<CorpusRecord>, StoreError> {
        let mut inner = self.lock();
        Self::record_op(&mut inner, StoreOperation::LoadVersion { uuid, version });
        let found = version
            .checked_sub(1)
            .and_then(|i| inner.versions.get(&uuid)?.get(i as usize))
            .cloned();
        Ok(found)
    }

    async fn delete(&self, storage_id: &StorageId) -> Result<(), StoreError> {
        let mut inner = self.lock();
        Self::record_op(
            &mut inner,
            StoreOperation::Delete {
                storage_id: storage_id.clone(),
            },
        );

        let owner = inner
            .versions
            .iter()
            .find(|(_, versions)| {
                versions
                    .iter()
                    .any(|r| r.storage_id.as_ref() == Some(storage_id))
            })
            .map(|(uuid, _)| *uuid);
        let uuid = match owner {
            Some(uuid) if !inner.deleted.contains(&uuid) => uuid,
            _ => return Err(StoreError::NotFound(storage_id.to_string())),
        };

        Self::check_fail(&mut inner, |f| match f {
            FailOn::Delete(e) => Some(e.clone()),
            FailOn::DeleteOf(id, e) if *id == uuid => Some(e.clone()),
            _ => None,
        })?;

        let latest = Self::live(&inner, uuid).map(|r| (r.version, r.storage_id.clone()));
        if let Some((version, latest_id)) = latest {
            if latest_id.as_ref() != Some(storage_id) {
                let named = inner.versions[&uuid]
                    .iter()
                    .find(|r| r.storage_id.as_ref() == Some(storage_id))
                    .map(|r| r.version);
                return Err(StoreError::Conflict {
                    uuid,
                    expected: named,
                    actual: Some(version),
                });
            }
        }

        inner.deleted.insert(uuid);
        debug!(corpus = %uuid, "memory store deleted corpus");
        Ok(())
    }

    async fn list_live(&self) -> Result<Vec<CorpusId>, StoreError> {
        let mut inner = self.lock();
        Self::record_op(&mut inner, StoreOperation::ListLive);
        let live: BTreeSet<CorpusId> = inner
            .versions
            .keys()
            .filter(|id| !inner.deleted.contains(id))
            .copied()
            .collect();
        Ok(live.into_iter().collect())
    }
}
