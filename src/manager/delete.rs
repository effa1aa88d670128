//! manager::delete
//!
//! Cascade deletion of a subtree.
//!
//! # Steps
//!
//! 1. Lock the root's subtree and node, plus its parent's node.
//! 2. Collect descendants breadth-first, one `load_many` per level.
//! 3. Remove the root from its parent's child list.
//! 4. Tell the search side about every corpus going away.
//! 5. Delete every collected corpus by storage id.
//!
//! Descendants are not node-locked. A descendant re-saved concurrently is
//! deleted at its newer version; one deleted concurrently is skipped.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use super::error::ManagerError;
use super::locks::LockKey;
use super::{to_corpus, TreeCorpusManager};
use crate::core::record::CorpusRecord;
use crate::core::types::CorpusId;
use crate::store::StoreError;

/// Attempts at locking a root together with its current parent.
const DELETE_ATTEMPTS: usize = 3;

/// What a cascade deletion removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteReport {
    pub root: Option<CorpusId>,
    /// Deleted corpora in breadth-first order, root first.
    pub deleted: Vec<CorpusId>,
    /// Child entries that pointed at nothing.
    pub dangling: Vec<CorpusId>,
    /// Parent the root was detached from.
    pub detached_from: Option<CorpusId>,
}

impl TreeCorpusManager {
    /// Delete `root` and every descendant.
    ///
    /// # Errors
    ///
    /// - [`ManagerError::NotFound`] if `root` is not live; callers wanting
    ///   idempotent deletes can treat this as success
    /// - [`ManagerError::Validation`] if the subtree is deeper than
    ///   `max_depth`; nothing is changed in that case
    /// - [`ManagerError::Dependency`] if the store fails part way
    pub async fn delete(&self, root: CorpusId) -> Result<DeleteReport, ManagerError> {
        const OP: &str = "delete";

        for attempt in 1..=DELETE_ATTEMPTS {
            let observed = self.load_record(OP, root).await?.parent_uuid;
            let keys = [LockKey::subtree(root), LockKey::node(root)]
                .into_iter()
                .chain(observed.map(LockKey::node));
            let _locks = self.locks.acquire_all(keys).await;

            let root_record = self.load_record(OP, root).await?;
            if root_record.parent_uuid != observed {
                debug!(attempt, corpus = %root, "parent changed before locking, retrying");
                continue;
            }

            let mut report = DeleteReport {
                root: Some(root),
                ..DeleteReport::default()
            };
            let doomed = self.collect_subtree(OP, root_record, &mut report).await?;

            let mut committed = Vec::new();
            if let Some(parent) = observed {
                match self.fetch(OP, parent).await? {
                    Some(record) => {
                        let mut parent_corpus = to_corpus(OP, record, &committed)?;
                        if parent_corpus.remove_child(root) {
                            self.persist(OP, &mut parent_corpus, &committed).await?;
                            committed.push(parent);
                            report.detached_from = Some(parent);
                        }
                    }
                    None => warn!(corpus = %root, parent = %parent, "parent is missing"),
                }
            }

            for record in &doomed {
                self.notify_deleted(record.corpus_uuid).await;
            }

            for record in doomed {
                let id = record.corpus_uuid;
                if self.delete_record(OP, record, &committed).await? {
                    committed.push(id);
                    report.deleted.push(id);
                }
            }

            info!(
                corpus = %root,
                deleted = report.deleted.len(),
                dangling = report.dangling.len(),
                "deleted subtree"
            );
            return Ok(report);
        }

        Err(ManagerError::Conflict {
            op: OP,
            uuid: root,
            expected: None,
            actual: None,
        })
    }

    /// Root plus every reachable descendant, breadth-first.
    async fn collect_subtree(
        &self,
        op: &'static str,
        root: CorpusRecord,
        report: &mut DeleteReport,
    ) -> Result<Vec<CorpusRecord>, ManagerError> {
        let root_id = root.corpus_uuid;
        let mut visited = HashSet::from([root_id]);
        let mut frontier: Vec<CorpusId> = root.child_uuids.clone();
        let mut collected = vec![root];
        let mut depth = 0;

        loop {
            let level: Vec<CorpusId> = frontier
                .into_iter()
                .filter(|id| visited.insert(*id))
                .collect();
            if level.is_empty() {
                return Ok(collected);
            }
            depth += 1;
            if depth > self.settings.max_depth {
                return Err(ManagerError::validation(
                    op,
                    format!(
                        "subtree of {} is deeper than {} levels",
                        root_id, self.settings.max_depth
                    ),
                ));
            }

            let mut found = self.fetch_many(op, &level).await?;
            frontier = Vec::new();
            for id in level {
                match found.remove(&id) {
                    Some(record) => {
                        frontier.extend(record.child_uuids.iter().copied());
                        collected.push(record);
                    }
                    None => {
                        warn!(corpus = %id, "skipping dangling child");
                        report.dangling.push(id);
                    }
                }
            }
        }
    }

    /// Delete one record. Returns false if it was already gone.
    async fn delete_record(
        &self,
        op: &'static str,
        record: CorpusRecord,
        committed: &[CorpusId],
    ) -> Result<bool, ManagerError> {
        let id = record.corpus_uuid;
        let mut storage_id = record.storage_id;

        for _ in 0..2 {
            let Some(current) = storage_id.take() else {
                return Err(ManagerError::from_store(
                    op,
                    id,
                    committed.to_vec(),
                    StoreError::Corrupt(format!("corpus {} has no storage id", id)),
                ));
            };
            match self.store.delete(&current).await {
                Ok(()) => return Ok(true),
                Err(StoreError::NotFound(_)) => {
                    warn!(corpus = %id, "already deleted");
                    return Ok(false);
                }
                Err(StoreError::Conflict { .. }) => {
                    debug!(corpus = %id, "re-saved during delete, using newer version");
                    match self.fetch(op, id).await? {
                        Some(latest) => storage_id = latest.storage_id,
                        None => return Ok(false),
                    }
                }
                Err(e) => return Err(ManagerError::from_store(op, id, committed.to_vec(), e)),
            }
        }

        Err(ManagerError::from_store(
            op,
            id,
            committed.to_vec(),
            StoreError::Conflict {
                uuid: id,
                expected: None,
                actual: None,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::core::corpus::{Corpus, CorpusDraft};
    use crate::manager::{CreateOptions, ErrorKind, ManagerSettings};
    use crate::normalize::BasicNormalizer;
    use crate::search::{NotifyError, RecordingNotifier};
    use crate::store::memory::FailOn;
    use crate::store::{MemoryStore, VersionedDataStore};

    use super::*;

    fn manager(store: &MemoryStore) -> TreeCorpusManager {
        TreeCorpusManager::new(Arc::new(store.clone()), Arc::new(BasicNormalizer))
    }

    async fn create(m: &TreeCorpusManager, name: &str) -> Corpus {
        m.create(CorpusDraft::new(name, [name]), CreateOptions::default())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn delete_removes_all_descendants() {
        let store = MemoryStore::new();
        let notifier = RecordingNotifier::new();
        let m = manager(&store).with_notifier(Arc::new(notifier.clone()));
        let (a, b, c, d) = (
            create(&m, "a").await,
            create(&m, "b").await,
            create(&m, "c").await,
            create(&m, "d").await,
        );
        m.attach_child(b.id(), a.id()).await.unwrap();
        m.attach_child(c.id(), b.id()).await.unwrap();
        m.attach_child(d.id(), b.id()).await.unwrap();

        let report = m.delete(b.id()).await.unwrap();
        assert_eq!(report.deleted, vec![b.id(), c.id(), d.id()]);
        assert_eq!(report.detached_from, Some(a.id()));
        for id in [b.id(), c.id(), d.id()] {
            assert!(store.is_deleted(id));
        }
        assert!(m.get(a.id()).await.unwrap().children().is_empty());
        assert_eq!(notifier.deleted(), vec![b.id(), c.id(), d.id()]);
        assert!(m.verify().await.unwrap().ok());
    }

    #[tokio::test]
    async fn delete_missing_is_not_found() {
        let m = manager(&MemoryStore::new());
        let err = m.delete(CorpusId::new()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn delete_twice_is_not_found() {
        let m = manager(&MemoryStore::new());
        let a = create(&m, "a").await;
        m.delete(a.id()).await.unwrap();
        assert_eq!(m.delete(a.id()).await.unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn deleted_uuid_cannot_be_saved_again() {
        let m = manager(&MemoryStore::new());
        let mut a = create(&m, "a").await;
        m.delete(a.id()).await.unwrap();

        let err = m.save(&mut a).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Rejected);
    }

    #[tokio::test]
    async fn dangling_children_are_reported() {
        let store = MemoryStore::new();
        let m = manager(&store);
        let a = create(&m, "a").await;

        let ghost = CorpusId::new();
        let mut record = store.load(a.id()).await.unwrap().unwrap();
        record.child_uuids.push(ghost);
        let version = record.version;
        store.save(record, Some(version)).await.unwrap();

        let report = m.delete(a.id()).await.unwrap();
        assert_eq!(report.deleted, vec![a.id()]);
        assert_eq!(report.dangling, vec![ghost]);
    }

    #[tokio::test]
    async fn corrupt_child_cycle_terminates() {
        let store = MemoryStore::new();
        let m = manager(&store);
        let (a, b) = (create(&m, "a").await, create(&m, "b").await);
        m.attach_child(b.id(), a.id()).await.unwrap();

        let mut record = store.load(b.id()).await.unwrap().unwrap();
        record.child_uuids.push(a.id());
        store.insert_unchecked(record).unwrap();

        let report = m.delete(a.id()).await.unwrap();
        assert_eq!(report.deleted, vec![a.id(), b.id()]);
    }

    #[tokio::test]
    async fn too_deep_subtree_is_left_alone() {
        let store = MemoryStore::new();
        let m = manager(&store);
        let (a, b, c) = (
            create(&m, "a").await,
            create(&m, "b").await,
            create(&m, "c").await,
        );
        m.attach_child(b.id(), a.id()).await.unwrap();
        m.attach_child(c.id(), b.id()).await.unwrap();

        let mut settings = ManagerSettings::default();
        settings.max_depth = 1;
        let m = manager(&store).with_settings(settings);

        let err = m.delete(a.id()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Rejected);
        assert!(!store.is_deleted(a.id()));
    }

    #[tokio::test]
    async fn notifier_failure_does_not_block_delete() {
        let store = MemoryStore::new();
        let notifier = RecordingNotifier::failing(NotifyError::Unavailable("down".into()));
        let m = manager(&store).with_notifier(Arc::new(notifier));
        let a = create(&m, "a").await;

        m.delete(a.id()).await.unwrap();
        assert!(store.is_deleted(a.id()));
    }

    #[tokio::test]
    async fn store_failure_reports_what_was_deleted() {
        let store = MemoryStore::new();
        let m = manager(&store);
        let (a, b) = (create(&m, "a").await, create(&m, "b").await);
        m.attach_child(b.id(), a.id()).await.unwrap();

        store.set_fail_on(FailOn::DeleteOf(b.id(), StoreError::Io("disk".into())));
        match m.delete(a.id()).await.unwrap_err() {
            ManagerError::Dependency { committed, .. } => assert_eq!(committed, vec![a.id()]),
            other => panic!("unexpected {other:?}"),
        }
        assert!(store.is_deleted(a.id()));
        assert!(!store.is_deleted(b.id()));
    }
}
