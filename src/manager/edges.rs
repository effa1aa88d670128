//! manager::edges
//!
//! Attaching and detaching children.
//!
//! # Locking
//!
//! A child's current parent and the new parent's ancestors are only known
//! after reading them, but they must be locked before anything is modified.
//! Attach reads both unlocked, then locks the child, its old parent and the
//! whole ancestor chain of the new parent in one ordered acquisition. Both
//! are read again under the locks. If either moved in between it starts
//! over, a bounded number of times.
//!
//! Two attaches that would close a cycle between them always share a node:
//! the first one's child is on the second one's chain. So they serialize,
//! and the second sees the first one's edge in its cycle check.

use tracing::{debug, info, warn};

use super::delete::DeleteReport;
use super::error::ManagerError;
use super::locks::LockKey;
use super::{to_corpus, TreeCorpusManager};
use crate::core::types::CorpusId;

/// Attempts at locking a child together with its current parent.
const EDGE_ATTEMPTS: usize = 3;

impl TreeCorpusManager {
    /// Make `child` a child of `parent`.
    ///
    /// A child that already has another parent is moved: it is removed from
    /// the old parent's list first. Attaching an existing edge again is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// - [`ManagerError::Validation`] if `child == parent`
    /// - [`ManagerError::Cycle`] if `child` is an ancestor of `parent`
    /// - [`ManagerError::NotFound`] if either corpus is missing
    /// - [`ManagerError::Dependency`] if a write fails after others landed
    /// - [`ManagerError::Conflict`] if the child's parent or the new parent's
    ///   ancestors keep moving while being locked
    pub async fn attach_child(&self, child: CorpusId, parent: CorpusId) -> Result<(), ManagerError> {
        const OP: &str = "attach_child";

        if child == parent {
            return Err(ManagerError::validation(
                OP,
                format!("corpus {} cannot be its own child", child),
            ));
        }

        let mut last_seen = None;
        for attempt in 1..=EDGE_ATTEMPTS {
            let observed = self.load_record(OP, child).await?.parent_uuid;
            let previous = observed.filter(|p| *p != parent);
            let Some(_locks) = self
                .lock_with_ancestors(OP, child, parent, previous)
                .await?
            else {
                debug!(attempt, child = %child, parent = %parent, "retrying after ancestors moved");
                continue;
            };

            let mut child_corpus = self.load_corpus(OP, child).await?;
            if child_corpus.parent() != observed {
                debug!(attempt, child = %child, "parent changed before locking, retrying");
                last_seen = child_corpus.version();
                continue;
            }
            let mut parent_corpus = self.load_corpus(OP, parent).await?;

            if child_corpus.children().contains(&parent) {
                return Err(ManagerError::Cycle {
                    op: OP,
                    child,
                    parent,
                    path: vec![parent, child],
                });
            }

            if observed == Some(parent) && parent_corpus.children().contains(&child) {
                debug!(child = %child, parent = %parent, "already attached");
                return Ok(());
            }

            let mut committed = Vec::new();
            if let Some(old) = previous {
                match self.fetch(OP, old).await? {
                    Some(record) => {
                        let mut old_parent = to_corpus(OP, record, &committed)?;
                        if old_parent.remove_child(child) {
                            self.persist(OP, &mut old_parent, &committed).await?;
                            committed.push(old);
                        }
                    }
                    None => warn!(child = %child, parent = %old, "previous parent is missing"),
                }
            }

            parent_corpus
                .add_child(child)
                .map_err(|e| ManagerError::from_corpus(OP, Some(parent), e))?;
            self.persist(OP, &mut parent_corpus, &committed).await?;
            committed.push(parent);

            child_corpus
                .set_parent(Some(parent))
                .map_err(|e| ManagerError::from_corpus(OP, Some(child), e))?;
            self.persist(OP, &mut child_corpus, &committed).await?;

            match previous {
                Some(old) => info!(child = %child, from = %old, to = %parent, "moved corpus"),
                None => info!(child = %child, parent = %parent, "attached corpus"),
            }
            return Ok(());
        }

        Err(ManagerError::Conflict {
            op: OP,
            uuid: child,
            expected: None,
            actual: last_seen,
        })
    }

    /// Remove the edge `parent -> child`.
    ///
    /// The child's parent pointer is cleared only if it names `parent`.
    /// With `delete_child`, a child that belonged to `parent` is then deleted
    /// with its subtree and the deletion report returned. A stale entry for a
    /// child owned by another corpus is only dropped from the list.
    ///
    /// # Errors
    ///
    /// - [`ManagerError::NotFound`] if `parent` is missing or does not list
    ///   `child`
    pub async fn detach_child(
        &self,
        parent: CorpusId,
        child: CorpusId,
        delete_child: bool,
    ) -> Result<Option<DeleteReport>, ManagerError> {
        const OP: &str = "detach_child";

        let owned = {
            let _locks = self
                .locks
                .acquire_all([LockKey::node(parent), LockKey::node(child)])
                .await;

            let mut parent_corpus = self.load_corpus(OP, parent).await?;
            if !parent_corpus.remove_child(child) {
                return Err(ManagerError::not_found(OP, child));
            }
            let child_record = self.fetch(OP, child).await?;

            self.persist(OP, &mut parent_corpus, &[]).await?;

            match child_record {
                Some(record) if record.parent_uuid == Some(parent) => {
                    let mut child_corpus = to_corpus(OP, record, &[parent])?;
                    child_corpus
                        .set_parent(None)
                        .map_err(|e| ManagerError::from_corpus(OP, Some(child), e))?;
                    self.persist(OP, &mut child_corpus, &[parent]).await?;
                    info!(child = %child, parent = %parent, "detached corpus");
                    true
                }
                Some(record) => {
                    debug!(
                        child = %child,
                        recorded = ?record.parent_uuid,
                        "child points elsewhere, left unchanged"
                    );
                    false
                }
                None => {
                    warn!(child = %child, parent = %parent, "removed dangling child entry");
                    false
                }
            }
        };

        if delete_child && owned {
            return self.delete(child).await.map(Some);
        }
        Ok(None)
    }
}
