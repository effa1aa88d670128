//! manager::locks
//!
//! Per-resource async locks.
//!
//! # Design
//!
//! One `tokio::sync::Mutex<()>` per live [`LockKey`], created on demand and
//! held weakly by the table, so a key's entry disappears once nobody holds
//! or waits on it. Dead entries are pruned on acquisition.
//!
//! # Ordering
//!
//! Keys order by kind first (`Subtree` before `Node`), then by uuid.
//! Anything taking more than one lock must use [`LockTable::acquire_all`],
//! which acquires in that order. Taking locks one at a time is only safe
//! while every lock already held sorts before the one being taken.
//!
//! # Example
//!
//! ```
//! use corpus_forest::core::types::CorpusId;
//! use corpus_forest::manager::locks::{LockKey, LockTable};
//!
//! # tokio_test::block_on(async {
//! let table = LockTable::new();
//! let id = CorpusId::new();
//!
//! let guard = table.acquire(LockKey::node(id)).await;
//! assert!(table.try_acquire(LockKey::node(id)).is_none());
//! drop(guard);
//! assert!(table.try_acquire(LockKey::node(id)).is_some());
//! # });
//! ```

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

use crate::core::types::CorpusId;

/// What a lock protects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    /// A whole subtree, for aggregation and deletion.
    Subtree,
    /// One node's record.
    Node,
}

/// Lock table key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LockKey {
    pub kind: ResourceKind,
    pub id: CorpusId,
}

impl LockKey {
    pub fn node(id: CorpusId) -> Self {
        Self {
            kind: ResourceKind::Node,
            id,
        }
    }

    pub fn subtree(id: CorpusId) -> Self {
        Self {
            kind: ResourceKind::Subtree,
            id,
        }
    }
}

impl std::fmt::Display for LockKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.kind {
            ResourceKind::Subtree => "subtree",
            ResourceKind::Node => "node",
        };
        write!(f, "{}:{}", kind, self.id)
    }
}

/// A held lock. Released on drop.
#[derive(Debug)]
pub struct ResourceGuard {
    key: LockKey,
    _guard: OwnedMutexGuard<()>,
}

impl ResourceGuard {
    pub fn key(&self) -> LockKey {
        self.key
    }
}

/// Several held locks. Released together on drop.
#[derive(Debug)]
pub struct LockSet {
    guards: Vec<ResourceGuard>,
}

impl LockSet {
    /// Keys held, in acquisition order.
    pub fn keys(&self) -> Vec<LockKey> {
        self.guards.iter().map(ResourceGuard::key).collect()
    }

    pub fn holds(&self, key: LockKey) -> bool {
        self.guards.iter().any(|g| g.key == key)
    }
}

/// Table of per-resource locks.
#[derive(Debug, Default)]
pub struct LockTable {
    entries: Mutex<HashMap<LockKey, Weak<AsyncMutex<()>>>>,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<LockKey, Weak<AsyncMutex<()>>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn handle(&self, key: LockKey) -> Arc<AsyncMutex<()>> {
        let mut entries = self.entries();
        entries.retain(|_, weak| weak.strong_count() > 0);
        if let Some(existing) = entries.get(&key).and_then(Weak::upgrade) {
            return existing;
        }
        let fresh = Arc::new(AsyncMutex::new(()));
        entries.insert(key, Arc::downgrade(&fresh));
        fresh
    }

    /// Wait for one lock.
    pub async fn acquire(&self, key: LockKey) -> ResourceGuard {
        let guard = self.handle(key).lock_owned().await;
        debug!(lock = %key, "acquired");
        ResourceGuard { key, _guard: guard }
    }

    /// Wait for several locks, taken in global order. Duplicates collapse.
    pub async fn acquire_all(&self, keys: impl IntoIterator<Item = LockKey>) -> LockSet {
        let ordered: BTreeSet<LockKey> = keys.into_iter().collect();
        let mut guards = Vec::with_capacity(ordered.len());
        for key in ordered {
            guards.push(self.acquire(key).await);
        }
        LockSet { guards }
    }

    /// Take a lock only if it is free.
    pub fn try_acquire(&self, key: LockKey) -> Option<ResourceGuard> {
        let guard = self.handle(key).try_lock_owned().ok()?;
        Some(ResourceGuard { key, _guard: guard })
    }

    /// Number of keys currently held or awaited.
    pub fn active(&self) -> usize {
        self.entries()
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }
}
