//! manager
//!
//! Mutations on the corpus forest.
//!
//! # Architecture
//!
//! [`TreeCorpusManager`] owns every operation that changes the forest:
//! create, save, attach, detach, aggregate and cascade delete. Each one
//! follows the same shape:
//!
//! ```text
//! lock -> fresh read -> validate -> mutate in memory -> persist -> notify
//! ```
//!
//! Records are never cached between calls. Every write carries the version
//! it was read at, so the store rejects anything based on a stale read.
//!
//! # Locking
//!
//! Locks come from a [`LockTable`] keyed by `(ResourceKind, CorpusId)`.
//! Edge operations lock both endpoints (and a previous parent when
//! re-parenting) through [`LockTable::acquire_all`], which takes them in
//! one global order. Aggregation and deletion take a subtree lock on their
//! root, so two aggregations of the same root serialize while unrelated
//! edits proceed.
//!
//! # Failure
//!
//! There is no rollback. A multi-record operation that fails part way
//! reports which corpora were already written in
//! [`ManagerError::Dependency`]. Search notifications are best-effort and
//! never fail an operation.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use corpus_forest::core::corpus::CorpusDraft;
//! use corpus_forest::manager::{CreateOptions, TreeCorpusManager};
//! use corpus_forest::normalize::BasicNormalizer;
//! use corpus_forest::store::MemoryStore;
//!
//! # tokio_test::block_on(async {
//! let manager = TreeCorpusManager::new(Arc::new(MemoryStore::new()), Arc::new(BasicNormalizer));
//!
//! let a = manager
//!     .create(CorpusDraft::new("a", ["bank", "bak", "tank"]), CreateOptions::default())
//!     .await
//!     .unwrap();
//! let b = manager
//!     .create(CorpusDraft::new("b", ["tank", "shore"]), CreateOptions::under(a.id()))
//!     .await
//!     .unwrap();
//!
//! let merged = manager.aggregate(a.id(), true).await.unwrap();
//! assert_eq!(merged.vocabulary(), ["bak", "bank", "shore", "tank"]);
//! assert_eq!(merged.children(), [b.id()]);
//! # });
//! ```

mod aggregate;
mod delete;
mod edges;
pub mod error;
pub mod locks;
pub mod retry;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::core::config::{defaults, Config};
use crate::core::corpus::{Corpus, CorpusDraft};
use crate::core::graph::CorpusGraph;
use crate::core::hashing::VocabularyHasher;
use crate::core::record::CorpusRecord;
use crate::core::types::CorpusId;
use crate::core::verify::{verify_forest, VerifyReport};
use crate::normalize::NormalizationService;
use crate::search::{NoopNotifier, SearchIndexNotifier};
use crate::store::{SaveReceipt, StoreError, VersionedDataStore};

pub use delete::DeleteReport;
pub use error::{DependencyError, ErrorKind, ManagerError};
pub use locks::{LockKey, LockSet, LockTable, ResourceKind};
pub use retry::RetryPolicy;

/// Tunables for a [`TreeCorpusManager`].
#[derive(Debug, Clone)]
pub struct ManagerSettings {
    /// Longest ancestor chain or subtree depth walked before the tree is
    /// treated as corrupt.
    pub max_depth: usize,
    pub hasher: VocabularyHasher,
    pub retry: RetryPolicy,
    /// Edit distance used when a candidate query gives none.
    pub max_edit_distance: usize,
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self {
            max_depth: defaults::MAX_DEPTH,
            hasher: VocabularyHasher::default(),
            retry: RetryPolicy::default(),
            max_edit_distance: defaults::MAX_EDIT_DISTANCE,
        }
    }
}

impl ManagerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_depth: config.max_depth(),
            hasher: config.hasher(),
            retry: RetryPolicy::from_config(config),
            max_edit_distance: config.max_edit_distance(),
        }
    }
}

/// Options for [`TreeCorpusManager::create`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CreateOptions {
    /// Attach the new corpus under this parent after saving it.
    pub parent: Option<CorpusId>,
    /// Ask the search side to build a semantic index.
    pub semantic_index: bool,
}

impl CreateOptions {
    /// Create under `parent`.
    pub fn under(parent: CorpusId) -> Self {
        Self {
            parent: Some(parent),
            ..Self::default()
        }
    }

    pub fn semantic_index(mut self, enabled: bool) -> Self {
        self.semantic_index = enabled;
        self
    }
}

/// One fuzzy lookup hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Position in the corpus vocabulary at read time.
    pub position: usize,
    pub word: String,
}

/// Point-in-time view of every live corpus.
#[derive(Debug, Default)]
pub struct ForestSnapshot {
    pub graph: CorpusGraph,
    pub records: BTreeMap<CorpusId, CorpusRecord>,
}

impl ForestSnapshot {
    pub fn record(&self, id: CorpusId) -> Option<&CorpusRecord> {
        self.records.get(&id)
    }

    pub fn roots(&self) -> Vec<CorpusId> {
        self.graph.roots()
    }
}

/// Service owning all mutations on the corpus forest.
///
/// Share it behind an `Arc`; every method takes `&self`.
pub struct TreeCorpusManager {
    store: Arc<dyn VersionedDataStore>,
    normalizer: Arc<dyn NormalizationService>,
    notifier: Arc<dyn SearchIndexNotifier>,
    locks: LockTable,
    settings: ManagerSettings,
}

impl std::fmt::Debug for TreeCorpusManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeCorpusManager")
            .field("locks", &self.locks)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl TreeCorpusManager {
    /// Create a manager with default settings and no search notifier.
    pub fn new(
        store: Arc<dyn VersionedDataStore>,
        normalizer: Arc<dyn NormalizationService>,
    ) -> Self {
        Self {
            store,
            normalizer,
            notifier: Arc::new(NoopNotifier),
            locks: LockTable::new(),
            settings: ManagerSettings::default(),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn SearchIndexNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_settings(mut self, settings: ManagerSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &ManagerSettings {
        &self.settings
    }

    /// The lock table.
    ///
    /// Callers that need a consistent snapshot across several operations
    /// can hold a lock here themselves, as long as they release it before
    /// calling an operation that takes the same key.
    pub fn locks(&self) -> &LockTable {
        &self.locks
    }

    /// Normalize and index `draft`, persist it, and optionally attach it.
    ///
    /// If attaching fails the corpus stays saved as a root and the attach
    /// error is returned.
    pub async fn create(
        &self,
        draft: CorpusDraft,
        options: CreateOptions,
    ) -> Result<Corpus, ManagerError> {
        const OP: &str = "create";

        let mut corpus =
            Corpus::create_with(draft, self.normalizer.as_ref(), &self.settings.hasher)
                .await
                .map_err(|e| ManagerError::from_corpus(OP, None, e))?;
        let id = corpus.id();

        {
            let _lock = self.locks.acquire(LockKey::node(id)).await;
            self.persist(OP, &mut corpus, &[]).await?;
        }
        info!(
            corpus = %id,
            name = corpus.name(),
            kind = %corpus.kind(),
            words = corpus.vocabulary().len(),
            "created corpus"
        );

        if options.semantic_index {
            if let Err(e) = self.notifier.request_semantic_index(id).await {
                warn!(corpus = %id, error = %e, "semantic index request failed");
            }
        }

        match options.parent {
            Some(parent) => {
                self.attach_child(id, parent).await?;
                self.get(id).await
            }
            None => Ok(corpus),
        }
    }

    /// Fresh read of the latest version.
    pub async fn get(&self, uuid: CorpusId) -> Result<Corpus, ManagerError> {
        self.load_corpus("get", uuid).await
    }

    /// Persist `corpus` as a new version.
    ///
    /// Duplicate and self-referencing children are dropped with a warning.
    /// A parent that is also listed as a child, or that descends from the
    /// corpus, is rejected. The parent's ancestors stay locked until the
    /// write lands. The save is optimistic: it fails with
    /// [`ManagerError::Conflict`] if the store moved past `corpus.version()`
    /// or the ancestors moved while being locked.
    pub async fn save(&self, corpus: &mut Corpus) -> Result<SaveReceipt, ManagerError> {
        const OP: &str = "save";
        let id = corpus.id();

        let _locks = match corpus.parent().filter(|p| *p != id) {
            Some(parent) => self
                .lock_with_ancestors(OP, id, parent, None)
                .await?
                .ok_or(ManagerError::Conflict {
                    op: OP,
                    uuid: parent,
                    expected: None,
                    actual: None,
                })?,
            None => self.locks.acquire_all([LockKey::node(id)]).await,
        };
        self.persist(OP, corpus, &[]).await
    }

    /// Fuzzy lookup of `query` in one corpus.
    ///
    /// The query is normalized the same way as the vocabulary. Results come
    /// from a fresh read and take no lock.
    pub async fn get_candidates(
        &self,
        uuid: CorpusId,
        query: &str,
        max_distance: Option<usize>,
    ) -> Result<Vec<Candidate>, ManagerError> {
        const OP: &str = "get_candidates";

        let corpus = self.load_corpus(OP, uuid).await?;
        let normalized = self
            .normalizer
            .normalize(&[query.to_string()], corpus.language())
            .await
            .map_err(|e| ManagerError::Dependency {
                op: OP,
                uuids: vec![uuid],
                committed: Vec::new(),
                source: e.into(),
            })?;
        let Some(word) = normalized.normalized.first().filter(|w| !w.is_empty()) else {
            return Ok(Vec::new());
        };

        let distance = max_distance.unwrap_or(self.settings.max_edit_distance);
        let vocabulary = corpus.vocabulary();
        let candidates = corpus
            .get_candidates(word, distance)
            .into_iter()
            .filter_map(|position| {
                vocabulary.get(position).map(|w| Candidate {
                    position,
                    word: w.clone(),
                })
            })
            .collect::<Vec<_>>();
        debug!(corpus = %uuid, query = word.as_str(), hits = candidates.len(), "candidates");
        Ok(candidates)
    }

    /// Read every live corpus.
    pub async fn forest(&self) -> Result<ForestSnapshot, ManagerError> {
        const OP: &str = "forest";

        let ids = self
            .settings
            .retry
            .run("list_live", || self.store.list_live())
            .await
            .map_err(|e| ManagerError::Dependency {
                op: OP,
                uuids: Vec::new(),
                committed: Vec::new(),
                source: e.into(),
            })?;
        let found = self.fetch_many(OP, &ids).await?;

        let records: BTreeMap<CorpusId, CorpusRecord> = found.into_iter().collect();
        let graph = CorpusGraph::from_records(records.values());
        Ok(ForestSnapshot { graph, records })
    }

    /// Check the whole forest for structural damage.
    pub async fn verify(&self) -> Result<VerifyReport, ManagerError> {
        let snapshot = self.forest().await?;
        let records: Vec<CorpusRecord> = snapshot.records.into_values().collect();
        let report = verify_forest(&records);
        if report.ok() {
            info!(checked = report.checked, "forest verified");
        } else {
            warn!(
                checked = report.checked,
                issues = report.issues.len(),
                "forest has problems"
            );
        }
        Ok(report)
    }

    // Shared plumbing for the operations in this module and its children.

    async fn fetch(
        &self,
        op: &'static str,
        uuid: CorpusId,
    ) -> Result<Option<CorpusRecord>, ManagerError> {
        self.settings
            .retry
            .run("load", || self.store.load(uuid))
            .await
            .map_err(|e| ManagerError::from_store(op, uuid, Vec::new(), e))
    }

    async fn fetch_many(
        &self,
        op: &'static str,
        uuids: &[CorpusId],
    ) -> Result<HashMap<CorpusId, CorpusRecord>, ManagerError> {
        if uuids.is_empty() {
            return Ok(HashMap::new());
        }
        self.settings
            .retry
            .run("load_many", || self.store.load_many(uuids))
            .await
            .map_err(|e| ManagerError::Dependency {
                op,
                uuids: uuids.to_vec(),
                committed: Vec::new(),
                source: e.into(),
            })
    }

    async fn load_record(
        &self,
        op: &'static str,
        uuid: CorpusId,
    ) -> Result<CorpusRecord, ManagerError> {
        self.fetch(op, uuid)
            .await?
            .ok_or_else(|| ManagerError::not_found(op, uuid))
    }

    async fn load_corpus(&self, op: &'static str, uuid: CorpusId) -> Result<Corpus, ManagerError> {
        let record = self.load_record(op, uuid).await?;
        to_corpus(op, record, &[])
    }

    /// Write `corpus` at the version it was read at.
    ///
    /// The caller holds the node lock. `committed` lists corpora this
    /// operation already wrote, for error reporting.
    async fn persist(
        &self,
        op: &'static str,
        corpus: &mut Corpus,
        committed: &[CorpusId],
    ) -> Result<SaveReceipt, ManagerError> {
        let id = corpus.id();

        let removed = corpus.sanitize_children();
        if removed > 0 {
            warn!(corpus = %id, removed, "dropped self-referencing or duplicate children");
        }
        if let Some(parent) = corpus.parent() {
            if parent == id {
                return Err(ManagerError::validation(
                    op,
                    format!("corpus {} cannot be its own parent", id),
                ));
            }
            if corpus.children().contains(&parent) {
                return Err(ManagerError::validation(
                    op,
                    format!("corpus {} lists its parent {} as a child", id, parent),
                ));
            }
        }

        let receipt = self
            .store
            .save(corpus.to_record(), corpus.version())
            .await
            .map_err(|e| ManagerError::from_store(op, id, committed.to_vec(), e))?;
        corpus.mark_saved(receipt.storage_id.clone(), receipt.version);
        debug!(op, corpus = %id, version = receipt.version, "saved");
        Ok(receipt)
    }

    /// Ancestors of `parent`, nearest first and starting with `parent`.
    ///
    /// Reaching `child` is a cycle. So is a revisited node or a chain longer
    /// than `max_depth`. A missing ancestor ends the chain.
    async fn ancestor_chain(
        &self,
        op: &'static str,
        child: CorpusId,
        parent: CorpusId,
    ) -> Result<Vec<CorpusId>, ManagerError> {
        let mut path = vec![parent];
        let mut seen = HashSet::from([parent]);
        let mut next = self.fetch(op, parent).await?.and_then(|r| r.parent_uuid);

        while let Some(ancestor) = next {
            path.push(ancestor);
            if ancestor == child || !seen.insert(ancestor) || path.len() > self.settings.max_depth
            {
                return Err(ManagerError::Cycle {
                    op,
                    child,
                    parent,
                    path,
                });
            }
            next = self.fetch(op, ancestor).await?.and_then(|r| r.parent_uuid);
        }
        Ok(path)
    }

    /// Lock `child`, `extra` and every ancestor of `parent`.
    ///
    /// The chain is read unlocked, locked as a whole, then read again. `None`
    /// means it changed in between and the locks were released.
    async fn lock_with_ancestors(
        &self,
        op: &'static str,
        child: CorpusId,
        parent: CorpusId,
        extra: Option<CorpusId>,
    ) -> Result<Option<LockSet>, ManagerError> {
        let chain = self.ancestor_chain(op, child, parent).await?;
        let keys = chain
            .iter()
            .copied()
            .chain([child])
            .chain(extra)
            .map(LockKey::node);
        let locks = self.locks.acquire_all(keys).await;

        if self.ancestor_chain(op, child, parent).await? != chain {
            debug!(op, child = %child, parent = %parent, "ancestors changed before locking");
            return Ok(None);
        }
        Ok(Some(locks))
    }

    async fn notify_deleted(&self, uuid: CorpusId) {
        if let Err(e) = self.notifier.on_corpus_deleted(uuid).await {
            warn!(corpus = %uuid, error = %e, "delete notification failed");
        }
    }

    async fn notify_changed(&self, uuid: CorpusId, vocabulary_hash: &str) {
        if let Err(e) = self
            .notifier
            .on_corpus_vocabulary_changed(uuid, vocabulary_hash)
            .await
        {
            warn!(corpus = %uuid, error = %e, "vocabulary change notification failed");
        }
    }
}

/// Rebuild a stored record, treating an invalid one as store corruption.
fn to_corpus(
    op: &'static str,
    record: CorpusRecord,
    committed: &[CorpusId],
) -> Result<Corpus, ManagerError> {
    let id = record.corpus_uuid;
    Corpus::from_record(record).map_err(|e| {
        ManagerError::from_store(
            op,
            id,
            committed.to_vec(),
            StoreError::Corrupt(format!("stored corpus {} is invalid: {}", id, e)),
        )
    })
}
