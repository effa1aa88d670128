//! manager::aggregate
//!
//! Recursive vocabulary aggregation.
//!
//! # Algorithm
//!
//! 1. Take the subtree lock on the root.
//! 2. Fetch the subtree level by level, one `load_many` per level.
//! 3. Merge bottom-up: each node's result is the union of its children's
//!    results, plus its own vocabulary unless it is a master.
//! 4. With write-back, persist every node whose content changed, children
//!    before parents, each under its node lock and at the version read in
//!    step 2.
//!
//! # Corruption
//!
//! Dangling children are skipped with a warning. A node reachable twice is
//! fetched once; an edge that closes a cycle contributes nothing. A subtree
//! deeper than `max_depth` is rejected before anything is written.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info, warn};

use super::error::ManagerError;
use super::locks::LockKey;
use super::{to_corpus, TreeCorpusManager};
use crate::core::corpus::{Corpus, VocabularyContent, VocabularyMerger};
use crate::core::types::CorpusId;

impl TreeCorpusManager {
    /// Merge the vocabularies of `root`'s subtree into `root`.
    ///
    /// Returns the root with the merged vocabulary and fresh indices. With
    /// `write_back`, every changed node in the subtree is persisted and the
    /// returned root carries its new version; without it nothing is written
    /// and the returned value is detached from the store.
    ///
    /// Running it twice with no change in between gives the same
    /// vocabulary and writes nothing the second time.
    pub async fn aggregate(&self, root: CorpusId, write_back: bool) -> Result<Corpus, ManagerError> {
        const OP: &str = "aggregate";

        let _subtree = self.locks.acquire(LockKey::subtree(root)).await;
        let corpora = self.fetch_subtree(OP, root).await?;
        let (merged, finish_order) = merge_subtree(root, &corpora);

        let mut result = None;
        let mut committed = Vec::new();
        for id in finish_order {
            let (Some(snapshot), Some(content)) = (corpora.get(&id), merged.get(&id)) else {
                continue;
            };
            if !write_back && id != root {
                continue;
            }

            let mut corpus = snapshot.clone();
            let unchanged = corpus.content() == content;
            if !unchanged {
                corpus
                    .replace_content(content.clone(), &self.settings.hasher)
                    .map_err(|e| ManagerError::from_corpus(OP, Some(id), e))?;
            }

            if write_back && !unchanged {
                let _node = self.locks.acquire(LockKey::node(id)).await;
                self.persist(OP, &mut corpus, &committed).await?;
                committed.push(id);
                self.notify_changed(id, corpus.vocabulary_hash()).await;
                debug!(corpus = %id, words = corpus.vocabulary().len(), "wrote aggregate");
            }

            if id == root {
                result = Some(corpus);
            }
        }

        let corpus = result.ok_or_else(|| ManagerError::not_found(OP, root))?;
        info!(
            corpus = %root,
            nodes = corpora.len(),
            written = committed.len(),
            words = corpus.vocabulary().len(),
            "aggregated subtree"
        );
        Ok(corpus)
    }

    /// Every live corpus reachable from `root`, keyed by id.
    async fn fetch_subtree(
        &self,
        op: &'static str,
        root: CorpusId,
    ) -> Result<HashMap<CorpusId, Corpus>, ManagerError> {
        let root_corpus = self.load_corpus(op, root).await?;
        let mut frontier: Vec<CorpusId> = root_corpus.children().to_vec();
        let mut visited = HashSet::from([root]);
        let mut corpora = HashMap::from([(root, root_corpus)]);
        let mut depth = 0;

        loop {
            let level: Vec<CorpusId> = frontier
                .into_iter()
                .filter(|id| visited.insert(*id))
                .collect();
            if level.is_empty() {
                return Ok(corpora);
            }
            depth += 1;
            if depth > self.settings.max_depth {
                return Err(ManagerError::validation(
                    op,
                    format!(
                        "subtree of {} is deeper than {} levels",
                        root, self.settings.max_depth
                    ),
                ));
            }

            let mut found = self.fetch_many(op, &level).await?;
            frontier = Vec::new();
            for id in level {
                match found.remove(&id) {
                    Some(record) => {
                        let corpus = to_corpus(op, record, &[])?;
                        frontier.extend(corpus.children().iter().copied());
                        corpora.insert(id, corpus);
                    }
                    None => warn!(corpus = %id, root = %root, "skipping dangling child"),
                }
            }
        }
    }
}

/// Post-order merge over fetched corpora.
///
/// Returns each node's merged content and the order nodes finished in,
/// children before parents.
fn merge_subtree(
    root: CorpusId,
    corpora: &HashMap<CorpusId, Corpus>,
) -> (HashMap<CorpusId, VocabularyContent>, Vec<CorpusId>) {
    let mut merged: HashMap<CorpusId, VocabularyContent> = HashMap::new();
    let mut finish_order = Vec::with_capacity(corpora.len());
    let mut on_path: HashSet<CorpusId> = HashSet::new();
    let mut stack = vec![(root, false)];

    while let Some((id, expanded)) = stack.pop() {
        if merged.contains_key(&id) {
            continue;
        }
        let Some(corpus) = corpora.get(&id) else {
            continue;
        };

        if !expanded {
            if !on_path.insert(id) {
                continue;
            }
            stack.push((id, true));
            for &child in corpus.children().iter().rev() {
                if !merged.contains_key(&child) && !on_path.contains(&child) {
                    stack.push((child, false));
                }
            }
            continue;
        }

        let mut merger = VocabularyMerger::new();
        if !corpus.is_master() {
            merger.add(corpus.content());
        }
        for child in corpus.children() {
            match merged.get(child) {
                Some(content) => merger.add(content),
                None if corpora.contains_key(child) => {
                    warn!(parent = %id, child = %child, "skipping child that closes a cycle")
                }
                None => {}
            }
        }

        merged.insert(id, merger.finish());
        on_path.remove(&id);
        finish_order.push(id);
    }

    (merged, finish_order)
}
