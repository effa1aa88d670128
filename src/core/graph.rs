//! core::graph
//!
//! Corpus forest representation and traversal.
//!
//! # Architecture
//!
//! The graph is built from persisted records and keeps both directions as
//! recorded, without reconciling them:
//! - parent pointers from `parent_uuid`
//! - ordered child lists from `child_uuids`
//!
//! Keeping them separate lets verification report disagreement between the
//! two. Traversals follow child lists and never loop, even on corrupt
//! input.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use super::record::CorpusRecord;
use super::types::CorpusId;

/// The corpus forest as recorded in the store.
#[derive(Debug, Default)]
pub struct CorpusGraph {
    nodes: BTreeSet<CorpusId>,
    parents: HashMap<CorpusId, CorpusId>,
    children: HashMap<CorpusId, Vec<CorpusId>>,
}

impl CorpusGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from live records.
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a CorpusRecord>) -> Self {
        let mut graph = Self::new();
        for record in records {
            graph.add_node(record.corpus_uuid);
            if let Some(parent) = record.parent_uuid {
                graph.set_parent(record.corpus_uuid, parent);
            }
            graph.set_children(record.corpus_uuid, record.child_uuids.clone());
        }
        graph
    }

    pub fn add_node(&mut self, id: CorpusId) {
        self.nodes.insert(id);
    }

    /// Record `child`'s parent pointer.
    pub fn set_parent(&mut self, child: CorpusId, parent: CorpusId) {
        self.parents.insert(child, parent);
    }

    /// Record `parent`'s child list.
    pub fn set_children(&mut self, parent: CorpusId, children: Vec<CorpusId>) {
        self.children.insert(parent, children);
    }

    /// Add a consistent edge in both directions.
    pub fn add_edge(&mut self, child: CorpusId, parent: CorpusId) {
        self.nodes.insert(child);
        self.nodes.insert(parent);
        self.parents.insert(child, parent);
        let list = self.children.entry(parent).or_default();
        if !list.contains(&child) {
            list.push(child);
        }
    }

    pub fn contains(&self, id: CorpusId) -> bool {
        self.nodes.contains(&id)
    }

    /// All known nodes, sorted.
    pub fn nodes(&self) -> impl Iterator<Item = CorpusId> + '_ {
        self.nodes.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Recorded parent pointer.
    pub fn parent(&self, id: CorpusId) -> Option<CorpusId> {
        self.parents.get(&id).copied()
    }

    /// Recorded child list.
    pub fn children(&self, id: CorpusId) -> &[CorpusId] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Nodes with no parent, or whose parent is not in the graph.
    pub fn roots(&self) -> Vec<CorpusId> {
        self.nodes
            .iter()
            .filter(|id| self.parent(**id).map_or(true, |p| !self.contains(p)))
            .copied()
            .collect()
    }

    /// Find a cycle along child lists or parent pointers.
    ///
    /// Returns the nodes on the cycle, starting and ending with the same id.
    pub fn find_cycle(&self) -> Option<Vec<CorpusId>> {
        self.find_child_cycle().or_else(|| self.find_parent_cycle())
    }

    fn find_child_cycle(&self) -> Option<Vec<CorpusId>> {
        let mut done = HashSet::new();
        for &start in &self.nodes {
            if done.contains(&start) {
                continue;
            }
            let mut path = Vec::new();
            let mut on_path = HashSet::new();
            if let Some(cycle) = self.child_cycle_from(start, &mut done, &mut path, &mut on_path)
            {
                return Some(cycle);
            }
        }
        None
    }

    fn child_cycle_from(
        &self,
        id: CorpusId,
        done: &mut HashSet<CorpusId>,
        path: &mut Vec<CorpusId>,
        on_path: &mut HashSet<CorpusId>,
    ) -> Option<Vec<CorpusId>> {
        if on_path.contains(&id) {
            let start = path.iter().position(|p| *p == id).unwrap_or(0);
            let mut cycle = path[start..].to_vec();
            cycle.push(id);
            return Some(cycle);
        }
        if !done.insert(id) {
            return None;
        }

        path.push(id);
        on_path.insert(id);
        for &child in self.children(id) {
            if let Some(cycle) = self.child_cycle_from(child, done, path, on_path) {
                return Some(cycle);
            }
        }
        on_path.remove(&id);
        path.pop();
        None
    }

    fn find_parent_cycle(&self) -> Option<Vec<CorpusId>> {
        let mut cleared = HashSet::new();
        for &start in self.parents.keys() {
            let mut seen = Vec::new();
            let mut current = Some(start);
            while let Some(id) = current {
                if cleared.contains(&id) {
                    break;
                }
                if let Some(pos) = seen.iter().position(|s| *s == id) {
                    let mut cycle = seen[pos..].to_vec();
                    cycle.push(id);
                    return Some(cycle);
                }
                seen.push(id);
                current = self.parent(id);
            }
            cleared.extend(seen);
        }
        None
    }

    /// Ancestors from immediate parent outward. Stops at a repeat.
    pub fn ancestors(&self, id: CorpusId) -> Vec<CorpusId> {
        let mut result = Vec::new();
        let mut seen = HashSet::from([id]);
        let mut current = self.parent(id);

        while let Some(parent) = current {
            if !seen.insert(parent) {
                break;
            }
            result.push(parent);
            current = self.parent(parent);
        }

        result
    }

    /// Descendants in breadth-first order, each at most once.
    ///
    /// # Example
    ///
    /// ```
    /// use corpus_forest::core::graph::CorpusGraph;
    /// use corpus_forest::core::types::CorpusId;
    ///
    /// let (root, a, b) = (CorpusId::new(), CorpusId::new(), CorpusId::new());
    /// let mut graph = CorpusGraph::new();
    /// graph.add_edge(a, root);
    /// graph.add_edge(b, a);
    ///
    /// assert_eq!(graph.descendants(root), vec![a, b]);
    /// assert_eq!(graph.ancestors(b), vec![a, root]);
    /// ```
    pub fn descendants(&self, id: CorpusId) -> Vec<CorpusId> {
        let mut result = Vec::new();
        let mut seen = HashSet::from([id]);
        let mut queue: VecDeque<CorpusId> = self.children(id).iter().copied().collect();

        while let Some(current) = queue.pop_front() {
            if seen.insert(current) {
                result.push(current);
                queue.extend(self.children(current).iter().copied());
            }
        }

        result
    }

    /// Pre-order walk from `root` with depths, for display.
    ///
    /// Children appear in recorded order. Each node appears once.
    pub fn depth_first(&self, root: CorpusId) -> Vec<(usize, CorpusId)> {
        let mut result = Vec::new();
        let mut seen = HashSet::new();
        let mut stack = vec![(0usize, root)];

        while let Some((depth, id)) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            result.push((depth, id));
            for &child in self.children(id).iter().rev() {
                stack.push((depth + 1, child));
            }
        }

        result
    }
}
