//! core::verify
//!
//! Forest verification.
//!
//! # Checks
//!
//! - every record satisfies the corpus invariants (sorted vocabulary,
//!   aligned arrays, no self-reference)
//! - no cycle along child lists or parent pointers
//! - child lists and parent pointers agree
//! - no child is listed under two parents or twice under one
//! - no reference points at a missing corpus
//!
//! # Invariants
//!
//! - Never mutates anything
//! - Deterministic: issues are reported in uuid order

use std::collections::{BTreeMap, HashMap};

use thiserror::Error;

use super::graph::CorpusGraph;
use super::record::CorpusRecord;
use super::types::CorpusId;

/// One problem found by verification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyIssue {
    #[error("cycle detected: {}", join_ids(.0, " -> "))]
    CycleDetected(Vec<CorpusId>),

    #[error("corpus {0} references itself")]
    SelfReference(CorpusId),

    #[error("corpus {uuid} is invalid: {reason}")]
    InvalidRecord { uuid: CorpusId, reason: String },

    #[error("corpus {parent} lists missing child {child}")]
    DanglingChild { parent: CorpusId, child: CorpusId },

    #[error("corpus {child} points at missing parent {parent}")]
    DanglingParent { child: CorpusId, parent: CorpusId },

    #[error("corpus {parent} lists {child}, whose parent is {}", describe_parent(.recorded))]
    ParentMismatch {
        parent: CorpusId,
        child: CorpusId,
        recorded: Option<CorpusId>,
    },

    #[error("corpus {child} names {parent} as parent but is not listed there")]
    UnlistedChild { child: CorpusId, parent: CorpusId },

    #[error("corpus {child} is listed under several parents: {}", join_ids(.parents, ", "))]
    MultipleParents {
        child: CorpusId,
        parents: Vec<CorpusId>,
    },

    #[error("corpus {parent} lists {child} more than once")]
    DuplicateChild { parent: CorpusId, child: CorpusId },
}

fn join_ids(ids: &[CorpusId], separator: &str) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(separator)
}

fn describe_parent(parent: &Option<CorpusId>) -> String {
    parent.map_or_else(|| "unset".to_string(), |p| p.to_string())
}

/// Result of verification.
#[derive(Debug, Default)]
pub struct VerifyReport {
    /// Number of records checked
    pub checked: usize,
    /// Problems found
    pub issues: Vec<VerifyIssue>,
}

impl VerifyReport {
    pub fn ok(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Verify a set of live records as one forest.
pub fn verify_forest(records: &[CorpusRecord]) -> VerifyReport {
    let mut issues = Vec::new();
    let by_id: BTreeMap<CorpusId, &CorpusRecord> =
        records.iter().map(|r| (r.corpus_uuid, r)).collect();

    let mut listed_under: HashMap<CorpusId, Vec<CorpusId>> = HashMap::new();

    for (&id, record) in &by_id {
        if record.child_uuids.contains(&id) || record.parent_uuid == Some(id) {
            issues.push(VerifyIssue::SelfReference(id));
        } else if let Err(e) = record.validate() {
            issues.push(VerifyIssue::InvalidRecord {
                uuid: id,
                reason: e.to_string(),
            });
        }

        let mut seen = Vec::new();
        for &child in &record.child_uuids {
            if child == id {
                continue;
            }
            if seen.contains(&child) {
                issues.push(VerifyIssue::DuplicateChild { parent: id, child });
                continue;
            }
            seen.push(child);
            listed_under.entry(child).or_default().push(id);

            match by_id.get(&child) {
                None => issues.push(VerifyIssue::DanglingChild { parent: id, child }),
                Some(child_record) if child_record.parent_uuid != Some(id) => {
                    issues.push(VerifyIssue::ParentMismatch {
                        parent: id,
                        child,
                        recorded: child_record.parent_uuid,
                    })
                }
                Some(_) => {}
            }
        }

        if let Some(parent) = record.parent_uuid.filter(|p| *p != id) {
            match by_id.get(&parent) {
                None => issues.push(VerifyIssue::DanglingParent { child: id, parent }),
                Some(parent_record) if !parent_record.child_uuids.contains(&id) => {
                    issues.push(VerifyIssue::UnlistedChild { child: id, parent })
                }
                Some(_) => {}
            }
        }
    }

    let mut multi: Vec<(CorpusId, Vec<CorpusId>)> = listed_under
        .into_iter()
        .filter(|(_, parents)| parents.len() > 1)
        .collect();
    multi.sort();
    for (child, parents) in multi {
        issues.push(VerifyIssue::MultipleParents { child, parents });
    }

    // Self-references are already reported; keep them out of cycle search.
    let mut graph = CorpusGraph::new();
    for (&id, record) in &by_id {
        graph.add_node(id);
        if let Some(parent) = record.parent_uuid.filter(|p| *p != id) {
            graph.set_parent(id, parent);
        }
        graph.set_children(
            id,
            record.child_uuids.iter().copied().filter(|c| *c != id).collect(),
        );
    }
    if let Some(cycle) = graph.find_cycle() {
        issues.push(VerifyIssue::CycleDetected(cycle));
    }

    VerifyReport {
        checked: records.len(),
        issues,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: CorpusId) -> CorpusRecord {
        CorpusRecord::empty(id, "r", "custom", "en")
    }

    fn linked(parent: CorpusId, children: &[CorpusId]) -> Vec<CorpusRecord> {
        let mut p = record(parent);
        p.child_uuids = children.to_vec();
        let mut out = vec![p];
        for &c in children {
            let mut r = record(c);
            r.parent_uuid = Some(parent);
            out.push(r);
        }
        out
    }

    #[test]
    fn consistent_forest_passes() {
        let (a, b, c) = (CorpusId::new(), CorpusId::new(), CorpusId::new());
        let report = verify_forest(&linked(a, &[b, c]));
        assert!(report.ok(), "{:?}", report.issues);
        assert_eq!(report.checked, 3);
    }

    #[test]
    fn dangling_child_reported() {
        let (a, missing) = (CorpusId::new(), CorpusId::new());
        let mut r = record(a);
        r.child_uuids = vec![missing];
        let report = verify_forest(&[r]);
        assert_eq!(
            report.issues,
            vec![VerifyIssue::DanglingChild {
                parent: a,
                child: missing
            }]
        );
    }

    #[test]
    fn parent_mismatch_reported() {
        let (a, b) = (CorpusId::new(), CorpusId::new());
        let mut records = linked(a, &[b]);
        records[1].parent_uuid = None;
        let report = verify_forest(&records);
        assert!(report.issues.contains(&VerifyIssue::ParentMismatch {
            parent: a,
            child: b,
            recorded: None
        }));
    }

    #[test]
    fn unlisted_child_reported() {
        let (a, b) = (CorpusId::new(), CorpusId::new());
        let mut child = record(b);
        child.parent_uuid = Some(a);
        let report = verify_forest(&[record(a), child]);
        assert_eq!(
            report.issues,
            vec![VerifyIssue::UnlistedChild {
                child: b,
                parent: a
            }]
        );
    }

    #[test]
    fn self_reference_reported_once() {
        let a = CorpusId::new();
        let mut r = record(a);
        r.child_uuids = vec![a];
        let report = verify_forest(&[r]);
        assert_eq!(report.issues, vec![VerifyIssue::SelfReference(a)]);
    }

    #[test]
    fn two_node_cycle_reported() {
        let (a, b) = (CorpusId::new(), CorpusId::new());
        let mut ra = record(a);
        ra.child_uuids = vec![b];
        ra.parent_uuid = Some(b);
        let mut rb = record(b);
        rb.child_uuids = vec![a];
        rb.parent_uuid = Some(a);

        let report = verify_forest(&[ra, rb]);
        assert!(report
            .issues
            .iter()
            .any(|i| matches!(i, VerifyIssue::CycleDetected(_))));
    }

    #[test]
    fn multiple_parents_reported() {
        let (a, b, c) = (CorpusId::new(), CorpusId::new(), CorpusId::new());
        let mut records = linked(a, &[c]);
        let mut rb = record(b);
        rb.child_uuids = vec![c];
        records.push(rb);

        let report = verify_forest(&records);
        assert!(report
            .issues
            .iter()
            .any(|i| matches!(i, VerifyIssue::MultipleParents { child, .. } if *child == c)));
    }

    #[test]
    fn duplicate_child_reported() {
        let (a, b) = (CorpusId::new(), CorpusId::new());
        let mut records = linked(a, &[b]);
        records[0].child_uuids.push(b);
        let report = verify_forest(&records);
        assert!(report
            .issues
            .contains(&VerifyIssue::DuplicateChild { parent: a, child: b }));
    }

    #[test]
    fn unsorted_vocabulary_reported() {
        let a = CorpusId::new();
        let mut r = record(a);
        r.vocabulary = vec!["b".into(), "a".into()];
        r.lemmas = r.vocabulary.clone();
        let report = verify_forest(&[r]);
        assert!(matches!(
            report.issues.as_slice(),
            [VerifyIssue::InvalidRecord { .. }]
        ));
    }
}
