//! manager::error
//!
//! Errors from tree operations.
//!
//! Every variant names the operation and the corpora involved. Module
//! errors are mapped here with that context; nothing is swallowed except
//! search notifications, which are best-effort.

use thiserror::Error;

use crate::core::corpus::CorpusError;
use crate::core::types::CorpusId;
use crate::normalize::NormalizeError;
use crate::store::StoreError;

/// Coarse classification for callers and the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request is invalid; retrying will not help.
    Rejected,
    /// A named corpus or edge does not exist.
    NotFound,
    /// A concurrent change or a collaborator outage; may succeed later.
    Retryable,
}

/// Failure of an external collaborator.
#[derive(Debug, Error)]
pub enum DependencyError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Normalize(#[from] NormalizeError),
}

/// Errors from [`TreeCorpusManager`](super::TreeCorpusManager) operations.
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("{op}: {reason}")]
    Validation { op: &'static str, reason: String },

    #[error("{op}: placing {child} under {parent} would create a cycle ({})", join_ids(.path))]
    Cycle {
        op: &'static str,
        child: CorpusId,
        parent: CorpusId,
        /// Ancestor walk from `parent` that reached `child` or exceeded the
        /// depth bound.
        path: Vec<CorpusId>,
    },

    #[error("{op}: corpus {uuid} not found")]
    NotFound { op: &'static str, uuid: CorpusId },

    #[error("{op}: corpus {uuid} changed concurrently (expected version {}, found {})", version(.expected), version(.actual))]
    Conflict {
        op: &'static str,
        uuid: CorpusId,
        expected: Option<u64>,
        actual: Option<u64>,
    },

    #[error("{op}: dependency failure on [{}], committed [{}]: {source}", join_ids(.uuids), join_ids(.committed))]
    Dependency {
        op: &'static str,
        uuids: Vec<CorpusId>,
        /// Corpora whose writes were persisted before the failure.
        committed: Vec<CorpusId>,
        #[source]
        source: DependencyError,
    },
}

fn join_ids(ids: &[CorpusId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

fn version(v: &Option<u64>) -> String {
    v.map_or_else(|| "none".to_string(), |v| v.to_string())
}

impl ManagerError {
    /// Classify for display and retry decisions.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ManagerError::Validation { .. } | ManagerError::Cycle { .. } => ErrorKind::Rejected,
            ManagerError::NotFound { .. } => ErrorKind::NotFound,
            ManagerError::Conflict { .. } | ManagerError::Dependency { .. } => {
                ErrorKind::Retryable
            }
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Retryable
    }

    /// Operation that failed.
    pub fn op(&self) -> &'static str {
        match self {
            ManagerError::Validation { op, .. }
            | ManagerError::Cycle { op, .. }
            | ManagerError::NotFound { op, .. }
            | ManagerError::Conflict { op, .. }
            | ManagerError::Dependency { op, .. } => op,
        }
    }

    pub(crate) fn validation(op: &'static str, reason: impl Into<String>) -> Self {
        ManagerError::Validation {
            op,
            reason: reason.into(),
        }
    }

    pub(crate) fn not_found(op: &'static str, uuid: CorpusId) -> Self {
        ManagerError::NotFound { op, uuid }
    }

    /// Map a store failure, recording what was already committed.
    pub(crate) fn from_store(
        op: &'static str,
        uuid: CorpusId,
        committed: Vec<CorpusId>,
        err: StoreError,
    ) -> Self {
        match err {
            StoreError::Conflict {
                uuid,
                expected,
                actual,
            } if committed.is_empty() => ManagerError::Conflict {
                op,
                uuid,
                expected,
                actual,
            },
            StoreError::Deleted(uuid) if committed.is_empty() => ManagerError::Validation {
                op,
                reason: format!("corpus {} has been deleted", uuid),
            },
            StoreError::NotFound(_) if committed.is_empty() => ManagerError::NotFound { op, uuid },
            other => ManagerError::Dependency {
                op,
                uuids: vec![uuid],
                committed,
                source: other.into(),
            },
        }
    }

    /// Map a corpus construction failure.
    pub(crate) fn from_corpus(op: &'static str, uuid: Option<CorpusId>, err: CorpusError) -> Self {
        match err {
            CorpusError::Normalize(source) => ManagerError::Dependency {
                op,
                uuids: uuid.into_iter().collect(),
                committed: Vec::new(),
                source: source.into(),
            },
            other => ManagerError::Validation {
                op,
                reason: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds() {
        let id = CorpusId::new();
        assert_eq!(
            ManagerError::validation("attach", "self").kind(),
            ErrorKind::Rejected
        );
        assert_eq!(
            ManagerError::not_found("get", id).kind(),
            ErrorKind::NotFound
        );
        assert!(ManagerError::Conflict {
            op: "save",
            uuid: id,
            expected: Some(1),
            actual: Some(2)
        }
        .is_retryable());
    }

    #[test]
    fn store_conflict_becomes_conflict() {
        let id = CorpusId::new();
        let err = ManagerError::from_store(
            "save",
            id,
            Vec::new(),
            StoreError::Conflict {
                uuid: id,
                expected: None,
                actual: Some(3),
            },
        );
        assert!(matches!(err, ManagerError::Conflict { actual: Some(3), .. }));
        assert!(err.to_string().contains("expected version none, found 3"));
    }

    #[test]
    fn partial_commit_is_a_dependency_error() {
        let parent = CorpusId::new();
        let child = CorpusId::new();
        let err = ManagerError::from_store(
            "attach_child",
            child,
            vec![parent],
            StoreError::Conflict {
                uuid: child,
                expected: Some(1),
                actual: Some(2),
            },
        );
        match err {
            ManagerError::Dependency {
                uuids, committed, ..
            } => {
                assert_eq!(uuids, vec![child]);
                assert_eq!(committed, vec![parent]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn deleted_uuid_is_rejected() {
        let id = CorpusId::new();
        let err = ManagerError::from_store("save", id, Vec::new(), StoreError::Deleted(id));
        assert_eq!(err.kind(), ErrorKind::Rejected);
        assert_eq!(err.op(), "save");
    }

    #[test]
    fn cycle_message_lists_path() {
        let a = CorpusId::new();
        let b = CorpusId::new();
        let err = ManagerError::Cycle {
            op: "attach_child",
            child: a,
            parent: b,
            path: vec![b, a],
        };
        let msg = err.to_string();
        assert!(msg.contains(&format!("{} -> {}", b, a)));
    }

    #[test]
    fn normalizer_outage_is_retryable() {
        let err = ManagerError::from_corpus(
            "create",
            None,
            CorpusError::Normalize(NormalizeError::Unavailable("down".into())),
        );
        assert!(err.is_retryable());
        let err = ManagerError::from_corpus(
            "create",
            None,
            CorpusError::Validation("empty name".into()),
        );
        assert_eq!(err.kind(), ErrorKind::Rejected);
    }
}
