//! search
//!
//! Notifications to downstream search structures.
//!
//! # Design
//!
//! Search indices (semantic, trie, fuzzy) live outside this crate and are
//! keyed by corpus uuid and vocabulary hash. The manager tells them when a
//! corpus changes or disappears. Delivery is best-effort: the manager logs
//! failures and carries on, so a notifier can never fail a mutation.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use thiserror::Error;

use crate::core::types::CorpusId;

/// Errors a notifier may report.
#[derive(Debug, Clone, Error)]
pub enum NotifyError {
    #[error("search index unavailable: {0}")]
    Unavailable(String),

    #[error("search index rejected notification: {0}")]
    Rejected(String),
}

/// Receives corpus lifecycle events.
#[async_trait]
pub trait SearchIndexNotifier: Send + Sync {
    /// Evict every structure built for `uuid`.
    async fn on_corpus_deleted(&self, uuid: CorpusId) -> Result<(), NotifyError>;

    /// Structures keyed by an older hash of `uuid` are stale.
    async fn on_corpus_vocabulary_changed(
        &self,
        uuid: CorpusId,
        vocabulary_hash: &str,
    ) -> Result<(), NotifyError>;

    /// Build a semantic index for `uuid` in the background.
    async fn request_semantic_index(&self, uuid: CorpusId) -> Result<(), NotifyError>;
}

/// Notifier that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

#[async_trait]
impl SearchIndexNotifier for NoopNotifier {
    async fn on_corpus_deleted(&self, _uuid: CorpusId) -> Result<(), NotifyError> {
        Ok(())
    }

    async fn on_corpus_vocabulary_changed(
        &self,
        _uuid: CorpusId,
        _vocabulary_hash: &str,
    ) -> Result<(), NotifyError> {
        Ok(())
    }

    async fn request_semantic_index(&self, _uuid: CorpusId) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// A delivered notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Deleted(CorpusId),
    VocabularyChanged(CorpusId, String),
    SemanticIndexRequested(CorpusId),
}

/// Notifier that records what it receives, optionally failing every call.
///
/// Clones share state.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    inner: Arc<Mutex<RecordingInner>>,
}

#[derive(Debug, Default)]
struct RecordingInner {
    received: Vec<Notification>,
    fail_with: Option<NotifyError>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record, then fail every call with `error`.
    pub fn failing(error: NotifyError) -> Self {
        let notifier = Self::default();
        notifier.lock().fail_with = Some(error);
        notifier
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RecordingInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Everything received so far, in order.
    pub fn received(&self) -> Vec<Notification> {
        self.lock().received.clone()
    }

    /// Uuids reported deleted, in order.
    pub fn deleted(&self) -> Vec<CorpusId> {
        self.lock()
            .received
            .iter()
            .filter_map(|n| match n {
                Notification::Deleted(id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.lock().received.clear();
    }

    fn push(&self, notification: Notification) -> Result<(), NotifyError> {
        let mut inner = self.lock();
        inner.received.push(notification);
        match &inner.fail_with {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl SearchIndexNotifier for RecordingNotifier {
    async fn on_corpus_deleted(&self, uuid: CorpusId) -> Result<(), NotifyError> {
        self.push(Notification::Deleted(uuid))
    }

    async fn on_corpus_vocabulary_changed(
        &self,
        uuid: CorpusId,
        vocabulary_hash: &str,
    ) -> Result<(), NotifyError> {
        self.push(Notification::VocabularyChanged(
            uuid,
            vocabulary_hash.to_string(),
        ))
    }

    async fn request_semantic_index(&self, uuid: CorpusId) -> Result<(), NotifyError> {
        self.push(Notification::SemanticIndexRequested(uuid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_in_order() {
        let notifier = RecordingNotifier::new();
        let a = CorpusId::new();
        let b = CorpusId::new();

        notifier.on_corpus_vocabulary_changed(a, "abc").await.unwrap();
        notifier.on_corpus_deleted(b).await.unwrap();

        assert_eq!(
            notifier.received(),
            vec![
                Notification::VocabularyChanged(a, "abc".into()),
                Notification::Deleted(b),
            ]
        );
        assert_eq!(notifier.deleted(), vec![b]);
    }

    #[tokio::test]
    async fn failing_notifier_still_records() {
        let notifier = RecordingNotifier::failing(NotifyError::Unavailable("down".into()));
        let id = CorpusId::new();

        assert!(notifier.request_semantic_index(id).await.is_err());
        assert_eq!(
            notifier.received(),
            vec![Notification::SemanticIndexRequested(id)]
        );
    }

    #[tokio::test]
    async fn noop_accepts_everything() {
        let id = CorpusId::new();
        assert!(NoopNotifier.on_corpus_deleted(id).await.is_ok());
        assert!(NoopNotifier.request_semantic_index(id).await.is_ok());
    }
}
