//! services
//!
//! Corpus kinds that compose the base entity.
//!
//! A language corpus is a master root whose children are source wordlists
//! and lexicons. A literature corpus is a master root per author whose
//! children are individual works. Neither adds fields to [`Corpus`]; both
//! are the [`CorpusKind`] tag plus the workflows here, built on
//! [`TreeCorpusManager`].

use std::sync::Arc;

use tracing::info;

use crate::core::corpus::{Corpus, CorpusDraft};
use crate::core::types::{CorpusId, CorpusKind, Language};
use crate::manager::{CreateOptions, ManagerError, TreeCorpusManager};

/// Result of adding a child under a root.
#[derive(Debug, Clone)]
pub struct Added {
    pub child: Corpus,
    /// The root after re-aggregation.
    pub root: Corpus,
}

/// Find a root named `name` of the given kind and language, or create an
/// empty master root.
pub async fn ensure_root(
    manager: &TreeCorpusManager,
    name: &str,
    kind: CorpusKind,
    language: &Language,
) -> Result<Corpus, ManagerError> {
    let snapshot = manager.forest().await?;
    let wanted = name.trim();
    let existing = snapshot.roots().into_iter().find(|id| {
        snapshot.record(*id).is_some_and(|r| {
            r.name == wanted && r.corpus_kind == kind.as_str() && r.language == language.as_str()
        })
    });

    match existing {
        Some(id) => manager.get(id).await,
        None => {
            let draft = CorpusDraft::new(wanted, Vec::<String>::new())
                .kind(kind)
                .language(language.clone())
                .master(true);
            let root = manager.create(draft, CreateOptions::default()).await?;
            info!(corpus = %root.id(), name = wanted, kind = %kind, "created root");
            Ok(root)
        }
    }
}

async fn add_under(
    manager: &TreeCorpusManager,
    op: &'static str,
    root: CorpusId,
    root_kind: CorpusKind,
    draft: CorpusDraft,
) -> Result<Added, ManagerError> {
    let parent = manager.get(root).await?;
    if parent.kind() != root_kind {
        return Err(ManagerError::Validation {
            op,
            reason: format!(
                "corpus {} is a {} corpus, expected {}",
                root,
                parent.kind(),
                root_kind
            ),
        });
    }

    let draft = draft.language(parent.language().clone());
    let child = manager.create(draft, CreateOptions::under(root)).await?;
    let root = manager.aggregate(root, true).await?;
    Ok(Added { child, root })
}

/// Language corpora: one master root per language over source wordlists.
#[derive(Debug, Clone)]
pub struct LanguageCorpusService {
    manager: Arc<TreeCorpusManager>,
}

impl LanguageCorpusService {
    pub fn new(manager: Arc<TreeCorpusManager>) -> Self {
        Self { manager }
    }

    /// The master root for `language`, created if missing.
    pub async fn ensure_root(&self, name: &str, language: &Language) -> Result<Corpus, ManagerError> {
        ensure_root(&self.manager, name, CorpusKind::Language, language).await
    }

    /// Add a source under a language root and re-aggregate the root.
    ///
    /// The source inherits the root's language. A `Custom` kind becomes
    /// `Wordlist`.
    pub async fn add_source(
        &self,
        language_root: CorpusId,
        mut draft: CorpusDraft,
    ) -> Result<Added, ManagerError> {
        if draft.kind == CorpusKind::Custom {
            draft.kind = CorpusKind::Wordlist;
        }
        add_under(
            &self.manager,
            "add_source",
            language_root,
            CorpusKind::Language,
            draft,
        )
        .await
    }
}

/// Literature corpora: one master root per author over individual works.
#[derive(Debug, Clone)]
pub struct LiteratureCorpusService {
    manager: Arc<TreeCorpusManager>,
}

impl LiteratureCorpusService {
    pub fn new(manager: Arc<TreeCorpusManager>) -> Self {
        Self { manager }
    }

    /// The master root for `author`, created if missing.
    pub async fn ensure_root(&self, author: &str, language: &Language) -> Result<Corpus, ManagerError> {
        ensure_root(&self.manager, author, CorpusKind::Literature, language).await
    }

    /// Add a work under an author root and re-aggregate the root.
    pub async fn add_work(
        &self,
        author_root: CorpusId,
        draft: CorpusDraft,
    ) -> Result<Added, ManagerError> {
        add_under(
            &self.manager,
            "add_work",
            author_root,
            CorpusKind::Literature,
            draft.kind(CorpusKind::Literature),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::ErrorKind;
    use crate::normalize::BasicNormalizer;
    use crate::store::MemoryStore;

    fn manager() -> Arc<TreeCorpusManager> {
        Arc::new(TreeCorpusManager::new(
            Arc::new(MemoryStore::new()),
            Arc::new(BasicNormalizer),
        ))
    }

    #[tokio::test]
    async fn ensure_root_is_reused() {
        let service = LanguageCorpusService::new(manager());
        let en = Language::english();

        let first = service.ensure_root("English", &en).await.unwrap();
        let second = service.ensure_root("English", &en).await.unwrap();
        assert_eq!(first.id(), second.id());
        assert!(first.is_master());
        assert_eq!(first.kind(), CorpusKind::Language);
        assert!(first.vocabulary().is_empty());
    }

    #[tokio::test]
    async fn sources_aggregate_into_language_root() {
        let service = LanguageCorpusService::new(manager());
        let root = service
            .ensure_root("English", &Language::english())
            .await
            .unwrap();

        service
            .add_source(root.id(), CorpusDraft::new("common", ["the", "bank"]))
            .await
            .unwrap();
        let added = service
            .add_source(root.id(), CorpusDraft::new("rare", ["shore", "bank"]))
            .await
            .unwrap();

        assert_eq!(added.child.kind(), CorpusKind::Wordlist);
        assert_eq!(added.child.parent(), Some(root.id()));
        assert_eq!(added.root.vocabulary(), ["bank", "shore", "the"]);
        assert_eq!(added.root.children().len(), 2);
    }

    #[tokio::test]
    async fn works_aggregate_into_author_root() {
        let m = manager();
        let service = LiteratureCorpusService::new(m.clone());
        let fr = Language::new("fr").unwrap();
        let author = service.ensure_root("Hugo", &fr).await.unwrap();

        let added = service
            .add_work(author.id(), CorpusDraft::new("Les Misérables", ["misère"]))
            .await
            .unwrap();
        assert_eq!(added.child.kind(), CorpusKind::Literature);
        assert_eq!(added.child.language(), &fr);
        assert_eq!(added.root.vocabulary(), ["misere"]);
    }

    #[tokio::test]
    async fn wrong_root_kind_is_rejected() {
        let m = manager();
        let languages = LanguageCorpusService::new(m.clone());
        let literature = LiteratureCorpusService::new(m);
        let root = languages
            .ensure_root("English", &Language::english())
            .await
            .unwrap();

        let err = literature
            .add_work(root.id(), CorpusDraft::new("work", ["a"]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Rejected);
    }
}
