//! core::corpus
//!
//! The corpus entity and its factory.
//!
//! # Model
//!
//! A corpus is an independent value addressed by its [`CorpusId`].
//! `parent_uuid` and `child_uuids` are plain identifiers, never owning
//! references; ownership of every node lives in the store.
//!
//! # Invariants
//!
//! - `vocabulary` is sorted and duplicate-free
//! - `lemmas` is position-aligned with `vocabulary`
//! - every `original_index` entry points into `vocabulary`
//! - `child_uuids` never contains the corpus itself and has no duplicates
//!
//! Indices are derived and built lazily on first access.
//!
//! # Example
//!
//! ```
//! use corpus_forest::core::corpus::{Corpus, CorpusDraft};
//! use corpus_forest::normalize::BasicNormalizer;
//!
//! # tokio_test::block_on(async {
//! let draft = CorpusDraft::new("sample", ["Bank", "bak", "tank", "bank"]);
//! let corpus = Corpus::create(draft, &BasicNormalizer).await.unwrap();
//!
//! assert_eq!(corpus.vocabulary(), ["bak", "bank", "tank"]);
//! assert_eq!(corpus.originals_for("bank"), vec!["Bank", "bank"]);
//! # });
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

use thiserror::Error;

use crate::core::hashing::VocabularyHasher;
use crate::core::index::{CorpusIndices, IndexBuilder, IndexError, IndexInput};
use crate::core::record::{CorpusRecord, RecordError, RECORD_KIND, SCHEMA_VERSION};
use crate::core::types::{CorpusId, CorpusKind, Language, StorageId, TypeError, UtcTimestamp};
use crate::normalize::{NormalizationService, NormalizeError};

/// Errors from corpus construction and mutation.
#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("invalid corpus: {0}")]
    Validation(String),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error(transparent)]
    Record(#[from] RecordError),

    #[error(transparent)]
    Type(#[from] TypeError),
}

/// Input to [`Corpus::create`].
#[derive(Debug, Clone)]
pub struct CorpusDraft {
    pub name: String,
    /// Raw words and phrases, in any order, possibly repeated.
    pub words: Vec<String>,
    pub kind: CorpusKind,
    pub language: Language,
    pub is_master: bool,
}

impl CorpusDraft {
    /// A custom-kind English draft.
    pub fn new<I, S>(name: impl Into<String>, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            words: words.into_iter().map(Into::into).collect(),
            kind: CorpusKind::Custom,
            language: Language::english(),
            is_master: false,
        }
    }

    /// Set the corpus kind.
    pub fn kind(mut self, kind: CorpusKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set the language.
    pub fn language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    /// Mark the corpus as a master.
    pub fn master(mut self, is_master: bool) -> Self {
        self.is_master = is_master;
        self
    }
}

/// The authoritative vocabulary arrays of a corpus.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VocabularyContent {
    pub vocabulary: Vec<String>,
    pub lemmas: Vec<String>,
    pub original_vocabulary: Vec<String>,
    pub original_index: Vec<u32>,
}

impl VocabularyContent {
    fn as_input(&self) -> IndexInput<'_> {
        IndexInput {
            vocabulary: &self.vocabulary,
            lemmas: &self.lemmas,
            original_vocabulary: &self.original_vocabulary,
            original_index: &self.original_index,
        }
    }

    /// Number of words.
    pub fn len(&self) -> usize {
        self.vocabulary.len()
    }

    /// Whether there are no words.
    pub fn is_empty(&self) -> bool {
        self.vocabulary.is_empty()
    }
}

#[derive(Debug, Default)]
struct WordEntry {
    lemma: Option<String>,
    originals: BTreeSet<String>,
}

/// Order-independent union of vocabularies.
///
/// Words are unioned, original forms are unioned per word, and when two
/// sources disagree on a word's lemma the lexicographically smallest wins,
/// so the result never depends on the order sources are added.
#[derive(Debug, Default)]
pub struct VocabularyMerger {
    entries: BTreeMap<String, WordEntry>,
}

impl VocabularyMerger {
    /// Create an empty merger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add every word of `content`.
    pub fn add(&mut self, content: &VocabularyContent) {
        for (word, lemma) in content.vocabulary.iter().zip(&content.lemmas) {
            let entry = self.entries.entry(word.clone()).or_default();
            match &entry.lemma {
                Some(existing) if existing <= lemma => {}
                _ => entry.lemma = Some(lemma.clone()),
            }
        }
        for (original, &target) in content
            .original_vocabulary
            .iter()
            .zip(&content.original_index)
        {
            if let Some(word) = content.vocabulary.get(target as usize) {
                self.entries
                    .entry(word.clone())
                    .or_default()
                    .originals
                    .insert(original.clone());
            }
        }
    }

    /// Number of distinct words so far.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been added.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Produce sorted, aligned content.
    pub fn finish(self) -> VocabularyContent {
        let mut vocabulary = Vec::with_capacity(self.entries.len());
        let mut lemmas = Vec::with_capacity(self.entries.len());
        let mut pairs: Vec<(String, u32)> = Vec::new();

        for (pos, (word, entry)) in self.entries.into_iter().enumerate() {
            lemmas.push(entry.lemma.unwrap_or_else(|| word.clone()));
            vocabulary.push(word);
            pairs.extend(entry.originals.into_iter().map(|o| (o, pos as u32)));
        }

        pairs.sort();
        let (original_vocabulary, original_index) = pairs.into_iter().unzip();

        VocabularyContent {
            vocabulary,
            lemmas,
            original_vocabulary,
            original_index,
        }
    }
}

/// One node of the corpus forest.
#[derive(Debug, Clone)]
pub struct Corpus {
    corpus_uuid: CorpusId,
    storage_id: Option<StorageId>,
    version: Option<u64>,
    saved_at: Option<UtcTimestamp>,
    name: String,
    corpus_kind: CorpusKind,
    language: Language,
    parent_uuid: Option<CorpusId>,
    child_uuids: Vec<CorpusId>,
    is_master: bool,
    content: VocabularyContent,
    vocabulary_hash: String,
    indices: OnceLock<CorpusIndices>,
}

impl Corpus {
    /// Normalize, lemmatize and index raw words into a new, unpersisted corpus.
    ///
    /// Uses the default [`VocabularyHasher`].
    ///
    /// # Errors
    ///
    /// - [`CorpusError::Validation`] for a blank name or a misaligned
    ///   normalizer response
    /// - [`CorpusError::Normalize`] if the service fails
    pub async fn create(
        draft: CorpusDraft,
        normalizer: &dyn NormalizationService,
    ) -> Result<Self, CorpusError> {
        Self::create_with(draft, normalizer, &VocabularyHasher::default()).await
    }

    /// Like [`Corpus::create`] with an explicit hasher.
    pub async fn create_with(
        draft: CorpusDraft,
        normalizer: &dyn NormalizationService,
        hasher: &VocabularyHasher,
    ) -> Result<Self, CorpusError> {
        let name = validate_name(&draft.name)?;

        let normalized = normalizer.normalize(&draft.words, &draft.language).await?;
        if normalized.normalized.len() != draft.words.len()
            || normalized.original.len() != draft.words.len()
        {
            return Err(CorpusError::Validation(format!(
                "normalizer returned {} normalized and {} original forms for {} tokens",
                normalized.normalized.len(),
                normalized.original.len(),
                draft.words.len()
            )));
        }

        let mut grouped: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (word, original) in normalized.normalized.into_iter().zip(normalized.original) {
            if word.is_empty() {
                continue;
            }
            let originals = grouped.entry(word).or_default();
            if !original.is_empty() {
                originals.insert(original);
            }
        }

        let vocabulary: Vec<String> = grouped.keys().cloned().collect();
        let lemmas = normalizer.lemmatize(&vocabulary, &draft.language).await?;
        if lemmas.len() != vocabulary.len() {
            return Err(IndexError::LemmaLengthMismatch {
                vocabulary: vocabulary.len(),
                lemmas: lemmas.len(),
            }
            .into());
        }

        let mut merger = VocabularyMerger::new();
        let mut original_vocabulary = Vec::new();
        let mut original_index = Vec::new();
        for (pos, originals) in grouped.into_values().enumerate() {
            for original in originals {
                original_vocabulary.push(original);
                original_index.push(pos as u32);
            }
        }
        merger.add(&VocabularyContent {
            vocabulary,
            lemmas,
            original_vocabulary,
            original_index,
        });
        let content = merger.finish();

        let indices = IndexBuilder::build(&content.as_input())?;
        let vocabulary_hash = hasher.hash(&content.vocabulary, None);

        Ok(Self {
            corpus_uuid: CorpusId::new(),
            storage_id: None,
            version: None,
            saved_at: None,
            name,
            corpus_kind: draft.kind,
            language: draft.language,
            parent_uuid: None,
            child_uuids: Vec::new(),
            is_master: draft.is_master,
            content,
            vocabulary_hash,
            indices: OnceLock::from(indices),
        })
    }

    /// Rebuild a corpus from a persisted record.
    ///
    /// Indices are not built until first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the record violates a corpus invariant.
    pub fn from_record(record: CorpusRecord) -> Result<Self, CorpusError> {
        record.validate()?;
        let corpus_kind = record.corpus_kind.parse()?;
        let language = Language::new(record.language)?;
        let version = (record.version > 0).then_some(record.version);

        Ok(Self {
            corpus_uuid: record.corpus_uuid,
            storage_id: record.storage_id,
            version,
            saved_at: Some(record.created_at),
            name: record.name,
            corpus_kind,
            language,
            parent_uuid: record.parent_uuid,
            child_uuids: record.child_uuids,
            is_master: record.is_master,
            content: VocabularyContent {
                vocabulary: record.vocabulary,
                lemmas: record.lemmas,
                original_vocabulary: record.original_vocabulary,
                original_index: record.original_index,
            },
            vocabulary_hash: record.vocabulary_hash,
            indices: OnceLock::new(),
        })
    }

    /// Convert to the storable form.
    ///
    /// `version`, `storage_id` and `created_at` are overwritten by the store.
    pub fn to_record(&self) -> CorpusRecord {
        CorpusRecord {
            kind: RECORD_KIND.to_string(),
            schema_version: SCHEMA_VERSION,
            corpus_uuid: self.corpus_uuid,
            parent_uuid: self.parent_uuid,
            child_uuids: self.child_uuids.clone(),
            is_master: self.is_master,
            name: self.name.clone(),
            corpus_kind: self.corpus_kind.as_str().to_string(),
            language: self.language.as_str().to_string(),
            vocabulary: self.content.vocabulary.clone(),
            lemmas: self.content.lemmas.clone(),
            original_vocabulary: self.content.original_vocabulary.clone(),
            original_index: self.content.original_index.clone(),
            vocabulary_hash: self.vocabulary_hash.clone(),
            version: self.version.unwrap_or(0),
            storage_id: self.storage_id.clone(),
            created_at: UtcTimestamp::now(),
        }
    }

    pub fn id(&self) -> CorpusId {
        self.corpus_uuid
    }

    pub fn storage_id(&self) -> Option<&StorageId> {
        self.storage_id.as_ref()
    }

    /// Version this value was loaded from or last saved as.
    pub fn version(&self) -> Option<u64> {
        self.version
    }

    /// When the loaded version was written.
    pub fn saved_at(&self) -> Option<&UtcTimestamp> {
        self.saved_at.as_ref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> CorpusKind {
        self.corpus_kind
    }

    pub fn language(&self) -> &Language {
        &self.language
    }

    pub fn parent(&self) -> Option<CorpusId> {
        self.parent_uuid
    }

    pub fn children(&self) -> &[CorpusId] {
        &self.child_uuids
    }

    pub fn is_master(&self) -> bool {
        self.is_master
    }

    pub fn vocabulary(&self) -> &[String] {
        &self.content.vocabulary
    }

    pub fn lemmas(&self) -> &[String] {
        &self.content.lemmas
    }

    pub fn original_vocabulary(&self) -> &[String] {
        &self.content.original_vocabulary
    }

    pub fn content(&self) -> &VocabularyContent {
        &self.content
    }

    pub fn vocabulary_hash(&self) -> &str {
        &self.vocabulary_hash
    }

    /// Derived indices, built on first access.
    pub fn indices(&self) -> &CorpusIndices {
        self.indices
            .get_or_init(|| IndexBuilder::assemble(&self.content.as_input()))
    }

    /// Whether indices have been built for the current vocabulary.
    pub fn has_indices(&self) -> bool {
        self.indices.get().is_some()
    }

    /// Exact membership test on normalized words.
    pub fn contains(&self, word: &str) -> bool {
        self.indices().position(word).is_some()
    }

    /// Original forms that normalize to `word`.
    pub fn originals_for(&self, word: &str) -> Vec<&str> {
        let indices = self.indices();
        match indices.position(word) {
            Some(pos) => indices
                .originals_of(pos)
                .iter()
                .map(|&i| self.content.original_vocabulary[i].as_str())
                .collect(),
            None => Vec::new(),
        }
    }

    /// Ranked candidate positions for an approximate match.
    ///
    /// Read-only over this value; no locking involved.
    pub fn get_candidates(&self, query: &str, max_distance: usize) -> Vec<usize> {
        self.indices().candidates(query, max_distance)
    }

    /// Ranked candidate words for an approximate match.
    pub fn candidate_words(&self, query: &str, max_distance: usize) -> Vec<&str> {
        self.get_candidates(query, max_distance)
            .into_iter()
            .map(|p| self.content.vocabulary[p].as_str())
            .collect()
    }

    /// Cache key for structures derived from this vocabulary under `scope`.
    pub fn cache_key(&self, hasher: &VocabularyHasher, scope: Option<&str>) -> String {
        format!(
            "{}:{}",
            self.corpus_uuid,
            hasher.hash(&self.content.vocabulary, scope)
        )
    }

    /// Rename the corpus.
    ///
    /// # Errors
    ///
    /// Returns [`CorpusError::Validation`] for a blank name.
    pub fn set_name(&mut self, name: &str) -> Result<(), CorpusError> {
        self.name = validate_name(name)?;
        Ok(())
    }

    pub fn set_master(&mut self, is_master: bool) {
        self.is_master = is_master;
    }

    /// Append a child if absent. Returns whether it was added.
    ///
    /// # Errors
    ///
    /// Returns [`CorpusError::Validation`] if `child` is this corpus.
    pub fn add_child(&mut self, child: CorpusId) -> Result<bool, CorpusError> {
        if child == self.corpus_uuid {
            return Err(CorpusError::Validation(format!(
                "corpus {} cannot be its own child",
                child
            )));
        }
        if self.child_uuids.contains(&child) {
            return Ok(false);
        }
        self.child_uuids.push(child);
        Ok(true)
    }

    /// Remove a child. Returns whether it was present.
    pub fn remove_child(&mut self, child: CorpusId) -> bool {
        let before = self.child_uuids.len();
        self.child_uuids.retain(|c| *c != child);
        self.child_uuids.len() != before
    }

    /// Set or clear the parent back-reference.
    ///
    /// # Errors
    ///
    /// Returns [`CorpusError::Validation`] if `parent` is this corpus.
    pub fn set_parent(&mut self, parent: Option<CorpusId>) -> Result<(), CorpusError> {
        if parent == Some(self.corpus_uuid) {
            return Err(CorpusError::Validation(format!(
                "corpus {} cannot be its own parent",
                self.corpus_uuid
            )));
        }
        self.parent_uuid = parent;
        Ok(())
    }

    /// Drop self-references and duplicate children, keeping first occurrences.
    ///
    /// Returns the number of entries removed.
    pub fn sanitize_children(&mut self) -> usize {
        let me = self.corpus_uuid;
        let before = self.child_uuids.len();
        let mut seen = BTreeSet::new();
        self.child_uuids.retain(|c| *c != me && seen.insert(*c));
        before - self.child_uuids.len()
    }

    /// Replace the vocabulary, rehash and drop stale indices.
    ///
    /// # Errors
    ///
    /// Returns [`CorpusError::Index`] if `content` is misaligned or unsorted.
    pub fn replace_content(
        &mut self,
        content: VocabularyContent,
        hasher: &VocabularyHasher,
    ) -> Result<(), CorpusError> {
        let indices = IndexBuilder::build(&content.as_input())?;
        self.vocabulary_hash = hasher.hash(&content.vocabulary, None);
        self.content = content;
        self.indices = OnceLock::from(indices);
        Ok(())
    }

    /// Record the outcome of a successful save.
    pub fn mark_saved(&mut self, storage_id: StorageId, version: u64) {
        self.storage_id = Some(storage_id);
        self.version = Some(version);
        self.saved_at = Some(UtcTimestamp::now());
    }
}

fn validate_name(name: &str) -> Result<String, CorpusError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CorpusError::Validation("corpus name cannot be empty".into()));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{BasicNormalizer, Normalized};
    use async_trait::async_trait;

    async fn create(words: &[&str]) -> Corpus {
        Corpus::create(
            CorpusDraft::new("test", words.iter().copied()),
            &BasicNormalizer,
        )
        .await
        .unwrap()
    }

    fn content(words: &[&str]) -> VocabularyContent {
        let vocabulary: Vec<String> = words.iter().map(|s| s.to_string()).collect();
        VocabularyContent {
            lemmas: vocabulary.clone(),
            vocabulary,
            ..Default::default()
        }
    }

    /// Returns fewer lemmas than words.
    struct ShortLemmatizer;

    #[async_trait]
    impl NormalizationService for ShortLemmatizer {
        async fn normalize(
            &self,
            raw: &[String],
            language: &Language,
        ) -> Result<Normalized, NormalizeError> {
            BasicNormalizer.normalize(raw, language).await
        }

        async fn lemmatize(
            &self,
            normalized: &[String],
            _language: &Language,
        ) -> Result<Vec<String>, NormalizeError> {
            Ok(normalized.iter().skip(1).cloned().collect())
        }
    }

    /// Drops the last normalized token.
    struct LossyNormalizer;

    #[async_trait]
    impl NormalizationService for LossyNormalizer {
        async fn normalize(
            &self,
            raw: &[String],
            language: &Language,
        ) -> Result<Normalized, NormalizeError> {
            let mut out = BasicNormalizer.normalize(raw, language).await?;
            out.normalized.pop();
            Ok(out)
        }

        async fn lemmatize(
            &self,
            normalized: &[String],
            _language: &Language,
        ) -> Result<Vec<String>, NormalizeError> {
            Ok(normalized.to_vec())
        }
    }

    #[tokio::test]
    async fn create_sorts_and_dedupes() {
        let corpus = create(&["tank", "Bank", "bak", "bank", "TANK"]).await;
        assert_eq!(corpus.vocabulary(), ["bak", "bank", "tank"]);
        assert!(corpus.has_indices());
        assert!(corpus.version().is_none());
        assert!(corpus.storage_id().is_none());
    }

    #[tokio::test]
    async fn create_keeps_original_forms() {
        let corpus = create(&["Café", "cafe", "CAFÉ"]).await;
        assert_eq!(corpus.vocabulary(), ["cafe"]);
        assert_eq!(corpus.originals_for("cafe"), vec!["CAFÉ", "Café", "cafe"]);
    }

    #[tokio::test]
    async fn create_drops_empty_tokens() {
        let corpus = create(&["", "   ", "word"]).await;
        assert_eq!(corpus.vocabulary(), ["word"]);
    }

    #[tokio::test]
    async fn identical_content_gets_distinct_ids() {
        let a = create(&["same"]).await;
        let b = create(&["same"]).await;
        assert_ne!(a.id(), b.id());
        assert_eq!(a.vocabulary_hash(), b.vocabulary_hash());
    }

    #[tokio::test]
    async fn blank_name_rejected() {
        let err = Corpus::create(CorpusDraft::new("  ", ["a"]), &BasicNormalizer)
            .await
            .unwrap_err();
        assert!(matches!(err, CorpusError::Validation(_)));
    }

    #[tokio::test]
    async fn lemma_mismatch_fails_fast() {
        let err = Corpus::create(CorpusDraft::new("x", ["a", "b"]), &ShortLemmatizer)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CorpusError::Index(IndexError::LemmaLengthMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn misaligned_normalizer_rejected() {
        let err = Corpus::create(CorpusDraft::new("x", ["a", "b"]), &LossyNormalizer)
            .await
            .unwrap_err();
        assert!(matches!(err, CorpusError::Validation(_)));
    }

    #[tokio::test]
    async fn record_roundtrip_rebuilds_indices_lazily() {
        let mut corpus = create(&["bank", "tank"]).await;
        corpus.set_master(true);
        let restored = Corpus::from_record(corpus.to_record()).unwrap();

        assert!(!restored.has_indices());
        assert_eq!(restored.vocabulary(), corpus.vocabulary());
        assert_eq!(restored.vocabulary_hash(), corpus.vocabulary_hash());
        assert!(restored.is_master());
        assert!(restored.contains("tank"));
        assert!(restored.has_indices());
    }

    #[tokio::test]
    async fn add_child_rejects_self_and_dedupes() {
        let mut corpus = create(&["a"]).await;
        let me = corpus.id();
        assert!(corpus.add_child(me).is_err());

        let child = CorpusId::new();
        assert!(corpus.add_child(child).unwrap());
        assert!(!corpus.add_child(child).unwrap());
        assert_eq!(corpus.children(), [child]);
        assert!(corpus.remove_child(child));
        assert!(!corpus.remove_child(child));
    }

    #[tokio::test]
    async fn set_parent_rejects_self() {
        let mut corpus = create(&["a"]).await;
        let me = corpus.id();
        assert!(corpus.set_parent(Some(me)).is_err());
        assert!(corpus.set_parent(None).is_ok());
    }

    #[tokio::test]
    async fn sanitize_children_strips_self_and_duplicates() {
        let mut record = create(&["a"]).await.to_record();
        let me = record.corpus_uuid;
        let other = CorpusId::new();
        record.child_uuids = vec![other, other];
        let mut corpus = Corpus::from_record(record).unwrap();
        corpus.child_uuids.push(me);

        assert_eq!(corpus.sanitize_children(), 2);
        assert_eq!(corpus.children(), [other]);
    }

    #[tokio::test]
    async fn replace_content_rehashes_and_reindexes() {
        let mut corpus = create(&["a"]).await;
        let old_hash = corpus.vocabulary_hash().to_string();
        corpus
            .replace_content(content(&["x", "y"]), &VocabularyHasher::default())
            .unwrap();
        assert_ne!(corpus.vocabulary_hash(), old_hash);
        assert!(corpus.contains("y"));
        assert!(!corpus.contains("a"));
    }

    #[tokio::test]
    async fn replace_content_rejects_unsorted() {
        let mut corpus = create(&["a"]).await;
        let err = corpus
            .replace_content(content(&["y", "x"]), &VocabularyHasher::default())
            .unwrap_err();
        assert!(matches!(err, CorpusError::Index(_)));
        assert_eq!(corpus.vocabulary(), ["a"]);
    }

    #[tokio::test]
    async fn candidate_words_resolve_positions() {
        let corpus = create(&["bank", "bak", "tank", "shore"]).await;
        let words = corpus.candidate_words("bank", 1);
        assert_eq!(words.first(), Some(&"bank"));
        assert!(words.contains(&"bak"));
        assert!(!words.contains(&"shore"));
    }

    #[tokio::test]
    async fn cache_key_depends_on_scope() {
        let corpus = create(&["a"]).await;
        let hasher = VocabularyHasher::default();
        assert_ne!(
            corpus.cache_key(&hasher, Some("model-a")),
            corpus.cache_key(&hasher, Some("model-b"))
        );
        assert!(corpus
            .cache_key(&hasher, None)
            .starts_with(&corpus.id().to_string()));
    }

    #[test]
    fn merger_is_order_independent() {
        let a = VocabularyContent {
            vocabulary: vec!["ran".into(), "run".into()],
            lemmas: vec!["run".into(), "run".into()],
            original_vocabulary: vec!["Ran".into()],
            original_index: vec![0],
        };
        let b = VocabularyContent {
            vocabulary: vec!["ran".into(), "walk".into()],
            lemmas: vec!["ran".into(), "walk".into()],
            original_vocabulary: vec!["RAN".into(), "Walk".into()],
            original_index: vec![0, 1],
        };

        let mut ab = VocabularyMerger::new();
        ab.add(&a);
        ab.add(&b);
        let mut ba = VocabularyMerger::new();
        ba.add(&b);
        ba.add(&a);

        let ab = ab.finish();
        assert_eq!(ab, ba.finish());
        assert_eq!(ab.vocabulary, ["ran", "run", "walk"]);
        assert_eq!(ab.lemmas, ["ran", "run", "walk"]);
        assert_eq!(ab.original_vocabulary, ["RAN", "Ran", "Walk"]);
        assert_eq!(ab.original_index, [0, 0, 2]);
    }

    #[test]
    fn merger_output_passes_index_validation() {
        let mut merger = VocabularyMerger::new();
        merger.add(&content(&["b", "c"]));
        merger.add(&content(&["a", "c"]));
        let merged = merger.finish();
        assert!(IndexBuilder::validate(&merged.as_input()).is_ok());
        assert_eq!(merged.len(), 3);
    }
}
