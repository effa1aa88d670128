//! Property-based tests for hashing, merging, candidate search and tree
//! structure.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use proptest::prelude::*;

use corpus_forest::core::corpus::{CorpusDraft, VocabularyContent, VocabularyMerger};
use corpus_forest::core::hashing::VocabularyHasher;
use corpus_forest::core::index::{IndexBuilder, IndexInput};
use corpus_forest::manager::{CreateOptions, TreeCorpusManager};
use corpus_forest::normalize::BasicNormalizer;
use corpus_forest::store::MemoryStore;

fn word() -> impl Strategy<Value = String> {
    "[a-z]{1,8}"
}

fn sorted_vocabulary() -> impl Strategy<Value = Vec<String>> {
    prop::collection::btree_set(word(), 0..40).prop_map(|set| set.into_iter().collect())
}

/// Content whose lemma is the word's first letter and whose original forms
/// are the upper- and lower-case spellings.
fn content_of(words: &[String]) -> VocabularyContent {
    let vocabulary: Vec<String> = words
        .iter()
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let lemmas = vocabulary.iter().map(|w| w[..1].to_string()).collect();
    let mut original_vocabulary = Vec::new();
    let mut original_index = Vec::new();
    for (i, w) in vocabulary.iter().enumerate() {
        original_vocabulary.push(w.to_uppercase());
        original_index.push(i as u32);
    }
    VocabularyContent {
        vocabulary,
        lemmas,
        original_vocabulary,
        original_index,
    }
}

fn merge(parts: &[VocabularyContent]) -> VocabularyContent {
    let mut merger = VocabularyMerger::new();
    for part in parts {
        merger.add(part);
    }
    merger.finish()
}

proptest! {
    #[test]
    fn hash_is_deterministic(vocab in sorted_vocabulary(), scope in proptest::option::of("[a-z]{1,6}")) {
        let hasher = VocabularyHasher::default();
        let a = hasher.hash(&vocab, scope.as_deref());
        let b = hasher.hash(&vocab, scope.as_deref());
        prop_assert_eq!(a.len(), 16);
        prop_assert_eq!(a, b);
    }

    #[test]
    fn hash_ignores_input_order(vocab in sorted_vocabulary()) {
        let hasher = VocabularyHasher::new(5, 32);
        let mut reversed = vocab.clone();
        reversed.reverse();
        prop_assert_eq!(hasher.hash(&vocab, None), hasher.hash(&reversed, None));
    }

    #[test]
    fn hash_changes_with_length(vocab in sorted_vocabulary(), extra in "[0-9]{1,3}") {
        let hasher = VocabularyHasher::default();
        let mut longer = vocab.clone();
        longer.push(extra);
        prop_assert_ne!(hasher.hash(&vocab, None), hasher.hash(&longer, None));
    }

    #[test]
    fn merge_is_order_independent(
        parts in prop::collection::vec(prop::collection::vec(word(), 0..15), 1..5),
    ) {
        let contents: Vec<VocabularyContent> = parts.iter().map(|p| content_of(p)).collect();
        let mut reversed = contents.clone();
        reversed.reverse();

        prop_assert_eq!(merge(&contents), merge(&reversed));
    }

    #[test]
    fn merge_is_the_union(
        parts in prop::collection::vec(prop::collection::vec(word(), 0..15), 1..5),
    ) {
        let contents: Vec<VocabularyContent> = parts.iter().map(|p| content_of(p)).collect();
        let merged = merge(&contents);

        let expected: Vec<String> = parts
            .iter()
            .flatten()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        prop_assert_eq!(&merged.vocabulary, &expected);
        prop_assert_eq!(merged.lemmas.len(), merged.vocabulary.len());
        prop_assert_eq!(merged.original_vocabulary.len(), merged.original_index.len());

        // The merged content is always valid index input.
        let built = IndexBuilder::build(&IndexInput {
            vocabulary: &merged.vocabulary,
            lemmas: &merged.lemmas,
            original_vocabulary: &merged.original_vocabulary,
            original_index: &merged.original_index,
        });
        prop_assert!(built.is_ok());
    }

    #[test]
    fn merge_is_idempotent(words in prop::collection::vec(word(), 0..20)) {
        let once = merge(&[content_of(&words)]);
        let twice = merge(&[once.clone(), once.clone()]);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn candidates_include_every_close_word(
        vocab in sorted_vocabulary(),
        query in word(),
        max_distance in 0usize..3,
    ) {
        let indices = IndexBuilder::build(&IndexInput {
            vocabulary: &vocab,
            lemmas: &vocab,
            original_vocabulary: &[],
            original_index: &[],
        })
        .unwrap();

        let found: HashSet<usize> = indices.candidates(&query, max_distance).into_iter().collect();
        for (i, w) in vocab.iter().enumerate() {
            if strsim::levenshtein(w, &query) <= max_distance {
                prop_assert!(found.contains(&i), "missed {} for {}", w, query);
            }
        }
    }

    #[test]
    fn random_attaches_never_form_a_cycle(
        edges in prop::collection::vec((0usize..6, 0usize..6), 1..20),
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        runtime.block_on(async {
            let manager = TreeCorpusManager::new(
                Arc::new(MemoryStore::new()),
                Arc::new(BasicNormalizer),
            );
            let mut ids = Vec::new();
            for i in 0..6 {
                let corpus = manager
                    .create(CorpusDraft::new(format!("n{}", i), ["w"]), CreateOptions::default())
                    .await
                    .unwrap();
                ids.push(corpus.id());
            }

            for (child, parent) in edges {
                // Rejections are expected; the forest must stay intact either way.
                let _ = manager.attach_child(ids[child], ids[parent]).await;
            }

            let report = manager.verify().await.unwrap();
            assert!(report.ok(), "{:?}", report);
            let snapshot = manager.forest().await.unwrap();
            assert_eq!(snapshot.graph.find_cycle(), None);
        });
    }
}
