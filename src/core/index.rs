//! core::index
//!
//! Derived lookup structures built from a normalized vocabulary.
//!
//! # Indices
//!
//! - exact lookup: word → position
//! - original forms: normalized position → positions in `original_vocabulary`
//! - lemma maps: word position ↔ lemma position
//! - signature buckets: coarse orthographic signature → positions
//! - length buckets: character count → positions
//!
//! # Rebuild Policy
//!
//! Indices are derived and never authoritative. Any vocabulary mutation
//! rebuilds them from scratch; there is no incremental maintenance.
//!
//! # Candidate Generation
//!
//! An edit changes a word's length by at most one and its set of distinct
//! characters by at most two elements. Restricting candidates to length
//! buckets within `d` of the query and to signatures within `2d` symmetric
//! difference therefore never drops a word within edit distance `d`.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use thiserror::Error;

/// Errors from index construction.
///
/// All of these are caller-contract violations. Input is never truncated to
/// make it fit.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IndexError {
    #[error("lemma count {lemmas} does not match vocabulary size {vocabulary}")]
    LemmaLengthMismatch { vocabulary: usize, lemmas: usize },

    #[error("original form count {originals} does not match original index size {index}")]
    OriginalLengthMismatch { originals: usize, index: usize },

    #[error("original form {position} points at word {target}, vocabulary has {vocabulary}")]
    OriginalIndexOutOfRange {
        position: usize,
        target: usize,
        vocabulary: usize,
    },

    #[error("vocabulary is not sorted at position {0}")]
    UnsortedVocabulary(usize),

    #[error("duplicate word '{word}' at position {position}")]
    DuplicateWord { word: String, position: usize },
}

/// Borrowed input to [`IndexBuilder::build`].
#[derive(Debug, Clone, Copy)]
pub struct IndexInput<'a> {
    /// Sorted, duplicate-free normalized words.
    pub vocabulary: &'a [String],
    /// Lemma of each word, position-aligned with `vocabulary`.
    pub lemmas: &'a [String],
    /// Pre-normalization forms.
    pub original_vocabulary: &'a [String],
    /// For each original form, the vocabulary position it normalizes to.
    pub original_index: &'a [u32],
}

/// The derived indices of one corpus.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorpusIndices {
    pub vocabulary_to_index: HashMap<String, usize>,
    pub normalized_to_original_indices: HashMap<usize, Vec<usize>>,
    /// Sorted, duplicate-free lemmas.
    pub lemmatized_vocabulary: Vec<String>,
    /// Word position → position in `lemmatized_vocabulary`.
    pub word_to_lemma_indices: Vec<usize>,
    /// Lemma position → word positions sharing that lemma.
    pub lemma_to_word_indices: HashMap<usize, Vec<usize>>,
    pub signature_buckets: HashMap<String, Vec<usize>>,
    pub length_buckets: BTreeMap<usize, Vec<usize>>,
}

/// Builds [`CorpusIndices`].
pub struct IndexBuilder;

impl IndexBuilder {
    /// Validate the input and build every index.
    ///
    /// # Errors
    ///
    /// Returns an [`IndexError`] if the arrays are misaligned or the
    /// vocabulary is unsorted or contains duplicates.
    ///
    /// # Example
    ///
    /// ```
    /// use corpus_forest::core::index::{IndexBuilder, IndexInput};
    ///
    /// let vocabulary = vec!["cafe".to_string(), "cafes".to_string()];
    /// let lemmas = vec!["cafe".to_string(), "cafe".to_string()];
    /// let originals = vec!["café".to_string(), "cafe".to_string(), "cafés".to_string()];
    ///
    /// let indices = IndexBuilder::build(&IndexInput {
    ///     vocabulary: &vocabulary,
    ///     lemmas: &lemmas,
    ///     original_vocabulary: &originals,
    ///     original_index: &[0, 0, 1],
    /// })
    /// .unwrap();
    ///
    /// assert_eq!(indices.position("cafes"), Some(1));
    /// assert_eq!(indices.normalized_to_original_indices[&0], vec![0, 1]);
    /// assert_eq!(indices.lemmatized_vocabulary, vec!["cafe".to_string()]);
    /// ```
    pub fn build(input: &IndexInput<'_>) -> Result<CorpusIndices, IndexError> {
        Self::validate(input)?;
        Ok(Self::assemble(input))
    }

    /// Check the caller contract without building anything.
    pub fn validate(input: &IndexInput<'_>) -> Result<(), IndexError> {
        if input.lemmas.len() != input.vocabulary.len() {
            return Err(IndexError::LemmaLengthMismatch {
                vocabulary: input.vocabulary.len(),
                lemmas: input.lemmas.len(),
            });
        }
        if input.original_vocabulary.len() != input.original_index.len() {
            return Err(IndexError::OriginalLengthMismatch {
                originals: input.original_vocabulary.len(),
                index: input.original_index.len(),
            });
        }
        for (i, w) in input.vocabulary.windows(2).enumerate() {
            match w[0].cmp(&w[1]) {
                std::cmp::Ordering::Less => {}
                std::cmp::Ordering::Equal => {
                    return Err(IndexError::DuplicateWord {
                        word: w[1].clone(),
                        position: i + 1,
                    })
                }
                std::cmp::Ordering::Greater => return Err(IndexError::UnsortedVocabulary(i + 1)),
            }
        }
        for (position, &target) in input.original_index.iter().enumerate() {
            if target as usize >= input.vocabulary.len() {
                return Err(IndexError::OriginalIndexOutOfRange {
                    position,
                    target: target as usize,
                    vocabulary: input.vocabulary.len(),
                });
            }
        }
        Ok(())
    }

    /// Build from input already known to satisfy [`IndexBuilder::validate`].
    pub(crate) fn assemble(input: &IndexInput<'_>) -> CorpusIndices {
        let vocabulary = input.vocabulary;

        let mut vocabulary_to_index = HashMap::with_capacity(vocabulary.len());
        let mut signature_buckets: HashMap<String, Vec<usize>> = HashMap::new();
        let mut length_buckets: BTreeMap<usize, Vec<usize>> = BTreeMap::new();

        for (i, word) in vocabulary.iter().enumerate() {
            vocabulary_to_index.insert(word.clone(), i);
            signature_buckets
                .entry(word_signature(word))
                .or_default()
                .push(i);
            length_buckets
                .entry(word.chars().count())
                .or_default()
                .push(i);
        }

        let mut normalized_to_original_indices: HashMap<usize, Vec<usize>> = HashMap::new();
        for (position, &target) in input.original_index.iter().enumerate() {
            normalized_to_original_indices
                .entry(target as usize)
                .or_default()
                .push(position);
        }

        let lemmatized_vocabulary: Vec<String> = input
            .lemmas
            .iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .cloned()
            .collect();
        let lemma_positions: HashMap<&str, usize> = lemmatized_vocabulary
            .iter()
            .enumerate()
            .map(|(i, l)| (l.as_str(), i))
            .collect();

        let mut word_to_lemma_indices = Vec::with_capacity(vocabulary.len());
        let mut lemma_to_word_indices: HashMap<usize, Vec<usize>> = HashMap::new();
        for (word_pos, lemma) in input.lemmas.iter().enumerate() {
            let lemma_pos = lemma_positions[lemma.as_str()];
            word_to_lemma_indices.push(lemma_pos);
            lemma_to_word_indices
                .entry(lemma_pos)
                .or_default()
                .push(word_pos);
        }

        CorpusIndices {
            vocabulary_to_index,
            normalized_to_original_indices,
            lemmatized_vocabulary,
            word_to_lemma_indices,
            lemma_to_word_indices,
            signature_buckets,
            length_buckets,
        }
    }
}

/// Coarse orthographic signature: sorted distinct lowercase alphanumerics.
///
/// Whitespace and punctuation are ignored, so `"new york"` and `"york-new"`
/// share a bucket.
///
/// ```
/// use corpus_forest::core::index::word_signature;
///
/// assert_eq!(word_signature("Banana"), "abn");
/// assert_eq!(word_signature("new york"), "eknorwy");
/// ```
pub fn word_signature(word: &str) -> String {
    word.chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_alphanumeric())
        .collect::<BTreeSet<char>>()
        .into_iter()
        .collect()
}

/// Size of the symmetric difference of two signatures.
///
/// Both inputs must be sorted and duplicate-free, as produced by
/// [`word_signature`].
pub fn signature_distance(a: &str, b: &str) -> usize {
    let mut a = a.chars().peekable();
    let mut b = b.chars().peekable();
    let mut distance = 0;
    loop {
        match (a.peek(), b.peek()) {
            (Some(x), Some(y)) => match x.cmp(y) {
                std::cmp::Ordering::Equal => {
                    a.next();
                    b.next();
                }
                std::cmp::Ordering::Less => {
                    distance += 1;
                    a.next();
                }
                std::cmp::Ordering::Greater => {
                    distance += 1;
                    b.next();
                }
            },
            (Some(_), None) => {
                distance += 1;
                a.next();
            }
            (None, Some(_)) => {
                distance += 1;
                b.next();
            }
            (None, None) => return distance,
        }
    }
}

impl CorpusIndices {
    /// Exact lookup.
    pub fn position(&self, word: &str) -> Option<usize> {
        self.vocabulary_to_index.get(word).copied()
    }

    /// Original-form positions for a word position.
    pub fn originals_of(&self, position: usize) -> &[usize] {
        self.normalized_to_original_indices
            .get(&position)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Lemma position for a word position.
    pub fn lemma_of(&self, position: usize) -> Option<usize> {
        self.word_to_lemma_indices.get(position).copied()
    }

    /// Word positions sharing a lemma.
    pub fn words_of_lemma(&self, lemma_position: usize) -> &[usize] {
        self.lemma_to_word_indices
            .get(&lemma_position)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Candidate positions for an approximate match of `query`.
    ///
    /// Every word within edit distance `max_distance` of the query is
    /// returned. Results are ranked by signature difference, then length
    /// difference, then position.
    pub fn candidates(&self, query: &str, max_distance: usize) -> Vec<usize> {
        let query_len = query.chars().count();
        let query_sig = word_signature(query);
        let max_sig_distance = max_distance.saturating_mul(2);

        let mut in_length_window: HashMap<usize, usize> = HashMap::new();
        let low = query_len.saturating_sub(max_distance);
        let high = query_len.saturating_add(max_distance);
        for (&len, positions) in self.length_buckets.range(low..=high) {
            for &p in positions {
                in_length_window.insert(p, len.abs_diff(query_len));
            }
        }

        let mut ranked: Vec<(usize, usize, usize)> = Vec::new();
        for (sig, positions) in &self.signature_buckets {
            let sig_distance = signature_distance(&query_sig, sig);
            if sig_distance > max_sig_distance {
                continue;
            }
            for &p in positions {
                if let Some(&len_distance) = in_length_window.get(&p) {
                    ranked.push((sig_distance, len_distance, p));
                }
            }
        }

        ranked.sort_unstable();
        ranked.into_iter().map(|(_, _, p)| p).collect()
    }
}
