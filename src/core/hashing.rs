//! core::hashing
//!
//! Stable short digests over vocabularies.
//!
//! # Algorithm
//!
//! 1. Sort the vocabulary if it is not already sorted
//! 2. Sample the first and last `sample_size` entries (the whole list when
//!    it is short enough)
//! 3. SHA-256 over the entry count, the samples and the optional scope tag
//! 4. Hex encode, truncate to `max_length`
//!
//! Cost is O(1) in vocabulary size for already-sorted input.
//!
//! # Collisions
//!
//! Two vocabularies of equal length that differ only in the unsampled middle
//! hash identically. The digest is a cache-isolation key and a change hint,
//! not a content address.
//!
//! # Example
//!
//! ```
//! use corpus_forest::core::hashing::VocabularyHasher;
//!
//! let hasher = VocabularyHasher::default();
//! let words = vec!["bank".to_string(), "tank".to_string()];
//!
//! let plain = hasher.hash(&words, None);
//! let scoped = hasher.hash(&words, Some("minilm-l6"));
//! assert_eq!(plain.len(), 16);
//! assert_ne!(plain, scoped);
//! ```

use sha2::{Digest, Sha256};

/// Default number of entries sampled from each end.
pub const DEFAULT_SAMPLE_SIZE: usize = 20;

/// Default digest length in hex characters.
pub const DEFAULT_DIGEST_LENGTH: usize = 16;

/// Full SHA-256 hex length.
const MAX_DIGEST_LENGTH: usize = 64;

const DOMAIN_TAG: &[u8] = b"corpus-forest.vocabulary.v1";

/// Computes boundary-sampled vocabulary digests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VocabularyHasher {
    sample_size: usize,
    max_length: usize,
}

impl Default for VocabularyHasher {
    fn default() -> Self {
        Self {
            sample_size: DEFAULT_SAMPLE_SIZE,
            max_length: DEFAULT_DIGEST_LENGTH,
        }
    }
}

impl VocabularyHasher {
    /// Create a hasher. `max_length` is clamped to `1..=64`.
    pub fn new(sample_size: usize, max_length: usize) -> Self {
        Self {
            sample_size,
            max_length: max_length.clamp(1, MAX_DIGEST_LENGTH),
        }
    }

    /// Entries sampled from each end of the sorted vocabulary.
    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    /// Length of produced digests.
    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Hash a vocabulary under an optional scope tag.
    ///
    /// Input order does not matter.
    pub fn hash<S: AsRef<str>>(&self, vocabulary: &[S], scope: Option<&str>) -> String {
        if is_sorted(vocabulary) {
            self.hash_sorted(vocabulary, scope)
        } else {
            let mut sorted: Vec<&str> = vocabulary.iter().map(AsRef::as_ref).collect();
            sorted.sort_unstable();
            self.hash_sorted(&sorted, scope)
        }
    }

    fn hash_sorted<S: AsRef<str>>(&self, sorted: &[S], scope: Option<&str>) -> String {
        let mut hasher = Sha256::new();
        hasher.update(DOMAIN_TAG);
        hasher.update(b"\n");
        hasher.update((sorted.len() as u64).to_le_bytes());

        let n = sorted.len();
        if n <= self.sample_size.saturating_mul(2) {
            for word in sorted {
                feed(&mut hasher, word.as_ref());
            }
        } else {
            for word in &sorted[..self.sample_size] {
                feed(&mut hasher, word.as_ref());
            }
            hasher.update(b"\x1e");
            for word in &sorted[n - self.sample_size..] {
                feed(&mut hasher, word.as_ref());
            }
        }

        hasher.update(b"\x1d");
        if let Some(scope) = scope {
            hasher.update(scope.as_bytes());
        }

        let mut digest = hex::encode(hasher.finalize());
        digest.truncate(self.max_length);
        digest
    }
}

fn feed(hasher: &mut Sha256, word: &str) {
    hasher.update(word.as_bytes());
    hasher.update(b"\0");
}

fn is_sorted<S: AsRef<str>>(items: &[S]) -> bool {
    items.windows(2).all(|w| w[0].as_ref() <= w[1].as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn deterministic() {
        let hasher = VocabularyHasher::default();
        let v = words(&["apple", "bank", "cat"]);
        assert_eq!(hasher.hash(&v, None), hasher.hash(&v, None));
    }

    #[test]
    fn order_invariant() {
        let hasher = VocabularyHasher::default();
        let a = words(&["apple", "bank", "cat"]);
        let b = words(&["cat", "apple", "bank"]);
        assert_eq!(hasher.hash(&a, None), hasher.hash(&b, None));
    }

    #[test]
    fn scope_changes_digest() {
        let hasher = VocabularyHasher::default();
        let v = words(&["apple"]);
        assert_ne!(hasher.hash(&v, None), hasher.hash(&v, Some("model-a")));
        assert_ne!(
            hasher.hash(&v, Some("model-a")),
            hasher.hash(&v, Some("model-b"))
        );
    }

    #[test]
    fn empty_vocabulary_hashes() {
        let hasher = VocabularyHasher::default();
        let empty: Vec<String> = Vec::new();
        assert_eq!(hasher.hash(&empty, None).len(), DEFAULT_DIGEST_LENGTH);
    }

    #[test]
    fn separator_prevents_concatenation_collisions() {
        let hasher = VocabularyHasher::default();
        assert_ne!(
            hasher.hash(&words(&["ab", "c"]), None),
            hasher.hash(&words(&["a", "bc"]), None)
        );
    }

    #[test]
    fn boundary_edit_changes_digest() {
        let hasher = VocabularyHasher::new(2, 16);
        let a: Vec<String> = (0..10).map(|i| format!("w{i:02}")).collect();
        let mut b = a.clone();
        b[9] = "zzz".to_string();
        assert_ne!(hasher.hash(&a, None), hasher.hash(&b, None));
    }

    #[test]
    fn length_change_changes_digest() {
        let hasher = VocabularyHasher::new(2, 16);
        let a: Vec<String> = (0..10).map(|i| format!("w{i:02}")).collect();
        let mut b = a.clone();
        b.remove(5);
        assert_ne!(hasher.hash(&a, None), hasher.hash(&b, None));
    }

    #[test]
    fn interior_edit_with_same_length_collides() {
        // Documented trade-off: only the boundaries are sampled.
        let hasher = VocabularyHasher::new(2, 16);
        let a: Vec<String> = (0..10).map(|i| format!("w{i:02}")).collect();
        let mut b = a.clone();
        b[5] = "w05x".to_string();
        assert_eq!(hasher.hash(&a, None), hasher.hash(&b, None));
    }

    #[test]
    fn max_length_is_clamped() {
        let v = words(&["x"]);
        assert_eq!(VocabularyHasher::new(20, 0).hash(&v, None).len(), 1);
        assert_eq!(VocabularyHasher::new(20, 500).hash(&v, None).len(), 64);
    }

    #[test]
    fn digest_is_lowercase_hex() {
        let digest = VocabularyHasher::default().hash(&words(&["ä", "b"]), None);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}
