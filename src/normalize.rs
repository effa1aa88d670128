//! normalize
//!
//! Text normalization collaborator.
//!
//! # Design
//!
//! Normalization and lemmatization are owned by an external service. This
//! module defines the [`NormalizationService`] seam and a small
//! [`BasicNormalizer`] that folds case, strips diacritics and collapses
//! whitespace. It is adequate for tests and the CLI, not for linguistics.
//!
//! The trait is async because real implementations call out over I/O.

use async_trait::async_trait;
use thiserror::Error;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::core::types::Language;

/// Errors from a normalization service.
#[derive(Debug, Clone, Error)]
pub enum NormalizeError {
    /// The service could not be reached or timed out.
    #[error("normalization service unavailable: {0}")]
    Unavailable(String),

    /// The service does not handle this language.
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// The service returned something unusable.
    #[error("invalid normalization response: {0}")]
    InvalidResponse(String),
}

/// Output of [`NormalizationService::normalize`].
///
/// `normalized[i]` is the normalized form of `original[i]`. Both vectors
/// have the length of the input. A normalized entry may be empty when the
/// token folds to nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Normalized {
    pub normalized: Vec<String>,
    pub original: Vec<String>,
}

/// Normalizes raw tokens and derives lemmas.
#[async_trait]
pub trait NormalizationService: Send + Sync {
    /// Normalize raw tokens, keeping each token's original form aligned.
    async fn normalize(
        &self,
        raw_tokens: &[String],
        language: &Language,
    ) -> Result<Normalized, NormalizeError>;

    /// Lemma of each normalized word, position-aligned with the input.
    async fn lemmatize(
        &self,
        normalized: &[String],
        language: &Language,
    ) -> Result<Vec<String>, NormalizeError>;
}

/// Reference normalizer.
///
/// - NFKD decomposition with combining marks removed (`café` → `cafe`)
/// - lowercase
/// - internal whitespace collapsed to one space, ends trimmed
///
/// Lemmatization is the identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicNormalizer;

impl BasicNormalizer {
    /// Normalize one token.
    ///
    /// ```
    /// use corpus_forest::normalize::BasicNormalizer;
    ///
    /// assert_eq!(BasicNormalizer::fold("  Crème   Brûlée "), "creme brulee");
    /// ```
    pub fn fold(token: &str) -> String {
        let stripped: String = token
            .nfkd()
            .filter(|c| !is_combining_mark(*c))
            .flat_map(char::to_lowercase)
            .collect();
        stripped.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

#[async_trait]
impl NormalizationService for BasicNormalizer {
    async fn normalize(
        &self,
        raw_tokens: &[String],
        _language: &Language,
    ) -> Result<Normalized, NormalizeError> {
        let normalized = raw_tokens.iter().map(|t| Self::fold(t)).collect();
        let original = raw_tokens.iter().map(|t| t.trim().to_string()).collect();
        Ok(Normalized {
            normalized,
            original,
        })
    }

    async fn lemmatize(
        &self,
        normalized: &[String],
        _language: &Language,
    ) -> Result<Vec<String>, NormalizeError> {
        Ok(normalized.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn fold_strips_diacritics_and_case() {
        assert_eq!(BasicNormalizer::fold("Résumé"), "resume");
        assert_eq!(BasicNormalizer::fold("NAÏVE"), "naive");
    }

    #[test]
    fn fold_collapses_whitespace() {
        assert_eq!(BasicNormalizer::fold("  ad \t hoc "), "ad hoc");
    }

    #[test]
    fn fold_compatibility_forms() {
        assert_eq!(BasicNormalizer::fold("ﬁne"), "fine");
    }

    #[test]
    fn fold_whitespace_only_is_empty() {
        assert_eq!(BasicNormalizer::fold("   "), "");
    }

    #[tokio::test]
    async fn normalize_keeps_alignment() {
        let raw = tokens(&["Café", " bank ", "   "]);
        let out = BasicNormalizer
            .normalize(&raw, &Language::english())
            .await
            .unwrap();
        assert_eq!(out.normalized, tokens(&["cafe", "bank", ""]));
        assert_eq!(out.original, tokens(&["Café", "bank", ""]));
    }

    #[tokio::test]
    async fn lemmatize_is_identity() {
        let words = tokens(&["running", "ran"]);
        let lemmas = BasicNormalizer
            .lemmatize(&words, &Language::english())
            .await
            .unwrap();
        assert_eq!(lemmas, words);
    }
}
