//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`CorpusId`] - Stable corpus identity (UUID v4), the only hierarchy key
//! - [`StorageId`] - Identifier of one persisted version, assigned by a store
//! - [`CorpusKind`] - Discriminator selecting corpus behavior
//! - [`Language`] - Validated lowercase language tag
//! - [`UtcTimestamp`] - RFC3339 timestamp
//!
//! # Validation
//!
//! These types enforce validity at construction time. Invalid values
//! cannot be represented, preventing entire classes of bugs.
//!
//! # Examples
//!
//! ```
//! use corpus_forest::core::types::{CorpusId, CorpusKind, Language};
//!
//! let id = CorpusId::new();
//! assert_eq!(CorpusId::parse(&id.to_string()).unwrap(), id);
//!
//! let kind: CorpusKind = "wordlist_names".parse().unwrap();
//! assert_eq!(kind, CorpusKind::WordlistNames);
//!
//! assert!(Language::new("pt-BR").is_ok());
//! assert!(Language::new("not a tag").is_err());
//! ```

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid corpus id: {0}")]
    InvalidCorpusId(String),

    #[error("invalid corpus kind: {0}")]
    InvalidCorpusKind(String),

    #[error("invalid language tag: {0}")]
    InvalidLanguage(String),

    #[error("invalid storage id: {0}")]
    InvalidStorageId(String),
}

/// Stable identity of a logical corpus.
///
/// Assigned once by the factory and never derived from content, so two
/// corpora with identical vocabularies remain distinguishable. Survives every
/// re-save; the persistence layer's [`StorageId`] does not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorpusId(Uuid);

impl CorpusId {
    /// Generate a fresh random identity.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Parse from the hyphenated string form.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidCorpusId` if the string is not a UUID.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| TypeError::InvalidCorpusId(format!("'{s}': {e}")))
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Abbreviated form for display (first 8 hex characters).
    pub fn short(&self) -> String {
        let mut s = self.0.simple().to_string();
        s.truncate(8);
        s
    }
}

impl FromStr for CorpusId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for CorpusId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// Identifier of one persisted version of a corpus.
///
/// Changes on every save. Never used for hierarchy relationships.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StorageId(String);

impl StorageId {
    /// Create a new storage id.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidStorageId` if the id is empty or contains
    /// whitespace.
    pub fn new(id: impl Into<String>) -> Result<Self, TypeError> {
        let id = id.into();
        if id.is_empty() {
            return Err(TypeError::InvalidStorageId("storage id cannot be empty".into()));
        }
        if id.chars().any(char::is_whitespace) {
            return Err(TypeError::InvalidStorageId(format!(
                "storage id cannot contain whitespace: '{id}'"
            )));
        }
        Ok(Self(id))
    }

    /// Get the storage id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for StorageId {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<StorageId> for String {
    fn from(id: StorageId) -> Self {
        id.0
    }
}

impl std::fmt::Display for StorageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of corpus.
///
/// A discriminator rather than a type hierarchy: subtype-specific
/// operations live in [`crate::services`] and compose the base entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorpusKind {
    Lexicon,
    Literature,
    Language,
    Wordlist,
    WordlistNames,
    Custom,
}

impl CorpusKind {
    /// All kinds, in declaration order.
    pub const ALL: [CorpusKind; 6] = [
        CorpusKind::Lexicon,
        CorpusKind::Literature,
        CorpusKind::Language,
        CorpusKind::Wordlist,
        CorpusKind::WordlistNames,
        CorpusKind::Custom,
    ];

    /// The storable string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            CorpusKind::Lexicon => "lexicon",
            CorpusKind::Literature => "literature",
            CorpusKind::Language => "language",
            CorpusKind::Wordlist => "wordlist",
            CorpusKind::WordlistNames => "wordlist_names",
            CorpusKind::Custom => "custom",
        }
    }
}

impl FromStr for CorpusKind {
    type Err = TypeError;

    /// Accepts the storable form plus the hyphenated spelling.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        CorpusKind::ALL
            .into_iter()
            .find(|k| k.as_str() == normalized)
            .ok_or_else(|| TypeError::InvalidCorpusKind(s.to_string()))
    }
}

impl std::fmt::Display for CorpusKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A validated language tag.
///
/// Tags are lowercased. Each `-` separated subtag must be 1-8 ASCII
/// alphanumerics and the primary subtag must be 2-3 letters.
///
/// ```
/// use corpus_forest::core::types::Language;
///
/// assert_eq!(Language::new("EN").unwrap().as_str(), "en");
/// assert_eq!(Language::new("pt_BR").unwrap().as_str(), "pt-br");
/// assert!(Language::new("").is_err());
/// assert!(Language::new("e").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Language(String);

impl Language {
    /// Create a validated language tag.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidLanguage` if the tag is malformed.
    pub fn new(tag: impl Into<String>) -> Result<Self, TypeError> {
        let tag = tag.into().trim().to_ascii_lowercase().replace('_', "-");
        Self::validate(&tag)?;
        Ok(Self(tag))
    }

    /// English, the default language.
    pub fn english() -> Self {
        Self("en".to_string())
    }

    fn validate(tag: &str) -> Result<(), TypeError> {
        if tag.is_empty() {
            return Err(TypeError::InvalidLanguage(
                "language tag cannot be empty".into(),
            ));
        }

        let mut subtags = tag.split('-');
        let primary = subtags.next().unwrap_or_default();
        if !(2..=3).contains(&primary.len()) || !primary.chars().all(|c| c.is_ascii_alphabetic())
        {
            return Err(TypeError::InvalidLanguage(format!(
                "primary subtag must be 2-3 letters: '{tag}'"
            )));
        }

        for sub in subtags {
            if sub.is_empty() || sub.len() > 8 || !sub.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Err(TypeError::InvalidLanguage(format!(
                    "invalid subtag '{sub}' in '{tag}'"
                )));
            }
        }

        Ok(())
    }

    /// Primary language subtag (`pt` for `pt-br`).
    pub fn primary(&self) -> &str {
        self.0.split('-').next().unwrap_or(&self.0)
    }

    /// Get the tag as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Language {
    fn default() -> Self {
        Self::english()
    }
}

impl TryFrom<String> for Language {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Language> for String {
    fn from(lang: Language) -> Self {
        lang.0
    }
}

impl FromStr for Language {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A UTC timestamp, serialized as RFC3339.
///
/// # Example
///
/// ```
/// use corpus_forest::core::types::UtcTimestamp;
///
/// let now = UtcTimestamp::now();
/// assert!(now.to_string().contains('T'));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UtcTimestamp(chrono::DateTime<chrono::Utc>);

impl UtcTimestamp {
    /// Create a timestamp for the current moment.
    pub fn now() -> Self {
        Self(chrono::Utc::now())
    }

    /// Create a timestamp from a chrono DateTime.
    pub fn from_datetime(dt: chrono::DateTime<chrono::Utc>) -> Self {
        Self(dt)
    }

    /// Get the underlying datetime.
    pub fn as_datetime(&self) -> &chrono::DateTime<chrono::Utc> {
        &self.0
    }
}

impl std::fmt::Display for UtcTimestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod corpus_id {
        use super::*;

        #[test]
        fn fresh_ids_are_distinct() {
            let a = CorpusId::new();
            let b = CorpusId::new();
            assert_ne!(a, b);
        }

        #[test]
        fn parse_roundtrip() {
            let id = CorpusId::new();
            let parsed: CorpusId = id.to_string().parse().unwrap();
            assert_eq!(id, parsed);
        }

        #[test]
        fn parse_rejects_garbage() {
            assert!(matches!(
                CorpusId::parse("not-a-uuid"),
                Err(TypeError::InvalidCorpusId(_))
            ));
        }

        #[test]
        fn short_is_eight_chars() {
            assert_eq!(CorpusId::new().short().len(), 8);
        }

        #[test]
        fn serializes_as_plain_string() {
            let id = CorpusId::new();
            let json = serde_json::to_string(&id).unwrap();
            assert_eq!(json, format!("\"{}\"", id));
        }
    }

    mod storage_id {
        use super::*;

        #[test]
        fn rejects_empty() {
            assert!(StorageId::new("").is_err());
        }

        #[test]
        fn rejects_whitespace() {
            assert!(StorageId::new("a b").is_err());
        }

        #[test]
        fn accepts_path_like_ids() {
            let id = StorageId::new("abc/v000001").unwrap();
            assert_eq!(id.as_str(), "abc/v000001");
        }
    }

    mod corpus_kind {
        use super::*;

        #[test]
        fn parse_all_storable_forms() {
            for kind in CorpusKind::ALL {
                assert_eq!(kind.as_str().parse::<CorpusKind>().unwrap(), kind);
            }
        }

        #[test]
        fn parse_accepts_hyphens_and_case() {
            assert_eq!(
                "Wordlist-Names".parse::<CorpusKind>().unwrap(),
                CorpusKind::WordlistNames
            );
        }

        #[test]
        fn parse_rejects_unknown() {
            assert!("novel".parse::<CorpusKind>().is_err());
        }

        #[test]
        fn serde_uses_snake_case() {
            let json = serde_json::to_string(&CorpusKind::WordlistNames).unwrap();
            assert_eq!(json, "\"wordlist_names\"");
        }
    }

    mod language {
        use super::*;

        #[test]
        fn lowercases_and_normalizes_separator() {
            let lang = Language::new(" EN_gb ").unwrap();
            assert_eq!(lang.as_str(), "en-gb");
            assert_eq!(lang.primary(), "en");
        }

        #[test]
        fn rejects_bad_primary() {
            assert!(Language::new("english").is_err());
            assert!(Language::new("e1").is_err());
        }

        #[test]
        fn rejects_empty_subtag() {
            assert!(Language::new("en-").is_err());
        }

        #[test]
        fn default_is_english() {
            assert_eq!(Language::default().as_str(), "en");
        }
    }

    mod utc_timestamp {
        use super::*;

        #[test]
        fn now_works() {
            let ts = UtcTimestamp::now();
            assert!(ts.to_string().contains('T'));
        }

        #[test]
        fn ordering_follows_time() {
            let a = UtcTimestamp::from_datetime(chrono::DateTime::UNIX_EPOCH);
            let b = UtcTimestamp::now();
            assert!(a < b);
        }
    }
}
