//! core::record
//!
//! Persisted corpus record schema (v1).
//!
//! # Schema Design
//!
//! - Self-describing with `kind` and `schema_version`
//! - Enumerated fields stored as plain strings (`corpus_kind`, `language`)
//! - Strictly parsed: unknown fields are rejected, invariants re-checked
//!
//! Each saved version is one record. `version`, `storage_id` and
//! `created_at` are assigned by the store.
//!
//! # Example
//!
//! ```
//! use corpus_forest::core::record::{parse_record, CorpusRecord, RECORD_KIND};
//! use corpus_forest::core::types::CorpusId;
//!
//! let record = CorpusRecord::empty(CorpusId::new(), "names", "wordlist_names", "en");
//! assert_eq!(record.kind, RECORD_KIND);
//!
//! let json = record.to_canonical_json().unwrap();
//! let parsed = parse_record(&json).unwrap();
//! assert_eq!(parsed.name, "names");
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::index::{IndexBuilder, IndexError, IndexInput};
use crate::core::types::{CorpusId, CorpusKind, Language, StorageId, TypeError, UtcTimestamp};

/// The kind identifier for corpus records.
pub const RECORD_KIND: &str = "corpus-forest.corpus";

/// Current schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Errors from record parsing and validation.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("failed to parse record: {0}")]
    ParseError(String),

    #[error("failed to serialize record: {0}")]
    SerializeError(String),

    #[error("invalid kind '{found}', expected '{}'", RECORD_KIND)]
    InvalidKind { found: String },

    #[error("unsupported schema version {0}, supported: {SCHEMA_VERSION}")]
    UnsupportedVersion(u32),

    #[error("invalid record value: {0}")]
    InvalidValue(String),

    #[error("type validation failed: {0}")]
    TypeError(#[from] TypeError),

    #[error("vocabulary arrays are inconsistent: {0}")]
    IndexError(#[from] IndexError),
}

#[derive(Debug, Deserialize)]
struct RecordEnvelope {
    kind: String,
    schema_version: u32,
}

/// Parse record JSON with version dispatch.
///
/// # Errors
///
/// Returns an error if the JSON is malformed, the kind or version is wrong,
/// or the record violates a corpus invariant.
pub fn parse_record(json: &str) -> Result<CorpusRecord, RecordError> {
    let envelope: RecordEnvelope =
        serde_json::from_str(json).map_err(|e| RecordError::ParseError(e.to_string()))?;

    if envelope.kind != RECORD_KIND {
        return Err(RecordError::InvalidKind {
            found: envelope.kind,
        });
    }

    match envelope.schema_version {
        1 => {
            let record: CorpusRecord =
                serde_json::from_str(json).map_err(|e| RecordError::ParseError(e.to_string()))?;
            record.validate()?;
            Ok(record)
        }
        v => Err(RecordError::UnsupportedVersion(v)),
    }
}

/// One persisted version of a corpus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CorpusRecord {
    /// Kind identifier (always [`RECORD_KIND`])
    pub kind: String,

    /// Schema version (always 1 for this struct)
    pub schema_version: u32,

    pub corpus_uuid: CorpusId,

    #[serde(default)]
    pub parent_uuid: Option<CorpusId>,

    #[serde(default)]
    pub child_uuids: Vec<CorpusId>,

    #[serde(default)]
    pub is_master: bool,

    pub name: String,

    /// Storable form of [`CorpusKind`]
    pub corpus_kind: String,

    /// Storable form of [`Language`]
    pub language: String,

    pub vocabulary: Vec<String>,

    /// Lemma per vocabulary entry
    pub lemmas: Vec<String>,

    #[serde(default)]
    pub original_vocabulary: Vec<String>,

    /// Vocabulary position of each original form
    #[serde(default)]
    pub original_index: Vec<u32>,

    pub vocabulary_hash: String,

    /// Store-assigned, monotonically increasing per corpus
    #[serde(default)]
    pub version: u64,

    /// Store-assigned identifier of this version
    #[serde(default)]
    pub storage_id: Option<StorageId>,

    /// When this version was written
    pub created_at: UtcTimestamp,
}

impl CorpusRecord {
    /// A record with no vocabulary, mostly useful in tests and docs.
    pub fn empty(
        corpus_uuid: CorpusId,
        name: impl Into<String>,
        corpus_kind: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            kind: RECORD_KIND.to_string(),
            schema_version: SCHEMA_VERSION,
            corpus_uuid,
            parent_uuid: None,
            child_uuids: Vec::new(),
            is_master: false,
            name: name.into(),
            corpus_kind: corpus_kind.into(),
            language: language.into(),
            vocabulary: Vec::new(),
            lemmas: Vec::new(),
            original_vocabulary: Vec::new(),
            original_index: Vec::new(),
            vocabulary_hash: String::new(),
            version: 0,
            storage_id: None,
            created_at: UtcTimestamp::now(),
        }
    }

    /// Validate the record against corpus invariants.
    ///
    /// # Errors
    ///
    /// Returns the first violation found.
    pub fn validate(&self) -> Result<(), RecordError> {
        if self.kind != RECORD_KIND {
            return Err(RecordError::InvalidKind {
                found: self.kind.clone(),
            });
        }
        if self.schema_version != SCHEMA_VERSION {
            return Err(RecordError::UnsupportedVersion(self.schema_version));
        }
        if self.name.trim().is_empty() {
            return Err(RecordError::InvalidValue("name cannot be empty".into()));
        }
        self.corpus_kind.parse::<CorpusKind>()?;
        Language::new(&self.language)?;

        if self.child_uuids.contains(&self.corpus_uuid) {
            return Err(RecordError::InvalidValue(format!(
                "corpus {} lists itself as a child",
                self.corpus_uuid
            )));
        }
        if self.parent_uuid == Some(self.corpus_uuid) {
            return Err(RecordError::InvalidValue(format!(
                "corpus {} is its own parent",
                self.corpus_uuid
            )));
        }

        IndexBuilder::validate(&IndexInput {
            vocabulary: &self.vocabulary,
            lemmas: &self.lemmas,
            original_vocabulary: &self.original_vocabulary,
            original_index: &self.original_index,
        })?;

        Ok(())
    }

    /// Serialize to canonical JSON (compact, deterministic field order).
    pub fn to_canonical_json(&self) -> Result<String, RecordError> {
        serde_json::to_string(self).map_err(|e| RecordError::SerializeError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CorpusRecord {
        let mut record = CorpusRecord::empty(CorpusId::new(), "sample", "wordlist", "en");
        record.vocabulary = vec!["bak".into(), "bank".into()];
        record.lemmas = record.vocabulary.clone();
        record.original_vocabulary = vec!["Bank".into()];
        record.original_index = vec![1];
        record
    }

    #[test]
    fn roundtrip() {
        let record = sample();
        let json = record.to_canonical_json().unwrap();
        let parsed = parse_record(&json).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn rejects_wrong_kind() {
        let mut record = sample();
        record.kind = "something.else".into();
        let json = serde_json::to_string(&record).unwrap();
        assert!(matches!(
            parse_record(&json),
            Err(RecordError::InvalidKind { .. })
        ));
    }

    #[test]
    fn rejects_future_version() {
        let json = format!(r#"{{"kind":"{RECORD_KIND}","schema_version":7}}"#);
        assert!(matches!(
            parse_record(&json),
            Err(RecordError::UnsupportedVersion(7))
        ));
    }

    #[test]
    fn rejects_unknown_fields() {
        let record = sample();
        let mut value = serde_json::to_value(&record).unwrap();
        value["surprise"] = serde_json::json!(true);
        assert!(matches!(
            parse_record(&value.to_string()),
            Err(RecordError::ParseError(_))
        ));
    }

    #[test]
    fn rejects_self_child() {
        let mut record = sample();
        record.child_uuids.push(record.corpus_uuid);
        assert!(matches!(
            record.validate(),
            Err(RecordError::InvalidValue(_))
        ));
    }

    #[test]
    fn rejects_self_parent() {
        let mut record = sample();
        record.parent_uuid = Some(record.corpus_uuid);
        assert!(record.validate().is_err());
    }

    #[test]
    fn rejects_unsorted_vocabulary() {
        let mut record = sample();
        record.vocabulary.reverse();
        assert!(matches!(
            record.validate(),
            Err(RecordError::IndexError(IndexError::UnsortedVocabulary(1)))
        ));
    }

    #[test]
    fn rejects_unknown_corpus_kind() {
        let mut record = sample();
        record.corpus_kind = "novel".into();
        assert!(matches!(record.validate(), Err(RecordError::TypeError(_))));
    }

    #[test]
    fn rejects_blank_name() {
        let mut record = sample();
        record.name = "  ".into();
        assert!(record.validate().is_err());
    }

    #[test]
    fn optional_fields_default() {
        let id = CorpusId::new();
        let json = format!(
            r#"{{
                "kind": "{RECORD_KIND}",
                "schema_version": 1,
                "corpus_uuid": "{id}",
                "name": "minimal",
                "corpus_kind": "custom",
                "language": "fr",
                "vocabulary": [],
                "lemmas": [],
                "vocabulary_hash": "",
                "created_at": "2024-01-01T00:00:00Z"
            }}"#
        );
        let record = parse_record(&json).unwrap();
        assert!(record.child_uuids.is_empty());
        assert!(!record.is_master);
        assert_eq!(record.version, 0);
    }
}
