//! core::config::schema
//!
//! Configuration schema types.
//!
//! Every field is optional; absent values fall back to the next source in
//! precedence order and finally to the defaults in [`super::defaults`].
//!
//! # Validation
//!
//! Values are range-checked after parsing. Unknown keys are rejected at
//! parse time.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// One configuration file.
///
/// # Example
///
/// ```toml
/// [tree]
/// max_depth = 32
///
/// [hashing]
/// sample_size = 20
/// digest_length = 16
///
/// [candidates]
/// max_edit_distance = 2
///
/// [store]
/// root = "/var/lib/corpus-forest"
/// offload_threshold = 10000
///
/// [retry]
/// attempts = 3
/// initial_backoff_ms = 50
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ForestConfig {
    pub tree: Option<TreeSection>,
    pub hashing: Option<HashingSection>,
    pub candidates: Option<CandidatesSection>,
    pub store: Option<StoreSection>,
    pub retry: Option<RetrySection>,
}

/// Tree shape limits.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct TreeSection {
    /// Longest ancestor chain walked before a tree is declared corrupt
    pub max_depth: Option<usize>,
}

/// Vocabulary hashing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct HashingSection {
    /// Entries sampled from each end of the sorted vocabulary
    pub sample_size: Option<usize>,
    /// Hex characters kept from the digest
    pub digest_length: Option<usize>,
}

/// Candidate generation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct CandidatesSection {
    /// Default edit distance when none is given
    pub max_edit_distance: Option<usize>,
}

/// File store location and layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct StoreSection {
    pub root: Option<PathBuf>,
    /// Vocabularies longer than this go to a separate content file
    pub offload_threshold: Option<usize>,
}

/// Retries of idempotent store reads.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RetrySection {
    /// Total attempts including the first
    pub attempts: Option<u32>,
    pub initial_backoff_ms: Option<u64>,
}

fn check_range<T>(name: &str, value: Option<T>, min: T, max: T) -> Result<(), ConfigError>
where
    T: PartialOrd + std::fmt::Display + Copy,
{
    match value {
        Some(v) if v < min || v > max => Err(ConfigError::InvalidValue(format!(
            "{} must be between {} and {}, got {}",
            name, min, max, v
        ))),
        _ => Ok(()),
    }
}

impl ForestConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the first bad key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(tree) = &self.tree {
            check_range("tree.max_depth", tree.max_depth, 1, 4096)?;
        }
        if let Some(hashing) = &self.hashing {
            check_range("hashing.sample_size", hashing.sample_size, 1, 100_000)?;
            check_range("hashing.digest_length", hashing.digest_length, 1, 64)?;
        }
        if let Some(candidates) = &self.candidates {
            check_range(
                "candidates.max_edit_distance",
                candidates.max_edit_distance,
                0,
                8,
            )?;
        }
        if let Some(store) = &self.store {
            if let Some(root) = &store.root {
                if root.as_os_str().is_empty() {
                    return Err(ConfigError::InvalidValue(
                        "store.root cannot be empty".to_string(),
                    ));
                }
            }
            check_range(
                "store.offload_threshold",
                store.offload_threshold,
                1,
                usize::MAX,
            )?;
        }
        if let Some(retry) = &self.retry {
            check_range("retry.attempts", retry.attempts, 1, 10)?;
            check_range("retry.initial_backoff_ms", retry.initial_backoff_ms, 0, 60_000)?;
        }
        Ok(())
    }

    /// Overlay `other` on top of `self`, field by field.
    pub fn merged_with(&self, other: &ForestConfig) -> ForestConfig {
        fn pick<T: Clone>(over: &Option<T>, base: &Option<T>) -> Option<T> {
            over.clone().or_else(|| base.clone())
        }

        let tree = match (&other.tree, &self.tree) {
            (None, None) => None,
            (o, b) => {
                let (o, b) = (o.clone().unwrap_or_default(), b.clone().unwrap_or_default());
                Some(TreeSection {
                    max_depth: pick(&o.max_depth, &b.max_depth),
                })
            }
        };
        let hashing = match (&other.hashing, &self.hashing) {
            (None, None) => None,
            (o, b) => {
                let (o, b) = (o.clone().unwrap_or_default(), b.clone().unwrap_or_default());
                Some(HashingSection {
                    sample_size: pick(&o.sample_size, &b.sample_size),
                    digest_length: pick(&o.digest_length, &b.digest_length),
                })
            }
        };
        let candidates = match (&other.candidates, &self.candidates) {
            (None, None) => None,
            (o, b) => {
                let (o, b) = (o.clone().unwrap_or_default(), b.clone().unwrap_or_default());
                Some(CandidatesSection {
                    max_edit_distance: pick(&o.max_edit_distance, &b.max_edit_distance),
                })
            }
        };
        let store = match (&other.store, &self.store) {
            (None, None) => None,
            (o, b) => {
                let (o, b) = (o.clone().unwrap_or_default(), b.clone().unwrap_or_default());
                Some(StoreSection {
                    root: pick(&o.root, &b.root),
                    offload_threshold: pick(&o.offload_threshold, &b.offload_threshold),
                })
            }
        };
        let retry = match (&other.retry, &self.retry) {
            (None, None) => None,
            (o, b) => {
                let (o, b) = (o.clone().unwrap_or_default(), b.clone().unwrap_or_default());
                Some(RetrySection {
                    attempts: pick(&o.attempts, &b.attempts),
                    initial_backoff_ms: pick(&o.initial_backoff_ms, &b.initial_backoff_ms),
                })
            }
        };

        ForestConfig {
            tree,
            hashing,
            candidates,
            store,
            retry,
        }
    }
}
