//! core::config
//!
//! Configuration schema and loading.
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Global config file
//! 3. Explicit config file (`--config`)
//! 4. CLI flags (not handled here)
//!
//! # Global Config Locations
//!
//! Searched in order, first hit wins:
//! 1. `$CORPUS_FOREST_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/corpus-forest/config.toml`
//! 3. `~/.corpus-forest/config.toml` (canonical write location)
//!
//! # Example
//!
//! ```no_run
//! use corpus_forest::core::config::Config;
//!
//! let config = Config::load(None).unwrap();
//! println!("max depth: {}", config.max_depth());
//! println!("store: {}", config.store_root().display());
//! ```

pub mod schema;

pub use schema::{
    CandidatesSection, ForestConfig, HashingSection, RetrySection, StoreSection, TreeSection,
};

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::hashing::VocabularyHasher;

/// Environment variable naming a global config file.
pub const CONFIG_ENV: &str = "CORPUS_FOREST_CONFIG";

/// Built-in defaults.
pub mod defaults {
    pub const MAX_DEPTH: usize = 64;
    pub const SAMPLE_SIZE: usize = crate::core::hashing::DEFAULT_SAMPLE_SIZE;
    pub const DIGEST_LENGTH: usize = crate::core::hashing::DEFAULT_DIGEST_LENGTH;
    pub const MAX_EDIT_DISTANCE: usize = 2;
    pub const OFFLOAD_THRESHOLD: usize = crate::store::file::DEFAULT_OFFLOAD_THRESHOLD;
    pub const RETRY_ATTEMPTS: u32 = 3;
    pub const RETRY_INITIAL_BACKOFF_MS: u64 = 50;
}

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("failed to write config file '{path}': {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("home directory not found")]
    NoHomeDir,
}

/// Merged configuration from all sources.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Global file plus explicit file, merged
    pub file: ForestConfig,
    global_path: Option<PathBuf>,
    explicit_path: Option<PathBuf>,
}

impl Config {
    /// Load the global config and, if given, an explicit config file.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be parsed, or if
    /// the explicit file is missing. A missing global file is not an error.
    pub fn load(explicit: Option<&Path>) -> Result<Config, ConfigError> {
        let (global, global_path) = Self::load_global()?;
        global.validate()?;

        let (file, explicit_path) = match explicit {
            Some(path) => {
                let local = Self::read_config(path)?;
                local.validate()?;
                (global.merged_with(&local), Some(path.to_path_buf()))
            }
            None => (global, None),
        };

        Ok(Config {
            file,
            global_path,
            explicit_path,
        })
    }

    /// Build from an in-memory file, skipping discovery.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if a value is out of range.
    pub fn from_file(file: ForestConfig) -> Result<Config, ConfigError> {
        file.validate()?;
        Ok(Config {
            file,
            ..Config::default()
        })
    }

    fn load_global() -> Result<(ForestConfig, Option<PathBuf>), ConfigError> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                let config = Self::read_config(&path)?;
                return Ok((config, Some(path)));
            }
        }

        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("corpus-forest/config.toml");
            if path.exists() {
                let config = Self::read_config(&path)?;
                return Ok((config, Some(path)));
            }
        }

        if let Some(home) = dirs::home_dir() {
            let path = home.join(".corpus-forest/config.toml");
            if path.exists() {
                let config = Self::read_config(&path)?;
                return Ok((config, Some(path)));
            }
        }

        Ok((ForestConfig::default(), None))
    }

    fn read_config(path: &Path) -> Result<ForestConfig, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Canonical global config path, `~/.corpus-forest/config.toml`.
    pub fn global_config_path() -> Result<PathBuf, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(home.join(".corpus-forest/config.toml"))
    }

    /// Write a config file atomically, creating parent directories.
    pub fn write(path: &Path, config: &ForestConfig) -> Result<(), ConfigError> {
        config.validate()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
                path: path.to_path_buf(),
                source: e,
            })?;
        }

        let contents =
            toml::to_string_pretty(config).map_err(|e| ConfigError::InvalidValue(e.to_string()))?;

        let temp_path = path.with_extension("toml.tmp");
        let mut file = fs::File::create(&temp_path).map_err(|e| ConfigError::WriteError {
            path: temp_path.clone(),
            source: e,
        })?;
        file.write_all(contents.as_bytes())
            .and_then(|_| file.sync_all())
            .map_err(|e| ConfigError::WriteError {
                path: temp_path.clone(),
                source: e,
            })?;

        fs::rename(&temp_path, path).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    // =========================================================================
    // Accessors with defaults applied
    // =========================================================================

    pub fn max_depth(&self) -> usize {
        self.file
            .tree
            .as_ref()
            .and_then(|t| t.max_depth)
            .unwrap_or(defaults::MAX_DEPTH)
    }

    pub fn sample_size(&self) -> usize {
        self.file
            .hashing
            .as_ref()
            .and_then(|h| h.sample_size)
            .unwrap_or(defaults::SAMPLE_SIZE)
    }

    pub fn digest_length(&self) -> usize {
        self.file
            .hashing
            .as_ref()
            .and_then(|h| h.digest_length)
            .unwrap_or(defaults::DIGEST_LENGTH)
    }

    /// Hasher configured from `[hashing]`.
    pub fn hasher(&self) -> VocabularyHasher {
        VocabularyHasher::new(self.sample_size(), self.digest_length())
    }

    pub fn max_edit_distance(&self) -> usize {
        self.file
            .candidates
            .as_ref()
            .and_then(|c| c.max_edit_distance)
            .unwrap_or(defaults::MAX_EDIT_DISTANCE)
    }

    /// Store root; defaults to the platform data directory.
    pub fn store_root(&self) -> PathBuf {
        self.file
            .store
            .as_ref()
            .and_then(|s| s.root.clone())
            .unwrap_or_else(|| {
                dirs::data_dir()
                    .map(|d| d.join("corpus-forest"))
                    .unwrap_or_else(|| PathBuf::from(".corpus-forest"))
            })
    }

    pub fn offload_threshold(&self) -> usize {
        self.file
            .store
            .as_ref()
            .and_then(|s| s.offload_threshold)
            .unwrap_or(defaults::OFFLOAD_THRESHOLD)
    }

    pub fn retry_attempts(&self) -> u32 {
        self.file
            .retry
            .as_ref()
            .and_then(|r| r.attempts)
            .unwrap_or(defaults::RETRY_ATTEMPTS)
    }

    pub fn retry_initial_backoff_ms(&self) -> u64 {
        self.file
            .retry
            .as_ref()
            .and_then(|r| r.initial_backoff_ms)
            .unwrap_or(defaults::RETRY_INITIAL_BACKOFF_MS)
    }

    /// Every setting with defaults filled in, for display.
    pub fn effective(&self) -> ForestConfig {
        ForestConfig {
            tree: Some(TreeSection {
                max_depth: Some(self.max_depth()),
            }),
            hashing: Some(HashingSection {
                sample_size: Some(self.sample_size()),
                digest_length: Some(self.digest_length()),
            }),
            candidates: Some(CandidatesSection {
                max_edit_distance: Some(self.max_edit_distance()),
            }),
            store: Some(StoreSection {
                root: Some(self.store_root()),
                offload_threshold: Some(self.offload_threshold()),
            }),
            retry: Some(RetrySection {
                attempts: Some(self.retry_attempts()),
                initial_backoff_ms: Some(self.retry_initial_backoff_ms()),
            }),
        }
    }

    pub fn global_config_loaded_from(&self) -> Option<&Path> {
        self.global_path.as_deref()
    }

    pub fn explicit_config_loaded_from(&self) -> Option<&Path> {
        self.explicit_path.as_deref()
    }
}
