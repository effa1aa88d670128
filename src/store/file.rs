//! store::file
//!
//! File-backed versioned store.
//!
//! # Layout
//!
//! ```text
//! <root>/
//!   store.lock
//!   corpora/<uuid>/
//!     v000001.json           one record per version
//!     v000002.json
//!     v000002.content.json   offloaded vocabulary arrays (large corpora)
//!     LIVE                   latest version number
//!     DELETED                tombstone; the uuid is never written again
//! ```
//!
//! # Invariants
//!
//! - Every file is written to a temporary sibling and renamed into place,
//!   so readers never see a partial write and never take the lock
//! - Writes hold [`StoreLock`] for their whole duration
//! - Version files are never modified or removed after being written
//!
//! Storage ids have the form `<uuid>/v<NNNNNN>`.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::lock::StoreLock;
use super::{check_expected, SaveReceipt, StoreError, VersionedDataStore};
use crate::core::record::{parse_record, CorpusRecord};
use crate::core::types::{CorpusId, StorageId, UtcTimestamp};

/// Vocabularies longer than this are offloaded by default.
pub const DEFAULT_OFFLOAD_THRESHOLD: usize = 10_000;

const CORPORA_DIR: &str = "corpora";
const LIVE_FILE: &str = "LIVE";
const DELETED_FILE: &str = "DELETED";

/// Vocabulary arrays stored beside a version file.
#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct OffloadedContent {
    vocabulary: Vec<String>,
    lemmas: Vec<String>,
    original_vocabulary: Vec<String>,
    original_index: Vec<u32>,
}

/// Store rooted at a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    offload_threshold: usize,
}

impl FileStore {
    /// Open (creating if needed) a store at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(root.join(CORPORA_DIR))?;
        Ok(Self {
            root,
            offload_threshold: DEFAULT_OFFLOAD_THRESHOLD,
        })
    }

    /// Offload vocabularies with more than `threshold` words.
    pub fn with_offload_threshold(mut self, threshold: usize) -> Self {
        self.offload_threshold = threshold;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn offload_threshold(&self) -> usize {
        self.offload_threshold
    }

    /// Directory holding every version of `uuid`.
    pub fn corpus_dir(&self, uuid: CorpusId) -> PathBuf {
        corpus_dir(&self.root, uuid)
    }
}

fn corpus_dir(root: &Path, uuid: CorpusId) -> PathBuf {
    root.join(CORPORA_DIR).join(uuid.to_string())
}

fn version_file(version: u64) -> String {
    format!("v{:06}.json", version)
}

fn content_file(version: u64) -> String {
    format!("v{:06}.content.json", version)
}

fn storage_id_for(uuid: CorpusId, version: u64) -> Result<StorageId, StoreError> {
    StorageId::new(format!("{}/v{:06}", uuid, version))
        .map_err(|e| StoreError::Corrupt(e.to_string()))
}

fn parse_storage_id(storage_id: &StorageId) -> Option<(CorpusId, u64)> {
    let (uuid, version) = storage_id.as_str().split_once('/')?;
    let uuid = CorpusId::parse(uuid).ok()?;
    let version = version.strip_prefix('v')?.parse().ok()?;
    Some((uuid, version))
}

fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), StoreError> {
    let temp_path = path.with_extension("tmp");
    let mut file = fs::File::create(&temp_path)?;
    file.write_all(contents)?;
    file.sync_all()?;
    fs::rename(&temp_path, path)?;
    Ok(())
}

fn read_live_version(dir: &Path) -> Result<Option<u64>, StoreError> {
    let path = dir.join(LIVE_FILE);
    if !path.exists() {
        return Ok(None);
    }
    let text = fs::read_to_string(&path)?;
    text.trim()
        .parse()
        .map(Some)
        .map_err(|_| StoreError::Corrupt(format!("{}: bad version marker", path.display())))
}

fn is_deleted(dir: &Path) -> bool {
    dir.join(DELETED_FILE).exists()
}

fn read_version(dir: &Path, version: u64) -> Result<Option<CorpusRecord>, StoreError> {
    let path = dir.join(version_file(version));
    if !path.exists() {
        return Ok(None);
    }
    let json = fs::read_to_string(&path)?;
    let mut record = parse_record(&json)
        .map_err(|e| StoreError::Corrupt(format!("{}: {}", path.display(), e)))?;

    let content_path = dir.join(content_file(version));
    if content_path.exists() {
        let json = fs::read_to_string(&content_path)?;
        let content: OffloadedContent = serde_json::from_str(&json)
            .map_err(|e| StoreError::Corrupt(format!("{}: {}", content_path.display(), e)))?;
        record.vocabulary = content.vocabulary;
        record.lemmas = content.lemmas;
        record.original_vocabulary = content.original_vocabulary;
        record.original_index = content.original_index;
        record
            .validate()
            .map_err(|e| StoreError::Corrupt(format!("{}: {}", content_path.display(), e)))?;
    }

    Ok(Some(record))
}

fn load_live(root: &Path, uuid: CorpusId) -> Result<Option<CorpusRecord>, StoreError> {
    let dir = corpus_dir(root, uuid);
    if is_deleted(&dir) {
        return Ok(None);
    }
    match read_live_version(&dir)? {
        Some(version) => read_version(&dir, version),
        None => Ok(None),
    }
}

fn save_blocking(
    root: &Path,
    offload_threshold: usize,
    mut record: CorpusRecord,
    expected_version: Option<u64>,
) -> Result<SaveReceipt, StoreError> {
    let _lock = StoreLock::acquire(root)?;
    let uuid = record.corpus_uuid;
    let dir = corpus_dir(root, uuid);

    let version = check_expected(
        uuid,
        is_deleted(&dir),
        read_live_version(&dir)?,
        expected_version,
    )?;
    let storage_id = storage_id_for(uuid, version)?;
    record.version = version;
    record.storage_id = Some(storage_id.clone());
    record.created_at = UtcTimestamp::now();
    record.validate()?;
    fs::create_dir_all(&dir)?;

    if record.vocabulary.len() > offload_threshold {
        let content = OffloadedContent {
            vocabulary: std::mem::take(&mut record.vocabulary),
            lemmas: std::mem::take(&mut record.lemmas),
            original_vocabulary: std::mem::take(&mut record.original_vocabulary),
            original_index: std::mem::take(&mut record.original_index),
        };
        let json =
            serde_json::to_vec(&content).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        write_atomic(&dir.join(content_file(version)), &json)?;
        debug!(corpus = %uuid, version, words = content.vocabulary.len(), "offloaded vocabulary");
    }

    write_atomic(
        &dir.join(version_file(version)),
        record.to_canonical_json()?.as_bytes(),
    )?;
    write_atomic(&dir.join(LIVE_FILE), version.to_string().as_bytes())?;

    debug!(corpus = %uuid, version, "file store saved version");
    Ok(SaveReceipt {
        storage_id,
        version,
    })
}

fn delete_blocking(root: &Path, storage_id: &StorageId) -> Result<(), StoreError> {
    let not_found = || StoreError::NotFound(storage_id.to_string());
    let (uuid, version) = parse_storage_id(storage_id).ok_or_else(not_found)?;

    let _lock = StoreLock::acquire(root)?;
    let dir = corpus_dir(root, uuid);
    if is_deleted(&dir) || !dir.join(version_file(version)).exists() {
        return Err(not_found());
    }
    let live = read_live_version(&dir)?;
    if live != Some(version) {
        return Err(StoreError::Conflict {
            uuid,
            expected: Some(version),
            actual: live,
        });
    }

    write_atomic(
        &dir.join(DELETED_FILE),
        UtcTimestamp::now().to_string().as_bytes(),
    )?;
    debug!(corpus = %uuid, "file store deleted corpus");
    Ok(())
}

fn list_live_blocking(root: &Path) -> Result<Vec<CorpusId>, StoreError> {
    let mut live = Vec::new();
    for entry in fs::read_dir(root.join(CORPORA_DIR))? {
        let entry = entry?;
        let Some(uuid) = entry
            .file_name()
            .to_str()
            .and_then(|name| CorpusId::parse(name).ok())
        else {
            continue;
        };
        let dir = entry.path();
        if !is_deleted(&dir) && read_live_version(&dir)?.is_some() {
            live.push(uuid);
        }
    }
    live.sort();
    Ok(live)
}

/// Run blocking filesystem work off the async executor.
async fn blocking<T, F>(work: F) -> Result<T, StoreError>
where
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| StoreError::Io(format!("store task failed: {}", e)))?
}

#[async_trait]
impl VersionedDataStore for FileStore {
    async fn save(
        &self,
        record: CorpusRecord,
        expected_version: Option<u64>,
    ) -> Result<SaveReceipt, StoreError> {
        let root = self.root.clone();
        let threshold = self.offload_threshold;
        blocking(move || save_blocking(&root, threshold, record, expected_version)).await
    }

    async fn load(&self, uuid: CorpusId) -> Result<Option<CorpusRecord>, StoreError> {
        let root = self.root.clone();
        blocking(move || load_live(&root, uuid)).await
    }

    async fn load_version(
        &self,
        uuid: CorpusId,
        version: u64,
    ) -> Result<Option<CorpusRecord>, StoreError> {
        let root = self.root.clone();
        blocking(move || read_version(&corpus_dir(&root, uuid), version)).await
    }

    async fn delete(&self, storage_id: &StorageId) -> Result<(), StoreError> {
        let root = self.root.clone();
        let storage_id = storage_id.clone();
        blocking(move || delete_blocking(&root, &storage_id)).await
    }

    async fn list_live(&self) -> Result<Vec<CorpusId>, StoreError> {
        let root = self.root.clone();
        blocking(move || list_live_blocking(&root)).await
    }
}
