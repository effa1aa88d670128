//! Integration tests running the manager over the file-backed store.

use std::sync::Arc;

use tempfile::TempDir;

use corpus_forest::core::corpus::CorpusDraft;
use corpus_forest::core::types::{CorpusId, CorpusKind};
use corpus_forest::manager::{CreateOptions, ErrorKind, ManagerSettings, TreeCorpusManager};
use corpus_forest::normalize::BasicNormalizer;
use corpus_forest::services::LanguageCorpusService;
use corpus_forest::store::{FileStore, VersionedDataStore};

fn manager_at(dir: &TempDir, offload_threshold: usize) -> TreeCorpusManager {
    let store = FileStore::open(dir.path())
        .unwrap()
        .with_offload_threshold(offload_threshold);
    let mut settings = ManagerSettings::default();
    settings.max_depth = 8;
    TreeCorpusManager::new(Arc::new(store), Arc::new(BasicNormalizer)).with_settings(settings)
}

fn version_files(dir: &TempDir, id: CorpusId) -> Vec<String> {
    let store = FileStore::open(dir.path()).unwrap();
    let mut names: Vec<String> = std::fs::read_dir(store.corpus_dir(id))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|n| n.starts_with('v'))
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn forest_survives_reopening() {
    let dir = TempDir::new().unwrap();
    let manager = manager_at(&dir, 3);

    let root = manager
        .create(
            CorpusDraft::new("English", Vec::<String>::new())
                .kind(CorpusKind::Language)
                .master(true),
            CreateOptions::default(),
        )
        .await
        .unwrap();
    manager
        .create(
            CorpusDraft::new("common", ["the", "and", "bank", "Bank"]).kind(CorpusKind::Wordlist),
            CreateOptions::under(root.id()),
        )
        .await
        .unwrap();

    let merged = manager.aggregate(root.id(), true).await.unwrap();
    assert_eq!(merged.vocabulary(), ["and", "bank", "the"]);

    let reopened = manager_at(&dir, 3);
    let loaded = reopened.get(root.id()).await.unwrap();
    assert_eq!(loaded.vocabulary(), ["and", "bank", "the"]);
    assert_eq!(loaded.originals_for("bank"), vec!["Bank", "bank"]);
    assert_eq!(loaded.version(), merged.version());
    assert!(reopened.verify().await.unwrap().ok());

    reopened.delete(root.id()).await.unwrap();
    assert!(reopened.forest().await.unwrap().records.is_empty());
}

#[tokio::test]
async fn large_vocabularies_are_offloaded() {
    let dir = TempDir::new().unwrap();
    let manager = manager_at(&dir, 2);

    let small = manager
        .create(CorpusDraft::new("small", ["a"]), CreateOptions::default())
        .await
        .unwrap();
    let large = manager
        .create(
            CorpusDraft::new("large", ["a", "b", "c", "d"]),
            CreateOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(version_files(&dir, small.id()), ["v000001.json"]);
    assert_eq!(
        version_files(&dir, large.id()),
        ["v000001.content.json", "v000001.json"]
    );
    let loaded = manager.get(large.id()).await.unwrap();
    assert_eq!(loaded.vocabulary(), ["a", "b", "c", "d"]);
}

#[tokio::test]
async fn every_version_is_kept_for_audit() {
    let dir = TempDir::new().unwrap();
    let manager = manager_at(&dir, 100);
    let a = manager
        .create(CorpusDraft::new("a", ["own"]), CreateOptions::default())
        .await
        .unwrap();
    manager
        .create(CorpusDraft::new("b", ["child"]), CreateOptions::under(a.id()))
        .await
        .unwrap();

    let merged = manager.aggregate(a.id(), true).await.unwrap();
    let latest = merged.version().unwrap();
    assert!(latest >= 3);

    let store = FileStore::open(dir.path()).unwrap();
    let first = store.load_version(a.id(), 1).await.unwrap().unwrap();
    assert_eq!(first.vocabulary, vec!["own".to_string()]);
    assert!(first.child_uuids.is_empty());

    let current = store.load(a.id()).await.unwrap().unwrap();
    assert_eq!(current.version, latest);
    assert_eq!(current.vocabulary, vec!["child".to_string(), "own".to_string()]);
}

#[tokio::test]
async fn deleted_corpora_stay_deleted() {
    let dir = TempDir::new().unwrap();
    let manager = manager_at(&dir, 100);
    let corpus = manager
        .create(CorpusDraft::new("gone", ["x"]), CreateOptions::default())
        .await
        .unwrap();
    let mut stale = manager.get(corpus.id()).await.unwrap();

    manager.delete(corpus.id()).await.unwrap();
    assert!(FileStore::open(dir.path())
        .unwrap()
        .corpus_dir(corpus.id())
        .join("DELETED")
        .exists());

    let err = manager.save(&mut stale).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Rejected);
    assert_eq!(
        manager.get(corpus.id()).await.unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

#[tokio::test]
async fn language_service_over_files() {
    let dir = TempDir::new().unwrap();
    let service = LanguageCorpusService::new(Arc::new(manager_at(&dir, 100)));
    let en = corpus_forest::core::types::Language::english();

    let root = service.ensure_root("English", &en).await.unwrap();
    service
        .add_source(root.id(), CorpusDraft::new("nouns", ["bank", "shore"]))
        .await
        .unwrap();
    let added = service
        .add_source(root.id(), CorpusDraft::new("verbs", ["run", "bank"]))
        .await
        .unwrap();
    assert_eq!(added.root.vocabulary(), ["bank", "run", "shore"]);

    // A fresh service over the same directory finds the existing root.
    let again = LanguageCorpusService::new(Arc::new(manager_at(&dir, 100)));
    let same = again.ensure_root("English", &en).await.unwrap();
    assert_eq!(same.id(), root.id());
}
