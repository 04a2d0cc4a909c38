//! Integration tests for the image store

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use mapgen_cache::{CachePaths, CacheRoots, ImageStore};
use tempfile::TempDir;

fn store_in(dir: &TempDir) -> ImageStore {
    let paths = Arc::new(CachePaths::new(CacheRoots::new(
        dir.path().join("meta"),
        dir.path().join("img"),
    )));
    ImageStore::new(paths)
}

#[tokio::test]
async fn save_then_find() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);

    let path = store.save("3500-42", "webp", b"webp-bytes").await.unwrap();
    assert!(path.ends_with("3500-42.webp"));

    let found = store.find("3500-42").await.unwrap();
    assert_eq!(found.path, path);
    assert_eq!(found.extension, "webp");
}

#[tokio::test]
async fn find_probes_extensions_in_priority_order() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);

    // Both a jpg and a webp exist from different runs; jpg outranks webp.
    store.save("3500-42", "webp", b"old").await.unwrap();
    store.save("3500-42", "jpg", b"new").await.unwrap();

    let found = store.find("3500-42").await.unwrap();
    assert_eq!(found.extension, "jpg");
}

#[tokio::test]
async fn find_misses_for_unknown_key() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);

    assert!(store.find("nope").await.is_none());
}

#[tokio::test]
async fn sweep_deletes_unreferenced_files() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);

    let keep = store.save("keep", "png", b"a").await.unwrap();
    let stale = store.save("keep", "jpg", b"b").await.unwrap();
    let unreferenced = store.save("drop", "png", b"c").await.unwrap();

    let active: HashSet<PathBuf> = [keep.clone()].into();
    store.sweep(&active).await.unwrap();

    assert!(keep.exists());
    // The stale extension of an active key is gone too: the caller
    // supplies exact file paths, not keys.
    assert!(!stale.exists());
    assert!(!unreferenced.exists());
}

#[tokio::test]
async fn sweep_over_missing_directory_is_a_noop() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);

    store.sweep(&HashSet::new()).await.unwrap();
}
