// Bookmarks persisted through FileStore in a throwaway directory.

use std::sync::Arc;
use tempfile::TempDir;

use finhot::store::BOOKMARKS_KEY;
use finhot::{Bookmarks, FileStore, KeyValueStore};

fn store_in(dir: &TempDir) -> Arc<dyn KeyValueStore> {
    Arc::new(FileStore::new(dir.path()))
}

#[tokio::test]
async fn bookmarks_survive_a_reload() {
    let dir = TempDir::new().expect("tempdir");

    let mut bookmarks = Bookmarks::load(store_in(&dir)).await;
    assert!(bookmarks.is_empty());
    assert!(bookmarks.toggle("evt-2").await.expect("star"));
    assert!(bookmarks.toggle("evt-1").await.expect("star"));
    assert!(!bookmarks.toggle("evt-2").await.expect("unstar"));

    let reloaded = Bookmarks::load(store_in(&dir)).await;
    assert!(reloaded.contains("evt-1"));
    assert!(!reloaded.contains("evt-2"));
    assert_eq!(reloaded.len(), 1);

    let raw = std::fs::read_to_string(dir.path().join("starred.json")).expect("bookmark file");
    assert_eq!(raw, r#"["evt-1"]"#);
}

#[tokio::test]
async fn corrupt_file_loads_as_empty_and_is_overwritten() {
    let dir = TempDir::new().expect("tempdir");
    std::fs::write(dir.path().join("starred.json"), "{definitely not a list").expect("seed");

    let mut bookmarks = Bookmarks::load(store_in(&dir)).await;
    assert!(bookmarks.is_empty());

    bookmarks.toggle("evt-9").await.expect("star");
    let reloaded = Bookmarks::load(store_in(&dir)).await;
    assert!(reloaded.contains("evt-9"));
}

#[tokio::test]
async fn ids_without_a_live_event_are_kept() {
    let dir = TempDir::new().expect("tempdir");
    let store = store_in(&dir);
    store
        .set(BOOKMARKS_KEY, r#"["gone-from-feed", "still-here"]"#)
        .await
        .expect("seed");

    let bookmarks = Bookmarks::load(store).await;
    let ids: Vec<&str> = bookmarks.all().iter().map(String::as_str).collect();
    assert_eq!(ids, vec!["gone-from-feed", "still-here"]);
}

#[tokio::test]
async fn missing_directory_is_created_on_first_write() {
    let dir = TempDir::new().expect("tempdir");
    let nested = dir.path().join("nested").join("data");

    let mut bookmarks = Bookmarks::load(Arc::new(FileStore::new(&nested))).await;
    bookmarks.toggle("evt-1").await.expect("star");

    assert!(nested.join("starred.json").exists());
    assert!(!nested.join(".starred.json.tmp").exists());
}
