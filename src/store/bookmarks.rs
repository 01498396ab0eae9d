use std::collections::BTreeSet;
use std::sync::Arc;

use super::KeyValueStore;
use crate::error::StoreError;

/// Key holding the JSON array of bookmarked event ids.
pub const BOOKMARKS_KEY: &str = "starred";

/// Durable set of starred event ids.
///
/// Independent of server state: ids whose events have left the feed stay
/// bookmarked, and a refresh never touches this set.
pub struct Bookmarks {
    store: Arc<dyn KeyValueStore>,
    ids: BTreeSet<String>,
}

impl Bookmarks {
    /// Load the persisted set. A missing, unreadable or corrupt value is
    /// treated as an empty set.
    pub async fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let ids = match store.get(BOOKMARKS_KEY).await {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<String>>(&raw) {
                Ok(ids) => ids.into_iter().collect(),
                Err(e) => {
                    tracing::warn!(error = %e, "ignoring corrupt bookmark data");
                    BTreeSet::new()
                }
            },
            Ok(None) => BTreeSet::new(),
            Err(e) => {
                tracing::warn!(error = %e, "could not read bookmarks, starting empty");
                BTreeSet::new()
            }
        };

        Self { store, ids }
    }

    /// Flip membership of `id` and persist the new set before returning.
    ///
    /// Returns the new membership. If the write fails the flip is undone, so
    /// the in-memory set always matches what is on disk.
    pub async fn toggle(&mut self, id: &str) -> Result<bool, StoreError> {
        let now_starred = if self.ids.remove(id) {
            false
        } else {
            self.ids.insert(id.to_string());
            true
        };

        if let Err(e) = self.persist().await {
            if now_starred {
                self.ids.remove(id);
            } else {
                self.ids.insert(id.to_string());
            }
            tracing::warn!(%id, error = %e, "failed to persist bookmark change");
            return Err(e);
        }

        Ok(now_starred)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn all(&self) -> &BTreeSet<String> {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    async fn persist(&self) -> Result<(), StoreError> {
        let encoded = serde_json::to_string(&self.ids)?;
        self.store.set(BOOKMARKS_KEY, &encoded).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use async_trait::async_trait;

    struct BrokenStore;

    #[async_trait]
    impl KeyValueStore for BrokenStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied").into())
        }

        async fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied").into())
        }
    }

    #[tokio::test]
    async fn double_toggle_restores_membership() {
        let store = Arc::new(MemoryStore::new());
        let mut bookmarks = Bookmarks::load(store.clone()).await;

        assert!(bookmarks.toggle("e1").await.unwrap());
        assert!(bookmarks.contains("e1"));
        assert!(!bookmarks.toggle("e1").await.unwrap());
        assert!(!bookmarks.contains("e1"));
        assert_eq!(store.get(BOOKMARKS_KEY).await.unwrap().as_deref(), Some("[]"));
    }

    #[tokio::test]
    async fn toggle_persists_before_returning() {
        let store = Arc::new(MemoryStore::new());
        let mut bookmarks = Bookmarks::load(store.clone()).await;
        bookmarks.toggle("b").await.unwrap();
        bookmarks.toggle("a").await.unwrap();

        assert_eq!(
            store.get(BOOKMARKS_KEY).await.unwrap().as_deref(),
            Some("[\"a\",\"b\"]")
        );

        let reloaded = Bookmarks::load(store).await;
        assert!(reloaded.contains("a") && reloaded.contains("b"));
        assert_eq!(reloaded.len(), 2);
    }

    #[tokio::test]
    async fn corrupt_or_unreadable_data_loads_as_empty() {
        let corrupt = Arc::new(MemoryStore::with_entry(BOOKMARKS_KEY, "{not json"));
        assert!(Bookmarks::load(corrupt).await.is_empty());

        let wrong_shape = Arc::new(MemoryStore::with_entry(BOOKMARKS_KEY, "{\"e1\": true}"));
        assert!(Bookmarks::load(wrong_shape).await.is_empty());

        assert!(Bookmarks::load(Arc::new(BrokenStore)).await.is_empty());
    }

    #[tokio::test]
    async fn failed_write_rolls_back() {
        let mut bookmarks = Bookmarks::load(Arc::new(BrokenStore)).await;

        assert!(bookmarks.toggle("e1").await.is_err());
        assert!(!bookmarks.contains("e1"));
    }
}
