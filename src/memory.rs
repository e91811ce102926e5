use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::repository_traits::{Record, Repository, stored_matches};
use crate::settings::SettingsStore;

#[derive(Default)]
struct Collection {
    next_id: i64,
    // id -> serialized record; BTreeMap keeps insertion order since ids only grow
    rows: BTreeMap<i64, String>,
}

/// Process-local store with the same semantics as the Redis backend
#[derive(Clone, Default)]
pub struct MemoryStore {
    collections: Arc<RwLock<HashMap<&'static str, Collection>>>,
    settings: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl<T: Record> Repository<T> for MemoryStore {
    async fn insert(&self, record: &T) -> Result<T> {
        let mut collections = self.collections.write().await;
        let collection = collections.entry(T::KIND).or_default();
        collection.next_id += 1;
        let stored = record.clone().with_id(collection.next_id);
        collection
            .rows
            .insert(stored.id(), serde_json::to_string(&stored)?);
        tracing::debug!("[Memory] Inserted {} {}", T::KIND, stored.id());
        Ok(stored)
    }

    async fn get_all(&self) -> Result<Vec<T>> {
        let collections = self.collections.read().await;
        let Some(collection) = collections.get(T::KIND) else {
            return Ok(Vec::new());
        };
        let mut records = Vec::with_capacity(collection.rows.len());
        for (id, json) in &collection.rows {
            match serde_json::from_str::<T>(json) {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!("[Memory] Skipping unreadable {} {}: {}", T::KIND, id, e),
            }
        }
        Ok(records)
    }

    async fn delete(&self, record: &T) -> Result<bool> {
        let mut collections = self.collections.write().await;
        let Some(collection) = collections.get_mut(T::KIND) else {
            return Ok(false);
        };
        let matches = match collection.rows.get(&record.id()) {
            Some(json) => stored_matches(json, record),
            None => false,
        };
        if matches {
            collection.rows.remove(&record.id());
            tracing::debug!("[Memory] Deleted {} {}", T::KIND, record.id());
        }
        Ok(matches)
    }

    async fn delete_all(&self) -> Result<()> {
        let mut collections = self.collections.write().await;
        if let Some(collection) = collections.get_mut(T::KIND) {
            collection.rows.clear();
        }
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn get_setting(&self, key: &str) -> Result<Option<String>> {
        Ok(self.settings.read().await.get(key).cloned())
    }

    async fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        self.settings
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Question, Quiz};

    fn question(text: &str) -> Question {
        Question::new(
            text.to_string(),
            vec!["A) True".to_string(), "B) False".to_string()],
            "A) True".to_string(),
        )
    }

    #[tokio::test]
    async fn test_insert_assigns_ids_and_round_trips() {
        let store = MemoryStore::new();
        let original = question("Is Rust memory safe?");
        let stored = Repository::<Question>::insert(&store, &original).await.unwrap();
        assert_ne!(stored.id, 0);

        let all = Repository::<Question>::get_all(&store).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0], stored);
        assert_eq!(all[0].clone().with_id(0), original);
    }

    #[tokio::test]
    async fn test_delete_requires_full_equality() {
        let store = MemoryStore::new();
        let stored = Repository::<Question>::insert(&store, &question("q")).await.unwrap();

        let mut altered = stored.clone();
        altered.text = "different".to_string();
        assert!(!Repository::<Question>::delete(&store, &altered).await.unwrap());
        assert!(!Repository::<Question>::delete(&store, &question("q")).await.unwrap());
        assert!(Repository::<Question>::delete(&store, &stored).await.unwrap());

        let all = Repository::<Question>::get_all(&store).await.unwrap();
        assert!(all.is_empty());
    }

    #[tokio::test]
    async fn test_kinds_are_separate() {
        let store = MemoryStore::new();
        Repository::<Question>::insert(&store, &question("q")).await.unwrap();
        Repository::<Quiz>::insert(&store, &Quiz::new("t".into(), vec![question("q")]))
            .await
            .unwrap();

        Repository::<Question>::delete_all(&store).await.unwrap();
        let questions = Repository::<Question>::get_all(&store).await.unwrap();
        let quizzes = Repository::<Quiz>::get_all(&store).await.unwrap();
        assert!(questions.is_empty());
        assert_eq!(quizzes.len(), 1);
    }

    #[tokio::test]
    async fn test_unreadable_row_is_skipped_and_never_matches() {
        let store = MemoryStore::new();
        let stored = Repository::<Question>::insert(&store, &question("q")).await.unwrap();
        store
            .collections
            .write()
            .await
            .get_mut(Question::KIND)
            .unwrap()
            .rows
            .insert(stored.id, "{not json".to_string());

        assert!(Repository::<Question>::get_all(&store).await.unwrap().is_empty());
        assert!(!Repository::<Question>::delete(&store, &stored).await.unwrap());
        Repository::<Question>::delete_all(&store).await.unwrap();
    }

    #[tokio::test]
    async fn test_settings_store() {
        let store = MemoryStore::new();
        assert_eq!(store.get_setting("lang").await.unwrap(), None);
        store.set_setting("lang", "English").await.unwrap();
        assert_eq!(
            store.get_setting("lang").await.unwrap().as_deref(),
            Some("English")
        );
    }
}
