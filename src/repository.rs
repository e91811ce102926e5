use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Result;
use crate::redis::RedisManager;
use crate::repository_traits::{Record, Repository, stored_matches};
use crate::settings::SettingsStore;

/// Redis implementation of the record and settings stores.
///
/// Records of one kind live as JSON strings in the hash `<ns>:<kind>`, keyed by id.
/// Ids come from the counter `<ns>:<kind>:next_id`, which `delete_all` leaves alone.
#[derive(Clone)]
pub struct RedisRepository {
    redis: Arc<RedisManager>,
    namespace: String,
}

impl RedisRepository {
    pub fn new(redis: Arc<RedisManager>, namespace: String) -> Self {
        Self { redis, namespace }
    }

    fn records_key(&self, kind: &str) -> String {
        format!("{}:{}", self.namespace, kind)
    }

    fn next_id_key(&self, kind: &str) -> String {
        format!("{}:{}:next_id", self.namespace, kind)
    }

    fn settings_key(&self) -> String {
        format!("{}:settings", self.namespace)
    }
}

#[async_trait]
impl<T: Record> Repository<T> for RedisRepository {
    async fn insert(&self, record: &T) -> Result<T> {
        let id = self.redis.incr(&self.next_id_key(T::KIND)).await?;
        let stored = record.clone().with_id(id);
        let json = serde_json::to_string(&stored)?;
        self.redis
            .hset(&self.records_key(T::KIND), &id.to_string(), &json)
            .await?;
        tracing::debug!("[Redis] Stored {} {}", T::KIND, id);
        Ok(stored)
    }

    async fn get_all(&self) -> Result<Vec<T>> {
        let rows = self.redis.hgetall_by_id(&self.records_key(T::KIND)).await?;
        let mut records = Vec::with_capacity(rows.len());
        for (id, json) in rows {
            match serde_json::from_str::<T>(&json) {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!("[Redis] Skipping unreadable {} {}: {}", T::KIND, id, e),
            }
        }
        Ok(records)
    }

    async fn delete(&self, record: &T) -> Result<bool> {
        let key = self.records_key(T::KIND);
        let field = record.id().to_string();
        let Some(json) = self.redis.hget(&key, &field).await? else {
            return Ok(false);
        };
        if !stored_matches(&json, record) {
            tracing::debug!("[Redis] {} {} differs from stored value, not deleting", T::KIND, field);
            return Ok(false);
        }
        let removed = self.redis.hdel(&key, &field).await?;
        tracing::debug!("[Redis] Deleted {} {}", T::KIND, field);
        Ok(removed)
    }

    async fn delete_all(&self) -> Result<()> {
        self.redis.del(&self.records_key(T::KIND)).await?;
        tracing::info!("[Redis] Deleted all {}", T::KIND);
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for RedisRepository {
    async fn get_setting(&self, key: &str) -> Result<Option<String>> {
        self.redis.hget(&self.settings_key(), key).await
    }

    async fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        self.redis.hset(&self.settings_key(), key, value).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::models::{Question, Quiz};

    // Runs only when a Redis server is available via QUIZ_TEST_REDIS=1
    async fn live_repository(namespace: &str) -> Option<RedisRepository> {
        if std::env::var("QUIZ_TEST_REDIS").is_err() {
            return None;
        }
        let manager = RedisManager::new_with_config(&Config::default()).await.ok()?;
        Some(RedisRepository::new(Arc::new(manager), namespace.to_string()))
    }

    #[tokio::test]
    async fn test_insert_get_delete_against_redis() {
        let Some(repo) = live_repository(&format!("quizgen-test-{}", uuid::Uuid::new_v4())).await
        else {
            return;
        };
        let question = Question::new(
            "2 + 2 = 4".into(),
            vec!["A) True".into(), "B) False".into()],
            "A) True".into(),
        );
        let stored = Repository::<Question>::insert(&repo, &question).await.unwrap();
        assert_ne!(stored.id, 0);

        let all = Repository::<Question>::get_all(&repo).await.unwrap();
        assert_eq!(all, vec![stored.clone()]);

        assert!(Repository::<Question>::delete(&repo, &stored).await.unwrap());
        assert!(Repository::<Question>::get_all(&repo).await.unwrap().is_empty());

        let quiz = Repository::<Quiz>::insert(&repo, &Quiz::new("math".into(), vec![question]))
            .await
            .unwrap();
        Repository::<Quiz>::delete_all(&repo).await.unwrap();
        let after = Repository::<Quiz>::get_all(&repo).await.unwrap();
        assert!(!after.contains(&quiz));
    }
}
