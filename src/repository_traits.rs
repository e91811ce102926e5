use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::Result;
use crate::models::{Question, Quiz, SortingOption};

#[cfg(test)]
use mockall::automock;

/// A value the repository can store. Identity is assigned on insert.
pub trait Record:
    Clone + PartialEq + Serialize + DeserializeOwned + Send + Sync + std::fmt::Debug + 'static
{
    /// Key segment naming the collection
    const KIND: &'static str;

    fn id(&self) -> i64;
    fn with_id(self, id: i64) -> Self;
    fn created_at(&self) -> i64;
}

impl Record for Question {
    const KIND: &'static str = "questions";

    fn id(&self) -> i64 {
        self.id
    }

    fn with_id(self, id: i64) -> Self {
        Self { id, ..self }
    }

    fn created_at(&self) -> i64 {
        self.created_at
    }
}

impl Record for Quiz {
    const KIND: &'static str = "quizzes";

    fn id(&self) -> i64 {
        self.id
    }

    fn with_id(self, id: i64) -> Self {
        Self { id, ..self }
    }

    fn created_at(&self) -> i64 {
        self.created_at
    }
}

/// Keyed record storage, one collection per record kind
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Repository<T: Record>: Send + Sync {
    /// Store a record and return it with its assigned id
    async fn insert(&self, record: &T) -> Result<T>;

    /// All records in insertion order
    async fn get_all(&self) -> Result<Vec<T>>;

    /// Remove the stored record equal to `record`; false when none matched
    async fn delete(&self, record: &T) -> Result<bool>;

    async fn delete_all(&self) -> Result<()>;
}

/// Whether the serialized row holds exactly `record`. Unreadable rows never match.
pub fn stored_matches<T: Record>(json: &str, record: &T) -> bool {
    match serde_json::from_str::<T>(json) {
        Ok(stored) => stored == *record,
        Err(e) => {
            tracing::warn!("Unreadable {} {} in storage: {}", T::KIND, record.id(), e);
            false
        }
    }
}

/// Sort by creation time; ties keep their id order
pub fn sort_records<T: Record>(records: &mut [T], order: SortingOption) {
    match order {
        SortingOption::Newest => {
            records.sort_by(|a, b| {
                b.created_at()
                    .cmp(&a.created_at())
                    .then_with(|| b.id().cmp(&a.id()))
            });
        }
        SortingOption::Oldest => {
            records.sort_by(|a, b| {
                a.created_at()
                    .cmp(&b.created_at())
                    .then_with(|| a.id().cmp(&b.id()))
            });
        }
    }
}
