use std::sync::Arc;

use tokio::sync::watch;

use crate::error::Result;
use crate::models::SortingOption;
use crate::repository_traits::{Record, Repository, sort_records};

/// Observable, sorted view over one stored collection (favourite questions or saved quizzes).
///
/// Every write goes to the repository first and then refreshes the published list,
/// so subscribers only ever see what storage holds.
pub struct Library<T: Record> {
    repo: Arc<dyn Repository<T>>,
    order: SortingOption,
    items: watch::Sender<Vec<T>>,
}

impl<T: Record> Library<T> {
    pub fn new(repo: Arc<dyn Repository<T>>) -> Self {
        let (items, _) = watch::channel(Vec::new());
        Self {
            repo,
            order: SortingOption::default(),
            items,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<T>> {
        self.items.subscribe()
    }

    /// Snapshot of the last published list
    pub fn items(&self) -> Vec<T> {
        self.items.borrow().clone()
    }

    pub fn order(&self) -> SortingOption {
        self.order
    }

    /// Reload from storage in the current order
    pub async fn fetch(&self) -> Result<Vec<T>> {
        let mut records = self.repo.get_all().await?;
        sort_records(&mut records, self.order);
        tracing::debug!("Fetched {} {}", records.len(), T::KIND);
        self.items.send_replace(records.clone());
        Ok(records)
    }

    /// Re-sort the published list without going back to storage
    pub fn sort(&mut self, order: SortingOption) {
        self.order = order;
        self.items.send_modify(|records| sort_records(records, order));
    }

    pub async fn insert(&self, record: &T) -> Result<T> {
        let stored = self.repo.insert(record).await?;
        self.fetch().await?;
        Ok(stored)
    }

    pub async fn delete(&self, record: &T) -> Result<bool> {
        let removed = self.repo.delete(record).await?;
        if !removed {
            tracing::warn!("{} {} was not in storage", T::KIND, record.id());
        }
        self.fetch().await?;
        Ok(removed)
    }

    pub async fn delete_all(&self) -> Result<()> {
        self.repo.delete_all().await?;
        tracing::info!("Deleted all {}", T::KIND);
        self.items.send_replace(Vec::new());
        Ok(())
    }
}
