use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;

use crate::{
    error::StorageError,
    reminder::{Reminder, ReminderId},
};

use super::NewReminder;

/// Backend CRUD for reminder records.
#[async_trait]
pub trait ReminderStore: Send + Sync {
    async fn list(&self) -> Result<Vec<Reminder>, StorageError>;
    async fn create(&self, reminder: NewReminder) -> Result<Reminder, StorageError>;
    async fn delete(&self, id: ReminderId) -> Result<(), StorageError>;
}

/// The part of the user profile this crate cares about.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn daily_notifications_enabled(&self) -> Result<bool, StorageError>;
    async fn set_daily_notifications(&self, enabled: bool) -> Result<(), StorageError>;
}

#[async_trait]
pub trait DiaryStore: Send + Sync {
    async fn entry_dates(&self) -> Result<Vec<NaiveDate>, StorageError>;
}

struct InMemoryReminderStore {
    current_id: ReminderId,
    storage: BTreeMap<ReminderId, Reminder>,
}

pub struct InMemoryReminderStorage {
    store: RwLock<InMemoryReminderStore>,
}

impl InMemoryReminderStorage {
    pub fn new() -> Self {
        InMemoryReminderStorage {
            store: RwLock::new(InMemoryReminderStore {
                current_id: 1,
                storage: BTreeMap::new(),
            }),
        }
    }
}

impl Default for InMemoryReminderStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReminderStore for InMemoryReminderStorage {
    async fn list(&self) -> Result<Vec<Reminder>, StorageError> {
        let store = self.store.read().await;
        Ok(store.storage.values().cloned().collect())
    }

    async fn create(&self, reminder: NewReminder) -> Result<Reminder, StorageError> {
        let mut store = self.store.write().await;
        let current_id = store.current_id;
        let reminder = reminder.into_reminder(current_id);

        store.storage.insert(current_id, reminder.clone());
        store.current_id += 1;

        log::info!("Stored reminder {current_id} in memory");
        Ok(reminder)
    }

    async fn delete(&self, id: ReminderId) -> Result<(), StorageError> {
        let mut store = self.store.write().await;
        store
            .storage
            .remove(&id)
            .map(|_| ())
            .ok_or(StorageError::NotFound(id))
    }
}

#[derive(Default)]
pub struct InMemoryProfileStore {
    daily_notifications: RwLock<bool>,
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn daily_notifications_enabled(&self) -> Result<bool, StorageError> {
        Ok(*self.daily_notifications.read().await)
    }

    async fn set_daily_notifications(&self, enabled: bool) -> Result<(), StorageError> {
        *self.daily_notifications.write().await = enabled;
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryDiaryStore {
    dates: RwLock<Vec<NaiveDate>>,
}

impl InMemoryDiaryStore {
    pub async fn add_entry(&self, date: NaiveDate) {
        self.dates.write().await.push(date);
    }
}

#[async_trait]
impl DiaryStore for InMemoryDiaryStore {
    async fn entry_dates(&self) -> Result<Vec<NaiveDate>, StorageError> {
        Ok(self.dates.read().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{TimeZone, Utc};

    use crate::reminder::ReminderKind;

    fn new_reminder(title: &str) -> NewReminder {
        NewReminder::one_off(
            title,
            Utc.with_ymd_and_hms(2025, 11, 15, 14, 19, 0).unwrap().fixed_offset(),
            ReminderKind::default(),
        )
    }

    #[tokio::test]
    async fn created_reminders_get_increasing_ids() {
        let storage = InMemoryReminderStorage::new();

        let first = storage.create(new_reminder("a")).await.unwrap();
        let second = storage.create(new_reminder("b")).await.unwrap();

        assert_eq!((first.id, second.id), (1, 2));
        assert_eq!(storage.list().await.unwrap(), vec![first, second]);
    }

    #[tokio::test]
    async fn deleting_missing_reminder_fails() {
        let storage = InMemoryReminderStorage::new();
        let created = storage.create(new_reminder("a")).await.unwrap();

        storage.delete(created.id).await.unwrap();

        assert!(matches!(
            storage.delete(created.id).await,
            Err(StorageError::NotFound(1))
        ));
        assert!(storage.list().await.unwrap().is_empty());
    }
}
