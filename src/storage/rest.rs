use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use chrono_tz::Tz;
use reqwest::{Method, StatusCode};

use crate::{
    error::StorageError,
    reminder::{Reminder, ReminderId},
};

use super::{
    ApiClient, DiaryStore, NewReminder, ProfileStore, ReminderStore,
    model::{DiaryEntryRecord, NewReminderRecord, ProfilePatch, ProfileRecord, ReminderRecord},
};

const REMINDERS_PATH: &str = "seguimiento/recordatorios/";
const PROFILE_PATH: &str = "auth/perfil/";
const DIARY_PATH: &str = "seguimiento/diario/";

pub struct RestReminderStore {
    api: Arc<ApiClient>,
    timezone: Tz,
}

impl RestReminderStore {
    pub fn new(api: Arc<ApiClient>, timezone: Tz) -> Self {
        Self { api, timezone }
    }
}

#[async_trait]
impl ReminderStore for RestReminderStore {
    async fn list(&self) -> Result<Vec<Reminder>, StorageError> {
        let records: Vec<ReminderRecord> = self
            .api
            .execute(self.api.build_request(Method::GET, REMINDERS_PATH))
            .await?
            .json()
            .await?;

        records
            .into_iter()
            .map(|record| record.into_reminder(&self.timezone))
            .collect()
    }

    async fn create(&self, reminder: NewReminder) -> Result<Reminder, StorageError> {
        let body = NewReminderRecord::from(&reminder);
        let record: ReminderRecord = self
            .api
            .execute(self.api.build_request(Method::POST, REMINDERS_PATH).json(&body))
            .await?
            .json()
            .await?;

        log::info!("Backend created reminder {}", record.id);
        record.into_reminder(&self.timezone)
    }

    async fn delete(&self, id: ReminderId) -> Result<(), StorageError> {
        let path = format!("{REMINDERS_PATH}{id}/");
        match self
            .api
            .execute(self.api.build_request(Method::DELETE, &path))
            .await
        {
            Ok(_) => Ok(()),
            Err(StorageError::Status { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                Err(StorageError::NotFound(id))
            }
            Err(error) => Err(error),
        }
    }
}

pub struct RestProfileStore {
    api: Arc<ApiClient>,
}

impl RestProfileStore {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl ProfileStore for RestProfileStore {
    async fn daily_notifications_enabled(&self) -> Result<bool, StorageError> {
        let profile: ProfileRecord = self
            .api
            .execute(self.api.build_request(Method::GET, PROFILE_PATH))
            .await?
            .json()
            .await?;

        Ok(profile.notificaciones_diarias)
    }

    async fn set_daily_notifications(&self, enabled: bool) -> Result<(), StorageError> {
        let patch = ProfilePatch {
            notificaciones_diarias: enabled,
        };
        self.api
            .execute(self.api.build_request(Method::PATCH, PROFILE_PATH).json(&patch))
            .await?;

        Ok(())
    }
}

pub struct RestDiaryStore {
    api: Arc<ApiClient>,
}

impl RestDiaryStore {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl DiaryStore for RestDiaryStore {
    async fn entry_dates(&self) -> Result<Vec<NaiveDate>, StorageError> {
        let entries: Vec<DiaryEntryRecord> = self
            .api
            .execute(self.api.build_request(Method::GET, DIARY_PATH))
            .await?
            .json()
            .await?;

        Ok(entries.into_iter().filter_map(|entry| entry.fecha).collect())
    }
}
