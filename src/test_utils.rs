use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    clock::Clock,
    error::StorageError,
    notification::{
        ChannelSettings, DeliveryKind, Notification, NotificationDeliveryChannel,
        NotificationDevice, NotificationHandle, PermissionStatus,
    },
    reminder::{Reminder, ReminderId},
    storage::{InMemoryReminderStorage, NewReminder, ReminderStore},
};

pub struct ManualClock(Mutex<DateTime<Utc>>);

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.0.lock().unwrap() = now;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

type ReceivedMessages = Arc<Mutex<Vec<(String, DeliveryKind)>>>;

#[derive(Clone, Default)]
pub struct RecordingDeliveryChannel {
    received_messages: ReceivedMessages,
}

impl RecordingDeliveryChannel {
    pub fn messages(&self) -> Vec<(String, DeliveryKind)> {
        self.received_messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationDeliveryChannel for RecordingDeliveryChannel {
    async fn deliver(&self, notification: &Notification, kind: DeliveryKind) {
        self.received_messages
            .lock()
            .unwrap()
            .push((notification.title.clone(), kind));
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCall {
    RequestPermission,
    ConfigureChannel,
    ScheduleOnce { title: String, fire_at: DateTime<Utc> },
    ScheduleDaily { hour: u32, minute: u32 },
    CancelAll,
}

#[derive(Default)]
struct DeviceRecord {
    calls: Vec<DeviceCall>,
    armed_once: usize,
    armed_daily: usize,
    next_handle: u64,
}

/// Device double that remembers every call and how many alerts would be armed.
pub struct RecordingDevice {
    record: Mutex<DeviceRecord>,
    permission: PermissionStatus,
    failing_channel: bool,
    failing_schedule: bool,
    schedule_limit: Option<usize>,
}

impl Default for RecordingDevice {
    fn default() -> Self {
        Self {
            record: Mutex::new(DeviceRecord::default()),
            permission: PermissionStatus::Granted,
            failing_channel: false,
            failing_schedule: false,
            schedule_limit: None,
        }
    }
}

impl RecordingDevice {
    pub fn with_permission(mut self, permission: PermissionStatus) -> Self {
        self.permission = permission;
        self
    }

    pub fn failing_channel(mut self) -> Self {
        self.failing_channel = true;
        self
    }

    pub fn failing_schedule(mut self) -> Self {
        self.failing_schedule = true;
        self
    }

    /// Accepts `limit` schedule calls in total, then fails every later one.
    pub fn fail_schedules_after(mut self, limit: usize) -> Self {
        self.schedule_limit = Some(limit);
        self
    }

    pub fn calls(&self) -> Vec<DeviceCall> {
        self.record.lock().unwrap().calls.clone()
    }

    pub fn schedule_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| {
                matches!(
                    call,
                    DeviceCall::ScheduleOnce { .. } | DeviceCall::ScheduleDaily { .. }
                )
            })
            .count()
    }

    pub fn armed_once(&self) -> usize {
        self.record.lock().unwrap().armed_once
    }

    pub fn armed_daily(&self) -> usize {
        self.record.lock().unwrap().armed_daily
    }

    fn schedule_rejected(&self) -> bool {
        self.failing_schedule
            || self
                .schedule_limit
                .is_some_and(|limit| self.schedule_calls() >= limit)
    }

    fn push(&self, call: DeviceCall) -> NotificationHandle {
        let mut record = self.record.lock().unwrap();
        match &call {
            DeviceCall::ScheduleOnce { .. } => record.armed_once += 1,
            DeviceCall::ScheduleDaily { .. } => record.armed_daily += 1,
            DeviceCall::CancelAll => {
                record.armed_once = 0;
                record.armed_daily = 0;
            }
            _ => {}
        }
        record.calls.push(call);
        record.next_handle += 1;
        NotificationHandle(record.next_handle)
    }
}

#[async_trait]
impl NotificationDevice for RecordingDevice {
    async fn request_permission(&self) -> anyhow::Result<PermissionStatus> {
        self.push(DeviceCall::RequestPermission);
        Ok(self.permission)
    }

    async fn configure_channel(&self, _channel: &ChannelSettings) -> anyhow::Result<()> {
        self.push(DeviceCall::ConfigureChannel);
        if self.failing_channel {
            anyhow::bail!("channels are not supported");
        }
        Ok(())
    }

    async fn schedule_once(
        &self,
        notification: Notification,
        fire_at: DateTime<Utc>,
    ) -> anyhow::Result<NotificationHandle> {
        if self.schedule_rejected() {
            anyhow::bail!("notification service unavailable");
        }
        Ok(self.push(DeviceCall::ScheduleOnce {
            title: notification.title,
            fire_at,
        }))
    }

    async fn schedule_daily(
        &self,
        _notification: Notification,
        hour: u32,
        minute: u32,
    ) -> anyhow::Result<NotificationHandle> {
        if self.schedule_rejected() {
            anyhow::bail!("notification service unavailable");
        }
        Ok(self.push(DeviceCall::ScheduleDaily { hour, minute }))
    }

    async fn cancel_all(&self) -> anyhow::Result<()> {
        self.push(DeviceCall::CancelAll);
        Ok(())
    }
}

/// Reminder store double with call counters, failure injection and an optional slow create.
#[derive(Default)]
pub struct CountingReminderStore {
    inner: InMemoryReminderStorage,
    creates: AtomicUsize,
    deletes: AtomicUsize,
    fail_create: AtomicBool,
    fail_delete: AtomicBool,
    create_delay: Option<Duration>,
}

impl CountingReminderStore {
    pub fn slow(create_delay: Duration) -> Self {
        Self {
            create_delay: Some(create_delay),
            ..Default::default()
        }
    }

    pub fn fail_create(&self) {
        self.fail_create.store(true, Ordering::SeqCst);
    }

    pub fn fail_delete(&self) {
        self.fail_delete.store(true, Ordering::SeqCst);
    }

    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReminderStore for CountingReminderStore {
    async fn list(&self) -> Result<Vec<Reminder>, StorageError> {
        self.inner.list().await
    }

    async fn create(&self, reminder: NewReminder) -> Result<Reminder, StorageError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.create_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(StorageError::Status {
                status: 500,
                body: "Internal Server Error".to_string(),
            });
        }
        self.inner.create(reminder).await
    }

    async fn delete(&self, id: ReminderId) -> Result<(), StorageError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(StorageError::Status {
                status: 503,
                body: "Service Unavailable".to_string(),
            });
        }
        self.inner.delete(id).await
    }
}
