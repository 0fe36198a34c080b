use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::{clock::Clock, error::ReminderError, reminder::ReminderId};

use super::{ChannelSettings, Notification, NotificationDevice, NotificationHandle, PermissionStatus};

struct ArmedOnce {
    handle: NotificationHandle,
    notification: Notification,
    fire_at: DateTime<Utc>,
}

struct ArmedDaily {
    handle: NotificationHandle,
    notification: Notification,
    hour: u32,
    minute: u32,
}

#[derive(Default)]
struct SchedulerState {
    permission: Option<PermissionStatus>,
    once: HashMap<ReminderId, ArmedOnce>,
    daily: Option<ArmedDaily>,
}

/// What the scheduler believes is armed on the device.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ArmedSnapshot {
    pub once: Vec<(ReminderId, DateTime<Utc>)>,
    pub daily: Option<(u32, u32)>,
}

/// Keeps a reminder id to handle map on top of a device that can only cancel everything.
///
/// Replacing or removing a single alert is done by cancelling all of them and arming the
/// remaining ones again. Nothing is read back from the device.
pub struct NotificationScheduler {
    device: Arc<dyn NotificationDevice>,
    clock: Arc<dyn Clock>,
    channel: ChannelSettings,
    state: Mutex<SchedulerState>,
}

impl NotificationScheduler {
    pub fn new(
        device: Arc<dyn NotificationDevice>,
        clock: Arc<dyn Clock>,
        channel: ChannelSettings,
    ) -> Self {
        Self {
            device,
            clock,
            channel,
            state: Mutex::new(SchedulerState::default()),
        }
    }

    /// Asks for permission the first time and remembers the answer.
    pub async fn ensure_permission(&self) -> Result<(), ReminderError> {
        let mut state = self.state.lock().await;
        match state.permission {
            Some(PermissionStatus::Granted) => return Ok(()),
            Some(PermissionStatus::Denied) => return Err(ReminderError::PermissionDenied),
            None => {}
        }

        let status = self
            .device
            .request_permission()
            .await
            .map_err(scheduling_error)?;
        state.permission = Some(status);

        match status {
            PermissionStatus::Granted => {
                if let Err(error) = self.device.configure_channel(&self.channel).await {
                    log::warn!("Could not configure notification channel: {error:#}");
                }
                Ok(())
            }
            PermissionStatus::Denied => {
                log::warn!("Notification permission denied, reminders will be saved without alerts");
                Err(ReminderError::PermissionDenied)
            }
        }
    }

    pub async fn schedule_once(
        &self,
        reminder_id: ReminderId,
        notification: Notification,
        fire_at: DateTime<Utc>,
    ) -> Result<NotificationHandle, ReminderError> {
        if fire_at <= self.clock.now() {
            return Err(ReminderError::Scheduling(format!(
                "fire instant {fire_at} is not in the future"
            )));
        }
        self.ensure_permission().await?;

        let mut state = self.state.lock().await;
        if state.once.contains_key(&reminder_id) {
            self.rearm(&mut state, Some(reminder_id), true).await?;
        }

        let handle = self
            .device
            .schedule_once(notification.clone(), fire_at)
            .await
            .map_err(scheduling_error)?;
        state.once.insert(
            reminder_id,
            ArmedOnce {
                handle,
                notification,
                fire_at,
            },
        );

        Ok(handle)
    }

    /// Arms the single daily alert. Everything is cancelled first so daily alerts never pile up.
    pub async fn schedule_daily(
        &self,
        notification: Notification,
        hour: u32,
        minute: u32,
    ) -> Result<NotificationHandle, ReminderError> {
        self.ensure_permission().await?;

        let mut state = self.state.lock().await;
        self.rearm(&mut state, None, false).await?;

        let handle = self
            .device
            .schedule_daily(notification.clone(), hour, minute)
            .await
            .map_err(scheduling_error)?;
        state.daily = Some(ArmedDaily {
            handle,
            notification,
            hour,
            minute,
        });

        Ok(handle)
    }

    pub async fn cancel_reminder(&self, reminder_id: ReminderId) -> Result<(), ReminderError> {
        let mut state = self.state.lock().await;
        if !state.once.contains_key(&reminder_id) {
            return Ok(());
        }

        self.rearm(&mut state, Some(reminder_id), true).await
    }

    pub async fn cancel_daily(&self) -> Result<(), ReminderError> {
        let mut state = self.state.lock().await;
        self.rearm(&mut state, None, false).await
    }

    pub async fn cancel_all(&self) -> Result<(), ReminderError> {
        let mut state = self.state.lock().await;
        self.device.cancel_all().await.map_err(scheduling_error)?;
        state.once.clear();
        state.daily = None;
        Ok(())
    }

    pub async fn armed(&self) -> ArmedSnapshot {
        let state = self.state.lock().await;
        let mut once: Vec<_> = state
            .once
            .iter()
            .map(|(id, armed)| (*id, armed.fire_at))
            .collect();
        once.sort();

        ArmedSnapshot {
            once,
            daily: state.daily.as_ref().map(|daily| (daily.hour, daily.minute)),
        }
    }

    async fn rearm(
        &self,
        state: &mut SchedulerState,
        exclude: Option<ReminderId>,
        keep_daily: bool,
    ) -> Result<(), ReminderError> {
        self.device.cancel_all().await.map_err(scheduling_error)?;

        if let Some(id) = exclude {
            state.once.remove(&id);
        }
        if !keep_daily {
            state.daily = None;
        }

        let now = self.clock.now();
        state.once.retain(|_, armed| armed.fire_at > now);

        // Entries that fail to re-arm are dropped from the arena.
        let mut lost = Vec::new();
        for (id, armed) in state.once.iter_mut() {
            match self
                .device
                .schedule_once(armed.notification.clone(), armed.fire_at)
                .await
            {
                Ok(handle) => armed.handle = handle,
                Err(error) => {
                    log::warn!("Could not re-arm reminder {id}: {error:#}");
                    lost.push(*id);
                }
            }
        }
        for id in lost {
            state.once.remove(&id);
        }

        let daily_lost = match state.daily.as_mut() {
            Some(daily) => match self
                .device
                .schedule_daily(daily.notification.clone(), daily.hour, daily.minute)
                .await
            {
                Ok(handle) => {
                    daily.handle = handle;
                    false
                }
                Err(error) => {
                    log::warn!("Could not re-arm the daily alert: {error:#}");
                    true
                }
            },
            None => false,
        };
        if daily_lost {
            state.daily = None;
        }

        Ok(())
    }
}

fn scheduling_error(error: anyhow::Error) -> ReminderError {
    ReminderError::Scheduling(format!("{error:#}"))
}
