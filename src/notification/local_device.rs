use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, TimeDelta, Utc};
use chrono_tz::Tz;
use tokio::{sync::Mutex, task::JoinHandle, time};
use tokio_util::sync::CancellationToken;

use crate::{clock::Clock, time_resolver};

use super::{
    ChannelSettings, DeliveryKind, Notification, NotificationDeliveryChannel, NotificationDevice,
    NotificationHandle, PermissionStatus,
};

const CANCEL_TIMEOUT: Duration = Duration::from_secs(5);

struct ScheduledTask {
    task_handle: JoinHandle<()>,
    cancellation_token: CancellationToken,
}

impl ScheduledTask {
    async fn cancel(self, timeout: Duration) {
        self.cancellation_token.cancel();
        let _ = time::timeout(timeout, self.task_handle).await;
    }
}

#[derive(Default)]
struct DeviceState {
    next_handle: u64,
    tasks: HashMap<NotificationHandle, ScheduledTask>,
}

impl DeviceState {
    fn issue_handle(&mut self) -> NotificationHandle {
        self.next_handle += 1;
        NotificationHandle(self.next_handle)
    }

    fn clean_finished_tasks(&mut self) {
        let before = self.tasks.len();
        self.tasks.retain(|_, task| !task.task_handle.is_finished());
        let after = self.tasks.len();

        if before != after {
            log::debug!("Cleaned up {} fired notification tasks", before - after);
        }
    }
}

/// In-process notification capability: every armed alert is a task sleeping until its instant.
pub struct LocalNotificationDevice {
    state: Mutex<DeviceState>,
    delivery_channel: Arc<dyn NotificationDeliveryChannel>,
    clock: Arc<dyn Clock>,
    timezone: Tz,
    permission: PermissionStatus,
}

impl LocalNotificationDevice {
    pub fn new(
        delivery_channel: Arc<dyn NotificationDeliveryChannel>,
        clock: Arc<dyn Clock>,
        timezone: Tz,
    ) -> Self {
        Self {
            state: Mutex::new(DeviceState::default()),
            delivery_channel,
            clock,
            timezone,
            permission: PermissionStatus::Granted,
        }
    }

    pub fn with_permission(mut self, permission: PermissionStatus) -> Self {
        self.permission = permission;
        self
    }

    pub async fn armed_count(&self) -> usize {
        let mut state = self.state.lock().await;
        state.clean_finished_tasks();
        state.tasks.len()
    }

    fn spawn_once(&self, notification: Notification, delay: Duration) -> ScheduledTask {
        let cancellation_token = CancellationToken::new();
        let task_cancellation_token = cancellation_token.child_token();
        let delivery_channel = Arc::clone(&self.delivery_channel);

        let task_handle = tokio::spawn(async move {
            tokio::select! {
                _ = task_cancellation_token.cancelled() => {
                    log::debug!("Notification \"{}\" was cancelled", notification.title);
                },
                _ = time::sleep(delay) => {
                    delivery_channel.deliver(&notification, DeliveryKind::Once).await;
                }
            }
        });

        ScheduledTask {
            task_handle,
            cancellation_token,
        }
    }

    fn spawn_daily(
        &self,
        notification: Notification,
        fire_time: NaiveTime,
        first_fire: DateTime<Tz>,
        first_delay: Duration,
    ) -> ScheduledTask {
        let cancellation_token = CancellationToken::new();
        let task_cancellation_token = cancellation_token.child_token();
        let delivery_channel = Arc::clone(&self.delivery_channel);
        let timezone = self.timezone;

        let task_handle = tokio::spawn(async move {
            let mut fired_at = first_fire;
            let mut delay = first_delay;
            loop {
                tokio::select! {
                    _ = task_cancellation_token.cancelled() => {
                        log::debug!("Daily notification \"{}\" was cancelled", notification.title);
                        break;
                    },
                    _ = time::sleep(delay) => {
                        delivery_channel.deliver(&notification, DeliveryKind::Daily).await;
                    }
                }

                let next = next_day_at(&timezone, fired_at, fire_time);
                delay = (next.clone() - fired_at.clone())
                    .to_std()
                    .unwrap_or(Duration::from_secs(24 * 60 * 60));
                fired_at = next;
            }
        });

        ScheduledTask {
            task_handle,
            cancellation_token,
        }
    }
}

fn next_day_at(timezone: &Tz, fired_at: DateTime<Tz>, fire_time: NaiveTime) -> DateTime<Tz> {
    let next_local = fired_at.date_naive().and_time(fire_time) + TimeDelta::days(1);
    time_resolver::to_local_instant(timezone, next_local)
        .unwrap_or_else(|_| fired_at + TimeDelta::days(1))
}

#[async_trait]
impl NotificationDevice for LocalNotificationDevice {
    async fn request_permission(&self) -> anyhow::Result<PermissionStatus> {
        Ok(self.permission)
    }

    async fn configure_channel(&self, channel: &ChannelSettings) -> anyhow::Result<()> {
        log::debug!(
            "Local notifications use channel {} ({:?})",
            channel.id,
            channel.importance
        );
        Ok(())
    }

    async fn schedule_once(
        &self,
        notification: Notification,
        fire_at: DateTime<Utc>,
    ) -> anyhow::Result<NotificationHandle> {
        let delay = (fire_at - self.clock.now())
            .to_std()
            .map_err(|_| anyhow::anyhow!("Fire instant {fire_at} is not in the future"))?;

        let mut state = self.state.lock().await;
        state.clean_finished_tasks();
        let handle = state.issue_handle();
        let task = self.spawn_once(notification, delay);
        state.tasks.insert(handle, task);

        log::info!("Armed notification {handle:?} at {fire_at}");
        Ok(handle)
    }

    async fn schedule_daily(
        &self,
        notification: Notification,
        hour: u32,
        minute: u32,
    ) -> anyhow::Result<NotificationHandle> {
        let fire_time = NaiveTime::from_hms_opt(hour, minute, 0)
            .ok_or_else(|| anyhow::anyhow!("{hour:02}:{minute:02} is not a valid time"))?;

        let now = self.clock.now().with_timezone(&self.timezone);
        let first_local = time_resolver::next_daily_occurrence(fire_time, now.naive_local());
        let first_fire = time_resolver::to_local_instant(&self.timezone, first_local)?;
        let first_delay = (first_fire.clone() - now).to_std()?;

        let mut state = self.state.lock().await;
        state.clean_finished_tasks();
        let handle = state.issue_handle();
        let task = self.spawn_daily(notification, fire_time, first_fire, first_delay);
        state.tasks.insert(handle, task);

        log::info!(
            "Armed daily notification {handle:?} at {}",
            fire_time.format("%H:%M")
        );
        Ok(handle)
    }

    async fn cancel_all(&self) -> anyhow::Result<()> {
        let tasks: Vec<ScheduledTask> = {
            let mut state = self.state.lock().await;
            state.tasks.drain().map(|(_, task)| task).collect()
        };

        if !tasks.is_empty() {
            log::info!("Cancelling {} armed notifications", tasks.len());
        }
        for task in tasks {
            task.cancel(CANCEL_TIMEOUT).await;
        }

        Ok(())
    }
}
