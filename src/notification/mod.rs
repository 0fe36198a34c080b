pub mod delivery;
pub mod local_device;
mod scheduler;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

pub use delivery::{DeliveryKind, LogDeliveryChannel, NotificationDeliveryChannel};
pub use local_device::LocalNotificationDevice;
pub use scheduler::{ArmedSnapshot, NotificationScheduler};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NotificationHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

impl Notification {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    Low,
    #[default]
    Default,
    High,
    Max,
}

/// Platform channel configuration. Only some platforms honour it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChannelSettings {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub importance: Importance,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            id: "default".to_string(),
            name: "Recordatorios".to_string(),
            importance: Importance::Max,
        }
    }
}

/// Platform service that shows local alerts at scheduled times.
///
/// Scheduling and cancellation touch device-wide state. There is no per-alert cancel and no
/// read-back of what is currently armed.
#[async_trait]
pub trait NotificationDevice: Send + Sync + 'static {
    async fn request_permission(&self) -> anyhow::Result<PermissionStatus>;

    async fn configure_channel(&self, channel: &ChannelSettings) -> anyhow::Result<()>;

    async fn schedule_once(
        &self,
        notification: Notification,
        fire_at: DateTime<Utc>,
    ) -> anyhow::Result<NotificationHandle>;

    async fn schedule_daily(
        &self,
        notification: Notification,
        hour: u32,
        minute: u32,
    ) -> anyhow::Result<NotificationHandle>;

    async fn cancel_all(&self) -> anyhow::Result<()>;
}
