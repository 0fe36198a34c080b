use async_trait::async_trait;

use super::Notification;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum DeliveryKind {
    Once,
    Daily,
}

/// Where a fired local notification ends up being shown.
#[async_trait]
pub trait NotificationDeliveryChannel: Send + Sync + 'static {
    async fn deliver(&self, notification: &Notification, kind: DeliveryKind);
}

pub struct LogDeliveryChannel;

#[async_trait]
impl NotificationDeliveryChannel for LogDeliveryChannel {
    async fn deliver(&self, notification: &Notification, kind: DeliveryKind) {
        log::info!(
            "🔔 {} - {} [kind = {:?}]",
            notification.title,
            notification.body,
            kind
        );
    }
}
