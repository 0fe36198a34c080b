use std::sync::Arc;

use anyhow::Context;
use tokio::io::BufReader;

use registro::{
    appsettings::{ApiSettings, AppSettings},
    clock::SystemClock,
    console::ConsoleInterface,
    controller::ReminderController,
    notification::{LocalNotificationDevice, LogDeliveryChannel, NotificationScheduler},
    storage::{
        ApiClient, DiaryStore, InMemoryDiaryStore, InMemoryProfileStore, InMemoryReminderStorage,
        ProfileStore, ReminderStore, RestDiaryStore, RestProfileStore, RestReminderStore,
    },
};

type Stores = (
    Arc<dyn ReminderStore>,
    Arc<dyn ProfileStore>,
    Arc<dyn DiaryStore>,
);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    pretty_env_logger::init();

    let settings = AppSettings::load().context("Failed to load appsettings")?;
    let timezone = settings.device.timezone;
    log::info!("Starting with device timezone {timezone}");

    let (reminders, profile, diary) = match &settings.api {
        Some(api) => connect(api, timezone).await?,
        None => {
            log::warn!("No backend configured, reminders are kept in memory only");
            offline_stores()
        }
    };

    let clock = Arc::new(SystemClock);
    let device = LocalNotificationDevice::new(Arc::new(LogDeliveryChannel), clock.clone(), timezone);
    let scheduler = NotificationScheduler::new(Arc::new(device), clock.clone(), settings.device.channel);
    let controller = ReminderController::new(
        reminders,
        profile,
        diary,
        Arc::new(scheduler),
        clock,
        timezone,
        settings.daily,
    );

    match controller.restore_schedules().await {
        Ok(summary) if summary.permission_denied => {
            log::warn!("Notifications are not allowed, reminders will be saved without alerts")
        }
        Ok(_) => {}
        Err(error) => log::error!("Could not restore reminders: {error}"),
    }

    let console = ConsoleInterface::new(
        &controller,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    );

    tokio::select! {
        result = console.run() => result?,
        _ = tokio::signal::ctrl_c() => log::info!("Interrupted"),
    }

    log::info!("Shutting down");
    Ok(())
}

async fn connect(settings: &ApiSettings, timezone: chrono_tz::Tz) -> anyhow::Result<Stores> {
    let api = Arc::new(ApiClient::new(settings)?);

    if let (Some(username), Some(password)) = (&settings.username, &settings.password) {
        api.login(username, password)
            .await
            .context("Failed to log in to the backend")?;
    }
    if !api.has_token() {
        log::warn!("No session token, backend requests will be rejected");
    }

    let stores: Stores = (
        Arc::new(RestReminderStore::new(api.clone(), timezone)),
        Arc::new(RestProfileStore::new(api.clone())),
        Arc::new(RestDiaryStore::new(api)),
    );
    Ok(stores)
}

fn offline_stores() -> Stores {
    (
        Arc::new(InMemoryReminderStorage::new()),
        Arc::new(InMemoryProfileStore::default()),
        Arc::new(InMemoryDiaryStore::default()),
    )
}
