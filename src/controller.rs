use std::{
    collections::BTreeSet,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Tz;
use tokio::sync::Mutex;

use crate::{
    appsettings::DailyReminderSettings,
    calendar,
    clock::Clock,
    error::ReminderError,
    notification::{Notification, NotificationScheduler},
    reminder::{Reminder, ReminderId, ReminderKind},
    storage::{DiaryStore, NewReminder, ProfileStore, ReminderStore},
    time_resolver,
};

/// Steps of a single reminder flow. Any step may end in `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FlowState {
    #[default]
    Idle,
    Validating,
    Resolving,
    Persisting,
    Scheduling,
    Done,
    Failed(ReminderError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateReminderRequest {
    pub title: String,
    pub day_of_month: u32,
    pub time_of_day: String,
    pub kind: ReminderKind,
    pub duration: Option<String>,
}

impl CreateReminderRequest {
    pub fn new(title: impl Into<String>, day_of_month: u32, time_of_day: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            day_of_month,
            time_of_day: time_of_day.into(),
            kind: ReminderKind::default(),
            duration: None,
        }
    }

    pub fn with_kind(mut self, kind: ReminderKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_duration(mut self, duration: impl Into<String>) -> Self {
        self.duration = Some(duration.into());
        self
    }
}

/// A saved reminder. Warnings are soft failures, e.g. the local alert could not be armed.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateOutcome {
    pub reminder: Reminder,
    pub warnings: Vec<ReminderError>,
}

/// First step of a deletion. Dropping it cancels the deletion.
#[derive(Debug)]
pub struct PendingDeletion {
    id: ReminderId,
    title: String,
}

impl PendingDeletion {
    pub fn id(&self) -> ReminderId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }
}

/// First step of turning the daily reminder off.
#[derive(Debug)]
pub struct PendingDailyDisable {
    _confirmation: (),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RestoreSummary {
    pub one_shots: usize,
    pub daily: bool,
    /// Alerts were not armed because notifications are not allowed on this device.
    pub permission_denied: bool,
}

#[derive(Default)]
struct ControllerState {
    flow: FlowState,
    reminders: Vec<Reminder>,
}

struct DailyFlowGuard<'a>(&'a AtomicBool);

impl Drop for DailyFlowGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct ReminderController {
    store: Arc<dyn ReminderStore>,
    profile: Arc<dyn ProfileStore>,
    diary: Arc<dyn DiaryStore>,
    scheduler: Arc<NotificationScheduler>,
    clock: Arc<dyn Clock>,
    timezone: Tz,
    daily: DailyReminderSettings,
    state: Mutex<ControllerState>,
    daily_flow_pending: AtomicBool,
}

impl ReminderController {
    pub fn new(
        store: Arc<dyn ReminderStore>,
        profile: Arc<dyn ProfileStore>,
        diary: Arc<dyn DiaryStore>,
        scheduler: Arc<NotificationScheduler>,
        clock: Arc<dyn Clock>,
        timezone: Tz,
        daily: DailyReminderSettings,
    ) -> Self {
        Self {
            store,
            profile,
            diary,
            scheduler,
            clock,
            timezone,
            daily,
            state: Mutex::new(ControllerState::default()),
            daily_flow_pending: AtomicBool::new(false),
        }
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub async fn flow_state(&self) -> FlowState {
        self.state.lock().await.flow.clone()
    }

    /// Reminders as of the last refresh, ordered by fire instant.
    pub async fn reminders(&self) -> Vec<Reminder> {
        self.state.lock().await.reminders.clone()
    }

    pub async fn upcoming(&self) -> Vec<Reminder> {
        let now = self.clock.now();
        self.reminders()
            .await
            .into_iter()
            .filter(|reminder| !reminder.completed && reminder.scheduled_at > now)
            .collect()
    }

    pub async fn refresh(&self) -> Result<Vec<Reminder>, ReminderError> {
        let mut reminders = self.store.list().await?;
        reminders.sort_by_key(|reminder| (reminder.scheduled_at, reminder.id));

        self.state.lock().await.reminders = reminders.clone();
        Ok(reminders)
    }

    pub async fn create_reminder(
        &self,
        request: CreateReminderRequest,
    ) -> Result<CreateOutcome, ReminderError> {
        self.set_flow(FlowState::Validating).await;
        let title = self.validate_title(&request.title).await?;

        self.set_flow(FlowState::Resolving).await;
        let now = self.now_local();
        let scheduled_at = match time_resolver::resolve(
            request.day_of_month,
            &request.time_of_day,
            now.naive_local(),
        )
        .and_then(|local| time_resolver::to_local_instant(&self.timezone, local))
        {
            Ok(scheduled_at) => scheduled_at,
            Err(error) => return self.fail(error).await,
        };

        let mut reminder = NewReminder::one_off(title, scheduled_at.fixed_offset(), request.kind);
        reminder.duration = request.duration.filter(|duration| !duration.trim().is_empty());

        self.persist_and_schedule(reminder).await
    }

    /// Shortcut flow: fire `seconds` from now.
    pub async fn create_quick_reminder(
        &self,
        title: &str,
        seconds: u32,
    ) -> Result<CreateOutcome, ReminderError> {
        self.set_flow(FlowState::Validating).await;
        let title = self.validate_title(title).await?;

        self.set_flow(FlowState::Resolving).await;
        let scheduled_at = match time_resolver::resolve_quick(self.now_local(), seconds) {
            Ok(scheduled_at) => scheduled_at,
            Err(error) => return self.fail(error).await,
        };

        let reminder = NewReminder::one_off(title, scheduled_at.fixed_offset(), ReminderKind::default());
        self.persist_and_schedule(reminder).await
    }

    pub async fn request_deletion(&self, id: ReminderId) -> Result<PendingDeletion, ReminderError> {
        let state = self.state.lock().await;
        let reminder = state
            .reminders
            .iter()
            .find(|reminder| reminder.id == id)
            .ok_or(ReminderError::NotFound(id))?;

        Ok(PendingDeletion {
            id,
            title: reminder.title.clone(),
        })
    }

    pub async fn confirm_deletion(&self, pending: PendingDeletion) -> Result<(), ReminderError> {
        let id = pending.id;
        let was_daily = self
            .state
            .lock()
            .await
            .reminders
            .iter()
            .any(|reminder| reminder.id == id && reminder.is_daily_recurring);
        // Removing the daily record turns the daily reminder off.
        let _guard = if was_daily {
            Some(self.begin_daily_flow()?)
        } else {
            None
        };

        self.store.delete(id).await?;
        log::info!("Deleted reminder {id} \"{}\"", pending.title);

        let cancelled = if was_daily {
            self.scheduler.cancel_daily().await
        } else {
            self.scheduler.cancel_reminder(id).await
        };
        if let Err(error) = cancelled {
            log::warn!("Reminder {id} was deleted but its alert could not be retracted: {error}");
        }

        let preference = if was_daily {
            self.profile
                .set_daily_notifications(false)
                .await
                .map_err(ReminderError::from)
        } else {
            Ok(())
        };

        self.refresh_after_change().await;
        preference
    }

    pub async fn daily_reminder_enabled(&self) -> Result<bool, ReminderError> {
        Ok(self.profile.daily_notifications_enabled().await?)
    }

    /// Turns the daily reminder on at `time_of_day`, replacing any previous one.
    pub async fn enable_daily_reminder(
        &self,
        time_of_day: &str,
    ) -> Result<CreateOutcome, ReminderError> {
        let _guard = self.begin_daily_flow()?;

        self.set_flow(FlowState::Validating).await;
        let time = match time_resolver::parse_time_of_day(time_of_day) {
            Ok(time) => time,
            Err(error) => return self.fail(error).await,
        };

        self.set_flow(FlowState::Resolving).await;
        let now = self.now_local();
        let first = time_resolver::next_daily_occurrence(time, now.naive_local());
        let scheduled_at = match time_resolver::to_local_instant(&self.timezone, first) {
            Ok(scheduled_at) => scheduled_at,
            Err(error) => return self.fail(error).await,
        };

        // Older daily records are removed only once the new one exists.
        self.set_flow(FlowState::Persisting).await;
        let reminder = match self
            .store
            .create(NewReminder::daily(&self.daily.title, scheduled_at.fixed_offset()))
            .await
        {
            Ok(reminder) => reminder,
            Err(error) => return self.fail(error.into()).await,
        };

        let mut warnings = Vec::new();
        if let Err(error) = self.delete_daily_records(Some(reminder.id)).await {
            log::warn!("Could not remove the previous daily reminder: {error}");
            warnings.push(error);
        }
        if let Err(error) = self.profile.set_daily_notifications(true).await {
            log::warn!("Could not save the daily reminder preference: {error}");
            warnings.push(error.into());
        }

        self.set_flow(FlowState::Scheduling).await;
        let notification = Notification::new(&self.daily.title, &self.daily.body);
        if let Err(error) = self
            .scheduler
            .schedule_daily(notification, time.hour(), time.minute())
            .await
        {
            log::warn!("Daily reminder saved but its alert could not be armed: {error}");
            warnings.push(error);
        }

        self.set_flow(FlowState::Done).await;
        log::info!("Daily reminder enabled at {}", time.format("%H:%M"));
        self.refresh_after_change().await;

        Ok(CreateOutcome { reminder, warnings })
    }

    pub fn request_disable_daily(&self) -> PendingDailyDisable {
        PendingDailyDisable { _confirmation: () }
    }

    pub async fn confirm_disable_daily(
        &self,
        _pending: PendingDailyDisable,
    ) -> Result<(), ReminderError> {
        let _guard = self.begin_daily_flow()?;

        self.delete_daily_records(None).await?;
        if let Err(error) = self.scheduler.cancel_daily().await {
            log::warn!("Could not cancel daily alerts: {error}");
        }
        self.profile.set_daily_notifications(false).await?;

        log::info!("Daily reminder disabled");
        self.refresh_after_change().await;
        Ok(())
    }

    /// Arms alerts again from the persisted records. Used at startup instead of trusting any
    /// handle from a previous run.
    pub async fn restore_schedules(&self) -> Result<RestoreSummary, ReminderError> {
        let reminders = self.refresh().await?;
        let now = self.clock.now();
        let mut summary = RestoreSummary::default();

        for reminder in reminders
            .iter()
            .filter(|reminder| !reminder.is_daily_recurring && !reminder.completed)
            .filter(|reminder| reminder.scheduled_at > now)
        {
            match self
                .scheduler
                .schedule_once(
                    reminder.id,
                    reminder_notification(reminder),
                    reminder.scheduled_at.with_timezone(&Utc),
                )
                .await
            {
                Ok(_) => summary.one_shots += 1,
                Err(ReminderError::PermissionDenied) => {
                    summary.permission_denied = true;
                    return Ok(summary);
                }
                Err(error) => log::warn!("Could not re-arm reminder {}: {error}", reminder.id),
            }
        }

        let daily_enabled = self.profile.daily_notifications_enabled().await.unwrap_or_else(|error| {
            log::warn!("Could not read the daily reminder preference: {error}");
            false
        });
        let daily = reminders.iter().find(|reminder| reminder.is_daily_recurring);
        if let (true, Some(daily)) = (daily_enabled, daily) {
            let at = daily.scheduled_at_in(&self.timezone);
            let notification = Notification::new(&self.daily.title, &self.daily.body);
            match self
                .scheduler
                .schedule_daily(notification, at.hour(), at.minute())
                .await
            {
                Ok(_) => summary.daily = true,
                Err(ReminderError::PermissionDenied) => summary.permission_denied = true,
                Err(error) => log::warn!("Could not re-arm the daily reminder: {error}"),
            }
        }

        log::info!(
            "Restored {} reminders, daily reminder {}",
            summary.one_shots,
            if summary.daily { "armed" } else { "off" }
        );
        Ok(summary)
    }

    /// Days of the month with a diary entry or a reminder, in the device timezone.
    pub async fn calendar_month(&self, month: u32, year: i32) -> Result<BTreeSet<u32>, ReminderError> {
        let diary_dates = self.diary.entry_dates().await?;
        let reminder_dates: Vec<DateTime<Tz>> = self
            .reminders()
            .await
            .iter()
            .map(|reminder| reminder.scheduled_at_in(&self.timezone))
            .collect();

        Ok(calendar::month_activity(&diary_dates, &reminder_dates, month, year))
    }

    async fn persist_and_schedule(&self, reminder: NewReminder) -> Result<CreateOutcome, ReminderError> {
        self.set_flow(FlowState::Persisting).await;
        let reminder = match self.store.create(reminder).await {
            Ok(reminder) => reminder,
            Err(error) => return self.fail(error.into()).await,
        };
        log::info!("Saved reminder {} \"{}\"", reminder.id, reminder.title);

        self.set_flow(FlowState::Scheduling).await;
        let mut warnings = Vec::new();
        if let Err(error) = self
            .scheduler
            .schedule_once(
                reminder.id,
                reminder_notification(&reminder),
                reminder.scheduled_at.with_timezone(&Utc),
            )
            .await
        {
            log::warn!("Reminder {} saved but its alert could not be armed: {error}", reminder.id);
            warnings.push(error);
        }

        self.set_flow(FlowState::Done).await;
        self.refresh_after_change().await;

        Ok(CreateOutcome { reminder, warnings })
    }

    async fn delete_daily_records(&self, keep: Option<ReminderId>) -> Result<(), ReminderError> {
        let existing = self.store.list().await?;
        for daily in existing
            .iter()
            .filter(|reminder| reminder.is_daily_recurring && Some(reminder.id) != keep)
        {
            self.store.delete(daily.id).await?;
            log::info!("Removed previous daily reminder {}", daily.id);
        }

        Ok(())
    }

    async fn validate_title(&self, title: &str) -> Result<String, ReminderError> {
        let title = title.trim();
        if title.is_empty() {
            return self.fail(ReminderError::EmptyTitle).await;
        }

        Ok(title.to_string())
    }

    fn begin_daily_flow(&self) -> Result<DailyFlowGuard<'_>, ReminderError> {
        self.daily_flow_pending
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| ReminderError::FlowInProgress)?;

        Ok(DailyFlowGuard(&self.daily_flow_pending))
    }

    async fn refresh_after_change(&self) {
        if let Err(error) = self.refresh().await {
            log::warn!("Could not refresh reminders: {error}");
        }
    }

    async fn set_flow(&self, flow: FlowState) {
        log::debug!("Reminder flow -> {flow:?}");
        self.state.lock().await.flow = flow;
    }

    async fn fail<T>(&self, error: ReminderError) -> Result<T, ReminderError> {
        if error.is_recoverable_input() {
            log::info!("Reminder input rejected: {error}");
        } else {
            log::error!("Reminder flow failed: {error}");
        }

        self.set_flow(FlowState::Failed(error.clone())).await;
        Err(error)
    }

    fn now_local(&self) -> DateTime<Tz> {
        self.clock.now().with_timezone(&self.timezone)
    }
}

fn reminder_notification(reminder: &Reminder) -> Notification {
    Notification::new(
        reminder.title.clone(),
        format!("Es hora de: {}", reminder.title),
    )
}
