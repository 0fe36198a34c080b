use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, SecondsFormat};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::{
    error::StorageError,
    reminder::{Reminder, ReminderId, ReminderKind},
    time_resolver,
};

#[derive(Debug, Clone, PartialEq)]
pub struct NewReminder {
    pub title: String,
    pub scheduled_at: DateTime<FixedOffset>,
    pub kind: ReminderKind,
    pub duration: Option<String>,
    pub is_daily_recurring: bool,
}

impl NewReminder {
    pub fn one_off(title: impl Into<String>, scheduled_at: DateTime<FixedOffset>, kind: ReminderKind) -> Self {
        Self {
            title: title.into(),
            scheduled_at,
            kind,
            duration: None,
            is_daily_recurring: false,
        }
    }

    pub fn daily(title: impl Into<String>, scheduled_at: DateTime<FixedOffset>) -> Self {
        Self {
            title: title.into(),
            scheduled_at,
            kind: ReminderKind::daily(),
            duration: None,
            is_daily_recurring: true,
        }
    }

    pub(crate) fn into_reminder(self, id: ReminderId) -> Reminder {
        Reminder {
            id,
            title: self.title,
            scheduled_at: self.scheduled_at,
            kind: self.kind,
            duration: self.duration,
            completed: false,
            is_daily_recurring: self.is_daily_recurring,
        }
    }
}

/// Reminder as the backend serializes it.
#[derive(Debug, Clone, Deserialize)]
pub struct ReminderRecord {
    pub id: ReminderId,
    pub titulo: String,
    pub fecha_hora: String,
    #[serde(default)]
    pub tipo: Option<String>,
    #[serde(default)]
    pub duracion: Option<String>,
    #[serde(default)]
    pub completado: bool,
}

impl ReminderRecord {
    /// Timestamps without an offset are read as device-local time.
    pub fn into_reminder(self, timezone: &Tz) -> Result<Reminder, StorageError> {
        let scheduled_at = parse_backend_timestamp(&self.fecha_hora, timezone)?;
        let kind = self
            .tipo
            .filter(|tipo| !tipo.is_empty())
            .map(ReminderKind::new)
            .unwrap_or_default();

        Ok(Reminder {
            id: self.id,
            title: self.titulo,
            scheduled_at,
            is_daily_recurring: kind.is_daily(),
            kind,
            duration: self.duracion.filter(|duracion| !duracion.is_empty()),
            completed: self.completado,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewReminderRecord {
    pub titulo: String,
    pub fecha_hora: String,
    pub tipo: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duracion: Option<String>,
}

impl From<&NewReminder> for NewReminderRecord {
    fn from(reminder: &NewReminder) -> Self {
        let tipo = if reminder.is_daily_recurring {
            ReminderKind::DAILY.to_string()
        } else {
            reminder.kind.to_string()
        };

        Self {
            titulo: reminder.title.clone(),
            fecha_hora: reminder
                .scheduled_at
                .to_rfc3339_opts(SecondsFormat::Secs, false),
            tipo,
            duracion: reminder.duration.clone(),
        }
    }
}

/// Diary entry as the backend serializes it. Only the date feeds the calendar.
#[derive(Debug, Clone, Deserialize)]
pub struct DiaryEntryRecord {
    #[serde(default)]
    pub fecha: Option<NaiveDate>,
}

/// Profile as the backend serializes it, reduced to the daily reminder preference.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileRecord {
    #[serde(default)]
    pub notificaciones_diarias: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfilePatch {
    pub notificaciones_diarias: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub id: i64,
}

fn parse_backend_timestamp(value: &str, timezone: &Tz) -> Result<DateTime<FixedOffset>, StorageError> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(value) {
        return Ok(instant);
    }

    let naive = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S"))
        .map_err(|_| StorageError::Malformed(format!("fecha_hora \"{value}\"")))?;

    time_resolver::to_local_instant(timezone, naive)
        .map(|local| local.fixed_offset())
        .map_err(|error| StorageError::Malformed(error.to_string()))
}
