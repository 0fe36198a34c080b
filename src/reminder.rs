use std::fmt;

use chrono::{DateTime, FixedOffset, TimeZone};
use serde::{Deserialize, Serialize};

pub type ReminderId = i64;

/// Category tag of a reminder. Free-form on the backend, a few values are well known.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReminderKind(String);

impl ReminderKind {
    pub const MEDITATION: &'static str = "meditacion";
    pub const BREATHING: &'static str = "respiracion";
    pub const SLEEP: &'static str = "sueño";
    pub const DIARY: &'static str = "diario";
    pub const OTHER: &'static str = "otro";
    pub const DAILY: &'static str = "daily";

    pub fn new(kind: impl Into<String>) -> Self {
        Self(kind.into())
    }

    pub fn daily() -> Self {
        Self::new(Self::DAILY)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_daily(&self) -> bool {
        self.0 == Self::DAILY
    }
}

impl Default for ReminderKind {
    fn default() -> Self {
        Self::new(Self::OTHER)
    }
}

impl fmt::Display for ReminderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reminder {
    pub id: ReminderId,
    pub title: String,
    pub scheduled_at: DateTime<FixedOffset>,
    pub kind: ReminderKind,
    pub duration: Option<String>,
    pub completed: bool,
    pub is_daily_recurring: bool,
}

impl Reminder {
    /// Fire instant expressed in the device timezone.
    pub fn scheduled_at_in<Tz: TimeZone>(&self, tz: &Tz) -> DateTime<Tz> {
        self.scheduled_at.with_timezone(tz)
    }
}
