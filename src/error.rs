use thiserror::Error;

use crate::reminder::ReminderId;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReminderError {
    #[error("Invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    #[error("Reminder title must not be empty")]
    EmptyTitle,

    #[error("{}", past_time_message(.suggestion))]
    PastTime { suggestion: Option<String> },

    #[error("Could not save reminder: {0}")]
    Persist(String),

    #[error("Could not arm local notification: {0}")]
    Scheduling(String),

    #[error("Notification permission was not granted")]
    PermissionDenied,

    #[error("Another reminder flow is still running")]
    FlowInProgress,

    #[error("Reminder {0} does not exist")]
    NotFound(ReminderId),
}

impl ReminderError {
    pub fn invalid_input(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field,
            reason: reason.into(),
        }
    }

    /// Errors the user can fix by changing the input and trying again.
    pub fn is_recoverable_input(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput { .. } | Self::EmptyTitle | Self::PastTime { .. }
        )
    }
}

fn past_time_message(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(time) => format!("That time has already passed. Did you mean {time}?"),
        None => "That time has already passed".to_string(),
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("Backend responded with {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Authentication token was rejected")]
    Unauthorized,

    #[error("Record {0} does not exist")]
    NotFound(ReminderId),

    #[error("Malformed backend payload: {0}")]
    Malformed(String),
}

impl From<StorageError> for ReminderError {
    fn from(error: StorageError) -> Self {
        ReminderError::Persist(error.to_string())
    }
}
