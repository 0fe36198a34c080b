mod http;
mod model;
mod reminder_storage;
mod rest;

pub use http::ApiClient;
pub use model::{AuthResponse, NewReminder};
pub use reminder_storage::{
    DiaryStore, InMemoryDiaryStore, InMemoryProfileStore, InMemoryReminderStorage, ProfileStore,
    ReminderStore,
};
pub use rest::{RestDiaryStore, RestProfileStore, RestReminderStore};
