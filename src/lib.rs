pub mod appsettings;
pub mod calendar;
pub mod clock;
pub mod console;
pub mod controller;
pub mod error;
pub mod notification;
pub mod reminder;
pub mod storage;
pub mod time_resolver;

#[cfg(test)]
mod test_utils;
