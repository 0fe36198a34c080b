use chrono_tz::Tz;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::notification::ChannelSettings;

#[derive(Deserialize, Debug, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct DeviceSettings {
    #[serde(default = "default_timezone")]
    pub timezone: Tz,
    #[serde(default)]
    pub channel: ChannelSettings,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            channel: ChannelSettings::default(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct DailyReminderSettings {
    #[serde(default = "default_daily_title")]
    pub title: String,
    #[serde(default = "default_daily_body")]
    pub body: String,
}

impl Default for DailyReminderSettings {
    fn default() -> Self {
        Self {
            title: default_daily_title(),
            body: default_daily_body(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct AppSettings {
    /// Without a backend the reminders live in memory for the lifetime of the process.
    #[serde(default)]
    pub api: Option<ApiSettings>,
    #[serde(default)]
    pub device: DeviceSettings,
    #[serde(default)]
    pub daily: DailyReminderSettings,
}

impl AppSettings {
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("appsettings").required(true))
            .add_source(File::with_name("appsettings.local").required(false))
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?;

        settings.try_deserialize()
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_timezone() -> Tz {
    Tz::UTC
}

fn default_daily_title() -> String {
    "Daily Registro".to_string()
}

fn default_daily_body() -> String {
    "¿Cómo te sientes hoy? Registra tu emoción del día.".to_string()
}
