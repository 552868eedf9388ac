use std::{env, str::FromStr, time::Duration};

use radiobot_core::{Config, Volume};
use thiserror::Error;

const DEFAULT_DATABASE_URL: &str = "sqlite://radiobot.db";
const DEFAULT_SERVER_PORT: u16 = 9050;

/// Everything the bot reads from the environment
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub node_url: String,
    pub node_password: String,
    pub server_port: u16,
    pub config: Config,
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {reason}")]
    Invalid { name: &'static str, reason: String },
}

impl Settings {
    pub fn from_env() -> Result<Self, SettingsError> {
        let tick_seconds: u64 = optional("RADIOBOT_TICK_SECONDS")?.unwrap_or(10);

        if tick_seconds == 0 {
            return Err(SettingsError::Invalid {
                name: "RADIOBOT_TICK_SECONDS",
                reason: "must be at least 1".to_string(),
            });
        }

        let default_volume: Volume =
            optional("RADIOBOT_DEFAULT_VOLUME")?.unwrap_or_default();

        let config = Config {
            tick_interval: Duration::from_secs(tick_seconds),
            default_volume,
            ..Default::default()
        };

        Ok(Self {
            database_url: optional("RADIOBOT_DATABASE_URL")?
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            node_url: required("RADIOBOT_NODE_URL")?,
            node_password: required("RADIOBOT_NODE_PASSWORD")?,
            server_port: optional("RADIOBOT_SERVER_PORT")?.unwrap_or(DEFAULT_SERVER_PORT),
            config,
        })
    }
}

impl SettingsError {
    pub fn hint(&self) -> String {
        match self {
            SettingsError::Missing(name) => {
                format!("Set {} in the environment and start the bot again.", name)
            }
            SettingsError::Invalid { name, .. } => {
                format!("Fix the value of {} or unset it to use the default.", name)
            }
        }
    }
}

fn required(name: &'static str) -> Result<String, SettingsError> {
    optional(name)?.ok_or(SettingsError::Missing(name))
}

fn optional<T>(name: &'static str) -> Result<Option<T>, SettingsError>
where
    T: FromStr,
    T::Err: ToString,
{
    let Ok(value) = env::var(name) else {
        return Ok(None);
    };

    if value.trim().is_empty() {
        return Ok(None);
    }

    value
        .trim()
        .parse()
        .map(Some)
        .map_err(|e: T::Err| SettingsError::Invalid {
            name,
            reason: e.to_string(),
        })
}
