//! Application-level configuration loading: queue policy, registration command and timers.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "MAFIA_LOBBY_CONFIG_PATH";

const DEFAULT_REGISTRATION_COMMAND: &str = "!reg";
const DEFAULT_LOG_RETENTION: usize = 50;
const DEFAULT_DELIVERY_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_RECONNECT_DELAY_MS: u64 = 5_000;
const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Admission cap applied to every queue entry path; `None` means uncapped.
    pub queue_capacity: Option<usize>,
    /// Chat command that asks for a queue slot (compared trimmed, ignoring case).
    pub registration_command: String,
    /// Registration logs kept before the oldest are discarded.
    pub registration_log_retention: usize,
    /// Upper bound for one private message send.
    pub delivery_timeout: Duration,
    /// Fixed pause between chat reconnection attempts.
    pub reconnect_delay: Duration,
    /// Consecutive failed chat connections tolerated before the listener gives up.
    pub max_reconnect_attempts: u32,
    /// Channel to listen to when none was stored yet.
    pub default_chat_channel: Option<String>,
}

impl AppConfig {
    /// Load the configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(config) => {
                    info!(
                        path = %path.display(),
                        queue_capacity = ?config.queue_capacity,
                        command = %config.registration_command,
                        "loaded configuration"
                    );
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Parse a JSON document; missing keys keep their defaults.
    pub fn from_json(contents: &str) -> serde_json::Result<Self> {
        serde_json::from_str::<RawConfig>(contents).map(Into::into)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        RawConfig::default().into()
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    queue_capacity: Option<usize>,
    registration_command: String,
    registration_log_retention: usize,
    delivery_timeout_ms: u64,
    reconnect_delay_ms: u64,
    max_reconnect_attempts: u32,
    default_chat_channel: Option<String>,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            queue_capacity: None,
            registration_command: DEFAULT_REGISTRATION_COMMAND.into(),
            registration_log_retention: DEFAULT_LOG_RETENTION,
            delivery_timeout_ms: DEFAULT_DELIVERY_TIMEOUT_MS,
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY_MS,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            default_chat_channel: None,
        }
    }
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let command = value.registration_command.trim();
        Self {
            queue_capacity: value.queue_capacity,
            registration_command: if command.is_empty() {
                DEFAULT_REGISTRATION_COMMAND.into()
            } else {
                command.to_lowercase()
            },
            registration_log_retention: value.registration_log_retention.max(1),
            delivery_timeout: Duration::from_millis(value.delivery_timeout_ms.max(1)),
            reconnect_delay: Duration::from_millis(value.reconnect_delay_ms),
            max_reconnect_attempts: value.max_reconnect_attempts.max(1),
            default_chat_channel: value
                .default_chat_channel
                .map(|channel| channel.trim().to_owned())
                .filter(|channel| !channel.is_empty()),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = AppConfig::from_json("{}").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.queue_capacity, None);
        assert_eq!(config.registration_command, "!reg");
        assert_eq!(config.registration_log_retention, 50);
        assert_eq!(config.reconnect_delay, Duration::from_secs(5));
        assert_eq!(config.max_reconnect_attempts, 10);
    }

    #[test]
    fn values_are_normalised() {
        let config = AppConfig::from_json(
            r#"{
                "queue_capacity": 8,
                "registration_command": "  !JOIN ",
                "registration_log_retention": 0,
                "delivery_timeout_ms": 2500,
                "default_chat_channel": "   "
            }"#,
        )
        .unwrap();

        assert_eq!(config.queue_capacity, Some(8));
        assert_eq!(config.registration_command, "!join");
        assert_eq!(config.registration_log_retention, 1);
        assert_eq!(config.delivery_timeout, Duration::from_millis(2500));
        assert_eq!(config.default_chat_channel, None);
    }

    #[test]
    fn malformed_document_is_an_error() {
        assert!(AppConfig::from_json(r#"{"queue_capacity": "eight"}"#).is_err());
    }
}
