//! Application settings loaded from `config.toml`.
//!
//! Every section has defaults, so a missing file yields a usable
//! configuration. `DATABASE_URL`, `OWNER_EMAIL` and `OWNER_NAME` from the
//! environment (usually via `.env`) take precedence over file values.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Database connection URL; None falls back to the environment/default
    pub database_url: Option<String>,
    /// Identity of the owner account created on first start
    pub owner: OwnerConfig,
    /// Daily job timing
    pub scheduler: SchedulerConfig,
    /// Uploaded image handling
    pub media: MediaConfig,
}

/// Owner bootstrap identity
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OwnerConfig {
    /// Owner email address
    pub email: String,
    /// Owner display name
    pub name: String,
}

impl Default for OwnerConfig {
    fn default() -> Self {
        Self {
            email: "owner@localhost".to_string(),
            name: "Owner".to_string(),
        }
    }
}

/// Scheduler timing, hours are UTC
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Hour of day the expiration sweep runs
    pub expire_hour: u32,
    /// Hour of day the reminder sweep runs
    pub reminder_hour: u32,
    /// How many days ahead of expiry reminders are sent
    pub reminder_days: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            expire_hour: 0,
            reminder_hour: 10,
            reminder_days: 5,
        }
    }
}

/// Image upload settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Directory processed images are written to
    pub root: PathBuf,
    /// Largest accepted upload in bytes
    pub max_bytes: usize,
    /// Images wider than this are scaled down
    pub max_width: u32,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("public/uploads"),
            max_bytes: 5 * 1024 * 1024,
            max_width: 1200,
        }
    }
}

impl AppConfig {
    /// Applies `DATABASE_URL`, `OWNER_EMAIL` and `OWNER_NAME` overrides.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.database_url = Some(url);
        }
        if let Ok(email) = std::env::var("OWNER_EMAIL") {
            self.owner.email = email;
        }
        if let Ok(name) = std::env::var("OWNER_NAME") {
            self.owner.name = name;
        }
        self
    }

    /// Validates value ranges that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.scheduler.expire_hour > 23 || self.scheduler.reminder_hour > 23 {
            return Err(Error::Config {
                message: "scheduler hours must be between 0 and 23".to_string(),
            });
        }
        if self.scheduler.reminder_days < 1 {
            return Err(Error::Config {
                message: "scheduler.reminder_days must be at least 1".to_string(),
            });
        }
        if self.owner.email.trim().is_empty() {
            return Err(Error::Config {
                message: "owner.email must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Loads the configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads `./config.toml` if present (defaults otherwise), then applies
/// environment overrides and validates.
pub fn load_app_configuration() -> Result<AppConfig> {
    let path = Path::new("config.toml");
    let file_config = if path.exists() {
        tracing::debug!("Loading configuration from {:?}", path);
        load_config(path)?
    } else {
        tracing::info!("No config.toml found, using defaults");
        AppConfig::default()
    };

    let config = file_config.with_env_overrides();
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
            database_url = "sqlite::memory:"

            [owner]
            email = "boss@example.com"
            name = "Boss"

            [scheduler]
            expire_hour = 1
            reminder_hour = 9
            reminder_days = 3

            [media]
            root = "/tmp/uploads"
            max_bytes = 1024
            max_width = 800
        "#;

        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.database_url.as_deref(), Some("sqlite::memory:"));
        assert_eq!(config.owner.email, "boss@example.com");
        assert_eq!(config.scheduler.expire_hour, 1);
        assert_eq!(config.scheduler.reminder_days, 3);
        assert_eq!(config.media.max_width, 800);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: AppConfig = toml::from_str("[owner]\nemail = \"a@b.c\"\n").unwrap();
        assert_eq!(config.owner.name, "Owner");
        assert_eq!(config.scheduler.reminder_hour, 10);
        assert_eq!(config.scheduler.reminder_days, 5);
        assert_eq!(config.media.max_bytes, 5 * 1024 * 1024);
    }

    #[test]
    fn test_validate_rejects_bad_hour() {
        let mut config = AppConfig::default();
        config.scheduler.reminder_hour = 24;
        assert!(matches!(config.validate(), Err(Error::Config { .. })));
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("definitely/not/here.toml");
        assert!(matches!(result, Err(Error::Config { .. })));
    }
}
