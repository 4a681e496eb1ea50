//! uninews-config: TOML configuration for the announcement platform.
//!
//! Everything has a default so the server starts with no config file at
//! all. The platform time zone is a single process-wide setting; the
//! recurrence engine consumes it but never defines it.

use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("unknown time zone: {0}")]
    InvalidTimeZone(String),
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Bearer token for moderator requests (optional; unset disables the
    /// check, e.g. behind a trusted proxy).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            auth_token: None,
        }
    }
}

/// Scheduler driver configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Seconds between scheduler passes over the active reminders.
    #[serde(default = "default_tick_seconds")]
    pub tick_seconds: u64,
}

fn default_tick_seconds() -> u64 {
    60
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_seconds: default_tick_seconds(),
        }
    }
}

/// Top-level uninews configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UniNewsConfig {
    /// HTTP server config.
    #[serde(default)]
    pub server: ServerConfig,
    /// Scheduler driver config.
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// IANA name of the platform time zone all reminder arithmetic runs in.
    #[serde(default = "default_time_zone")]
    pub time_zone: String,
    /// SQLite database path.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

fn default_time_zone() -> String {
    "Europe/Berlin".to_string()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("uninews.db")
}

impl Default for UniNewsConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            scheduler: SchedulerConfig::default(),
            time_zone: default_time_zone(),
            db_path: default_db_path(),
        }
    }
}

impl UniNewsConfig {
    /// Resolve the configured time zone name.
    pub fn time_zone(&self) -> Result<Tz, ConfigError> {
        self.time_zone
            .parse()
            .map_err(|_| ConfigError::InvalidTimeZone(self.time_zone.clone()))
    }
}

/// Load configuration from the default path (`uninews.toml` in the working
/// directory), falling back to defaults when the file does not exist.
pub fn load_config() -> Result<UniNewsConfig, ConfigError> {
    // Load .env if present
    let _ = dotenvy::dotenv();
    load_config_from(Path::new("uninews.toml"))
}

/// Load configuration from a specific path, falling back to defaults when
/// the file does not exist.
pub fn load_config_from(path: &Path) -> Result<UniNewsConfig, ConfigError> {
    if !path.exists() {
        tracing::debug!("Config file not found at {}, using defaults", path.display());
        return Ok(UniNewsConfig::default());
    }
    let content = std::fs::read_to_string(path)?;
    let config: UniNewsConfig = toml::from_str(&content)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = UniNewsConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.scheduler.tick_seconds, 60);
        assert_eq!(config.time_zone, "Europe/Berlin");
        assert!(config.time_zone().is_ok());
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: UniNewsConfig = toml::from_str(
            r#"
            time_zone = "Europe/Vienna"

            [server]
            port = 9000
            auth_token = "secret"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.auth_token.as_deref(), Some("secret"));
        assert_eq!(config.scheduler.tick_seconds, 60);
        assert_eq!(config.time_zone().unwrap(), chrono_tz::Europe::Vienna);
    }

    #[test]
    fn test_unknown_time_zone_is_an_error() {
        let config = UniNewsConfig {
            time_zone: "Mars/Olympus_Mons".into(),
            ..Default::default()
        };
        assert!(matches!(
            config.time_zone(),
            Err(ConfigError::InvalidTimeZone(_))
        ));
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = load_config_from(Path::new("/nonexistent/uninews.toml")).unwrap();
        assert_eq!(config.server.port, 8080);
    }
}
