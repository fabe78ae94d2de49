//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use chrono::Duration;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::Level;

const MAX_SESSION_DAYS: i64 = 3650;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Admin login supplied by the environment. Only the argon2 hash is held.
#[derive(Clone, Debug)]
pub struct AdminAccount {
    pub username: String,
    pub password_hash: String,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    /// Directory of the file blob store; `None` keeps everything in memory.
    pub data_dir: Option<PathBuf>,
    pub admin: Option<AdminAccount>,
    pub allowed_origin: String,
    pub session_max_age_days: i64,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from any variable source.
    pub fn from_lookup<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Server Settings ---
        let bind_address_str = var("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let log_level_str = var("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let allowed_origin =
            var("ALLOWED_ORIGIN").unwrap_or_else(|| "http://localhost:3000".to_string());

        let session_max_age_days = match var("SESSION_MAX_AGE_DAYS") {
            Some(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|days| (1..=MAX_SESSION_DAYS).contains(days))
                .ok_or_else(|| {
                    ConfigError::InvalidValue(
                        "SESSION_MAX_AGE_DAYS".to_string(),
                        format!("'{}' is not a number of days between 1 and {}", raw, MAX_SESSION_DAYS),
                    )
                })?,
            None => 30,
        };

        // --- Storage Settings ---
        let data_dir = var("DATA_DIR")
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from);

        // --- Admin Credentials (both or neither) ---
        let admin = match (var("ADMIN_USERNAME"), var("ADMIN_PASSWORD_HASH")) {
            (Some(username), Some(password_hash)) => {
                if !password_hash.starts_with("$argon2") {
                    return Err(ConfigError::InvalidValue(
                        "ADMIN_PASSWORD_HASH".to_string(),
                        "expected an argon2 PHC string".to_string(),
                    ));
                }
                Some(AdminAccount {
                    username,
                    password_hash,
                })
            }
            (Some(_), None) => return Err(ConfigError::MissingVar("ADMIN_PASSWORD_HASH".to_string())),
            (None, Some(_)) => return Err(ConfigError::MissingVar("ADMIN_USERNAME".to_string())),
            (None, None) => None,
        };

        Ok(Self {
            bind_address,
            log_level,
            data_dir,
            admin,
            allowed_origin,
            session_max_age_days,
        })
    }

    /// How long a sign-in stays valid.
    pub fn session_max_age(&self) -> Duration {
        Duration::days(self.session_max_age_days)
    }
}
