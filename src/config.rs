//! Runtime settings read from the environment.
//!
//! A `.env` file in the working directory is loaded first if present; real
//! environment variables win over it.
//!
//! | Variable             | Default                      |
//! |----------------------|------------------------------|
//! | `DATABASE_URL`       | `sqlite://social.db?mode=rwc` |
//! | `BIND_ADDR`          | `0.0.0.0:3000`               |
//! | `DB_MAX_CONNECTIONS` | `5`                          |
//! | `LOG_DEBUG`          | `false`                      |

use std::net::SocketAddr;
use std::str::FromStr;

use thiserror::Error;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://social.db?mode=rwc";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub max_connections: u32,
    pub log_debug: bool,
}

impl Settings {
    /// Loads `.env` (if any) and reads settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup, falling back to defaults
    /// for missing keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());
        let bind_addr: SocketAddr = parse_or(&lookup, "BIND_ADDR", DEFAULT_BIND_ADDR.parse().ok())?;
        let max_connections = parse_or(&lookup, "DB_MAX_CONNECTIONS", Some(DEFAULT_MAX_CONNECTIONS))?;
        let log_debug = parse_or(&lookup, "LOG_DEBUG", Some(false))?;

        if max_connections == 0 {
            return Err(ConfigError::Invalid {
                key: "DB_MAX_CONNECTIONS",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            database_url,
            bind_addr,
            max_connections,
            log_debug,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: Option<T>) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    let invalid = |value: String| ConfigError::Invalid { key, value };

    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| invalid(raw)),
        None => default.ok_or_else(|| invalid(String::new())),
    }
}
