use std::{env, fmt::Display, str::FromStr};

use crate::{
    cryptography::generate_secret,
    error::{Error, HtmlError},
};

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub database_max_connections: u32,
    pub redis_url: Option<String>,
    pub session_secret: String,
    pub session_hours: i64,
}

impl Config {
    /// Reads the process environment.
    pub fn load() -> Result<Self, Error> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let database_url = lookup("DATABASE_URL").ok_or_else(|| {
            log::error!("DATABASE_URL not set");
            HtmlError::InternalServerError.new("DATABASE_URL is required")
        })?;

        let session_secret = lookup("SESSION_SECRET")
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| {
                log::warn!("SESSION_SECRET not set, sessions will not survive a restart");
                generate_secret(64)
            });

        let redis_url = lookup("REDIS_URL").filter(|s| !s.is_empty());
        if redis_url.is_none() {
            log::info!("REDIS_URL not set, recipe caching disabled");
        }

        Ok(Self {
            port: try_load(&lookup, "PORT", 5000)?,
            database_url,
            database_max_connections: try_load(&lookup, "DATABASE_MAX_CONNECTIONS", 5)?,
            redis_url,
            session_secret,
            session_hours: try_load(&lookup, "SESSION_HOURS", 1)?,
        })
    }
}

fn try_load<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, Error>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match lookup(key) {
        Some(value) => value.trim().parse().map_err(|e| {
            log::warn!("Invalid {key} value: {e}");
            HtmlError::InternalServerError.new(&format!("Invalid {key}"))
        }),
        None => {
            log::info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}
