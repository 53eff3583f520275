use std::{env, fmt::Display, str::FromStr};

use chrono::Duration;
use dotenv::dotenv;
use tracing::info;

use crate::chunk::DEFAULT_CHUNK_SIZE;
use crate::error::{Result, TimingError};

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8088";
pub const DEFAULT_HORIZON_DAYS: i64 = 365;
pub const DEFAULT_POOL_SIZE: u32 = 10;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: Option<String>,
    pub bind_addr: String,
    pub chunk_size: usize,
    pub timestamp_horizon: Duration,
    pub pool_size: u32,
}

impl Config {
    /// Reads the process environment, after loading `.env` if there is one.
    pub fn load() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let chunk_size: usize = try_load(&lookup, "CHUNK_SIZE", DEFAULT_CHUNK_SIZE)?;
        if chunk_size == 0 {
            return Err(TimingError::Config("CHUNK_SIZE must be at least 1".into()));
        }
        let horizon_days: i64 = try_load(&lookup, "TIMESTAMP_HORIZON_DAYS", DEFAULT_HORIZON_DAYS)?;
        let timestamp_horizon = Duration::try_days(horizon_days)
            .filter(|horizon| *horizon > Duration::zero())
            .ok_or_else(|| {
                TimingError::Config(format!("TIMESTAMP_HORIZON_DAYS out of range: {horizon_days}"))
            })?;

        Ok(Config {
            database_url: lookup("DATABASE_URL"),
            bind_addr: try_load(&lookup, "BIND_ADDR", DEFAULT_BIND_ADDR.to_string())?,
            chunk_size,
            timestamp_horizon,
            pool_size: try_load(&lookup, "POOL_SIZE", DEFAULT_POOL_SIZE)?,
        })
    }

    pub fn database_url(&self) -> Result<&str> {
        self.database_url
            .as_deref()
            .ok_or_else(|| TimingError::Config("DATABASE_URL is not set".into()))
    }
}

fn try_load<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Display,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| TimingError::Config(format!("invalid {key} value {raw:?}: {e}"))),
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}
