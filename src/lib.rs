//! Stage timing and classification for rally events.

use std::io;

use tracing_subscriber::EnvFilter;

pub mod chunk;
pub mod classification;
pub mod config;
pub mod error;
pub mod models;
pub mod penalty;
pub mod service;
pub mod store;
pub mod timing;
pub mod validator;

#[cfg(test)]
mod testing;

pub use crate::config::Config;
pub use crate::error::{Result, TimingError};
pub use crate::service::{ClassificationScope, TimingService};
pub use crate::store::{create_db, empty_db, establish_connection};

/// Logs to stderr, filtered by `RUST_LOG` or `default_level` when it is unset.
pub fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

/// Postgres-backed service configured from `config`.
pub fn connect_service(config: &Config) -> Result<TimingService<store::PgStore>> {
    let store = store::PgStore::connect(config)?;
    Ok(TimingService::from_config(store, config))
}
