//! Runtime configuration loaded from environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::db;
use crate::session::DEFAULT_SESSION_TTL;

const DEFAULT_BIND: &str = "127.0.0.1:3000";
const DEFAULT_POOL_SIZE: u32 = 8;

#[derive(Clone, Debug)]
pub struct Config {
    /// SQLite database file (from PERF_MANAGER_DATABASE)
    pub database_path: PathBuf,
    /// Listen address (from PERF_MANAGER_BIND)
    pub bind: SocketAddr,
    /// Maximum pooled connections (from PERF_MANAGER_POOL_SIZE)
    pub pool_size: u32,
    /// Idle time after which a login expires (from PERF_MANAGER_SESSION_TTL_MINUTES)
    pub session_ttl: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let database_path = match lookup("PERF_MANAGER_DATABASE") {
            Some(path) => PathBuf::from(path),
            None => db::default_database_path()?,
        };

        let bind = lookup("PERF_MANAGER_BIND")
            .unwrap_or_else(|| DEFAULT_BIND.to_string())
            .parse()
            .context("PERF_MANAGER_BIND is not a socket address")?;

        let pool_size = match lookup("PERF_MANAGER_POOL_SIZE") {
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|size| *size > 0)
                .ok_or_else(|| anyhow::anyhow!("PERF_MANAGER_POOL_SIZE must be a positive integer"))?,
            None => DEFAULT_POOL_SIZE,
        };

        let session_ttl = match lookup("PERF_MANAGER_SESSION_TTL_MINUTES") {
            Some(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|minutes| *minutes > 0)
                .map(|minutes| Duration::from_secs(minutes * 60))
                .ok_or_else(|| {
                    anyhow::anyhow!("PERF_MANAGER_SESSION_TTL_MINUTES must be a positive integer")
                })?,
            None => DEFAULT_SESSION_TTL,
        };

        Ok(Self {
            database_path,
            bind,
            pool_size,
            session_ttl,
        })
    }
}
