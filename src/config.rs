//! Configuration Module
//!
//! Handles loading store configuration from environment variables.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use crate::error::Result;
use crate::expiration::{parse_overrides, Ttl};
use crate::kind::EntityKind;

/// Store configuration parameters.
///
/// Numeric values fall back to their defaults when unset or malformed. The
/// expiration override map is validated strictly.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root directory of the disk store
    pub disk_path: PathBuf,
    /// SQLite database file; the relational store is disabled when unset
    pub database: Option<PathBuf>,
    /// Connections held by the relational store
    pub pool_size: usize,
    /// Background expiry sweep interval in seconds
    pub sweep_interval: u64,
    /// Per-kind ttl overrides applied to both stores
    pub expirations: HashMap<EntityKind, Ttl>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `LEAGUE_CACHE_DISK_PATH` - Disk store root (default: `<tmp>/league_cache_store`)
    /// - `LEAGUE_CACHE_DATABASE` - SQLite database file (default: unset)
    /// - `LEAGUE_CACHE_POOL_SIZE` - Relational pool size (default: 10)
    /// - `LEAGUE_CACHE_SWEEP_INTERVAL` - Sweep frequency in seconds (default: 300)
    /// - `LEAGUE_CACHE_EXPIRATIONS` - `Kind=seconds,...` override map (default: empty)
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            disk_path: env::var("LEAGUE_CACHE_DISK_PATH")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.disk_path),
            database: env::var("LEAGUE_CACHE_DATABASE")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            pool_size: env::var("LEAGUE_CACHE_POOL_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|size| *size >= 1)
                .unwrap_or(defaults.pool_size),
            sweep_interval: env::var("LEAGUE_CACHE_SWEEP_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|secs| *secs >= 1)
                .unwrap_or(defaults.sweep_interval),
            expirations: match env::var("LEAGUE_CACHE_EXPIRATIONS") {
                Ok(raw) => parse_overrides(&raw)?,
                Err(_) => HashMap::new(),
            },
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            disk_path: env::temp_dir().join("league_cache_store"),
            database: None,
            pool_size: 10,
            sweep_interval: 300,
            expirations: HashMap::new(),
        }
    }
}
