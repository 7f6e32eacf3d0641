//! Connection Pool
//!
//! A fixed set of SQLite connections, each behind its own mutex. Callers take
//! whichever connection is free, or wait on one picked round-robin.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};
use rusqlite::Connection;
use tracing::debug;

use crate::error::{Result, StoreError};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);
const IN_MEMORY: &str = ":memory:";

pub struct ConnectionPool {
    location: PathBuf,
    connections: Vec<Mutex<Connection>>,
    next: AtomicUsize,
}

impl std::fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("location", &self.location)
            .field("size", &self.connections.len())
            .finish()
    }
}

impl ConnectionPool {
    /// Opens `size` connections to the database at `location`.
    ///
    /// `:memory:` databases are private to one connection, so they always get
    /// a pool of one.
    pub fn open(location: impl AsRef<Path>, size: usize) -> Result<Self> {
        let location = location.as_ref().to_path_buf();
        if size == 0 {
            return Err(StoreError::Configuration(
                "connection pool size must be at least 1".to_string(),
            ));
        }

        let in_memory = location.as_os_str() == IN_MEMORY;
        let size = if in_memory { 1 } else { size };
        if !in_memory {
            if let Some(parent) = location.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StoreError::Configuration(format!(
                        "cannot create database directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let connections = (0..size)
            .map(|_| open_connection(&location, in_memory).map(Mutex::new))
            .collect::<Result<Vec<_>>>()?;
        debug!("Opened {} connections to {}", size, location.display());

        Ok(Self {
            location,
            connections,
            next: AtomicUsize::new(0),
        })
    }

    pub fn size(&self) -> usize {
        self.connections.len()
    }

    /// Borrows a connection, blocking until one is available.
    pub fn get(&self) -> MutexGuard<'_, Connection> {
        for connection in &self.connections {
            if let Some(guard) = connection.try_lock() {
                return guard;
            }
        }
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.connections.len();
        self.connections[index].lock()
    }
}

fn open_connection(location: &Path, in_memory: bool) -> Result<Connection> {
    let conn = Connection::open(location).map_err(|e| {
        StoreError::Configuration(format!("cannot open database {}: {}", location.display(), e))
    })?;
    if !in_memory {
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
    }
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_pool_has_one_connection() {
        let pool = ConnectionPool::open(":memory:", 8).unwrap();
        assert_eq!(pool.size(), 1);
    }

    #[test]
    fn test_zero_size_is_configuration_error() {
        assert!(matches!(
            ConnectionPool::open(":memory:", 0),
            Err(StoreError::Configuration(_))
        ));
    }

    #[test]
    fn test_file_pool_shares_database() {
        let dir = TempDir::new().unwrap();
        let pool = ConnectionPool::open(dir.path().join("nested/cache.db"), 3).unwrap();
        assert_eq!(pool.size(), 3);

        let first = pool.get();
        first.execute_batch("CREATE TABLE t (x INTEGER); INSERT INTO t VALUES (7);").unwrap();
        let second = pool.get();
        let x: i64 = second.query_row("SELECT x FROM t", [], |row| row.get(0)).unwrap();
        assert_eq!(x, 7);
    }

    #[test]
    fn test_foreign_keys_enabled() {
        let pool = ConnectionPool::open(":memory:", 1).unwrap();
        let on: i64 = pool
            .get()
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(on, 1);
    }
}
