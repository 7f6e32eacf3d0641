//! Shared Constant Table
//!
//! Low-cardinality strings (queue names, game modes, event types, ...) are
//! stored once in the `constant` table and referenced by surrogate id. The
//! value/id mapping is memoized per store.

use std::collections::HashMap;

use parking_lot::RwLock;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::warn;

use crate::error::{Result, StoreError};

#[derive(Debug, Default)]
pub struct ConstantCache {
    by_value: RwLock<HashMap<String, i64>>,
    by_id: RwLock<HashMap<i64, String>>,
}

impl ConstantCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id for `value`, creating the row if needed, and memoizes
    /// it.
    ///
    /// Call this outside of any open transaction: a cached id must belong to
    /// a committed row. Inside a write transaction use [`ConstantCache::id_for`].
    pub fn resolve(&self, conn: &Connection, value: &str) -> Result<i64> {
        if let Some(id) = self.by_value.read().get(value) {
            return Ok(*id);
        }
        let id = insert_or_get(conn, value)?;
        self.remember(id, value);
        Ok(id)
    }

    /// Returns the id for `value` from within a write transaction.
    ///
    /// A row created here is not memoized, since the transaction may still
    /// roll back.
    pub fn id_for(&self, conn: &Connection, value: &str) -> Result<i64> {
        if let Some(id) = self.by_value.read().get(value) {
            return Ok(*id);
        }
        insert_or_get(conn, value)
    }

    pub fn id_for_opt(&self, conn: &Connection, value: Option<&str>) -> Result<Option<i64>> {
        value.map(|value| self.id_for(conn, value)).transpose()
    }

    /// Returns the id of `value` without creating it.
    pub fn lookup(&self, conn: &Connection, value: &str) -> Result<Option<i64>> {
        if let Some(id) = self.by_value.read().get(value) {
            return Ok(Some(*id));
        }
        let id: Option<i64> = conn
            .query_row(
                "SELECT id FROM constant WHERE value = ?1",
                params![value],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(id) = id {
            self.remember(id, value);
        }
        Ok(id)
    }

    /// Returns the string behind a stored id.
    pub fn value_of(&self, conn: &Connection, id: i64) -> Result<String> {
        if let Some(value) = self.by_id.read().get(&id) {
            return Ok(value.clone());
        }
        let value: Option<String> = conn
            .query_row("SELECT value FROM constant WHERE id = ?1", params![id], |row| {
                row.get(0)
            })
            .optional()?;
        match value {
            Some(value) => {
                self.remember(id, &value);
                Ok(value)
            }
            None => Err(StoreError::Conflict(format!("dangling constant id {}", id))),
        }
    }

    pub fn value_of_opt(&self, conn: &Connection, id: Option<i64>) -> Result<Option<String>> {
        id.map(|id| self.value_of(conn, id)).transpose()
    }

    pub fn len(&self) -> usize {
        self.by_value.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forgets every memoized constant.
    pub fn reset(&self) {
        self.by_value.write().clear();
        self.by_id.write().clear();
    }

    fn remember(&self, id: i64, value: &str) {
        self.by_value.write().insert(value.to_string(), id);
        self.by_id.write().insert(id, value.to_string());
    }
}

/// Inserts `value` unless present and returns its row id.
fn insert_or_get(conn: &Connection, value: &str) -> Result<i64> {
    // A concurrent writer may insert the same value between our insert and
    // select; the second attempt then reads its row.
    for attempt in 0..2 {
        conn.execute(
            "INSERT INTO constant (value) VALUES (?1) ON CONFLICT (value) DO NOTHING",
            params![value],
        )?;
        let id: Option<i64> = conn
            .query_row(
                "SELECT id FROM constant WHERE value = ?1",
                params![value],
                |row| row.get(0),
            )
            .optional()?;
        match id {
            Some(id) => return Ok(id),
            None => warn!("Constant {:?} vanished after insert (attempt {})", value, attempt + 1),
        }
    }
    Err(StoreError::Conflict(format!("could not resolve constant {:?}", value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::schema;

    fn connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        schema::create(&conn).unwrap();
        conn
    }

    #[test]
    fn test_resolve_is_stable() {
        let conn = connection();
        let cache = ConstantCache::new();
        let a = cache.resolve(&conn, "RANKED_SOLO_5x5").unwrap();
        let b = cache.resolve(&conn, "RANKED_FLEX_SR").unwrap();
        assert_ne!(a, b);
        assert_eq!(cache.resolve(&conn, "RANKED_SOLO_5x5").unwrap(), a);
        assert_eq!(cache.value_of(&conn, b).unwrap(), "RANKED_FLEX_SR");
    }

    #[test]
    fn test_separate_caches_share_rows() {
        let conn = connection();
        let first = ConstantCache::new();
        let second = ConstantCache::new();
        let id = first.resolve(&conn, "CLASSIC").unwrap();
        assert_eq!(second.lookup(&conn, "CLASSIC").unwrap(), Some(id));
        assert_eq!(second.resolve(&conn, "CLASSIC").unwrap(), id);

        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM constant", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn test_lookup_does_not_create() {
        let conn = connection();
        let cache = ConstantCache::new();
        assert_eq!(cache.lookup(&conn, "ARAM").unwrap(), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_reset_reloads_from_table() {
        let conn = connection();
        let cache = ConstantCache::new();
        let id = cache.resolve(&conn, "MATCHED_GAME").unwrap();
        cache.reset();
        assert!(cache.is_empty());
        assert_eq!(cache.value_of(&conn, id).unwrap(), "MATCHED_GAME");
    }

    #[test]
    fn test_dangling_id_is_conflict() {
        let conn = connection();
        let cache = ConstantCache::new();
        assert!(matches!(cache.value_of(&conn, 99), Err(StoreError::Conflict(_))));
    }

    #[test]
    fn test_rolled_back_constant_is_not_memoized() {
        let mut conn = connection();
        let cache = ConstantCache::new();
        {
            let tx = conn.transaction().unwrap();
            let id = cache.id_for(&tx, "ONEFORALL").unwrap();
            assert_eq!(cache.id_for(&tx, "ONEFORALL").unwrap(), id);
            tx.rollback().unwrap();
        }
        assert!(cache.is_empty());
        assert_eq!(cache.lookup(&conn, "ONEFORALL").unwrap(), None);
    }

    #[test]
    fn test_id_for_uses_committed_memo() {
        let conn = connection();
        let cache = ConstantCache::new();
        let id = cache.resolve(&conn, "URF").unwrap();
        assert_eq!(cache.id_for(&conn, "URF").unwrap(), id);
        assert_eq!(cache.len(), 1);
    }
}
