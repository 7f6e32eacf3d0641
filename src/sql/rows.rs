//! Row Helpers
//!
//! Cardinality rules for fetched rows, staleness markers and timestamp
//! conversion shared by the per-entity mappings.

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{params_from_iter, Connection, OptionalExtension, Row};
use tracing::warn;

use crate::data::{Division, Platform, Tier};
use crate::error::{Result, StoreError};

// == Timestamps ==
pub fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

pub fn from_millis(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis).single().unwrap_or_default()
}

// == Staleness Markers ==
/// The `last_update` observed on one fetched row, with enough of its key to
/// delete exactly that row later.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub table: &'static str,
    pub key: Vec<(&'static str, Value)>,
    pub last_update: i64,
    /// Row revision seen alongside `last_update`, when observed.
    pub revision: Option<i64>,
}

impl Marker {
    pub fn new(table: &'static str, key: Vec<(&'static str, Value)>, last_update: i64) -> Self {
        Self {
            table,
            key,
            last_update,
            revision: None,
        }
    }

    pub fn written_at(&self) -> DateTime<Utc> {
        from_millis(self.last_update)
    }

    fn key_clauses(&self) -> Vec<String> {
        self.key
            .iter()
            .enumerate()
            .map(|(i, (column, _))| format!("{} = ?{}", column, i + 1))
            .collect()
    }

    fn key_values(&self) -> impl Iterator<Item = Value> + '_ {
        self.key.iter().map(|(_, value)| value.clone())
    }

    /// Reads the row's current revision. Must run in the snapshot the
    /// marker was fetched from.
    pub fn observe_revision(&mut self, conn: &Connection) -> Result<()> {
        let sql = format!(
            "SELECT revision FROM \"{}\" WHERE {}",
            self.table,
            self.key_clauses().join(" AND ")
        );
        self.revision = conn
            .query_row(&sql, params_from_iter(self.key_values()), |row| row.get(0))
            .optional()?;
        Ok(())
    }

    /// Deletes the row unless a writer refreshed it since it was read.
    ///
    /// Compares the observed revision when there is one, else `last_update`.
    pub fn delete_if_unchanged(&self, conn: &Connection) -> Result<usize> {
        let (column, fence) = match self.revision {
            Some(revision) => ("revision", revision),
            None => ("last_update", self.last_update),
        };
        let mut clauses = self.key_clauses();
        clauses.push(format!("{} = ?{}", column, self.key.len() + 1));

        let sql = format!(
            "DELETE FROM \"{}\" WHERE {}",
            self.table,
            clauses.join(" AND ")
        );
        let values = self.key_values().chain(std::iter::once(Value::Integer(fence)));
        Ok(conn.execute(&sql, params_from_iter(values))?)
    }
}

/// A value read from the database together with the markers that decide
/// whether it is still fresh.
#[derive(Debug)]
pub struct Fetched<T> {
    pub value: T,
    pub markers: Vec<Marker>,
}

impl<T> Fetched<T> {
    pub fn new(value: T, markers: Vec<Marker>) -> Self {
        Self { value, markers }
    }
}

// == Cardinality ==
/// Exactly-one: zero rows, or more than one, is a miss.
pub fn one<T>(mut rows: Vec<T>, what: &str) -> Result<T> {
    match rows.len() {
        1 => Ok(rows.remove(0)),
        0 => Err(StoreError::not_found(what)),
        n => {
            warn!("{} rows match {}; expected exactly one", n, what);
            Err(StoreError::not_found(what))
        }
    }
}

/// First-match in storage order.
pub fn first<T>(rows: Vec<T>, what: &str) -> Result<T> {
    rows.into_iter()
        .next()
        .ok_or_else(|| StoreError::not_found(what))
}

/// All-matching: only an empty set is a miss.
pub fn all<T>(rows: Vec<T>, what: &str) -> Result<Vec<T>> {
    if rows.is_empty() {
        Err(StoreError::not_found(what))
    } else {
        Ok(rows)
    }
}

pub fn text(value: &str) -> Value {
    Value::Text(value.to_string())
}

// == Column Decoding ==
fn conversion(index: usize, kind: Type, error: StoreError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(index, kind, Box::new(error))
}

pub fn platform_at(row: &Row<'_>, index: usize) -> rusqlite::Result<Platform> {
    let raw: String = row.get(index)?;
    raw.parse().map_err(|e| conversion(index, Type::Text, e))
}

pub fn tier_at(row: &Row<'_>, index: usize) -> rusqlite::Result<Tier> {
    let ordinal: i64 = row.get(index)?;
    Tier::from_ordinal(ordinal).ok_or_else(|| {
        conversion(index, Type::Integer, StoreError::Conflict(format!("bad tier ordinal {}", ordinal)))
    })
}

pub fn division_at(row: &Row<'_>, index: usize) -> rusqlite::Result<Division> {
    let ordinal: i64 = row.get(index)?;
    Division::from_ordinal(ordinal).ok_or_else(|| {
        conversion(index, Type::Integer, StoreError::Conflict(format!("bad division ordinal {}", ordinal)))
    })
}

/// Decodes a JSON text column.
pub fn json_at<T: serde::de::DeserializeOwned>(row: &Row<'_>, index: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(index)?;
    serde_json::from_str(&raw).map_err(|e| conversion(index, Type::Text, e.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cardinality_rules() {
        assert_eq!(one(vec![1], "x").unwrap(), 1);
        assert!(one(Vec::<i32>::new(), "x").unwrap_err().is_not_found());
        assert!(one(vec![1, 2], "x").unwrap_err().is_not_found());

        assert_eq!(first(vec![3, 4], "x").unwrap(), 3);
        assert!(first(Vec::<i32>::new(), "x").unwrap_err().is_not_found());

        assert_eq!(all(vec![1, 2], "x").unwrap(), vec![1, 2]);
        assert!(all(Vec::<i32>::new(), "x").unwrap_err().is_not_found());
    }

    #[test]
    fn test_ordinal_columns() {
        let conn = Connection::open_in_memory().unwrap();
        let (tier, division, platform) = conn
            .query_row("SELECT 10, 3, 'EUW1'", [], |row| {
                Ok((tier_at(row, 0)?, division_at(row, 1)?, platform_at(row, 2)?))
            })
            .unwrap();
        assert_eq!(tier, Tier::Challenger);
        assert_eq!(division, Division::One);
        assert_eq!(platform, Platform::Euw1);

        let bad = conn.query_row("SELECT 11", [], |row| tier_at(row, 0));
        assert!(bad.is_err());
    }

    #[test]
    fn test_millis_round_trip() {
        let at = from_millis(1_500_000_123);
        assert_eq!(to_millis(at), 1_500_000_123);
    }

    #[test]
    fn test_marker_delete_is_conditional() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE t (k TEXT PRIMARY KEY, last_update INTEGER);
             INSERT INTO t VALUES ('a', 10);",
        )
        .unwrap();

        let stale = Marker::new("t", vec![("k", text("a"))], 5);
        assert_eq!(stale.delete_if_unchanged(&conn).unwrap(), 0);

        let current = Marker::new("t", vec![("k", text("a"))], 10);
        assert_eq!(current.delete_if_unchanged(&conn).unwrap(), 1);
    }

    #[test]
    fn test_marker_revision_fences_same_millisecond_refresh() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE t (k TEXT PRIMARY KEY, last_update INTEGER, revision INTEGER);
             INSERT INTO t VALUES ('a', 10, 1);",
        )
        .unwrap();

        let mut marker = Marker::new("t", vec![("k", text("a"))], 10);
        marker.observe_revision(&conn).unwrap();
        assert_eq!(marker.revision, Some(1));

        // Rewritten within the same millisecond.
        conn.execute("UPDATE t SET last_update = 10, revision = 2", []).unwrap();
        assert_eq!(marker.delete_if_unchanged(&conn).unwrap(), 0);

        marker.observe_revision(&conn).unwrap();
        assert_eq!(marker.delete_if_unchanged(&conn).unwrap(), 1);

        marker.observe_revision(&conn).unwrap();
        assert_eq!(marker.revision, None);
    }
}
