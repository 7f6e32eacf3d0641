//! Datastore Contract
//!
//! The two traits the pipeline dispatcher drives: a [`DataSource`] answers
//! `get`/`get_many`, a [`DataSink`] accepts `put`/`put_many` plus the
//! administrative `clear` and `expire`. Both engines implement both.

use tracing::debug;

use crate::dto::Dto;
use crate::error::{Result, StoreError};
use crate::kind::EntityKind;
use crate::query::Query;

/// Read side of a datastore.
pub trait DataSource: Send + Sync {
    /// Whether this source handles `kind` at all.
    fn supports(&self, kind: EntityKind) -> bool;

    /// Looks up a single value. A miss is `StoreError::NotFound`.
    fn get(&self, kind: EntityKind, query: &Query) -> Result<Dto>;

    /// Looks up several values.
    ///
    /// The default expands a plural discriminator (`ids`, `names`, ...) into
    /// singular lookups and keeps the hits; an empty result is NotFound.
    fn get_many(&self, kind: EntityKind, query: &Query) -> Result<Vec<Dto>> {
        expand_and_collect(self, kind, query)
    }
}

/// Runs one `get` per element of a plural discriminator, keeping the hits.
pub(crate) fn expand_and_collect<S>(source: &S, kind: EntityKind, query: &Query) -> Result<Vec<Dto>>
where
    S: DataSource + ?Sized,
{
    let queries = match query.expand_many() {
        Some(queries) => queries,
        None => return Ok(vec![source.get(kind, query)?]),
    };

    let mut found = Vec::with_capacity(queries.len());
    for single in &queries {
        match source.get(kind, single) {
            Ok(value) => found.push(value),
            Err(StoreError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }
    }

    if found.is_empty() {
        return Err(StoreError::not_found(format!("no {} matched", kind)));
    }
    debug!("{}: {} of {} values found", kind, found.len(), queries.len());
    Ok(found)
}

/// Write side of a datastore.
pub trait DataSink: Send + Sync {
    /// Stores a value of `kind`. Never-cache kinds are silently dropped.
    fn put(&self, kind: EntityKind, value: &Dto) -> Result<()>;

    fn put_many(&self, kind: EntityKind, values: &[Dto]) -> Result<()> {
        for value in values {
            self.put(kind, value)?;
        }
        Ok(())
    }

    /// Removes every stored value, or only those of one kind. Returns the
    /// number of records removed.
    fn clear(&self, kind: Option<EntityKind>) -> Result<usize>;

    /// Removes stale values, for every kind or only one. Returns the number
    /// of records evicted.
    fn expire(&self, kind: Option<EntityKind>) -> Result<usize>;
}

/// A full cache tier.
pub trait DataStore: DataSource + DataSink {}

impl<T: DataSource + DataSink> DataStore for T {}

/// Rejects a put whose value does not match the declared kind.
pub(crate) fn ensure_kind(kind: EntityKind, value: &Dto) -> Result<()> {
    if value.kind() == kind {
        Ok(())
    } else {
        Err(StoreError::validation(format!(
            "value of kind {} handed to a {} put",
            value.kind(),
            kind
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Region;
    use crate::dto::LanguagesDto;

    /// A source holding one value per `id`.
    struct Fixed;

    impl DataSource for Fixed {
        fn supports(&self, kind: EntityKind) -> bool {
            kind == EntityKind::Languages
        }

        fn get(&self, _kind: EntityKind, query: &Query) -> Result<Dto> {
            match query.int("id")? {
                1 | 2 => Ok(Dto::Languages(LanguagesDto {
                    region: Region::NorthAmerica,
                    languages: vec![query.int("id")?.to_string()],
                })),
                other => Err(StoreError::not_found(other.to_string())),
            }
        }
    }

    #[test]
    fn test_get_many_keeps_hits() {
        let query = Query::new().with_many("ids", [1, 3, 2]);
        let found = Fixed.get_many(EntityKind::Languages, &query).unwrap();
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn test_get_many_empty_is_not_found() {
        let query = Query::new().with_many("ids", [5, 6]);
        let err = Fixed.get_many(EntityKind::Languages, &query).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_get_many_singular_query() {
        let query = Query::new().with("id", 1);
        assert_eq!(Fixed.get_many(EntityKind::Languages, &query).unwrap().len(), 1);
    }

    #[test]
    fn test_ensure_kind() {
        let value = Dto::Languages(LanguagesDto {
            region: Region::NorthAmerica,
            languages: vec![],
        });
        assert!(ensure_kind(EntityKind::Languages, &value).is_ok());
        assert!(matches!(
            ensure_kind(EntityKind::Versions, &value),
            Err(StoreError::Validation(_))
        ));
    }
}
