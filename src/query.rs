//! Query Module
//!
//! A query is a map of named discriminators handed over by the dispatcher.
//! Coercion and defaulting of the public API happen upstream; the accessors
//! here only enforce presence and shape, raising `StoreError::Validation`
//! before any storage is touched.

use std::collections::{BTreeMap, BTreeSet};

use crate::data::{Platform, Region};
use crate::error::{Result, StoreError};

/// Default for the `includedData` discriminator of static data lists.
pub const DEFAULT_INCLUDED_DATA: &str = "all";

/// Plural discriminators understood by `get_many`, with their singular form.
const PLURALS: [(&str, &str); 6] = [
    ("ids", "id"),
    ("names", "name"),
    ("accountIds", "accountId"),
    ("puuids", "puuid"),
    ("summoner.ids", "summoner.id"),
    ("champion.ids", "champion.id"),
];

// == Query Value ==
/// One discriminator value.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    Int(i64),
    Str(String),
    Bool(bool),
    Platform(Platform),
    Region(Region),
    /// Unordered multi-valued discriminator (kept sorted)
    Set(BTreeSet<String>),
    /// Plural discriminator expanded by `get_many`
    Many(Vec<QueryValue>),
}

impl QueryValue {
    fn describe(&self) -> &'static str {
        match self {
            QueryValue::Int(_) => "integer",
            QueryValue::Str(_) => "string",
            QueryValue::Bool(_) => "boolean",
            QueryValue::Platform(_) => "platform",
            QueryValue::Region(_) => "region",
            QueryValue::Set(_) => "set",
            QueryValue::Many(_) => "list",
        }
    }
}

impl From<i64> for QueryValue {
    fn from(value: i64) -> Self {
        QueryValue::Int(value)
    }
}

impl From<i32> for QueryValue {
    fn from(value: i32) -> Self {
        QueryValue::Int(i64::from(value))
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::Str(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        QueryValue::Str(value)
    }
}

impl From<bool> for QueryValue {
    fn from(value: bool) -> Self {
        QueryValue::Bool(value)
    }
}

impl From<Platform> for QueryValue {
    fn from(value: Platform) -> Self {
        QueryValue::Platform(value)
    }
}

impl From<Region> for QueryValue {
    fn from(value: Region) -> Self {
        QueryValue::Region(value)
    }
}

impl From<BTreeSet<String>> for QueryValue {
    fn from(value: BTreeSet<String>) -> Self {
        QueryValue::Set(value)
    }
}

// == Query ==
/// Named discriminators for one lookup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    values: BTreeMap<String, QueryValue>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a discriminator, builder style.
    pub fn with(mut self, name: &str, value: impl Into<QueryValue>) -> Self {
        self.values.insert(name.to_string(), value.into());
        self
    }

    /// Adds an unordered multi-valued discriminator.
    pub fn with_set<I, S>(self, name: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: BTreeSet<String> = values.into_iter().map(Into::into).collect();
        self.with(name, QueryValue::Set(set))
    }

    /// Adds a plural discriminator for `get_many`.
    pub fn with_many<I, V>(self, name: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<QueryValue>,
    {
        let many = values.into_iter().map(Into::into).collect();
        self.with(name, QueryValue::Many(many))
    }

    pub fn insert(&mut self, name: &str, value: impl Into<QueryValue>) {
        self.values.insert(name.to_string(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<QueryValue> {
        self.values.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn value(&self, name: &str) -> Option<&QueryValue> {
        self.values.get(name)
    }

    // == Typed Accessors ==

    /// The platform, taken from `platform` or converted from `region`.
    pub fn platform(&self) -> Result<Platform> {
        match self.values.get("platform") {
            Some(QueryValue::Platform(platform)) => return Ok(*platform),
            Some(QueryValue::Str(raw)) => return raw.parse(),
            Some(other) => return Err(wrong_type("platform", other)),
            None => {}
        }
        match self.values.get("region") {
            Some(QueryValue::Region(region)) => Ok(region.platform()),
            Some(QueryValue::Platform(platform)) => Ok(*platform),
            Some(QueryValue::Str(raw)) => Ok(raw.parse::<Region>()?.platform()),
            Some(other) => Err(wrong_type("region", other)),
            None => Err(missing("platform")),
        }
    }

    /// A required string discriminator; integers are rendered as strings.
    pub fn string(&self, name: &str) -> Result<String> {
        self.opt_string(name)?.ok_or_else(|| missing(name))
    }

    pub fn opt_string(&self, name: &str) -> Result<Option<String>> {
        match self.values.get(name) {
            None => Ok(None),
            Some(QueryValue::Str(value)) => Ok(Some(value.clone())),
            Some(QueryValue::Int(value)) => Ok(Some(value.to_string())),
            Some(other) => Err(wrong_type(name, other)),
        }
    }

    /// A required integer discriminator; numeric strings are accepted.
    pub fn int(&self, name: &str) -> Result<i64> {
        self.opt_int(name)?.ok_or_else(|| missing(name))
    }

    pub fn opt_int(&self, name: &str) -> Result<Option<i64>> {
        match self.values.get(name) {
            None => Ok(None),
            Some(QueryValue::Int(value)) => Ok(Some(*value)),
            Some(QueryValue::Str(raw)) => raw.trim().parse().map(Some).map_err(|_| {
                StoreError::validation(format!("discriminator `{}` is not an integer", name))
            }),
            Some(other) => Err(wrong_type(name, other)),
        }
    }

    /// An optional boolean discriminator with a default.
    pub fn bool_or(&self, name: &str, default: bool) -> Result<bool> {
        match self.values.get(name) {
            None => Ok(default),
            Some(QueryValue::Bool(value)) => Ok(*value),
            Some(other) => Err(wrong_type(name, other)),
        }
    }

    /// An unordered set discriminator, or `default` when absent.
    pub fn set_or(&self, name: &str, default: &[&str]) -> Result<BTreeSet<String>> {
        match self.values.get(name) {
            None => Ok(default.iter().map(|s| s.to_string()).collect()),
            Some(QueryValue::Set(values)) => Ok(values.clone()),
            Some(QueryValue::Str(value)) => Ok(BTreeSet::from([value.clone()])),
            Some(QueryValue::Many(values)) => values
                .iter()
                .map(|value| match value {
                    QueryValue::Str(s) => Ok(s.clone()),
                    QueryValue::Int(i) => Ok(i.to_string()),
                    other => Err(wrong_type(name, other)),
                })
                .collect(),
            Some(other) => Err(wrong_type(name, other)),
        }
    }

    // == Plural Expansion ==
    /// Splits a query carrying a plural discriminator into one query per
    /// element. Returns `None` when the query is already singular.
    pub fn expand_many(&self) -> Option<Vec<Query>> {
        let (plural, singular) = PLURALS
            .iter()
            .find(|(plural, _)| self.values.contains_key(*plural))?;

        let elements: Vec<QueryValue> = match self.values.get(*plural)? {
            QueryValue::Many(values) => values.clone(),
            QueryValue::Set(values) => values.iter().cloned().map(QueryValue::Str).collect(),
            single => vec![single.clone()],
        };

        let queries = elements
            .into_iter()
            .map(|element| {
                let mut query = self.clone();
                query.values.remove(*plural);
                query.values.insert(singular.to_string(), element);
                query
            })
            .collect();
        Some(queries)
    }
}

fn missing(name: &str) -> StoreError {
    StoreError::validation(format!("missing discriminator `{}`", name))
}

fn wrong_type(name: &str, value: &QueryValue) -> StoreError {
    StoreError::validation(format!(
        "discriminator `{}` has unexpected {} value",
        name,
        value.describe()
    ))
}
