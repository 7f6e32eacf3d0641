//! League Cache - caching datastores for League of Legends API responses
//!
//! Two engines sit behind the same [`DataSource`]/[`DataSink`] contract:
//! a disk key-value store with one file per key, and a relational SQLite
//! store that decomposes entities into tables and reconciles league
//! membership across writes. Both evict stale values lazily on read and
//! through a periodic sweeper.

pub mod clock;
pub mod config;
pub mod data;
pub mod datastore;
pub mod disk;
pub mod dto;
pub mod error;
pub mod expiration;
pub mod kind;
pub mod query;
pub mod sql;
pub mod stats;
pub mod tasks;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use config::Config;
pub use data::{Division, Platform, Region, Tier};
pub use datastore::{DataSink, DataSource, DataStore};
pub use disk::DiskStore;
pub use dto::Dto;
pub use error::{Result, StoreError};
pub use expiration::{ExpirationPolicy, Ttl};
pub use kind::EntityKind;
pub use query::{Query, QueryValue};
pub use sql::SqlStore;
pub use stats::StoreStats;
pub use tasks::spawn_expiry_task;
