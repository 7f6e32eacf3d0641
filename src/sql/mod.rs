//! Relational Cache Engine
//!
//! Caching over SQLite. Entities are decomposed into tables linked by
//! cascading foreign keys; every top-level row carries a `last_update`
//! staleness marker, and repeated enumeration strings live in a shared
//! `constant` table.
//!
//! # Components
//! - `ConnectionPool`: bounded set of configured connections
//! - `schema`: table definitions, created idempotently on open
//! - `ConstantCache`: string to id mapping backed by the `constant` table
//! - `SqlStore`: the `DataSource`/`DataSink` implementation
//! - per-entity modules mapping DTOs to and from rows

mod champion;
mod constants;
mod league;
mod matches;
mod pool;
mod rows;
pub mod schema;
mod spectator;
mod status;
mod store;
mod summoner;

pub use constants::ConstantCache;
pub use pool::ConnectionPool;
pub use spectator::FEATURED_REFRESH_INTERVAL;
pub use store::SqlStore;
