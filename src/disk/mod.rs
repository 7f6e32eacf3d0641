//! Disk Cache Engine
//!
//! Key-value caching over a flat directory of per-key files.
//!
//! # Components
//! - `FileStore`: atomic insert-if-absent and conditional removal of files
//! - `StoredRecord`: the persisted (payload, ttl, written at, generation) tuple
//! - `keys`: key derivation from queries and from values
//! - `DiskStore`: the `DataSource`/`DataSink` implementation

mod file_store;
pub mod keys;
mod record;
mod store;


pub use file_store::FileStore;
pub use record::{RecordHeader, StoredRecord};
pub use store::DiskStore;
