//! Background Tasks Module
//!
//! Contains background tasks that run periodically while a store is open.
//!
//! # Tasks
//! - Expiry sweep: evicts stale records from a store at a fixed interval

mod sweeper;

pub use sweeper::spawn_expiry_task;
