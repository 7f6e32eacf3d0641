//! Error types for the datastores
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Store Error Enum ==
/// Unified error type for both cache engines.
///
/// `NotFound` is the ordinary cache-miss signal and is never a fault.
/// The `Io`, `Database`, `Encoding` and `Conflict` variants form the
/// storage-fault family (see [`StoreError::is_storage_fault`]).
#[derive(Error, Debug)]
pub enum StoreError {
    /// Nothing usable is cached for the request (absent, expired, empty,
    /// ambiguous or unreadable)
    #[error("Not found: {0}")]
    NotFound(String),

    /// The query is missing a required discriminator or carries a bad one
    #[error("Invalid query: {0}")]
    Validation(String),

    /// File store failure
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Relational store failure
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A value could not be serialized for storage
    #[error("Encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    /// A write conflict that could not be reconciled
    #[error("Storage conflict: {0}")]
    Conflict(String),

    /// Invalid construction parameters
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl StoreError {
    /// Shorthand for a cache miss.
    pub fn not_found(what: impl Into<String>) -> Self {
        StoreError::NotFound(what.into())
    }

    /// Shorthand for a malformed query.
    pub fn validation(what: impl Into<String>) -> Self {
        StoreError::Validation(what.into())
    }

    /// Returns true for the normal cache-miss outcome.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }

    /// Returns true for I/O, database, encoding and conflict failures.
    pub fn is_storage_fault(&self) -> bool {
        matches!(
            self,
            StoreError::Io(_)
                | StoreError::Database(_)
                | StoreError::Encoding(_)
                | StoreError::Conflict(_)
        )
    }
}

// == Result Type Alias ==
/// Convenience Result type for the datastores.
pub type Result<T> = std::result::Result<T, StoreError>;
