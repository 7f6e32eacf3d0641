//! Stored Record Module
//!
//! The tuple persisted under each disk key: payload, ttl, write time and a
//! generation stamp that tells two writes of the same key apart.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dto::Dto;
use crate::error::Result;
use crate::expiration::Ttl;

// == Stored Record ==
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub generation: Uuid,
    /// `-1` forever, otherwise seconds
    pub ttl_seconds: i64,
    pub written_at: DateTime<Utc>,
    pub payload: Dto,
}

impl StoredRecord {
    pub fn new(payload: Dto, ttl: Ttl, written_at: DateTime<Utc>) -> Self {
        Self {
            generation: Uuid::new_v4(),
            ttl_seconds: ttl.as_seconds(),
            written_at,
            payload,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn header(&self) -> RecordHeader {
        RecordHeader {
            generation: self.generation,
            ttl_seconds: self.ttl_seconds,
            written_at: self.written_at,
        }
    }
}

// == Record Header ==
/// The expiry-relevant part of a record, readable without decoding the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RecordHeader {
    pub generation: Uuid,
    pub ttl_seconds: i64,
    pub written_at: DateTime<Utc>,
}

impl RecordHeader {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn ttl(&self) -> Ttl {
        match self.ttl_seconds {
            s if s < 0 => Ttl::Forever,
            0 => Ttl::Never,
            s => Ttl::seconds(s),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.ttl().is_expired(self.written_at, now)
    }
}
