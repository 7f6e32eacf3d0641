//! Shard status and patch list DTOs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::data::Region;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDto {
    pub name: String,
    pub slug: String,
    pub status: String,
    /// Incident bodies are not interpreted by the stores
    #[serde(default)]
    pub incidents: Vec<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShardStatusDto {
    pub region: Region,
    pub name: String,
    pub slug: String,
    pub hostname: String,
    #[serde(default)]
    pub locales: Vec<String>,
    #[serde(default)]
    pub services: Vec<ServiceDto>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchDto {
    pub name: String,
    pub season: i64,
    pub start: i64,
}

/// Known patches plus the per-region start time shifts.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchListDto {
    #[serde(default)]
    pub patches: Vec<PatchDto>,
    #[serde(default)]
    pub shifts: BTreeMap<String, i64>,
}
