//! Match timeline DTOs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::data::Region;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineDto {
    pub region: Region,
    pub match_id: i64,
    pub frame_interval: i64,
    #[serde(default)]
    pub frames: Vec<FrameDto>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameDto {
    pub timestamp: i64,
    /// Keyed by participant id rendered as a string, as the API sends it
    #[serde(default)]
    pub participant_frames: BTreeMap<String, ParticipantFrameDto>,
    #[serde(default)]
    pub events: Vec<EventDto>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionDto {
    pub x: i64,
    pub y: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantFrameDto {
    pub participant_id: i64,
    #[serde(default)]
    pub level: i64,
    #[serde(default)]
    pub current_gold: i64,
    #[serde(default)]
    pub total_gold: i64,
    #[serde(default)]
    pub xp: i64,
    #[serde(default)]
    pub minions_killed: i64,
    #[serde(default)]
    pub jungle_minions_killed: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<PositionDto>,
}

/// A timeline event. Which optional fields are present depends on `event_type`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDto {
    #[serde(rename = "type")]
    pub event_type: String,
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skill_slot: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub killer_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub victim_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assisting_participant_ids: Vec<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<PositionDto>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ward_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level_up_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monster_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monster_sub_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub building_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tower_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lane_type: Option<String>,
}
