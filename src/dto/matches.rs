//! Match DTOs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::data::Platform;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchDto {
    pub platform_id: Platform,
    pub game_id: i64,
    pub game_creation: i64,
    pub game_duration: i64,
    pub queue_id: i64,
    pub map_id: i64,
    pub season_id: i64,
    pub game_version: String,
    pub game_mode: String,
    pub game_type: String,
    #[serde(default)]
    pub participants: Vec<ParticipantDto>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantDto {
    pub participant_id: i64,
    pub team_id: i64,
    pub champion_id: i64,
    pub spell1_id: i64,
    pub spell2_id: i64,
    pub stats: ParticipantStatsDto,
    pub timeline: ParticipantTimelineDto,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParticipantStatsDto {
    pub win: bool,
    pub kills: i64,
    pub deaths: i64,
    pub assists: i64,
    pub largest_killing_spree: i64,
    pub gold_earned: i64,
    pub champ_level: i64,
    pub total_damage_dealt: i64,
    pub total_minions_killed: i64,
    pub vision_score: i64,
    pub item0: i64,
    pub item1: i64,
    pub item2: i64,
    pub item3: i64,
    pub item4: i64,
    pub item5: i64,
    pub item6: i64,
}

/// Lane/role plus the per-interval deltas, keyed by delta name
/// (e.g. `creepsPerMinDeltas`) then by interval (e.g. `0-10`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantTimelineDto {
    #[serde(default)]
    pub lane: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub deltas: BTreeMap<String, BTreeMap<String, f64>>,
}
