//! League DTOs: full league lists and a summoner's positions across leagues.

use serde::{Deserialize, Serialize};

use crate::data::{Division, Region, Tier};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MiniSeriesDto {
    pub target: i64,
    pub wins: i64,
    pub losses: i64,
    pub progress: String,
}

/// One standing inside a league, identified by `player_or_team_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeagueEntryDto {
    pub player_or_team_id: String,
    pub player_or_team_name: String,
    pub league_points: i64,
    pub rank: Division,
    pub wins: i64,
    pub losses: i64,
    #[serde(default)]
    pub veteran: bool,
    #[serde(default)]
    pub inactive: bool,
    #[serde(default)]
    pub fresh_blood: bool,
    #[serde(default)]
    pub hot_streak: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mini_series: Option<MiniSeriesDto>,
}

/// A whole league (also used for the challenger, grandmaster and master lists).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeagueListDto {
    pub region: Region,
    pub league_id: String,
    pub name: String,
    pub tier: Tier,
    pub queue: String,
    #[serde(default)]
    pub entries: Vec<LeagueEntryDto>,
}

/// A standing seen from the summoner's side, carrying its league's context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaguePositionDto {
    pub league_id: String,
    pub league_name: String,
    pub tier: Tier,
    pub queue_type: String,
    #[serde(flatten)]
    pub entry: LeagueEntryDto,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaguePositionsDto {
    pub region: Region,
    pub summoner_id: String,
    #[serde(default)]
    pub positions: Vec<LeaguePositionDto>,
}
