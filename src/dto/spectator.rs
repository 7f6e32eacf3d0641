//! Spectator DTOs: live games and the featured games list.

use serde::{Deserialize, Serialize};

use crate::data::{Platform, Region};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObserverDto {
    pub encryption_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentGameParticipantDto {
    pub team_id: i64,
    pub spell1_id: i64,
    pub spell2_id: i64,
    pub champion_id: i64,
    pub profile_icon_id: i64,
    pub summoner_name: String,
    #[serde(default)]
    pub bot: bool,
    pub summoner_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BannedChampionDto {
    pub pick_turn: i64,
    pub team_id: i64,
    pub champion_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentGameInfoDto {
    pub platform_id: Platform,
    pub game_id: i64,
    pub game_start_time: i64,
    pub game_mode: String,
    pub map_id: i64,
    pub game_type: String,
    pub game_queue_config_id: i64,
    pub game_length: i64,
    pub observers: ObserverDto,
    #[serde(default)]
    pub participants: Vec<CurrentGameParticipantDto>,
    #[serde(default)]
    pub banned_champions: Vec<BannedChampionDto>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeaturedGamesDto {
    pub region: Region,
    pub client_refresh_interval: i64,
    #[serde(default)]
    pub game_list: Vec<CurrentGameInfoDto>,
}
