//! Champion rotation and champion mastery DTOs.

use serde::{Deserialize, Serialize};

use crate::data::Region;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChampionRotationDto {
    pub region: Region,
    #[serde(default)]
    pub free_champion_ids: Vec<i64>,
    #[serde(default)]
    pub free_champion_ids_for_new_players: Vec<i64>,
    pub max_new_player_level: i64,
}

/// One champion mastery record of a summoner.
///
/// `region` is only set when the record travels on its own; inside a
/// [`ChampionMasteryListDto`] the list carries it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChampionMasteryDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<Region>,
    pub summoner_id: String,
    pub champion_id: i64,
    pub champion_level: i64,
    pub champion_points: i64,
    #[serde(default)]
    pub champion_points_until_next_level: i64,
    #[serde(default)]
    pub champion_points_since_last_level: i64,
    #[serde(default)]
    pub last_play_time: i64,
    #[serde(default)]
    pub chest_granted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChampionMasteryListDto {
    pub region: Region,
    pub summoner_id: String,
    #[serde(default)]
    pub masteries: Vec<ChampionMasteryDto>,
}

impl ChampionMasteryListDto {
    /// The mastery record for one champion, stamped with the list's region.
    pub fn find_champion(&self, champion_id: i64) -> Option<ChampionMasteryDto> {
        self.masteries
            .iter()
            .find(|mastery| mastery.champion_id == champion_id)
            .map(|mastery| ChampionMasteryDto {
                region: Some(self.region),
                ..mastery.clone()
            })
    }
}
