//! Summoner DTO.

use serde::{Deserialize, Serialize};

use crate::data::Platform;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummonerDto {
    pub platform: Platform,
    pub id: String,
    pub account_id: String,
    pub puuid: String,
    pub name: String,
    pub summoner_level: i64,
    pub profile_icon_id: i64,
    pub revision_date: i64,
}

impl SummonerDto {
    pub fn normalized_name(&self) -> String {
        normalize_name(&self.name)
    }
}

/// Case- and whitespace-insensitive form of a summoner name, used to match
/// name lookups against stored summoners.
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}
