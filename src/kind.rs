//! Entity Kinds
//!
//! The closed set of cacheable response shapes. Each kind selects the key
//! derivation, the expiration policy and the relational mapping.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Every response shape the stores know how to cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    Realms,
    Versions,
    Languages,
    LanguageStrings,
    ProfileIcons,
    ChampionList,
    Champion,
    ItemList,
    Item,
    RuneList,
    Rune,
    SummonerSpellList,
    SummonerSpell,
    MapList,
    Map,
    ChampionRotation,
    ChampionMasteryList,
    ChampionMastery,
    League,
    ChallengerLeague,
    GrandmasterLeague,
    MasterLeague,
    LeaguePositions,
    Match,
    Timeline,
    Summoner,
    ShardStatus,
    CurrentGame,
    FeaturedGames,
    Patches,
}

impl EntityKind {
    pub const ALL: [EntityKind; 30] = [
        EntityKind::Realms,
        EntityKind::Versions,
        EntityKind::Languages,
        EntityKind::LanguageStrings,
        EntityKind::ProfileIcons,
        EntityKind::ChampionList,
        EntityKind::Champion,
        EntityKind::ItemList,
        EntityKind::Item,
        EntityKind::RuneList,
        EntityKind::Rune,
        EntityKind::SummonerSpellList,
        EntityKind::SummonerSpell,
        EntityKind::MapList,
        EntityKind::Map,
        EntityKind::ChampionRotation,
        EntityKind::ChampionMasteryList,
        EntityKind::ChampionMastery,
        EntityKind::League,
        EntityKind::ChallengerLeague,
        EntityKind::GrandmasterLeague,
        EntityKind::MasterLeague,
        EntityKind::LeaguePositions,
        EntityKind::Match,
        EntityKind::Timeline,
        EntityKind::Summoner,
        EntityKind::ShardStatus,
        EntityKind::CurrentGame,
        EntityKind::FeaturedGames,
        EntityKind::Patches,
    ];

    /// Name used as the key prefix and in configuration.
    pub fn name(&self) -> &'static str {
        match self {
            EntityKind::Realms => "Realms",
            EntityKind::Versions => "Versions",
            EntityKind::Languages => "Languages",
            EntityKind::LanguageStrings => "LanguageStrings",
            EntityKind::ProfileIcons => "ProfileIcons",
            EntityKind::ChampionList => "ChampionList",
            EntityKind::Champion => "Champion",
            EntityKind::ItemList => "ItemList",
            EntityKind::Item => "Item",
            EntityKind::RuneList => "RuneList",
            EntityKind::Rune => "Rune",
            EntityKind::SummonerSpellList => "SummonerSpellList",
            EntityKind::SummonerSpell => "SummonerSpell",
            EntityKind::MapList => "MapList",
            EntityKind::Map => "Map",
            EntityKind::ChampionRotation => "ChampionRotation",
            EntityKind::ChampionMasteryList => "ChampionMasteryList",
            EntityKind::ChampionMastery => "ChampionMastery",
            EntityKind::League => "League",
            EntityKind::ChallengerLeague => "ChallengerLeague",
            EntityKind::GrandmasterLeague => "GrandmasterLeague",
            EntityKind::MasterLeague => "MasterLeague",
            EntityKind::LeaguePositions => "LeaguePositions",
            EntityKind::Match => "Match",
            EntityKind::Timeline => "Timeline",
            EntityKind::Summoner => "Summoner",
            EntityKind::ShardStatus => "ShardStatus",
            EntityKind::CurrentGame => "CurrentGame",
            EntityKind::FeaturedGames => "FeaturedGames",
            EntityKind::Patches => "Patches",
        }
    }

    /// For kinds that live inside another kind's value, the owning list kind.
    pub fn parent(&self) -> Option<EntityKind> {
        match self {
            EntityKind::Champion => Some(EntityKind::ChampionList),
            EntityKind::Item => Some(EntityKind::ItemList),
            EntityKind::Rune => Some(EntityKind::RuneList),
            EntityKind::SummonerSpell => Some(EntityKind::SummonerSpellList),
            EntityKind::Map => Some(EntityKind::MapList),
            EntityKind::ChampionMastery => Some(EntityKind::ChampionMasteryList),
            _ => None,
        }
    }

    /// True for the league lists addressed by queue rather than by id.
    pub fn is_apex_league(&self) -> bool {
        matches!(
            self,
            EntityKind::ChallengerLeague | EntityKind::GrandmasterLeague | EntityKind::MasterLeague
        )
    }

    /// True for any kind whose value is a full league list.
    pub fn is_league_list(&self) -> bool {
        *self == EntityKind::League || self.is_apex_league()
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EntityKind {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| StoreError::validation(format!("unknown entity kind `{}`", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_unique_and_parse_back() {
        for kind in EntityKind::ALL {
            assert_eq!(kind.name().parse::<EntityKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_parent_kinds() {
        assert_eq!(EntityKind::Champion.parent(), Some(EntityKind::ChampionList));
        assert_eq!(
            EntityKind::ChampionMastery.parent(),
            Some(EntityKind::ChampionMasteryList)
        );
        assert_eq!(EntityKind::Summoner.parent(), None);
    }

    #[test]
    fn test_league_families() {
        assert!(EntityKind::MasterLeague.is_apex_league());
        assert!(!EntityKind::League.is_apex_league());
        assert!(EntityKind::League.is_league_list());
        assert!(!EntityKind::LeaguePositions.is_league_list());
    }
}
