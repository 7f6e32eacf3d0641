//! Game Data Enums
//!
//! Platforms, regions and ranked enumerations shared by queries, DTOs and
//! both engines. Tier and division carry fixed ascending ordinal tables so the
//! relational engine can store them as integers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

// == Region ==
/// Riot API region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Region {
    #[serde(rename = "BR")]
    Brazil,
    #[serde(rename = "EUNE")]
    EuropeNorthEast,
    #[serde(rename = "EUW")]
    EuropeWest,
    #[serde(rename = "JP")]
    Japan,
    #[serde(rename = "KR")]
    Korea,
    #[serde(rename = "LAN")]
    LatinAmericaNorth,
    #[serde(rename = "LAS")]
    LatinAmericaSouth,
    #[serde(rename = "NA")]
    NorthAmerica,
    #[serde(rename = "OCE")]
    Oceania,
    #[serde(rename = "TR")]
    Turkey,
    #[serde(rename = "RU")]
    Russia,
    #[serde(rename = "PBE")]
    PublicBetaEnvironment,
}

impl Region {
    pub const ALL: [Region; 12] = [
        Region::Brazil,
        Region::EuropeNorthEast,
        Region::EuropeWest,
        Region::Japan,
        Region::Korea,
        Region::LatinAmericaNorth,
        Region::LatinAmericaSouth,
        Region::NorthAmerica,
        Region::Oceania,
        Region::Turkey,
        Region::Russia,
        Region::PublicBetaEnvironment,
    ];

    /// API code of the region, e.g. `NA`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Brazil => "BR",
            Region::EuropeNorthEast => "EUNE",
            Region::EuropeWest => "EUW",
            Region::Japan => "JP",
            Region::Korea => "KR",
            Region::LatinAmericaNorth => "LAN",
            Region::LatinAmericaSouth => "LAS",
            Region::NorthAmerica => "NA",
            Region::Oceania => "OCE",
            Region::Turkey => "TR",
            Region::Russia => "RU",
            Region::PublicBetaEnvironment => "PBE",
        }
    }

    /// The platform serving this region.
    pub fn platform(&self) -> Platform {
        match self {
            Region::Brazil => Platform::Br1,
            Region::EuropeNorthEast => Platform::Eun1,
            Region::EuropeWest => Platform::Euw1,
            Region::Japan => Platform::Jp1,
            Region::Korea => Platform::Kr,
            Region::LatinAmericaNorth => Platform::La1,
            Region::LatinAmericaSouth => Platform::La2,
            Region::NorthAmerica => Platform::Na1,
            Region::Oceania => Platform::Oc1,
            Region::Turkey => Platform::Tr1,
            Region::Russia => Platform::Ru,
            Region::PublicBetaEnvironment => Platform::Pbe1,
        }
    }

    /// Lower-case slug used by the status endpoint, e.g. `eune`.
    pub fn slug(&self) -> String {
        self.as_str().to_ascii_lowercase()
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Region {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Region::ALL
            .iter()
            .copied()
            .find(|region| region.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| StoreError::validation(format!("unknown region `{}`", s)))
    }
}

// == Platform ==
/// Riot API platform (the routing value used in cache keys).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Platform {
    #[serde(rename = "BR1")]
    Br1,
    #[serde(rename = "EUN1")]
    Eun1,
    #[serde(rename = "EUW1")]
    Euw1,
    #[serde(rename = "JP1")]
    Jp1,
    #[serde(rename = "KR")]
    Kr,
    #[serde(rename = "LA1")]
    La1,
    #[serde(rename = "LA2")]
    La2,
    #[serde(rename = "NA1")]
    Na1,
    #[serde(rename = "OC1")]
    Oc1,
    #[serde(rename = "TR1")]
    Tr1,
    #[serde(rename = "RU")]
    Ru,
    #[serde(rename = "PBE1")]
    Pbe1,
}

impl Platform {
    pub const ALL: [Platform; 12] = [
        Platform::Br1,
        Platform::Eun1,
        Platform::Euw1,
        Platform::Jp1,
        Platform::Kr,
        Platform::La1,
        Platform::La2,
        Platform::Na1,
        Platform::Oc1,
        Platform::Tr1,
        Platform::Ru,
        Platform::Pbe1,
    ];

    /// API code of the platform, e.g. `NA1`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Br1 => "BR1",
            Platform::Eun1 => "EUN1",
            Platform::Euw1 => "EUW1",
            Platform::Jp1 => "JP1",
            Platform::Kr => "KR",
            Platform::La1 => "LA1",
            Platform::La2 => "LA2",
            Platform::Na1 => "NA1",
            Platform::Oc1 => "OC1",
            Platform::Tr1 => "TR1",
            Platform::Ru => "RU",
            Platform::Pbe1 => "PBE1",
        }
    }

    /// The region served by this platform.
    pub fn region(&self) -> Region {
        Region::ALL
            .iter()
            .copied()
            .find(|region| region.platform() == *self)
            .unwrap_or(Region::NorthAmerica)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Platform::ALL
            .iter()
            .copied()
            .find(|platform| platform.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| StoreError::validation(format!("unknown platform `{}`", s)))
    }
}

// == Tier ==
/// Ranked tier, declared in ascending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Tier {
    Unranked,
    Iron,
    Bronze,
    Silver,
    Gold,
    Platinum,
    Emerald,
    Diamond,
    Master,
    Grandmaster,
    Challenger,
}

impl Tier {
    /// Fixed ascending order; the index is the stored ordinal.
    pub const ORDER: [Tier; 11] = [
        Tier::Unranked,
        Tier::Iron,
        Tier::Bronze,
        Tier::Silver,
        Tier::Gold,
        Tier::Platinum,
        Tier::Emerald,
        Tier::Diamond,
        Tier::Master,
        Tier::Grandmaster,
        Tier::Challenger,
    ];

    pub fn ordinal(&self) -> i64 {
        Tier::ORDER.iter().position(|t| t == self).unwrap_or(0) as i64
    }

    pub fn from_ordinal(ordinal: i64) -> Option<Tier> {
        usize::try_from(ordinal)
            .ok()
            .and_then(|index| Tier::ORDER.get(index).copied())
    }
}

// == Division ==
/// Division inside a tier, declared in ascending order (IV is lowest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Division {
    #[serde(rename = "IV")]
    Four,
    #[serde(rename = "III")]
    Three,
    #[serde(rename = "II")]
    Two,
    #[serde(rename = "I")]
    One,
}

impl Division {
    /// Fixed ascending order; the index is the stored ordinal.
    pub const ORDER: [Division; 4] = [Division::Four, Division::Three, Division::Two, Division::One];

    pub fn ordinal(&self) -> i64 {
        Division::ORDER.iter().position(|d| d == self).unwrap_or(0) as i64
    }

    pub fn from_ordinal(ordinal: i64) -> Option<Division> {
        usize::try_from(ordinal)
            .ok()
            .and_then(|index| Division::ORDER.get(index).copied())
    }
}
