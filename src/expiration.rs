//! Expiration Policy Module
//!
//! Maps each entity kind to a time-to-live. Each engine carries its own
//! default table; an override map, when given, takes precedence per kind and
//! kinds it does not mention fall back to the engine default.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::error::{Result, StoreError};
use crate::kind::EntityKind;

// == Ttl ==
/// How long a value of some kind stays fresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    /// Never persisted; writes are no-ops
    Never,
    /// Fresh for this long after it was written
    For(Duration),
    /// Never expires
    Forever,
}

impl Ttl {
    pub fn seconds(seconds: i64) -> Self {
        Ttl::For(Duration::seconds(seconds))
    }

    /// Parses the configuration form: `-1` is forever, `0` is never cache.
    pub fn from_seconds(seconds: i64) -> Result<Self> {
        match seconds {
            -1 => Ok(Ttl::Forever),
            0 => Ok(Ttl::Never),
            s if s > 0 => Ok(Ttl::seconds(s)),
            s => Err(StoreError::Configuration(format!(
                "invalid expiration of {} seconds (use -1 for forever, 0 for never)",
                s
            ))),
        }
    }

    /// Inverse of [`Ttl::from_seconds`]; this is what the disk records store.
    pub fn as_seconds(&self) -> i64 {
        match self {
            Ttl::Never => 0,
            Ttl::Forever => -1,
            Ttl::For(duration) => duration.num_seconds(),
        }
    }

    pub fn is_never(&self) -> bool {
        matches!(self, Ttl::Never)
    }

    /// The first instant at which a value written at `written_at` is stale.
    pub fn expires_at(&self, written_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Ttl::For(duration) => written_at.checked_add_signed(*duration),
            Ttl::Never | Ttl::Forever => None,
        }
    }

    /// Boundary condition: stale once `now >= written_at + ttl`.
    pub fn is_expired(&self, written_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match self.expires_at(written_at) {
            Some(expires_at) => now >= expires_at,
            None => false,
        }
    }

    /// Rows written at or before this instant are stale.
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Ttl::For(duration) => now.checked_sub_signed(*duration),
            Ttl::Never | Ttl::Forever => None,
        }
    }
}

// == Expiration Policy ==
#[derive(Debug, Clone)]
pub struct ExpirationPolicy {
    defaults: HashMap<EntityKind, Ttl>,
    aliases: HashMap<EntityKind, EntityKind>,
    overrides: HashMap<EntityKind, Ttl>,
}

impl ExpirationPolicy {
    /// Built-in table of the disk store.
    pub fn disk_defaults() -> Self {
        let six_hours = Ttl::seconds(6 * 60 * 60);
        let one_day = Ttl::seconds(24 * 60 * 60);

        let defaults = EntityKind::ALL
            .iter()
            .map(|kind| {
                let ttl = match kind {
                    EntityKind::Realms | EntityKind::Versions => six_hours,
                    EntityKind::Languages
                    | EntityKind::LanguageStrings
                    | EntityKind::ProfileIcons
                    | EntityKind::ChampionList
                    | EntityKind::Champion
                    | EntityKind::ItemList
                    | EntityKind::Item
                    | EntityKind::RuneList
                    | EntityKind::Rune
                    | EntityKind::SummonerSpellList
                    | EntityKind::SummonerSpell
                    | EntityKind::MapList
                    | EntityKind::Map => Ttl::Forever,
                    EntityKind::ChampionRotation => one_day,
                    EntityKind::ChampionMasteryList | EntityKind::ChampionMastery => {
                        Ttl::seconds(7 * 24 * 60 * 60)
                    }
                    EntityKind::League
                    | EntityKind::ChallengerLeague
                    | EntityKind::GrandmasterLeague
                    | EntityKind::MasterLeague
                    | EntityKind::LeaguePositions => six_hours,
                    EntityKind::Match | EntityKind::Timeline => Ttl::Forever,
                    EntityKind::Summoner => one_day,
                    EntityKind::ShardStatus => Ttl::seconds(60 * 60),
                    EntityKind::CurrentGame | EntityKind::FeaturedGames => Ttl::seconds(30 * 60),
                    EntityKind::Patches => one_day,
                };
                (*kind, ttl)
            })
            .collect();

        Self {
            defaults,
            aliases: HashMap::new(),
            overrides: HashMap::new(),
        }
    }

    /// Built-in table of the relational store. Kinds that share a table share
    /// a policy through aliases; kinds with no table are never cached.
    pub fn sql_defaults() -> Self {
        let defaults = HashMap::from([
            (EntityKind::ChampionRotation, Ttl::seconds(24 * 60 * 60)),
            (EntityKind::ChampionMastery, Ttl::seconds(7 * 24 * 60 * 60)),
            (EntityKind::Match, Ttl::Forever),
            (EntityKind::Timeline, Ttl::Forever),
            (EntityKind::Summoner, Ttl::seconds(24 * 60 * 60)),
            (EntityKind::CurrentGame, Ttl::seconds(30 * 60)),
            (EntityKind::League, Ttl::seconds(6 * 60 * 60)),
            (EntityKind::LeaguePositions, Ttl::seconds(6 * 60 * 60)),
            (EntityKind::ShardStatus, Ttl::seconds(60 * 60)),
        ]);
        let aliases = HashMap::from([
            (EntityKind::FeaturedGames, EntityKind::CurrentGame),
            (EntityKind::ChallengerLeague, EntityKind::League),
            (EntityKind::GrandmasterLeague, EntityKind::League),
            (EntityKind::MasterLeague, EntityKind::League),
            (EntityKind::ChampionMasteryList, EntityKind::ChampionMastery),
        ]);

        Self {
            defaults,
            aliases,
            overrides: HashMap::new(),
        }
    }

    /// Installs an override map. A kind it does not mention keeps its default.
    pub fn with_overrides(mut self, overrides: HashMap<EntityKind, Ttl>) -> Self {
        self.overrides = overrides;
        self
    }

    /// Resolves the TTL for a kind; unknown kinds are never cached.
    pub fn ttl(&self, kind: EntityKind) -> Ttl {
        let alias = self.aliases.get(&kind);
        self.overrides
            .get(&kind)
            .or_else(|| alias.and_then(|a| self.overrides.get(a)))
            .or_else(|| self.defaults.get(&kind))
            .or_else(|| alias.and_then(|a| self.defaults.get(a)))
            .copied()
            .unwrap_or(Ttl::Never)
    }
}

/// Parses an override map of the form `Kind=seconds,Kind=seconds`.
///
/// Unknown kinds and invalid TTLs are configuration errors.
pub fn parse_overrides(raw: &str) -> Result<HashMap<EntityKind, Ttl>> {
    let mut overrides = HashMap::new();
    for pair in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (name, seconds) = pair.split_once('=').ok_or_else(|| {
            StoreError::Configuration(format!("expected `Kind=seconds`, got `{}`", pair))
        })?;
        let kind: EntityKind = name
            .trim()
            .parse()
            .map_err(|_| StoreError::Configuration(format!("unknown entity kind `{}`", name.trim())))?;
        let seconds: i64 = seconds.trim().parse().map_err(|_| {
            StoreError::Configuration(format!("invalid expiration `{}` for {}", seconds.trim(), kind))
        })?;
        overrides.insert(kind, Ttl::from_seconds(seconds)?);
    }
    Ok(overrides)
}
