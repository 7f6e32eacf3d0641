//! DTO Module
//!
//! Explicit structs for every cached response shape, and the [`Dto`] sum type
//! the stores accept and return. Only the fields used for keying, expiry and
//! reconciliation matter to the stores; bodies they never look into are kept
//! as opaque `attributes` objects.

mod champion;
mod league;
mod matches;
mod spectator;
mod staticdata;
mod status;
mod summoner;
mod timeline;

pub use champion::{ChampionMasteryDto, ChampionMasteryListDto, ChampionRotationDto};
pub use league::{
    LeagueEntryDto, LeagueListDto, LeaguePositionDto, LeaguePositionsDto, MiniSeriesDto,
};
pub use matches::{MatchDto, ParticipantDto, ParticipantStatsDto, ParticipantTimelineDto};
pub use spectator::{
    BannedChampionDto, CurrentGameInfoDto, CurrentGameParticipantDto, FeaturedGamesDto,
    ObserverDto,
};
pub use staticdata::{
    LanguageStringsDto, LanguagesDto, ProfileIconDataDto, ProfileIconDetailsDto, RealmDto,
    StaticDataDto, StaticDataListDto, StaticEntryDto, VersionListDto,
};
pub use status::{PatchDto, PatchListDto, ServiceDto, ShardStatusDto};
pub use summoner::{normalize_name, SummonerDto};
pub use timeline::{EventDto, FrameDto, ParticipantFrameDto, PositionDto, TimelineDto};

use serde::{Deserialize, Serialize};

use crate::data::Platform;
use crate::kind::EntityKind;

// == Dto Sum Type ==
/// A cacheable value, tagged with its kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum Dto {
    Realms(RealmDto),
    Versions(VersionListDto),
    Languages(LanguagesDto),
    LanguageStrings(LanguageStringsDto),
    ProfileIcons(ProfileIconDataDto),
    ChampionList(StaticDataListDto),
    Champion(StaticDataDto),
    ItemList(StaticDataListDto),
    Item(StaticDataDto),
    RuneList(StaticDataListDto),
    Rune(StaticDataDto),
    SummonerSpellList(StaticDataListDto),
    SummonerSpell(StaticDataDto),
    MapList(StaticDataListDto),
    Map(StaticDataDto),
    ChampionRotation(ChampionRotationDto),
    ChampionMasteryList(ChampionMasteryListDto),
    ChampionMastery(ChampionMasteryDto),
    League(LeagueListDto),
    ChallengerLeague(LeagueListDto),
    GrandmasterLeague(LeagueListDto),
    MasterLeague(LeagueListDto),
    LeaguePositions(LeaguePositionsDto),
    Match(MatchDto),
    Timeline(TimelineDto),
    Summoner(SummonerDto),
    ShardStatus(ShardStatusDto),
    CurrentGame(CurrentGameInfoDto),
    FeaturedGames(FeaturedGamesDto),
    Patches(PatchListDto),
}

impl Dto {
    pub fn kind(&self) -> EntityKind {
        match self {
            Dto::Realms(_) => EntityKind::Realms,
            Dto::Versions(_) => EntityKind::Versions,
            Dto::Languages(_) => EntityKind::Languages,
            Dto::LanguageStrings(_) => EntityKind::LanguageStrings,
            Dto::ProfileIcons(_) => EntityKind::ProfileIcons,
            Dto::ChampionList(_) => EntityKind::ChampionList,
            Dto::Champion(_) => EntityKind::Champion,
            Dto::ItemList(_) => EntityKind::ItemList,
            Dto::Item(_) => EntityKind::Item,
            Dto::RuneList(_) => EntityKind::RuneList,
            Dto::Rune(_) => EntityKind::Rune,
            Dto::SummonerSpellList(_) => EntityKind::SummonerSpellList,
            Dto::SummonerSpell(_) => EntityKind::SummonerSpell,
            Dto::MapList(_) => EntityKind::MapList,
            Dto::Map(_) => EntityKind::Map,
            Dto::ChampionRotation(_) => EntityKind::ChampionRotation,
            Dto::ChampionMasteryList(_) => EntityKind::ChampionMasteryList,
            Dto::ChampionMastery(_) => EntityKind::ChampionMastery,
            Dto::League(_) => EntityKind::League,
            Dto::ChallengerLeague(_) => EntityKind::ChallengerLeague,
            Dto::GrandmasterLeague(_) => EntityKind::GrandmasterLeague,
            Dto::MasterLeague(_) => EntityKind::MasterLeague,
            Dto::LeaguePositions(_) => EntityKind::LeaguePositions,
            Dto::Match(_) => EntityKind::Match,
            Dto::Timeline(_) => EntityKind::Timeline,
            Dto::Summoner(_) => EntityKind::Summoner,
            Dto::ShardStatus(_) => EntityKind::ShardStatus,
            Dto::CurrentGame(_) => EntityKind::CurrentGame,
            Dto::FeaturedGames(_) => EntityKind::FeaturedGames,
            Dto::Patches(_) => EntityKind::Patches,
        }
    }

    /// The platform the value belongs to, when it carries one.
    pub fn platform(&self) -> Option<Platform> {
        match self {
            Dto::Realms(dto) => Some(dto.region.platform()),
            Dto::Versions(dto) => Some(dto.region.platform()),
            Dto::Languages(dto) => Some(dto.region.platform()),
            Dto::LanguageStrings(dto) => Some(dto.region.platform()),
            Dto::ProfileIcons(dto) => Some(dto.region.platform()),
            Dto::ChampionList(dto)
            | Dto::ItemList(dto)
            | Dto::RuneList(dto)
            | Dto::SummonerSpellList(dto)
            | Dto::MapList(dto) => Some(dto.region.platform()),
            Dto::Champion(dto)
            | Dto::Item(dto)
            | Dto::Rune(dto)
            | Dto::SummonerSpell(dto)
            | Dto::Map(dto) => Some(dto.region.platform()),
            Dto::ChampionRotation(dto) => Some(dto.region.platform()),
            Dto::ChampionMasteryList(dto) => Some(dto.region.platform()),
            Dto::ChampionMastery(dto) => dto.region.map(|region| region.platform()),
            Dto::League(dto)
            | Dto::ChallengerLeague(dto)
            | Dto::GrandmasterLeague(dto)
            | Dto::MasterLeague(dto) => Some(dto.region.platform()),
            Dto::LeaguePositions(dto) => Some(dto.region.platform()),
            Dto::Match(dto) => Some(dto.platform_id),
            Dto::Timeline(dto) => Some(dto.region.platform()),
            Dto::Summoner(dto) => Some(dto.platform),
            Dto::ShardStatus(dto) => Some(dto.region.platform()),
            Dto::CurrentGame(dto) => Some(dto.platform_id),
            Dto::FeaturedGames(dto) => Some(dto.region.platform()),
            Dto::Patches(_) => None,
        }
    }

    /// Wraps a list entry as the single-entry kind that lives in `list_kind`.
    pub(crate) fn static_entry(list_kind: EntityKind, dto: StaticDataDto) -> Option<Dto> {
        match list_kind {
            EntityKind::ChampionList => Some(Dto::Champion(dto)),
            EntityKind::ItemList => Some(Dto::Item(dto)),
            EntityKind::RuneList => Some(Dto::Rune(dto)),
            EntityKind::SummonerSpellList => Some(Dto::SummonerSpell(dto)),
            EntityKind::MapList => Some(Dto::Map(dto)),
            _ => None,
        }
    }

    /// Borrows the list body of any static data list variant.
    pub(crate) fn as_static_list(&self) -> Option<&StaticDataListDto> {
        match self {
            Dto::ChampionList(dto)
            | Dto::ItemList(dto)
            | Dto::RuneList(dto)
            | Dto::SummonerSpellList(dto)
            | Dto::MapList(dto) => Some(dto),
            _ => None,
        }
    }

    /// Borrows the league body of any league list variant.
    pub(crate) fn as_league_list(&self) -> Option<&LeagueListDto> {
        match self {
            Dto::League(dto)
            | Dto::ChallengerLeague(dto)
            | Dto::GrandmasterLeague(dto)
            | Dto::MasterLeague(dto) => Some(dto),
            _ => None,
        }
    }

    /// Wraps a league body as the variant for `kind`.
    pub(crate) fn league_list(kind: EntityKind, dto: LeagueListDto) -> Option<Dto> {
        match kind {
            EntityKind::League => Some(Dto::League(dto)),
            EntityKind::ChallengerLeague => Some(Dto::ChallengerLeague(dto)),
            EntityKind::GrandmasterLeague => Some(Dto::GrandmasterLeague(dto)),
            EntityKind::MasterLeague => Some(Dto::MasterLeague(dto)),
            _ => None,
        }
    }
}
