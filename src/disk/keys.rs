//! Disk Key Derivation
//!
//! Keys are `{Kind}.{discriminator}...` with a fixed discriminator order per
//! kind. The same order is used when deriving a key from a query (read side)
//! and from a value (write side). Each component is escaped so that a key is
//! always a single safe file name and `.` only ever separates components.

use std::collections::BTreeSet;

use crate::data::Platform;
use crate::dto::{normalize_name, Dto, StaticDataDto, StaticDataListDto, SummonerDto};
use crate::error::{Result, StoreError};
use crate::kind::EntityKind;
use crate::query::{Query, DEFAULT_INCLUDED_DATA};

/// Length of the id fragments embedded in summoner keys.
pub const ID_FRAGMENT_LEN: usize = 16;

// == Escaping ==
/// Percent-encodes everything outside `[A-Za-z0-9_-]`.
pub fn escape(component: &str) -> String {
    let mut escaped = String::with_capacity(component.len());
    for byte in component.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-' {
            escaped.push(byte as char);
        } else {
            escaped.push_str(&format!("%{:02X}", byte));
        }
    }
    escaped
}

/// Canonical form of an unordered set: escaped members, sorted, joined by `+`.
pub fn set_component(values: &BTreeSet<String>) -> String {
    let mut members: Vec<String> = values.iter().map(|v| escape(v)).collect();
    members.sort();
    members.join("+")
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Joins a kind and its already-rendered discriminators into a key.
fn compose(kind: EntityKind, components: &[String]) -> String {
    let mut key = kind.name().to_string();
    for component in components {
        key.push('.');
        key.push_str(&escape(component));
    }
    key
}

/// Like [`compose`], for components that are already escaped.
fn compose_raw(kind: EntityKind, components: &[String]) -> String {
    let mut key = kind.name().to_string();
    for component in components {
        key.push('.');
        key.push_str(component);
    }
    key
}

/// Key prefix shared by every record of `kind`.
pub fn kind_prefix(kind: EntityKind) -> String {
    format!("{}.", kind.name())
}

/// True when `key` belongs to `kind`.
pub fn belongs_to(key: &str, kind: EntityKind) -> bool {
    key == kind.name() || key.starts_with(&kind_prefix(kind))
}

// == Summoner Keys ==
/// An escaped id cut down to its key fragment.
pub fn id_fragment(id: &str) -> String {
    escape(id).chars().take(ID_FRAGMENT_LEN).collect()
}

/// Hex of the normalized name; names are not safe to embed as-is.
pub fn name_token(name: &str) -> String {
    hex(normalize_name(name).as_bytes())
}

pub fn summoner_key(summoner: &SummonerDto) -> String {
    compose_raw(
        EntityKind::Summoner,
        &[
            escape(summoner.platform.as_str()),
            id_fragment(&summoner.id),
            id_fragment(&summoner.account_id),
            id_fragment(&summoner.puuid),
            name_token(&summoner.name),
        ],
    )
}

/// Which summoner field a lookup is keyed on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummonerField {
    Id(String),
    AccountId(String),
    Puuid(String),
    Name(String),
}

impl SummonerField {
    /// Picks the lookup field from a query, preferring the stable ids.
    pub fn from_query(query: &Query) -> Result<Self> {
        if let Some(id) = query.opt_string("id")? {
            return Ok(SummonerField::Id(id));
        }
        if let Some(puuid) = query.opt_string("puuid")? {
            return Ok(SummonerField::Puuid(puuid));
        }
        if let Some(account_id) = query.opt_string("accountId")? {
            return Ok(SummonerField::AccountId(account_id));
        }
        if let Some(name) = query.opt_string("name")? {
            return Ok(SummonerField::Name(name));
        }
        Err(StoreError::validation(
            "summoner lookup needs one of `id`, `puuid`, `accountId` or `name`",
        ))
    }

    /// Whether the components of a summoner key could belong to a match.
    ///
    /// `components` excludes the kind and platform.
    pub fn key_may_match(&self, components: &[&str]) -> bool {
        if components.len() != 4 {
            return false;
        }
        match self {
            SummonerField::Id(id) => components[0] == id_fragment(id),
            SummonerField::AccountId(account_id) => components[1] == id_fragment(account_id),
            SummonerField::Puuid(puuid) => components[2] == id_fragment(puuid),
            SummonerField::Name(name) => components[3] == name_token(name),
        }
    }

    /// Exact comparison against a decoded summoner.
    pub fn matches(&self, summoner: &SummonerDto) -> bool {
        match self {
            SummonerField::Id(id) => &summoner.id == id,
            SummonerField::AccountId(account_id) => &summoner.account_id == account_id,
            SummonerField::Puuid(puuid) => &summoner.puuid == puuid,
            SummonerField::Name(name) => summoner.normalized_name() == normalize_name(name),
        }
    }
}

/// Prefix of every summoner key on a platform.
pub fn summoner_prefix(platform: Platform) -> String {
    format!("{}{}.", kind_prefix(EntityKind::Summoner), escape(platform.as_str()))
}

// == Query Side ==
fn static_list_components(kind: EntityKind, query: &Query) -> Result<Vec<String>> {
    let included = query.set_or("includedData", &[DEFAULT_INCLUDED_DATA])?;
    let mut components = vec![
        escape(query.platform()?.as_str()),
        escape(&query.string("version")?),
        escape(&query.string("locale")?),
        set_component(&included),
    ];
    if kind == EntityKind::ChampionList {
        components.push(query.bool_or("dataById", true)?.to_string());
    }
    Ok(components)
}

/// Key for a single static entry by numeric id, in the context of its list.
fn static_entry_components(query: &Query, id: i64) -> Result<Vec<String>> {
    let included = query.set_or("includedData", &[DEFAULT_INCLUDED_DATA])?;
    Ok(vec![
        escape(query.platform()?.as_str()),
        escape(&query.string("version")?),
        escape(&query.string("locale")?),
        set_component(&included),
        escape(&id.to_string()),
    ])
}

/// Derives the key a query reads from.
///
/// Summoners are resolved by scanning rather than by a single key, so they
/// are rejected here. Single static entries and masteries only have a direct
/// key when the query names them by id.
pub fn query_key(kind: EntityKind, query: &Query) -> Result<String> {
    let key = match kind {
        EntityKind::Realms
        | EntityKind::Versions
        | EntityKind::Languages
        | EntityKind::ChampionRotation
        | EntityKind::ShardStatus
        | EntityKind::FeaturedGames => compose(kind, &[query.platform()?.as_str().to_string()]),
        EntityKind::ChampionList
        | EntityKind::ItemList
        | EntityKind::RuneList
        | EntityKind::SummonerSpellList => compose_raw(kind, &static_list_components(kind, query)?),
        EntityKind::MapList | EntityKind::ProfileIcons | EntityKind::LanguageStrings => compose(
            kind,
            &[
                query.platform()?.as_str().to_string(),
                query.string("version")?,
                query.string("locale")?,
            ],
        ),
        EntityKind::Champion
        | EntityKind::Item
        | EntityKind::Rune
        | EntityKind::SummonerSpell
        | EntityKind::Map => compose_raw(kind, &static_entry_components(query, query.int("id")?)?),
        EntityKind::ChampionMasteryList | EntityKind::LeaguePositions | EntityKind::CurrentGame => {
            compose(
                kind,
                &[
                    query.platform()?.as_str().to_string(),
                    query.string("summoner.id")?,
                ],
            )
        }
        EntityKind::ChampionMastery => compose(
            kind,
            &[
                query.platform()?.as_str().to_string(),
                query.string("summoner.id")?,
                query.int("champion.id")?.to_string(),
            ],
        ),
        EntityKind::League | EntityKind::Match | EntityKind::Timeline => compose(
            kind,
            &[query.platform()?.as_str().to_string(), query.string("id")?],
        ),
        EntityKind::ChallengerLeague | EntityKind::GrandmasterLeague | EntityKind::MasterLeague => {
            compose(
                kind,
                &[query.platform()?.as_str().to_string(), query.string("queue")?],
            )
        }
        EntityKind::Patches => compose(kind, &[]),
        EntityKind::Summoner => {
            return Err(StoreError::validation(
                "summoners are looked up by scan, not by key",
            ))
        }
    };
    Ok(key)
}

// == Value Side ==
fn static_list_key(kind: EntityKind, list: &StaticDataListDto) -> String {
    let mut components = vec![
        escape(list.region.platform().as_str()),
        escape(&list.version),
        escape(&list.locale),
    ];
    match kind {
        EntityKind::MapList => {}
        _ => components.push(set_component(&effective_included(&list.included_data))),
    }
    if kind == EntityKind::ChampionList {
        components.push(list.data_by_id.unwrap_or(true).to_string());
    }
    compose_raw(kind, &components)
}

fn static_entry_key(kind: EntityKind, entry: &StaticDataDto) -> Option<String> {
    let id = entry.entry.id?;
    Some(compose_raw(
        kind,
        &[
            escape(entry.region.platform().as_str()),
            escape(&entry.version),
            escape(&entry.locale),
            set_component(&effective_included(&entry.included_data)),
            escape(&id.to_string()),
        ],
    ))
}

/// An empty included-data set means the default.
fn effective_included(included: &BTreeSet<String>) -> BTreeSet<String> {
    if included.is_empty() {
        BTreeSet::from([DEFAULT_INCLUDED_DATA.to_string()])
    } else {
        included.clone()
    }
}

/// Derives every key a value is stored under.
///
/// Most values have exactly one key. A live game is stored once per
/// participant, since it is looked up by summoner. A single static entry
/// without a numeric id has no key and yields an empty list.
pub fn value_keys(value: &Dto) -> Vec<String> {
    let kind = value.kind();
    match value {
        Dto::Realms(dto) => vec![compose(kind, &[dto.region.platform().as_str().to_string()])],
        Dto::Versions(dto) => vec![compose(kind, &[dto.region.platform().as_str().to_string()])],
        Dto::Languages(dto) => vec![compose(kind, &[dto.region.platform().as_str().to_string()])],
        Dto::ChampionRotation(dto) => {
            vec![compose(kind, &[dto.region.platform().as_str().to_string()])]
        }
        Dto::ShardStatus(dto) => vec![compose(kind, &[dto.region.platform().as_str().to_string()])],
        Dto::FeaturedGames(dto) => {
            vec![compose(kind, &[dto.region.platform().as_str().to_string()])]
        }
        Dto::LanguageStrings(dto) => vec![compose(
            kind,
            &[
                dto.region.platform().as_str().to_string(),
                dto.version.clone(),
                dto.locale.clone(),
            ],
        )],
        Dto::ProfileIcons(dto) => vec![compose(
            kind,
            &[
                dto.region.platform().as_str().to_string(),
                dto.version.clone(),
                dto.locale.clone(),
            ],
        )],
        Dto::ChampionList(list)
        | Dto::ItemList(list)
        | Dto::RuneList(list)
        | Dto::SummonerSpellList(list)
        | Dto::MapList(list) => vec![static_list_key(kind, list)],
        Dto::Champion(entry)
        | Dto::Item(entry)
        | Dto::Rune(entry)
        | Dto::SummonerSpell(entry)
        | Dto::Map(entry) => static_entry_key(kind, entry).into_iter().collect(),
        Dto::ChampionMasteryList(dto) => vec![compose(
            kind,
            &[dto.region.platform().as_str().to_string(), dto.summoner_id.clone()],
        )],
        Dto::ChampionMastery(dto) => match dto.region {
            Some(region) => vec![compose(
                kind,
                &[
                    region.platform().as_str().to_string(),
                    dto.summoner_id.clone(),
                    dto.champion_id.to_string(),
                ],
            )],
            None => Vec::new(),
        },
        Dto::LeaguePositions(dto) => vec![compose(
            kind,
            &[dto.region.platform().as_str().to_string(), dto.summoner_id.clone()],
        )],
        Dto::League(dto) => vec![compose(
            kind,
            &[dto.region.platform().as_str().to_string(), dto.league_id.clone()],
        )],
        Dto::ChallengerLeague(dto) | Dto::GrandmasterLeague(dto) | Dto::MasterLeague(dto) => {
            vec![compose(
                kind,
                &[dto.region.platform().as_str().to_string(), dto.queue.clone()],
            )]
        }
        Dto::Match(dto) => vec![compose(
            kind,
            &[dto.platform_id.as_str().to_string(), dto.game_id.to_string()],
        )],
        Dto::Timeline(dto) => vec![compose(
            kind,
            &[dto.region.platform().as_str().to_string(), dto.match_id.to_string()],
        )],
        Dto::CurrentGame(dto) => dto
            .participants
            .iter()
            .map(|participant| {
                compose(
                    kind,
                    &[dto.platform_id.as_str().to_string(), participant.summoner_id.clone()],
                )
            })
            .collect(),
        Dto::Summoner(dto) => vec![summoner_key(dto)],
        Dto::Patches(_) => vec![compose(kind, &[])],
    }
}
