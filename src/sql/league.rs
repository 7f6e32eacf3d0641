//! League Rows
//!
//! A league owns its positions, and each position may own a mini-series.
//! Writes reconcile against what is stored instead of replacing it:
//!
//! - a full league write updates positions still present, deletes those
//!   that are gone and appends new ones, then refreshes the league's
//!   `last_update` once;
//! - a positions-by-summoner write touches only that summoner's positions,
//!   creating any league it references as an incomplete stub, or
//!   refreshing such a stub.
//!
//! When a position row goes away, whether through reconciliation or by
//! cascade from an evicted league, the schema drops its summoner's
//! `league_positions` marker too, so a positions read never returns a
//! partial set as a hit.

use std::collections::{HashMap, HashSet};

use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use super::constants::ConstantCache;
use super::rows::{division_at, one, text, tier_at, Fetched, Marker};
use crate::data::{Platform, Tier};
use crate::dto::{LeagueEntryDto, LeagueListDto, LeaguePositionDto, LeaguePositionsDto, MiniSeriesDto};
use crate::error::{Result, StoreError};

// == Writes ==

/// Writes a full league list, reconciling its positions with stored ones.
pub fn put_league(conn: &Connection, constants: &ConstantCache, league: &LeagueListDto, now: i64) -> Result<()> {
    let platform = league.region.platform();
    let queue_id = constants.id_for(conn, &league.queue)?;

    let exists: bool = conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM league WHERE platform = ?1 AND league_id = ?2)",
        params![platform.as_str(), league.league_id],
        |row| row.get(0),
    )?;

    if exists {
        conn.execute(
            "UPDATE league SET name = ?3, tier = ?4, queue_id = ?5, complete = 1
             WHERE platform = ?1 AND league_id = ?2",
            params![
                platform.as_str(),
                league.league_id,
                league.name,
                league.tier.ordinal(),
                queue_id
            ],
        )?;

        let incoming: HashSet<&str> = league
            .entries
            .iter()
            .map(|entry| entry.player_or_team_id.as_str())
            .collect();
        let stored = stored_players(conn, platform, &league.league_id)?;
        let mut removed = 0;
        for player in stored.iter().filter(|player| !incoming.contains(player.as_str())) {
            removed += conn.execute(
                "DELETE FROM league_position
                 WHERE platform = ?1 AND league_id = ?2 AND player_or_team_id = ?3",
                params![platform.as_str(), league.league_id, player],
            )?;
        }
        debug!(
            "Reconciling league {} {}: {} stored, {} incoming, {} removed",
            platform,
            league.league_id,
            stored.len(),
            incoming.len(),
            removed
        );
    } else {
        conn.execute(
            "INSERT INTO league (platform, league_id, name, tier, queue_id, complete, last_update)
             VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)",
            params![
                platform.as_str(),
                league.league_id,
                league.name,
                league.tier.ordinal(),
                queue_id,
                now
            ],
        )?;
    }

    for entry in &league.entries {
        upsert_position(conn, platform, &league.league_id, &entry.player_or_team_id, entry, now)?;
    }

    if exists {
        conn.execute(
            "UPDATE league SET last_update = ?3 WHERE platform = ?1 AND league_id = ?2",
            params![platform.as_str(), league.league_id, now],
        )?;
    }
    Ok(())
}

/// Writes one summoner's positions across leagues, leaving everyone else's
/// positions alone.
pub fn put_positions(
    conn: &Connection,
    constants: &ConstantCache,
    positions: &LeaguePositionsDto,
    now: i64,
) -> Result<()> {
    let platform = positions.region.platform();
    let summoner_id = positions.summoner_id.as_str();

    let incoming: HashMap<&str, &LeaguePositionDto> = positions
        .positions
        .iter()
        .map(|position| (position.league_id.as_str(), position))
        .collect();

    let mut stmt = conn.prepare(
        "SELECT league_id FROM league_position WHERE platform = ?1 AND player_or_team_id = ?2",
    )?;
    let stored = stmt
        .query_map(params![platform.as_str(), summoner_id], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    for league_id in stored.iter().filter(|id| !incoming.contains_key(id.as_str())) {
        conn.execute(
            "DELETE FROM league_position
             WHERE platform = ?1 AND league_id = ?2 AND player_or_team_id = ?3",
            params![platform.as_str(), league_id, summoner_id],
        )?;
    }

    for position in &positions.positions {
        let queue_id = constants.id_for(conn, &position.queue_type)?;
        // A stub is kept alive by the position writes that reference it.
        let stubbed = conn.execute(
            "INSERT INTO league (platform, league_id, name, tier, queue_id, complete, last_update)
             VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)
             ON CONFLICT (platform, league_id) DO UPDATE SET
                 name = excluded.name,
                 tier = excluded.tier,
                 queue_id = excluded.queue_id,
                 last_update = excluded.last_update
             WHERE league.complete = 0",
            params![
                platform.as_str(),
                position.league_id,
                position.league_name,
                position.tier.ordinal(),
                queue_id,
                now
            ],
        )?;
        if stubbed > 0 {
            debug!("Stub league {} {} written", platform, position.league_id);
        }
        upsert_position(conn, platform, &position.league_id, summoner_id, &position.entry, now)?;
    }

    conn.execute(
        "INSERT INTO league_positions (platform, summoner_id, last_update) VALUES (?1, ?2, ?3)
         ON CONFLICT (platform, summoner_id) DO UPDATE SET last_update = excluded.last_update",
        params![platform.as_str(), summoner_id, now],
    )?;
    Ok(())
}

fn stored_players(conn: &Connection, platform: Platform, league_id: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT player_or_team_id FROM league_position WHERE platform = ?1 AND league_id = ?2",
    )?;
    let players = stmt
        .query_map(params![platform.as_str(), league_id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(players)
}

/// Updates a position in place (keeping its storage order) or appends it.
fn upsert_position(
    conn: &Connection,
    platform: Platform,
    league_id: &str,
    player_id: &str,
    entry: &LeagueEntryDto,
    now: i64,
) -> Result<()> {
    conn.execute(
        "INSERT INTO league_position (platform, league_id, player_or_team_id, player_or_team_name,
                                      league_points, rank, wins, losses, veteran, inactive,
                                      fresh_blood, hot_streak, last_update)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
         ON CONFLICT (platform, league_id, player_or_team_id) DO UPDATE SET
             player_or_team_name = excluded.player_or_team_name,
             league_points = excluded.league_points,
             rank = excluded.rank,
             wins = excluded.wins,
             losses = excluded.losses,
             veteran = excluded.veteran,
             inactive = excluded.inactive,
             fresh_blood = excluded.fresh_blood,
             hot_streak = excluded.hot_streak,
             last_update = excluded.last_update",
        params![
            platform.as_str(),
            league_id,
            player_id,
            entry.player_or_team_name,
            entry.league_points,
            entry.rank.ordinal(),
            entry.wins,
            entry.losses,
            entry.veteran,
            entry.inactive,
            entry.fresh_blood,
            entry.hot_streak,
            now,
        ],
    )?;

    match &entry.mini_series {
        Some(series) => {
            conn.execute(
                "INSERT INTO league_miniseries (platform, league_id, player_or_team_id,
                                                target, wins, losses, progress)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT (platform, league_id, player_or_team_id) DO UPDATE SET
                     target = excluded.target,
                     wins = excluded.wins,
                     losses = excluded.losses,
                     progress = excluded.progress",
                params![
                    platform.as_str(),
                    league_id,
                    player_id,
                    series.target,
                    series.wins,
                    series.losses,
                    series.progress
                ],
            )?;
        }
        None => {
            conn.execute(
                "DELETE FROM league_miniseries
                 WHERE platform = ?1 AND league_id = ?2 AND player_or_team_id = ?3",
                params![platform.as_str(), league_id, player_id],
            )?;
        }
    }
    Ok(())
}

// == Reads ==

struct LeagueHeader {
    league_id: String,
    name: String,
    tier: Tier,
    queue_id: i64,
    complete: bool,
    last_update: i64,
}

const HEADER_COLUMNS: &str = "league_id, name, tier, queue_id, complete, last_update";

fn read_header(row: &Row<'_>) -> rusqlite::Result<LeagueHeader> {
    Ok(LeagueHeader {
        league_id: row.get(0)?,
        name: row.get(1)?,
        tier: tier_at(row, 2)?,
        queue_id: row.get(3)?,
        complete: row.get(4)?,
        last_update: row.get(5)?,
    })
}

/// A league by id. Stubs are reported as misses without being evicted.
pub fn get_league(
    conn: &Connection,
    constants: &ConstantCache,
    platform: Platform,
    league_id: &str,
) -> Result<Fetched<LeagueListDto>> {
    let sql = format!(
        "SELECT {} FROM league WHERE platform = ?1 AND league_id = ?2",
        HEADER_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![platform.as_str(), league_id], read_header)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    let header = one(rows, &format!("League {} {}", platform, league_id))?;
    load_league(conn, constants, platform, header)
}

/// The single challenger, grandmaster or master league of a queue.
pub fn get_apex(
    conn: &Connection,
    constants: &ConstantCache,
    platform: Platform,
    queue: &str,
    tier: Tier,
) -> Result<Fetched<LeagueListDto>> {
    let what = format!("{:?} league {} {}", tier, platform, queue);
    let queue_id = constants
        .lookup(conn, queue)?
        .ok_or_else(|| StoreError::not_found(what.as_str()))?;

    let sql = format!(
        "SELECT {} FROM league
         WHERE platform = ?1 AND queue_id = ?2 AND tier = ?3 AND complete = 1",
        HEADER_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![platform.as_str(), queue_id, tier.ordinal()], read_header)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    let header = one(rows, &what)?;
    load_league(conn, constants, platform, header)
}

fn load_league(
    conn: &Connection,
    constants: &ConstantCache,
    platform: Platform,
    header: LeagueHeader,
) -> Result<Fetched<LeagueListDto>> {
    if !header.complete {
        return Err(StoreError::not_found(format!(
            "League {} {} is a stub",
            platform, header.league_id
        )));
    }

    let mut stmt = conn.prepare(
        "SELECT p.player_or_team_id, p.player_or_team_name, p.league_points, p.rank, p.wins,
                p.losses, p.veteran, p.inactive, p.fresh_blood, p.hot_streak,
                m.target, m.wins, m.losses, m.progress
         FROM league_position p
         LEFT JOIN league_miniseries m
             ON m.platform = p.platform AND m.league_id = p.league_id
            AND m.player_or_team_id = p.player_or_team_id
         WHERE p.platform = ?1 AND p.league_id = ?2
         ORDER BY p.rowid",
    )?;
    let entries = stmt
        .query_map(params![platform.as_str(), header.league_id], |row| read_entry(row, 0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let marker = Marker::new(
        "league",
        vec![
            ("platform", text(platform.as_str())),
            ("league_id", text(&header.league_id)),
        ],
        header.last_update,
    );
    let league = LeagueListDto {
        region: platform.region(),
        league_id: header.league_id,
        name: header.name,
        tier: header.tier,
        queue: constants.value_of(conn, header.queue_id)?,
        entries,
    };
    Ok(Fetched::new(league, vec![marker]))
}

/// One summoner's positions. The `league_positions` row is what expires;
/// an empty position set is a valid hit.
pub fn get_positions(
    conn: &Connection,
    constants: &ConstantCache,
    platform: Platform,
    summoner_id: &str,
) -> Result<Fetched<LeaguePositionsDto>> {
    let last_update: Option<i64> = conn
        .query_row(
            "SELECT last_update FROM league_positions WHERE platform = ?1 AND summoner_id = ?2",
            params![platform.as_str(), summoner_id],
            |row| row.get(0),
        )
        .optional()?;
    let last_update = last_update.ok_or_else(|| {
        StoreError::not_found(format!("LeaguePositions {} {}", platform, summoner_id))
    })?;

    let mut stmt = conn.prepare(
        "SELECT p.league_id, l.name, l.tier, l.queue_id,
                p.player_or_team_id, p.player_or_team_name, p.league_points, p.rank, p.wins,
                p.losses, p.veteran, p.inactive, p.fresh_blood, p.hot_streak,
                m.target, m.wins, m.losses, m.progress
         FROM league_position p
         JOIN league l ON l.platform = p.platform AND l.league_id = p.league_id
         LEFT JOIN league_miniseries m
             ON m.platform = p.platform AND m.league_id = p.league_id
            AND m.player_or_team_id = p.player_or_team_id
         WHERE p.platform = ?1 AND p.player_or_team_id = ?2
         ORDER BY p.rowid",
    )?;
    let rows = stmt
        .query_map(params![platform.as_str(), summoner_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                tier_at(row, 2)?,
                row.get::<_, i64>(3)?,
                read_entry(row, 4)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut positions = Vec::with_capacity(rows.len());
    for (league_id, league_name, tier, queue_id, entry) in rows {
        positions.push(LeaguePositionDto {
            league_id,
            league_name,
            tier,
            queue_type: constants.value_of(conn, queue_id)?,
            entry,
        });
    }

    let marker = Marker::new(
        "league_positions",
        vec![
            ("platform", text(platform.as_str())),
            ("summoner_id", text(summoner_id)),
        ],
        last_update,
    );
    Ok(Fetched::new(
        LeaguePositionsDto {
            region: platform.region(),
            summoner_id: summoner_id.to_string(),
            positions,
        },
        vec![marker],
    ))
}

/// Reads a position entry and its optional mini-series starting at `offset`.
fn read_entry(row: &Row<'_>, offset: usize) -> rusqlite::Result<LeagueEntryDto> {
    let target: Option<i64> = row.get(offset + 10)?;
    let mini_series = match target {
        Some(target) => Some(MiniSeriesDto {
            target,
            wins: row.get(offset + 11)?,
            losses: row.get(offset + 12)?,
            progress: row.get(offset + 13)?,
        }),
        None => None,
    };
    Ok(LeagueEntryDto {
        player_or_team_id: row.get(offset)?,
        player_or_team_name: row.get(offset + 1)?,
        league_points: row.get(offset + 2)?,
        rank: division_at(row, offset + 3)?,
        wins: row.get(offset + 4)?,
        losses: row.get(offset + 5)?,
        veteran: row.get(offset + 6)?,
        inactive: row.get(offset + 7)?,
        fresh_blood: row.get(offset + 8)?,
        hot_streak: row.get(offset + 9)?,
        mini_series,
    })
}
