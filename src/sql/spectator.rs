//! Current game rows.
//!
//! Featured games are ordinary current games carrying a `featured` flag, so
//! a game seen through both endpoints is stored once.

use rusqlite::{params, Connection, Row};

use super::constants::ConstantCache;
use super::rows::{all, one, platform_at, text, Fetched, Marker};
use crate::data::Platform;
use crate::dto::{
    BannedChampionDto, CurrentGameInfoDto, CurrentGameParticipantDto, FeaturedGamesDto, ObserverDto,
};
use crate::error::Result;

/// Refresh interval reported for featured games rebuilt from storage.
pub const FEATURED_REFRESH_INTERVAL: i64 = 300;

pub fn game_constants(game: &CurrentGameInfoDto) -> Vec<&str> {
    vec![game.game_mode.as_str(), game.game_type.as_str()]
}

/// Upserts a game and replaces its participants and bans. The featured flag
/// is sticky: a plain current game write never clears it.
pub fn put_current_game(
    conn: &Connection,
    constants: &ConstantCache,
    game: &CurrentGameInfoDto,
    featured: bool,
    now: i64,
) -> Result<()> {
    let platform = game.platform_id.as_str();
    conn.execute(
        "INSERT INTO current_game (platform, game_id, game_start_time, game_mode_id, map_id,
                                   game_type_id, game_queue_config_id, game_length,
                                   encryption_key, featured, last_update)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
         ON CONFLICT (platform, game_id) DO UPDATE SET
             game_start_time = excluded.game_start_time,
             game_mode_id = excluded.game_mode_id,
             map_id = excluded.map_id,
             game_type_id = excluded.game_type_id,
             game_queue_config_id = excluded.game_queue_config_id,
             game_length = excluded.game_length,
             encryption_key = excluded.encryption_key,
             featured = current_game.featured | excluded.featured,
             last_update = excluded.last_update",
        params![
            platform,
            game.game_id,
            game.game_start_time,
            constants.id_for(conn, &game.game_mode)?,
            game.map_id,
            constants.id_for(conn, &game.game_type)?,
            game.game_queue_config_id,
            game.game_length,
            game.observers.encryption_key,
            featured,
            now,
        ],
    )?;

    conn.execute(
        "DELETE FROM current_game_participant WHERE platform = ?1 AND game_id = ?2",
        params![platform, game.game_id],
    )?;
    conn.execute(
        "DELETE FROM current_game_ban WHERE platform = ?1 AND game_id = ?2",
        params![platform, game.game_id],
    )?;

    let mut insert = conn.prepare(
        "INSERT INTO current_game_participant (platform, game_id, position, team_id, spell1_id,
                                               spell2_id, champion_id, profile_icon_id,
                                               summoner_name, bot, summoner_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
    )?;
    for (position, participant) in game.participants.iter().enumerate() {
        insert.execute(params![
            platform,
            game.game_id,
            position as i64,
            participant.team_id,
            participant.spell1_id,
            participant.spell2_id,
            participant.champion_id,
            participant.profile_icon_id,
            participant.summoner_name,
            participant.bot,
            participant.summoner_id,
        ])?;
    }

    let mut insert = conn.prepare(
        "INSERT INTO current_game_ban (platform, game_id, position, pick_turn, team_id, champion_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    for (position, ban) in game.banned_champions.iter().enumerate() {
        insert.execute(params![
            platform,
            game.game_id,
            position as i64,
            ban.pick_turn,
            ban.team_id,
            ban.champion_id
        ])?;
    }
    Ok(())
}

pub fn put_featured(conn: &Connection, constants: &ConstantCache, featured: &FeaturedGamesDto, now: i64) -> Result<()> {
    for game in &featured.game_list {
        put_current_game(conn, constants, game, true, now)?;
    }
    Ok(())
}

struct GameHeader {
    platform: Platform,
    game_id: i64,
    game_start_time: i64,
    game_mode_id: i64,
    map_id: i64,
    game_type_id: i64,
    game_queue_config_id: i64,
    game_length: i64,
    encryption_key: String,
    last_update: i64,
}

const HEADER_COLUMNS: &str = "g.platform, g.game_id, g.game_start_time, g.game_mode_id, g.map_id, \
                              g.game_type_id, g.game_queue_config_id, g.game_length, \
                              g.encryption_key, g.last_update";

fn read_header(row: &Row<'_>) -> rusqlite::Result<GameHeader> {
    Ok(GameHeader {
        platform: platform_at(row, 0)?,
        game_id: row.get(1)?,
        game_start_time: row.get(2)?,
        game_mode_id: row.get(3)?,
        map_id: row.get(4)?,
        game_type_id: row.get(5)?,
        game_queue_config_id: row.get(6)?,
        game_length: row.get(7)?,
        encryption_key: row.get(8)?,
        last_update: row.get(9)?,
    })
}

/// The game a summoner is currently playing.
pub fn get_current_game(
    conn: &Connection,
    constants: &ConstantCache,
    platform: Platform,
    summoner_id: &str,
) -> Result<Fetched<CurrentGameInfoDto>> {
    let sql = format!(
        "SELECT DISTINCT {} FROM current_game g
         JOIN current_game_participant p ON p.platform = g.platform AND p.game_id = g.game_id
         WHERE g.platform = ?1 AND p.summoner_id = ?2",
        HEADER_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![platform.as_str(), summoner_id], read_header)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    let header = one(rows, &format!("CurrentGame {} {}", platform, summoner_id))?;

    let marker = game_marker(&header);
    let game = load_game(conn, constants, header)?;
    Ok(Fetched::new(game, vec![marker]))
}

/// All featured games of a platform; every one of them must be fresh.
pub fn get_featured(conn: &Connection, constants: &ConstantCache, platform: Platform) -> Result<Fetched<FeaturedGamesDto>> {
    let sql = format!(
        "SELECT {} FROM current_game g WHERE g.platform = ?1 AND g.featured = 1 ORDER BY g.rowid",
        HEADER_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![platform.as_str()], read_header)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    let headers = all(rows, &format!("FeaturedGames {}", platform))?;

    let markers = headers.iter().map(game_marker).collect();
    let game_list = headers
        .into_iter()
        .map(|header| load_game(conn, constants, header))
        .collect::<Result<Vec<_>>>()?;
    Ok(Fetched::new(
        FeaturedGamesDto {
            region: platform.region(),
            client_refresh_interval: FEATURED_REFRESH_INTERVAL,
            game_list,
        },
        markers,
    ))
}

fn game_marker(header: &GameHeader) -> Marker {
    Marker::new(
        "current_game",
        vec![
            ("platform", text(header.platform.as_str())),
            ("game_id", header.game_id.into()),
        ],
        header.last_update,
    )
}

fn load_game(conn: &Connection, constants: &ConstantCache, header: GameHeader) -> Result<CurrentGameInfoDto> {
    let platform = header.platform.as_str();

    let mut stmt = conn.prepare(
        "SELECT team_id, spell1_id, spell2_id, champion_id, profile_icon_id, summoner_name, bot,
                summoner_id
         FROM current_game_participant WHERE platform = ?1 AND game_id = ?2 ORDER BY position",
    )?;
    let participants = stmt
        .query_map(params![platform, header.game_id], |row| {
            Ok(CurrentGameParticipantDto {
                team_id: row.get(0)?,
                spell1_id: row.get(1)?,
                spell2_id: row.get(2)?,
                champion_id: row.get(3)?,
                profile_icon_id: row.get(4)?,
                summoner_name: row.get(5)?,
                bot: row.get(6)?,
                summoner_id: row.get(7)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut stmt = conn.prepare(
        "SELECT pick_turn, team_id, champion_id
         FROM current_game_ban WHERE platform = ?1 AND game_id = ?2 ORDER BY position",
    )?;
    let banned_champions = stmt
        .query_map(params![platform, header.game_id], |row| {
            Ok(BannedChampionDto {
                pick_turn: row.get(0)?,
                team_id: row.get(1)?,
                champion_id: row.get(2)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(CurrentGameInfoDto {
        platform_id: header.platform,
        game_id: header.game_id,
        game_start_time: header.game_start_time,
        game_mode: constants.value_of(conn, header.game_mode_id)?,
        map_id: header.map_id,
        game_type: constants.value_of(conn, header.game_type_id)?,
        game_queue_config_id: header.game_queue_config_id,
        game_length: header.game_length,
        observers: ObserverDto {
            encryption_key: header.encryption_key,
        },
        participants,
        banned_champions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Region;
    use crate::sql::schema;

    fn connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "foreign_keys", "ON").unwrap();
        schema::create(&conn).unwrap();
        conn
    }

    fn participant(summoner_id: &str, team_id: i64) -> CurrentGameParticipantDto {
        CurrentGameParticipantDto {
            team_id,
            spell1_id: 4,
            spell2_id: 7,
            champion_id: 22,
            profile_icon_id: 3,
            summoner_name: format!("Name {}", summoner_id),
            bot: false,
            summoner_id: summoner_id.to_string(),
        }
    }

    fn game(game_id: i64, players: &[&str]) -> CurrentGameInfoDto {
        CurrentGameInfoDto {
            platform_id: Platform::Na1,
            game_id,
            game_start_time: 1_600_000_000_000,
            game_mode: "CLASSIC".to_string(),
            map_id: 11,
            game_type: "MATCHED_GAME".to_string(),
            game_queue_config_id: 420,
            game_length: 300,
            observers: ObserverDto {
                encryption_key: "key".to_string(),
            },
            participants: players
                .iter()
                .enumerate()
                .map(|(i, id)| participant(id, if i % 2 == 0 { 100 } else { 200 }))
                .collect(),
            banned_champions: vec![BannedChampionDto {
                pick_turn: 1,
                team_id: 100,
                champion_id: 157,
            }],
        }
    }

    #[test]
    fn test_current_game_by_any_participant() {
        let conn = connection();
        let constants = ConstantCache::new();
        let stored = game(1, &["a", "b"]);
        put_current_game(&conn, &constants, &stored, false, 1).unwrap();

        for summoner in ["a", "b"] {
            let fetched = get_current_game(&conn, &constants, Platform::Na1, summoner).unwrap();
            assert_eq!(fetched.value, stored);
        }
        assert!(get_current_game(&conn, &constants, Platform::Na1, "c")
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_two_games_for_one_summoner_is_ambiguous() {
        let conn = connection();
        let constants = ConstantCache::new();
        put_current_game(&conn, &constants, &game(1, &["a"]), false, 1).unwrap();
        put_current_game(&conn, &constants, &game(2, &["a"]), false, 1).unwrap();
        assert!(get_current_game(&conn, &constants, Platform::Na1, "a")
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_featured_flag_is_sticky() {
        let conn = connection();
        let constants = ConstantCache::new();
        let featured = FeaturedGamesDto {
            region: Region::NorthAmerica,
            client_refresh_interval: FEATURED_REFRESH_INTERVAL,
            game_list: vec![game(1, &["a"]), game(2, &["b"])],
        };
        put_featured(&conn, &constants, &featured, 1).unwrap();
        put_current_game(&conn, &constants, &game(1, &["a"]), false, 2).unwrap();
        put_current_game(&conn, &constants, &game(3, &["c"]), false, 2).unwrap();

        let fetched = get_featured(&conn, &constants, Platform::Na1).unwrap();
        assert_eq!(fetched.value, featured);
        assert_eq!(fetched.markers.len(), 2);
        assert_eq!(fetched.markers[0].last_update, 2);
    }

    #[test]
    fn test_no_featured_games_misses() {
        let conn = connection();
        let constants = ConstantCache::new();
        put_current_game(&conn, &constants, &game(1, &["a"]), false, 1).unwrap();
        assert!(get_featured(&conn, &constants, Platform::Na1)
            .unwrap_err()
            .is_not_found());
    }
}
