//! Champion rotation and champion mastery rows.

use rusqlite::{params, Connection, Row};

use super::rows::{all, one, text, Fetched, Marker};
use crate::data::Platform;
use crate::dto::{ChampionMasteryDto, ChampionRotationDto};
use crate::error::{Result, StoreError};

// == Rotation ==
pub fn put_rotation(conn: &Connection, rotation: &ChampionRotationDto, now: i64) -> Result<()> {
    let platform = rotation.region.platform().as_str();
    conn.execute(
        "INSERT INTO champion_rotation (platform, max_new_player_level, last_update)
         VALUES (?1, ?2, ?3)
         ON CONFLICT (platform) DO UPDATE SET
             max_new_player_level = excluded.max_new_player_level,
             last_update = excluded.last_update",
        params![platform, rotation.max_new_player_level, now],
    )?;

    conn.execute(
        "DELETE FROM champion_rotation_free WHERE platform = ?1",
        params![platform],
    )?;
    let mut insert = conn.prepare(
        "INSERT INTO champion_rotation_free (platform, for_new_players, position, champion_id)
         VALUES (?1, ?2, ?3, ?4)",
    )?;
    for (for_new_players, ids) in [
        (false, &rotation.free_champion_ids),
        (true, &rotation.free_champion_ids_for_new_players),
    ] {
        for (position, champion_id) in ids.iter().enumerate() {
            insert.execute(params![platform, for_new_players, position as i64, champion_id])?;
        }
    }
    Ok(())
}

pub fn get_rotation(conn: &Connection, platform: Platform) -> Result<Fetched<ChampionRotationDto>> {
    let mut stmt = conn.prepare(
        "SELECT max_new_player_level, last_update FROM champion_rotation WHERE platform = ?1",
    )?;
    let rows = stmt
        .query_map(params![platform.as_str()], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    let (max_new_player_level, last_update) =
        one(rows, &format!("ChampionRotation {}", platform))?;

    let mut rotation = ChampionRotationDto {
        region: platform.region(),
        free_champion_ids: Vec::new(),
        free_champion_ids_for_new_players: Vec::new(),
        max_new_player_level,
    };
    let mut stmt = conn.prepare(
        "SELECT for_new_players, champion_id FROM champion_rotation_free
         WHERE platform = ?1 ORDER BY for_new_players, position",
    )?;
    let mut rows = stmt.query(params![platform.as_str()])?;
    while let Some(row) = rows.next()? {
        let for_new_players: bool = row.get(0)?;
        let champion_id: i64 = row.get(1)?;
        if for_new_players {
            rotation.free_champion_ids_for_new_players.push(champion_id);
        } else {
            rotation.free_champion_ids.push(champion_id);
        }
    }

    let marker = Marker::new(
        "champion_rotation",
        vec![("platform", text(platform.as_str()))],
        last_update,
    );
    Ok(Fetched::new(rotation, vec![marker]))
}

// == Mastery ==
pub fn put_mastery(conn: &Connection, platform: Platform, mastery: &ChampionMasteryDto, now: i64) -> Result<()> {
    conn.execute(
        "INSERT INTO champion_mastery (platform, summoner_id, champion_id, champion_level,
                                       champion_points, champion_points_until_next_level,
                                       champion_points_since_last_level, last_play_time,
                                       chest_granted, last_update)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
         ON CONFLICT (platform, summoner_id, champion_id) DO UPDATE SET
             champion_level = excluded.champion_level,
             champion_points = excluded.champion_points,
             champion_points_until_next_level = excluded.champion_points_until_next_level,
             champion_points_since_last_level = excluded.champion_points_since_last_level,
             last_play_time = excluded.last_play_time,
             chest_granted = excluded.chest_granted,
             last_update = excluded.last_update",
        params![
            platform.as_str(),
            mastery.summoner_id,
            mastery.champion_id,
            mastery.champion_level,
            mastery.champion_points,
            mastery.champion_points_until_next_level,
            mastery.champion_points_since_last_level,
            mastery.last_play_time,
            mastery.chest_granted,
            now,
        ],
    )?;
    Ok(())
}

/// The platform a standalone mastery is written under.
pub fn mastery_platform(mastery: &ChampionMasteryDto) -> Result<Platform> {
    mastery.region.map(|region| region.platform()).ok_or_else(|| {
        StoreError::validation(format!(
            "champion mastery for summoner {} carries no region",
            mastery.summoner_id
        ))
    })
}

const MASTERY_COLUMNS: &str = "summoner_id, champion_id, champion_level, champion_points, \
                               champion_points_until_next_level, champion_points_since_last_level, \
                               last_play_time, chest_granted, last_update";

pub fn get_mastery(
    conn: &Connection,
    platform: Platform,
    summoner_id: &str,
    champion_id: i64,
) -> Result<Fetched<ChampionMasteryDto>> {
    let sql = format!(
        "SELECT {} FROM champion_mastery WHERE platform = ?1 AND summoner_id = ?2 AND champion_id = ?3",
        MASTERY_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![platform.as_str(), summoner_id, champion_id], |row| {
            read_mastery(row, platform)
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    let (mastery, last_update) = one(
        rows,
        &format!("ChampionMastery {} {} {}", platform, summoner_id, champion_id),
    )?;
    let marker = mastery_marker(platform, &mastery, last_update);
    Ok(Fetched::new(mastery, vec![marker]))
}

/// Every mastery row of one summoner, highest points first.
pub fn get_masteries(
    conn: &Connection,
    platform: Platform,
    summoner_id: &str,
) -> Result<Fetched<Vec<ChampionMasteryDto>>> {
    let sql = format!(
        "SELECT {} FROM champion_mastery WHERE platform = ?1 AND summoner_id = ?2
         ORDER BY champion_points DESC, champion_id",
        MASTERY_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![platform.as_str(), summoner_id], |row| {
            read_mastery(row, platform)
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    let rows = all(rows, &format!("ChampionMasteryList {} {}", platform, summoner_id))?;

    let markers = rows
        .iter()
        .map(|(mastery, last_update)| mastery_marker(platform, mastery, *last_update))
        .collect();
    let masteries = rows.into_iter().map(|(mastery, _)| mastery).collect();
    Ok(Fetched::new(masteries, markers))
}

fn mastery_marker(platform: Platform, mastery: &ChampionMasteryDto, last_update: i64) -> Marker {
    Marker::new(
        "champion_mastery",
        vec![
            ("platform", text(platform.as_str())),
            ("summoner_id", text(&mastery.summoner_id)),
            ("champion_id", mastery.champion_id.into()),
        ],
        last_update,
    )
}

fn read_mastery(row: &Row<'_>, platform: Platform) -> rusqlite::Result<(ChampionMasteryDto, i64)> {
    Ok((
        ChampionMasteryDto {
            region: Some(platform.region()),
            summoner_id: row.get(0)?,
            champion_id: row.get(1)?,
            champion_level: row.get(2)?,
            champion_points: row.get(3)?,
            champion_points_until_next_level: row.get(4)?,
            champion_points_since_last_level: row.get(5)?,
            last_play_time: row.get(6)?,
            chest_granted: row.get(7)?,
        },
        row.get(8)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Region;
    use crate::sql::schema;

    fn connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        schema::create(&conn).unwrap();
        conn
    }

    fn mastery(champion_id: i64, points: i64) -> ChampionMasteryDto {
        ChampionMasteryDto {
            region: Some(Region::NorthAmerica),
            summoner_id: "s1".to_string(),
            champion_id,
            champion_level: 5,
            champion_points: points,
            champion_points_until_next_level: 0,
            champion_points_since_last_level: 100,
            last_play_time: 1_500_000_000_000,
            chest_granted: true,
        }
    }

    #[test]
    fn test_rotation_round_trip() {
        let conn = connection();
        let rotation = ChampionRotationDto {
            region: Region::Korea,
            free_champion_ids: vec![5, 3, 9],
            free_champion_ids_for_new_players: vec![1, 2],
            max_new_player_level: 10,
        };
        put_rotation(&conn, &rotation, 1).unwrap();
        assert_eq!(get_rotation(&conn, Platform::Kr).unwrap().value, rotation);

        let shorter = ChampionRotationDto {
            free_champion_ids: vec![7],
            ..rotation
        };
        put_rotation(&conn, &shorter, 2).unwrap();
        let fetched = get_rotation(&conn, Platform::Kr).unwrap();
        assert_eq!(fetched.value, shorter);
        assert_eq!(fetched.markers[0].last_update, 2);
    }

    #[test]
    fn test_masteries_all_matching() {
        let conn = connection();
        put_mastery(&conn, Platform::Na1, &mastery(1, 100), 1).unwrap();
        put_mastery(&conn, Platform::Na1, &mastery(2, 500), 1).unwrap();

        let fetched = get_masteries(&conn, Platform::Na1, "s1").unwrap();
        let ids: Vec<i64> = fetched.value.iter().map(|m| m.champion_id).collect();
        assert_eq!(ids, vec![2, 1]);
        assert_eq!(fetched.markers.len(), 2);

        assert!(get_masteries(&conn, Platform::Na1, "nobody")
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_single_mastery() {
        let conn = connection();
        put_mastery(&conn, Platform::Na1, &mastery(1, 100), 1).unwrap();
        put_mastery(&conn, Platform::Na1, &mastery(1, 250), 2).unwrap();
        let fetched = get_mastery(&conn, Platform::Na1, "s1", 1).unwrap();
        assert_eq!(fetched.value.champion_points, 250);
        assert!(get_mastery(&conn, Platform::Na1, "s1", 9).unwrap_err().is_not_found());
    }

    #[test]
    fn test_mastery_without_region_is_rejected() {
        let orphan = ChampionMasteryDto {
            region: None,
            ..mastery(1, 1)
        };
        assert!(matches!(mastery_platform(&orphan), Err(StoreError::Validation(_))));
    }
}
