//! Match and timeline rows.
//!
//! Both are immutable once played, so a write replaces the whole nested
//! structure.

use std::collections::BTreeMap;

use rusqlite::{params, Connection, Row};

use super::constants::ConstantCache;
use super::rows::{json_at, one, platform_at, text, Fetched, Marker};
use crate::data::Platform;
use crate::dto::{
    EventDto, FrameDto, MatchDto, ParticipantDto, ParticipantFrameDto, ParticipantStatsDto,
    ParticipantTimelineDto, PositionDto, TimelineDto,
};
use crate::error::Result;

// == Constants ==

/// Every shared-constant string a match write will reference.
pub fn match_constants(game: &MatchDto) -> Vec<&str> {
    let mut values = vec![game.game_mode.as_str(), game.game_type.as_str()];
    for participant in &game.participants {
        values.extend(participant.timeline.deltas.keys().map(String::as_str));
    }
    values
}

/// Every shared-constant string a timeline write will reference.
pub fn timeline_constants(timeline: &TimelineDto) -> Vec<&str> {
    let mut values = Vec::new();
    for event in timeline.frames.iter().flat_map(|frame| &frame.events) {
        values.push(event.event_type.as_str());
        values.extend(sub_types(event).into_iter().flatten());
    }
    values
}

fn sub_types(event: &EventDto) -> [Option<&str>; 7] {
    [
        event.ward_type.as_deref(),
        event.level_up_type.as_deref(),
        event.monster_type.as_deref(),
        event.monster_sub_type.as_deref(),
        event.building_type.as_deref(),
        event.tower_type.as_deref(),
        event.lane_type.as_deref(),
    ]
}

// == Match ==

pub fn put_match(conn: &Connection, constants: &ConstantCache, game: &MatchDto, now: i64) -> Result<()> {
    let platform = game.platform_id.as_str();
    conn.execute(
        "DELETE FROM \"match\" WHERE platform = ?1 AND game_id = ?2",
        params![platform, game.game_id],
    )?;
    conn.execute(
        "INSERT INTO \"match\" (platform, game_id, game_creation, game_duration, queue_id, map_id,
                                season_id, game_version, game_mode_id, game_type_id, last_update)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            platform,
            game.game_id,
            game.game_creation,
            game.game_duration,
            game.queue_id,
            game.map_id,
            game.season_id,
            game.game_version,
            constants.id_for(conn, &game.game_mode)?,
            constants.id_for(conn, &game.game_type)?,
            now,
        ],
    )?;

    for participant in &game.participants {
        put_participant(conn, constants, platform, game.game_id, participant)?;
    }
    Ok(())
}

fn put_participant(
    conn: &Connection,
    constants: &ConstantCache,
    platform: &str,
    game_id: i64,
    participant: &ParticipantDto,
) -> Result<()> {
    let id = participant.participant_id;
    conn.execute(
        "INSERT INTO match_participant (platform, game_id, participant_id, team_id, champion_id,
                                        spell1_id, spell2_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            platform,
            game_id,
            id,
            participant.team_id,
            participant.champion_id,
            participant.spell1_id,
            participant.spell2_id
        ],
    )?;

    let stats = &participant.stats;
    conn.execute(
        "INSERT INTO match_participant_stats (platform, game_id, participant_id, win, kills, deaths,
                                              assists, largest_killing_spree, gold_earned,
                                              champ_level, total_damage_dealt, total_minions_killed,
                                              vision_score, item0, item1, item2, item3, item4,
                                              item5, item6)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18,
                 ?19, ?20)",
        params![
            platform,
            game_id,
            id,
            stats.win,
            stats.kills,
            stats.deaths,
            stats.assists,
            stats.largest_killing_spree,
            stats.gold_earned,
            stats.champ_level,
            stats.total_damage_dealt,
            stats.total_minions_killed,
            stats.vision_score,
            stats.item0,
            stats.item1,
            stats.item2,
            stats.item3,
            stats.item4,
            stats.item5,
            stats.item6,
        ],
    )?;

    let timeline = &participant.timeline;
    conn.execute(
        "INSERT INTO match_participant_timeline (platform, game_id, participant_id, lane, role)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![platform, game_id, id, timeline.lane, timeline.role],
    )?;
    let mut insert = conn.prepare(
        "INSERT INTO match_participant_timeline_delta (platform, game_id, participant_id,
                                                       delta_type_id, interval, value)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    for (delta_type, intervals) in &timeline.deltas {
        let delta_type_id = constants.id_for(conn, delta_type)?;
        for (interval, value) in intervals {
            insert.execute(params![platform, game_id, id, delta_type_id, interval, value])?;
        }
    }
    Ok(())
}

pub fn get_match(
    conn: &Connection,
    constants: &ConstantCache,
    platform: Platform,
    game_id: i64,
) -> Result<Fetched<MatchDto>> {
    let mut stmt = conn.prepare(
        "SELECT platform, game_id, game_creation, game_duration, queue_id, map_id, season_id,
                game_version, game_mode_id, game_type_id, last_update
         FROM \"match\" WHERE platform = ?1 AND game_id = ?2",
    )?;
    let rows = stmt
        .query_map(params![platform.as_str(), game_id], |row| {
            Ok((
                platform_at(row, 0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, i64>(5)?,
                row.get::<_, i64>(6)?,
                row.get::<_, String>(7)?,
                row.get::<_, i64>(8)?,
                row.get::<_, i64>(9)?,
                row.get::<_, i64>(10)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    let (
        platform_id,
        game_id,
        game_creation,
        game_duration,
        queue_id,
        map_id,
        season_id,
        game_version,
        game_mode_id,
        game_type_id,
        last_update,
    ) = one(rows, &format!("Match {} {}", platform, game_id))?;

    let game = MatchDto {
        platform_id,
        game_id,
        game_creation,
        game_duration,
        queue_id,
        map_id,
        season_id,
        game_version,
        game_mode: constants.value_of(conn, game_mode_id)?,
        game_type: constants.value_of(conn, game_type_id)?,
        participants: load_participants(conn, constants, platform, game_id)?,
    };
    let marker = Marker::new(
        "match",
        vec![("platform", text(platform.as_str())), ("game_id", game_id.into())],
        last_update,
    );
    Ok(Fetched::new(game, vec![marker]))
}

fn load_participants(
    conn: &Connection,
    constants: &ConstantCache,
    platform: Platform,
    game_id: i64,
) -> Result<Vec<ParticipantDto>> {
    let mut stmt = conn.prepare(
        "SELECT p.participant_id, p.team_id, p.champion_id, p.spell1_id, p.spell2_id,
                s.win, s.kills, s.deaths, s.assists, s.largest_killing_spree, s.gold_earned,
                s.champ_level, s.total_damage_dealt, s.total_minions_killed, s.vision_score,
                s.item0, s.item1, s.item2, s.item3, s.item4, s.item5, s.item6,
                t.lane, t.role
         FROM match_participant p
         JOIN match_participant_stats s USING (platform, game_id, participant_id)
         JOIN match_participant_timeline t USING (platform, game_id, participant_id)
         WHERE p.platform = ?1 AND p.game_id = ?2
         ORDER BY p.rowid",
    )?;
    let mut participants = stmt
        .query_map(params![platform.as_str(), game_id], read_participant)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut stmt = conn.prepare(
        "SELECT participant_id, delta_type_id, interval, value
         FROM match_participant_timeline_delta
         WHERE platform = ?1 AND game_id = ?2",
    )?;
    let deltas = stmt
        .query_map(params![platform.as_str(), game_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, f64>(3)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    for (participant_id, delta_type_id, interval, value) in deltas {
        let delta_type = constants.value_of(conn, delta_type_id)?;
        if let Some(participant) = participants
            .iter_mut()
            .find(|p| p.participant_id == participant_id)
        {
            participant
                .timeline
                .deltas
                .entry(delta_type)
                .or_default()
                .insert(interval, value);
        }
    }
    Ok(participants)
}

fn read_participant(row: &Row<'_>) -> rusqlite::Result<ParticipantDto> {
    Ok(ParticipantDto {
        participant_id: row.get(0)?,
        team_id: row.get(1)?,
        champion_id: row.get(2)?,
        spell1_id: row.get(3)?,
        spell2_id: row.get(4)?,
        stats: ParticipantStatsDto {
            win: row.get(5)?,
            kills: row.get(6)?,
            deaths: row.get(7)?,
            assists: row.get(8)?,
            largest_killing_spree: row.get(9)?,
            gold_earned: row.get(10)?,
            champ_level: row.get(11)?,
            total_damage_dealt: row.get(12)?,
            total_minions_killed: row.get(13)?,
            vision_score: row.get(14)?,
            item0: row.get(15)?,
            item1: row.get(16)?,
            item2: row.get(17)?,
            item3: row.get(18)?,
            item4: row.get(19)?,
            item5: row.get(20)?,
            item6: row.get(21)?,
        },
        timeline: ParticipantTimelineDto {
            lane: row.get(22)?,
            role: row.get(23)?,
            deltas: BTreeMap::new(),
        },
    })
}

// == Timeline ==

pub fn put_timeline(conn: &Connection, constants: &ConstantCache, timeline: &TimelineDto, now: i64) -> Result<()> {
    let platform = timeline.region.platform();
    let platform = platform.as_str();
    let match_id = timeline.match_id;

    conn.execute(
        "DELETE FROM match_timeline WHERE platform = ?1 AND match_id = ?2",
        params![platform, match_id],
    )?;
    conn.execute(
        "INSERT INTO match_timeline (platform, match_id, frame_interval, last_update)
         VALUES (?1, ?2, ?3, ?4)",
        params![platform, match_id, timeline.frame_interval, now],
    )?;

    let mut insert_frame = conn.prepare(
        "INSERT INTO match_timeline_frame (platform, match_id, frame_index, timestamp)
         VALUES (?1, ?2, ?3, ?4)",
    )?;
    let mut insert_participant = conn.prepare(
        "INSERT INTO match_timeline_participant_frame (platform, match_id, frame_index,
             participant_key, participant_id, level, current_gold, total_gold, xp,
             minions_killed, jungle_minions_killed, position_x, position_y)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
    )?;
    let mut insert_event = conn.prepare(
        "INSERT INTO match_timeline_event (platform, match_id, frame_index, event_index, type_id,
             timestamp, participant_id, item_id, skill_slot, creator_id, killer_id, victim_id,
             team_id, after_id, before_id, assisting_participant_ids, position_x, position_y,
             ward_type_id, level_up_type_id, monster_type_id, monster_sub_type_id,
             building_type_id, tower_type_id, lane_type_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18,
                 ?19, ?20, ?21, ?22, ?23, ?24, ?25)",
    )?;

    for (frame_index, frame) in timeline.frames.iter().enumerate() {
        let frame_index = frame_index as i64;
        insert_frame.execute(params![platform, match_id, frame_index, frame.timestamp])?;

        for (key, pf) in &frame.participant_frames {
            insert_participant.execute(params![
                platform,
                match_id,
                frame_index,
                key,
                pf.participant_id,
                pf.level,
                pf.current_gold,
                pf.total_gold,
                pf.xp,
                pf.minions_killed,
                pf.jungle_minions_killed,
                pf.position.map(|p| p.x),
                pf.position.map(|p| p.y),
            ])?;
        }

        for (event_index, event) in frame.events.iter().enumerate() {
            let [ward, level_up, monster, monster_sub, building, tower, lane] = sub_types(event);
            insert_event.execute(params![
                platform,
                match_id,
                frame_index,
                event_index as i64,
                constants.id_for(conn, &event.event_type)?,
                event.timestamp,
                event.participant_id,
                event.item_id,
                event.skill_slot,
                event.creator_id,
                event.killer_id,
                event.victim_id,
                event.team_id,
                event.after_id,
                event.before_id,
                serde_json::to_string(&event.assisting_participant_ids)?,
                event.position.map(|p| p.x),
                event.position.map(|p| p.y),
                constants.id_for_opt(conn, ward)?,
                constants.id_for_opt(conn, level_up)?,
                constants.id_for_opt(conn, monster)?,
                constants.id_for_opt(conn, monster_sub)?,
                constants.id_for_opt(conn, building)?,
                constants.id_for_opt(conn, tower)?,
                constants.id_for_opt(conn, lane)?,
            ])?;
        }
    }
    Ok(())
}

pub fn get_timeline(
    conn: &Connection,
    constants: &ConstantCache,
    platform: Platform,
    match_id: i64,
) -> Result<Fetched<TimelineDto>> {
    let mut stmt = conn.prepare(
        "SELECT frame_interval, last_update FROM match_timeline WHERE platform = ?1 AND match_id = ?2",
    )?;
    let rows = stmt
        .query_map(params![platform.as_str(), match_id], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    let (frame_interval, last_update) = one(rows, &format!("Timeline {} {}", platform, match_id))?;

    let mut stmt = conn.prepare(
        "SELECT timestamp FROM match_timeline_frame
         WHERE platform = ?1 AND match_id = ?2 ORDER BY frame_index",
    )?;
    let mut frames = stmt
        .query_map(params![platform.as_str(), match_id], |row| {
            Ok(FrameDto {
                timestamp: row.get(0)?,
                participant_frames: BTreeMap::new(),
                events: Vec::new(),
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut stmt = conn.prepare(
        "SELECT frame_index, participant_key, participant_id, level, current_gold, total_gold, xp,
                minions_killed, jungle_minions_killed, position_x, position_y
         FROM match_timeline_participant_frame
         WHERE platform = ?1 AND match_id = ?2",
    )?;
    let participant_frames = stmt
        .query_map(params![platform.as_str(), match_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                ParticipantFrameDto {
                    participant_id: row.get(2)?,
                    level: row.get(3)?,
                    current_gold: row.get(4)?,
                    total_gold: row.get(5)?,
                    xp: row.get(6)?,
                    minions_killed: row.get(7)?,
                    jungle_minions_killed: row.get(8)?,
                    position: position_at(row, 9)?,
                },
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    for (frame_index, key, participant_frame) in participant_frames {
        if let Some(frame) = frame_at(&mut frames, frame_index) {
            frame.participant_frames.insert(key, participant_frame);
        }
    }

    let mut stmt = conn.prepare(
        "SELECT frame_index, type_id, timestamp, participant_id, item_id, skill_slot, creator_id,
                killer_id, victim_id, team_id, after_id, before_id, assisting_participant_ids,
                position_x, position_y, ward_type_id, level_up_type_id, monster_type_id,
                monster_sub_type_id, building_type_id, tower_type_id, lane_type_id
         FROM match_timeline_event
         WHERE platform = ?1 AND match_id = ?2
         ORDER BY frame_index, event_index",
    )?;
    let events = stmt
        .query_map(params![platform.as_str(), match_id], |row| {
            let constant_ids: [Option<i64>; 7] = [
                row.get(15)?,
                row.get(16)?,
                row.get(17)?,
                row.get(18)?,
                row.get(19)?,
                row.get(20)?,
                row.get(21)?,
            ];
            let event = EventDto {
                event_type: String::new(),
                timestamp: row.get(2)?,
                participant_id: row.get(3)?,
                item_id: row.get(4)?,
                skill_slot: row.get(5)?,
                creator_id: row.get(6)?,
                killer_id: row.get(7)?,
                victim_id: row.get(8)?,
                team_id: row.get(9)?,
                after_id: row.get(10)?,
                before_id: row.get(11)?,
                assisting_participant_ids: json_at(row, 12)?,
                position: position_at(row, 13)?,
                ..EventDto::default()
            };
            Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?, constant_ids, event))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    for (frame_index, type_id, constant_ids, mut event) in events {
        event.event_type = constants.value_of(conn, type_id)?;
        let [ward, level_up, monster, monster_sub, building, tower, lane] = constant_ids;
        event.ward_type = constants.value_of_opt(conn, ward)?;
        event.level_up_type = constants.value_of_opt(conn, level_up)?;
        event.monster_type = constants.value_of_opt(conn, monster)?;
        event.monster_sub_type = constants.value_of_opt(conn, monster_sub)?;
        event.building_type = constants.value_of_opt(conn, building)?;
        event.tower_type = constants.value_of_opt(conn, tower)?;
        event.lane_type = constants.value_of_opt(conn, lane)?;
        if let Some(frame) = frame_at(&mut frames, frame_index) {
            frame.events.push(event);
        }
    }

    let marker = Marker::new(
        "match_timeline",
        vec![("platform", text(platform.as_str())), ("match_id", match_id.into())],
        last_update,
    );
    let timeline = TimelineDto {
        region: platform.region(),
        match_id,
        frame_interval,
        frames,
    };
    Ok(Fetched::new(timeline, vec![marker]))
}

fn frame_at(frames: &mut [FrameDto], index: i64) -> Option<&mut FrameDto> {
    usize::try_from(index).ok().and_then(|index| frames.get_mut(index))
}

fn position_at(row: &Row<'_>, index: usize) -> rusqlite::Result<Option<PositionDto>> {
    let x: Option<i64> = row.get(index)?;
    let y: Option<i64> = row.get(index + 1)?;
    Ok(x.zip(y).map(|(x, y)| PositionDto { x, y }))
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

    fn participant(id: i64) -> ParticipantDto {
        ParticipantDto {
            participant_id: id,
            team_id: if id <= 5 { 100 } else { 200 },
            champion_id: 10 + id,
            spell1_id: 4,
            spell2_id: 14,
            stats: ParticipantStatsDto {
                win: id <= 5,
                kills: id,
                item0: 3031,
                ..ParticipantStatsDto::default()
            },
            timeline: ParticipantTimelineDto {
                lane: "MIDDLE".to_string(),
                role: "SOLO".to_string(),
                deltas: BTreeMap::from([(
                    "creepsPerMinDeltas".to_string(),
                    BTreeMap::from([("0-10".to_string(), 7.5), ("10-20".to_string(), 8.25)]),
                )]),
            },
        }
    }

    fn game() -> MatchDto {
        MatchDto {
            platform_id: Platform::Euw1,
            game_id: 4_000_000_001,
            game_creation: 1_600_000_000_000,
            game_duration: 1800,
            queue_id: 420,
            map_id: 11,
            season_id: 13,
            game_version: "10.19.1".to_string(),
            game_mode: "CLASSIC".to_string(),
            game_type: "MATCHED_GAME".to_string(),
            participants: vec![participant(1), participant(6)],
        }
    }

    #[test]
    fn test_match_round_trip() {
        let conn = connection();
        let constants = ConstantCache::new();
        put_match(&conn, &constants, &game(), 5).unwrap();

        let fetched = get_match(&conn, &constants, Platform::Euw1, 4_000_000_001).unwrap();
        assert_eq!(fetched.value, game());
        assert_eq!(fetched.markers[0].last_update, 5);
    }

    #[test]
    fn test_match_rewrite_replaces_children() {
        let conn = connection();
        let constants = ConstantCache::new();
        put_match(&conn, &constants, &game(), 5).unwrap();
        let mut smaller = game();
        smaller.participants.truncate(1);
        put_match(&conn, &constants, &smaller, 6).unwrap();

        let fetched = get_match(&conn, &constants, Platform::Euw1, 4_000_000_001).unwrap();
        assert_eq!(fetched.value, smaller);
        let stats_rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM match_participant_stats", [], |row| row.get(0))
            .unwrap();
        assert_eq!(stats_rows, 1);
    }

    #[test]
    fn test_match_constants_listed() {
        let g = game();
        let values = match_constants(&g);
        assert!(values.contains(&"CLASSIC"));
        assert!(values.contains(&"MATCHED_GAME"));
        assert!(values.contains(&"creepsPerMinDeltas"));
    }

    fn timeline() -> TimelineDto {
        let kill = EventDto {
            event_type: "CHAMPION_KILL".to_string(),
            timestamp: 61_000,
            killer_id: Some(1),
            victim_id: Some(6),
            assisting_participant_ids: vec![2, 3],
            position: Some(PositionDto { x: 100, y: 200 }),
            ..EventDto::default()
        };
        let ward = EventDto {
            event_type: "WARD_PLACED".to_string(),
            timestamp: 62_000,
            creator_id: Some(1),
            ward_type: Some("YELLOW_TRINKET".to_string()),
            ..EventDto::default()
        };
        let frame = |timestamp, events| FrameDto {
            timestamp,
            participant_frames: BTreeMap::from([(
                "1".to_string(),
                ParticipantFrameDto {
                    participant_id: 1,
                    level: 2,
                    current_gold: 500,
                    total_gold: 500,
                    xp: 280,
                    minions_killed: 4,
                    jungle_minions_killed: 0,
                    position: Some(PositionDto { x: 5, y: 6 }),
                },
            )]),
            events,
        };
        TimelineDto {
            region: Region::EuropeWest,
            match_id: 4_000_000_001,
            frame_interval: 60_000,
            frames: vec![frame(0, vec![]), frame(60_000, vec![kill, ward])],
        }
    }

    #[test]
    fn test_timeline_round_trip() {
        let conn = connection();
        let constants = ConstantCache::new();
        put_timeline(&conn, &constants, &timeline(), 9).unwrap();

        let fetched = get_timeline(&conn, &constants, Platform::Euw1, 4_000_000_001).unwrap();
        assert_eq!(fetched.value, timeline());
        assert!(get_timeline(&conn, &constants, Platform::Na1, 4_000_000_001)
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_timeline_constants_listed() {
        let t = timeline();
        let values = timeline_constants(&t);
        assert!(values.contains(&"CHAMPION_KILL"));
        assert!(values.contains(&"YELLOW_TRINKET"));
    }
}
