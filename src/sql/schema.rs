//! Relational Schema
//!
//! One table per entity, with owned children referencing their parent
//! through `ON DELETE CASCADE` foreign keys. Every cacheable parent row
//! carries `last_update` in milliseconds since the Unix epoch, plus a
//! `revision` drawn from a database-wide counter on every insert or refresh.
//! Evictions compare the revision, so a refresh within the same millisecond
//! still fences off a reader's delete.

use rusqlite::Connection;

use crate::error::Result;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS constant (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    value TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS summoner (
    platform TEXT NOT NULL,
    id TEXT NOT NULL,
    account_id TEXT NOT NULL,
    puuid TEXT NOT NULL,
    name TEXT NOT NULL,
    normalized_name TEXT NOT NULL,
    summoner_level INTEGER NOT NULL,
    profile_icon_id INTEGER NOT NULL,
    revision_date INTEGER NOT NULL,
    last_update INTEGER NOT NULL,
    revision INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (platform, id)
);
CREATE INDEX IF NOT EXISTS summoner_account_id ON summoner (platform, account_id);
CREATE INDEX IF NOT EXISTS summoner_puuid ON summoner (platform, puuid);
CREATE INDEX IF NOT EXISTS summoner_normalized_name ON summoner (platform, normalized_name);

CREATE TABLE IF NOT EXISTS champion_rotation (
    platform TEXT PRIMARY KEY,
    max_new_player_level INTEGER NOT NULL,
    last_update INTEGER NOT NULL,
    revision INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS champion_rotation_free (
    platform TEXT NOT NULL REFERENCES champion_rotation (platform) ON DELETE CASCADE,
    for_new_players INTEGER NOT NULL,
    position INTEGER NOT NULL,
    champion_id INTEGER NOT NULL,
    PRIMARY KEY (platform, for_new_players, position)
);

CREATE TABLE IF NOT EXISTS champion_mastery (
    platform TEXT NOT NULL,
    summoner_id TEXT NOT NULL,
    champion_id INTEGER NOT NULL,
    champion_level INTEGER NOT NULL,
    champion_points INTEGER NOT NULL,
    champion_points_until_next_level INTEGER NOT NULL,
    champion_points_since_last_level INTEGER NOT NULL,
    last_play_time INTEGER NOT NULL,
    chest_granted INTEGER NOT NULL,
    last_update INTEGER NOT NULL,
    revision INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (platform, summoner_id, champion_id)
);

CREATE TABLE IF NOT EXISTS league (
    platform TEXT NOT NULL,
    league_id TEXT NOT NULL,
    name TEXT NOT NULL,
    tier INTEGER NOT NULL,
    queue_id INTEGER NOT NULL REFERENCES constant (id),
    complete INTEGER NOT NULL,
    last_update INTEGER NOT NULL,
    revision INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (platform, league_id)
);
CREATE INDEX IF NOT EXISTS league_queue_tier ON league (platform, queue_id, tier);

CREATE TABLE IF NOT EXISTS league_position (
    platform TEXT NOT NULL,
    league_id TEXT NOT NULL,
    player_or_team_id TEXT NOT NULL,
    player_or_team_name TEXT NOT NULL,
    league_points INTEGER NOT NULL,
    rank INTEGER NOT NULL,
    wins INTEGER NOT NULL,
    losses INTEGER NOT NULL,
    veteran INTEGER NOT NULL,
    inactive INTEGER NOT NULL,
    fresh_blood INTEGER NOT NULL,
    hot_streak INTEGER NOT NULL,
    last_update INTEGER NOT NULL,
    PRIMARY KEY (platform, league_id, player_or_team_id),
    FOREIGN KEY (platform, league_id) REFERENCES league (platform, league_id) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS league_position_player ON league_position (platform, player_or_team_id);

CREATE TABLE IF NOT EXISTS league_miniseries (
    platform TEXT NOT NULL,
    league_id TEXT NOT NULL,
    player_or_team_id TEXT NOT NULL,
    target INTEGER NOT NULL,
    wins INTEGER NOT NULL,
    losses INTEGER NOT NULL,
    progress TEXT NOT NULL,
    PRIMARY KEY (platform, league_id, player_or_team_id),
    FOREIGN KEY (platform, league_id, player_or_team_id)
        REFERENCES league_position (platform, league_id, player_or_team_id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS league_positions (
    platform TEXT NOT NULL,
    summoner_id TEXT NOT NULL,
    last_update INTEGER NOT NULL,
    revision INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (platform, summoner_id)
);

CREATE TABLE IF NOT EXISTS "match" (
    platform TEXT NOT NULL,
    game_id INTEGER NOT NULL,
    game_creation INTEGER NOT NULL,
    game_duration INTEGER NOT NULL,
    queue_id INTEGER NOT NULL,
    map_id INTEGER NOT NULL,
    season_id INTEGER NOT NULL,
    game_version TEXT NOT NULL,
    game_mode_id INTEGER NOT NULL REFERENCES constant (id),
    game_type_id INTEGER NOT NULL REFERENCES constant (id),
    last_update INTEGER NOT NULL,
    revision INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (platform, game_id)
);

CREATE TABLE IF NOT EXISTS match_participant (
    platform TEXT NOT NULL,
    game_id INTEGER NOT NULL,
    participant_id INTEGER NOT NULL,
    team_id INTEGER NOT NULL,
    champion_id INTEGER NOT NULL,
    spell1_id INTEGER NOT NULL,
    spell2_id INTEGER NOT NULL,
    PRIMARY KEY (platform, game_id, participant_id),
    FOREIGN KEY (platform, game_id) REFERENCES "match" (platform, game_id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS match_participant_stats (
    platform TEXT NOT NULL,
    game_id INTEGER NOT NULL,
    participant_id INTEGER NOT NULL,
    win INTEGER NOT NULL,
    kills INTEGER NOT NULL,
    deaths INTEGER NOT NULL,
    assists INTEGER NOT NULL,
    largest_killing_spree INTEGER NOT NULL,
    gold_earned INTEGER NOT NULL,
    champ_level INTEGER NOT NULL,
    total_damage_dealt INTEGER NOT NULL,
    total_minions_killed INTEGER NOT NULL,
    vision_score INTEGER NOT NULL,
    item0 INTEGER NOT NULL,
    item1 INTEGER NOT NULL,
    item2 INTEGER NOT NULL,
    item3 INTEGER NOT NULL,
    item4 INTEGER NOT NULL,
    item5 INTEGER NOT NULL,
    item6 INTEGER NOT NULL,
    PRIMARY KEY (platform, game_id, participant_id),
    FOREIGN KEY (platform, game_id, participant_id)
        REFERENCES match_participant (platform, game_id, participant_id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS match_participant_timeline (
    platform TEXT NOT NULL,
    game_id INTEGER NOT NULL,
    participant_id INTEGER NOT NULL,
    lane TEXT NOT NULL,
    role TEXT NOT NULL,
    PRIMARY KEY (platform, game_id, participant_id),
    FOREIGN KEY (platform, game_id, participant_id)
        REFERENCES match_participant (platform, game_id, participant_id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS match_participant_timeline_delta (
    platform TEXT NOT NULL,
    game_id INTEGER NOT NULL,
    participant_id INTEGER NOT NULL,
    delta_type_id INTEGER NOT NULL REFERENCES constant (id),
    interval TEXT NOT NULL,
    value REAL NOT NULL,
    PRIMARY KEY (platform, game_id, participant_id, delta_type_id, interval),
    FOREIGN KEY (platform, game_id, participant_id)
        REFERENCES match_participant_timeline (platform, game_id, participant_id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS match_timeline (
    platform TEXT NOT NULL,
    match_id INTEGER NOT NULL,
    frame_interval INTEGER NOT NULL,
    last_update INTEGER NOT NULL,
    revision INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (platform, match_id)
);

CREATE TABLE IF NOT EXISTS match_timeline_frame (
    platform TEXT NOT NULL,
    match_id INTEGER NOT NULL,
    frame_index INTEGER NOT NULL,
    timestamp INTEGER NOT NULL,
    PRIMARY KEY (platform, match_id, frame_index),
    FOREIGN KEY (platform, match_id) REFERENCES match_timeline (platform, match_id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS match_timeline_participant_frame (
    platform TEXT NOT NULL,
    match_id INTEGER NOT NULL,
    frame_index INTEGER NOT NULL,
    participant_key TEXT NOT NULL,
    participant_id INTEGER NOT NULL,
    level INTEGER NOT NULL,
    current_gold INTEGER NOT NULL,
    total_gold INTEGER NOT NULL,
    xp INTEGER NOT NULL,
    minions_killed INTEGER NOT NULL,
    jungle_minions_killed INTEGER NOT NULL,
    position_x INTEGER,
    position_y INTEGER,
    PRIMARY KEY (platform, match_id, frame_index, participant_key),
    FOREIGN KEY (platform, match_id, frame_index)
        REFERENCES match_timeline_frame (platform, match_id, frame_index) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS match_timeline_event (
    platform TEXT NOT NULL,
    match_id INTEGER NOT NULL,
    frame_index INTEGER NOT NULL,
    event_index INTEGER NOT NULL,
    type_id INTEGER NOT NULL REFERENCES constant (id),
    timestamp INTEGER NOT NULL,
    participant_id INTEGER,
    item_id INTEGER,
    skill_slot INTEGER,
    creator_id INTEGER,
    killer_id INTEGER,
    victim_id INTEGER,
    team_id INTEGER,
    after_id INTEGER,
    before_id INTEGER,
    assisting_participant_ids TEXT NOT NULL,
    position_x INTEGER,
    position_y INTEGER,
    ward_type_id INTEGER REFERENCES constant (id),
    level_up_type_id INTEGER REFERENCES constant (id),
    monster_type_id INTEGER REFERENCES constant (id),
    monster_sub_type_id INTEGER REFERENCES constant (id),
    building_type_id INTEGER REFERENCES constant (id),
    tower_type_id INTEGER REFERENCES constant (id),
    lane_type_id INTEGER REFERENCES constant (id),
    PRIMARY KEY (platform, match_id, frame_index, event_index),
    FOREIGN KEY (platform, match_id, frame_index)
        REFERENCES match_timeline_frame (platform, match_id, frame_index) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS current_game (
    platform TEXT NOT NULL,
    game_id INTEGER NOT NULL,
    game_start_time INTEGER NOT NULL,
    game_mode_id INTEGER NOT NULL REFERENCES constant (id),
    map_id INTEGER NOT NULL,
    game_type_id INTEGER NOT NULL REFERENCES constant (id),
    game_queue_config_id INTEGER NOT NULL,
    game_length INTEGER NOT NULL,
    encryption_key TEXT NOT NULL,
    featured INTEGER NOT NULL,
    last_update INTEGER NOT NULL,
    revision INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (platform, game_id)
);

CREATE TABLE IF NOT EXISTS current_game_participant (
    platform TEXT NOT NULL,
    game_id INTEGER NOT NULL,
    position INTEGER NOT NULL,
    team_id INTEGER NOT NULL,
    spell1_id INTEGER NOT NULL,
    spell2_id INTEGER NOT NULL,
    champion_id INTEGER NOT NULL,
    profile_icon_id INTEGER NOT NULL,
    summoner_name TEXT NOT NULL,
    bot INTEGER NOT NULL,
    summoner_id TEXT NOT NULL,
    PRIMARY KEY (platform, game_id, position),
    FOREIGN KEY (platform, game_id) REFERENCES current_game (platform, game_id) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS current_game_participant_summoner
    ON current_game_participant (platform, summoner_id);

CREATE TABLE IF NOT EXISTS current_game_ban (
    platform TEXT NOT NULL,
    game_id INTEGER NOT NULL,
    position INTEGER NOT NULL,
    pick_turn INTEGER NOT NULL,
    team_id INTEGER NOT NULL,
    champion_id INTEGER NOT NULL,
    PRIMARY KEY (platform, game_id, position),
    FOREIGN KEY (platform, game_id) REFERENCES current_game (platform, game_id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS shard_status (
    region TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    slug TEXT NOT NULL,
    hostname TEXT NOT NULL,
    locales TEXT NOT NULL,
    services TEXT NOT NULL,
    last_update INTEGER NOT NULL,
    revision INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS row_revision (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    value INTEGER NOT NULL
);
INSERT OR IGNORE INTO row_revision (id, value) VALUES (1, 0);

CREATE TRIGGER IF NOT EXISTS league_drops_positions_markers BEFORE DELETE ON league BEGIN
    DELETE FROM league_positions
    WHERE platform = OLD.platform
      AND summoner_id IN (
          SELECT player_or_team_id FROM league_position
          WHERE platform = OLD.platform AND league_id = OLD.league_id
      );
END;

CREATE TRIGGER IF NOT EXISTS league_position_drops_positions_marker AFTER DELETE ON league_position BEGIN
    DELETE FROM league_positions
    WHERE platform = OLD.platform AND summoner_id = OLD.player_or_team_id;
END;
"#;

/// Every table name, parents before children.
pub const TABLES: [&str; 22] = [
    "constant",
    "summoner",
    "champion_rotation",
    "champion_rotation_free",
    "champion_mastery",
    "league",
    "league_position",
    "league_miniseries",
    "league_positions",
    "match",
    "match_participant",
    "match_participant_stats",
    "match_participant_timeline",
    "match_participant_timeline_delta",
    "match_timeline",
    "match_timeline_frame",
    "match_timeline_participant_frame",
    "match_timeline_event",
    "current_game",
    "current_game_participant",
    "current_game_ban",
    "shard_status",
];

/// Tables whose rows carry `last_update` and `revision`.
pub const MARKER_TABLES: [&str; 9] = [
    "summoner",
    "champion_rotation",
    "champion_mastery",
    "league",
    "league_positions",
    "match",
    "match_timeline",
    "current_game",
    "shard_status",
];

fn revision_triggers(table: &str) -> String {
    let bump = format!(
        "UPDATE row_revision SET value = value + 1;
         UPDATE \"{table}\" SET revision = (SELECT value FROM row_revision) WHERE rowid = NEW.rowid;"
    );
    format!(
        "CREATE TRIGGER IF NOT EXISTS {table}_revision_on_insert AFTER INSERT ON \"{table}\" BEGIN {bump} END;
         CREATE TRIGGER IF NOT EXISTS {table}_revision_on_refresh AFTER UPDATE OF last_update ON \"{table}\" BEGIN {bump} END;"
    )
}

/// Creates any missing table, index or trigger. Safe to run against an
/// existing database.
pub fn create(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    for table in MARKER_TABLES {
        conn.execute_batch(&revision_triggers(table))?;
    }
    Ok(())
}
