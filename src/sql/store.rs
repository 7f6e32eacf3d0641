//! SQL Store
//!
//! The relational cache engine. Reads run in a deferred transaction and hand
//! back the `last_update` of every row they used; if any of those rows is
//! stale the read is a miss and exactly those rows are deleted, unless a
//! writer refreshed them in between. Writes run in immediate transactions so
//! multi-table reconciliation commits as a whole.

use std::collections::HashMap;
use std::path::Path;

use rusqlite::{Connection, ErrorCode, TransactionBehavior};
use tracing::{debug, info, warn};

use super::constants::ConstantCache;
use super::pool::ConnectionPool;
use super::rows::{to_millis, Fetched};
use super::{champion, league, matches, schema, spectator, status, summoner};
use crate::clock::{system_clock, SharedClock};
use crate::data::{Platform, Tier};
use crate::datastore::{ensure_kind, expand_and_collect, DataSink, DataSource};
use crate::disk::keys::SummonerField;
use crate::dto::{ChampionMasteryDto, ChampionMasteryListDto, Dto};
use crate::error::{Result, StoreError};
use crate::expiration::{ExpirationPolicy, Ttl};
use crate::kind::EntityKind;
use crate::query::Query;
use crate::stats::{StatsRecorder, StoreStats};

/// Attempts at a write that keeps hitting a uniqueness race.
const WRITE_ATTEMPTS: usize = 2;

/// Tables carrying a staleness marker, with the kind whose ttl governs them.
const EXPIRING_TABLES: [(EntityKind, &str); 9] = [
    (EntityKind::Summoner, "summoner"),
    (EntityKind::ChampionRotation, "champion_rotation"),
    (EntityKind::ChampionMastery, "champion_mastery"),
    (EntityKind::League, "league"),
    (EntityKind::LeaguePositions, "league_positions"),
    (EntityKind::Match, "match"),
    (EntityKind::Timeline, "match_timeline"),
    (EntityKind::CurrentGame, "current_game"),
    (EntityKind::ShardStatus, "shard_status"),
];

/// The table holding values of `kind`, if this engine stores it.
fn table_of(kind: EntityKind) -> Option<&'static str> {
    let owner = match kind {
        EntityKind::FeaturedGames => EntityKind::CurrentGame,
        EntityKind::ChampionMasteryList => EntityKind::ChampionMastery,
        kind if kind.is_apex_league() => EntityKind::League,
        kind => kind,
    };
    EXPIRING_TABLES
        .iter()
        .find(|(table_kind, _)| *table_kind == owner)
        .map(|(_, table)| *table)
}

fn apex_tier(kind: EntityKind) -> Option<Tier> {
    match kind {
        EntityKind::ChallengerLeague => Some(Tier::Challenger),
        EntityKind::GrandmasterLeague => Some(Tier::Grandmaster),
        EntityKind::MasterLeague => Some(Tier::Master),
        _ => None,
    }
}

/// Primary key or unique violations, which a retry resolves as an update.
/// Foreign key violations are not included.
fn is_uniqueness_race(error: &StoreError) -> bool {
    match error {
        StoreError::Database(rusqlite::Error::SqliteFailure(failure, _)) => {
            failure.code == ErrorCode::ConstraintViolation
                && matches!(
                    failure.extended_code,
                    rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY | rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                )
        }
        _ => false,
    }
}

// == SQL Store ==
#[derive(Debug)]
pub struct SqlStore {
    pool: ConnectionPool,
    constants: ConstantCache,
    policy: ExpirationPolicy,
    clock: SharedClock,
    stats: StatsRecorder,
}

impl SqlStore {
    /// Opens (and if needed creates) the database with the default
    /// expiration table.
    pub fn open(location: impl AsRef<Path>, pool_size: usize) -> Result<Self> {
        Self::open_with(location, pool_size, HashMap::new(), system_clock())
    }

    /// Opens the database with per-kind ttl overrides and an explicit clock.
    pub fn open_with(
        location: impl AsRef<Path>,
        pool_size: usize,
        overrides: HashMap<EntityKind, Ttl>,
        clock: SharedClock,
    ) -> Result<Self> {
        let pool = ConnectionPool::open(location.as_ref(), pool_size)?;
        schema::create(&pool.get())?;
        info!(
            "SQL store opened at {} ({} connections)",
            location.as_ref().display(),
            pool.size()
        );
        Ok(Self {
            pool,
            constants: ConstantCache::new(),
            policy: ExpirationPolicy::sql_defaults().with_overrides(overrides),
            clock,
            stats: StatsRecorder::new(),
        })
    }

    pub fn stats(&self) -> StoreStats {
        self.stats.snapshot()
    }

    pub fn policy(&self) -> &ExpirationPolicy {
        &self.policy
    }

    pub fn pool_size(&self) -> usize {
        self.pool.size()
    }

    // == Read Path ==

    /// Runs a read and applies the staleness rule to every row it touched.
    fn read<T>(&self, kind: EntityKind, fetch: impl FnOnce(&Connection) -> Result<Fetched<T>>) -> Result<T> {
        let ttl = self.policy.ttl(kind);
        let now = self.clock.now();
        let mut conn = self.pool.get();
        // Stale markers pick up their revision from the same snapshot as the
        // value, so a later refresh of the row is never evicted.
        let fetched = {
            let tx = conn.transaction()?;
            let fetched = fetch(&*tx).and_then(|fetched| {
                let Fetched { value, markers } = fetched;
                let mut stale = Vec::new();
                for mut marker in markers {
                    if ttl.is_expired(marker.written_at(), now) {
                        marker.observe_revision(&*tx)?;
                        stale.push(marker);
                    }
                }
                Ok((value, stale))
            });
            tx.commit()?;
            fetched
        };

        let (value, stale) = match fetched {
            Ok(fetched) => fetched,
            Err(e) => {
                if e.is_not_found() {
                    self.stats.record_miss();
                    debug!("SQL miss: {}", e);
                }
                return Err(e);
            }
        };

        if stale.is_empty() {
            self.stats.record_hit();
            return Ok(value);
        }

        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut evicted = 0;
        for marker in &stale {
            evicted += marker.delete_if_unchanged(&tx)?;
        }
        tx.commit()?;

        self.stats.record_evictions(evicted as u64);
        self.stats.record_miss();
        debug!(
            "SQL {}: {} stale rows, {} evicted",
            kind,
            stale.len(),
            evicted
        );
        Err(StoreError::not_found(format!("{} expired", kind)))
    }

    // == Write Path ==

    /// Runs a write in an immediate transaction, retrying once when it races
    /// another writer on a unique key.
    fn write(
        &self,
        kind: EntityKind,
        constants: &[&str],
        apply: impl Fn(&Connection, i64) -> Result<()>,
    ) -> Result<()> {
        if self.policy.ttl(kind).is_never() {
            self.stats.record_skipped_write();
            debug!("Not caching {}: never-cache policy", kind);
            return Ok(());
        }

        let now = to_millis(self.clock.now());
        let mut conn = self.pool.get();
        // Constants commit on their own so the in-memory cache only ever
        // holds ids of committed rows.
        for value in constants {
            self.constants.resolve(&conn, value)?;
        }

        for attempt in 1..=WRITE_ATTEMPTS {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let outcome = apply(&*tx, now).and_then(|()| Ok(tx.commit()?));
            match outcome {
                Ok(()) => {
                    self.stats.record_write();
                    debug!("SQL put {}", kind);
                    return Ok(());
                }
                Err(e) if is_uniqueness_race(&e) && attempt < WRITE_ATTEMPTS => {
                    warn!("{} write raced another writer, retrying: {}", kind, e);
                }
                Err(e) if is_uniqueness_race(&e) => {
                    return Err(StoreError::Conflict(format!(
                        "{} write still conflicts after {} attempts: {}",
                        kind, WRITE_ATTEMPTS, e
                    )));
                }
                Err(e) => return Err(e),
            }
        }
        Err(StoreError::Conflict(format!("{} write was not applied", kind)))
    }

    fn get_masteries(&self, platform: Platform, summoner_id: &str) -> Result<Vec<ChampionMasteryDto>> {
        self.read(EntityKind::ChampionMastery, |conn| {
            champion::get_masteries(conn, platform, summoner_id)
        })
    }
}

impl DataSource for SqlStore {
    fn supports(&self, kind: EntityKind) -> bool {
        table_of(kind).is_some()
    }

    fn get(&self, kind: EntityKind, query: &Query) -> Result<Dto> {
        if !self.supports(kind) {
            return Err(StoreError::validation(format!("SQL store does not cache {}", kind)));
        }
        let platform = query.platform()?;
        let constants = &self.constants;

        match kind {
            EntityKind::Summoner => {
                let field = SummonerField::from_query(query)?;
                self.read(kind, |conn| summoner::get(conn, platform, &field))
                    .map(Dto::Summoner)
            }
            EntityKind::Match => {
                let id = query.int("id")?;
                self.read(kind, |conn| matches::get_match(conn, constants, platform, id))
                    .map(Dto::Match)
            }
            EntityKind::Timeline => {
                let id = query.int("id")?;
                self.read(kind, |conn| matches::get_timeline(conn, constants, platform, id))
                    .map(Dto::Timeline)
            }
            EntityKind::ChampionRotation => self
                .read(kind, |conn| champion::get_rotation(conn, platform))
                .map(Dto::ChampionRotation),
            EntityKind::ChampionMastery => {
                let summoner_id = query.string("summoner.id")?;
                let champion_id = query.int("champion.id")?;
                self.read(kind, |conn| {
                    champion::get_mastery(conn, platform, &summoner_id, champion_id)
                })
                .map(Dto::ChampionMastery)
            }
            EntityKind::ChampionMasteryList => {
                let summoner_id = query.string("summoner.id")?;
                let masteries = self
                    .read(kind, |conn| champion::get_masteries(conn, platform, &summoner_id))?
                    .into_iter()
                    .map(|mastery| ChampionMasteryDto {
                        region: None,
                        ..mastery
                    })
                    .collect();
                Ok(Dto::ChampionMasteryList(ChampionMasteryListDto {
                    region: platform.region(),
                    summoner_id,
                    masteries,
                }))
            }
            EntityKind::League => {
                let id = query.string("id")?;
                self.read(kind, |conn| league::get_league(conn, constants, platform, &id))
                    .map(Dto::League)
            }
            EntityKind::ChallengerLeague | EntityKind::GrandmasterLeague | EntityKind::MasterLeague => {
                let queue = query.string("queue")?;
                let tier = apex_tier(kind)
                    .ok_or_else(|| StoreError::validation(format!("{} has no tier", kind)))?;
                let list = self.read(kind, |conn| {
                    league::get_apex(conn, constants, platform, &queue, tier)
                })?;
                Dto::league_list(kind, list)
                    .ok_or_else(|| StoreError::validation(format!("{} is not a league list", kind)))
            }
            EntityKind::LeaguePositions => {
                let summoner_id = query.string("summoner.id")?;
                self.read(kind, |conn| {
                    league::get_positions(conn, constants, platform, &summoner_id)
                })
                .map(Dto::LeaguePositions)
            }
            EntityKind::CurrentGame => {
                let summoner_id = query.string("summoner.id")?;
                self.read(kind, |conn| {
                    spectator::get_current_game(conn, constants, platform, &summoner_id)
                })
                .map(Dto::CurrentGame)
            }
            EntityKind::FeaturedGames => self
                .read(kind, |conn| spectator::get_featured(conn, constants, platform))
                .map(Dto::FeaturedGames),
            EntityKind::ShardStatus => self
                .read(kind, |conn| status::get_status(conn, platform.region()))
                .map(Dto::ShardStatus),
            other => Err(StoreError::validation(format!("SQL store does not cache {}", other))),
        }
    }

    /// Champion masteries without a champion discriminator are an
    /// all-matching query; everything else expands plural discriminators.
    fn get_many(&self, kind: EntityKind, query: &Query) -> Result<Vec<Dto>> {
        if kind == EntityKind::ChampionMastery
            && !query.contains("champion.id")
            && !query.contains("champion.ids")
        {
            let platform = query.platform()?;
            let summoner_id = query.string("summoner.id")?;
            let masteries = self.get_masteries(platform, &summoner_id)?;
            return Ok(masteries.into_iter().map(Dto::ChampionMastery).collect());
        }
        expand_and_collect(self, kind, query)
    }
}

impl DataSink for SqlStore {
    fn put(&self, kind: EntityKind, value: &Dto) -> Result<()> {
        ensure_kind(kind, value)?;
        let constants = &self.constants;

        match value {
            Dto::Summoner(dto) => self.write(kind, &[], |conn, now| summoner::put(conn, dto, now)),
            Dto::Match(dto) => self.write(kind, &matches::match_constants(dto), |conn, now| {
                matches::put_match(conn, constants, dto, now)
            }),
            Dto::Timeline(dto) => self.write(kind, &matches::timeline_constants(dto), |conn, now| {
                matches::put_timeline(conn, constants, dto, now)
            }),
            Dto::ChampionRotation(dto) => {
                self.write(kind, &[], |conn, now| champion::put_rotation(conn, dto, now))
            }
            Dto::ChampionMastery(dto) => {
                let platform = champion::mastery_platform(dto)?;
                self.write(kind, &[], |conn, now| champion::put_mastery(conn, platform, dto, now))
            }
            Dto::ChampionMasteryList(list) => {
                let platform = list.region.platform();
                self.write(kind, &[], |conn, now| {
                    for mastery in &list.masteries {
                        let owned = ChampionMasteryDto {
                            summoner_id: list.summoner_id.clone(),
                            ..mastery.clone()
                        };
                        champion::put_mastery(conn, platform, &owned, now)?;
                    }
                    Ok(())
                })
            }
            Dto::League(dto) | Dto::ChallengerLeague(dto) | Dto::GrandmasterLeague(dto) | Dto::MasterLeague(dto) => {
                self.write(kind, &[dto.queue.as_str()], |conn, now| {
                    league::put_league(conn, constants, dto, now)
                })
            }
            Dto::LeaguePositions(dto) => {
                let queues: Vec<&str> = dto.positions.iter().map(|p| p.queue_type.as_str()).collect();
                self.write(kind, &queues, |conn, now| {
                    league::put_positions(conn, constants, dto, now)
                })
            }
            Dto::CurrentGame(dto) => self.write(kind, &spectator::game_constants(dto), |conn, now| {
                spectator::put_current_game(conn, constants, dto, false, now)
            }),
            Dto::FeaturedGames(dto) => {
                let values: Vec<&str> = dto.game_list.iter().flat_map(spectator::game_constants).collect();
                self.write(kind, &values, |conn, now| {
                    spectator::put_featured(conn, constants, dto, now)
                })
            }
            Dto::ShardStatus(dto) => self.write(kind, &[], |conn, now| status::put_status(conn, dto, now)),
            other => Err(StoreError::validation(format!(
                "SQL store does not cache {}",
                other.kind()
            ))),
        }
    }

    fn clear(&self, kind: Option<EntityKind>) -> Result<usize> {
        let mut conn = self.pool.get();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let removed = match kind {
            Some(kind) => match table_of(kind) {
                Some(table) => tx.execute(&format!("DELETE FROM \"{}\"", table), [])?,
                None => 0,
            },
            None => {
                let mut removed = 0;
                for (_, table) in EXPIRING_TABLES {
                    removed += tx.execute(&format!("DELETE FROM \"{}\"", table), [])?;
                }
                // Children cascade with their parents; constants go last.
                for table in schema::TABLES.iter().rev() {
                    tx.execute(&format!("DELETE FROM \"{}\"", table), [])?;
                }
                removed
            }
        };
        tx.commit()?;

        if kind.is_none() {
            self.constants.reset();
        }
        info!("Cleared {} rows ({:?})", removed, kind);
        Ok(removed)
    }

    fn expire(&self, kind: Option<EntityKind>) -> Result<usize> {
        let targets: Vec<(EntityKind, &str)> = match kind {
            Some(kind) => table_of(kind).map(|table| (kind, table)).into_iter().collect(),
            None => EXPIRING_TABLES.to_vec(),
        };

        let now = self.clock.now();
        let mut conn = self.pool.get();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut evicted = 0;
        for (kind, table) in targets {
            let cutoff = match self.policy.ttl(kind).cutoff(now) {
                Some(cutoff) => to_millis(cutoff),
                None => continue,
            };
            let removed = tx.execute(
                &format!("DELETE FROM \"{}\" WHERE last_update <= ?1", table),
                [cutoff],
            )?;
            if removed > 0 {
                debug!("Expired {} {} rows", removed, kind);
            }
            evicted += removed;
        }
        tx.commit()?;

        self.stats.record_evictions(evicted as u64);
        info!("SQL expiry sweep evicted {} rows", evicted);
        Ok(evicted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};
    use crate::data::Region;
    use crate::dto::SummonerDto;
    use crate::sql::rows::{text, Marker};
    use chrono::Duration;
    use std::sync::Arc;

    fn open(overrides: HashMap<EntityKind, Ttl>) -> (Arc<ManualClock>, SqlStore) {
        let clock = Arc::new(ManualClock::at_unix_seconds(1_000_000));
        let store = SqlStore::open_with(":memory:", 1, overrides, clock.clone()).unwrap();
        (clock, store)
    }

    fn summoner() -> Dto {
        Dto::Summoner(SummonerDto {
            platform: Platform::Na1,
            id: "abc123".to_string(),
            account_id: "acc".to_string(),
            puuid: "xyz789".to_string(),
            name: "Foo Bar".to_string(),
            summoner_level: 30,
            profile_icon_id: 1,
            revision_date: 0,
        })
    }

    fn by_id() -> Query {
        Query::new().with("platform", Platform::Na1).with("id", "abc123")
    }

    #[test]
    fn test_read_evicts_stale_rows() {
        let (clock, store) = open(HashMap::new());
        store.put(EntityKind::Summoner, &summoner()).unwrap();

        clock.advance(Duration::hours(23));
        assert_eq!(store.get(EntityKind::Summoner, &by_id()).unwrap(), summoner());

        clock.advance(Duration::hours(1));
        assert!(store.get(EntityKind::Summoner, &by_id()).unwrap_err().is_not_found());
        assert!(store.get(EntityKind::Summoner, &by_id()).unwrap_err().is_not_found());

        let stats = store.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.evictions, 1);
    }

    #[test]
    fn test_same_millisecond_refresh_survives_eviction() {
        let (clock, store) = open(HashMap::new());
        store.put(EntityKind::Summoner, &summoner()).unwrap();

        let mut marker = Marker::new(
            "summoner",
            vec![("platform", text("NA1")), ("id", text("abc123"))],
            to_millis(clock.now()),
        );
        {
            let conn = store.pool.get();
            marker.observe_revision(&conn).unwrap();
        }

        // A writer refreshes the row before the reader's delete lands.
        store.put(EntityKind::Summoner, &summoner()).unwrap();
        let conn = store.pool.get();
        assert_eq!(marker.delete_if_unchanged(&conn).unwrap(), 0);
        drop(conn);

        assert_eq!(store.get(EntityKind::Summoner, &by_id()).unwrap(), summoner());
    }

    #[test]
    fn test_never_ttl_skips_write() {
        let (_clock, store) = open(HashMap::from([(EntityKind::Summoner, Ttl::Never)]));
        store.put(EntityKind::Summoner, &summoner()).unwrap();
        assert!(store.get(EntityKind::Summoner, &by_id()).unwrap_err().is_not_found());
        assert_eq!(store.stats().skipped_writes, 1);
    }

    #[test]
    fn test_unsupported_kind_is_validation_error() {
        let (_clock, store) = open(HashMap::new());
        assert!(!store.supports(EntityKind::ItemList));
        let err = store
            .get(EntityKind::ItemList, &Query::new().with("platform", Platform::Na1))
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn test_kind_mismatch_is_rejected() {
        let (_clock, store) = open(HashMap::new());
        assert!(matches!(
            store.put(EntityKind::Match, &summoner()),
            Err(StoreError::Validation(_))
        ));
    }

    #[test]
    fn test_expire_sweeps_by_kind() {
        let (clock, store) = open(HashMap::new());
        store.put(EntityKind::Summoner, &summoner()).unwrap();
        let rotation = Dto::ChampionRotation(crate::dto::ChampionRotationDto {
            region: Region::NorthAmerica,
            free_champion_ids: vec![1],
            free_champion_ids_for_new_players: vec![],
            max_new_player_level: 10,
        });
        store.put(EntityKind::ChampionRotation, &rotation).unwrap();

        clock.advance(Duration::days(1));
        assert_eq!(store.expire(Some(EntityKind::Summoner)).unwrap(), 1);
        assert_eq!(store.expire(None).unwrap(), 1);
        assert_eq!(store.expire(None).unwrap(), 0);
    }

    #[test]
    fn test_clear_all_resets_constants() {
        let (_clock, store) = open(HashMap::new());
        store.put(EntityKind::Summoner, &summoner()).unwrap();
        assert_eq!(store.clear(None).unwrap(), 1);
        assert!(store.constants.is_empty());
        assert!(store.get(EntityKind::Summoner, &by_id()).unwrap_err().is_not_found());
    }

    #[test]
    fn test_table_aliases() {
        assert_eq!(table_of(EntityKind::FeaturedGames), Some("current_game"));
        assert_eq!(table_of(EntityKind::MasterLeague), Some("league"));
        assert_eq!(table_of(EntityKind::ChampionMasteryList), Some("champion_mastery"));
        assert_eq!(table_of(EntityKind::Patches), None);
    }
}
