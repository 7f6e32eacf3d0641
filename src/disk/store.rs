//! Disk Store
//!
//! The key-value cache engine. Every value lives in its own file, keyed by
//! [`keys::value_keys`]; the file holds a [`StoredRecord`] with the ttl that
//! applied when it was written. Puts are first-write-wins, reads evict stale
//! records, and eviction only removes the generation the reader saw.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::file_store::FileStore;
use super::keys::{self, SummonerField};
use super::record::{RecordHeader, StoredRecord};
use crate::clock::{system_clock, SharedClock};
use crate::datastore::{ensure_kind, expand_and_collect, DataSink, DataSource};
use crate::dto::{Dto, StaticDataDto};
use crate::error::{Result, StoreError};
use crate::expiration::{ExpirationPolicy, Ttl};
use crate::kind::EntityKind;
use crate::query::Query;
use crate::stats::{StatsRecorder, StoreStats};

// == Disk Store ==
pub struct DiskStore {
    files: FileStore,
    policy: ExpirationPolicy,
    clock: SharedClock,
    stats: StatsRecorder,
    upstream: Option<Arc<dyn DataSource>>,
}

impl std::fmt::Debug for DiskStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskStore")
            .field("root", &self.files.root())
            .field("upstream", &self.upstream.is_some())
            .finish()
    }
}

impl DiskStore {
    /// Opens a store under `root` with the default expiration table.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(root, HashMap::new(), system_clock())
    }

    /// Opens a store with per-kind ttl overrides and an explicit clock.
    pub fn open_with(
        root: impl AsRef<Path>,
        overrides: HashMap<EntityKind, Ttl>,
        clock: SharedClock,
    ) -> Result<Self> {
        let files = FileStore::open(root)?;
        info!("Disk store opened at {}", files.root().display());
        Ok(Self {
            files,
            policy: ExpirationPolicy::disk_defaults().with_overrides(overrides),
            clock,
            stats: StatsRecorder::new(),
            upstream: None,
        })
    }

    /// Attaches a source used to fill owning lists on a parent lookup miss.
    pub fn with_upstream(mut self, upstream: Arc<dyn DataSource>) -> Self {
        self.upstream = Some(upstream);
        self
    }

    pub fn stats(&self) -> StoreStats {
        self.stats.snapshot()
    }

    pub fn policy(&self) -> &ExpirationPolicy {
        &self.policy
    }

    pub fn root(&self) -> &Path {
        self.files.root()
    }

    /// Whether a record, fresh or stale, is stored under `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.files.contains(key)
    }

    // == Record Access ==
    /// Reads the value under `key`, evicting it if stale or unreadable.
    fn load(&self, key: &str) -> Result<Option<Dto>> {
        let bytes = match self.files.read(key)? {
            Some(bytes) => bytes,
            None => return Ok(None),
        };

        let record = match StoredRecord::from_bytes(&bytes) {
            Ok(record) => record,
            Err(e) => {
                warn!("Unreadable record {}: {}", key, e);
                self.files.remove_if(key, |current| current == bytes.as_slice())?;
                return Ok(None);
            }
        };

        if record.header().is_expired(self.clock.now()) {
            self.evict(key, &record.header())?;
            return Ok(None);
        }
        Ok(Some(record.payload))
    }

    /// Removes `key` if it still holds the generation in `seen`.
    fn evict(&self, key: &str, seen: &RecordHeader) -> Result<bool> {
        let removed = self.files.remove_if(key, |current| {
            RecordHeader::from_bytes(current)
                .map(|header| header.generation == seen.generation)
                .unwrap_or(false)
        })?;
        if removed {
            self.stats.record_evictions(1);
            debug!("Evicted stale record {}", key);
        }
        Ok(removed)
    }

    fn load_key(&self, key: &str) -> Result<Dto> {
        self.load(key)?
            .ok_or_else(|| StoreError::not_found(key.to_string()))
    }

    // == Lookups ==
    fn lookup(&self, kind: EntityKind, query: &Query) -> Result<Dto> {
        match kind {
            EntityKind::Summoner => self.find_summoner(query),
            EntityKind::ChampionMastery => {
                if query.contains("champion.id") {
                    if let Some(value) = self.load(&keys::query_key(kind, query)?)? {
                        return Ok(value);
                    }
                }
                self.find_mastery(query)
            }
            _ if kind.parent().is_some() => {
                if query.contains("id") {
                    if let Some(value) = self.load(&keys::query_key(kind, query)?)? {
                        return Ok(value);
                    }
                }
                self.find_static_entry(kind, query)
            }
            _ => self.load_key(&keys::query_key(kind, query)?),
        }
    }

    /// Scans the platform's summoner keys for a record matching the query.
    fn find_summoner(&self, query: &Query) -> Result<Dto> {
        let field = SummonerField::from_query(query)?;
        let prefix = keys::summoner_prefix(query.platform()?);

        for key in self.files.keys_with_prefix(&prefix)? {
            let components: Vec<&str> = key[prefix.len()..].split('.').collect();
            if !field.key_may_match(&components) {
                continue;
            }
            if let Some(Dto::Summoner(summoner)) = self.load(&key)? {
                if field.matches(&summoner) {
                    return Ok(Dto::Summoner(summoner));
                }
            }
        }
        Err(StoreError::not_found(format!("no summoner matching {:?}", field)))
    }

    /// Resolves a single static entry through its owning list.
    fn find_static_entry(&self, kind: EntityKind, query: &Query) -> Result<Dto> {
        let parent = kind
            .parent()
            .ok_or_else(|| StoreError::validation(format!("{} has no owning list", kind)))?;

        let id = query.opt_int("id")?;
        let name = query.opt_string("name")?;
        if id.is_none() && name.is_none() {
            return Err(StoreError::validation(format!("{} lookup needs `id` or `name`", kind)));
        }

        let mut list_query = query.clone();
        list_query.remove("id");
        list_query.remove("name");
        let owner = self.get_or_fetch(parent, &list_query)?;
        let list = owner
            .as_static_list()
            .ok_or_else(|| StoreError::not_found(format!("{} is not a list", parent)))?;

        let entry = match (id, name.as_deref()) {
            (Some(id), _) => list.find_by_id(id),
            (None, Some(name)) => list.find_by_name(name),
            (None, None) => None,
        }
        .ok_or_else(|| StoreError::not_found(format!("no {} in {}", kind, parent)))?;

        let single = StaticDataDto {
            region: list.region,
            version: list.version.clone(),
            locale: list.locale.clone(),
            included_data: list.included_data.clone(),
            entry: entry.clone(),
        };
        Dto::static_entry(parent, single)
            .ok_or_else(|| StoreError::validation(format!("{} has no single-entry kind", parent)))
    }

    /// Resolves one champion mastery through the summoner's mastery list.
    fn find_mastery(&self, query: &Query) -> Result<Dto> {
        let champion_id = query.int("champion.id")?;
        let mut list_query = query.clone();
        list_query.remove("champion.id");

        match self.get_or_fetch(EntityKind::ChampionMasteryList, &list_query)? {
            Dto::ChampionMasteryList(list) => list
                .find_champion(champion_id)
                .map(Dto::ChampionMastery)
                .ok_or_else(|| {
                    StoreError::not_found(format!("no mastery for champion {}", champion_id))
                }),
            _ => Err(StoreError::not_found("ChampionMasteryList")),
        }
    }

    /// Reads `kind` from this store, falling back to the upstream source and
    /// caching what it returns.
    fn get_or_fetch(&self, kind: EntityKind, query: &Query) -> Result<Dto> {
        match self.lookup(kind, query) {
            Err(StoreError::NotFound(miss)) => match &self.upstream {
                Some(upstream) if upstream.supports(kind) => {
                    debug!("{} missed ({}), filling from upstream", kind, miss);
                    let value = upstream.get(kind, query)?;
                    self.put(kind, &value)?;
                    Ok(value)
                }
                _ => Err(StoreError::NotFound(miss)),
            },
            other => other,
        }
    }

    fn keys_of(&self, kind: Option<EntityKind>) -> Result<Vec<String>> {
        let all = self.files.keys()?;
        Ok(match kind {
            Some(kind) => all
                .into_iter()
                .filter(|key| keys::belongs_to(key, kind))
                .collect(),
            None => all,
        })
    }
}

// == Contract ==
impl DataSource for DiskStore {
    fn supports(&self, _kind: EntityKind) -> bool {
        true
    }

    fn get(&self, kind: EntityKind, query: &Query) -> Result<Dto> {
        let result = self.lookup(kind, query);
        match &result {
            Ok(_) => self.stats.record_hit(),
            Err(StoreError::NotFound(miss)) => {
                self.stats.record_miss();
                debug!("Cache miss: {}", miss);
            }
            Err(_) => {}
        }
        result
    }

    /// A mastery query without a champion returns the summoner's whole list.
    fn get_many(&self, kind: EntityKind, query: &Query) -> Result<Vec<Dto>> {
        if kind == EntityKind::ChampionMastery
            && !query.contains("champion.id")
            && !query.contains("champion.ids")
        {
            let list = self.get(EntityKind::ChampionMasteryList, query)?;
            let masteries: Vec<Dto> = match list {
                Dto::ChampionMasteryList(list) => list
                    .masteries
                    .iter()
                    .filter_map(|m| list.find_champion(m.champion_id))
                    .map(Dto::ChampionMastery)
                    .collect(),
                _ => Vec::new(),
            };
            if masteries.is_empty() {
                return Err(StoreError::not_found("no champion masteries"));
            }
            return Ok(masteries);
        }

        expand_and_collect(self, kind, query)
    }
}

impl DataSink for DiskStore {
    fn put(&self, kind: EntityKind, value: &Dto) -> Result<()> {
        ensure_kind(kind, value)?;

        let ttl = self.policy.ttl(kind);
        if ttl.is_never() {
            self.stats.record_skipped_write();
            debug!("{} is never cached, skipping put", kind);
            return Ok(());
        }

        let keys = keys::value_keys(value);
        if keys.is_empty() {
            self.stats.record_skipped_write();
            debug!("{} value has no key, skipping put", kind);
            return Ok(());
        }

        let bytes = StoredRecord::new(value.clone(), ttl, self.clock.now()).to_bytes()?;
        for key in keys {
            if self.files.insert_new(&key, &bytes)? {
                self.stats.record_write();
                debug!("Stored {}", key);
            } else {
                self.stats.record_skipped_write();
                debug!("{} already present, keeping first write", key);
            }
        }
        Ok(())
    }

    fn clear(&self, kind: Option<EntityKind>) -> Result<usize> {
        let mut removed = 0;
        for key in self.keys_of(kind)? {
            if self.files.remove(&key)? {
                removed += 1;
            }
        }
        info!("Cleared {} records", removed);
        Ok(removed)
    }

    fn expire(&self, kind: Option<EntityKind>) -> Result<usize> {
        let now = self.clock.now();
        let mut evicted = 0;
        for key in self.keys_of(kind)? {
            let bytes = match self.files.read(&key)? {
                Some(bytes) => bytes,
                None => continue,
            };
            match RecordHeader::from_bytes(&bytes) {
                Ok(header) if header.is_expired(now) => {
                    if self.evict(&key, &header)? {
                        evicted += 1;
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("Unreadable record {}: {}", key, e);
                    if self.files.remove_if(&key, |current| current == bytes.as_slice())? {
                        evicted += 1;
                    }
                }
            }
        }
        if evicted > 0 {
            info!("Expired {} disk records", evicted);
        }
        Ok(evicted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::data::{Platform, Region};
    use crate::dto::{
        ChampionMasteryDto, ChampionMasteryListDto, CurrentGameInfoDto, CurrentGameParticipantDto,
        ObserverDto, StaticDataListDto, StaticEntryDto, SummonerDto, VersionListDto,
    };
    use chrono::Duration;
    use std::collections::{BTreeMap, BTreeSet};
    use tempfile::TempDir;

    fn store(overrides: HashMap<EntityKind, Ttl>) -> (TempDir, Arc<ManualClock>, DiskStore) {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::at_unix_seconds(1_000_000));
        let store = DiskStore::open_with(dir.path(), overrides, clock.clone()).unwrap();
        (dir, clock, store)
    }

    fn versions(list: &[&str]) -> Dto {
        Dto::Versions(VersionListDto {
            region: Region::NorthAmerica,
            versions: list.iter().map(|v| v.to_string()).collect(),
        })
    }

    fn na() -> Query {
        Query::new().with("platform", Platform::Na1)
    }

    fn summoner() -> SummonerDto {
        SummonerDto {
            platform: Platform::Na1,
            id: "abc123".to_string(),
            account_id: "acc456".to_string(),
            puuid: "xyz789".to_string(),
            name: "Foo Bar".to_string(),
            summoner_level: 30,
            profile_icon_id: 7,
            revision_date: 1,
        }
    }

    fn item_list() -> Dto {
        let entry = |id: i64, name: &str| StaticEntryDto {
            id: Some(id),
            name: Some(name.to_string()),
            ..Default::default()
        };
        Dto::ItemList(StaticDataListDto {
            region: Region::NorthAmerica,
            version: "13.1.1".to_string(),
            locale: "en_US".to_string(),
            included_data: BTreeSet::from(["all".to_string()]),
            data_by_id: None,
            data: BTreeMap::from([
                ("1001".to_string(), entry(1001, "Boots")),
                ("3031".to_string(), entry(3031, "Infinity Edge")),
            ]),
        })
    }

    fn static_query() -> Query {
        na().with("version", "13.1.1").with("locale", "en_US")
    }

    #[test]
    fn test_put_then_get() {
        let (_dir, _clock, store) = store(HashMap::new());
        store.put(EntityKind::Versions, &versions(&["13.1.1"])).unwrap();
        assert_eq!(store.get(EntityKind::Versions, &na()).unwrap(), versions(&["13.1.1"]));
        assert_eq!(store.stats().hits, 1);
    }

    #[test]
    fn test_first_write_wins() {
        let (_dir, _clock, store) = store(HashMap::new());
        store.put(EntityKind::Versions, &versions(&["a"])).unwrap();
        store.put(EntityKind::Versions, &versions(&["b"])).unwrap();
        assert_eq!(store.get(EntityKind::Versions, &na()).unwrap(), versions(&["a"]));
        assert_eq!(store.stats().skipped_writes, 1);
    }

    #[test]
    fn test_expired_record_is_evicted() {
        let overrides = HashMap::from([(EntityKind::Versions, Ttl::seconds(60))]);
        let (_dir, clock, store) = store(overrides);
        store.put(EntityKind::Versions, &versions(&["a"])).unwrap();

        clock.advance(Duration::seconds(60));
        assert!(store.get(EntityKind::Versions, &na()).unwrap_err().is_not_found());
        assert!(!store.contains_key("Versions.NA1"));
        assert_eq!(store.stats().evictions, 1);
    }

    #[test]
    fn test_never_cache_kind() {
        let overrides = HashMap::from([(EntityKind::Versions, Ttl::Never)]);
        let (_dir, _clock, store) = store(overrides);
        store.put(EntityKind::Versions, &versions(&["a"])).unwrap();
        assert!(store.get(EntityKind::Versions, &na()).is_err());
    }

    #[test]
    fn test_kind_mismatch_is_rejected() {
        let (_dir, _clock, store) = store(HashMap::new());
        let err = store.put(EntityKind::Realms, &versions(&["a"])).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn test_corrupt_record_is_a_miss() {
        let (dir, _clock, store) = store(HashMap::new());
        std::fs::write(dir.path().join("Versions.NA1"), b"garbage").unwrap();
        assert!(store.get(EntityKind::Versions, &na()).unwrap_err().is_not_found());
        store.put(EntityKind::Versions, &versions(&["a"])).unwrap();
        assert_eq!(store.get(EntityKind::Versions, &na()).unwrap(), versions(&["a"]));
    }

    #[test]
    fn test_summoner_lookup_by_each_field() {
        let (_dir, _clock, store) = store(HashMap::new());
        let value = Dto::Summoner(summoner());
        store.put(EntityKind::Summoner, &value).unwrap();

        for query in [
            na().with("id", "abc123"),
            na().with("puuid", "xyz789"),
            na().with("accountId", "acc456"),
            na().with("name", "foo bar"),
        ] {
            assert_eq!(store.get(EntityKind::Summoner, &query).unwrap(), value);
        }
        assert!(store
            .get(EntityKind::Summoner, &na().with("name", "someone else"))
            .is_err());
    }

    #[test]
    fn test_static_entry_from_list() {
        let (_dir, _clock, store) = store(HashMap::new());
        store.put(EntityKind::ItemList, &item_list()).unwrap();

        let by_id = store
            .get(EntityKind::Item, &static_query().with("id", 3031))
            .unwrap();
        let by_name = store
            .get(EntityKind::Item, &static_query().with("name", "Infinity Edge"))
            .unwrap();
        assert_eq!(by_id, by_name);
        match by_id {
            Dto::Item(item) => assert_eq!(item.entry.id, Some(3031)),
            other => panic!("unexpected {:?}", other),
        }
        assert!(store
            .get(EntityKind::Item, &static_query().with("id", 9))
            .unwrap_err()
            .is_not_found());
    }

    /// An upstream that only knows the item list.
    struct ItemsUpstream;

    impl DataSource for ItemsUpstream {
        fn supports(&self, kind: EntityKind) -> bool {
            kind == EntityKind::ItemList
        }

        fn get(&self, _kind: EntityKind, _query: &Query) -> Result<Dto> {
            Ok(item_list())
        }
    }

    #[test]
    fn test_parent_list_filled_from_upstream() {
        let (_dir, _clock, store) = store(HashMap::new());
        let store = store.with_upstream(Arc::new(ItemsUpstream));

        let item = store
            .get(EntityKind::Item, &static_query().with("id", 1001))
            .unwrap();
        assert_eq!(item.kind(), EntityKind::Item);
        assert!(store.get(EntityKind::ItemList, &static_query()).is_ok());
    }

    #[test]
    fn test_mastery_through_list() {
        let (_dir, _clock, store) = store(HashMap::new());
        let mastery = |champion_id| ChampionMasteryDto {
            region: None,
            summoner_id: "abc123".to_string(),
            champion_id,
            champion_level: 5,
            champion_points: 1000,
            champion_points_until_next_level: 0,
            champion_points_since_last_level: 0,
            last_play_time: 0,
            chest_granted: false,
        };
        let list = Dto::ChampionMasteryList(ChampionMasteryListDto {
            region: Region::NorthAmerica,
            summoner_id: "abc123".to_string(),
            masteries: vec![mastery(1), mastery(2)],
        });
        store.put(EntityKind::ChampionMasteryList, &list).unwrap();

        let query = na().with("summoner.id", "abc123");
        let one = store
            .get(EntityKind::ChampionMastery, &query.clone().with("champion.id", 2))
            .unwrap();
        match one {
            Dto::ChampionMastery(m) => {
                assert_eq!(m.champion_id, 2);
                assert_eq!(m.region, Some(Region::NorthAmerica));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(store.get_many(EntityKind::ChampionMastery, &query).unwrap().len(), 2);
    }

    #[test]
    fn test_current_game_stored_per_participant() {
        let (_dir, _clock, store) = store(HashMap::new());
        let participant = |id: &str| CurrentGameParticipantDto {
            team_id: 100,
            spell1_id: 4,
            spell2_id: 14,
            champion_id: 1,
            profile_icon_id: 1,
            summoner_name: id.to_string(),
            bot: false,
            summoner_id: id.to_string(),
        };
        let game = Dto::CurrentGame(CurrentGameInfoDto {
            platform_id: Platform::Na1,
            game_id: 9,
            game_start_time: 0,
            game_mode: "CLASSIC".to_string(),
            map_id: 11,
            game_type: "MATCHED_GAME".to_string(),
            game_queue_config_id: 420,
            game_length: 60,
            observers: ObserverDto {
                encryption_key: "k".to_string(),
            },
            participants: vec![participant("s1"), participant("s2")],
            banned_champions: vec![],
        });
        store.put(EntityKind::CurrentGame, &game).unwrap();

        for id in ["s1", "s2"] {
            let query = na().with("summoner.id", id);
            assert_eq!(store.get(EntityKind::CurrentGame, &query).unwrap(), game);
        }
    }

    #[test]
    fn test_clear_by_kind() {
        let (_dir, _clock, store) = store(HashMap::new());
        store.put(EntityKind::Versions, &versions(&["a"])).unwrap();
        store.put(EntityKind::ItemList, &item_list()).unwrap();

        assert_eq!(store.clear(Some(EntityKind::Versions)).unwrap(), 1);
        assert!(store.get(EntityKind::Versions, &na()).is_err());
        assert!(store.get(EntityKind::ItemList, &static_query()).is_ok());
        assert_eq!(store.clear(None).unwrap(), 1);
    }

    #[test]
    fn test_expire_sweep() {
        let overrides = HashMap::from([(EntityKind::Versions, Ttl::seconds(10))]);
        let (_dir, clock, store) = store(overrides);
        store.put(EntityKind::Versions, &versions(&["a"])).unwrap();
        store.put(EntityKind::ItemList, &item_list()).unwrap();

        assert_eq!(store.expire(None).unwrap(), 0);
        clock.advance(Duration::seconds(11));
        assert_eq!(store.expire(None).unwrap(), 1);
        assert!(!store.contains_key("Versions.NA1"));
        assert!(store.get(EntityKind::ItemList, &static_query()).is_ok());
    }
}
