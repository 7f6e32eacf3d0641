//! Integration Tests for the Disk Store
//!
//! Drives `DiskStore` through the public datastore contract with a manual
//! clock, checking expiry windows, first-write-wins and key derivation.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::thread;

use chrono::Duration;
use league_cache::dto::{LeagueListDto, StaticDataListDto, StaticEntryDto, SummonerDto};
use league_cache::{
    DataSink, DataSource, DiskStore, Dto, EntityKind, ManualClock, Platform, Query, Region, Tier, Ttl,
};
use tempfile::TempDir;

// == Helper Functions ==

fn open(overrides: HashMap<EntityKind, Ttl>) -> (TempDir, Arc<ManualClock>, DiskStore) {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(ManualClock::at_unix_seconds(1_600_000_000));
    let store = DiskStore::open_with(dir.path(), overrides, clock.clone()).unwrap();
    (dir, clock, store)
}

fn league(id: &str, name: &str) -> Dto {
    Dto::League(LeagueListDto {
        region: Region::NorthAmerica,
        league_id: id.to_string(),
        name: name.to_string(),
        tier: Tier::Gold,
        queue: "RANKED_SOLO_5x5".to_string(),
        entries: vec![],
    })
}

fn league_query(id: &str) -> Query {
    Query::new().with("region", Region::NorthAmerica).with("id", id)
}

fn summoner() -> Dto {
    Dto::Summoner(SummonerDto {
        platform: Platform::Na1,
        id: "abc123".to_string(),
        account_id: "acc456".to_string(),
        puuid: "xyz789".to_string(),
        name: "Foo Bar".to_string(),
        summoner_level: 112,
        profile_icon_id: 4,
        revision_date: 1_599_000_000_000,
    })
}

fn item_list(included: &[&str]) -> Dto {
    Dto::ItemList(StaticDataListDto {
        region: Region::NorthAmerica,
        version: "13.1.1".to_string(),
        locale: "en_US".to_string(),
        included_data: included.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>(),
        data_by_id: None,
        data: BTreeMap::from([(
            "1001".to_string(),
            StaticEntryDto {
                id: Some(1001),
                name: Some("Boots".to_string()),
                ..Default::default()
            },
        )]),
    })
}

// == Expiry ==

#[test]
fn test_sixty_second_window() {
    let (_dir, clock, store) = open(HashMap::from([(EntityKind::League, Ttl::seconds(60))]));
    store.put(EntityKind::League, &league("1", "a")).unwrap();

    clock.advance(Duration::seconds(30));
    assert_eq!(store.get(EntityKind::League, &league_query("1")).unwrap(), league("1", "a"));

    clock.advance(Duration::seconds(31));
    let err = store.get(EntityKind::League, &league_query("1")).unwrap_err();
    assert!(err.is_not_found());
    assert!(!store.contains_key("League.NA1.1"));

    // A second read misses without finding anything to evict.
    assert!(store.get(EntityKind::League, &league_query("1")).unwrap_err().is_not_found());
    assert_eq!(store.stats().evictions, 1);
}

#[test]
fn test_expiry_boundary_is_exclusive() {
    let (_dir, clock, store) = open(HashMap::from([(EntityKind::League, Ttl::seconds(60))]));
    store.put(EntityKind::League, &league("1", "a")).unwrap();

    clock.advance(Duration::milliseconds(59_999));
    assert!(store.get(EntityKind::League, &league_query("1")).is_ok());
    clock.advance(Duration::milliseconds(1));
    assert!(store.get(EntityKind::League, &league_query("1")).unwrap_err().is_not_found());
}

#[test]
fn test_forever_records_never_expire() {
    let (_dir, clock, store) = open(HashMap::from([(EntityKind::League, Ttl::Forever)]));
    store.put(EntityKind::League, &league("1", "a")).unwrap();

    clock.advance(Duration::days(3650));
    assert!(store.get(EntityKind::League, &league_query("1")).is_ok());
    assert_eq!(store.expire(None).unwrap(), 0);
}

#[test]
fn test_zero_ttl_is_never_persisted() {
    let (dir, _clock, store) = open(HashMap::from([(EntityKind::League, Ttl::from_seconds(0).unwrap())]));
    store.put(EntityKind::League, &league("1", "a")).unwrap();

    assert!(store.get(EntityKind::League, &league_query("1")).unwrap_err().is_not_found());
    assert!(!dir.path().join("League.NA1.1").exists());
}

#[test]
fn test_override_falls_back_to_defaults() {
    // Versions is absent from the override map and keeps its 6h default.
    let (_dir, clock, store) = open(HashMap::from([(EntityKind::League, Ttl::seconds(60))]));
    assert_eq!(store.policy().ttl(EntityKind::Versions), Ttl::seconds(6 * 60 * 60));

    store.put(EntityKind::League, &league("1", "a")).unwrap();
    clock.advance(Duration::minutes(5));
    assert_eq!(store.expire(Some(EntityKind::League)).unwrap(), 1);
}

// == First Write Wins ==

#[test]
fn test_first_write_wins() {
    let (_dir, _clock, store) = open(HashMap::new());
    store.put(EntityKind::League, &league("1", "first")).unwrap();
    store.put(EntityKind::League, &league("1", "second")).unwrap();

    assert_eq!(store.get(EntityKind::League, &league_query("1")).unwrap(), league("1", "first"));
    assert_eq!(store.stats().skipped_writes, 1);
}

#[test]
fn test_write_after_eviction_succeeds() {
    let (_dir, clock, store) = open(HashMap::from([(EntityKind::League, Ttl::seconds(60))]));
    store.put(EntityKind::League, &league("1", "first")).unwrap();
    clock.advance(Duration::seconds(60));
    assert!(store.get(EntityKind::League, &league_query("1")).is_err());

    store.put(EntityKind::League, &league("1", "second")).unwrap();
    assert_eq!(store.get(EntityKind::League, &league_query("1")).unwrap(), league("1", "second"));
}

#[test]
fn test_concurrent_first_writers() {
    let (_dir, _clock, store) = open(HashMap::new());
    let store = Arc::new(store);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = store.clone();
            thread::spawn(move || {
                store
                    .put(EntityKind::League, &league("1", &format!("w{}", i)))
                    .unwrap()
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let stats = store.stats();
    assert_eq!(stats.writes, 1);
    assert_eq!(stats.skipped_writes, 7);
    let stored = store.get(EntityKind::League, &league_query("1")).unwrap();
    assert!((0..8).any(|i| stored == league("1", &format!("w{}", i))));
}

// == Key Derivation ==

#[test]
fn test_set_discriminator_order_is_irrelevant() {
    let (_dir, _clock, store) = open(HashMap::new());
    store.put(EntityKind::ItemList, &item_list(&["stats", "image"])).unwrap();

    let base = Query::new()
        .with("platform", Platform::Na1)
        .with("version", "13.1.1")
        .with("locale", "en_US");
    let forward = base.clone().with_set("includedData", ["image", "stats"]);
    let backward = base.with_set("includedData", ["stats", "image"]);

    let expected = item_list(&["image", "stats"]);
    assert_eq!(store.get(EntityKind::ItemList, &forward).unwrap(), expected);
    assert_eq!(store.get(EntityKind::ItemList, &backward).unwrap(), expected);
}

#[test]
fn test_region_and_platform_queries_share_keys() {
    let (_dir, _clock, store) = open(HashMap::new());
    store.put(EntityKind::League, &league("1", "a")).unwrap();

    let by_platform = Query::new().with("platform", Platform::Na1).with("id", "1");
    assert_eq!(
        store.get(EntityKind::League, &by_platform).unwrap(),
        store.get(EntityKind::League, &league_query("1")).unwrap()
    );
}

#[test]
fn test_summoner_multi_key_lookup() {
    let (_dir, _clock, store) = open(HashMap::new());
    store.put(EntityKind::Summoner, &summoner()).unwrap();

    let na = || Query::new().with("platform", Platform::Na1);
    for query in [
        na().with("id", "abc123"),
        na().with("puuid", "xyz789"),
        na().with("name", "foo bar"),
        na().with("name", "FOOBAR"),
    ] {
        assert_eq!(store.get(EntityKind::Summoner, &query).unwrap(), summoner());
    }
}

#[test]
fn test_missing_discriminator_is_validation_error() {
    let (_dir, _clock, store) = open(HashMap::new());
    let err = store
        .get(EntityKind::League, &Query::new().with("platform", Platform::Na1))
        .unwrap_err();
    assert!(!err.is_not_found());
    assert!(!err.is_storage_fault());
}

// == Bulk Operations ==

#[test]
fn test_get_many_collects_hits() {
    let (_dir, _clock, store) = open(HashMap::new());
    store
        .put_many(EntityKind::League, &[league("1", "a"), league("2", "b")])
        .unwrap();

    let query = Query::new()
        .with("platform", Platform::Na1)
        .with_many("ids", ["1", "2", "3"]);
    let found = store.get_many(EntityKind::League, &query).unwrap();
    assert_eq!(found, vec![league("1", "a"), league("2", "b")]);

    let none = Query::new()
        .with("platform", Platform::Na1)
        .with_many("ids", ["8", "9"]);
    assert!(store.get_many(EntityKind::League, &none).unwrap_err().is_not_found());
}

#[test]
fn test_clear_removes_everything() {
    let (_dir, _clock, store) = open(HashMap::new());
    store.put(EntityKind::League, &league("1", "a")).unwrap();
    store.put(EntityKind::Summoner, &summoner()).unwrap();

    assert_eq!(store.clear(None).unwrap(), 2);
    assert!(store.get(EntityKind::League, &league_query("1")).is_err());
}
