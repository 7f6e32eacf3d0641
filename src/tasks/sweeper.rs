//! Expiry Sweeper Task
//!
//! Background task that periodically evicts stale records from a store.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::datastore::DataSink;

/// Spawns a background task that runs `expire(None)` on `store` every
/// `interval_secs` seconds.
///
/// Both engines do blocking I/O, so each sweep runs on the blocking pool.
/// A failed sweep is logged and the next one still runs. Abort the returned
/// handle at shutdown.
pub fn spawn_expiry_task<S>(store: Arc<S>, name: &'static str, interval_secs: u64) -> JoinHandle<()>
where
    S: DataSink + ?Sized + 'static,
{
    let interval = Duration::from_secs(interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting {} expiry sweeper with interval of {} seconds",
            name,
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            let sweep = {
                let store = store.clone();
                tokio::task::spawn_blocking(move || store.expire(None)).await
            };

            match sweep {
                Ok(Ok(0)) => debug!("{} sweep: no stale records found", name),
                Ok(Ok(evicted)) => info!("{} sweep: evicted {} stale records", name, evicted),
                Ok(Err(e)) => error!("{} sweep failed: {}", name, e),
                Err(e) => error!("{} sweep panicked: {}", name, e),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use crate::clock::ManualClock;
    use crate::data::{Platform, Region};
    use crate::datastore::DataSource;
    use crate::disk::DiskStore;
    use crate::dto::{Dto, VersionListDto};
    use crate::expiration::Ttl;
    use crate::kind::EntityKind;
    use crate::query::Query;

    fn versions() -> Dto {
        Dto::Versions(VersionListDto {
            region: Region::NorthAmerica,
            versions: vec!["13.1.1".to_string()],
        })
    }

    fn open(ttl: Ttl) -> (tempfile::TempDir, Arc<ManualClock>, Arc<DiskStore>) {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::at_unix_seconds(1_000_000));
        let store = DiskStore::open_with(
            dir.path(),
            HashMap::from([(EntityKind::Versions, ttl)]),
            clock.clone(),
        )
        .unwrap();
        (dir, clock, Arc::new(store))
    }

    #[tokio::test]
    async fn test_sweeper_evicts_stale_records() {
        let (_dir, clock, store) = open(Ttl::seconds(60));
        store.put(EntityKind::Versions, &versions()).unwrap();
        clock.advance(chrono::Duration::seconds(61));

        let handle = spawn_expiry_task(store.clone(), "disk", 1);
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert_eq!(store.stats().evictions, 1);
        let query = Query::new().with("platform", Platform::Na1);
        assert!(store.get(EntityKind::Versions, &query).unwrap_err().is_not_found());

        handle.abort();
    }

    #[tokio::test]
    async fn test_sweeper_preserves_fresh_records() {
        let (_dir, _clock, store) = open(Ttl::seconds(3600));
        store.put(EntityKind::Versions, &versions()).unwrap();

        let handle = spawn_expiry_task(store.clone(), "disk", 1);
        tokio::time::sleep(Duration::from_millis(1500)).await;

        let query = Query::new().with("platform", Platform::Na1);
        assert_eq!(store.get(EntityKind::Versions, &query).unwrap(), versions());

        handle.abort();
    }

    #[tokio::test]
    async fn test_sweeper_can_be_aborted() {
        let (_dir, _clock, store) = open(Ttl::Forever);

        let handle = spawn_expiry_task(store, "disk", 1);
        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
