//! # Differential Refresh Example
//!
//! An in-process configuration service that bumps a version on demand. The
//! reader registers regions lazily, and a change notification makes the
//! worker fetch only the payloads whose hash moved.

use async_trait::async_trait;
use parking_lot::Mutex;
use regiocache_core::{Region, RegionUpdate, RemoteError, RemoteSource, SyncState};
use regiocache_refresh::{CacheReader, ChangeNotifier, RefreshConfig};
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
struct VersionedService {
    version: Mutex<u32>,
}

#[async_trait]
impl RemoteSource for VersionedService {
    async fn batch_fetch(&self, states: &[SyncState]) -> Result<Vec<RegionUpdate>, RemoteError> {
        let version = *self.version.lock();
        let hash = format!("v{version}");
        println!("  fetch: {} regions, server at {hash}", states.len());

        Ok(states
            .iter()
            .filter(|state| state.region_hash != hash)
            .map(|state| {
                let name = format!("{} (rev {version})", state.code);
                RegionUpdate::new(state.code.clone())
                    .with_region(Region::new(state.code.as_str(), name), hash.clone())
            })
            .collect())
    }
}

async fn wait_until(mut ready: impl FnMut() -> bool) {
    while !ready() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::main]
async fn main() {
    println!("=== Differential Refresh Example ===\n");

    let service = Arc::new(VersionedService::default());
    let changes = ChangeNotifier::new();
    let reader = CacheReader::builder(Arc::clone(&service))
        .config(RefreshConfig {
            trigger_reload_jitter: Duration::from_millis(50),
            ..RefreshConfig::default()
        })
        .changes(&changes)
        .build()
        .expect("valid config");

    println!("--- First reads register the regions ---");
    for code in ["LON", "NYC"] {
        println!("  {code}: {:?}", reader.read_region(code).map(|r| r.name.clone()));
    }
    wait_until(|| reader.read_region("LON").is_some() && reader.read_region("NYC").is_some())
        .await;

    println!("\n--- After the first sweep ---");
    for code in ["LON", "NYC"] {
        println!("  {code}: {:?}", reader.read_region(code).map(|r| r.name.clone()));
    }

    println!("\n--- Server publishes a new revision ---");
    let sweeps = reader.refresh_stats().sweeps();
    *service.version.lock() += 1;
    println!("  notified {} scheduler(s)", changes.notify());
    wait_until(|| reader.refresh_stats().sweeps() > sweeps).await;

    for code in ["LON", "NYC"] {
        let entry = reader.store().get(code).expect("registered");
        println!(
            "  {code}: {:?} hash={}",
            entry.region.map(|r| r.name.clone()),
            entry.region_hash
        );
    }

    println!("\nScheduler state: {}", reader.scheduler_state());
    assert_eq!(reader.read_region("LON").unwrap().name, "LON (rev 1)");
}
