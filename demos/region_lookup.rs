//! # Region Lookup Example
//!
//! `RegionConfig` answers the first lookup with a direct read and every later
//! one from the cache, once the background sweep has loaded the region.

use async_trait::async_trait;
use regiocache::{
    CacheReader, DirectSource, Region, RegionConfig, RegionUpdate, RemoteError, RemoteSource,
    ServiceType, ServiceTypes, SyncState,
};
use std::sync::Arc;
use std::time::Duration;

struct StaticService;

impl StaticService {
    fn region(code: &str) -> Region {
        let mut region = Region::new(code, "London");
        region.timezone = "Europe/London".to_string();
        region
    }

    fn service_types() -> ServiceTypes {
        [
            ServiceType::new("exec", "Executive", 3),
            ServiceType::new("std", "Standard", 1),
            ServiceType::new("xl", "Extra Large", 2),
        ]
        .into_iter()
        .map(|service_type| (service_type.id.clone(), service_type))
        .collect()
    }
}

#[async_trait]
impl RemoteSource for StaticService {
    async fn batch_fetch(&self, states: &[SyncState]) -> Result<Vec<RegionUpdate>, RemoteError> {
        Ok(states
            .iter()
            .map(|state| {
                RegionUpdate::new(state.code.clone())
                    .with_region(Self::region(&state.code), "r1")
                    .with_service_types(Self::service_types(), "s1")
            })
            .collect())
    }
}

#[async_trait]
impl DirectSource for StaticService {
    async fn read_region(&self, key: &str) -> Result<Region, RemoteError> {
        println!("  direct read: region {key}");
        Ok(Self::region(key))
    }

    async fn read_service_types(&self, key: &str) -> Result<ServiceTypes, RemoteError> {
        println!("  direct read: service types {key}");
        Ok(Self::service_types())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Region Lookup Example ===\n");

    let service = Arc::new(StaticService);
    let reader = CacheReader::builder(Arc::clone(&service)).build()?;
    let config = RegionConfig::new(reader, Arc::clone(&service));

    println!("--- Cold lookup ---");
    let london = config.region("LON").await?;
    println!("  {} runs on {}", london.name, london.location()?);

    tokio::time::sleep(Duration::from_millis(100)).await;

    println!("\n--- Warm lookup ---");
    for service_type in config.tiered_service_types("LON").await? {
        println!("  tier {}: {}", service_type.tier, service_type.name);
    }

    let stats = config.reader().stats();
    println!("\nStatistics:");
    println!("  Hits:      {}", stats.hits());
    println!("  Misses:    {}", stats.misses());
    println!("  Hit rate:  {:.2}%", stats.hit_rate() * 100.0);
    println!("  Miss rate: {:.2}%", stats.miss_rate() * 100.0);

    Ok(())
}
