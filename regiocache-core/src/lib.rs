//! # Regiocache Core
//!
//! Core data model, store and wire format for the regiocache region
//! configuration cache.
//!
//! This crate holds everything that does not need an async runtime: the typed
//! region and service-type records, the lock-protected store readers hit on the
//! hot path, the differential sync wire format and the traits a remote
//! configuration source implements.
//!
//! ## Module Organization
//!
//! - [`Store`] - Thread-safe map from region key to [`CacheEntry`]
//! - [`wire`] - Hash-based differential sync request and response types
//! - [`RemoteSource`] / [`DirectSource`] - Seams to the configuration service
//! - [`Region`] / [`ServiceType`] - Typed configuration records
//! - [`RemoteError`] / [`LookupError`] / [`TimezoneError`] - Error types
//! - [`RefreshStats`] and, with the `stats` feature, [`CacheStats`]
//!
//! ## Example
//!
//! ```
//! use regiocache_core::{wire::RawRegionConfig, wire::decode_batch, Store};
//!
//! let store = Store::new();
//! store.ensure_known("LON");
//!
//! let updates = decode_batch(vec![RawRegionConfig {
//!     region: "LON".to_string(),
//!     region_config: r#"{"code":"LON","name":"London"}"#.to_string(),
//!     region_hash: "h1".to_string(),
//!     ..RawRegionConfig::default()
//! }])
//! .unwrap();
//! store.apply_updates(updates);
//!
//! let entry = store.get("LON").unwrap();
//! assert_eq!(entry.region.unwrap().name, "London");
//! ```
mod cache_entry;
mod error;
mod refresh_stats;
mod region;
mod remote;
mod service_type;
mod store;

pub mod wire;

#[cfg(feature = "stats")]
mod stats;

pub use cache_entry::CacheEntry;
pub use error::{LookupError, PayloadKind, RemoteError, TimezoneError};
pub use refresh_stats::RefreshStats;
pub use region::{Country, GeoInfo, Location, Phone, Region, RegionStatus};
pub use remote::{DirectSource, RemoteSource};
pub use service_type::{
    service_type_ids, sorted_by_tier, ServiceType, ServiceTypeStatus, ServiceTypes,
};
pub use store::Store;
pub use wire::{Payload, RegionUpdate, SyncState};

#[cfg(feature = "stats")]
pub use stats::CacheStats;
