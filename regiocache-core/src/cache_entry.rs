use std::sync::Arc;

use crate::region::Region;
use crate::service_type::ServiceTypes;
use crate::wire::{Payload, RegionUpdate};

/// Cached configuration for one region.
///
/// A freshly registered key holds a placeholder entry: no region, no service
/// types and empty hashes. The refresh scheduler fills it in through
/// [`CacheEntry::merge`]. Values are kept behind `Arc` so readers can clone
/// them out of the store without copying the configuration.
///
/// # Fields
///
/// * `region` - The region record, once loaded
/// * `region_hash` - Hash of the region payload last merged
/// * `service_types` - The service-type table, once loaded
/// * `service_types_hash` - Hash of the service-type payload last merged
///
/// # Examples
///
/// ```
/// use regiocache_core::{CacheEntry, Region, RegionUpdate};
///
/// let mut entry = CacheEntry::placeholder();
/// assert!(entry.is_placeholder());
///
/// entry.merge(RegionUpdate::new("LON").with_region(Region::new("LON", "London"), "h1"));
/// assert_eq!(entry.region_hash, "h1");
/// assert!(!entry.is_placeholder());
/// ```
#[derive(Clone, Debug, Default)]
pub struct CacheEntry {
    pub region: Option<Arc<Region>>,
    pub region_hash: String,
    pub service_types: Option<Arc<ServiceTypes>>,
    pub service_types_hash: String,
}

impl CacheEntry {
    /// Creates an entry for a key that is known but not loaded yet.
    pub fn placeholder() -> Self {
        Self::default()
    }

    /// Returns `true` while no data has been merged into the entry.
    pub fn is_placeholder(&self) -> bool {
        self.region.is_none() && self.service_types.is_none()
    }

    /// Merges a differential update.
    ///
    /// A changed half overwrites the value together with its hash. An
    /// unchanged half leaves both untouched; it never clears anything.
    pub fn merge(&mut self, update: RegionUpdate) {
        if let Payload::Changed { value, hash } = update.region {
            self.region = Some(Arc::new(value));
            self.region_hash = hash;
        }

        if let Payload::Changed { value, hash } = update.service_types {
            self.service_types = Some(Arc::new(value));
            self.service_types_hash = hash;
        }
    }
}
