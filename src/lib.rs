//! # Regiocache
//!
//! A self-refreshing cache for per-region configuration and service-type
//! tables, kept in sync with a remote configuration service through batched,
//! hash-based differential requests.
//!
//! ## Features
//!
//! - **Non-blocking reads**: lookups only touch memory and never wait on I/O
//! - **Lazy loading**: a region is fetched the first time somebody asks for it
//! - **Differential sync**: one batched request per sweep, carrying the hashes
//!   already held so only changed payloads travel
//! - **Background refresh**: periodic, change-triggered and on-registration
//!   sweeps from a single tokio task, with exponential backoff on failure
//! - **Direct-read fallback**: [`RegionConfig`] answers cache misses with an
//!   unbatched read against the service
//!
//! ## Quick Start
//!
//! ```no_run
//! use regiocache::{HttpRemoteSource, HttpSourceConfig, RefreshConfig, RegionConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let source = HttpRemoteSource::new(HttpSourceConfig {
//!     base_url: "http://config.internal/v1".to_string(),
//!     ..HttpSourceConfig::default()
//! })?;
//! let config = RegionConfig::over_http(source, RefreshConfig::default())?;
//!
//! // First call reads through to the service, later calls hit the cache.
//! let london = config.region("LON").await?;
//! for service_type in config.tiered_service_types("LON").await? {
//!     println!("{} {}: tier {}", london.code, service_type.name, service_type.tier);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Crates
//!
//! - `regiocache-core`: data model, [`Store`], wire format, source traits
//! - `regiocache-refresh`: [`CacheReader`], [`RefreshScheduler`], HTTP source
//!
//! Everything public in both is re-exported here.
use std::fmt;
use std::sync::Arc;

use tracing::debug;

pub use regiocache_core::*;
pub use regiocache_refresh::*;

/// Region configuration lookups with a direct-read fallback.
///
/// Every lookup first asks the [`CacheReader`]. On a miss, which also
/// registers the key for background loading, it reads straight from the
/// [`DirectSource`] so callers always get an answer; errors from that read are
/// returned to the caller.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use regiocache::{
///     CacheReader, DirectSource, Region, RegionConfig, RegionUpdate, RemoteError,
///     RemoteSource, ServiceType, ServiceTypes, SyncState,
/// };
///
/// struct Fixed;
///
/// #[async_trait]
/// impl RemoteSource for Fixed {
///     async fn batch_fetch(&self, _: &[SyncState]) -> Result<Vec<RegionUpdate>, RemoteError> {
///         Ok(Vec::new())
///     }
/// }
///
/// #[async_trait]
/// impl DirectSource for Fixed {
///     async fn read_region(&self, key: &str) -> Result<Region, RemoteError> {
///         Ok(Region::new(key, "London"))
///     }
///
///     async fn read_service_types(&self, _: &str) -> Result<ServiceTypes, RemoteError> {
///         let mut table = ServiceTypes::new();
///         table.insert("exec".to_string(), ServiceType::new("exec", "Executive", 2));
///         table.insert("std".to_string(), ServiceType::new("std", "Standard", 1));
///         Ok(table)
///     }
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let reader = CacheReader::builder(Fixed).build().unwrap();
/// let config = RegionConfig::new(reader, Fixed);
///
/// assert_eq!(config.region("LON").await.unwrap().name, "London");
///
/// let tiers: Vec<_> = config
///     .tiered_service_types("LON")
///     .await
///     .unwrap()
///     .into_iter()
///     .map(|service_type| service_type.id)
///     .collect();
/// assert_eq!(tiers, ["std", "exec"]);
/// # }
/// ```
pub struct RegionConfig {
    reader: CacheReader,
    direct: Arc<dyn DirectSource>,
}

impl RegionConfig {
    pub fn new(reader: CacheReader, direct: impl DirectSource + 'static) -> Self {
        Self {
            reader,
            direct: Arc::new(direct),
        }
    }

    /// Uses one HTTP source for both background sync and direct reads.
    ///
    /// Must be called from within a tokio runtime.
    pub fn over_http(
        source: HttpRemoteSource,
        config: RefreshConfig,
    ) -> Result<Self, ConfigError> {
        let reader = CacheReader::builder(source.clone()).config(config).build()?;
        Ok(Self::new(reader, source))
    }

    pub fn reader(&self) -> &CacheReader {
        &self.reader
    }

    /// Returns the region for `key`, from cache when loaded.
    pub async fn region(&self, key: &str) -> Result<Arc<Region>, LookupError> {
        if let Some(region) = self.reader.read_region(key) {
            return Ok(region);
        }

        debug!(region = key, "region not cached, reading directly");
        let region = self.direct.read_region(key).await?;
        Ok(Arc::new(region))
    }

    /// Returns the whole service-type table of `key`, from cache when loaded.
    pub async fn service_types(&self, key: &str) -> Result<Arc<ServiceTypes>, LookupError> {
        if let Some(service_types) = self.reader.read_service_types(key) {
            return Ok(service_types);
        }

        debug!(region = key, "service types not cached, reading directly");
        let service_types = self.direct.read_service_types(key).await?;
        Ok(Arc::new(service_types))
    }

    /// Returns one service type of `key`.
    ///
    /// # Errors
    ///
    /// [`LookupError::ServiceTypeNotFound`] when the table has no entry for
    /// `service_type`; [`LookupError::Remote`] when the fallback read fails.
    pub async fn service_type(
        &self,
        key: &str,
        service_type: &str,
    ) -> Result<ServiceType, LookupError> {
        let service_types = self.service_types(key).await?;
        service_types
            .get(service_type)
            .cloned()
            .ok_or_else(|| LookupError::ServiceTypeNotFound {
                region: key.to_string(),
                service_type: service_type.to_string(),
            })
    }

    /// Returns every service type of `key`, lowest tier first.
    pub async fn tiered_service_types(&self, key: &str) -> Result<Vec<ServiceType>, LookupError> {
        let service_types = self.service_types(key).await?;
        Ok(sorted_by_tier(&service_types))
    }
}

impl fmt::Debug for RegionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegionConfig")
            .field("reader", &self.reader)
            .finish_non_exhaustive()
    }
}
