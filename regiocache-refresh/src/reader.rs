use std::sync::Arc;

use regiocache_core::{CacheEntry, Region, RefreshStats, RemoteSource, ServiceTypes, Store};
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tracing::debug;

#[cfg(feature = "stats")]
use regiocache_core::CacheStats;

use crate::changes::ChangeNotifier;
use crate::config::{ConfigError, RefreshConfig};
use crate::scheduler::{RefreshScheduler, SchedulerState};

/// Non-blocking read access to lazily loaded region configuration.
///
/// Lookups only ever consult the in-memory [`Store`]. A key seen for the first
/// time is registered and handed to the background [`RefreshScheduler`]; the
/// lookup itself returns `None` right away and the value shows up once the
/// next sweep has merged it. Populated values may be stale by up to one
/// refresh period.
///
/// Clones share the store, the scheduler and the statistics. Cloning is the
/// way to hand one cache to several components; building a second reader over
/// the same store fails with [`ConfigError::StoreInUse`].
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use regiocache_core::{RegionUpdate, RemoteError, RemoteSource, SyncState};
/// use regiocache_refresh::CacheReader;
///
/// struct EmptySource;
///
/// #[async_trait]
/// impl RemoteSource for EmptySource {
///     async fn batch_fetch(&self, _: &[SyncState]) -> Result<Vec<RegionUpdate>, RemoteError> {
///         Ok(Vec::new())
///     }
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let reader = CacheReader::builder(EmptySource).build().unwrap();
///
/// assert!(reader.read_region("LON").is_none());
/// assert!(reader.store().contains("LON"));
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct CacheReader {
    store: Arc<Store>,
    scheduler: Arc<RefreshScheduler>,
    #[cfg(feature = "stats")]
    stats: Arc<CacheStats>,
}

impl CacheReader {
    pub fn builder(source: impl RemoteSource + 'static) -> CacheReaderBuilder {
        CacheReaderBuilder::new(Arc::new(source))
    }

    /// Returns the cached region for `key`, if loaded.
    pub fn read_region(&self, key: &str) -> Option<Arc<Region>> {
        self.lookup(key, |entry| entry.region)
    }

    /// Returns the cached service-type table for `key`, if loaded.
    pub fn read_service_types(&self, key: &str) -> Option<Arc<ServiceTypes>> {
        self.lookup(key, |entry| entry.service_types)
    }

    /// The store backing this reader.
    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn scheduler_state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    /// Counters of the background refresh loop.
    pub fn refresh_stats(&self) -> &RefreshStats {
        self.scheduler.stats()
    }

    /// Hit and miss counters of reads through this reader and its clones.
    #[cfg(feature = "stats")]
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    fn lookup<T>(
        &self,
        key: &str,
        project: impl FnOnce(CacheEntry) -> Option<Arc<T>>,
    ) -> Option<Arc<T>> {
        let value = match self.store.get(key) {
            Some(entry) => project(entry),
            None => {
                self.register(key);
                None
            }
        };

        #[cfg(feature = "stats")]
        self.record_access(value.is_some());

        value
    }

    #[cfg(feature = "stats")]
    fn record_access(&self, hit: bool) {
        if hit {
            self.stats.record_hit();
        } else {
            self.stats.record_miss();
        }
    }

    fn register(&self, key: &str) {
        if !self.store.ensure_known(key) {
            return;
        }

        debug!(region = key, "unknown region, scheduling load");
        self.scheduler.stats().record_registration();
        self.scheduler.ensure_running();
        self.scheduler.request_refresh();
    }
}

/// Builder for [`CacheReader`].
pub struct CacheReaderBuilder {
    source: Arc<dyn RemoteSource>,
    config: RefreshConfig,
    changes: Option<broadcast::Receiver<()>>,
    store: Option<Arc<Store>>,
    handle: Option<Handle>,
}

impl CacheReaderBuilder {
    fn new(source: Arc<dyn RemoteSource>) -> Self {
        Self {
            source,
            config: RefreshConfig::default(),
            changes: None,
            store: None,
            handle: None,
        }
    }

    pub fn config(mut self, config: RefreshConfig) -> Self {
        self.config = config;
        self
    }

    /// Subscribes the scheduler to `changes`.
    pub fn changes(mut self, changes: &ChangeNotifier) -> Self {
        self.changes = Some(changes.subscribe());
        self
    }

    /// Uses an existing store instead of a fresh one.
    ///
    /// The store must not be attached to another scheduler yet, otherwise
    /// [`build`](Self::build) fails with [`ConfigError::StoreInUse`].
    pub fn store(mut self, store: Arc<Store>) -> Self {
        self.store = Some(store);
        self
    }

    /// Runtime the refresh worker is spawned on. Defaults to the runtime
    /// `build` is called from.
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.handle = Some(handle);
        self
    }

    /// Validates the tunables and creates the reader. The worker is not
    /// spawned until the first unknown key is read.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::Invalid`] when the tunables fail validation
    /// - [`ConfigError::NoRuntime`] without a handle outside a tokio runtime
    /// - [`ConfigError::StoreInUse`] when the store already has a scheduler
    pub fn build(self) -> Result<CacheReader, ConfigError> {
        self.config.validate()?;

        let handle = match self.handle {
            Some(handle) => handle,
            None => Handle::try_current().map_err(|_| ConfigError::NoRuntime)?,
        };
        let store = self.store.unwrap_or_default();
        let scheduler = RefreshScheduler::new(
            Arc::clone(&store),
            self.source,
            self.config,
            self.changes,
            handle,
        )?;

        Ok(CacheReader {
            store,
            scheduler: Arc::new(scheduler),
            #[cfg(feature = "stats")]
            stats: Arc::new(CacheStats::new()),
        })
    }
}
