//! # Regiocache Refresh
//!
//! Background refresh and non-blocking reads for the regiocache region
//! configuration cache.
//!
//! Readers never wait on the network. A lookup of an unknown region registers
//! it and returns `None`; a single tokio task per cache then loads every known
//! region in one differential batch, sending the hashes it already holds so
//! the configuration service only returns what changed.
//!
//! ## Features
//!
//! - **Lazy registration**: regions are loaded the first time somebody asks
//! - **Differential sync**: one batched request per sweep, unchanged payloads
//!   are skipped on the wire
//! - **Coalesced wake-ups**: a bounded trigger queue that drops signals when
//!   a sweep is already pending
//! - **Change notifications**: an optional broadcast feed forcing a sweep
//! - **Exponential backoff**: failed sweeps are retried, then abandoned until
//!   the next wake-up
//! - **YAML tunables**: durations written as `"1h"`, `"10s"`, ...
//! - **Statistics**: hit/miss counters with the default `stats` feature
//!
//! ## Example
//!
//! ```no_run
//! use regiocache_refresh::{CacheReader, ChangeNotifier, HttpRemoteSource, HttpSourceConfig, RefreshConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let source = HttpRemoteSource::new(HttpSourceConfig {
//!     base_url: "http://config.internal/v1".to_string(),
//!     ..HttpSourceConfig::default()
//! })?;
//! let changes = ChangeNotifier::new();
//!
//! let reader = CacheReader::builder(source)
//!     .config(RefreshConfig::from_yaml_str("force_reload_period: 30m")?)
//!     .changes(&changes)
//!     .build()?;
//!
//! // `None` until the background sweep has loaded the region.
//! if let Some(region) = reader.read_region("LON") {
//!     println!("{} uses {}", region.name, region.currency);
//! }
//! # Ok(())
//! # }
//! ```
mod backoff;
mod changes;
mod config;
mod http;
mod reader;
mod scheduler;

pub use backoff::Backoff;
pub use changes::ChangeNotifier;
pub use config::{BackoffConfig, ConfigError, RefreshConfig, DEFAULT_TRIGGER_QUEUE_CAPACITY};
pub use http::{HttpRemoteSource, HttpSourceConfig};
pub use reader::{CacheReader, CacheReaderBuilder};
pub use scheduler::{RefreshScheduler, SchedulerState};
