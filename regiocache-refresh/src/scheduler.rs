use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use regiocache_core::{RefreshStats, RemoteSource, Store};
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, info, warn, Instrument};

use crate::backoff::Backoff;
use crate::config::{ConfigError, RefreshConfig};

/// Lifecycle of a [`RefreshScheduler`].
///
/// `NotStarted` is left exactly once, when the first unknown key is
/// registered. The three remaining states describe the running worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SchedulerState {
    NotStarted = 0,
    /// Waiting for the next wake-up.
    Idle = 1,
    /// A batch fetch is in flight.
    Loading = 2,
    /// Sleeping between two failed attempts of the same sweep.
    BackingOff = 3,
}

impl SchedulerState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => SchedulerState::Idle,
            2 => SchedulerState::Loading,
            3 => SchedulerState::BackingOff,
            _ => SchedulerState::NotStarted,
        }
    }

    pub fn is_running(self) -> bool {
        self != SchedulerState::NotStarted
    }
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SchedulerState::NotStarted => "not started",
            SchedulerState::Idle => "idle",
            SchedulerState::Loading => "loading",
            SchedulerState::BackingOff => "backing off",
        };
        f.write_str(name)
    }
}

/// Keeps a [`Store`] in sync with a [`RemoteSource`] from a single background
/// task.
///
/// The worker is spawned lazily on the runtime handle given at construction,
/// by the first call to [`ensure_running`](Self::ensure_running). It then
/// wakes up on three sources:
///
/// - a periodic timer of `force_reload_period` plus a random jitter,
///   recomputed every cycle
/// - a change notification, followed by a random `trigger_reload_jitter` delay
/// - [`request_refresh`](Self::request_refresh), fed through a bounded queue
///
/// Every wake-up runs one sweep: snapshot the store, fetch the differences in
/// one batch and merge them. Failed fetches are retried with exponential
/// backoff against the same snapshot; once the retries are exhausted the sweep
/// is dropped and the worker waits for the next wake-up.
///
/// A store is claimed by exactly one scheduler, so at most one fetch is ever
/// in flight per store. Readers that need to share a store share its
/// scheduler by cloning the [`CacheReader`](crate::CacheReader).
pub struct RefreshScheduler {
    state: Arc<AtomicU8>,
    triggers: mpsc::Sender<()>,
    pending: Mutex<Option<Worker>>,
    handle: Handle,
    stats: Arc<RefreshStats>,
}

impl RefreshScheduler {
    /// Creates a scheduler for `store` without starting its worker.
    ///
    /// # Errors
    ///
    /// [`ConfigError::StoreInUse`] when another scheduler already claimed
    /// `store`.
    pub fn new(
        store: Arc<Store>,
        source: Arc<dyn RemoteSource>,
        config: RefreshConfig,
        changes: Option<broadcast::Receiver<()>>,
        handle: Handle,
    ) -> Result<Self, ConfigError> {
        if !store.attach() {
            return Err(ConfigError::StoreInUse);
        }

        let state = Arc::new(AtomicU8::new(SchedulerState::NotStarted as u8));
        let stats = Arc::new(RefreshStats::new());
        let (triggers, trigger_rx) = mpsc::channel(config.trigger_queue_capacity.max(1));

        let worker = Worker {
            store,
            source,
            backoff: Backoff::new(config.backoff.clone()),
            config,
            triggers: trigger_rx,
            changes,
            state: Arc::clone(&state),
            stats: Arc::clone(&stats),
        };

        Ok(Self {
            state,
            triggers,
            pending: Mutex::new(Some(worker)),
            handle,
            stats,
        })
    }

    /// Current lifecycle state, as last published by the worker.
    pub fn state(&self) -> SchedulerState {
        SchedulerState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Counters of the worker loop; see [`RefreshStats`].
    pub fn stats(&self) -> &RefreshStats {
        &self.stats
    }

    /// Starts the background worker unless it is already running.
    ///
    /// The `NotStarted -> Idle` transition is a compare-and-swap, so among any
    /// number of concurrent callers exactly one spawns the worker.
    ///
    /// # Returns
    ///
    /// `true` if this call started the worker.
    pub fn ensure_running(&self) -> bool {
        let started = self
            .state
            .compare_exchange(
                SchedulerState::NotStarted as u8,
                SchedulerState::Idle as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok();
        if !started {
            return false;
        }

        match self.pending.lock().take() {
            Some(worker) => {
                self.handle.spawn(worker.run().in_current_span());
                true
            }
            None => false,
        }
    }

    /// Asks the worker for a sweep without waiting for it.
    ///
    /// Signals beyond the queue capacity are dropped: a queued signal already
    /// guarantees a sweep that will see every key registered before it runs.
    pub fn request_refresh(&self) {
        match self.triggers.try_send(()) {
            Ok(()) => debug!("refresh requested"),
            Err(TrySendError::Full(())) => debug!("refresh queue full, request coalesced"),
            Err(TrySendError::Closed(())) => debug!("refresh worker gone, request dropped"),
        }
    }
}

impl fmt::Debug for RefreshScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshScheduler")
            .field("state", &self.state())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Copy, Debug)]
enum Wake {
    Timer,
    Change,
    NewKey,
}

struct Worker {
    store: Arc<Store>,
    source: Arc<dyn RemoteSource>,
    config: RefreshConfig,
    backoff: Backoff,
    triggers: mpsc::Receiver<()>,
    changes: Option<broadcast::Receiver<()>>,
    state: Arc<AtomicU8>,
    stats: Arc<RefreshStats>,
}

impl Worker {
    async fn run(mut self) {
        info!(
            period = ?self.config.force_reload_period,
            queue_capacity = self.config.trigger_queue_capacity,
            subscribed = self.changes.is_some(),
            "refresh worker started"
        );

        loop {
            let wait = next_wait(&self.config);

            let wake = tokio::select! {
                _ = tokio::time::sleep(wait) => Wake::Timer,
                trigger = self.triggers.recv() => match trigger {
                    Some(()) => Wake::NewKey,
                    None => {
                        debug!("refresh scheduler dropped, worker exiting");
                        return;
                    }
                },
                changed = next_change(self.changes.as_mut()) => match changed {
                    Ok(()) => Wake::Change,
                    Err(RecvError::Lagged(missed)) => {
                        debug!(missed, "change feed lagged");
                        Wake::Change
                    }
                    Err(RecvError::Closed) => {
                        debug!("change feed closed");
                        self.changes = None;
                        continue;
                    }
                },
            };

            debug!(?wake, "refresh triggered");
            if let Wake::Change = wake {
                let delay = jitter(self.config.trigger_reload_jitter);
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }

            self.drain_signals();
            self.sweep().await;
        }
    }

    /// Discards pending wake-ups; the snapshot taken next covers them all.
    fn drain_signals(&mut self) {
        while self.triggers.try_recv().is_ok() {}

        while let Some(changes) = self.changes.as_mut() {
            match changes.try_recv() {
                Ok(()) | Err(TryRecvError::Lagged(_)) => {}
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Closed) => {
                    debug!("change feed closed");
                    self.changes = None;
                }
            }
        }
    }

    async fn sweep(&mut self) {
        let states = self.store.snapshot();
        if states.is_empty() {
            warn!("no known regions, skipping refresh");
            self.stats.record_skipped();
            return;
        }

        self.set_state(SchedulerState::Loading);
        self.backoff.reset();

        loop {
            match self.source.batch_fetch(&states).await {
                Ok(updates) => {
                    let updated = self.store.apply_updates(updates);
                    debug!(regions = states.len(), updated, "refresh sweep complete");
                    self.stats.record_sweep();
                    break;
                }
                Err(err) => {
                    self.stats.record_failed_attempt();
                    match self.backoff.next() {
                        Some(delay) => {
                            warn!(
                                error = %err,
                                retry = self.backoff.attempt(),
                                ?delay,
                                "refresh attempt failed, backing off"
                            );
                            self.set_state(SchedulerState::BackingOff);
                            tokio::time::sleep(delay).await;
                            self.set_state(SchedulerState::Loading);
                        }
                        None => {
                            error!(
                                error = %err,
                                regions = states.len(),
                                retries = self.backoff.attempt(),
                                "refresh abandoned after exhausting retries"
                            );
                            self.stats.record_abandoned();
                            break;
                        }
                    }
                }
            }
        }

        self.backoff.reset();
        self.set_state(SchedulerState::Idle);
    }

    fn set_state(&self, state: SchedulerState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

async fn next_change(changes: Option<&mut broadcast::Receiver<()>>) -> Result<(), RecvError> {
    match changes {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Delay until the next periodic sweep, saturating at `Duration::MAX`.
fn next_wait(config: &RefreshConfig) -> Duration {
    config
        .force_reload_period
        .saturating_add(jitter(config.force_reload_jitter))
}

/// A uniformly random duration in `[0, max)`.
fn jitter(max: Duration) -> Duration {
    if max.is_zero() {
        return Duration::ZERO;
    }
    max.mul_f64(fastrand::f64())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use regiocache_core::{RegionUpdate, RemoteError, SyncState};

    struct NoopSource;

    #[async_trait]
    impl RemoteSource for NoopSource {
        async fn batch_fetch(&self, _: &[SyncState]) -> Result<Vec<RegionUpdate>, RemoteError> {
            Ok(Vec::new())
        }
    }

    fn scheduler() -> RefreshScheduler {
        RefreshScheduler::new(
            Arc::new(Store::new()),
            Arc::new(NoopSource),
            RefreshConfig::default(),
            None,
            Handle::current(),
        )
        .unwrap()
    }

    #[test]
    fn test_state_round_trip() {
        for state in [
            SchedulerState::NotStarted,
            SchedulerState::Idle,
            SchedulerState::Loading,
            SchedulerState::BackingOff,
        ] {
            assert_eq!(SchedulerState::from_u8(state as u8), state);
        }
        assert!(!SchedulerState::NotStarted.is_running());
        assert!(SchedulerState::BackingOff.is_running());
        assert_eq!(SchedulerState::BackingOff.to_string(), "backing off");
    }

    #[test]
    fn test_jitter_bounds() {
        assert_eq!(jitter(Duration::ZERO), Duration::ZERO);
        for _ in 0..100 {
            assert!(jitter(Duration::from_secs(10)) < Duration::from_secs(10));
        }
    }

    #[test]
    fn test_next_wait_saturates() {
        let config = RefreshConfig {
            force_reload_period: Duration::MAX,
            force_reload_jitter: Duration::from_secs(60),
            ..RefreshConfig::default()
        };
        assert_eq!(next_wait(&config), Duration::MAX);

        let config = RefreshConfig {
            force_reload_period: Duration::from_secs(10),
            force_reload_jitter: Duration::from_secs(5),
            ..RefreshConfig::default()
        };
        for _ in 0..100 {
            let wait = next_wait(&config);
            assert!(wait >= Duration::from_secs(10) && wait < Duration::from_secs(15));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_period_keeps_worker_alive() {
        let store = Arc::new(Store::new());
        let scheduler = RefreshScheduler::new(
            Arc::clone(&store),
            Arc::new(NoopSource),
            RefreshConfig {
                force_reload_period: Duration::MAX,
                ..RefreshConfig::default()
            },
            None,
            Handle::current(),
        )
        .unwrap();

        store.ensure_known("LON");
        scheduler.ensure_running();
        scheduler.request_refresh();
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(scheduler.stats().sweeps(), 1);

        scheduler.request_refresh();
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(scheduler.stats().sweeps(), 2);
        assert_eq!(scheduler.state(), SchedulerState::Idle);
    }

    #[tokio::test]
    async fn test_store_is_claimed_once() {
        let store = Arc::new(Store::new());
        let first = RefreshScheduler::new(
            Arc::clone(&store),
            Arc::new(NoopSource),
            RefreshConfig::default(),
            None,
            Handle::current(),
        );
        assert!(first.is_ok());

        let second = RefreshScheduler::new(
            Arc::clone(&store),
            Arc::new(NoopSource),
            RefreshConfig::default(),
            None,
            Handle::current(),
        );
        assert!(matches!(second, Err(ConfigError::StoreInUse)));
    }

    #[tokio::test]
    async fn test_starts_once() {
        let scheduler = scheduler();
        assert_eq!(scheduler.state(), SchedulerState::NotStarted);

        assert!(scheduler.ensure_running());
        assert!(!scheduler.ensure_running());
        assert!(scheduler.state().is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_store_sweep_is_skipped() {
        let scheduler = scheduler();
        scheduler.ensure_running();
        scheduler.request_refresh();

        tokio::time::sleep(Duration::from_millis(1)).await;

        assert_eq!(scheduler.stats().skipped(), 1);
        assert_eq!(scheduler.stats().sweeps(), 0);
        assert_eq!(scheduler.state(), SchedulerState::Idle);
    }
}
