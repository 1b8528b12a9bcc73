use std::sync::atomic::{AtomicU64, Ordering};

/// Counters describing the background refresh loop.
///
/// * `registered` - Keys registered for loading by readers
/// * `sweeps` - Synchronization rounds that fetched and merged successfully
/// * `skipped` - Wake-ups that found no known keys and did nothing
/// * `failed_attempts` - Individual fetch attempts that failed
/// * `abandoned` - Rounds given up after exhausting every retry
#[derive(Debug, Default)]
pub struct RefreshStats {
    registered: AtomicU64,
    sweeps: AtomicU64,
    skipped: AtomicU64,
    failed_attempts: AtomicU64,
    abandoned: AtomicU64,
}

impl RefreshStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_registration(&self) {
        self.registered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sweep(&self) {
        self.sweeps.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed_attempt(&self) {
        self.failed_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_abandoned(&self) {
        self.abandoned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn registered(&self) -> u64 {
        self.registered.load(Ordering::Relaxed)
    }

    pub fn sweeps(&self) -> u64 {
        self.sweeps.load(Ordering::Relaxed)
    }

    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    pub fn failed_attempts(&self) -> u64 {
        self.failed_attempts.load(Ordering::Relaxed)
    }

    pub fn abandoned(&self) -> u64 {
        self.abandoned.load(Ordering::Relaxed)
    }
}
