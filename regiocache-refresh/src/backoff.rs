use std::time::Duration;

use crate::config::BackoffConfig;

/// Delays to wait between the retries of one synchronization cycle.
///
/// Yields exactly `max_retry_attempts` delays and then `None`, at which point
/// the cycle is abandoned. [`Backoff::reset`] rewinds it for the next cycle.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use regiocache_refresh::{Backoff, BackoffConfig};
///
/// let backoff = Backoff::new(BackoffConfig {
///     min_delay: Duration::from_millis(1),
///     max_delay: Duration::from_millis(30),
///     factor: 2.0,
///     jitter: false,
///     max_retry_attempts: 4,
/// });
///
/// let delays: Vec<_> = backoff.collect();
/// assert_eq!(
///     delays,
///     [1, 2, 4, 8].map(Duration::from_millis).to_vec()
/// );
/// ```
#[derive(Clone, Debug)]
pub struct Backoff {
    config: BackoffConfig,
    attempt: u32,
}

impl Backoff {
    pub fn new(config: BackoffConfig) -> Self {
        Self { config, attempt: 0 }
    }

    /// Number of delays handed out since the last reset.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        let min = self.config.min_delay;
        let max = self.config.max_delay.max(min);

        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let nanos = min.as_nanos() as f64 * self.config.factor.powi(exponent);
        let delay = if !nanos.is_finite() || nanos >= max.as_nanos() as f64 {
            max
        } else {
            Duration::from_nanos(nanos as u64)
        };

        if self.config.jitter && delay > min {
            min + (delay - min).mul_f64(fastrand::f64())
        } else {
            delay
        }
    }
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.attempt >= self.config.max_retry_attempts {
            return None;
        }

        let delay = self.delay_for(self.attempt);
        self.attempt += 1;
        Some(delay)
    }
}
