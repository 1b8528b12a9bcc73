use std::io::Read;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Default capacity of the key-registration wake queue.
pub const DEFAULT_TRIGGER_QUEUE_CAPACITY: usize = 10;

/// An error raised while loading or validating refresh tunables.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse refresh config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid refresh config: {0}")]
    Invalid(String),
    #[error("no tokio runtime available to run the refresh worker")]
    NoRuntime,
    #[error("store is already kept in sync by another refresh scheduler")]
    StoreInUse,
}

/// Exponential backoff applied between failed synchronization attempts.
///
/// The delay before retry `n` (0-based) is `min_delay * factor^n`, capped at
/// `max_delay`. With `jitter` enabled the delay is drawn uniformly from
/// `[min_delay, delay)` instead.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    #[serde(with = "humantime_serde")]
    pub min_delay: Duration,

    #[serde(with = "humantime_serde")]
    pub max_delay: Duration,

    pub factor: f64,

    pub jitter: bool,

    /// Retries after the initial attempt before a cycle is abandoned.
    pub max_retry_attempts: u32,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_secs(60),
            max_delay: Duration::from_secs(30 * 60),
            factor: 2.0,
            jitter: true,
            max_retry_attempts: 4,
        }
    }
}

/// Tunables of the background refresh scheduler.
///
/// Every field has a default, so a partial YAML document is enough:
///
/// ```
/// use std::time::Duration;
/// use regiocache_refresh::RefreshConfig;
///
/// let config = RefreshConfig::from_yaml_str(
///     "force_reload_period: 15m\nbackoff:\n  max_retry_attempts: 2\n",
/// )
/// .unwrap();
///
/// assert_eq!(config.force_reload_period, Duration::from_secs(15 * 60));
/// assert_eq!(config.backoff.max_retry_attempts, 2);
/// assert_eq!(config.trigger_reload_jitter, Duration::from_secs(10));
/// ```
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Base interval of the unconditional periodic sweep.
    #[serde(with = "humantime_serde")]
    pub force_reload_period: Duration,

    /// Upper bound of the random delay added to every periodic sweep.
    #[serde(with = "humantime_serde")]
    pub force_reload_jitter: Duration,

    /// Upper bound of the random delay between a change notification and the
    /// sweep it triggers.
    #[serde(with = "humantime_serde")]
    pub trigger_reload_jitter: Duration,

    pub backoff: BackoffConfig,

    pub trigger_queue_capacity: usize,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            force_reload_period: Duration::from_secs(60 * 60),
            force_reload_jitter: Duration::from_secs(60),
            trigger_reload_jitter: Duration::from_secs(10),
            backoff: BackoffConfig::default(),
            trigger_queue_capacity: DEFAULT_TRIGGER_QUEUE_CAPACITY,
        }
    }
}

impl RefreshConfig {
    /// Parses and validates a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates a YAML document read from `reader`.
    pub fn from_reader(reader: impl Read) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.force_reload_period.is_zero() {
            return Err(ConfigError::Invalid(
                "force_reload_period must be greater than zero".to_string(),
            ));
        }
        if self.trigger_queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "trigger_queue_capacity must be greater than zero".to_string(),
            ));
        }
        if self.backoff.factor.is_nan() || self.backoff.factor < 1.0 {
            return Err(ConfigError::Invalid(format!(
                "backoff.factor must be at least 1, got {}",
                self.backoff.factor
            )));
        }
        if self.backoff.min_delay > self.backoff.max_delay {
            return Err(ConfigError::Invalid(format!(
                "backoff.min_delay ({:?}) exceeds backoff.max_delay ({:?})",
                self.backoff.min_delay, self.backoff.max_delay
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RefreshConfig::default();
        assert_eq!(config.force_reload_period, Duration::from_secs(3600));
        assert_eq!(config.force_reload_jitter, Duration::from_secs(60));
        assert_eq!(config.trigger_reload_jitter, Duration::from_secs(10));
        assert_eq!(config.backoff.min_delay, Duration::from_secs(60));
        assert_eq!(config.backoff.max_delay, Duration::from_secs(1800));
        assert_eq!(config.backoff.factor, 2.0);
        assert!(config.backoff.jitter);
        assert_eq!(config.backoff.max_retry_attempts, 4);
        assert_eq!(config.trigger_queue_capacity, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = RefreshConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config, RefreshConfig::default());
    }

    #[test]
    fn test_humantime_durations() {
        let yaml = r#"
force_reload_period: 2h
force_reload_jitter: 30s
trigger_reload_jitter: 500ms
backoff:
  min_delay: 1ms
  max_delay: 30ms
  jitter: false
trigger_queue_capacity: 32
"#;
        let config = RefreshConfig::from_reader(yaml.as_bytes()).unwrap();

        assert_eq!(config.force_reload_period, Duration::from_secs(7200));
        assert_eq!(config.force_reload_jitter, Duration::from_secs(30));
        assert_eq!(config.trigger_reload_jitter, Duration::from_millis(500));
        assert_eq!(config.backoff.min_delay, Duration::from_millis(1));
        assert_eq!(config.backoff.max_delay, Duration::from_millis(30));
        assert_eq!(config.backoff.factor, 2.0);
        assert!(!config.backoff.jitter);
        assert_eq!(config.trigger_queue_capacity, 32);
    }

    #[test]
    fn test_malformed_duration() {
        let err = RefreshConfig::from_yaml_str("force_reload_period: soon").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let cases = [
            "force_reload_period: 0s",
            "trigger_queue_capacity: 0",
            "backoff:\n  factor: 0.5",
            "backoff:\n  min_delay: 10m\n  max_delay: 1m",
        ];

        for yaml in cases {
            let err = RefreshConfig::from_yaml_str(yaml).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)), "{yaml}: {err}");
        }
    }
}
