// Copyright (c) 2025 - Cowboy AI, Inc.
//! Configuration
//!
//! Each component has a plain config struct with sensible defaults, `with_*`
//! setters, and a `from_env()` constructor reading `CIM_ES_*` variables.
//! Unset variables keep their default; set but invalid ones are an error.
//!
//! | Variable                     | Default |
//! |------------------------------|---------|
//! | `CIM_ES_DEDUP_WINDOW_HOURS`  | 24      |
//! | `CIM_ES_RETRY_MAX_ATTEMPTS`  | 3       |
//! | `CIM_ES_RETRY_MIN_DELAY_MS`  | 10      |
//! | `CIM_ES_RETRY_MAX_DELAY_MS`  | 500     |
//! | `CIM_ES_STREAM_BATCH_SIZE`   | 100     |

use std::str::FromStr;
use std::time::Duration;

use crate::errors::ConfigError;

pub const DEDUP_WINDOW_HOURS_VAR: &str = "CIM_ES_DEDUP_WINDOW_HOURS";
pub const RETRY_MAX_ATTEMPTS_VAR: &str = "CIM_ES_RETRY_MAX_ATTEMPTS";
pub const RETRY_MIN_DELAY_MS_VAR: &str = "CIM_ES_RETRY_MIN_DELAY_MS";
pub const RETRY_MAX_DELAY_MS_VAR: &str = "CIM_ES_RETRY_MAX_DELAY_MS";
pub const STREAM_BATCH_SIZE_VAR: &str = "CIM_ES_STREAM_BATCH_SIZE";

/// Parse `key` from `lookup`, `None` if unset
fn parse_var<T, L>(lookup: &L, key: &str, expected: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    L: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw,
                expected,
            }),
    }
}

fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Command deduplication settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeduplicationConfig {
    /// How far back a persisted causation still counts as satisfied
    pub window: chrono::Duration,
}

impl Default for DeduplicationConfig {
    fn default() -> Self {
        Self {
            window: chrono::Duration::hours(24),
        }
    }
}

impl DeduplicationConfig {
    /// Set the window
    pub fn with_window(mut self, window: chrono::Duration) -> Self {
        self.window = window;
        self
    }

    /// Read overrides from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(process_env)
    }

    /// Read overrides from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(hours) = parse_var::<i64, _>(&lookup, DEDUP_WINDOW_HOURS_VAR, "number of hours")? {
            if hours <= 0 {
                return Err(ConfigError::OutOfRange(format!(
                    "{DEDUP_WINDOW_HOURS_VAR} must be positive, got {hours}"
                )));
            }
            config.window = chrono::Duration::try_hours(hours).ok_or_else(|| {
                ConfigError::OutOfRange(format!(
                    "{DEDUP_WINDOW_HOURS_VAR} is too large, got {hours}"
                ))
            })?;
        }
        Ok(config)
    }
}

/// Bounded retry of optimistic concurrency conflicts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total attempts including the first one
    pub max_attempts: usize,
    /// Delay before the first retry
    pub min_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    /// Randomise delays
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            min_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(500),
            jitter: true,
        }
    }
}

impl RetryConfig {
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_min_delay(mut self, min_delay: Duration) -> Self {
        self.min_delay = min_delay;
        self
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Read overrides from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(process_env)
    }

    /// Read overrides from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(attempts) = parse_var(&lookup, RETRY_MAX_ATTEMPTS_VAR, "attempt count")? {
            config.max_attempts = attempts;
        }
        if let Some(ms) = parse_var(&lookup, RETRY_MIN_DELAY_MS_VAR, "number of milliseconds")? {
            config.min_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var(&lookup, RETRY_MAX_DELAY_MS_VAR, "number of milliseconds")? {
            config.max_delay = Duration::from_millis(ms);
        }
        config.validate()?;
        Ok(config)
    }

    /// Check attempt count and delay bounds
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::OutOfRange(
                "retry max_attempts must be at least 1".to_string(),
            ));
        }
        if self.min_delay > self.max_delay {
            return Err(ConfigError::OutOfRange(format!(
                "retry min_delay {:?} exceeds max_delay {:?}",
                self.min_delay, self.max_delay
            )));
        }
        Ok(())
    }
}

/// Global stream polling settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConfig {
    /// Events requested per poll
    pub batch_size: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self { batch_size: 100 }
    }
}

impl StreamConfig {
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Read overrides from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(process_env)
    }

    /// Read overrides from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(batch_size) = parse_var(&lookup, STREAM_BATCH_SIZE_VAR, "batch size")? {
            if batch_size == 0 {
                return Err(ConfigError::OutOfRange(format!(
                    "{STREAM_BATCH_SIZE_VAR} must be at least 1"
                )));
            }
            config.batch_size = batch_size;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        assert_eq!(DeduplicationConfig::default().window, chrono::Duration::hours(24));
        assert_eq!(RetryConfig::default().max_attempts, 3);
        assert_eq!(StreamConfig::default().batch_size, 100);
    }

    #[test]
    fn test_unset_variables_keep_defaults() {
        let lookup = vars(&[]);
        assert_eq!(DeduplicationConfig::from_lookup(&lookup).unwrap(), DeduplicationConfig::default());
        assert_eq!(RetryConfig::from_lookup(&lookup).unwrap(), RetryConfig::default());
        assert_eq!(StreamConfig::from_lookup(&lookup).unwrap(), StreamConfig::default());
    }

    #[test]
    fn test_overrides_are_applied() {
        let lookup = vars(&[
            (DEDUP_WINDOW_HOURS_VAR, "48"),
            (RETRY_MAX_ATTEMPTS_VAR, "5"),
            (RETRY_MIN_DELAY_MS_VAR, "1"),
            (RETRY_MAX_DELAY_MS_VAR, " 20 "),
            (STREAM_BATCH_SIZE_VAR, "25"),
        ]);

        assert_eq!(
            DeduplicationConfig::from_lookup(&lookup).unwrap().window,
            chrono::Duration::hours(48)
        );
        let retry = RetryConfig::from_lookup(&lookup).unwrap();
        assert_eq!(retry.max_attempts, 5);
        assert_eq!(retry.min_delay, Duration::from_millis(1));
        assert_eq!(retry.max_delay, Duration::from_millis(20));
        assert_eq!(StreamConfig::from_lookup(&lookup).unwrap().batch_size, 25);
    }

    #[test]
    fn test_unparseable_value_is_rejected() {
        let err = StreamConfig::from_lookup(vars(&[(STREAM_BATCH_SIZE_VAR, "lots")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                key: STREAM_BATCH_SIZE_VAR.to_string(),
                value: "lots".to_string(),
                expected: "batch size",
            }
        );
    }

    #[test]
    fn test_out_of_range_values_are_rejected() {
        assert!(DeduplicationConfig::from_lookup(vars(&[(DEDUP_WINDOW_HOURS_VAR, "0")])).is_err());
        assert!(RetryConfig::from_lookup(vars(&[(RETRY_MAX_ATTEMPTS_VAR, "0")])).is_err());
        assert!(RetryConfig::from_lookup(vars(&[
            (RETRY_MIN_DELAY_MS_VAR, "900"),
            (RETRY_MAX_DELAY_MS_VAR, "100"),
        ]))
        .is_err());
        assert!(StreamConfig::from_lookup(vars(&[(STREAM_BATCH_SIZE_VAR, "0")])).is_err());
    }

    #[test]
    fn test_oversized_dedup_window_is_rejected() {
        let max = i64::MAX.to_string();
        let err = DeduplicationConfig::from_lookup(vars(&[(DEDUP_WINDOW_HOURS_VAR, max.as_str())]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange(_)));
    }
}
