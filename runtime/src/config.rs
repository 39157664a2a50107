//! Engine tuning loaded from the environment.

use crate::retry::RetryPolicy;
use std::time::Duration;

/// Tunables for the hold table, broadcaster and commit pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Lifetime of a hold from its last `request_hold` (`HOLD_TTL_SECS`)
    pub hold_ttl: Duration,
    /// How often the sweeper evicts expired holds (`HOLD_SWEEP_INTERVAL_SECS`)
    pub sweep_interval: Duration,
    /// Per-unit broadcast channel buffer (`AVAILABILITY_CHANNEL_CAPACITY`)
    pub broadcast_capacity: usize,
    /// Backoff for compensating rollbacks (`ROLLBACK_*`)
    pub rollback_retry: RetryPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            hold_ttl: Duration::from_secs(600),
            sweep_interval: Duration::from_secs(5),
            broadcast_capacity: 256,
            rollback_retry: RetryPolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    ///
    /// Missing, unparsable or zero values fall back to the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let positive = |key: &str| {
            lookup(key)
                .and_then(|value| value.trim().parse::<u64>().ok())
                .filter(|value| *value > 0)
        };

        let rollback_retry = RetryPolicy::builder()
            .max_retries(
                lookup("ROLLBACK_MAX_RETRIES")
                    .and_then(|value| value.trim().parse().ok())
                    .unwrap_or(defaults.rollback_retry.max_retries),
            )
            .initial_delay(
                positive("ROLLBACK_INITIAL_DELAY_MS")
                    .map_or(defaults.rollback_retry.initial_delay, Duration::from_millis),
            )
            .max_delay(
                positive("ROLLBACK_MAX_DELAY_MS")
                    .map_or(defaults.rollback_retry.max_delay, Duration::from_millis),
            )
            .build();

        Self {
            hold_ttl: positive("HOLD_TTL_SECS").map_or(defaults.hold_ttl, Duration::from_secs),
            sweep_interval: positive("HOLD_SWEEP_INTERVAL_SECS")
                .map_or(defaults.sweep_interval, Duration::from_secs),
            broadcast_capacity: positive("AVAILABILITY_CHANNEL_CAPACITY")
                .and_then(|value| usize::try_from(value).ok())
                .unwrap_or(defaults.broadcast_capacity),
            rollback_retry,
        }
    }
}
