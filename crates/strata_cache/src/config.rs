//! Cache tuning knobs.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Limits and timings for the caches.
///
/// Every field has a default, so a `[cache]` table may set any subset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of resident entries.
    pub max_entries: usize,
    /// Maximum total size of resident outputs, in MiB.
    pub max_size_mb: u64,
    /// Whether the smart cache runs a background warmup worker.
    pub enable_warmup: bool,
    /// How many predicted successors a hit may announce for warmup.
    pub prefetch_fanout: usize,
    /// Capacity of the warmup job queue.
    pub warmup_queue: usize,
    /// Event log capacity. When exceeded the oldest half is dropped.
    pub max_events: usize,
    /// How many of the most recent events are written on save.
    pub persisted_events: usize,
    /// How many compile records the simple cache keeps, oldest dropped first.
    pub history_cap: usize,
    /// How long the warmup worker waits for a job before rechecking for
    /// shutdown, in milliseconds.
    pub warmup_poll_ms: u64,
    /// How long shutdown waits for the warmup worker, in milliseconds.
    pub join_timeout_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            max_size_mb: 500,
            enable_warmup: true,
            prefetch_fanout: 3,
            warmup_queue: 256,
            max_events: 10_000,
            persisted_events: 1_000,
            history_cap: 10_000,
            warmup_poll_ms: 1_000,
            join_timeout_ms: 2_000,
        }
    }
}

impl CacheConfig {
    /// The size cap in bytes.
    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_mb.saturating_mul(1024 * 1024)
    }

    /// Warmup poll interval as a [`Duration`].
    pub fn warmup_poll(&self) -> Duration {
        Duration::from_millis(self.warmup_poll_ms)
    }

    /// Shutdown wait as a [`Duration`].
    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }

    /// Returns the name of the first limit that is zero, if any.
    ///
    /// A zero cap would make every `put` evict everything, so loaders
    /// reject it.
    pub fn zero_limit(&self) -> Option<&'static str> {
        [
            ("cache.max_entries", self.max_entries as u64),
            ("cache.max_size_mb", self.max_size_mb),
            ("cache.warmup_queue", self.warmup_queue as u64),
            ("cache.max_events", self.max_events as u64),
            ("cache.warmup_poll_ms", self.warmup_poll_ms),
        ]
        .into_iter()
        .find(|(_, value)| *value == 0)
        .map(|(name, _)| name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = CacheConfig::default();
        assert_eq!(config.max_entries, 10_000);
        assert_eq!(config.max_size_bytes(), 500 * 1024 * 1024);
        assert_eq!(config.warmup_poll(), Duration::from_secs(1));
        assert_eq!(config.join_timeout(), Duration::from_secs(2));
        assert!(config.zero_limit().is_none());
    }

    #[test]
    fn partial_json_uses_defaults() {
        let config: CacheConfig = serde_json::from_str(r#"{"max_entries": 4}"#).unwrap();
        assert_eq!(config.max_entries, 4);
        assert_eq!(config.prefetch_fanout, 3);
    }

    #[test]
    fn zero_limit_is_reported() {
        let config = CacheConfig {
            max_size_mb: 0,
            ..CacheConfig::default()
        };
        assert_eq!(config.zero_limit(), Some("cache.max_size_mb"));
    }
}
