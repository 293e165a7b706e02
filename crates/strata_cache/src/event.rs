//! Bounded log of cache events.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use strata_common::now_millis;

/// What happened to a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CacheEventKind {
    /// A read found a valid entry.
    Hit,
    /// A read found nothing, or an entry for different content.
    Miss,
    /// An entry was written.
    Write,
    /// An entry was removed by eviction or invalidation.
    Evict,
    /// The warmup worker compiled and stored an entry.
    Warmup,
    /// A key was predicted to be needed soon.
    Predict,
}

impl fmt::Display for CacheEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CacheEventKind::Hit => "hit",
            CacheEventKind::Miss => "miss",
            CacheEventKind::Write => "write",
            CacheEventKind::Evict => "evict",
            CacheEventKind::Warmup => "warmup",
            CacheEventKind::Predict => "predict",
        };
        f.write_str(name)
    }
}

/// A single logged event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEvent {
    /// Event type.
    #[serde(rename = "type")]
    pub kind: CacheEventKind,
    /// The key the event concerns.
    pub key: String,
    /// Unix milliseconds.
    pub timestamp: u64,
    /// Free-form detail, possibly empty.
    #[serde(default)]
    pub detail: String,
}

/// Event ring. Once `capacity` is exceeded the oldest half is discarded.
#[derive(Debug, Clone)]
pub(crate) struct EventLog {
    events: VecDeque<CacheEvent>,
    capacity: usize,
}

impl EventLog {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            events: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    pub(crate) fn from_events(events: Vec<CacheEvent>, capacity: usize) -> Self {
        let mut log = Self::new(capacity);
        for event in events {
            log.push_event(event);
        }
        log
    }

    pub(crate) fn record(&mut self, kind: CacheEventKind, key: &str, detail: impl Into<String>) {
        self.push_event(CacheEvent {
            kind,
            key: key.to_string(),
            timestamp: now_millis(),
            detail: detail.into(),
        });
    }

    fn push_event(&mut self, event: CacheEvent) {
        self.events.push_back(event);
        if self.events.len() > self.capacity {
            let keep = self.capacity / 2;
            let drop = self.events.len() - keep;
            self.events.drain(..drop);
        }
    }

    /// The last `count` events, oldest first.
    pub(crate) fn recent(&self, count: usize) -> Vec<CacheEvent> {
        let skip = self.events.len().saturating_sub(count);
        self.events.iter().skip(skip).cloned().collect()
    }

    pub(crate) fn clear(&mut self) {
        self.events.clear();
    }
}
