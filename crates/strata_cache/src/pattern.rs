//! Access-order tracking used to predict the next key.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Maximum number of distinct successors remembered per key.
pub const MAX_SUCCESSORS: usize = 10;

/// Keys seen right after one particular key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessPattern {
    /// Distinct successors in first-seen order.
    pub sequence: Vec<String>,
    /// Number of recorded transitions out of the key.
    pub frequency: u64,
}

impl AccessPattern {
    /// Records that `next` followed this pattern's key.
    pub fn record_next(&mut self, next: &str) {
        if self.sequence.len() < MAX_SUCCESSORS && !self.sequence.iter().any(|k| k == next) {
            self.sequence.push(next.to_string());
        }
        self.frequency += 1;
    }
}

/// All access patterns plus the most recently accessed key.
#[derive(Debug, Clone, Default)]
pub(crate) struct PatternTable {
    patterns: BTreeMap<String, AccessPattern>,
    last: Option<String>,
}

impl PatternTable {
    pub(crate) fn from_patterns(patterns: BTreeMap<String, AccessPattern>) -> Self {
        Self { patterns, last: None }
    }

    /// Records an access to `key`, linking it from the previous key.
    pub(crate) fn record(&mut self, key: &str) {
        if let Some(prev) = self.last.as_deref() {
            if prev != key {
                self.patterns.entry(prev.to_string()).or_default().record_next(key);
            }
        }
        self.last = Some(key.to_string());
    }

    /// Up to `count` keys seen after `key`, in first-seen order.
    pub(crate) fn successors(&self, key: &str, count: usize) -> &[String] {
        match self.patterns.get(key) {
            Some(p) => &p.sequence[..p.sequence.len().min(count)],
            None => &[],
        }
    }

    pub(crate) fn patterns(&self) -> &BTreeMap<String, AccessPattern> {
        &self.patterns
    }

    pub(crate) fn len(&self) -> usize {
        self.patterns.len()
    }

    pub(crate) fn clear(&mut self) {
        self.patterns.clear();
        self.last = None;
    }
}
