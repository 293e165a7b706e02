//! Cached compiler outputs.

use serde::{Deserialize, Serialize};
use strata_common::{now_millis, ContentHash};

/// One cached compiler output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The unit id the output belongs to.
    pub key: String,
    /// Hash of the unit content the output was compiled from.
    pub content_hash: ContentHash,
    /// The compiler output.
    pub output: String,
    /// When the entry was written, in Unix milliseconds.
    pub created_at: u64,
    /// When the entry was last read or written, in Unix milliseconds.
    pub last_access: u64,
    /// Number of writes and hits.
    pub access_count: u64,
    /// Keys this entry's unit depends on.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Source file of the unit.
    #[serde(default)]
    pub file_path: String,
    /// First and last line of the unit.
    #[serde(default)]
    pub line_range: (u32, u32),
    /// How long the compile took.
    #[serde(default)]
    pub compile_time_ms: u64,
    /// Size of `output` in bytes.
    pub size_bytes: u64,
}

/// Descriptive data attached to an entry on `put`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryMeta {
    /// Keys the unit depends on, for [`crate::CacheBackend::invalidate_by_dependency`].
    pub dependencies: Vec<String>,
    /// Source file of the unit.
    pub file_path: String,
    /// First and last line of the unit.
    pub line_range: (u32, u32),
    /// How long the compile took.
    pub compile_time_ms: u64,
}

impl CacheEntry {
    /// Builds a freshly written entry with an access count of one.
    pub fn new(key: &str, output: &str, content_hash: ContentHash, meta: EntryMeta) -> Self {
        let now = now_millis();
        Self {
            key: key.to_string(),
            content_hash,
            output: output.to_string(),
            created_at: now,
            last_access: now,
            access_count: 1,
            dependencies: meta.dependencies,
            file_path: meta.file_path,
            line_range: meta.line_range,
            compile_time_ms: meta.compile_time_ms,
            size_bytes: output.len() as u64,
        }
    }

    /// Records a read.
    pub fn touch(&mut self) {
        self.access_count += 1;
        self.last_access = now_millis();
    }

    /// Whether the entry was compiled from content with `hash`.
    pub fn matches(&self, hash: &ContentHash) -> bool {
        self.content_hash == *hash
    }

    /// Summary used by hot-entry listings.
    pub fn hot(&self) -> HotEntry {
        HotEntry {
            key: self.key.clone(),
            access_count: self.access_count,
            file_path: self.file_path.clone(),
            line_range: self.line_range,
        }
    }
}

/// A frequently used entry, as reported by `hot_entries`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HotEntry {
    /// The entry key.
    pub key: String,
    /// Number of writes and hits.
    pub access_count: u64,
    /// Source file of the unit.
    pub file_path: String,
    /// First and last line of the unit.
    pub line_range: (u32, u32),
}

/// Returns the `limit` most accessed entries, most accessed first. Equal
/// counts keep iteration order.
pub(crate) fn hottest<'a>(entries: impl Iterator<Item = &'a CacheEntry>, limit: usize) -> Vec<HotEntry> {
    let mut all: Vec<&CacheEntry> = entries.collect();
    all.sort_by(|a, b| b.access_count.cmp(&a.access_count));
    all.into_iter().take(limit).map(CacheEntry::hot).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(key: &str, count: u64) -> CacheEntry {
        let mut e = CacheEntry::new(key, "out", ContentHash::from_bytes(key.as_bytes()), EntryMeta::default());
        e.access_count = count;
        e
    }

    #[test]
    fn new_entry_counts_one_access() {
        let meta = EntryMeta {
            file_path: "m.py".to_string(),
            line_range: (3, 5),
            ..EntryMeta::default()
        };
        let e = CacheEntry::new("k", "héllo", ContentHash::from_bytes(b"h"), meta);
        assert_eq!(e.access_count, 1);
        assert_eq!(e.size_bytes, "héllo".len() as u64);
        assert_eq!(e.created_at, e.last_access);
        assert_eq!(e.line_range, (3, 5));
    }

    #[test]
    fn touch_increments() {
        let mut e = entry("k", 1);
        e.touch();
        assert_eq!(e.access_count, 2);
    }

    #[test]
    fn hottest_orders_by_count() {
        let entries = [entry("a", 1), entry("b", 5), entry("c", 3)];
        let hot = hottest(entries.iter(), 2);
        let keys: Vec<_> = hot.iter().map(|h| h.key.as_str()).collect();
        assert_eq!(keys, vec!["b", "c"]);
    }

    #[test]
    fn serde_roundtrip() {
        let e = entry("m.py:1:1:0000abcd", 4);
        let json = serde_json::to_string(&e).unwrap();
        let back: CacheEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, e);
    }
}
