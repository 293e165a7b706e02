//! Content hashing for unit identity and cache validation.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A 128-bit content hash computed using XXH3.
///
/// Two units with the same `ContentHash` are assumed to have identical
/// normalized source. Used for unit identifiers, per-line diffing, and
/// validating cached compiler output.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash([u8; 16]);

/// Error returned when parsing a [`ContentHash`] from its hex form fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid content hash '{input}': expected 32 hex digits")]
pub struct ParseHashError {
    /// The rejected input.
    pub input: String,
}

impl ContentHash {
    /// Sentinel hash assigned to wholly blank lines.
    pub const BLANK: ContentHash = ContentHash([0; 16]);

    /// Computes a content hash from a byte slice using XXH3-128.
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = xxhash_rust::xxh3::xxh3_128(data);
        Self(hash.to_le_bytes())
    }

    /// Hashes text after trimming leading and trailing whitespace from every
    /// line, so re-indentation alone never changes the result.
    pub fn of_normalized(text: &str) -> Self {
        let normalized = text.lines().map(str::trim).collect::<Vec<_>>().join("\n");
        Self::from_bytes(normalized.as_bytes())
    }

    /// Hashes a single line for diffing. Blank lines map to [`ContentHash::BLANK`].
    pub fn of_line(line: &str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            Self::BLANK
        } else {
            Self::from_bytes(trimmed.as_bytes())
        }
    }

    /// Returns the first eight hex digits, used as the suffix of unit ids.
    pub fn short(&self) -> String {
        let mut s = self.to_string();
        s.truncate(8);
        s
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({:02x}{:02x}..)", self.0[0], self.0[1])
    }
}

impl FromStr for ContentHash {
    type Err = ParseHashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseHashError {
            input: s.to_string(),
        };
        if s.len() != 32 || !s.is_ascii() {
            return Err(err());
        }
        let mut bytes = [0u8; 16];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16).map_err(|_| err())?;
        }
        Ok(Self(bytes))
    }
}

// Cache files are JSON meant to be inspected by hand, so the hash travels as hex.
impl Serialize for ContentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        let a = ContentHash::from_bytes(b"hello world");
        let b = ContentHash::from_bytes(b"hello world");
        assert_eq!(a, b);
    }

    #[test]
    fn different_inputs_differ() {
        let a = ContentHash::from_bytes(b"hello");
        let b = ContentHash::from_bytes(b"world");
        assert_ne!(a, b);
    }

    #[test]
    fn normalized_ignores_indentation() {
        let a = ContentHash::of_normalized("def f():\n    return 1\n");
        let b = ContentHash::of_normalized("def f():\n        return 1   ");
        assert_eq!(a, b);
    }

    #[test]
    fn normalized_sees_token_changes() {
        let a = ContentHash::of_normalized("x = 1");
        let b = ContentHash::of_normalized("x = 2");
        assert_ne!(a, b);
    }

    #[test]
    fn blank_lines_share_sentinel() {
        assert_eq!(ContentHash::of_line(""), ContentHash::BLANK);
        assert_eq!(ContentHash::of_line("   \t"), ContentHash::BLANK);
        assert_ne!(ContentHash::of_line("pass"), ContentHash::BLANK);
    }

    #[test]
    fn line_hash_ignores_surrounding_whitespace() {
        assert_eq!(ContentHash::of_line("  pass"), ContentHash::of_line("pass  "));
    }

    #[test]
    fn display_format() {
        let h = ContentHash::from_bytes(b"test");
        let s = format!("{h}");
        assert_eq!(s.len(), 32, "Display should be 32 hex chars");
        assert!(s.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(h.short(), s[..8]);
    }

    #[test]
    fn debug_abbreviated() {
        let h = ContentHash::from_bytes(b"test");
        let s = format!("{h:?}");
        assert!(s.starts_with("ContentHash("));
        assert!(s.ends_with(")"));
    }

    #[test]
    fn parse_display_roundtrip() {
        let h = ContentHash::from_bytes(b"parse me");
        let back: ContentHash = h.to_string().parse().unwrap();
        assert_eq!(h, back);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!("xyz".parse::<ContentHash>().is_err());
        assert!("zz".repeat(16).parse::<ContentHash>().is_err());
    }

    #[test]
    fn serializes_as_hex_string() {
        let h = ContentHash::from_bytes(b"serde test");
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(json, format!("\"{h}\""));
        let back: ContentHash = serde_json::from_str(&json).unwrap();
        assert_eq!(h, back);
    }
}
