//! Byte ranges into one source text.

use serde::{Deserialize, Serialize};

/// Half-open byte range `start..end` produced by the tokenizer.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub struct Span {
    /// First byte covered.
    pub start: u32,
    /// One past the last byte covered.
    pub end: u32,
}

impl Span {
    /// Creates the span `start..end`.
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// The text this span covers in `source`, or `""` when it does not fall
    /// on character boundaries inside `source`.
    pub fn slice<'a>(&self, source: &'a str) -> &'a str {
        source.get(self.start as usize..self.end as usize).unwrap_or("")
    }

    /// Whether `offset` lies inside the span.
    pub fn contains(&self, offset: u32) -> bool {
        self.start <= offset && offset < self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_reads_covered_text() {
        let src = "value = 42\n";
        assert_eq!(Span::new(0, 5).slice(src), "value");
        assert_eq!(Span::new(8, 10).slice(src), "42");
    }

    #[test]
    fn slice_out_of_range_is_empty() {
        assert_eq!(Span::new(4, 40).slice("short"), "");
        // Splits the two-byte 'é'.
        assert_eq!(Span::new(0, 1).slice("é"), "");
    }

    #[test]
    fn contains_is_half_open() {
        let span = Span::new(3, 6);
        assert!(span.contains(3));
        assert!(span.contains(5));
        assert!(!span.contains(6));
        assert!(!Span::new(2, 2).contains(2));
    }
}
