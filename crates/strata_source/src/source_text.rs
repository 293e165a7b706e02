//! One file's source text with line-start indexing for fast line lookup.

use crate::span::Span;

/// A source file loaded for analysis.
///
/// Stores the file's content along with precomputed line-start offsets so
/// byte spans produced by the tokenizer can be mapped to 1-based lines.
pub struct SourceText {
    /// The file path as given by the caller (used verbatim in unit ids).
    pub path: String,
    /// The full text content of the file.
    pub content: String,
    /// Byte offsets of each line start (the first entry is always 0).
    line_starts: Vec<u32>,
}

impl SourceText {
    /// Indexes `content` for line lookups.
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        let line_starts = compute_line_starts(&content);
        Self {
            path: path.into(),
            content,
            line_starts,
        }
    }

    /// Converts a byte offset into 1-indexed (line, column) coordinates.
    pub fn line_col(&self, byte_offset: u32) -> (u32, u32) {
        let line_idx = match self.line_starts.binary_search(&byte_offset) {
            Ok(idx) => idx,
            Err(idx) => idx - 1,
        };
        let line = (line_idx as u32) + 1;
        let col = byte_offset - self.line_starts[line_idx] + 1;
        (line, col)
    }

    /// Returns the 1-based line containing the byte offset.
    pub fn line_of(&self, byte_offset: u32) -> u32 {
        self.line_col(byte_offset).0
    }

    /// Returns the 1-based (first, last) lines covered by a span. An empty
    /// span ending at a line start is attributed to the previous line.
    pub fn line_range(&self, span: Span) -> (u32, u32) {
        let first = self.line_of(span.start);
        let last = self.line_of(span.end.saturating_sub(1).max(span.start));
        (first, last)
    }

    /// Returns the text of lines `start..=end` (1-based) joined with `\n`.
    ///
    /// Out-of-range requests yield an empty string.
    pub fn lines_text(&self, start: u32, end: u32) -> String {
        if start == 0 || end < start {
            return String::new();
        }
        let lines: Vec<&str> = self
            .content
            .lines()
            .skip((start - 1) as usize)
            .take((end - start + 1) as usize)
            .collect();
        lines.join("\n")
    }
}

/// Computes the byte offsets of each line start in the given content.
fn compute_line_starts(content: &str) -> Vec<u32> {
    let mut starts = vec![0u32];
    for (i, byte) in content.bytes().enumerate() {
        if byte == b'\n' {
            starts.push((i + 1) as u32);
        }
    }
    starts
}
