//! Source text management and span tracking.
//!
//! This crate provides [`SourceText`] for holding one file's content with a
//! precomputed line index, and [`Span`] for byte ranges within it. The
//! analyzer works in byte spans and reports units in 1-based line numbers.

#![warn(missing_docs)]

pub mod source_text;
pub mod span;

pub use source_text::SourceText;
pub use span::Span;
