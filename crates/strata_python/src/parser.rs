//! Core parser infrastructure and block-level parsing rules.
//!
//! The [`PyParser`] struct provides primitive operations (advance, expect,
//! eat) over the token stream. Statement rules live in `stmt.rs` and
//! expression rules in `expr.rs`; both extend [`PyParser`] with further
//! `impl` blocks.

use crate::ast::*;
use crate::error::ParseError;
use crate::token::{PyToken, Token};
use strata_source::Span;

/// Result type used throughout the parser.
pub(crate) type PResult<T> = Result<T, ParseError>;

/// A recursive descent parser for Python source text.
///
/// The parser consumes a token stream produced by the lexer and builds a
/// [`Module`]. It stops at the first syntax error.
pub struct PyParser<'src> {
    pub(crate) tokens: Vec<Token>,
    pub(crate) pos: usize,
    pub(crate) source: &'src str,
    /// End offset of the last consumed non-layout token.
    pub(crate) last_end: u32,
}

impl<'src> PyParser<'src> {
    /// Creates a new parser from a token stream.
    ///
    /// The stream must end with [`PyToken::Eof`], as produced by
    /// [`crate::lexer::lex`].
    pub fn new(source: &'src str, tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            source,
            last_end: 0,
        }
    }

    // ========================================================================
    // Primitive operations
    // ========================================================================

    /// Returns the kind of the current token.
    pub(crate) fn current(&self) -> PyToken {
        self.peek_kind(0)
    }

    /// Returns the kind of the token `n` positions ahead.
    pub(crate) fn peek_kind(&self, n: usize) -> PyToken {
        self.tokens
            .get(self.pos + n)
            .map(|t| t.kind)
            .unwrap_or(PyToken::Eof)
    }

    /// Returns the span of the current token.
    pub(crate) fn current_span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .or(self.tokens.last())
            .map(|t| t.span)
            .unwrap_or_default()
    }

    /// Returns the source text of the current token.
    pub(crate) fn current_text(&self) -> &'src str {
        self.text_of(self.current_span())
    }

    /// Returns the source text covered by a span.
    pub(crate) fn text_of(&self, span: Span) -> &'src str {
        span.slice(self.source)
    }

    /// Returns `true` if the current token matches the given kind.
    pub(crate) fn at(&self, kind: PyToken) -> bool {
        self.current() == kind
    }

    /// Returns `true` if the current token is the given soft keyword.
    pub(crate) fn at_soft_keyword(&self, word: &str) -> bool {
        self.at(PyToken::Name) && self.current_text() == word
    }

    /// Advances past the current token. Never moves past end of file.
    pub(crate) fn advance(&mut self) {
        if self.pos + 1 < self.tokens.len() {
            let tok = self.tokens[self.pos];
            if !tok.kind.is_layout() {
                self.last_end = tok.span.end;
            }
            self.pos += 1;
        }
    }

    /// Consumes the current token if it matches the given kind. Returns `true` if consumed.
    pub(crate) fn eat(&mut self, kind: PyToken) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Expects the current token to match the given kind.
    pub(crate) fn expect(&mut self, kind: PyToken, what: &str) -> PResult<()> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(self.expected(what))
        }
    }

    /// Expects and returns an identifier.
    pub(crate) fn expect_name(&mut self) -> PResult<String> {
        if self.at(PyToken::Name) {
            let text = self.current_text().to_string();
            self.advance();
            Ok(text)
        } else {
            Err(self.expected("identifier"))
        }
    }

    /// Builds an error at the current token.
    pub(crate) fn error(&self, msg: impl Into<String>) -> ParseError {
        ParseError::new(self.current_span().start, msg)
    }

    /// Builds an "expected X" error at the current token.
    pub(crate) fn expected(&self, what: &str) -> ParseError {
        let found = match self.current() {
            PyToken::Newline => "end of line".to_string(),
            PyToken::Indent => "indent".to_string(),
            PyToken::Dedent => "dedent".to_string(),
            PyToken::Eof => "end of file".to_string(),
            _ => format!("'{}'", self.current_text()),
        };
        self.error(format!("expected {what}, found {found}"))
    }

    /// Returns the span from `start` to the end of the last consumed token.
    pub(crate) fn span_from(&self, start: u32) -> Span {
        Span::new(start, self.last_end.max(start))
    }

    // ========================================================================
    // Module and blocks
    // ========================================================================

    /// Parses a complete module.
    pub fn parse_module(&mut self) -> PResult<Module> {
        let mut body = Vec::new();
        while !self.at(PyToken::Eof) {
            if self.eat(PyToken::Newline) {
                continue;
            }
            body.push(self.parse_statement()?);
        }
        Ok(Module { body })
    }

    /// Parses `: NEWLINE INDENT stmt+ DEDENT` or `: simple_line`.
    pub(crate) fn parse_block(&mut self) -> PResult<Vec<Stmt>> {
        self.expect(PyToken::Colon, "':'")?;
        if !self.eat(PyToken::Newline) {
            return Ok(vec![self.parse_simple_line()?]);
        }
        if !self.eat(PyToken::Indent) {
            return Err(self.error("expected an indented block"));
        }
        let mut body = Vec::new();
        while !self.eat(PyToken::Dedent) {
            if self.at(PyToken::Eof) {
                return Err(self.expected("dedent"));
            }
            body.push(self.parse_statement()?);
        }
        Ok(body)
    }

    /// Skips a bracketed PEP 695 type parameter list such as `[T: int, *Ts]`.
    pub(crate) fn skip_type_params(&mut self) -> PResult<()> {
        if !self.at(PyToken::LBracket) {
            return Ok(());
        }
        let mut depth = 0usize;
        loop {
            match self.current() {
                PyToken::LBracket | PyToken::LParen | PyToken::LBrace => depth += 1,
                PyToken::RBracket | PyToken::RParen | PyToken::RBrace => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        self.advance();
                        return Ok(());
                    }
                }
                PyToken::Eof | PyToken::Newline => return Err(self.expected("']'")),
                _ => {}
            }
            self.advance();
        }
    }
}
