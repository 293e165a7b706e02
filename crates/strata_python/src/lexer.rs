//! Lexical analyzer for Python source text.
//!
//! Converts source text into a sequence of [`Token`]s. Indentation at the
//! start of each logical line is turned into [`PyToken::Indent`] and
//! [`PyToken::Dedent`] tokens, line breaks inside brackets or after a
//! backslash are ignored, and blank or comment-only lines produce nothing.
//! The first error stops lexing.

use crate::error::ParseError;
use crate::token::{lookup_keyword, PyToken, Token};
use strata_source::Span;

/// Tab stops used when measuring indentation.
const TAB_WIDTH: u32 = 8;

/// Lexes the given source text into a vector of tokens.
///
/// The returned vector always ends with a [`PyToken::Eof`] token, preceded by
/// a final [`PyToken::Newline`] (when any tokens were produced) and one
/// [`PyToken::Dedent`] per open indentation level.
pub fn lex(source: &str) -> Result<Vec<Token>, ParseError> {
    lex_at(source, 0)
}

/// Lexes `source` as if it began at byte `base` of an enclosing text.
///
/// Used for the replacement fields of f-strings so that token spans point
/// into the enclosing file.
pub(crate) fn lex_at(source: &str, base: u32) -> Result<Vec<Token>, ParseError> {
    let mut lexer = Lexer {
        source: source.as_bytes(),
        pos: 0,
        base,
        tokens: Vec::new(),
        indents: vec![0],
        brackets: Vec::new(),
        at_line_start: true,
    };
    lexer.lex_all()?;
    Ok(lexer.tokens)
}

struct Lexer<'a> {
    source: &'a [u8],
    pos: usize,
    base: u32,
    tokens: Vec<Token>,
    indents: Vec<u32>,
    /// Open brackets with the offset of each opener.
    brackets: Vec<(u8, usize)>,
    at_line_start: bool,
}

impl<'a> Lexer<'a> {
    fn lex_all(&mut self) -> Result<(), ParseError> {
        loop {
            if self.at_line_start && self.brackets.is_empty() && !self.handle_indentation()? {
                continue;
            }
            self.skip_inline_whitespace();
            match self.peek() {
                None => break,
                Some(b'#') => self.skip_comment(),
                Some(b'\\') if self.continuation_follows() => self.skip_continuation(),
                Some(b'\n') | Some(b'\r') => {
                    let start = self.pos;
                    self.consume_line_break();
                    if self.brackets.is_empty() {
                        self.push(PyToken::Newline, start, start + 1);
                        self.at_line_start = true;
                    }
                }
                Some(_) => self.next_token()?,
            }
        }
        self.finish()
    }

    fn peek(&self) -> Option<u8> {
        self.source.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.source.get(self.pos + offset).copied()
    }

    fn offset(&self, pos: usize) -> u32 {
        self.base + pos as u32
    }

    fn push(&mut self, kind: PyToken, start: usize, end: usize) {
        let span = Span::new(self.offset(start), self.offset(end));
        self.tokens.push(Token { kind, span });
    }

    fn error(&self, pos: usize, message: impl Into<String>) -> ParseError {
        ParseError::new(self.offset(pos), message)
    }

    /// Measures the indentation of a new line and emits layout tokens.
    ///
    /// Returns `false` when the line was blank or comment-only and has been
    /// consumed entirely.
    fn handle_indentation(&mut self) -> Result<bool, ParseError> {
        let mut column = 0u32;
        while let Some(b) = self.peek() {
            match b {
                b' ' => column += 1,
                b'\t' => column = (column / TAB_WIDTH + 1) * TAB_WIDTH,
                b'\x0c' => column = 0,
                _ => break,
            }
            self.pos += 1;
        }
        match self.peek() {
            None => return Ok(true),
            Some(b'#') => {
                self.skip_comment();
                self.consume_line_break();
                return Ok(false);
            }
            Some(b'\n') | Some(b'\r') => {
                self.consume_line_break();
                return Ok(false);
            }
            Some(b'\\') if self.continuation_follows() => {
                self.skip_continuation();
                return Ok(false);
            }
            Some(_) => {}
        }

        self.at_line_start = false;
        let current = self.indents.last().copied().unwrap_or(0);
        if column > current {
            self.indents.push(column);
            self.push(PyToken::Indent, self.pos, self.pos);
        } else if column < current {
            while self.indents.last().is_some_and(|&top| top > column) {
                self.indents.pop();
                self.push(PyToken::Dedent, self.pos, self.pos);
            }
            if self.indents.last().copied() != Some(column) {
                return Err(self.error(
                    self.pos,
                    "unindent does not match any outer indentation level",
                ));
            }
        }
        Ok(true)
    }

    fn skip_inline_whitespace(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\x0c')) {
            self.pos += 1;
        }
    }

    fn skip_comment(&mut self) {
        while !matches!(self.peek(), None | Some(b'\n' | b'\r')) {
            self.pos += 1;
        }
    }

    fn continuation_follows(&self) -> bool {
        match self.peek_at(1) {
            Some(b'\n') => true,
            Some(b'\r') => true,
            None => true,
            _ => false,
        }
    }

    fn skip_continuation(&mut self) {
        self.pos += 1;
        self.consume_line_break();
    }

    fn consume_line_break(&mut self) {
        match self.peek() {
            Some(b'\r') => {
                self.pos += 1;
                if self.peek() == Some(b'\n') {
                    self.pos += 1;
                }
            }
            Some(b'\n') => self.pos += 1,
            _ => {}
        }
    }

    fn finish(&mut self) -> Result<(), ParseError> {
        if let Some(&(open, at)) = self.brackets.last() {
            return Err(self.error(at, format!("'{}' was never closed", open as char)));
        }
        let end = self.source.len();
        let needs_newline = self
            .tokens
            .last()
            .is_some_and(|t| !matches!(t.kind, PyToken::Newline | PyToken::Dedent));
        if needs_newline {
            self.push(PyToken::Newline, end, end);
        }
        while self.indents.len() > 1 {
            self.indents.pop();
            self.push(PyToken::Dedent, end, end);
        }
        self.push(PyToken::Eof, end, end);
        Ok(())
    }

    fn next_token(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        let Some(b) = self.peek() else {
            return Ok(());
        };

        if is_ident_start(b) {
            return self.lex_name_or_prefixed_string(start);
        }
        if b.is_ascii_digit() || (b == b'.' && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()))
        {
            self.lex_number();
            self.push(PyToken::Number, start, self.pos);
            return Ok(());
        }
        if b == b'"' || b == b'\'' {
            self.lex_string_body(start)?;
            self.push(PyToken::String, start, self.pos);
            return Ok(());
        }
        self.lex_operator(start)
    }

    fn lex_name_or_prefixed_string(&mut self, start: usize) -> Result<(), ParseError> {
        while self.peek().is_some_and(is_ident_continue) {
            self.pos += 1;
        }
        let text = &self.source[start..self.pos];
        if matches!(self.peek(), Some(b'"' | b'\'')) && is_string_prefix(text) {
            let formatted = text.iter().any(|c| c.eq_ignore_ascii_case(&b'f'));
            self.lex_string_body(start)?;
            let kind = if formatted {
                PyToken::FString
            } else {
                PyToken::String
            };
            self.push(kind, start, self.pos);
            return Ok(());
        }
        let kind = std::str::from_utf8(text)
            .ok()
            .and_then(lookup_keyword)
            .unwrap_or(PyToken::Name);
        self.push(kind, start, self.pos);
        Ok(())
    }

    /// Consumes a quoted string starting at the current quote character.
    fn lex_string_body(&mut self, token_start: usize) -> Result<(), ParseError> {
        let Some(quote) = self.peek() else {
            return Ok(());
        };
        let triple = self.peek_at(1) == Some(quote) && self.peek_at(2) == Some(quote);
        self.pos += if triple { 3 } else { 1 };
        loop {
            match self.peek() {
                None => {
                    return Err(self.error(token_start, "unterminated string literal"));
                }
                Some(b'\\') => {
                    self.pos += 1;
                    if self.peek() == Some(b'\r') {
                        self.consume_line_break();
                    } else if self.peek().is_some() {
                        self.pos += 1;
                    }
                }
                Some(b'\n' | b'\r') if !triple => {
                    return Err(self.error(token_start, "unterminated string literal"));
                }
                Some(c) if c == quote => {
                    if !triple {
                        self.pos += 1;
                        return Ok(());
                    }
                    if self.peek_at(1) == Some(quote) && self.peek_at(2) == Some(quote) {
                        self.pos += 3;
                        return Ok(());
                    }
                    self.pos += 1;
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    fn lex_number(&mut self) {
        let radix_prefixed = self.peek() == Some(b'0')
            && matches!(self.peek_at(1), Some(b'x' | b'X' | b'o' | b'O' | b'b' | b'B'));
        while let Some(b) = self.peek() {
            if b.is_ascii_alphanumeric() || b == b'_' {
                self.pos += 1;
                if !radix_prefixed
                    && (b == b'e' || b == b'E')
                    && matches!(self.peek(), Some(b'+' | b'-'))
                {
                    self.pos += 1;
                }
            } else if b == b'.' && !radix_prefixed && self.peek_at(1) != Some(b'.') {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn lex_operator(&mut self, start: usize) -> Result<(), ParseError> {
        let b = self.source[start];
        let b1 = self.peek_at(1);
        let b2 = self.peek_at(2);

        let (kind, len) = match (b, b1, b2) {
            (b'.', Some(b'.'), Some(b'.')) => (PyToken::Ellipsis, 3),
            (b'*', Some(b'*'), Some(b'=')) => (PyToken::AugAssign, 3),
            (b'/', Some(b'/'), Some(b'=')) => (PyToken::AugAssign, 3),
            (b'>', Some(b'>'), Some(b'=')) => (PyToken::AugAssign, 3),
            (b'<', Some(b'<'), Some(b'=')) => (PyToken::AugAssign, 3),
            (b'*', Some(b'*'), _) => (PyToken::DoubleStar, 2),
            (b'/', Some(b'/'), _) => (PyToken::DoubleSlash, 2),
            (b'<', Some(b'<'), _) => (PyToken::LShift, 2),
            (b'>', Some(b'>'), _) => (PyToken::RShift, 2),
            (b'<', Some(b'='), _) => (PyToken::Le, 2),
            (b'>', Some(b'='), _) => (PyToken::Ge, 2),
            (b'=', Some(b'='), _) => (PyToken::EqEq, 2),
            (b'!', Some(b'='), _) => (PyToken::NotEq, 2),
            (b'-', Some(b'>'), _) => (PyToken::Arrow, 2),
            (b':', Some(b'='), _) => (PyToken::ColonEq, 2),
            (b'+' | b'-' | b'*' | b'/' | b'%' | b'&' | b'|' | b'^' | b'@', Some(b'='), _) => {
                (PyToken::AugAssign, 2)
            }
            (b'(', _, _) => (PyToken::LParen, 1),
            (b')', _, _) => (PyToken::RParen, 1),
            (b'[', _, _) => (PyToken::LBracket, 1),
            (b']', _, _) => (PyToken::RBracket, 1),
            (b'{', _, _) => (PyToken::LBrace, 1),
            (b'}', _, _) => (PyToken::RBrace, 1),
            (b':', _, _) => (PyToken::Colon, 1),
            (b',', _, _) => (PyToken::Comma, 1),
            (b';', _, _) => (PyToken::Semicolon, 1),
            (b'.', _, _) => (PyToken::Dot, 1),
            (b'@', _, _) => (PyToken::At, 1),
            (b'=', _, _) => (PyToken::Assign, 1),
            (b'+', _, _) => (PyToken::Plus, 1),
            (b'-', _, _) => (PyToken::Minus, 1),
            (b'*', _, _) => (PyToken::Star, 1),
            (b'/', _, _) => (PyToken::Slash, 1),
            (b'%', _, _) => (PyToken::Percent, 1),
            (b'|', _, _) => (PyToken::Pipe, 1),
            (b'&', _, _) => (PyToken::Amp, 1),
            (b'^', _, _) => (PyToken::Caret, 1),
            (b'~', _, _) => (PyToken::Tilde, 1),
            (b'<', _, _) => (PyToken::Lt, 1),
            (b'>', _, _) => (PyToken::Gt, 1),
            _ => {
                return Err(self.error(start, format!("invalid character '{}'", b as char)));
            }
        };

        match kind {
            PyToken::LParen | PyToken::LBracket | PyToken::LBrace => {
                self.brackets.push((b, start));
            }
            PyToken::RParen | PyToken::RBracket | PyToken::RBrace => {
                let Some((open, _)) = self.brackets.pop() else {
                    return Err(self.error(start, format!("unmatched '{}'", b as char)));
                };
                if closer_for(open) != b {
                    return Err(self.error(
                        start,
                        format!(
                            "closing parenthesis '{}' does not match opening parenthesis '{}'",
                            b as char, open as char
                        ),
                    ));
                }
            }
            _ => {}
        }

        self.pos += len;
        self.push(kind, start, self.pos);
        Ok(())
    }
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b >= 0x80
}

fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b >= 0x80
}

fn is_string_prefix(text: &[u8]) -> bool {
    if text.is_empty() || text.len() > 2 {
        return false;
    }
    let lower: Vec<u8> = text.iter().map(|c| c.to_ascii_lowercase()).collect();
    matches!(
        lower.as_slice(),
        b"r" | b"u" | b"b" | b"f" | b"br" | b"rb" | b"fr" | b"rf"
    )
}

fn closer_for(open: u8) -> u8 {
    match open {
        b'(' => b')',
        b'[' => b']',
        _ => b'}',
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<PyToken> {
        lex(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    fn text_of<'s>(source: &'s str, tok: &Token) -> &'s str {
        tok.span.slice(source)
    }

    #[test]
    fn simple_assignment() {
        assert_eq!(
            kinds("x = 1\n"),
            vec![
                PyToken::Name,
                PyToken::Assign,
                PyToken::Number,
                PyToken::Newline,
                PyToken::Eof
            ]
        );
    }

    #[test]
    fn empty_source_is_just_eof() {
        assert_eq!(kinds(""), vec![PyToken::Eof]);
        assert_eq!(kinds("\n\n# only a comment\n"), vec![PyToken::Eof]);
    }

    #[test]
    fn indent_and_dedent() {
        let src = "def f():\n    return 1\nx = 2\n";
        assert_eq!(
            kinds(src),
            vec![
                PyToken::Def,
                PyToken::Name,
                PyToken::LParen,
                PyToken::RParen,
                PyToken::Colon,
                PyToken::Newline,
                PyToken::Indent,
                PyToken::Return,
                PyToken::Number,
                PyToken::Newline,
                PyToken::Dedent,
                PyToken::Name,
                PyToken::Assign,
                PyToken::Number,
                PyToken::Newline,
                PyToken::Eof
            ]
        );
    }

    #[test]
    fn dedents_flushed_at_eof_without_trailing_newline() {
        let src = "if a:\n    if b:\n        pass";
        let k = kinds(src);
        let tail = &k[k.len() - 4..];
        assert_eq!(
            tail,
            &[
                PyToken::Newline,
                PyToken::Dedent,
                PyToken::Dedent,
                PyToken::Eof
            ]
        );
    }

    #[test]
    fn blank_and_comment_lines_do_not_affect_indentation() {
        let src = "if a:\n\n    # note\n    b = 1\n";
        let k = kinds(src);
        assert_eq!(k.iter().filter(|t| **t == PyToken::Indent).count(), 1);
        assert_eq!(k.iter().filter(|t| **t == PyToken::Newline).count(), 2);
    }

    #[test]
    fn newlines_inside_brackets_are_ignored() {
        let src = "x = [\n    1,\n    2,\n]\n";
        let k = kinds(src);
        assert_eq!(k.iter().filter(|t| **t == PyToken::Newline).count(), 1);
        assert!(!k.contains(&PyToken::Indent));
    }

    #[test]
    fn backslash_continuation() {
        let src = "x = 1 + \\\n    2\n";
        let k = kinds(src);
        assert_eq!(k.iter().filter(|t| **t == PyToken::Newline).count(), 1);
        assert!(!k.contains(&PyToken::Indent));
    }

    #[test]
    fn inconsistent_dedent_is_an_error() {
        let err = lex("if a:\n        b\n    c\n").unwrap_err();
        assert!(err.message.contains("unindent"));
    }

    #[test]
    fn tabs_expand_to_multiples_of_eight() {
        // A tab and eight spaces denote the same level.
        let src = "if a:\n\tb = 1\n        c = 2\n";
        assert!(lex(src).is_ok());
    }

    #[test]
    fn string_prefixes_and_fstrings() {
        let src = "a = rb'x' + f\"{y}\" + u'z'\n";
        let toks = lex(src).unwrap();
        let strings: Vec<_> = toks
            .iter()
            .filter(|t| matches!(t.kind, PyToken::String | PyToken::FString))
            .map(|t| (t.kind, text_of(src, t)))
            .collect();
        assert_eq!(
            strings,
            vec![
                (PyToken::String, "rb'x'"),
                (PyToken::FString, "f\"{y}\""),
                (PyToken::String, "u'z'"),
            ]
        );
    }

    #[test]
    fn triple_quoted_string_spans_lines() {
        let src = "s = \"\"\"one\ntwo \" three\n\"\"\"\nt = 1\n";
        let toks = lex(src).unwrap();
        assert_eq!(toks[2].kind, PyToken::String);
        assert_eq!(toks.iter().filter(|t| t.kind == PyToken::Newline).count(), 2);
    }

    #[test]
    fn escaped_quote_does_not_terminate() {
        let src = "s = 'it\\'s'\n";
        let toks = lex(src).unwrap();
        assert_eq!(text_of(src, &toks[2]), "'it\\'s'");
    }

    #[test]
    fn unterminated_strings_are_errors() {
        assert!(lex("s = 'abc\n").is_err());
        assert!(lex("s = \"\"\"abc\n").is_err());
    }

    #[test]
    fn bracket_mismatch_errors() {
        assert!(lex("x = (1, 2]\n").is_err());
        assert!(lex("x = 1)\n").is_err());
        let err = lex("x = (1,\n").unwrap_err();
        assert!(err.message.contains("never closed"));
    }

    #[test]
    fn numbers_with_exponents_and_radix() {
        let src = "a = 1.5e-3 + 0xFF + 10_000 + 3j + .5\n";
        let toks = lex(src).unwrap();
        let numbers: Vec<_> = toks
            .iter()
            .filter(|t| t.kind == PyToken::Number)
            .map(|t| text_of(src, t))
            .collect();
        assert_eq!(numbers, vec!["1.5e-3", "0xFF", "10_000", "3j", ".5"]);
    }

    #[test]
    fn longest_match_operators() {
        assert_eq!(
            kinds("a **= b // c -> d := e ...\n")[..10],
            [
                PyToken::Name,
                PyToken::AugAssign,
                PyToken::Name,
                PyToken::DoubleSlash,
                PyToken::Name,
                PyToken::Arrow,
                PyToken::Name,
                PyToken::ColonEq,
                PyToken::Name,
                PyToken::Ellipsis
            ]
        );
    }

    #[test]
    fn invalid_character() {
        let err = lex("a = $b\n").unwrap_err();
        assert_eq!(err.offset, 4);
    }

    #[test]
    fn base_offset_shifts_spans() {
        let toks = lex_at("(abc)", 10).unwrap();
        assert_eq!(toks[1].kind, PyToken::Name);
        assert_eq!(toks[1].span, Span::new(11, 14));
    }

    #[test]
    fn crlf_line_endings() {
        let k = kinds("a = 1\r\nb = 2\r\n");
        assert_eq!(k.iter().filter(|t| **t == PyToken::Newline).count(), 2);
    }
}
