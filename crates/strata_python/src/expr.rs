//! Expression parsing, by precedence level, plus f-string field extraction.

use crate::ast::*;
use crate::error::ParseError;
use crate::lexer;
use crate::parser::{PResult, PyParser};
use crate::token::{PyToken, Token};

impl<'src> PyParser<'src> {
    /// Returns `true` if the current token can begin an expression.
    pub(crate) fn at_expr_start(&self) -> bool {
        matches!(
            self.current(),
            PyToken::Name
                | PyToken::Number
                | PyToken::String
                | PyToken::FString
                | PyToken::LParen
                | PyToken::LBracket
                | PyToken::LBrace
                | PyToken::Minus
                | PyToken::Plus
                | PyToken::Tilde
                | PyToken::Not
                | PyToken::Lambda
                | PyToken::Await
                | PyToken::None
                | PyToken::True
                | PyToken::False
                | PyToken::Ellipsis
                | PyToken::Star
        )
    }

    fn at_comp_for(&self) -> bool {
        self.at(PyToken::For) || (self.at(PyToken::Async) && self.peek_kind(1) == PyToken::For)
    }

    // ========================================================================
    // Expression lists
    // ========================================================================

    /// Parses a comma-separated list of (starred) expressions, producing a
    /// tuple when a comma is present.
    pub(crate) fn parse_star_expressions(&mut self) -> PResult<Expr> {
        let first = self.parse_star_or_named()?;
        if !self.at(PyToken::Comma) {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat(PyToken::Comma) {
            if !self.at_expr_start() {
                break;
            }
            items.push(self.parse_star_or_named()?);
        }
        Ok(Expr::Tuple(items))
    }

    fn parse_star_or_named(&mut self) -> PResult<Expr> {
        if self.eat(PyToken::Star) {
            Ok(Expr::Starred(Box::new(self.parse_bitor()?)))
        } else {
            self.parse_named_expr()
        }
    }

    /// Parses an assignment target list (`a, (b, *c)`), stopping before
    /// `in` or `=`.
    pub(crate) fn parse_target_list(&mut self) -> PResult<Expr> {
        let first = self.parse_target_item()?;
        if !self.at(PyToken::Comma) {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat(PyToken::Comma) {
            if !self.at_expr_start() {
                break;
            }
            items.push(self.parse_target_item()?);
        }
        Ok(Expr::Tuple(items))
    }

    /// Parses a single target (`*rest`, `obj.attr`, `(a, b)`).
    pub(crate) fn parse_target_item(&mut self) -> PResult<Expr> {
        if self.eat(PyToken::Star) {
            Ok(Expr::Starred(Box::new(self.parse_bitor()?)))
        } else {
            self.parse_bitor()
        }
    }

    /// Parses `yield [exprs]` or `yield from expr`.
    pub(crate) fn parse_yield(&mut self) -> PResult<Expr> {
        self.expect(PyToken::Yield, "'yield'")?;
        if self.eat(PyToken::From) {
            return self.parse_test();
        }
        if self.at_expr_start() {
            return self.parse_star_expressions();
        }
        Ok(Expr::Literal)
    }

    // ========================================================================
    // Precedence levels
    // ========================================================================

    /// Parses `name := value` or a plain test.
    pub(crate) fn parse_named_expr(&mut self) -> PResult<Expr> {
        if self.at(PyToken::Name) && self.peek_kind(1) == PyToken::ColonEq {
            let target = self.expect_name()?;
            self.advance();
            let value = self.parse_test()?;
            return Ok(Expr::NamedExpr {
                target,
                value: Box::new(value),
            });
        }
        self.parse_test()
    }

    /// Parses a full expression including conditional expressions and lambdas.
    pub(crate) fn parse_test(&mut self) -> PResult<Expr> {
        if self.at(PyToken::Lambda) {
            return self.parse_lambda();
        }
        let body = self.parse_or_test()?;
        if !self.eat(PyToken::If) {
            return Ok(body);
        }
        let cond = self.parse_or_test()?;
        self.expect(PyToken::Else, "'else' in conditional expression")?;
        let orelse = self.parse_test()?;
        Ok(Expr::compound(vec![body, cond, orelse]))
    }

    fn parse_lambda(&mut self) -> PResult<Expr> {
        self.expect(PyToken::Lambda, "'lambda'")?;
        let params = self.parse_params(PyToken::Colon)?;
        self.expect(PyToken::Colon, "':'")?;
        let body = self.parse_test()?;
        Ok(Expr::Lambda {
            params,
            body: Box::new(body),
        })
    }

    fn parse_or_test(&mut self) -> PResult<Expr> {
        self.parse_binary(&[PyToken::Or], Self::parse_and_test)
    }

    fn parse_and_test(&mut self) -> PResult<Expr> {
        self.parse_binary(&[PyToken::And], Self::parse_not_test)
    }

    fn parse_not_test(&mut self) -> PResult<Expr> {
        if self.eat(PyToken::Not) {
            return self.parse_not_test();
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> PResult<Expr> {
        let first = self.parse_bitor()?;
        let mut parts = vec![first];
        loop {
            match self.current() {
                PyToken::Lt
                | PyToken::Gt
                | PyToken::Le
                | PyToken::Ge
                | PyToken::EqEq
                | PyToken::NotEq
                | PyToken::In => self.advance(),
                PyToken::Is => {
                    self.advance();
                    self.eat(PyToken::Not);
                }
                PyToken::Not if self.peek_kind(1) == PyToken::In => {
                    self.advance();
                    self.advance();
                }
                _ => break,
            }
            parts.push(self.parse_bitor()?);
        }
        Ok(if parts.len() == 1 {
            parts.remove(0)
        } else {
            Expr::compound(parts)
        })
    }

    /// Parses a left-associative chain of binary operators.
    fn parse_binary(
        &mut self,
        ops: &[PyToken],
        operand: fn(&mut Self) -> PResult<Expr>,
    ) -> PResult<Expr> {
        let first = operand(self)?;
        if !ops.contains(&self.current()) {
            return Ok(first);
        }
        let mut parts = vec![first];
        while ops.contains(&self.current()) {
            self.advance();
            parts.push(operand(self)?);
        }
        Ok(Expr::compound(parts))
    }

    pub(crate) fn parse_bitor(&mut self) -> PResult<Expr> {
        self.parse_binary(&[PyToken::Pipe], Self::parse_bitxor)
    }

    fn parse_bitxor(&mut self) -> PResult<Expr> {
        self.parse_binary(&[PyToken::Caret], Self::parse_bitand)
    }

    fn parse_bitand(&mut self) -> PResult<Expr> {
        self.parse_binary(&[PyToken::Amp], Self::parse_shift)
    }

    fn parse_shift(&mut self) -> PResult<Expr> {
        self.parse_binary(&[PyToken::LShift, PyToken::RShift], Self::parse_arith)
    }

    fn parse_arith(&mut self) -> PResult<Expr> {
        self.parse_binary(&[PyToken::Plus, PyToken::Minus], Self::parse_term)
    }

    fn parse_term(&mut self) -> PResult<Expr> {
        self.parse_binary(
            &[
                PyToken::Star,
                PyToken::Slash,
                PyToken::DoubleSlash,
                PyToken::Percent,
                PyToken::At,
            ],
            Self::parse_factor,
        )
    }

    fn parse_factor(&mut self) -> PResult<Expr> {
        if matches!(
            self.current(),
            PyToken::Plus | PyToken::Minus | PyToken::Tilde
        ) {
            self.advance();
            return self.parse_factor();
        }
        self.parse_power()
    }

    fn parse_power(&mut self) -> PResult<Expr> {
        self.eat(PyToken::Await);
        let base = self.parse_primary()?;
        if self.eat(PyToken::DoubleStar) {
            let exponent = self.parse_factor()?;
            return Ok(Expr::compound(vec![base, exponent]));
        }
        Ok(base)
    }

    // ========================================================================
    // Primaries and atoms
    // ========================================================================

    fn parse_primary(&mut self) -> PResult<Expr> {
        let mut expr = self.parse_atom()?;
        loop {
            match self.current() {
                PyToken::Dot => {
                    self.advance();
                    let attr = self.expect_name()?;
                    expr = Expr::Attribute {
                        value: Box::new(expr),
                        attr,
                    };
                }
                PyToken::LParen => {
                    self.advance();
                    let args = self.parse_call_args()?;
                    self.expect(PyToken::RParen, "')'")?;
                    expr = Expr::Call {
                        func: Box::new(expr),
                        args,
                    };
                }
                PyToken::LBracket => {
                    self.advance();
                    let index = self.parse_subscript_list()?;
                    self.expect(PyToken::RBracket, "']'")?;
                    expr = Expr::Subscript {
                        value: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                _ => return Ok(expr),
            }
        }
    }

    /// Parses call arguments up to (not including) the closing `)`.
    /// Keyword arguments contribute their values only.
    pub(crate) fn parse_call_args(&mut self) -> PResult<Vec<Expr>> {
        let mut args = Vec::new();
        while !self.at(PyToken::RParen) {
            if self.eat(PyToken::Star) || self.eat(PyToken::DoubleStar) {
                args.push(Expr::Starred(Box::new(self.parse_test()?)));
            } else if self.at(PyToken::Name) && self.peek_kind(1) == PyToken::Assign {
                self.advance();
                self.advance();
                args.push(self.parse_test()?);
            } else {
                let arg = self.parse_named_expr()?;
                if self.at_comp_for() {
                    let clauses = self.parse_comp_clauses()?;
                    args.push(Expr::Comprehension {
                        element: vec![arg],
                        clauses,
                    });
                } else {
                    args.push(arg);
                }
            }
            if !self.eat(PyToken::Comma) {
                break;
            }
        }
        Ok(args)
    }

    fn parse_subscript_list(&mut self) -> PResult<Expr> {
        let mut items = vec![self.parse_slice()?];
        while self.eat(PyToken::Comma) {
            if self.at(PyToken::RBracket) {
                break;
            }
            items.push(self.parse_slice()?);
        }
        Ok(if items.len() == 1 {
            items.remove(0)
        } else {
            Expr::Tuple(items)
        })
    }

    fn parse_slice(&mut self) -> PResult<Expr> {
        let mut parts = Vec::new();
        if !self.at(PyToken::Colon) {
            parts.push(self.parse_star_or_named()?);
        }
        while self.eat(PyToken::Colon) {
            if !matches!(
                self.current(),
                PyToken::Colon | PyToken::Comma | PyToken::RBracket
            ) {
                parts.push(self.parse_test()?);
            }
        }
        Ok(Expr::compound(parts))
    }

    fn parse_comp_clauses(&mut self) -> PResult<Vec<CompClause>> {
        let mut clauses = Vec::new();
        while self.at_comp_for() {
            self.eat(PyToken::Async);
            self.expect(PyToken::For, "'for'")?;
            let target = self.parse_target_list()?;
            if !target.is_assignable() {
                return Err(self.error("cannot assign to comprehension target"));
            }
            self.expect(PyToken::In, "'in'")?;
            let iter = self.parse_or_test()?;
            let mut ifs = Vec::new();
            while self.eat(PyToken::If) {
                ifs.push(self.parse_or_test()?);
            }
            clauses.push(CompClause { target, iter, ifs });
        }
        Ok(clauses)
    }

    fn parse_atom(&mut self) -> PResult<Expr> {
        match self.current() {
            PyToken::Name => Ok(Expr::Name(self.expect_name()?)),
            PyToken::Number
            | PyToken::None
            | PyToken::True
            | PyToken::False
            | PyToken::Ellipsis => {
                self.advance();
                Ok(Expr::Literal)
            }
            PyToken::String | PyToken::FString => self.parse_strings(),
            PyToken::LParen => self.parse_paren(),
            PyToken::LBracket => self.parse_list_display(),
            PyToken::LBrace => self.parse_brace_display(),
            _ => Err(self.expected("expression")),
        }
    }

    /// Parses adjacent string literals; f-string fields become sub-expressions.
    fn parse_strings(&mut self) -> PResult<Expr> {
        let mut parts = Vec::new();
        while matches!(self.current(), PyToken::String | PyToken::FString) {
            let tok = self.tokens[self.pos];
            if tok.kind == PyToken::FString {
                parts.extend(self.parse_fstring_fields(tok)?);
            }
            self.advance();
        }
        Ok(Expr::compound(parts))
    }

    fn parse_paren(&mut self) -> PResult<Expr> {
        self.expect(PyToken::LParen, "'('")?;
        if self.eat(PyToken::RParen) {
            return Ok(Expr::Tuple(Vec::new()));
        }
        if self.at(PyToken::Yield) {
            let value = self.parse_yield()?;
            self.expect(PyToken::RParen, "')'")?;
            return Ok(value);
        }
        let first = self.parse_star_or_named()?;
        if self.at_comp_for() {
            let clauses = self.parse_comp_clauses()?;
            self.expect(PyToken::RParen, "')'")?;
            return Ok(Expr::Comprehension {
                element: vec![first],
                clauses,
            });
        }
        if !self.at(PyToken::Comma) {
            self.expect(PyToken::RParen, "')'")?;
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat(PyToken::Comma) {
            if self.at(PyToken::RParen) {
                break;
            }
            items.push(self.parse_star_or_named()?);
        }
        self.expect(PyToken::RParen, "')'")?;
        Ok(Expr::Tuple(items))
    }

    fn parse_list_display(&mut self) -> PResult<Expr> {
        self.expect(PyToken::LBracket, "'['")?;
        let mut items = Vec::new();
        if self.eat(PyToken::RBracket) {
            return Ok(Expr::List(items));
        }
        let first = self.parse_star_or_named()?;
        if self.at_comp_for() {
            let clauses = self.parse_comp_clauses()?;
            self.expect(PyToken::RBracket, "']'")?;
            return Ok(Expr::Comprehension {
                element: vec![first],
                clauses,
            });
        }
        items.push(first);
        while self.eat(PyToken::Comma) {
            if self.at(PyToken::RBracket) {
                break;
            }
            items.push(self.parse_star_or_named()?);
        }
        self.expect(PyToken::RBracket, "']'")?;
        Ok(Expr::List(items))
    }

    fn parse_brace_display(&mut self) -> PResult<Expr> {
        self.expect(PyToken::LBrace, "'{'")?;
        let mut parts = Vec::new();
        let mut first = true;
        while !self.at(PyToken::RBrace) {
            let mut entry = Vec::new();
            if self.eat(PyToken::DoubleStar) {
                entry.push(self.parse_bitor()?);
            } else {
                entry.push(self.parse_star_or_named()?);
                if self.eat(PyToken::Colon) {
                    entry.push(self.parse_test()?);
                }
            }
            if first && self.at_comp_for() {
                let clauses = self.parse_comp_clauses()?;
                self.expect(PyToken::RBrace, "'}'")?;
                return Ok(Expr::Comprehension {
                    element: entry,
                    clauses,
                });
            }
            first = false;
            parts.extend(entry);
            if !self.eat(PyToken::Comma) {
                break;
            }
        }
        self.expect(PyToken::RBrace, "'}'")?;
        Ok(Expr::compound(parts))
    }

    // ========================================================================
    // F-strings
    // ========================================================================

    /// Parses the replacement fields of an f-string token.
    fn parse_fstring_fields(&self, tok: Token) -> PResult<Vec<Expr>> {
        let text = self.text_of(tok.span);
        let Some(quote_at) = text.find(['\'', '"']) else {
            return Ok(Vec::new());
        };
        let rest = &text[quote_at..];
        let quote_len = if rest.starts_with("\"\"\"") || rest.starts_with("'''") {
            3
        } else {
            1
        };
        let body_start = quote_at + quote_len;
        let body_end = text.len().saturating_sub(quote_len).max(body_start);
        let body = &text[body_start..body_end];
        let base = tok.span.start + body_start as u32;

        let mut exprs = Vec::new();
        for (offset, field) in fstring_fields(body) {
            if field.trim().is_empty() {
                continue;
            }
            let wrapped = format!("({field})");
            // The opening paren sits where the field's `{` is.
            let field_start = base + offset as u32;
            let tokens = lexer::lex_at(&wrapped, field_start - 1)?;
            let mut sub = PyParser::new(self.source, tokens);
            let expr = sub.parse_star_expressions()?;
            if !sub.at(PyToken::Newline) {
                return Err(ParseError::new(field_start, "invalid f-string field"));
            }
            exprs.push(expr);
        }
        Ok(exprs)
    }
}

/// Locates the expression text of every replacement field in an f-string
/// body, including fields nested in format specs. Returns `(byte offset in
/// body, expression text)` pairs.
fn fstring_fields(body: &str) -> Vec<(usize, &str)> {
    let bytes = body.as_bytes();
    let mut fields = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'{' if bytes.get(i + 1) == Some(&b'{') => i += 2,
            b'{' => i = scan_field(body, i + 1, &mut fields),
            _ => i += 1,
        }
    }
    fields
}

/// Scans one field whose expression starts at `start`; returns the index
/// just past its closing `}`.
fn scan_field<'b>(body: &'b str, start: usize, fields: &mut Vec<(usize, &'b str)>) -> usize {
    let bytes = body.as_bytes();
    let mut depth = 0usize;
    let mut i = start;
    while i < bytes.len() {
        let c = bytes[i];
        match c {
            b'\'' | b'"' => {
                i += 1;
                while i < bytes.len() && bytes[i] != c {
                    i += 1;
                }
            }
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' => depth = depth.saturating_sub(1),
            b'}' if depth > 0 => depth -= 1,
            b'}' | b':' if depth == 0 => break,
            b'!' if depth == 0 && bytes.get(i + 1) != Some(&b'=') => break,
            b'=' if depth == 0 && is_self_documenting(bytes, i) => break,
            _ => {}
        }
        i += 1;
    }
    fields.push((start, &body[start..i.min(bytes.len())]));

    // Conversion, `=` marker and format spec up to the closing brace.
    while i < bytes.len() {
        match bytes[i] {
            b'}' => return i + 1,
            b'{' => i = scan_field(body, i + 1, fields),
            _ => i += 1,
        }
    }
    i
}

/// `true` when the `=` at `i` is the `{expr=}` debugging marker rather than
/// part of a comparison.
fn is_self_documenting(bytes: &[u8], i: usize) -> bool {
    let prev = if i > 0 { bytes[i - 1] } else { b' ' };
    if matches!(prev, b'=' | b'!' | b'<' | b'>') || bytes.get(i + 1) == Some(&b'=') {
        return false;
    }
    let next = bytes[i + 1..].iter().find(|b| !b.is_ascii_whitespace());
    matches!(next, Some(b'}' | b'!' | b':'))
}
