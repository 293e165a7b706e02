//! Statement parsing: compound blocks, imports, assignments, and simple
//! keyword statements.

use crate::ast::*;
use crate::parser::{PResult, PyParser};
use crate::token::PyToken;

impl<'src> PyParser<'src> {
    /// Parses one statement (compound, or a full simple line).
    pub(crate) fn parse_statement(&mut self) -> PResult<Stmt> {
        let start = self.current_span().start;
        match self.current() {
            PyToken::At => self.parse_decorated(start),
            PyToken::Def => self.parse_function(start, Vec::new(), false),
            PyToken::Class => self.parse_class(start, Vec::new()),
            PyToken::If => self.parse_if(start),
            PyToken::While => self.parse_while(start),
            PyToken::For => self.parse_for(start),
            PyToken::Try => self.parse_try(start),
            PyToken::With => self.parse_with(start, false),
            PyToken::Async => {
                self.advance();
                match self.current() {
                    PyToken::Def => self.parse_function(start, Vec::new(), true),
                    PyToken::For => self.parse_for(start),
                    PyToken::With => self.parse_with(start, true),
                    _ => Err(self.expected("'def', 'for' or 'with' after 'async'")),
                }
            }
            PyToken::Indent => Err(self.error("unexpected indent")),
            PyToken::Name if self.at_soft_keyword("match") && self.looks_like_match() => {
                self.parse_match(start)
            }
            _ => self.parse_simple_line(),
        }
    }

    // ========================================================================
    // Definitions
    // ========================================================================

    fn parse_decorated(&mut self, start: u32) -> PResult<Stmt> {
        let mut decorators = Vec::new();
        while self.eat(PyToken::At) {
            decorators.push(self.parse_named_expr()?);
            self.expect(PyToken::Newline, "newline after decorator")?;
        }
        match self.current() {
            PyToken::Def => self.parse_function(start, decorators, false),
            PyToken::Class => self.parse_class(start, decorators),
            PyToken::Async if self.peek_kind(1) == PyToken::Def => {
                self.advance();
                self.parse_function(start, decorators, true)
            }
            _ => Err(self.expected("function or class definition after decorator")),
        }
    }

    fn parse_function(
        &mut self,
        start: u32,
        decorators: Vec<Expr>,
        is_async: bool,
    ) -> PResult<Stmt> {
        self.expect(PyToken::Def, "'def'")?;
        let name = self.expect_name()?;
        self.skip_type_params()?;
        self.expect(PyToken::LParen, "'('")?;
        let params = self.parse_params(PyToken::RParen)?;
        self.expect(PyToken::RParen, "')'")?;
        let returns = if self.eat(PyToken::Arrow) {
            Some(self.parse_test()?)
        } else {
            None
        };
        let body = self.parse_block()?;
        Ok(Stmt {
            kind: StmtKind::FunctionDef(FunctionDef {
                name,
                is_async,
                decorators,
                params,
                returns,
                body,
            }),
            span: self.span_from(start),
        })
    }

    /// Parses a parameter list up to (not including) `closing`. Annotations
    /// are accepted only in `def` parameter lists.
    pub(crate) fn parse_params(&mut self, closing: PyToken) -> PResult<Vec<Param>> {
        let annotated = closing == PyToken::RParen;
        let mut params = Vec::new();
        while !self.at(closing) {
            if self.eat(PyToken::Slash) {
                // positional-only marker
            } else if self.at(PyToken::Star) || self.at(PyToken::DoubleStar) {
                self.advance();
                if self.at(PyToken::Name) {
                    let name = self.expect_name()?;
                    let annotation = if annotated && self.eat(PyToken::Colon) {
                        self.eat(PyToken::Star);
                        Some(self.parse_test()?)
                    } else {
                        None
                    };
                    params.push(Param {
                        name,
                        annotation,
                        default: None,
                    });
                }
            } else {
                let name = self.expect_name()?;
                let annotation = if annotated && self.eat(PyToken::Colon) {
                    Some(self.parse_test()?)
                } else {
                    None
                };
                let default = if self.eat(PyToken::Assign) {
                    Some(self.parse_test()?)
                } else {
                    None
                };
                params.push(Param {
                    name,
                    annotation,
                    default,
                });
            }
            if !self.eat(PyToken::Comma) {
                break;
            }
        }
        Ok(params)
    }

    fn parse_class(&mut self, start: u32, decorators: Vec<Expr>) -> PResult<Stmt> {
        self.expect(PyToken::Class, "'class'")?;
        let name = self.expect_name()?;
        self.skip_type_params()?;
        let bases = if self.eat(PyToken::LParen) {
            let args = self.parse_call_args()?;
            self.expect(PyToken::RParen, "')'")?;
            args
        } else {
            Vec::new()
        };
        let body = self.parse_block()?;
        Ok(Stmt {
            kind: StmtKind::ClassDef(ClassDef {
                name,
                decorators,
                bases,
                body,
            }),
            span: self.span_from(start),
        })
    }

    // ========================================================================
    // Control flow
    // ========================================================================

    fn control(&self, start: u32, keyword: ControlKind, parts: ControlParts) -> Stmt {
        Stmt {
            kind: StmtKind::Control(Control {
                keyword,
                tests: parts.tests,
                targets: parts.targets,
                body: parts.body,
            }),
            span: self.span_from(start),
        }
    }

    fn parse_if(&mut self, start: u32) -> PResult<Stmt> {
        let mut parts = ControlParts::default();
        self.expect(PyToken::If, "'if'")?;
        parts.tests.push(self.parse_named_expr()?);
        parts.body.extend(self.parse_block()?);
        while self.eat(PyToken::Elif) {
            parts.tests.push(self.parse_named_expr()?);
            parts.body.extend(self.parse_block()?);
        }
        if self.eat(PyToken::Else) {
            parts.body.extend(self.parse_block()?);
        }
        Ok(self.control(start, ControlKind::If, parts))
    }

    fn parse_while(&mut self, start: u32) -> PResult<Stmt> {
        let mut parts = ControlParts::default();
        self.expect(PyToken::While, "'while'")?;
        parts.tests.push(self.parse_named_expr()?);
        parts.body.extend(self.parse_block()?);
        if self.eat(PyToken::Else) {
            parts.body.extend(self.parse_block()?);
        }
        Ok(self.control(start, ControlKind::While, parts))
    }

    fn parse_for(&mut self, start: u32) -> PResult<Stmt> {
        let mut parts = ControlParts::default();
        self.expect(PyToken::For, "'for'")?;
        let target = self.parse_target_list()?;
        if !target.is_assignable() {
            return Err(self.error("cannot assign to loop target"));
        }
        parts.targets.push(target);
        self.expect(PyToken::In, "'in'")?;
        parts.tests.push(self.parse_star_expressions()?);
        parts.body.extend(self.parse_block()?);
        if self.eat(PyToken::Else) {
            parts.body.extend(self.parse_block()?);
        }
        Ok(self.control(start, ControlKind::For, parts))
    }

    fn parse_try(&mut self, start: u32) -> PResult<Stmt> {
        let mut parts = ControlParts::default();
        self.expect(PyToken::Try, "'try'")?;
        parts.body.extend(self.parse_block()?);
        let mut handlers = 0;
        while self.eat(PyToken::Except) {
            self.eat(PyToken::Star);
            if !self.at(PyToken::Colon) {
                parts.tests.push(self.parse_test()?);
                while self.eat(PyToken::Comma) {
                    parts.tests.push(self.parse_test()?);
                }
                if self.eat(PyToken::As) {
                    parts.targets.push(Expr::Name(self.expect_name()?));
                }
            }
            parts.body.extend(self.parse_block()?);
            handlers += 1;
        }
        if handlers > 0 && self.eat(PyToken::Else) {
            parts.body.extend(self.parse_block()?);
        }
        let has_finally = self.eat(PyToken::Finally);
        if has_finally {
            parts.body.extend(self.parse_block()?);
        }
        if handlers == 0 && !has_finally {
            return Err(self.expected("'except' or 'finally' block"));
        }
        Ok(self.control(start, ControlKind::Try, parts))
    }

    fn parse_with(&mut self, start: u32, is_async: bool) -> PResult<Stmt> {
        self.expect(PyToken::With, "'with'")?;
        let mut items = Vec::new();
        let mut targets = Vec::new();
        let parenthesized = self.at(PyToken::LParen) && self.paren_group_precedes_colon();
        if parenthesized {
            self.advance();
            while !self.at(PyToken::RParen) {
                self.parse_with_item(&mut items, &mut targets)?;
                if !self.eat(PyToken::Comma) {
                    break;
                }
            }
            self.expect(PyToken::RParen, "')'")?;
        } else {
            loop {
                self.parse_with_item(&mut items, &mut targets)?;
                if !self.eat(PyToken::Comma) {
                    break;
                }
            }
        }
        let body = self.parse_block()?;
        Ok(Stmt {
            kind: StmtKind::With(With {
                is_async,
                items,
                targets,
                body,
            }),
            span: self.span_from(start),
        })
    }

    fn parse_with_item(&mut self, items: &mut Vec<Expr>, targets: &mut Vec<Expr>) -> PResult<()> {
        items.push(self.parse_test()?);
        if self.eat(PyToken::As) {
            let target = self.parse_target_item()?;
            if !target.is_assignable() {
                return Err(self.error("cannot assign to 'with' target"));
            }
            targets.push(target);
        }
        Ok(())
    }

    /// Returns `true` if the bracket group opening at the current token is
    /// immediately followed by `:`.
    fn paren_group_precedes_colon(&self) -> bool {
        let mut depth = 0usize;
        for (i, tok) in self.tokens[self.pos..].iter().enumerate() {
            match tok.kind {
                PyToken::LParen | PyToken::LBracket | PyToken::LBrace => depth += 1,
                PyToken::RParen | PyToken::RBracket | PyToken::RBrace => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return self.peek_kind(i + 1) == PyToken::Colon;
                    }
                }
                PyToken::Newline | PyToken::Eof => return false,
                _ => {}
            }
        }
        false
    }

    /// Decides whether a line starting with the soft keyword `match` is a
    /// match statement rather than an expression using the name `match`.
    fn looks_like_match(&self) -> bool {
        let follows_as_name = matches!(
            self.peek_kind(1),
            PyToken::Assign
                | PyToken::AugAssign
                | PyToken::Colon
                | PyToken::Dot
                | PyToken::Comma
                | PyToken::RParen
                | PyToken::Newline
                | PyToken::Semicolon
                | PyToken::Eof
        );
        if follows_as_name {
            return false;
        }
        let line_end = self.tokens[self.pos..]
            .iter()
            .position(|t| matches!(t.kind, PyToken::Newline | PyToken::Eof));
        match line_end {
            Some(end) if end > 0 => self.peek_kind(end - 1) == PyToken::Colon,
            _ => false,
        }
    }

    fn parse_match(&mut self, start: u32) -> PResult<Stmt> {
        let mut parts = ControlParts::default();
        self.advance();
        parts.tests.push(self.parse_star_expressions()?);
        self.expect(PyToken::Colon, "':'")?;
        self.expect(PyToken::Newline, "newline")?;
        if !self.eat(PyToken::Indent) {
            return Err(self.error("expected an indented block"));
        }
        while !self.eat(PyToken::Dedent) {
            if !self.at_soft_keyword("case") {
                return Err(self.expected("'case'"));
            }
            self.advance();
            self.scan_case_pattern(&mut parts)?;
            if self.eat(PyToken::If) {
                parts.tests.push(self.parse_named_expr()?);
            }
            parts.body.extend(self.parse_block()?);
        }
        Ok(self.control(start, ControlKind::Match, parts))
    }

    /// Scans a case pattern up to its guard or colon.
    ///
    /// Dotted names and class names in the pattern are reads; other bare
    /// names (except `_`) are captures.
    fn scan_case_pattern(&mut self, parts: &mut ControlParts) -> PResult<()> {
        let mut depth = 0usize;
        loop {
            match self.current() {
                PyToken::Colon | PyToken::If if depth == 0 => return Ok(()),
                PyToken::Newline | PyToken::Eof => return Err(self.expected("':'")),
                PyToken::LParen | PyToken::LBracket | PyToken::LBrace => depth += 1,
                PyToken::RParen | PyToken::RBracket | PyToken::RBrace => {
                    depth = depth.saturating_sub(1)
                }
                PyToken::Name => {
                    let name = self.current_text().to_string();
                    match self.peek_kind(1) {
                        PyToken::Dot | PyToken::LParen => {
                            parts.tests.push(Expr::Name(name));
                            self.advance();
                            while self.at(PyToken::Dot) && self.peek_kind(1) == PyToken::Name {
                                self.advance();
                                self.advance();
                            }
                            continue;
                        }
                        // keyword sub-pattern in a class pattern
                        PyToken::Assign => {}
                        _ if name == "_" => {}
                        _ => parts.targets.push(Expr::Name(name)),
                    }
                }
                _ => {}
            }
            self.advance();
        }
    }

    // ========================================================================
    // Simple statements
    // ========================================================================

    /// Parses `small_stmt (';' small_stmt)* [';'] NEWLINE`.
    ///
    /// Several statements on one line are grouped into a single
    /// [`StmtKind::Line`] statement.
    pub(crate) fn parse_simple_line(&mut self) -> PResult<Stmt> {
        let start = self.current_span().start;
        let mut stmts = vec![self.parse_small_statement()?];
        while self.eat(PyToken::Semicolon) {
            if self.at(PyToken::Newline) {
                break;
            }
            stmts.push(self.parse_small_statement()?);
        }
        let span = self.span_from(start);
        self.expect(PyToken::Newline, "newline")?;
        if stmts.len() == 1 {
            let mut only = stmts.remove(0);
            only.span = span;
            return Ok(only);
        }
        Ok(Stmt {
            kind: StmtKind::Line(stmts),
            span,
        })
    }

    fn at_statement_end(&self) -> bool {
        matches!(
            self.current(),
            PyToken::Newline | PyToken::Semicolon | PyToken::Eof
        )
    }

    fn parse_small_statement(&mut self) -> PResult<Stmt> {
        let start = self.current_span().start;
        let kind = match self.current() {
            PyToken::Pass => self.keyword_only(SimpleKind::Pass),
            PyToken::Break => self.keyword_only(SimpleKind::Break),
            PyToken::Continue => self.keyword_only(SimpleKind::Continue),
            PyToken::Return => {
                self.advance();
                let mut values = Vec::new();
                if !self.at_statement_end() {
                    values.push(self.parse_star_expressions()?);
                }
                simple(SimpleKind::Return, values, Vec::new())
            }
            PyToken::Raise => {
                self.advance();
                let mut values = Vec::new();
                if !self.at_statement_end() {
                    values.push(self.parse_test()?);
                    if self.eat(PyToken::From) {
                        values.push(self.parse_test()?);
                    }
                }
                simple(SimpleKind::Raise, values, Vec::new())
            }
            PyToken::Del => {
                self.advance();
                let target = self.parse_target_list()?;
                simple(SimpleKind::Del, vec![target], Vec::new())
            }
            PyToken::Global | PyToken::Nonlocal => {
                let keyword = if self.at(PyToken::Global) {
                    SimpleKind::Global
                } else {
                    SimpleKind::Nonlocal
                };
                self.advance();
                let mut names = vec![self.expect_name()?];
                while self.eat(PyToken::Comma) {
                    names.push(self.expect_name()?);
                }
                simple(keyword, Vec::new(), names)
            }
            PyToken::Assert => {
                self.advance();
                let mut values = vec![self.parse_test()?];
                if self.eat(PyToken::Comma) {
                    values.push(self.parse_test()?);
                }
                simple(SimpleKind::Assert, values, Vec::new())
            }
            PyToken::Import => self.parse_import()?,
            PyToken::From => self.parse_from_import()?,
            PyToken::Name
                if self.at_soft_keyword("type")
                    && self.peek_kind(1) == PyToken::Name
                    && matches!(self.peek_kind(2), PyToken::Assign | PyToken::LBracket) =>
            {
                self.advance();
                let name = self.expect_name()?;
                self.skip_type_params()?;
                self.expect(PyToken::Assign, "'='")?;
                let value = self.parse_test()?;
                simple(SimpleKind::TypeAlias, vec![value], vec![name])
            }
            _ => self.parse_expression_statement()?,
        };
        Ok(Stmt {
            kind,
            span: self.span_from(start),
        })
    }

    fn keyword_only(&mut self, keyword: SimpleKind) -> StmtKind {
        self.advance();
        simple(keyword, Vec::new(), Vec::new())
    }

    fn parse_dotted_name(&mut self) -> PResult<String> {
        let mut name = self.expect_name()?;
        while self.eat(PyToken::Dot) {
            name.push('.');
            name.push_str(&self.expect_name()?);
        }
        Ok(name)
    }

    fn parse_import(&mut self) -> PResult<StmtKind> {
        self.expect(PyToken::Import, "'import'")?;
        let mut import = Import::default();
        loop {
            let module = self.parse_dotted_name()?;
            let binding = if self.eat(PyToken::As) {
                self.expect_name()?
            } else {
                module.split('.').next().unwrap_or_default().to_string()
            };
            import.modules.push(module);
            import.bindings.push(binding);
            if !self.eat(PyToken::Comma) {
                break;
            }
        }
        Ok(StmtKind::Import(import))
    }

    fn parse_from_import(&mut self) -> PResult<StmtKind> {
        self.expect(PyToken::From, "'from'")?;
        let mut module = String::new();
        loop {
            if self.eat(PyToken::Dot) {
                module.push('.');
            } else if self.eat(PyToken::Ellipsis) {
                module.push_str("...");
            } else {
                break;
            }
        }
        if self.at(PyToken::Name) {
            module.push_str(&self.parse_dotted_name()?);
        }
        if module.is_empty() {
            return Err(self.expected("module name"));
        }
        self.expect(PyToken::Import, "'import'")?;

        let mut import = Import {
            modules: vec![module],
            bindings: Vec::new(),
        };
        if self.eat(PyToken::Star) {
            return Ok(StmtKind::Import(import));
        }
        let parenthesized = self.eat(PyToken::LParen);
        loop {
            let name = self.expect_name()?;
            let binding = if self.eat(PyToken::As) {
                self.expect_name()?
            } else {
                name
            };
            import.bindings.push(binding);
            if !self.eat(PyToken::Comma) {
                break;
            }
            if parenthesized && self.at(PyToken::RParen) {
                break;
            }
        }
        if parenthesized {
            self.expect(PyToken::RParen, "')'")?;
        }
        Ok(StmtKind::Import(import))
    }

    fn parse_assigned_value(&mut self) -> PResult<Expr> {
        if self.at(PyToken::Yield) {
            self.parse_yield()
        } else {
            self.parse_star_expressions()
        }
    }

    fn parse_expression_statement(&mut self) -> PResult<StmtKind> {
        let first = if self.at(PyToken::Yield) {
            self.parse_yield()?
        } else {
            self.parse_star_expressions()?
        };
        match self.current() {
            PyToken::Colon => {
                self.advance();
                if !matches!(
                    first,
                    Expr::Name(_) | Expr::Attribute { .. } | Expr::Subscript { .. }
                ) {
                    return Err(self.error("illegal target for annotation"));
                }
                let annotation = self.parse_test()?;
                let value = if self.eat(PyToken::Assign) {
                    Some(self.parse_assigned_value()?)
                } else {
                    None
                };
                Ok(StmtKind::Assign(Assign {
                    op: AssignOp::Annotated,
                    targets: vec![first],
                    annotation: Some(annotation),
                    value,
                }))
            }
            PyToken::AugAssign => {
                self.advance();
                if !matches!(
                    first,
                    Expr::Name(_) | Expr::Attribute { .. } | Expr::Subscript { .. }
                ) {
                    return Err(self.error("illegal expression for augmented assignment"));
                }
                let value = self.parse_assigned_value()?;
                Ok(StmtKind::Assign(Assign {
                    op: AssignOp::Augmented,
                    targets: vec![first],
                    annotation: None,
                    value: Some(value),
                }))
            }
            PyToken::Assign => {
                let mut chain = vec![first];
                while self.eat(PyToken::Assign) {
                    chain.push(self.parse_assigned_value()?);
                }
                let value = chain.pop();
                if let Some(bad) = chain.iter().find(|t| !t.is_assignable()) {
                    return Err(self.error(format!("cannot assign to expression {bad:?}")));
                }
                Ok(StmtKind::Assign(Assign {
                    op: AssignOp::Plain,
                    targets: chain,
                    annotation: None,
                    value,
                }))
            }
            _ => Ok(StmtKind::Expr(first)),
        }
    }
}

/// Header pieces accumulated while parsing a multi-clause block.
#[derive(Default)]
struct ControlParts {
    tests: Vec<Expr>,
    targets: Vec<Expr>,
    body: Vec<Stmt>,
}

fn simple(keyword: SimpleKind, values: Vec<Expr>, names: Vec<String>) -> StmtKind {
    StmtKind::Simple(Simple {
        keyword,
        values,
        names,
    })
}

#[cfg(test)]
mod tests {
    use crate::ast::*;
    use crate::parse_module;
    use pretty_assertions::assert_eq;

    fn first(source: &str) -> StmtKind {
        parse_module(source).unwrap().body.remove(0).kind
    }

    fn name(s: &str) -> Expr {
        Expr::Name(s.to_string())
    }

    #[test]
    fn import_bindings() {
        match first("import os.path, numpy as np\n") {
            StmtKind::Import(i) => {
                assert_eq!(i.modules, vec!["os.path", "numpy"]);
                assert_eq!(i.bindings, vec!["os", "np"]);
            }
            other => panic!("expected import, got {other:?}"),
        }
    }

    #[test]
    fn from_import_forms() {
        match first("from ..pkg.mod import (a, b as c,)\n") {
            StmtKind::Import(i) => {
                assert_eq!(i.modules, vec!["..pkg.mod"]);
                assert_eq!(i.bindings, vec!["a", "c"]);
            }
            other => panic!("expected import, got {other:?}"),
        }
        match first("from . import *\n") {
            StmtKind::Import(i) => {
                assert_eq!(i.modules, vec!["."]);
                assert!(i.bindings.is_empty());
            }
            other => panic!("expected import, got {other:?}"),
        }
    }

    #[test]
    fn chained_assignment() {
        match first("a = b = f(x)\n") {
            StmtKind::Assign(a) => {
                assert_eq!(a.op, AssignOp::Plain);
                assert_eq!(a.targets, vec![name("a"), name("b")]);
                assert_eq!(
                    a.value,
                    Some(Expr::Call {
                        func: Box::new(name("f")),
                        args: vec![name("x")]
                    })
                );
            }
            other => panic!("expected assign, got {other:?}"),
        }
    }

    #[test]
    fn unpacking_assignment() {
        match first("a, *rest = items\n") {
            StmtKind::Assign(a) => assert_eq!(
                a.targets,
                vec![Expr::Tuple(vec![
                    name("a"),
                    Expr::Starred(Box::new(name("rest")))
                ])]
            ),
            other => panic!("expected assign, got {other:?}"),
        }
    }

    #[test]
    fn annotated_and_augmented() {
        assert!(matches!(
            first("count: int = 0\n"),
            StmtKind::Assign(Assign {
                op: AssignOp::Annotated,
                ..
            })
        ));
        assert!(matches!(
            first("total += step\n"),
            StmtKind::Assign(Assign {
                op: AssignOp::Augmented,
                ..
            })
        ));
    }

    #[test]
    fn invalid_assignment_targets() {
        assert!(parse_module("f() = 1\n").is_err());
        assert!(parse_module("1 += x\n").is_err());
        assert!(parse_module("a + b: int\n").is_err());
    }

    #[test]
    fn semicolons_form_one_line_statement() {
        let module = parse_module("a = 1; b = 2\nc = 3\n").unwrap();
        assert_eq!(module.body.len(), 2);
        match &module.body[0].kind {
            StmtKind::Line(stmts) => assert_eq!(stmts.len(), 2),
            other => panic!("expected line, got {other:?}"),
        }
    }

    #[test]
    fn if_elif_else_flattens_bodies() {
        let src = "if a:\n    x = 1\nelif b:\n    y = 2\nelse:\n    z = 3\n";
        match first(src) {
            StmtKind::Control(c) => {
                assert_eq!(c.keyword, ControlKind::If);
                assert_eq!(c.tests, vec![name("a"), name("b")]);
                assert_eq!(c.body.len(), 3);
            }
            other => panic!("expected control, got {other:?}"),
        }
    }

    #[test]
    fn for_loop_target_and_iter() {
        match first("for i, (k, v) in enumerate(pairs):\n    pass\nelse:\n    done()\n") {
            StmtKind::Control(c) => {
                assert_eq!(c.keyword, ControlKind::For);
                assert_eq!(c.targets.len(), 1);
                assert_eq!(c.body.len(), 2);
            }
            other => panic!("expected control, got {other:?}"),
        }
    }

    #[test]
    fn try_requires_handler() {
        assert!(parse_module("try:\n    pass\n").is_err());
        let src = "try:\n    run()\nexcept (A, B) as err:\n    log(err)\nfinally:\n    close()\n";
        match first(src) {
            StmtKind::Control(c) => {
                assert_eq!(c.keyword, ControlKind::Try);
                assert_eq!(c.targets, vec![name("err")]);
                assert_eq!(c.body.len(), 3);
            }
            other => panic!("expected control, got {other:?}"),
        }
    }

    #[test]
    fn with_items_and_targets() {
        match first("with open(p) as f, lock:\n    f.read()\n") {
            StmtKind::With(w) => {
                assert_eq!(w.items.len(), 2);
                assert_eq!(w.targets, vec![name("f")]);
            }
            other => panic!("expected with, got {other:?}"),
        }
        match first("with (\n    open(a) as x,\n    open(b) as y,\n):\n    pass\n") {
            StmtKind::With(w) => assert_eq!(w.targets, vec![name("x"), name("y")]),
            other => panic!("expected with, got {other:?}"),
        }
    }

    #[test]
    fn async_forms() {
        assert!(matches!(
            first("async def f():\n    await g()\n"),
            StmtKind::FunctionDef(FunctionDef { is_async: true, .. })
        ));
        assert!(matches!(
            first("async with a as b:\n    pass\n"),
            StmtKind::With(With { is_async: true, .. })
        ));
    }

    #[test]
    fn function_params() {
        match first("def f(a, b: int = 1, /, *args, key=None, **kw) -> str:\n    pass\n") {
            StmtKind::FunctionDef(f) => {
                let names: Vec<_> = f.params.iter().map(|p| p.name.as_str()).collect();
                assert_eq!(names, vec!["a", "b", "args", "key", "kw"]);
                assert!(f.returns.is_some());
            }
            other => panic!("expected function, got {other:?}"),
        }
    }

    #[test]
    fn class_with_bases_and_keywords() {
        match first("class A(Base, metaclass=Meta):\n    x = 1\n    def m(self):\n        pass\n") {
            StmtKind::ClassDef(c) => {
                assert_eq!(c.bases, vec![name("Base"), name("Meta")]);
                assert_eq!(c.body.len(), 2);
            }
            other => panic!("expected class, got {other:?}"),
        }
    }

    #[test]
    fn match_statement_captures_and_reads() {
        let src = "match cmd:\n    case Point(x=0, y=yy):\n        pass\n    case Color.RED | [first, *_]:\n        pass\n    case _ if ready:\n        pass\n";
        match first(src) {
            StmtKind::Control(c) => {
                assert_eq!(c.keyword, ControlKind::Match);
                assert_eq!(
                    c.tests,
                    vec![name("cmd"), name("Point"), name("Color"), name("ready")]
                );
                assert_eq!(c.targets, vec![name("yy"), name("first")]);
                assert_eq!(c.body.len(), 3);
            }
            other => panic!("expected match, got {other:?}"),
        }
    }

    #[test]
    fn match_as_plain_name() {
        assert!(matches!(first("match = re.match(p, s)\n"), StmtKind::Assign(_)));
        assert!(matches!(first("match(x)\n"), StmtKind::Expr(_)));
    }

    #[test]
    fn type_alias_statement() {
        match first("type Pair[T] = tuple[T, T]\n") {
            StmtKind::Simple(s) => {
                assert_eq!(s.keyword, SimpleKind::TypeAlias);
                assert_eq!(s.names, vec!["Pair"]);
            }
            other => panic!("expected type alias, got {other:?}"),
        }
        assert!(matches!(first("type(x)\n"), StmtKind::Expr(_)));
    }

    #[test]
    fn global_and_return() {
        let src = "def f():\n    global counter\n    return counter, 1\n";
        match first(src) {
            StmtKind::FunctionDef(f) => {
                assert!(matches!(
                    &f.body[0].kind,
                    StmtKind::Simple(Simple {
                        keyword: SimpleKind::Global,
                        ..
                    })
                ));
                assert!(matches!(
                    &f.body[1].kind,
                    StmtKind::Simple(Simple {
                        keyword: SimpleKind::Return,
                        ..
                    })
                ));
            }
            other => panic!("expected function, got {other:?}"),
        }
    }

    #[test]
    fn decorator_without_definition_is_an_error() {
        assert!(parse_module("@dec\nx = 1\n").is_err());
    }
}
