//! Structural parser for Python source text.
//!
//! This crate tokenizes and parses just enough of Python to find statement
//! boundaries and the names each statement reads and binds. The main entry
//! point is [`parse_module`]; [`names::names_of`] then extracts name usage
//! from a parsed statement.
//!
//! # Architecture
//!
//! - **Lexer** ([`lexer`]): Converts source text to tokens, producing
//!   `Indent`/`Dedent` layout tokens from indentation and ignoring line
//!   breaks inside brackets.
//! - **Parser** ([`parser`]): Recursive descent parser over the token stream.
//!   Stops at the first syntax error.
//! - **AST** ([`ast`]): Statement nodes with spans and name-level expressions.
//! - **Names** ([`names`]): Reads and bindings per statement.

#![warn(missing_docs)]

pub mod ast;
pub mod error;
mod expr;
pub mod lexer;
pub mod names;
pub mod parser;
mod stmt;
pub mod token;

pub use ast::{Module, Stmt, StmtKind};
pub use error::ParseError;
pub use names::{names_of, NameUse};
pub use token::{PyToken, Token};

/// Parses Python source text into a [`Module`].
///
/// Returns the first tokenization or syntax error encountered.
pub fn parse_module(source: &str) -> Result<Module, ParseError> {
    let tokens = lexer::lex(source)?;
    let mut parser = parser::PyParser::new(source, tokens);
    parser.parse_module()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_representative_module() {
        let src = r#"
"""Module docstring."""
import os
from typing import Optional

CONSTANT = 10


@dataclass(frozen=True)
class Point:
    x: int
    y: int = 0

    def norm(self) -> float:
        return (self.x ** 2 + self.y ** 2) ** 0.5


async def fetch(url, *, timeout=CONSTANT):
    async with session.get(url) as resp:
        return await resp.json()


if __name__ == "__main__":
    for p in [Point(1, 2), Point(3)]:
        print(f"{p!r}: {p.norm():.2f}")
"#;
        let module = parse_module(src).unwrap();
        let kinds: Vec<_> = module
            .body
            .iter()
            .map(|s| std::mem::discriminant(&s.kind))
            .collect();
        assert_eq!(kinds.len(), 7);
        assert!(matches!(module.body[4].kind, StmtKind::ClassDef(_)));
        assert!(matches!(module.body[5].kind, StmtKind::FunctionDef(_)));
        assert!(matches!(module.body[6].kind, StmtKind::Control(_)));
    }

    #[test]
    fn syntax_error_reports_offset() {
        let err = parse_module("def broken(:\n    pass\n").unwrap_err();
        assert_eq!(err.offset, 11);
    }

    #[test]
    fn lexer_error_surfaces() {
        assert!(parse_module("x = 'unterminated\n").is_err());
    }
}
