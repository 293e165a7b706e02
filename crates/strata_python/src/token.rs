//! Token types for the Python lexer.
//!
//! Defines the [`PyToken`] enum covering Python keywords, operators,
//! punctuation, literals, and the layout tokens (`Newline`, `Indent`,
//! `Dedent`) derived from indentation, plus the [`Token`] struct pairing a
//! token kind with its source [`Span`].

use serde::{Deserialize, Serialize};
use strata_source::Span;

/// A Python token kind.
///
/// Literal values and identifier text are not stored in the token; they are
/// retrieved from the source text using the token's span. Soft keywords
/// (`match`, `case`, `type`) are lexed as [`PyToken::Name`] and recognized by
/// the parser from context.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum PyToken {
    // === Keywords ===
    /// `False`
    False,
    /// `None`
    None,
    /// `True`
    True,
    /// `and`
    And,
    /// `as`
    As,
    /// `assert`
    Assert,
    /// `async`
    Async,
    /// `await`
    Await,
    /// `break`
    Break,
    /// `class`
    Class,
    /// `continue`
    Continue,
    /// `def`
    Def,
    /// `del`
    Del,
    /// `elif`
    Elif,
    /// `else`
    Else,
    /// `except`
    Except,
    /// `finally`
    Finally,
    /// `for`
    For,
    /// `from`
    From,
    /// `global`
    Global,
    /// `if`
    If,
    /// `import`
    Import,
    /// `in`
    In,
    /// `is`
    Is,
    /// `lambda`
    Lambda,
    /// `nonlocal`
    Nonlocal,
    /// `not`
    Not,
    /// `or`
    Or,
    /// `pass`
    Pass,
    /// `raise`
    Raise,
    /// `return`
    Return,
    /// `try`
    Try,
    /// `while`
    While,
    /// `with`
    With,
    /// `yield`
    Yield,

    // === Literals ===
    /// An identifier (including soft keywords).
    Name,
    /// A numeric literal.
    Number,
    /// A string or bytes literal, with any prefix.
    String,
    /// A formatted string literal (`f"..."`), parsed further for its fields.
    FString,

    // === Layout ===
    /// End of a logical line.
    Newline,
    /// Indentation increased.
    Indent,
    /// Indentation decreased by one level.
    Dedent,
    /// End of input.
    Eof,

    // === Delimiters ===
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `:`
    Colon,
    /// `,`
    Comma,
    /// `;`
    Semicolon,
    /// `.`
    Dot,
    /// `...`
    Ellipsis,
    /// `@`
    At,
    /// `->`
    Arrow,
    /// `=`
    Assign,
    /// `:=`
    ColonEq,
    /// Any augmented assignment operator (`+=`, `//=`, `>>=`, ...).
    AugAssign,

    // === Operators ===
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `**`
    DoubleStar,
    /// `/`
    Slash,
    /// `//`
    DoubleSlash,
    /// `%`
    Percent,
    /// `|`
    Pipe,
    /// `&`
    Amp,
    /// `^`
    Caret,
    /// `~`
    Tilde,
    /// `<<`
    LShift,
    /// `>>`
    RShift,
    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `<=`
    Le,
    /// `>=`
    Ge,
    /// `==`
    EqEq,
    /// `!=`
    NotEq,
}

impl PyToken {
    /// Returns `true` if this token is a hard keyword.
    pub fn is_keyword(self) -> bool {
        (self as u8) <= (PyToken::Yield as u8)
    }

    /// Returns `true` for tokens produced from indentation rather than text.
    pub fn is_layout(self) -> bool {
        matches!(
            self,
            PyToken::Newline | PyToken::Indent | PyToken::Dedent | PyToken::Eof
        )
    }
}

/// A token with its kind and source location.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Token {
    /// The kind of token.
    pub kind: PyToken,
    /// The source span of the token.
    pub span: Span,
}

/// Looks up a keyword by its exact spelling. Python keywords are
/// case-sensitive. Returns `None` for identifiers and soft keywords.
pub fn lookup_keyword(s: &str) -> Option<PyToken> {
    match s {
        "False" => Some(PyToken::False),
        "None" => Some(PyToken::None),
        "True" => Some(PyToken::True),
        "and" => Some(PyToken::And),
        "as" => Some(PyToken::As),
        "assert" => Some(PyToken::Assert),
        "async" => Some(PyToken::Async),
        "await" => Some(PyToken::Await),
        "break" => Some(PyToken::Break),
        "class" => Some(PyToken::Class),
        "continue" => Some(PyToken::Continue),
        "def" => Some(PyToken::Def),
        "del" => Some(PyToken::Del),
        "elif" => Some(PyToken::Elif),
        "else" => Some(PyToken::Else),
        "except" => Some(PyToken::Except),
        "finally" => Some(PyToken::Finally),
        "for" => Some(PyToken::For),
        "from" => Some(PyToken::From),
        "global" => Some(PyToken::Global),
        "if" => Some(PyToken::If),
        "import" => Some(PyToken::Import),
        "in" => Some(PyToken::In),
        "is" => Some(PyToken::Is),
        "lambda" => Some(PyToken::Lambda),
        "nonlocal" => Some(PyToken::Nonlocal),
        "not" => Some(PyToken::Not),
        "or" => Some(PyToken::Or),
        "pass" => Some(PyToken::Pass),
        "raise" => Some(PyToken::Raise),
        "return" => Some(PyToken::Return),
        "try" => Some(PyToken::Try),
        "while" => Some(PyToken::While),
        "with" => Some(PyToken::With),
        "yield" => Some(PyToken::Yield),
        _ => None,
    }
}
