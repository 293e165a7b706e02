//! AST node types for the structural Python parser.
//!
//! The tree keeps only what is needed to find unit boundaries and the names a
//! statement reads or binds. Statements carry a [`Span`] (including any
//! decorators); expressions do not. Operators, literals, and display syntax
//! collapse into [`Expr::Compound`] and [`Expr::Literal`].

use serde::{Deserialize, Serialize};
use strata_source::Span;

// ============================================================================
// Top-level
// ============================================================================

/// A parsed Python module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    /// Top-level statements in source order.
    pub body: Vec<Stmt>,
}

/// A statement with its source span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stmt {
    /// The statement itself.
    pub kind: StmtKind,
    /// Byte span from the first decorator (if any) to the end of the last
    /// token of the statement, excluding the trailing newline.
    pub span: Span,
}

/// The kind of a statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StmtKind {
    /// `import a.b as c` or `from m import x, y`.
    Import(Import),
    /// Plain, augmented, or annotated assignment.
    Assign(Assign),
    /// A bare expression statement.
    Expr(Expr),
    /// A `def` or `async def`.
    FunctionDef(FunctionDef),
    /// A `class` definition.
    ClassDef(ClassDef),
    /// An `if`, `for`, `while`, `try`, or `match` block with all its clauses.
    Control(Control),
    /// A `with` or `async with` block.
    With(With),
    /// `pass`, `return`, `global`, and the other keyword statements.
    Simple(Simple),
    /// Two or more simple statements separated by `;` on one line.
    Line(Vec<Stmt>),
}

// ============================================================================
// Statements
// ============================================================================

/// An import statement.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Import {
    /// Dotted module names imported (`from` imports contribute the source
    /// module, with leading dots for relative imports).
    pub modules: Vec<String>,
    /// Names bound in the importing scope. `import a.b` binds `a`;
    /// star imports bind nothing.
    pub bindings: Vec<String>,
}

/// How an assignment statement was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignOp {
    /// `a = b = value`
    Plain,
    /// `a += value`
    Augmented,
    /// `a: T = value` or `a: T`
    Annotated,
}

/// An assignment statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assign {
    /// The assignment form.
    pub op: AssignOp,
    /// Assignment targets, leftmost first.
    pub targets: Vec<Expr>,
    /// The annotation of an annotated assignment.
    pub annotation: Option<Expr>,
    /// The assigned value (absent for a bare annotation).
    pub value: Option<Expr>,
}

/// A function parameter or lambda parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    /// Parameter name (without `*` / `**`).
    pub name: String,
    /// Optional annotation.
    pub annotation: Option<Expr>,
    /// Optional default value.
    pub default: Option<Expr>,
}

/// A function definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDef {
    /// Function name.
    pub name: String,
    /// `true` for `async def`.
    pub is_async: bool,
    /// Decorator expressions, outermost first.
    pub decorators: Vec<Expr>,
    /// Parameters in declaration order.
    pub params: Vec<Param>,
    /// Return annotation.
    pub returns: Option<Expr>,
    /// Function body.
    pub body: Vec<Stmt>,
}

/// A class definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDef {
    /// Class name.
    pub name: String,
    /// Decorator expressions, outermost first.
    pub decorators: Vec<Expr>,
    /// Base classes and keyword argument values (such as `metaclass=M`).
    pub bases: Vec<Expr>,
    /// Class body.
    pub body: Vec<Stmt>,
}

/// The keyword that introduces a control-flow block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlKind {
    /// `if` / `elif` / `else`
    If,
    /// `for` / `async for` with optional `else`
    For,
    /// `while` with optional `else`
    While,
    /// `try` with `except` / `else` / `finally`
    Try,
    /// `match` with `case` clauses
    Match,
}

/// A compound control-flow statement, flattened across its clauses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Control {
    /// The introducing keyword.
    pub keyword: ControlKind,
    /// Expressions evaluated by the clause headers: conditions, iterables,
    /// exception types, the match subject, case guards, and value patterns.
    pub tests: Vec<Expr>,
    /// Targets bound by clause headers: loop targets, `except ... as name`,
    /// and capture names in case patterns.
    pub targets: Vec<Expr>,
    /// Statements of every clause body, in source order.
    pub body: Vec<Stmt>,
}

/// A `with` statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct With {
    /// `true` for `async with`.
    pub is_async: bool,
    /// Context manager expressions.
    pub items: Vec<Expr>,
    /// `as` targets.
    pub targets: Vec<Expr>,
    /// Block body.
    pub body: Vec<Stmt>,
}

/// The keyword of a simple statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimpleKind {
    /// `pass`
    Pass,
    /// `break`
    Break,
    /// `continue`
    Continue,
    /// `return [value]`
    Return,
    /// `raise [exc [from cause]]`
    Raise,
    /// `del targets`
    Del,
    /// `global names`
    Global,
    /// `nonlocal names`
    Nonlocal,
    /// `assert test [, msg]`
    Assert,
    /// `type Alias[...] = value`
    TypeAlias,
}

/// A simple keyword statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Simple {
    /// The statement keyword.
    pub keyword: SimpleKind,
    /// Expressions read by the statement.
    pub values: Vec<Expr>,
    /// Names declared by `global` / `nonlocal`, or the alias bound by `type`.
    pub names: Vec<String>,
}

// ============================================================================
// Expressions
// ============================================================================

/// One `for ... in ... [if ...]` clause of a comprehension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompClause {
    /// The loop target.
    pub target: Expr,
    /// The iterated expression.
    pub iter: Expr,
    /// Filter conditions.
    pub ifs: Vec<Expr>,
}

/// An expression, reduced to its name structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// A bare identifier.
    Name(String),
    /// `value.attr`
    Attribute {
        /// The object expression.
        value: Box<Expr>,
        /// The attribute name.
        attr: String,
    },
    /// `func(args)`; keyword argument values are included in `args`.
    Call {
        /// The callee.
        func: Box<Expr>,
        /// Positional and keyword argument values.
        args: Vec<Expr>,
    },
    /// `value[index]`
    Subscript {
        /// The subscripted expression.
        value: Box<Expr>,
        /// The index or slice.
        index: Box<Expr>,
    },
    /// A tuple, parenthesized or not.
    Tuple(Vec<Expr>),
    /// A list display.
    List(Vec<Expr>),
    /// `*value` or `**value`
    Starred(Box<Expr>),
    /// `lambda params: body`
    Lambda {
        /// Lambda parameters.
        params: Vec<Param>,
        /// The lambda body.
        body: Box<Expr>,
    },
    /// A list, set, or dict comprehension or a generator expression.
    Comprehension {
        /// The element expression(s); a dict comprehension has key and value.
        element: Vec<Expr>,
        /// The `for` clauses, outermost first.
        clauses: Vec<CompClause>,
    },
    /// `target := value`
    NamedExpr {
        /// The bound name.
        target: String,
        /// The assigned value.
        value: Box<Expr>,
    },
    /// Any other expression, kept as its sub-expressions.
    Compound(Vec<Expr>),
    /// A literal with no name content.
    Literal,
}

impl Expr {
    /// Wraps sub-expressions, collapsing trivial cases.
    pub fn compound(mut parts: Vec<Expr>) -> Expr {
        parts.retain(|p| *p != Expr::Literal);
        match parts.len() {
            0 => Expr::Literal,
            1 => parts.pop().unwrap_or(Expr::Literal),
            _ => Expr::Compound(parts),
        }
    }

    /// Returns `true` if the expression may appear as an assignment target.
    pub fn is_assignable(&self) -> bool {
        match self {
            Expr::Name(_) | Expr::Attribute { .. } | Expr::Subscript { .. } => true,
            Expr::Tuple(items) | Expr::List(items) => items.iter().all(Expr::is_assignable),
            Expr::Starred(inner) => inner.is_assignable(),
            _ => false,
        }
    }
}
