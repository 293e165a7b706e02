//! The compilation unit: the smallest independently recompilable piece of a
//! source file.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use strata_common::{ContentHash, UnitId};

/// What kind of source construct a unit covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitKind {
    /// A whole module.
    Module,
    /// An `import` or `from ... import` statement.
    Import,
    /// A class definition, including decorators.
    Class,
    /// A top-level function definition, including decorators.
    Function,
    /// A function defined directly in a class body.
    Method,
    /// Any other simple statement.
    Statement,
    /// A plain, augmented, or annotated assignment.
    Assignment,
    /// A bare expression statement.
    Expression,
    /// An `if`, `for`, `while`, `try`, or `match` block.
    ControlFlow,
    /// A `with` block.
    ContextBlock,
}

impl UnitKind {
    /// Returns `true` for kinds that open a scope whose members must be
    /// recompiled together.
    pub fn is_scope(self) -> bool {
        matches!(self, UnitKind::Class | UnitKind::Function | UnitKind::Method)
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UnitKind::Module => "module",
            UnitKind::Import => "import",
            UnitKind::Class => "class",
            UnitKind::Function => "function",
            UnitKind::Method => "method",
            UnitKind::Statement => "statement",
            UnitKind::Assignment => "assignment",
            UnitKind::Expression => "expression",
            UnitKind::ControlFlow => "control",
            UnitKind::ContextBlock => "with",
        };
        f.write_str(s)
    }
}

/// A compilation unit.
///
/// Units are recreated wholesale on every analysis pass; identity is the
/// [`UnitId`] derived from file, line span, and normalized content hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    /// Deterministic identifier.
    pub id: UnitId,
    /// The construct this unit covers.
    pub kind: UnitKind,
    /// Display name (function or class name, `import`, `if`, ...).
    pub name: String,
    /// The owning file, as passed to the analyzer.
    pub file_path: String,
    /// First line (1-based, inclusive).
    pub start_line: u32,
    /// Last line (1-based, inclusive).
    pub end_line: u32,
    /// Raw text of lines `start_line..=end_line`.
    pub content: String,
    /// Hash of the content with each line trimmed.
    pub content_hash: ContentHash,
    /// Enclosing class unit, for class members.
    pub parent: Option<UnitId>,
    /// Member units, for classes.
    pub children: Vec<UnitId>,
    /// Module names imported by this unit.
    pub imports: Vec<String>,
    /// Names read from the enclosing scope.
    pub references: BTreeSet<String>,
    /// Names bound in the enclosing scope.
    pub definitions: BTreeSet<String>,
    /// Units defining names this unit references.
    pub dependencies: BTreeSet<UnitId>,
}

impl Unit {
    /// Creates a unit over `content`, computing its hash and id.
    pub fn new(
        kind: UnitKind,
        name: impl Into<String>,
        file_path: &str,
        start_line: u32,
        end_line: u32,
        content: String,
    ) -> Self {
        let content_hash = ContentHash::of_normalized(&content);
        Self {
            id: UnitId::new(file_path, start_line, end_line, &content_hash),
            kind,
            name: name.into(),
            file_path: file_path.to_string(),
            start_line,
            end_line,
            content,
            content_hash,
            parent: None,
            children: Vec::new(),
            imports: Vec::new(),
            references: BTreeSet::new(),
            definitions: BTreeSet::new(),
            dependencies: BTreeSet::new(),
        }
    }

    /// Returns `(start_line, end_line)`.
    pub fn line_range(&self) -> (u32, u32) {
        (self.start_line, self.end_line)
    }

    /// Returns `true` if `line` falls within this unit.
    pub fn contains_line(&self, line: u32) -> bool {
        self.start_line <= line && line <= self.end_line
    }

    /// Returns `true` if this unit shares any line with `start..=end`.
    pub fn overlaps(&self, start: u32, end: u32) -> bool {
        self.start_line <= end && self.end_line >= start
    }

    /// Returns `true` if `other` lies entirely within this unit's lines.
    pub fn encloses(&self, other: &Unit) -> bool {
        self.id != other.id
            && self.start_line <= other.start_line
            && other.end_line <= self.end_line
    }
}

/// Returns the units sharing at least one line with `start..=end`.
pub fn units_in_range(units: &[Unit], start: u32, end: u32) -> Vec<&Unit> {
    units.iter().filter(|u| u.overlaps(start, end)).collect()
}
