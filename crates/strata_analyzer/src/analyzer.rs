//! Source analysis: turns a file's text into an ordered list of units.

use crate::deps::link_dependencies;
use crate::error::AnalyzeError;
use crate::fallback;
use crate::unit::{Unit, UnitKind};
use std::collections::HashSet;
use std::path::Path;
use strata_common::UnitId;
use strata_python::ast::{ControlKind, Module, SimpleKind, Stmt, StmtKind};
use strata_python::{names_of, parse_module};
use strata_source::SourceText;

/// Splits `source` into compilation units. Never fails.
///
/// Top-level statements become units in source order. A class is followed
/// by one unit per member statement. When the text does not parse, a
/// line-based scanner produces the units instead.
pub fn analyze_source(source: &str, file_path: &str) -> Vec<Unit> {
    let text = SourceText::new(file_path, source);
    let mut units = match parse_module(source) {
        Ok(module) => units_from_module(&text, &module),
        Err(err) => {
            let offset = err.offset.min(source.len() as u32);
            let (line, column) = text.line_col(offset);
            tracing::debug!(
                file = file_path,
                line,
                column,
                error = %err.message,
                "parse failed, falling back to line scanner"
            );
            fallback::scan_units(&text)
        }
    };
    link_dependencies(&mut units);
    tracing::trace!(file = file_path, units = units.len(), "analyzed source");
    units
}

/// Reads and analyzes a file. The path, as displayed, becomes the units'
/// file path.
pub fn analyze_file(path: &Path) -> Result<Vec<Unit>, AnalyzeError> {
    let source = std::fs::read_to_string(path).map_err(|source| AnalyzeError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(analyze_source(&source, &path.to_string_lossy()))
}

fn units_from_module(text: &SourceText, module: &Module) -> Vec<Unit> {
    let mut builder = UnitBuilder {
        text,
        units: Vec::new(),
        seen: HashSet::new(),
    };
    for stmt in &module.body {
        builder.push(stmt, None);
    }
    builder.units
}

struct UnitBuilder<'a> {
    text: &'a SourceText,
    units: Vec<Unit>,
    seen: HashSet<UnitId>,
}

impl UnitBuilder<'_> {
    /// Adds a unit for `stmt` (and its members, for a class). Returns the
    /// unit's id, or `None` if an identical unit already exists.
    fn push(&mut self, stmt: &Stmt, parent: Option<&UnitId>) -> Option<UnitId> {
        let (start, end) = self.text.line_range(stmt.span);
        let content = self.text.lines_text(start, end);
        let (kind, name) = classify(stmt, parent.is_some());
        let mut unit = Unit::new(kind, name, &self.text.path, start, end, content);
        if !self.seen.insert(unit.id.clone()) {
            return None;
        }

        let names = names_of(stmt);
        unit.references = names.reads;
        unit.definitions = names.bindings;
        unit.imports = imported_modules(stmt);
        unit.parent = parent.cloned();

        let id = unit.id.clone();
        let index = self.units.len();
        self.units.push(unit);

        if let StmtKind::ClassDef(class) = &stmt.kind {
            for member in &class.body {
                if let Some(child) = self.push(member, Some(&id)) {
                    self.units[index].children.push(child);
                }
            }
        }
        Some(id)
    }
}

fn imported_modules(stmt: &Stmt) -> Vec<String> {
    match &stmt.kind {
        StmtKind::Import(import) => import.modules.clone(),
        StmtKind::Line(stmts) => stmts.iter().flat_map(imported_modules).collect(),
        _ => Vec::new(),
    }
}

fn classify(stmt: &Stmt, in_class: bool) -> (UnitKind, String) {
    match &stmt.kind {
        StmtKind::Import(import) => (UnitKind::Import, format!("import {}", import.modules.join(", "))),
        StmtKind::Assign(_) => {
            let targets: Vec<_> = names_of(stmt).bindings.into_iter().collect();
            (UnitKind::Assignment, targets.join(", "))
        }
        StmtKind::Expr(_) => (UnitKind::Expression, "expression".to_string()),
        StmtKind::FunctionDef(f) => {
            let kind = if in_class {
                UnitKind::Method
            } else {
                UnitKind::Function
            };
            (kind, f.name.clone())
        }
        StmtKind::ClassDef(c) => (UnitKind::Class, c.name.clone()),
        StmtKind::Control(c) => {
            let keyword = match c.keyword {
                ControlKind::If => "if",
                ControlKind::For => "for",
                ControlKind::While => "while",
                ControlKind::Try => "try",
                ControlKind::Match => "match",
            };
            (UnitKind::ControlFlow, keyword.to_string())
        }
        StmtKind::With(_) => (UnitKind::ContextBlock, "with".to_string()),
        StmtKind::Simple(s) => {
            let keyword = match s.keyword {
                SimpleKind::Pass => "pass",
                SimpleKind::Break => "break",
                SimpleKind::Continue => "continue",
                SimpleKind::Return => "return",
                SimpleKind::Raise => "raise",
                SimpleKind::Del => "del",
                SimpleKind::Global => "global",
                SimpleKind::Nonlocal => "nonlocal",
                SimpleKind::Assert => "assert",
                SimpleKind::TypeAlias => "type",
            };
            (UnitKind::Statement, keyword.to_string())
        }
        StmtKind::Line(stmts) => {
            let parts: Vec<_> = stmts.iter().map(|s| classify(s, in_class)).collect();
            let uniform = parts.windows(2).all(|w| w[0].0 == w[1].0);
            let kind = match parts.first() {
                Some((k, _)) if uniform => *k,
                _ => UnitKind::Statement,
            };
            let names: Vec<_> = parts.into_iter().map(|(_, n)| n).collect();
            (kind, names.join("; "))
        }
    }
}
