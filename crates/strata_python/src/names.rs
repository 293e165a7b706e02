//! Name-use extraction: which names a statement reads from, and binds in,
//! its enclosing scope.
//!
//! Reads are names in load context: bare names, the root of every attribute
//! chain, and augmented-assignment targets. Names bound by a comprehension
//! or lambda are excluded from the reads of that expression. A function's
//! reads cover its whole body, locals included, so a function that shadows a
//! module-level name still depends on it.

use crate::ast::*;
use std::collections::BTreeSet;

/// The names a statement reads and binds at its own scope level.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameUse {
    /// Free names read by the statement.
    pub reads: BTreeSet<String>,
    /// Names the statement binds in the enclosing scope.
    pub bindings: BTreeSet<String>,
}

/// Computes reads and bindings for a statement.
pub fn names_of(stmt: &Stmt) -> NameUse {
    let mut names = NameUse::default();
    stmt_reads(stmt, &mut names.reads);
    stmt_bindings(stmt, &mut names.bindings);
    names
}

/// Collects the free names an expression reads.
pub fn expr_reads(expr: &Expr, out: &mut BTreeSet<String>) {
    match expr {
        Expr::Name(name) => {
            out.insert(name.clone());
        }
        Expr::Attribute { value, .. } | Expr::Starred(value) => expr_reads(value, out),
        Expr::Call { func, args } => {
            expr_reads(func, out);
            args.iter().for_each(|a| expr_reads(a, out));
        }
        Expr::Subscript { value, index } => {
            expr_reads(value, out);
            expr_reads(index, out);
        }
        Expr::Tuple(items) | Expr::List(items) | Expr::Compound(items) => {
            items.iter().for_each(|e| expr_reads(e, out));
        }
        Expr::Lambda { params, body } => {
            params_reads(params, out);
            let mut inner = BTreeSet::new();
            expr_reads(body, &mut inner);
            for p in params {
                inner.remove(&p.name);
            }
            out.extend(inner);
        }
        Expr::Comprehension { element, clauses } => comprehension_reads(element, clauses, out),
        Expr::NamedExpr { value, .. } => expr_reads(value, out),
        Expr::Literal => {}
    }
}

fn comprehension_reads(element: &[Expr], clauses: &[CompClause], out: &mut BTreeSet<String>) {
    // The outermost iterable is evaluated in the enclosing scope.
    if let Some(first) = clauses.first() {
        expr_reads(&first.iter, out);
    }
    let mut inner = BTreeSet::new();
    let mut bound = BTreeSet::new();
    for (i, clause) in clauses.iter().enumerate() {
        target_bindings(&clause.target, &mut bound);
        target_reads(&clause.target, &mut inner);
        if i > 0 {
            expr_reads(&clause.iter, &mut inner);
        }
        clause.ifs.iter().for_each(|e| expr_reads(e, &mut inner));
    }
    element.iter().for_each(|e| expr_reads(e, &mut inner));
    out.extend(inner.difference(&bound).cloned());
}

fn params_reads(params: &[Param], out: &mut BTreeSet<String>) {
    for p in params {
        if let Some(a) = &p.annotation {
            expr_reads(a, out);
        }
        if let Some(d) = &p.default {
            expr_reads(d, out);
        }
    }
}

/// Names read while storing into a target: `obj` in `obj.attr = v`, both
/// sides of `table[key] = v`.
fn target_reads(target: &Expr, out: &mut BTreeSet<String>) {
    match target {
        Expr::Name(_) => {}
        Expr::Attribute { value, .. } => expr_reads(value, out),
        Expr::Subscript { value, index } => {
            expr_reads(value, out);
            expr_reads(index, out);
        }
        Expr::Tuple(items) | Expr::List(items) => items.iter().for_each(|t| target_reads(t, out)),
        Expr::Starred(inner) => target_reads(inner, out),
        other => expr_reads(other, out),
    }
}

/// Names bound by an assignment target, including unpacking.
fn target_bindings(target: &Expr, out: &mut BTreeSet<String>) {
    match target {
        Expr::Name(name) => {
            out.insert(name.clone());
        }
        Expr::Tuple(items) | Expr::List(items) => {
            items.iter().for_each(|t| target_bindings(t, out))
        }
        Expr::Starred(inner) => target_bindings(inner, out),
        _ => {}
    }
}

/// Names bound by `:=` inside an expression. Lambda bodies have their own
/// scope; comprehensions bind walrus targets in the enclosing one.
fn walrus_bindings(expr: &Expr, out: &mut BTreeSet<String>) {
    match expr {
        Expr::NamedExpr { target, value } => {
            out.insert(target.clone());
            walrus_bindings(value, out);
        }
        Expr::Attribute { value, .. } | Expr::Starred(value) => walrus_bindings(value, out),
        Expr::Call { func, args } => {
            walrus_bindings(func, out);
            args.iter().for_each(|a| walrus_bindings(a, out));
        }
        Expr::Subscript { value, index } => {
            walrus_bindings(value, out);
            walrus_bindings(index, out);
        }
        Expr::Tuple(items) | Expr::List(items) | Expr::Compound(items) => {
            items.iter().for_each(|e| walrus_bindings(e, out))
        }
        Expr::Comprehension { element, clauses } => {
            element.iter().for_each(|e| walrus_bindings(e, out));
            for c in clauses {
                walrus_bindings(&c.iter, out);
                c.ifs.iter().for_each(|e| walrus_bindings(e, out));
            }
        }
        Expr::Name(_) | Expr::Lambda { .. } | Expr::Literal => {}
    }
}

fn stmt_reads(stmt: &Stmt, out: &mut BTreeSet<String>) {
    match &stmt.kind {
        StmtKind::Import(_) => {}
        StmtKind::Assign(assign) => {
            for t in &assign.targets {
                if assign.op == AssignOp::Augmented {
                    expr_reads(t, out);
                } else {
                    target_reads(t, out);
                }
            }
            if let Some(a) = &assign.annotation {
                expr_reads(a, out);
            }
            if let Some(v) = &assign.value {
                expr_reads(v, out);
            }
        }
        StmtKind::Expr(e) => expr_reads(e, out),
        StmtKind::FunctionDef(f) => function_reads(f, out),
        StmtKind::ClassDef(c) => {
            c.decorators.iter().for_each(|d| expr_reads(d, out));
            c.bases.iter().for_each(|b| expr_reads(b, out));
            // Names bound by earlier class-level statements shadow the
            // module for later ones. Method bodies never see them.
            let mut class_scope = BTreeSet::new();
            for s in &c.body {
                let mut reads = BTreeSet::new();
                stmt_reads(s, &mut reads);
                if matches!(s.kind, StmtKind::FunctionDef(_)) {
                    out.extend(reads);
                } else {
                    out.extend(reads.difference(&class_scope).cloned());
                }
                stmt_bindings(s, &mut class_scope);
            }
        }
        StmtKind::Control(c) => {
            c.tests.iter().for_each(|e| expr_reads(e, out));
            c.targets.iter().for_each(|t| target_reads(t, out));
            c.body.iter().for_each(|s| stmt_reads(s, out));
        }
        StmtKind::With(w) => {
            w.items.iter().for_each(|e| expr_reads(e, out));
            w.targets.iter().for_each(|t| target_reads(t, out));
            w.body.iter().for_each(|s| stmt_reads(s, out));
        }
        StmtKind::Simple(s) => match s.keyword {
            SimpleKind::Del => s.values.iter().for_each(|t| target_reads(t, out)),
            _ => s.values.iter().for_each(|e| expr_reads(e, out)),
        },
        StmtKind::Line(stmts) => stmts.iter().for_each(|s| stmt_reads(s, out)),
    }
}

fn function_reads(f: &FunctionDef, out: &mut BTreeSet<String>) {
    f.decorators.iter().for_each(|d| expr_reads(d, out));
    params_reads(&f.params, out);
    if let Some(r) = &f.returns {
        expr_reads(r, out);
    }

    f.body.iter().for_each(|s| stmt_reads(s, out));
}

fn stmt_bindings(stmt: &Stmt, out: &mut BTreeSet<String>) {
    match &stmt.kind {
        StmtKind::Import(import) => out.extend(import.bindings.iter().cloned()),
        StmtKind::Assign(assign) => {
            for t in &assign.targets {
                target_bindings(t, out);
            }
            if let Some(v) = &assign.value {
                walrus_bindings(v, out);
            }
        }
        StmtKind::Expr(e) => walrus_bindings(e, out),
        StmtKind::FunctionDef(f) => {
            out.insert(f.name.clone());
        }
        StmtKind::ClassDef(c) => {
            out.insert(c.name.clone());
        }
        StmtKind::Control(c) => {
            c.targets.iter().for_each(|t| target_bindings(t, out));
            c.tests.iter().for_each(|e| walrus_bindings(e, out));
            c.body.iter().for_each(|s| stmt_bindings(s, out));
        }
        StmtKind::With(w) => {
            w.targets.iter().for_each(|t| target_bindings(t, out));
            w.body.iter().for_each(|s| stmt_bindings(s, out));
        }
        StmtKind::Simple(s) => {
            if s.keyword == SimpleKind::TypeAlias {
                out.extend(s.names.iter().cloned());
            }
        }
        StmtKind::Line(stmts) => stmts.iter().for_each(|s| stmt_bindings(s, out)),
    }
}
