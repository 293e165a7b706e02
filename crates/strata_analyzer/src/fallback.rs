//! Indentation-driven line scanner used when a file does not parse.
//!
//! Blank and comment-only lines are skipped. `import`/`from` lines become
//! single-line import units, a `def`/`class` header (with the decorators
//! directly above it) absorbs every following line indented deeper than the
//! header, and any other line is a one-line statement. Name usage comes from
//! parsing each unit on its own when possible, and from a lexical scan
//! otherwise.

use crate::unit::{Unit, UnitKind};
use std::collections::BTreeSet;
use strata_python::ast::StmtKind;
use strata_python::{names_of, parse_module};
use strata_source::SourceText;

const KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
    "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
    "try", "while", "with", "yield",
];

struct OpenBlock {
    kind: UnitKind,
    name: String,
    start: u32,
    end: u32,
    indent: usize,
}

/// Splits a source text into units without parsing it as a whole.
pub(crate) fn scan_units(text: &SourceText) -> Vec<Unit> {
    let mut units = Vec::new();
    let mut open: Option<OpenBlock> = None;
    let mut decorators: Vec<(u32, usize)> = Vec::new();

    for (idx, line) in text.content.lines().enumerate() {
        let line_no = idx as u32 + 1;
        let stripped = line.trim_start();
        if stripped.is_empty() || stripped.starts_with('#') {
            continue;
        }
        let indent = line.len() - stripped.len();

        if let Some(block) = open.as_mut() {
            if indent > block.indent {
                block.end = line_no;
                continue;
            }
        }
        if let Some(block) = open.take() {
            units.push(close_block(text, block));
        }

        if stripped.starts_with('@') {
            decorators.push((line_no, indent));
            continue;
        }

        if let Some((kind, name)) = block_header(stripped) {
            let start = match decorators.first() {
                Some(&(first, d_indent)) if d_indent == indent => {
                    decorators.clear();
                    first
                }
                _ => {
                    flush_decorators(text, &mut decorators, &mut units);
                    line_no
                }
            };
            open = Some(OpenBlock {
                kind,
                name,
                start,
                end: line_no,
                indent,
            });
            continue;
        }

        flush_decorators(text, &mut decorators, &mut units);
        let kind = if is_import_line(stripped) {
            UnitKind::Import
        } else {
            UnitKind::Statement
        };
        units.push(line_unit(text, kind, line_no, indent));
    }

    if let Some(block) = open.take() {
        units.push(close_block(text, block));
    }
    flush_decorators(text, &mut decorators, &mut units);
    units
}

fn flush_decorators(text: &SourceText, pending: &mut Vec<(u32, usize)>, units: &mut Vec<Unit>) {
    for (line_no, indent) in pending.drain(..) {
        units.push(line_unit(text, UnitKind::Statement, line_no, indent));
    }
}

fn line_unit(text: &SourceText, kind: UnitKind, line_no: u32, indent: usize) -> Unit {
    let content = text.lines_text(line_no, line_no);
    let name = if kind == UnitKind::Import {
        "import".to_string()
    } else {
        first_word(content.trim_start()).to_string()
    };
    let mut unit = Unit::new(kind, name, &text.path, line_no, line_no, content);
    fill_names(&mut unit, indent, None);
    unit
}

fn close_block(text: &SourceText, block: OpenBlock) -> Unit {
    let content = text.lines_text(block.start, block.end);
    let mut unit = Unit::new(
        block.kind,
        block.name.clone(),
        &text.path,
        block.start,
        block.end,
        content,
    );
    fill_names(&mut unit, block.indent, Some(block.name));
    unit
}

/// Fills references, definitions, and imports of a fallback unit.
fn fill_names(unit: &mut Unit, indent: usize, declared: Option<String>) {
    let dedented = dedent(&unit.content, indent);
    if let Ok(module) = parse_module(&dedented) {
        for stmt in &module.body {
            let names = names_of(stmt);
            unit.references.extend(names.reads);
            unit.definitions.extend(names.bindings);
            if let StmtKind::Import(import) = &stmt.kind {
                unit.imports.extend(import.modules.iter().cloned());
            }
        }
        return;
    }

    match declared {
        Some(name) => {
            unit.definitions.insert(name);
        }
        None if unit.kind == UnitKind::Import => {
            unit.imports = lexical_imports(dedented.trim());
        }
        None => unit.definitions.extend(assigned_names(dedented.trim())),
    }
    unit.references = scan_names(&unit.content)
        .difference(&unit.definitions)
        .cloned()
        .collect();
}

/// Recognizes `def`, `async def`, and `class` headers, returning the kind
/// and declared name.
fn block_header(stripped: &str) -> Option<(UnitKind, String)> {
    let (kind, rest) = if let Some(rest) = stripped.strip_prefix("def ") {
        (UnitKind::Function, rest)
    } else if let Some(rest) = stripped.strip_prefix("async def ") {
        (UnitKind::Function, rest)
    } else if let Some(rest) = stripped.strip_prefix("class ") {
        (UnitKind::Class, rest)
    } else {
        return None;
    };
    let name: String = rest
        .trim_start()
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_')
        .collect();
    Some((kind, name))
}

fn is_import_line(stripped: &str) -> bool {
    stripped.starts_with("import ") || stripped.starts_with("from ")
}

fn first_word(s: &str) -> &str {
    let end = s
        .find(|c: char| !(c.is_alphanumeric() || c == '_'))
        .unwrap_or(s.len());
    &s[..end]
}

/// Removes up to `indent` leading whitespace characters from every line.
fn dedent(content: &str, indent: usize) -> String {
    if indent == 0 {
        return content.to_string();
    }
    content
        .lines()
        .map(|line| {
            let strip = line
                .char_indices()
                .take(indent)
                .take_while(|(_, c)| c.is_whitespace())
                .last()
                .map(|(i, c)| i + c.len_utf8())
                .unwrap_or(0);
            &line[strip..]
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// Tolerant lexical scan: identifiers outside strings and comments, not
/// preceded by `.`, and not keywords.
pub(crate) fn scan_names(text: &str) -> BTreeSet<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut names = BTreeSet::new();
    let mut i = 0;
    let mut prev_significant = ' ';
    while i < chars.len() {
        let c = chars[i];
        if c == '#' {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
            continue;
        }
        if c == '"' || c == '\'' {
            i = skip_string(&chars, i);
            prev_significant = c;
            continue;
        }
        if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            let is_prefix = i < chars.len()
                && (chars[i] == '"' || chars[i] == '\'')
                && word.len() <= 2
                && word.chars().all(|c| "rRbBuUfF".contains(c));
            if prev_significant != '.' && !is_prefix && !KEYWORDS.contains(&word.as_str()) {
                names.insert(word);
            }
            prev_significant = 'a';
            continue;
        }
        if c.is_ascii_digit() {
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '.')
            {
                i += 1;
            }
            prev_significant = '0';
            continue;
        }
        if !c.is_whitespace() {
            prev_significant = c;
        }
        i += 1;
    }
    names
}

/// Returns the index just past the string literal starting at `i`. An
/// unterminated string runs to the end of its line.
fn skip_string(chars: &[char], i: usize) -> usize {
    let quote = chars[i];
    let triple = chars.get(i + 1) == Some(&quote) && chars.get(i + 2) == Some(&quote);
    let mut j = if triple { i + 3 } else { i + 1 };
    while j < chars.len() {
        let c = chars[j];
        if c == '\\' {
            j += 2;
            continue;
        }
        if c == quote {
            if !triple {
                return j + 1;
            }
            if chars.get(j + 1) == Some(&quote) && chars.get(j + 2) == Some(&quote) {
                return j + 3;
            }
        }
        if c == '\n' && !triple {
            return j;
        }
        j += 1;
    }
    chars.len()
}

/// Names bound by a `target = value` line, read lexically.
fn assigned_names(stmt: &str) -> Vec<String> {
    let bytes = stmt.as_bytes();
    let Some(eq) = (0..bytes.len()).find(|&i| {
        let shift_assign = i >= 2 && matches!(&bytes[i - 2..i], b"<<" | b">>");
        bytes[i] == b'='
            && bytes.get(i + 1) != Some(&b'=')
            && (i == 0 || shift_assign || !matches!(bytes[i - 1], b'=' | b'!' | b'<' | b'>'))
    }) else {
        return Vec::new();
    };
    let mut lhs = &stmt[..eq];
    lhs = lhs.trim_end_matches(['+', '-', '*', '/', '%', '&', '|', '^', '@', '<', '>']);
    if let Some(colon) = lhs.find(':') {
        lhs = &lhs[..colon];
    }
    lhs.split(',')
        .map(|part| part.trim().trim_matches(|c: char| matches!(c, '(' | ')' | '[' | ']' | '*' | ' ')))
        .filter(|part| is_identifier(part) && !KEYWORDS.contains(part))
        .map(str::to_string)
        .collect()
}

/// Module names of an import line, read lexically.
fn lexical_imports(stmt: &str) -> Vec<String> {
    if let Some(rest) = stmt.strip_prefix("from ") {
        return rest
            .split_whitespace()
            .next()
            .map(|m| vec![m.to_string()])
            .unwrap_or_default();
    }
    stmt.strip_prefix("import ")
        .map(|rest| {
            rest.split(',')
                .filter_map(|part| part.split_whitespace().next())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
