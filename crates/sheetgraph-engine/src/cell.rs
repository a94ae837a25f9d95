//! A single sheet cell: either literal text or a cached formula.

use std::collections::HashSet;

use sheetgraph_formula::{CellValue, FormulaAst, ParseError, Position};

#[derive(Debug)]
enum Content {
    Text(String),
    Formula {
        ast: Box<dyn FormulaAst>,
        cached: Option<CellValue>,
    },
}

/// One cell in the sheet. Tracks its own outgoing references (positions its
/// formula reads from) and the incoming set the owning [`crate::Sheet`]
/// maintains (positions whose formulas read from this one).
#[derive(Debug)]
pub struct Cell {
    content: Content,
    outgoing: Vec<Position>,
    pub(crate) incoming: HashSet<Position>,
}

impl Cell {
    pub(crate) fn empty() -> Cell {
        Cell {
            content: Content::Text(String::new()),
            outgoing: Vec::new(),
            incoming: HashSet::new(),
        }
    }

    /// Replace this cell's content from raw user input. A leading `=`
    /// (unless the whole input is just `"="`) starts a formula; anything
    /// else, including text beginning with an escaped `'=`, is literal text.
    /// Leaves the cell untouched if `raw` fails to parse, so callers can
    /// validate before committing to the sheet's graph.
    pub fn set(&mut self, raw: &str) -> Result<(), ParseError> {
        if raw.len() > 1 && raw.starts_with('=') {
            let ast = sheetgraph_formula::parse(&raw[1..])?;
            self.outgoing = dedup_preserve_order(ast.referenced_cells());
            self.content = Content::Formula { ast, cached: None };
        } else {
            self.outgoing = Vec::new();
            self.content = Content::Text(raw.to_string());
        }
        Ok(())
    }

    /// Evaluate this cell, consulting and populating the formula cache.
    /// `resolve` supplies the value of a referenced position and is provided
    /// by the owning sheet, since a single cell cannot resolve its own
    /// dependencies.
    pub fn value(&mut self, resolve: &mut dyn FnMut(Position) -> CellValue) -> CellValue {
        match &mut self.content {
            Content::Text(raw) => render_text(raw),
            Content::Formula { ast, cached } => {
                if let Some(v) = cached {
                    return v.clone();
                }
                let v = ast.evaluate(resolve);
                *cached = Some(v.clone());
                v
            }
        }
    }

    /// The raw text a user would need to re-enter to reproduce this cell:
    /// the literal text as stored, or `=` followed by the canonical
    /// re-print of the formula.
    pub fn text(&self) -> String {
        match &self.content {
            Content::Text(raw) => raw.clone(),
            Content::Formula { ast, .. } => format!("={}", ast.canonical_print()),
        }
    }

    /// Positions this cell's formula reads from, in source order with
    /// duplicates preserved only once (first occurrence wins).
    pub fn referenced(&self) -> &[Position] {
        &self.outgoing
    }

    pub fn clear_cache(&mut self) {
        if let Content::Formula { cached, .. } = &mut self.content {
            *cached = None;
        }
    }

    pub(crate) fn adopt_content_from(&mut self, other: Cell) {
        self.content = other.content;
        self.outgoing = other.outgoing;
    }
}

fn render_text(raw: &str) -> CellValue {
    match raw.strip_prefix('\'') {
        Some(stripped) => CellValue::Text(stripped.to_string()),
        None => CellValue::Text(raw.to_string()),
    }
}

fn dedup_preserve_order(positions: Vec<Position>) -> Vec<Position> {
    let mut seen = HashSet::new();
    positions.into_iter().filter(|p| seen.insert(*p)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_text_round_trips() {
        let mut cell = Cell::empty();
        cell.set("hello").unwrap();
        assert_eq!(cell.text(), "hello");
        assert_eq!(cell.value(&mut |_| CellValue::Number(0.0)), CellValue::Text("hello".into()));
    }

    #[test]
    fn bare_equals_is_literal_text_not_a_formula() {
        let mut cell = Cell::empty();
        cell.set("=").unwrap();
        assert_eq!(cell.text(), "=");
    }

    #[test]
    fn escaped_leading_equals_is_literal() {
        let mut cell = Cell::empty();
        cell.set("'=5+5").unwrap();
        assert_eq!(
            cell.value(&mut |_| CellValue::Number(0.0)),
            CellValue::Text("=5+5".into())
        );
    }

    #[test]
    fn formula_caches_its_result() {
        let mut cell = Cell::empty();
        cell.set("=1+1").unwrap();
        let mut calls = 0;
        let mut resolve = |_: Position| {
            calls += 1;
            CellValue::Number(0.0)
        };
        assert_eq!(cell.value(&mut resolve), CellValue::Number(2.0));
        assert_eq!(cell.value(&mut resolve), CellValue::Number(2.0));
        cell.clear_cache();
        let _ = cell.value(&mut resolve);
        assert_eq!(calls, 0, "this formula never reads another cell");
    }

    #[test]
    fn failed_set_leaves_cell_unchanged() {
        let mut cell = Cell::empty();
        cell.set("old").unwrap();
        assert!(cell.set("=1+").is_err());
        assert_eq!(cell.text(), "old");
    }

    #[test]
    fn referenced_dedupes_keeping_first_occurrence_order() {
        let mut cell = Cell::empty();
        cell.set("=A1+B2+A1").unwrap();
        assert_eq!(cell.referenced(), &[Position::new(0, 0), Position::new(1, 1)]);
    }
}
