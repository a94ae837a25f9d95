//! The sheet: sparse cell storage, the dependency graph, and the
//! printable-region bookkeeping layered on top of it.

use std::collections::{HashMap, HashSet};
use std::io::{self, Write};

use sheetgraph_formula::{CellValue, FormulaErrorKind, Position};

use crate::cell::Cell;
use crate::cycle;
use crate::error::{Result, SheetError};

/// The smallest rectangle, anchored at (0, 0), that contains every cell
/// ever written. Shrinks as trailing rows/columns empty out.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Size {
    pub rows: usize,
    pub cols: usize,
}

#[derive(Debug, Default)]
pub struct Sheet {
    cells: HashMap<Position, Cell>,
    printable: Size,
}

impl Sheet {
    pub fn new() -> Sheet {
        Sheet::default()
    }

    pub fn printable_size(&self) -> Size {
        self.printable
    }

    pub(crate) fn raw_cell(&self, pos: Position) -> Option<&Cell> {
        self.cells.get(&pos)
    }

    pub fn get_cell(&self, pos: Position) -> Result<Option<&Cell>> {
        if !pos.is_valid() {
            return Err(SheetError::InvalidPosition);
        }
        Ok(self.cells.get(&pos))
    }

    pub fn get_cell_mut(&mut self, pos: Position) -> Result<Option<&mut Cell>> {
        if !pos.is_valid() {
            return Err(SheetError::InvalidPosition);
        }
        Ok(self.cells.get_mut(&pos))
    }

    /// Parse and store `text` at `pos`, validating, re-wiring the
    /// dependency graph, and invalidating stale caches. The whole operation
    /// is transactional: a parse failure or cycle leaves the sheet exactly
    /// as it was.
    pub fn set_cell(&mut self, pos: Position, text: &str) -> Result<()> {
        if !pos.is_valid() {
            return Err(SheetError::InvalidPosition);
        }

        let mut scratch = Cell::empty();
        scratch.set(text)?;
        let new_outgoing = scratch.referenced().to_vec();

        if cycle::creates_cycle(self, &new_outgoing, pos) {
            return Err(SheetError::CircularDependency);
        }

        let old_outgoing: Vec<Position> = self
            .cells
            .get(&pos)
            .map(|cell| cell.referenced().to_vec())
            .unwrap_or_default();

        if !self.cells.contains_key(&pos) {
            self.enlarge(pos);
            self.cells.insert(pos, Cell::empty());
        }
        self.cells.get_mut(&pos).expect("just inserted").adopt_content_from(scratch);

        let still_referenced: HashSet<Position> = new_outgoing.iter().copied().collect();
        for stale in old_outgoing.iter().filter(|p| !still_referenced.contains(p)) {
            if let Some(cell) = self.cells.get_mut(stale) {
                cell.incoming.remove(&pos);
            }
        }

        for &target in &new_outgoing {
            if !self.cells.contains_key(&target) {
                let mut placeholder = Cell::empty();
                placeholder.set("0").expect("literal \"0\" always parses as text");
                self.cells.insert(target, placeholder);
            }
            self.cells.get_mut(&target).expect("just ensured present").incoming.insert(pos);
        }

        self.invalidate_from(pos);
        Ok(())
    }

    /// Remove a cell. Does not cascade cache invalidation to dependents:
    /// they keep their stale cached value until their own cache is next
    /// invalidated by an unrelated edit. Other cells that still reference
    /// `pos` simply see it as an empty cell (evaluates to zero) going
    /// forward.
    pub fn clear_cell(&mut self, pos: Position) -> Result<()> {
        if !pos.is_valid() {
            return Err(SheetError::InvalidPosition);
        }
        if self.cells.remove(&pos).is_some() {
            self.shrink(pos);
        }
        Ok(())
    }

    /// Evaluate the cell at `pos`, recursively resolving and caching any
    /// cells it depends on. An absent cell evaluates to `Number(0.0)`.
    pub fn value(&mut self, pos: Position) -> Result<CellValue> {
        if !pos.is_valid() {
            return Err(SheetError::InvalidPosition);
        }
        Ok(self.value_unchecked(pos))
    }

    fn value_unchecked(&mut self, pos: Position) -> CellValue {
        let Some(mut cell) = self.cells.remove(&pos) else {
            return CellValue::Number(0.0);
        };
        let result = cell.value(&mut |p| {
            if p.is_valid() {
                self.value_unchecked(p)
            } else {
                CellValue::Error(FormulaErrorKind::Ref)
            }
        });
        self.cells.insert(pos, cell);
        result
    }

    pub fn print_values<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        let Size { rows, cols } = self.printable;
        let buffer = build_grid_buffer(rows, cols, |row, col| {
            let pos = Position::new(row, col);
            if self.cells.contains_key(&pos) {
                self.value_unchecked(pos).render()
            } else {
                String::new()
            }
        });
        if buffer.is_empty() {
            return Ok(());
        }
        write!(out, "{buffer}")
    }

    pub fn print_texts<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let Size { rows, cols } = self.printable;
        let buffer = build_grid_buffer(rows, cols, |row, col| {
            let pos = Position::new(row, col);
            self.cells.get(&pos).map(Cell::text).unwrap_or_default()
        });
        if buffer.is_empty() {
            return Ok(());
        }
        write!(out, "{buffer}")
    }

    fn enlarge(&mut self, pos: Position) {
        self.printable.rows = self.printable.rows.max(pos.row + 1);
        self.printable.cols = self.printable.cols.max(pos.col + 1);
    }

    /// After removing `pos`, shrink the printable rectangle one row/column
    /// at a time for as long as the newly-exposed trailing row or column
    /// is empty.
    fn shrink(&mut self, pos: Position) {
        if self.printable.cols > 0 && pos.col == self.printable.cols - 1 {
            let col_empty = (0..self.printable.rows).all(|row| !self.cells.contains_key(&Position::new(row, pos.col)));
            if col_empty {
                self.printable.cols -= 1;
                if pos.col > 0 {
                    self.shrink(Position::new(pos.row, pos.col - 1));
                }
            }
        }
        if self.printable.rows > 0 && pos.row == self.printable.rows - 1 {
            let row_empty = (0..self.printable.cols).all(|col| !self.cells.contains_key(&Position::new(pos.row, col)));
            if row_empty {
                self.printable.rows -= 1;
                if pos.row > 0 {
                    self.shrink(Position::new(pos.row - 1, pos.col));
                }
            }
        }
    }

    /// Clear the cached value of every cell that (transitively) depends on
    /// `pos`, walking the `incoming` edges recorded by [`Sheet::set_cell`].
    fn invalidate_from(&mut self, pos: Position) {
        let mut stack: Vec<Position> = self
            .cells
            .get(&pos)
            .map(|cell| cell.incoming.iter().copied().collect())
            .unwrap_or_default();
        let mut visited = HashSet::new();
        while let Some(p) = stack.pop() {
            if !visited.insert(p) {
                continue;
            }
            if let Some(cell) = self.cells.get_mut(&p) {
                cell.clear_cache();
                stack.extend(cell.incoming.iter().copied());
            }
        }
    }
}

/// Every cell, even the last one in a row, is followed by a tab, and every
/// row by a newline; only the very last row ends up without its trailing
/// tab, since the buffer's last two characters (that row's closing `\t\n`)
/// are cut and a single final `\n` reattached.
fn build_grid_buffer(rows: usize, cols: usize, mut cell_str: impl FnMut(usize, usize) -> String) -> String {
    if rows == 0 || cols == 0 {
        return String::new();
    }
    let mut result = String::new();
    for row in 0..rows {
        for col in 0..cols {
            result.push_str(&cell_str(row, col));
            result.push('\t');
        }
        result.push('\n');
    }
    result.truncate(result.len() - 2);
    result.push('\n');
    result
}
