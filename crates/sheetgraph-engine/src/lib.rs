//! sheetgraph-engine - the cell graph: sparse storage, dependency edges,
//! cycle rejection, and cache invalidation.
//!
//! Formula syntax itself is owned entirely by `sheetgraph-formula`; this
//! crate only ever calls through the [`sheetgraph_formula::FormulaAst`]
//! trait, never inspecting formula text directly.

mod cell;
mod cycle;
mod error;
mod sheet;

pub use cell::Cell;
pub use error::{Result, SheetError};
pub use sheet::{Sheet, Size};

pub use sheetgraph_formula::{CellValue, FormulaErrorKind, ParseError, Position, MAX_COLS, MAX_ROWS};
