//! Error type returned by [`crate::Sheet`] operations.

use sheetgraph_formula::ParseError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SheetError {
    #[error("position is out of the addressable sheet range")]
    InvalidPosition,
    #[error("setting this cell would create a circular dependency")]
    CircularDependency,
    #[error(transparent)]
    Parse(#[from] ParseError),
}

pub type Result<T> = std::result::Result<T, SheetError>;
