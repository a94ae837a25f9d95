//! Error type raised while tokenizing or parsing a formula.

use thiserror::Error;

/// A formula failed to parse. Carries the byte offset where parsing gave up,
/// when one is known, for a more useful message.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("formula parse error at position {position:?}: {message}")]
pub struct ParseError {
    pub message: String,
    pub position: Option<usize>,
}

impl ParseError {
    pub(crate) fn new(message: impl Into<String>, position: Option<usize>) -> ParseError {
        ParseError {
            message: message.into(),
            position,
        }
    }
}
