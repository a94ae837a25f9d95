//! The value type flowing through formula evaluation and cell caches.

use std::fmt;

/// A value-level formula error, distinct from [`crate::ParseError`] which is
/// a Rust `Result::Err` raised before evaluation ever starts.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum FormulaErrorKind {
    /// A formula referenced a position outside the addressable sheet.
    Ref,
    /// An operand could not be coerced to a number.
    Value,
    /// Division where the divisor evaluated to exactly zero.
    Div0,
}

impl fmt::Display for FormulaErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FormulaErrorKind::Ref => "#REF!",
            FormulaErrorKind::Value => "#VALUE!",
            FormulaErrorKind::Div0 => "#DIV/0!",
        };
        write!(f, "{s}")
    }
}

/// The value held or produced by a cell: literal text, a number, or an error.
#[derive(Clone, Debug, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Error(FormulaErrorKind),
}

impl CellValue {
    /// Coerce to a number the way formula arithmetic does: numbers pass
    /// through, text is parsed (empty text is zero), errors propagate.
    pub fn coerce_number(&self) -> Result<f64, FormulaErrorKind> {
        match self {
            CellValue::Number(n) => Ok(*n),
            CellValue::Text(s) => parse_numeric_text(s).ok_or(FormulaErrorKind::Value),
            CellValue::Error(kind) => Err(*kind),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, CellValue::Error(_))
    }

    /// Render the way `print_values` does: numbers via default `Display`,
    /// errors as their `#...!` spelling, text unchanged.
    pub fn render(&self) -> String {
        match self {
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => n.to_string(),
            CellValue::Error(kind) => kind.to_string(),
        }
    }
}

/// Parse text the way a formula operand does: strip a leading escape quote,
/// treat the empty remainder as zero, otherwise require the whole string to
/// be a finite decimal (no `inf`/`nan` spellings).
pub fn parse_numeric_text(raw: &str) -> Option<f64> {
    let stripped = raw.strip_prefix('\'').unwrap_or(raw);
    if stripped.is_empty() {
        return Some(0.0);
    }
    let n: f64 = stripped.parse().ok()?;
    n.is_finite().then_some(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_coerces_to_zero() {
        assert_eq!(parse_numeric_text(""), Some(0.0));
        assert_eq!(parse_numeric_text("'"), Some(0.0));
    }

    #[test]
    fn numeric_text_parses() {
        assert_eq!(parse_numeric_text("3.14"), Some(3.14));
        assert_eq!(parse_numeric_text("'42"), Some(42.0));
        assert_eq!(parse_numeric_text("-5"), Some(-5.0));
    }

    #[test]
    fn non_numeric_and_nonfinite_text_rejected() {
        assert_eq!(parse_numeric_text("abc"), None);
        assert_eq!(parse_numeric_text("inf"), None);
        assert_eq!(parse_numeric_text("NaN"), None);
    }

    #[test]
    fn error_renders_as_excel_style_string() {
        assert_eq!(CellValue::Error(FormulaErrorKind::Div0).render(), "#DIV/0!");
        assert_eq!(CellValue::Error(FormulaErrorKind::Ref).render(), "#REF!");
        assert_eq!(CellValue::Error(FormulaErrorKind::Value).render(), "#VALUE!");
    }
}
