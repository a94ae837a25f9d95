//! Recursive-descent parser and AST for the arithmetic formula language.
//!
//! Grammar:
//! ```text
//! expr   := term (('+' | '-') term)*
//! term   := factor (('*' | '/') factor)*
//! factor := ('+' | '-') factor | primary
//! primary := NUMBER | REF | '(' expr ')'
//! ```

use std::fmt::Debug;

use crate::error::ParseError;
use crate::position::Position;
use crate::tokenizer::{Token, Tokenizer};
use crate::value::{CellValue, FormulaErrorKind};

/// A parsed, evaluable formula. Implementors must never panic: arithmetic,
/// reference, and division problems are folded into `CellValue::Error`.
pub trait FormulaAst: Debug {
    fn evaluate(&self, resolve: &mut dyn FnMut(Position) -> CellValue) -> CellValue;
    fn canonical_print(&self) -> String;
    fn referenced_cells(&self) -> Vec<Position>;
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinOp {
    fn symbol(&self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
        }
    }

    /// Lower binds looser; used to decide when a child needs parens.
    fn precedence(&self) -> u8 {
        match self {
            BinOp::Add | BinOp::Sub => 1,
            BinOp::Mul | BinOp::Div => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Number(f64),
    Ref(Position),
    Neg(Box<Expr>),
    BinOp(BinOp, Box<Expr>, Box<Expr>),
}

impl Expr {
    fn precedence(&self) -> u8 {
        match self {
            Expr::Number(_) | Expr::Ref(_) => 3,
            Expr::Neg(_) => 3,
            Expr::BinOp(op, ..) => op.precedence(),
        }
    }

    fn print(&self, out: &mut String) {
        match self {
            Expr::Number(n) => out.push_str(&format_number_literal(*n)),
            Expr::Ref(pos) => out.push_str(&pos.to_string()),
            Expr::Neg(inner) => {
                out.push('-');
                Self::print_operand(inner, 3, out);
            }
            Expr::BinOp(op, lhs, rhs) => {
                Self::print_operand(lhs, op.precedence(), out);
                out.push_str(op.symbol());
                // The right operand of `-`/`/` needs parens even at equal
                // precedence, since those operators are left-associative.
                let rhs_min = match op {
                    BinOp::Sub | BinOp::Div => op.precedence() + 1,
                    BinOp::Add | BinOp::Mul => op.precedence(),
                };
                Self::print_operand(rhs, rhs_min, out);
            }
        }
    }

    fn print_operand(expr: &Expr, min_precedence: u8, out: &mut String) {
        if expr.precedence() < min_precedence {
            out.push('(');
            expr.print(out);
            out.push(')');
        } else {
            expr.print(out);
        }
    }

    fn collect_refs(&self, out: &mut Vec<Position>) {
        match self {
            Expr::Number(_) => {}
            Expr::Ref(pos) => out.push(*pos),
            Expr::Neg(inner) => inner.collect_refs(out),
            Expr::BinOp(_, lhs, rhs) => {
                lhs.collect_refs(out);
                rhs.collect_refs(out);
            }
        }
    }

    fn eval(&self, resolve: &mut dyn FnMut(Position) -> CellValue) -> CellValue {
        match self {
            Expr::Number(n) => CellValue::Number(*n),
            Expr::Ref(pos) => {
                if !pos.is_valid() {
                    CellValue::Error(FormulaErrorKind::Ref)
                } else {
                    resolve(*pos)
                }
            }
            Expr::Neg(inner) => match inner.eval(resolve).coerce_number() {
                Ok(n) => CellValue::Number(-n),
                Err(kind) => CellValue::Error(kind),
            },
            Expr::BinOp(op, lhs, rhs) => {
                let left = lhs.eval(resolve);
                if left.is_error() {
                    return left;
                }
                let left_n = match left.coerce_number() {
                    Ok(n) => n,
                    Err(kind) => return CellValue::Error(kind),
                };
                let right = rhs.eval(resolve);
                if right.is_error() {
                    return right;
                }
                let right_n = match right.coerce_number() {
                    Ok(n) => n,
                    Err(kind) => return CellValue::Error(kind),
                };
                match op {
                    BinOp::Add => CellValue::Number(left_n + right_n),
                    BinOp::Sub => CellValue::Number(left_n - right_n),
                    BinOp::Mul => CellValue::Number(left_n * right_n),
                    BinOp::Div => {
                        if right_n == 0.0 {
                            CellValue::Error(FormulaErrorKind::Div0)
                        } else {
                            CellValue::Number(left_n / right_n)
                        }
                    }
                }
            }
        }
    }
}

/// Render a number literal the way the tokenizer would accept it back:
/// Rust's default `f64` `Display` already round-trips through `parse`.
fn format_number_literal(n: f64) -> String {
    n.to_string()
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ParsedFormula {
    root: Expr,
}

impl FormulaAst for ParsedFormula {
    fn evaluate(&self, resolve: &mut dyn FnMut(Position) -> CellValue) -> CellValue {
        self.root.eval(resolve)
    }

    fn canonical_print(&self) -> String {
        let mut out = String::new();
        self.root.print(&mut out);
        out
    }

    fn referenced_cells(&self) -> Vec<Position> {
        let mut out = Vec::new();
        self.root.collect_refs(&mut out);
        out
    }
}

struct Parser<'a> {
    tokenizer: Tokenizer<'a>,
    current: Token,
    current_pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Result<Parser<'a>, ParseError> {
        let mut tokenizer = Tokenizer::new(src);
        let (current, current_pos) = tokenizer.next_token()?;
        Ok(Parser {
            tokenizer,
            current,
            current_pos,
        })
    }

    fn advance(&mut self) -> Result<(), ParseError> {
        let (tok, pos) = self.tokenizer.next_token()?;
        self.current = tok;
        self.current_pos = pos;
        Ok(())
    }

    fn expect(&mut self, expected: &Token) -> Result<(), ParseError> {
        if &self.current == expected {
            self.advance()
        } else {
            Err(ParseError::new(
                format!("expected {:?}, found {:?}", expected, self.current),
                Some(self.current_pos),
            ))
        }
    }

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_term()?;
        loop {
            let op = match self.current {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance()?;
            let rhs = self.parse_term()?;
            lhs = Expr::BinOp(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_term(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_factor()?;
        loop {
            let op = match self.current {
                Token::Star => BinOp::Mul,
                Token::Slash => BinOp::Div,
                _ => break,
            };
            self.advance()?;
            let rhs = self.parse_factor()?;
            lhs = Expr::BinOp(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_factor(&mut self) -> Result<Expr, ParseError> {
        match self.current {
            Token::Minus => {
                self.advance()?;
                Ok(Expr::Neg(Box::new(self.parse_factor()?)))
            }
            Token::Plus => {
                self.advance()?;
                self.parse_factor()
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        match self.current.clone() {
            Token::Number(n) => {
                self.advance()?;
                Ok(Expr::Number(n))
            }
            Token::Ref(pos) => {
                self.advance()?;
                Ok(Expr::Ref(pos))
            }
            Token::LParen => {
                self.advance()?;
                let inner = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            other => Err(ParseError::new(
                format!("unexpected token {other:?}"),
                Some(self.current_pos),
            )),
        }
    }

    fn parse_formula(mut self) -> Result<ParsedFormula, ParseError> {
        let root = self.parse_expr()?;
        if self.current != Token::Eof {
            return Err(ParseError::new(
                format!("unexpected trailing token {:?}", self.current),
                Some(self.current_pos),
            ));
        }
        Ok(ParsedFormula { root })
    }
}

/// Parse a formula expression (the text after the leading `=`) into an AST.
pub fn parse(expr: &str) -> Result<Box<dyn FormulaAst>, ParseError> {
    let formula = Parser::new(expr)?.parse_formula()?;
    Ok(Box::new(formula))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::CellValue;
    use std::collections::HashMap;

    fn eval(expr: &str, cells: &[(Position, CellValue)]) -> CellValue {
        let map: HashMap<Position, CellValue> = cells.iter().cloned().collect();
        let ast = parse(expr).unwrap();
        ast.evaluate(&mut |p| map.get(&p).cloned().unwrap_or(CellValue::Number(0.0)))
    }

    #[test]
    fn evaluates_precedence_correctly() {
        assert_eq!(eval("1+2*3", &[]), CellValue::Number(7.0));
        assert_eq!(eval("(1+2)*3", &[]), CellValue::Number(9.0));
    }

    #[test]
    fn unary_minus_and_nested_parens() {
        assert_eq!(eval("-(1+2)", &[]), CellValue::Number(-3.0));
        assert_eq!(eval("-1+2", &[]), CellValue::Number(1.0));
    }

    #[test]
    fn division_by_zero_is_div0() {
        assert_eq!(
            eval("1/0", &[]),
            CellValue::Error(FormulaErrorKind::Div0)
        );
    }

    #[test]
    fn out_of_range_ref_is_ref_error() {
        assert_eq!(
            eval("A99999999", &[]),
            CellValue::Error(FormulaErrorKind::Ref)
        );
    }

    #[test]
    fn leftmost_error_wins_in_chained_ops() {
        let cells = [
            (Position::new(0, 0), CellValue::Error(FormulaErrorKind::Div0)),
            (Position::new(1, 0), CellValue::Error(FormulaErrorKind::Value)),
        ];
        // A1 (Div0) before B1 (Value): the left operand's error wins.
        assert_eq!(
            eval("A1+B1", &cells),
            CellValue::Error(FormulaErrorKind::Div0)
        );
    }

    #[test]
    fn canonical_print_minimizes_parens() {
        let ast = parse("(1+2)*3").unwrap();
        assert_eq!(ast.canonical_print(), "(1+2)*3");

        let ast = parse("1+2*3").unwrap();
        assert_eq!(ast.canonical_print(), "1+2*3");

        let ast = parse("1-(2-3)").unwrap();
        assert_eq!(ast.canonical_print(), "1-(2-3)");

        let ast = parse("(1-2)-3").unwrap();
        assert_eq!(ast.canonical_print(), "1-2-3");
    }

    #[test]
    fn referenced_cells_preserve_source_order_with_duplicates() {
        let ast = parse("A1+B2+A1").unwrap();
        assert_eq!(
            ast.referenced_cells(),
            vec![Position::new(0, 0), Position::new(1, 1), Position::new(0, 0)]
        );
    }

    #[test]
    fn rejects_trailing_garbage() {
        assert!(parse("1+2)").is_err());
        assert!(parse("1 2").is_err());
    }

    #[test]
    fn rejects_unbalanced_parens() {
        assert!(parse("(1+2").is_err());
    }
}
