//! sheetgraph - a line-oriented driver over an in-memory `Sheet`.
//!
//! Reads commands from stdin, or from a script file given as the one
//! positional argument, one per line:
//!
//!   SET <pos> <text...>
//!   GET <pos>
//!   CLEAR <pos>
//!   PRINT VALUES
//!   PRINT TEXTS

use std::env;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use sheetgraph_engine::{CellValue, Position, Sheet, SheetError};

fn main() -> Result<()> {
    let mut args = env::args().skip(1);
    let script_path: Option<PathBuf> = args.next().map(PathBuf::from);

    let mut sheet = Sheet::new();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let mut had_error = false;

    match script_path {
        Some(path) => {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("failed to read script {}", path.display()))?;
            for line in contents.lines() {
                run_line(&mut sheet, line, &mut out, &mut had_error);
            }
        }
        None => {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let line = line.context("failed to read a line from stdin")?;
                run_line(&mut sheet, &line, &mut out, &mut had_error);
            }
        }
    }

    if had_error {
        std::process::exit(1);
    }
    Ok(())
}

fn run_line(sheet: &mut Sheet, line: &str, out: &mut impl Write, had_error: &mut bool) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }
    if let Err(e) = run_command(sheet, line, out) {
        eprintln!("error: {e}");
        *had_error = true;
    }
}

fn run_command(sheet: &mut Sheet, line: &str, out: &mut impl Write) -> Result<()> {
    let mut parts = line.splitn(2, char::is_whitespace);
    let command = parts.next().unwrap_or_default().to_ascii_uppercase();
    let rest = parts.next().unwrap_or_default().trim();

    match command.as_str() {
        "SET" => cmd_set(sheet, rest),
        "GET" => cmd_get(sheet, rest, out),
        "CLEAR" => cmd_clear(sheet, rest),
        "PRINT" => cmd_print(sheet, rest, out),
        other => anyhow::bail!("unknown command {other:?}"),
    }
}

fn parse_position(label: &str) -> Result<Position> {
    Position::parse(label).ok_or_else(|| anyhow::anyhow!("{label:?} is not a valid cell position"))
}

fn cmd_set(sheet: &mut Sheet, rest: &str) -> Result<()> {
    let mut parts = rest.splitn(2, char::is_whitespace);
    let pos = parse_position(parts.next().unwrap_or_default())?;
    let text = parts.next().unwrap_or_default();
    sheet.set_cell(pos, text).map_err(annotate)?;
    Ok(())
}

fn cmd_get(sheet: &mut Sheet, rest: &str, out: &mut impl Write) -> Result<()> {
    let pos = parse_position(rest.trim())?;
    let value = sheet.value(pos).map_err(annotate)?;
    writeln!(out, "{}", render(&value)).context("failed to write GET result")?;
    Ok(())
}

fn cmd_clear(sheet: &mut Sheet, rest: &str) -> Result<()> {
    let pos = parse_position(rest.trim())?;
    sheet.clear_cell(pos).map_err(annotate)?;
    Ok(())
}

fn cmd_print(sheet: &mut Sheet, rest: &str, out: &mut impl Write) -> Result<()> {
    match rest.trim().to_ascii_uppercase().as_str() {
        "VALUES" => sheet.print_values(out).context("failed to write PRINT VALUES"),
        "TEXTS" => sheet.print_texts(out).context("failed to write PRINT TEXTS"),
        other => anyhow::bail!("PRINT {other:?} is neither VALUES nor TEXTS"),
    }
}

fn render(value: &CellValue) -> String {
    match value {
        CellValue::Text(s) => s.clone(),
        CellValue::Number(n) => n.to_string(),
        CellValue::Error(kind) => kind.to_string(),
    }
}

fn annotate(err: SheetError) -> anyhow::Error {
    match err {
        SheetError::InvalidPosition => anyhow::anyhow!("invalid position: {err}"),
        SheetError::CircularDependency => anyhow::anyhow!("circular dependency: {err}"),
        SheetError::Parse(parse_err) => anyhow::anyhow!("parse error: {parse_err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(sheet: &mut Sheet, line: &str) -> Result<String> {
        let mut out = Vec::new();
        run_command(sheet, line, &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn set_then_get_round_trips_a_formula() {
        let mut sheet = Sheet::new();
        run(&mut sheet, "SET A1 =1+2").unwrap();
        assert_eq!(run(&mut sheet, "GET A1").unwrap(), "3\n");
    }

    #[test]
    fn clear_resets_a_cell_to_empty() {
        let mut sheet = Sheet::new();
        run(&mut sheet, "SET A1 5").unwrap();
        run(&mut sheet, "CLEAR A1").unwrap();
        assert_eq!(run(&mut sheet, "GET A1").unwrap(), "0\n");
    }

    #[test]
    fn set_with_a_cycle_reports_an_error() {
        let mut sheet = Sheet::new();
        assert!(run(&mut sheet, "SET A1 =A1").is_err());
    }

    #[test]
    fn get_with_an_invalid_position_reports_an_error() {
        let mut sheet = Sheet::new();
        assert!(run(&mut sheet, "GET ZZZZZZZZZZ1").is_err());
    }

    #[test]
    fn print_values_and_print_texts_are_case_insensitive() {
        let mut sheet = Sheet::new();
        run(&mut sheet, "SET A1 hi").unwrap();
        assert_eq!(run(&mut sheet, "print values").unwrap(), "hi\n");
        assert_eq!(run(&mut sheet, "print texts").unwrap(), "hi\n");
    }

    #[test]
    fn command_names_are_case_insensitive() {
        let mut sheet = Sheet::new();
        run(&mut sheet, "set A1 5").unwrap();
        assert_eq!(run(&mut sheet, "get A1").unwrap(), "5\n");
    }
}
