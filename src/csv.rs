// src/csv.rs
use std::io::{self, Write};

use crate::record::ActivityRecord;

/* ---------------- Writing ---------------- */

fn needs_quotes(field: &str, sep: char) -> bool {
    field.contains(sep) || field.contains('"') || field.contains('\n') || field.contains('\r')
}

/// Write a single CSV/TSV row to any writer.
pub fn write_row<W: Write>(mut w: W, row: &[String], sep: char) -> io::Result<()> {
    let mut first = true;
    for cell in row {
        if !first { write!(w, "{}", sep)?; } else { first = false; }
        if needs_quotes(cell, sep) {
            let escaped = cell.replace('"', "\"\"");
            write!(w, "\"{}\"", escaped)?;
        } else {
            write!(w, "{}", cell)?;
        }
    }
    writeln!(w)
}

/* ---------------- Record tables ---------------- */

/// Union of the records' columns in first-seen order.
pub fn union_columns<'a, I>(records: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a ActivityRecord>,
{
    let mut cols: Vec<String> = Vec::new();
    for rec in records {
        for name in rec.columns() {
            if !cols.iter().any(|c| c == name) {
                cols.push(s!(name));
            }
        }
    }
    cols
}

/// One row laid out on `columns`; columns the record lacks are empty cells.
pub fn record_row(rec: &ActivityRecord, columns: &[String]) -> Vec<String> {
    columns
        .iter()
        .map(|c| rec.get(c).map(|v| v.to_cell()).unwrap_or_default())
        .collect()
}
