// tests/common/mod.rs
//
// Reads back the tables the exporter writes.

use std::fs;
use std::mem::take;
use std::path::Path;

/// Rows of a CSV/TSV file; quoted cells may hold the separator, `""` and line breaks.
pub fn read_table(path: &Path, sep: char) -> Vec<Vec<String>> {
    let text = fs::read_to_string(path).unwrap();
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                chars.next();
                field.push('"');
            }
            '"' => in_quotes = !in_quotes,
            c if c == sep && !in_quotes => row.push(take(&mut field)),
            '\n' if !in_quotes => {
                row.push(take(&mut field));
                rows.push(take(&mut row));
            }
            _ => field.push(ch),
        }
    }
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }
    rows
}
