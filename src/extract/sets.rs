// src/extract/sets.rs
//
// Strength workouts carry a sets table: one `tr[data-set-number]` per set with
// cells [#, exercise, time, rest, reps, weight, volume]. Non-strength pages
// simply have no such table.

use scraper::{ElementRef, Html};

use super::{element_text, selector};
use crate::core::sanitize::is_missing_marker;
use crate::core::units::{parse_duration, parse_number};
use crate::error::Result;
use crate::record::{Value, WorkoutSet};
use crate::specs::SetsSpec;

const BODYWEIGHT: &str = "Bodyweight";

/// All well-formed set rows on the page, in page order.
pub fn read_sets(doc: &Html, spec: &SetsSpec) -> Result<Vec<WorkoutSet>> {
    let Some(container) = find_container(doc, spec)? else {
        return Ok(Vec::new());
    };

    let row_sel = selector(&spec.row)?;
    let cell_sel = selector("td")?;

    let mut out = Vec::new();
    for row in container.select(&row_sel) {
        let number = row.value().attr(&spec.number_attr).unwrap_or_default();
        let cells: Vec<ElementRef> = row.select(&cell_sel).collect();
        if cells.len() < spec.min_cells {
            logd!("skipping set row {:?}: {} cells", number, cells.len());
            continue;
        }
        out.push(read_row(number, &cells, spec));
    }
    Ok(out)
}

fn find_container<'a>(doc: &'a Html, spec: &SetsSpec) -> Result<Option<ElementRef<'a>>> {
    if let Some(el) = doc.select(&selector(&spec.container)?).next() {
        return Ok(Some(el));
    }
    if spec.fallback_keywords.is_empty() {
        return Ok(None);
    }

    // Layout changed: take the first table whose headers look like a sets table.
    let header_sel = selector("th, td[data-title]")?;
    for table in doc.select(&selector("table")?) {
        let headers = table
            .select(&header_sel)
            .map(|h| {
                let title = h.value().attr("data-title").unwrap_or_default();
                format!("{} {}", element_text(&h), title).to_lowercase()
            })
            .collect::<Vec<_>>()
            .join(" ");
        if spec.fallback_keywords.iter().any(|k| headers.contains(&k.to_lowercase())) {
            logd!("sets container {:?} missing, using keyword-matched table", spec.container);
            return Ok(Some(table));
        }
    }
    Ok(None)
}

fn read_row(number: &str, cells: &[ElementRef<'_>], spec: &SetsSpec) -> WorkoutSet {
    let cols = &spec.columns;
    let text = |i: usize| cells.get(i).map(element_text).unwrap_or_default();

    let time = text(cols.time);
    let rest = text(cols.rest);
    let reps = text(cols.reps);
    let weight = cells.get(cols.weight).map(weight_text).unwrap_or_default();
    let volume = text(cols.volume);

    WorkoutSet {
        set: match number.trim().parse::<f64>() {
            Ok(n) => Value::Number(n),
            Err(_) if number.trim().is_empty() => Value::Empty,
            Err(_) => Value::Text(s!(number.trim())),
        },
        exercise: text(cols.exercise),
        reps: reps_value(&reps),
        weight_value: if weight == BODYWEIGHT { Value::Empty } else { number_value(&weight) },
        volume_value: number_value(&volume),
        time_sec: duration_value(&time),
        rest_sec: duration_value(&rest),
        time,
        rest,
        weight,
        volume,
    }
}

/// Bodyweight sets render the weight cell as a link instead of a number.
fn weight_text(cell: &ElementRef<'_>) -> String {
    let text = element_text(cell);
    let has_link = selector("a").map(|a| cell.select(&a).next().is_some()).unwrap_or(false);
    if has_link && text.contains(BODYWEIGHT) {
        return s!(BODYWEIGHT);
    }
    text
}

/// Whole rep counts become numbers; anything else ("8-10", "AMRAP") stays text.
fn reps_value(raw: &str) -> Value {
    let raw = raw.trim();
    if is_missing_marker(raw) {
        return Value::Empty;
    }
    match raw.parse::<u32>() {
        Ok(n) => Value::Number(f64::from(n)),
        Err(_) => Value::Text(s!(raw)),
    }
}

fn number_value(raw: &str) -> Value {
    parse_number(raw).map_or(Value::Empty, Value::Number)
}

fn duration_value(raw: &str) -> Value {
    parse_duration(raw).map_or(Value::Empty, Value::Duration)
}
