// src/core/units.rs
//
// Turning display strings ("5,2 km", "1:04,8", "5:30 /km") into plain numbers.
// The site localizes separators, so both decimal '.' and decimal ',' occur.

use std::sync::OnceLock;

use regex::Regex;

use super::sanitize::{is_missing_marker, normalize_ws};
use crate::record::Value;
use crate::specs::ValueKind;

fn number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"-?\d[\d.,]*").expect("static regex"))
}

fn clock_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d[\d:.,]*").expect("static regex"))
}

fn hms_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(\d+(?:[.,]\d+)?)\s*(hours?|hrs?|h|minutes?|mins?|m|seconds?|secs?|s)\b")
            .expect("static regex")
    })
}

/// First number in `raw`, units and grouping stripped. `None` for placeholders.
pub fn parse_number(raw: &str) -> Option<f64> {
    if is_missing_marker(raw) { return None; }
    let token = number_re().find(raw)?.as_str();
    let token = token.trim_end_matches(['.', ',']);
    canonical_decimal(token).parse::<f64>().ok()
}

/// Resolve grouping vs decimal separators into a Rust-parsable literal.
fn canonical_decimal(token: &str) -> String {
    let commas = token.matches(',').count();
    let dots = token.matches('.').count();

    match (commas, dots) {
        (0, 0) => token.to_string(),
        (_, 0) => {
            if commas > 1 {
                return token.replace(',', "");
            }
            let (before, after) = token.split_once(',').unwrap_or((token, ""));
            let int_part = before.trim_start_matches('-');
            // "1,234" groups thousands; "0,125" and "5,2" are decimals
            if after.len() == 3 && !int_part.is_empty() && int_part != "0" {
                token.replace(',', "")
            } else {
                token.replace(',', ".")
            }
        }
        (0, _) => {
            if dots > 1 { token.replace('.', "") } else { token.to_string() }
        }
        _ => {
            let last_comma = token.rfind(',').unwrap_or(0);
            let last_dot = token.rfind('.').unwrap_or(0);
            if last_comma > last_dot {
                token.replace('.', "").replace(',', ".")
            } else {
                token.replace(',', "")
            }
        }
    }
}

/// Duration text → seconds. Accepts `h:mm:ss`, `mm:ss`, `ss`, a decimal comma
/// on the last component, trailing units (`5:30 /km`) and `1h 2m 3s`.
pub fn parse_duration(raw: &str) -> Option<f64> {
    if is_missing_marker(raw) { return None; }

    if !raw.contains(':') {
        let mut total = 0.0;
        let mut any = false;
        for cap in hms_re().captures_iter(raw) {
            let n: f64 = cap[1].replace(',', ".").parse().ok()?;
            let unit = cap[2].to_ascii_lowercase();
            total += match unit.chars().next() {
                Some('h') => n * 3600.0,
                Some('m') => n * 60.0,
                _ => n,
            };
            any = true;
        }
        if any { return Some(total); }
    }

    let token = clock_re().find(raw)?.as_str().trim_end_matches(['.', ',', ':']);
    let parts: Vec<&str> = token.split(':').collect();
    if parts.len() > 3 { return None; }

    let (last, leading) = parts.split_last()?;
    let secs: f64 = last.replace(',', ".").parse().ok()?;
    let mut total = 0.0;
    for p in leading {
        let v: u64 = p.parse().ok()?;
        total = (total + v as f64) * 60.0;
    }
    Some(total + secs)
}

/// Raw page text → typed cell according to the field's kind.
pub fn normalize(kind: ValueKind, raw: &str) -> Value {
    match kind {
        ValueKind::Text => {
            let t = normalize_ws(raw);
            if is_missing_marker(&t) { Value::Empty } else { Value::Text(t) }
        }
        ValueKind::Number => parse_number(raw).map_or(Value::Empty, Value::Number),
        ValueKind::Duration => parse_duration(raw).map_or(Value::Empty, Value::Duration),
    }
}
