// src/request.rs
//
// Activity requests: the (id, optional date) pairs a run is driven by, plus the
// `id[,date]` line format used by `--activity` and `--file`.

use chrono::NaiveDate;

use crate::error::{Result, ScrapeError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActivityRequest {
    id: String,
    date: Option<NaiveDate>,
}

impl ActivityRequest {
    pub fn new(id: impl Into<String>, date: Option<NaiveDate>) -> Self {
        Self { id: id.into().trim().to_string(), date }
    }

    pub fn id(&self) -> &str { &self.id }
    pub fn date(&self) -> Option<NaiveDate> { self.date }

    /// Rejects ids that cannot name an activity page or an output file.
    /// Only ASCII letters, digits, `-` and `_` pass, so every id keeps its
    /// own file stem and URL path.
    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(ScrapeError::InvalidRequest(s!("empty activity id")));
        }
        if let Some(bad) = self.id.chars().find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))) {
            return Err(ScrapeError::InvalidRequest(format!(
                "activity id {:?} contains {:?}", self.id, bad
            )));
        }
        Ok(())
    }

    /// `12345` or `12345_2024-01-10`, used for logs and file stems.
    pub fn label(&self) -> String {
        match self.date {
            Some(d) => format!("{}_{}", self.id, d.format("%Y-%m-%d")),
            None => self.id.clone(),
        }
    }
}

/// Parse one `id[,date]` pair. Returns `Ok(None)` for blank and `#` comment lines.
/// An empty id is kept: the runner reports it as `InvalidRequest` in order.
pub fn parse_line(line: &str) -> Result<Option<ActivityRequest>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let mut parts = line.splitn(2, ',');
    let id = parts.next().unwrap_or("").trim();
    let date = match parts.next().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(parse_date(raw)?),
    };
    Ok(Some(ActivityRequest::new(id, date)))
}

pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| ScrapeError::InvalidRequest(format!("date {:?}: {}", raw, e)))
}

/// Parse a whole list. Malformed lines are returned separately with their
/// 1-based line number so the caller can report them without losing the rest.
pub fn parse_list(text: &str) -> (Vec<ActivityRequest>, Vec<(usize, ScrapeError)>) {
    let mut requests = Vec::new();
    let mut rejected = Vec::new();
    for (i, line) in text.lines().enumerate() {
        match parse_line(line) {
            Ok(Some(req)) => requests.push(req),
            Ok(None) => {}
            Err(e) => rejected.push((i + 1, e)),
        }
    }
    (requests, rejected)
}
