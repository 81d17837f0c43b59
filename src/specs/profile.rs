// src/specs/profile.rs
use std::collections::HashSet;
use std::path::Path;

use reqwest::Url;
use scraper::Selector;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScrapeError};
use crate::record::{DATE_FIELD, ID_FIELD};

const BUILTIN_GARMIN: &str = include_str!("garmin_connect.json");
const ID_PLACEHOLDER: &str = "{id}";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Text,
    Number,
    /// Normalized to seconds.
    Duration,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", rename_all = "snake_case")]
pub enum Lookup {
    Text { selectors: Vec<String> },
    Attr { selectors: Vec<String>, attr: String },
    Labelled { item: String, label: String, value: String, labels: Vec<String> },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub kind: ValueKind,
    #[serde(default)]
    pub required: bool,
    pub lookup: Lookup,
}

/// Cell positions inside one set row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetColumns {
    pub exercise: usize,
    pub time: usize,
    pub rest: usize,
    pub reps: usize,
    pub weight: usize,
    pub volume: usize,
}

impl Default for SetColumns {
    fn default() -> Self {
        Self { exercise: 1, time: 2, rest: 3, reps: 4, weight: 5, volume: 6 }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetsSpec {
    pub container: String,
    #[serde(default = "default_set_row")]
    pub row: String,
    #[serde(default = "default_number_attr")]
    pub number_attr: String,
    #[serde(default)]
    pub fallback_keywords: Vec<String>,
    #[serde(default = "default_min_cells")]
    pub min_cells: usize,
    #[serde(default)]
    pub columns: SetColumns,
}

fn default_set_row() -> String { s!("tr[data-set-number]") }
fn default_number_attr() -> String { s!("data-set-number") }
fn default_min_cells() -> usize { 7 }

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageProfile {
    pub name: String,
    pub version: u32,
    /// Detail page address; `{id}` is replaced by the activity id.
    pub activity_url: String,
    pub site_prefix: String,
    #[serde(default)]
    pub signin_markers: Vec<String>,
    pub ready_selectors: Vec<String>,
    #[serde(default)]
    pub not_found_selectors: Vec<String>,
    #[serde(default)]
    pub not_found_phrases: Vec<String>,
    pub fields: Vec<FieldSpec>,
    #[serde(default)]
    pub sets: Option<SetsSpec>,
}

impl PageProfile {
    /// The Garmin Connect profile shipped with the crate.
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_GARMIN)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let profile: PageProfile = serde_json::from_str(text)
            .map_err(|e| ScrapeError::Profile(format!("malformed profile: {e}")))?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ScrapeError::Profile(format!("{}: {e}", path.display())))?;
        Self::from_json(&text)
    }

    /// `None` → built-in profile.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Self::builtin(),
        }
    }

    pub fn activity_url(&self, id: &str) -> String {
        self.activity_url.replace(ID_PLACEHOLDER, id)
    }

    /// Path of the activity's page without trailing slashes, the part that
    /// identifies it once the browser has settled on it.
    pub fn activity_path(&self, id: &str) -> Option<String> {
        url_path(&self.activity_url(id))
    }

    pub fn is_signin_url(&self, url: &str) -> bool {
        let lc = url.to_ascii_lowercase();
        self.signin_markers.iter().any(|m| lc.contains(&m.to_ascii_lowercase()))
    }

    pub fn is_site_url(&self, url: &str) -> bool {
        url.starts_with(&self.site_prefix)
    }

    fn validate(&self) -> Result<()> {
        if !self.activity_url.contains(ID_PLACEHOLDER) {
            return Err(ScrapeError::Profile(format!(
                "activity_url {:?} has no {ID_PLACEHOLDER} placeholder", self.activity_url
            )));
        }
        match (self.activity_path("1"), self.activity_path("2")) {
            (Some(a), Some(b)) if a != b => {}
            _ => {
                return Err(ScrapeError::Profile(format!(
                    "activity_url {:?} must be an absolute URL with {ID_PLACEHOLDER} in its path",
                    self.activity_url
                )));
            }
        }
        if self.ready_selectors.is_empty() {
            return Err(ScrapeError::Profile(s!("ready_selectors is empty")));
        }

        let mut seen = HashSet::new();
        for f in &self.fields {
            if f.name == ID_FIELD || f.name == DATE_FIELD {
                return Err(ScrapeError::Profile(format!("field name {:?} is reserved", f.name)));
            }
            if !seen.insert(f.name.as_str()) {
                return Err(ScrapeError::Profile(format!("duplicate field {:?}", f.name)));
            }
        }

        for sel in self.all_selectors() {
            Selector::parse(sel)
                .map_err(|e| ScrapeError::Profile(format!("selector {:?}: {e}", sel)))?;
        }
        Ok(())
    }

    fn all_selectors(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        out.extend(self.ready_selectors.iter().map(String::as_str));
        out.extend(self.not_found_selectors.iter().map(String::as_str));
        for f in &self.fields {
            match &f.lookup {
                Lookup::Text { selectors } | Lookup::Attr { selectors, .. } => {
                    out.extend(selectors.iter().map(String::as_str));
                }
                Lookup::Labelled { item, label, value, .. } => {
                    out.extend([item.as_str(), label.as_str(), value.as_str()]);
                }
            }
        }
        if let Some(sets) = &self.sets {
            out.extend([sets.container.as_str(), sets.row.as_str()]);
        }
        out
    }
}

/// `https://host/a/b/?q` → `/a/b`. `None` when `url` is not absolute.
pub fn url_path(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    Some(parsed.path().trim_end_matches('/').to_string())
}
