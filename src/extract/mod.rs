// src/extract/mod.rs
//
// Field extraction. Reads the rendered DOM once (read-only), then maps it to an
// `ActivityRecord` through the page profile. The HTML half is pure so it can be
// exercised offline against saved pages.

use std::path::Path;

use scraper::{ElementRef, Html, Selector};

use crate::browser::PageDriver;
use crate::core::sanitize::normalize_ws;
use crate::core::units::normalize;
use crate::error::{Result, ScrapeError};
use crate::file::write_page_dump;
use crate::record::{ActivityRecord, RecordBuilder, Value};
use crate::request::ActivityRequest;
use crate::specs::{Lookup, PageProfile};

mod sets;

pub use sets::read_sets;

pub struct Extractor<'a> {
    profile: &'a PageProfile,
    dump_dir: Option<&'a Path>,
}

impl<'a> Extractor<'a> {
    pub fn new(profile: &'a PageProfile) -> Self {
        Self { profile, dump_dir: None }
    }

    /// Keep the HTML of pages that miss a required field in `dir`.
    pub fn dump_pages_to(mut self, dir: Option<&'a Path>) -> Self {
        self.dump_dir = dir;
        self
    }

    /// Only call after the navigator signalled readiness for `req`.
    pub async fn extract<P>(&self, page: &P, req: &ActivityRequest) -> Result<ActivityRecord>
    where
        P: PageDriver + ?Sized,
    {
        let html = page.content().await?;
        logd!("activity {}: read {} chars of page source", req.id(), html.len());
        let result = extract_from_html(self.profile, &html, req);
        if let (Err(ScrapeError::ExtractionIncomplete { .. }), Some(dir)) = (&result, self.dump_dir) {
            match write_page_dump(dir, req.id(), &html) {
                Ok(path) => logw!("activity {}: page saved to {}", req.id(), path.display()),
                Err(e) => logw!("activity {}: could not save page: {e}", req.id()),
            }
        }
        result
    }
}

/// Build the record for `req` from a page's HTML.
pub fn extract_from_html(profile: &PageProfile, html: &str, req: &ActivityRequest) -> Result<ActivityRecord> {
    let doc = Html::parse_document(html);
    let mut builder = RecordBuilder::for_request(req);

    for field in &profile.fields {
        let value = match lookup_raw(&doc, &field.lookup)? {
            Some(raw) => normalize(field.kind, &raw),
            None if field.required => {
                return Err(ScrapeError::ExtractionIncomplete {
                    id: req.id().to_string(),
                    field: field.name.clone(),
                });
            }
            None => Value::Empty,
        };
        builder = builder.field(&field.name, value);
    }

    if let Some(spec) = &profile.sets {
        let sets = read_sets(&doc, spec)?;
        if !sets.is_empty() {
            let reps: f64 = sets.iter().filter_map(|s| s.reps.as_f64()).sum();
            let volumes: Vec<f64> = sets.iter().filter_map(|s| s.volume_value.as_f64()).collect();
            let total_volume = if volumes.is_empty() {
                Value::Empty
            } else {
                Value::Number(volumes.iter().sum())
            };
            logd!("activity {}: {} workout sets", req.id(), sets.len());
            builder = builder
                .field("total_sets", Value::Number(sets.len() as f64))
                .field("total_reps", Value::Number(reps))
                .field("total_volume", total_volume);
        }
        builder = builder.sets(sets);
    }

    Ok(builder.build())
}

pub(crate) fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| ScrapeError::Profile(format!("selector {:?}: {e}", css)))
}

/// Visible text of an element, whitespace-collapsed. Inline children are
/// space-separated so "5.2<span>km</span>" reads "5.2 km".
pub(crate) fn element_text(el: &ElementRef<'_>) -> String {
    normalize_ws(&el.text().collect::<Vec<_>>().join(" "))
}

/// Raw text for a lookup. `None` when no source element exists at all;
/// `Some("")` when it exists but is blank.
fn lookup_raw(doc: &Html, lookup: &Lookup) -> Result<Option<String>> {
    match lookup {
        Lookup::Text { selectors } => {
            let mut located = false;
            for css in selectors {
                for el in doc.select(&selector(css)?) {
                    let text = element_text(&el);
                    if !text.is_empty() {
                        return Ok(Some(text));
                    }
                    located = true;
                }
            }
            Ok(located.then(String::new))
        }
        Lookup::Attr { selectors, attr } => {
            for css in selectors {
                let found = doc.select(&selector(css)?).find_map(|el| el.value().attr(attr));
                if let Some(v) = found {
                    return Ok(Some(v.to_string()));
                }
            }
            Ok(None)
        }
        Lookup::Labelled { item, label, value, labels } => {
            let (item_sel, label_sel, value_sel) = (selector(item)?, selector(label)?, selector(value)?);
            for block in doc.select(&item_sel) {
                let Some(label_el) = block.select(&label_sel).next() else { continue };
                let text = element_text(&label_el);
                if !labels.iter().any(|l| l.eq_ignore_ascii_case(&text)) {
                    continue;
                }
                if let Some(value_el) = block.select(&value_sel).next() {
                    return Ok(Some(element_text(&value_el)));
                }
            }
            Ok(None)
        }
    }
}
