// src/specs/mod.rs
//! # Page "specs" module
//!
//! This module hosts the **page profile**: the data that says *where the ground
//! truth lives on an activity page* and *how each metric is read*. The extractor
//! and navigator consult it; neither hard-codes a selector.
//!
//! ## What lives here
//! - **Profile types** (`PageProfile`, `FieldSpec`, `Lookup`, `SetsSpec`) and their
//!   JSON shape. A profile is versioned so a layout change is a data bump.
//! - **The built-in Garmin Connect profile**, embedded from `garmin_connect.json`.
//! - **Validation** at load time: selectors must parse, the URL template must
//!   carry `{id}`, field names must be unique and must not shadow
//!   `activity_id`/`date`.
//!
//! ## What does **not** live here
//! - Navigation and readiness polling (`navigate`).
//! - Reading the DOM and normalizing values (`extract`, `core::units`).
//! - Output shaping (`file`, `csv`).
//!
//! ## Lookup strategies
//! - `text`: first element matching any of `selectors`, its text content.
//! - `attr`: first element matching any of `selectors`, attribute `attr`.
//! - `labelled`: stat blocks (`item`) holding a label (`label`) and a value
//!   (`value`); picks the block whose label equals one of `labels`,
//!   case-insensitively. Summary tiles on the activity page are laid out this way.
//!
//! In short: **`specs` knows how to read the pages.** Other layers decide when
//! to navigate, how to retry, and how to write files.

mod profile;

pub use profile::{url_path, FieldSpec, Lookup, PageProfile, SetsSpec, ValueKind};
