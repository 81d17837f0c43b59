// src/config/mod.rs
pub mod consts;
pub mod options;

pub use options::{Endpoint, ExportFormat, ExportOptions, NavOptions, RunOptions};
