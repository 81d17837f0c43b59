// src/lib.rs

#[macro_use]
pub mod macros;
#[macro_use]
pub mod log;

pub mod config;
pub mod core;
pub mod error;
pub mod specs;

pub mod browser;
pub mod navigate;
pub mod extract;
pub mod request;
pub mod record;

pub mod batch;
pub mod progress;
pub mod runner;

pub mod cli;
pub mod csv;
pub mod file;

pub use error::{FailureKind, Result, ScrapeError};
