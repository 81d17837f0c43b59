// src/file.rs

use std::{
    collections::HashMap,
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use crate::batch::BatchResult;
use crate::config::consts::{
    COMBINED_STEM, FAILURES_STEM, PAGE_DUMP_PREFIX, PER_ACTIVITY_PREFIX, SETS_COMBINED_STEM, SETS_SUFFIX,
};
use crate::config::ExportOptions;
use crate::core::sanitize::sanitize_file_stem;
use crate::csv::{record_row, union_columns, write_row};
use crate::error::{Result, ScrapeError};
use crate::record::{ActivityRecord, Value, WorkoutSet, DATE_FIELD};

pub const FAILURE_COLUMNS: [&str; 5] = ["activity_id", "date", "kind", "attempts", "message"];

/// Paths produced by `write_outputs`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Written {
    pub per_activity: Vec<PathBuf>,
    pub combined: Option<PathBuf>,
    pub sets: Vec<PathBuf>,
    pub sets_combined: Option<PathBuf>,
    pub failures: Option<PathBuf>,
}

impl Written {
    pub fn all(&self) -> impl Iterator<Item = &PathBuf> {
        self.per_activity
            .iter()
            .chain(self.combined.iter())
            .chain(self.sets.iter())
            .chain(self.sets_combined.iter())
            .chain(self.failures.iter())
    }
}

/// Writes one run's files into `opts.out_dir`. Files are created or truncated,
/// never appended; repeated stems within the run get numbered.
pub struct OutputWriter<'a> {
    opts: &'a ExportOptions,
    seen: HashMap<String, usize>,
}

impl<'a> OutputWriter<'a> {
    pub fn new(opts: &'a ExportOptions) -> Result<Self> {
        ensure_directory(&opts.out_dir)?;
        Ok(Self { opts, seen: HashMap::new() })
    }

    /// `garmin_workout_<id>[_<date>].<ext>`: header plus the record's row.
    pub fn write_per_activity(&mut self, rec: &ActivityRecord) -> Result<PathBuf> {
        let path = self.next_path(&activity_stem(rec));
        let columns: Vec<String> = rec.columns().map(String::from).collect();
        self.write_table(&path, &columns, &[record_row(rec, &columns)])?;
        Ok(path)
    }

    /// Union-of-columns table of every recorded activity, request order.
    pub fn write_combined(&mut self, batch: &BatchResult) -> Result<PathBuf> {
        let columns = union_columns(batch.records());
        let rows: Vec<Vec<String>> = batch.records().map(|r| record_row(r, &columns)).collect();
        let path = self.next_path(COMBINED_STEM);
        self.write_table(&path, &columns, &rows)?;
        Ok(path)
    }

    /// `None` when the record has no sets.
    pub fn write_sets_per_activity(&mut self, rec: &ActivityRecord) -> Result<Option<PathBuf>> {
        if rec.sets().is_empty() {
            return Ok(None);
        }
        let path = self.next_path(&format!("{}{}", activity_stem(rec), SETS_SUFFIX));
        self.write_table(&path, &sets_header(), &sets_rows(rec))?;
        Ok(Some(path))
    }

    /// `None` when no recorded activity has sets.
    pub fn write_sets_combined(&mut self, batch: &BatchResult) -> Result<Option<PathBuf>> {
        let rows: Vec<Vec<String>> = batch.records().flat_map(sets_rows).collect();
        if rows.is_empty() {
            return Ok(None);
        }
        let path = self.next_path(SETS_COMBINED_STEM);
        self.write_table(&path, &sets_header(), &rows)?;
        Ok(Some(path))
    }

    /// One row per failed item; header only when nothing failed.
    pub fn write_failures(&mut self, batch: &BatchResult) -> Result<PathBuf> {
        let rows: Vec<Vec<String>> = batch
            .failures()
            .map(|(item, f)| {
                vec![
                    item.request.id().to_string(),
                    item.request.date().map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default(),
                    s!(f.kind.as_str()),
                    item.attempts.to_string(),
                    f.message.clone(),
                ]
            })
            .collect();
        let header: Vec<String> = FAILURE_COLUMNS.iter().map(|c| s!(*c)).collect();
        let path = self.next_path(FAILURES_STEM);
        self.write_table(&path, &header, &rows)?;
        Ok(path)
    }

    /// Delete `<stem>.<ext>` left by an earlier run. Returns the removed path.
    pub fn remove_stale(&self, stem: &str) -> Result<Option<PathBuf>> {
        let path = self.opts.out_dir.join(format!("{stem}.{}", self.opts.format.ext()));
        if !path.is_file() {
            return Ok(None);
        }
        fs::remove_file(&path)?;
        logw!("removed {} from an earlier run", path.display());
        Ok(Some(path))
    }

    fn next_path(&mut self, stem: &str) -> PathBuf {
        resolve_filename(&self.opts.out_dir, stem, &mut self.seen, self.opts.format.ext())
    }

    fn write_table(&self, path: &Path, headers: &[String], rows: &[Vec<String>]) -> Result<()> {
        let sep = self.opts.format.delim();
        let file = File::create(path)?; // truncate/overwrite
        let mut out = BufWriter::new(file);
        write_row(&mut out, headers, sep)?;
        for row in rows {
            write_row(&mut out, row, sep)?;
        }
        out.flush()?;
        logd!("wrote {} ({} rows)", path.display(), rows.len());
        Ok(())
    }
}

/// Write every file the batch calls for.
///
/// The combined tables only when they have rows; a combined table this run
/// does not write is removed from `out_dir`. The failures report is always
/// written. Either way no merged file from an earlier run survives.
pub fn write_outputs(opts: &ExportOptions, batch: &BatchResult) -> Result<Written> {
    let mut writer = OutputWriter::new(opts)?;
    let mut written = Written::default();

    for rec in batch.records() {
        if opts.per_activity {
            written.per_activity.push(writer.write_per_activity(rec)?);
        }
        if opts.per_activity && opts.include_sets {
            if let Some(p) = writer.write_sets_per_activity(rec)? {
                written.sets.push(p);
            }
        }
    }

    if batch.records().next().is_some() {
        written.combined = Some(writer.write_combined(batch)?);
        if opts.include_sets {
            written.sets_combined = writer.write_sets_combined(batch)?;
        }
    } else {
        logw!("no activity was recorded; combined file not written");
        writer.remove_stale(COMBINED_STEM)?;
    }
    if written.sets_combined.is_none() {
        writer.remove_stale(SETS_COMBINED_STEM)?;
    }

    written.failures = Some(writer.write_failures(batch)?);
    logf!("wrote {} files to {}", written.all().count(), opts.out_dir.display());
    Ok(written)
}

fn activity_stem(rec: &ActivityRecord) -> String {
    let label = match rec.get(DATE_FIELD) {
        Some(Value::Text(date)) => format!("{}_{}", rec.id(), date),
        _ => rec.id().to_string(),
    };
    format!("{}{}", PER_ACTIVITY_PREFIX, sanitize_file_stem(&label, "activity"))
}

/// Save a page's HTML as `garmin_page_<id>.html` in `dir`, replacing any earlier copy.
pub fn write_page_dump(dir: &Path, id: &str, html: &str) -> Result<PathBuf> {
    ensure_directory(dir)?;
    let path = dir.join(format!("{}{}.html", PAGE_DUMP_PREFIX, sanitize_file_stem(id, "activity")));
    fs::write(&path, html)?;
    Ok(path)
}

fn sets_header() -> Vec<String> {
    WorkoutSet::COLUMNS.iter().map(|c| s!(*c)).collect()
}

fn sets_rows(rec: &ActivityRecord) -> Vec<Vec<String>> {
    rec.sets().iter().map(|s| s.to_row(rec.id())).collect()
}

pub fn ensure_directory(dir: &Path) -> Result<()> {
    if dir.exists() && !dir.is_dir() {
        return Err(ScrapeError::Io(std::io::Error::other(format!(
            "path exists but is not a directory: {}",
            dir.display()
        ))));
    }
    if !dir.exists() { fs::create_dir_all(dir)?; }
    Ok(())
}

/// Duplicate handling **only within this run**
pub fn resolve_filename(
    dir: &Path,
    stem: &str,                        // already sanitized, no extension
    seen_names: &mut HashMap<String, usize>,
    ext: &str,                         // "csv" | "tsv"
) -> PathBuf {
    let count = seen_names.entry(stem.to_string()).or_insert(0);

    // First occurrence: "<stem>.ext"
    // Subsequent:       "<stem> (N).ext" with N starting at 2
    let filename = if *count == 0 {
        format!("{stem}.{ext}")
    } else {
        format!("{stem} ({}).{ext}", *count + 1)
    };

    *count += 1;
    dir.join(filename)
}
