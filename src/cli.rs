// src/cli.rs
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{ArgAction, Parser, ValueEnum};
use color_eyre::eyre::WrapErr;

use crate::batch::{exercise_summary, Failure};
use crate::config::consts::{DEFAULT_HOST, DEFAULT_OUT_DIR, DEFAULT_PORT, NAV_TIMEOUT_SECS, RETRIES};
use crate::config::{Endpoint, ExportFormat, ExportOptions, NavOptions, RunOptions};
use crate::progress::Progress;
use crate::request::{parse_line, parse_list, ActivityRequest};
use crate::runner::{scrape, CancelToken};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Csv,
    Tsv,
}

impl From<FormatArg> for ExportFormat {
    fn from(f: FormatArg) -> Self {
        match f {
            FormatArg::Csv => ExportFormat::Csv,
            FormatArg::Tsv => ExportFormat::Tsv,
        }
    }
}

/// Export Garmin Connect workouts from an already logged-in browser.
///
/// Start Chrome/Chromium with `--remote-debugging-port=9222`, log in to
/// Garmin Connect in that window, then run this with the activity ids.
#[derive(Debug, Parser)]
#[command(name = "gc_scrape", version)]
pub struct Args {
    /// Host of the browser's remote debugging endpoint
    #[arg(long, env = "GC_SCRAPE_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// Remote debugging port
    #[arg(long, env = "GC_SCRAPE_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Activity to export, optionally with its date (repeatable)
    #[arg(short = 'a', long = "activity", value_name = "ID[,YYYY-MM-DD]")]
    pub activities: Vec<String>,

    /// File with one `id[,date]` per line; `#` starts a comment
    #[arg(short, long, env = "GC_SCRAPE_FILE")]
    pub file: Option<PathBuf>,

    /// Output directory
    #[arg(short, long, env = "GC_SCRAPE_OUTPUT", default_value = DEFAULT_OUT_DIR)]
    pub output: PathBuf,

    #[arg(long, value_enum, env = "GC_SCRAPE_FORMAT", default_value_t = FormatArg::Csv)]
    pub format: FormatArg,

    /// Seconds to wait for an activity page to render
    #[arg(long, env = "GC_SCRAPE_TIMEOUT", default_value_t = NAV_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Extra attempts after a timeout or protocol hiccup
    #[arg(long, env = "GC_SCRAPE_RETRIES", default_value_t = RETRIES)]
    pub retries: u32,

    /// Page profile JSON replacing the built-in Garmin Connect one
    #[arg(long, env = "GC_SCRAPE_PROFILE")]
    pub profile: Option<PathBuf>,

    /// Only write the combined files
    #[arg(long)]
    pub no_per_activity: bool,

    /// Skip the strength-workout sets files
    #[arg(long)]
    pub no_sets: bool,

    /// Save the page of any activity missing a required field as `garmin_page_<id>.html`
    #[arg(long)]
    pub dump_pages: bool,

    /// More log output (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Also append logs to this file
    #[arg(long, env = "GC_SCRAPE_LOG_FILE")]
    pub log_file: Option<PathBuf>,
}

impl Args {
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            endpoint: Endpoint::new(self.host.clone(), self.port),
            nav: NavOptions {
                timeout: Duration::from_secs(self.timeout),
                retries: self.retries,
                ..NavOptions::default()
            },
            export: ExportOptions {
                format: self.format.into(),
                out_dir: self.output.clone(),
                per_activity: !self.no_per_activity,
                include_sets: !self.no_sets,
                dump_pages: self.dump_pages,
            },
            profile: self.profile.clone(),
        }
    }

    /// `--activity` values first, then the `--file` entries, each in given order.
    /// Lines with a bad date are reported and skipped; the rest still run.
    pub fn requests(&self) -> color_eyre::Result<Vec<ActivityRequest>> {
        let mut out = Vec::new();
        for raw in &self.activities {
            match parse_line(raw) {
                Ok(Some(req)) => out.push(req),
                Ok(None) => {}
                Err(e) => loge!("--activity {:?}: {e}", raw),
            }
        }
        if let Some(path) = &self.file {
            let text = std::fs::read_to_string(path)
                .wrap_err_with(|| format!("reading activity list {}", path.display()))?;
            let (reqs, rejected) = parse_list(&text);
            for (line, e) in rejected {
                loge!("{}:{line}: {e}", path.display());
            }
            out.extend(reqs);
        }
        Ok(out)
    }
}

/// Prints one line per activity.
pub struct ConsoleProgress {
    total: usize,
}

impl ConsoleProgress {
    pub fn new() -> Self { Self { total: 0 } }
}

impl Default for ConsoleProgress {
    fn default() -> Self { Self::new() }
}

impl Progress for ConsoleProgress {
    fn begin(&mut self, total: usize) {
        self.total = total;
        println!("Exporting {total} activities");
    }

    fn log(&mut self, msg: &str) {
        println!("{msg}");
    }

    fn item_started(&mut self, index: usize, req: &ActivityRequest) {
        println!("[{}/{}] {}", index + 1, self.total, req.label());
    }

    fn item_retry(&mut self, index: usize, attempt: u32, failure: &Failure) {
        println!("[{}/{}]   retry after attempt {attempt}: {}", index + 1, self.total, failure.kind);
    }

    fn item_done(&mut self, index: usize, _req: &ActivityRequest) {
        println!("[{}/{}]   ok", index + 1, self.total);
    }

    fn item_failed(&mut self, index: usize, _req: &ActivityRequest, failure: &Failure) {
        println!("[{}/{}]   failed ({}): {}", index + 1, self.total, failure.kind, failure.message);
    }
}

pub async fn run(args: Args) -> color_eyre::Result<ExitCode> {
    let requests = args.requests()?;
    let opts = args.run_options();

    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                logw!("interrupted; stopping after the current activity");
                cancel.cancel();
            }
        });
    }

    let mut progress = ConsoleProgress::new();
    let report = match scrape(&opts, &requests, &mut progress, &cancel).await {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: {e}");
            return Ok(ExitCode::FAILURE);
        }
    };

    let summary = report.batch.summary();
    println!();
    println!("{summary}");
    for (id, kind) in &summary.failed {
        println!("  failed: {:<14} {kind}", if id.is_empty() { "<empty id>" } else { id.as_str() });
    }

    let exercises = exercise_summary(&report.batch);
    if !exercises.is_empty() {
        println!();
        println!("Exercises:");
        for e in &exercises {
            println!("  {:<14} {:<30} {:>3} sets {:>5} reps", e.activity_id, e.exercise, e.sets, e.reps);
        }
    }

    println!();
    for path in report.written.all() {
        println!("wrote {}", path.display());
    }

    Ok(if summary.recorded > 0 { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_map_to_run_options() {
        let args = Args::try_parse_from([
            "gc_scrape", "--port", "9333", "-a", "123,2024-01-10", "-a", "456",
            "--format", "tsv", "--retries", "0", "--timeout", "5", "--no-per-activity",
        ])
        .unwrap();
        let opts = args.run_options();
        assert_eq!(opts.endpoint.port, 9333);
        assert_eq!(opts.endpoint.host, "127.0.0.1");
        assert_eq!(opts.export.format, ExportFormat::Tsv);
        assert!(!opts.export.per_activity);
        assert!(opts.export.include_sets);
        assert!(!opts.export.dump_pages);
        assert_eq!(opts.nav.retries, 0);
        assert_eq!(opts.nav.timeout, Duration::from_secs(5));

        let reqs = args.requests().unwrap();
        assert_eq!(reqs.len(), 2);
        assert_eq!(reqs[0].label(), "123_2024-01-10");
        assert_eq!(reqs[1].id(), "456");
    }

    #[test]
    fn dump_pages_flag() {
        let args = Args::try_parse_from(["gc_scrape", "-a", "1", "--dump-pages"]).unwrap();
        assert!(args.run_options().export.dump_pages);
    }

    #[test]
    fn bad_activity_argument_is_skipped() {
        let args = Args::try_parse_from(["gc_scrape", "-a", "1,10/01/2024", "-a", "2"]).unwrap();
        let reqs = args.requests().unwrap();
        assert_eq!(reqs.len(), 1);
        assert_eq!(reqs[0].id(), "2");
    }

    #[test]
    fn missing_list_file_is_an_error() {
        let args = Args::try_parse_from(["gc_scrape", "--file", "/no/such/list.txt"]).unwrap();
        assert!(args.requests().is_err());
    }
}
