// src/bin/cli.rs
use std::process::ExitCode;

use clap::Parser;
use gc_scrape::cli::{self, Args};

#[tokio::main]
async fn main() -> color_eyre::Result<ExitCode> {
    color_eyre::install()?;
    let args = Args::parse();
    gc_scrape::log::init(args.verbose, args.log_file.as_deref())?;
    cli::run(args).await
}
