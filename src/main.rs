mod commands;
mod config;
mod context;
mod credentials;
mod import;
mod output;
mod signing;
mod traits;
mod workbook;

use anyhow::{Context as _, Result};
use clap::{CommandFactory, Parser};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use commands::BulkCreateCommand;
use config::{ApiEndpoints, ImportConfig};
use context::Context;
use credentials::ApiCredentials;
use import::retry::{DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY_SECS, RetryPolicy};

#[derive(Parser)]
#[command(name = "bulk-create-applications")]
#[command(
    about = "Bulk create application profiles from an Excel workbook",
    long_about = "Bulk create application profiles from an Excel workbook.\n\n\
                  Rows are read from the first worksheet of the workbook,\n\
                  whichever sheet was active when it was saved.\n\
                  Each row's outcome is written to the column after the last header;\n\
                  rows marked 'success' are skipped on the next run."
)]
#[command(version)]
struct Cli {
    /// Print request URLs, payloads and responses
    #[arg(short, long, visible_alias = "verbose")]
    debug: bool,

    /// Path to the Excel workbook
    #[arg(short, long, value_name = "PATH")]
    file_name: Option<PathBuf>,

    /// Row (1-based) holding the column headers
    #[arg(short = 'r', long, value_name = "N")]
    header_row: Option<u32>,

    /// Failed lookups tolerated per row before giving up
    #[arg(long, env = "BULK_IMPORT_MAX_ATTEMPTS", default_value_t = DEFAULT_MAX_ATTEMPTS)]
    max_attempts: u32,

    /// Seconds to wait between lookup retries
    #[arg(long, env = "BULK_IMPORT_RETRY_DELAY_SECS", default_value_t = DEFAULT_RETRY_DELAY_SECS)]
    retry_delay_secs: u64,
}

impl Cli {
    /// None when the file or a positive header row is missing
    fn import_config(&self) -> Option<ImportConfig> {
        let file = self.file_name.clone()?;
        let header_row = self.header_row.filter(|row| *row > 0)?;

        Some(ImportConfig {
            file,
            header_row,
            verbose: self.debug,
            retry: RetryPolicy::new(
                self.max_attempts,
                Duration::from_secs(self.retry_delay_secs),
            ),
        })
    }
}

fn main() {
    let cli = Cli::parse();

    let Some(config) = cli.import_config() else {
        // Nothing to import: show usage and leave successfully
        let _ = Cli::command().print_help();
        println!();
        return;
    };

    if let Err(err) = run(&config) {
        output::error("An error occurred!");
        eprintln!("{:#}", err);
        std::process::exit(1);
    }
}

fn run(config: &ImportConfig) -> Result<()> {
    let credentials = ApiCredentials::load()?;
    let endpoints = ApiEndpoints::for_region(credentials.region())?;
    let ctx = Context::new(&credentials)?;

    let stop = Arc::new(AtomicBool::new(false));
    let handler_flag = stop.clone();
    ctrlc::set_handler(move || {
        if handler_flag.swap(true, Ordering::SeqCst) {
            std::process::exit(130);
        }
        output::warning("Stopping after the current row (press Ctrl-C again to abort)");
    })
    .context("Failed to install the Ctrl-C handler")?;

    BulkCreateCommand::execute(&ctx, config, &endpoints, stop)?;

    Ok(())
}
