//! casesync CLI - Main Entry Point
//!
//! Replays a host test event stream into a remote test run:
//!
//! ```text
//! cargo test -- -Z unstable-options --format json | casesync --format libtest
//! ```

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use casesync_reporter::config::{
    ENV_API_TOKEN, ENV_API_URL, ENV_FAIL_ON_UPLOAD_ERROR, ENV_PROJECT, ENV_RUN_TAGS, ENV_RUN_TITLE,
    ENV_TIMEOUT_SECS, ENV_UPLOAD_TIMEOUT_SECS,
};
use casesync_reporter::host::libtest::read_libtest_events;
use casesync_reporter::{dispatch, read_events, Reporter, ReporterConfig, ReporterError, RunSummary};

mod output;

/// Format of the incoming event stream
#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
enum EventFormat {
    /// casesync JSON lines (`{"event":"test_end",...}`)
    #[default]
    Native,
    /// libtest JSON output (`--format json`)
    Libtest,
}

/// casesync - sync test results to a remote test run
#[derive(Parser, Debug)]
#[command(name = "casesync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Format of the incoming event stream
    #[arg(long, value_enum, default_value = "native")]
    format: EventFormat,

    /// Read events from this file instead of stdin
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Write the run summary as JSON to this file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// API token
    #[arg(long, env = "CASESYNC_API_TOKEN", hide_env_values = true)]
    api_token: Option<String>,

    /// Project code
    #[arg(long, env = "CASESYNC_PROJECT")]
    project: Option<String>,

    /// Title of the created run
    #[arg(long, env = "CASESYNC_RUN_TITLE")]
    run_title: Option<String>,

    /// Comma-separated run tags
    #[arg(long, env = "CASESYNC_RUN_TAGS")]
    tags: Option<String>,

    /// API base URL
    #[arg(long, env = "CASESYNC_API_URL")]
    api_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long, env = "CASESYNC_TIMEOUT_SECS")]
    timeout_secs: Option<String>,

    /// Bulk upload timeout in seconds
    #[arg(long, env = "CASESYNC_UPLOAD_TIMEOUT_SECS")]
    upload_timeout_secs: Option<String>,

    /// Fail when the result upload fails (the run is still completed)
    #[arg(long, env = "CASESYNC_FAIL_ON_UPLOAD_ERROR")]
    fail_on_upload_error: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Resolve a configuration variable from the parsed arguments.
    fn lookup(&self, key: &str) -> Option<String> {
        match key {
            ENV_API_TOKEN => self.api_token.clone(),
            ENV_PROJECT => self.project.clone(),
            ENV_RUN_TITLE => self.run_title.clone(),
            ENV_RUN_TAGS => self.tags.clone(),
            ENV_API_URL => self.api_url.clone(),
            ENV_TIMEOUT_SECS => self.timeout_secs.clone(),
            ENV_UPLOAD_TIMEOUT_SECS => self.upload_timeout_secs.clone(),
            ENV_FAIL_ON_UPLOAD_ERROR => self.fail_on_upload_error.clone(),
            _ => None,
        }
    }

    fn reporter_config(&self) -> Result<ReporterConfig, ReporterError> {
        Ok(ReporterConfig::from_lookup(|key| self.lookup(key))?)
    }
}

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr, the status report owns stdout
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    match run(&cli) {
        Ok(summary) => output::print_outcome(&summary),
        Err(e) => {
            output::print_error(&format!("{:#}", e));
            std::process::exit(exit_code(&e));
        }
    }
}

fn run(cli: &Cli) -> Result<RunSummary> {
    let config = cli.reporter_config()?;
    let mut reporter = Reporter::new(config)?;

    let reader: Box<dyn BufRead> = match &cli.input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("opening {}", path.display()))?,
        )),
        None => Box::new(io::stdin().lock()),
    };

    let summary = match cli.format {
        EventFormat::Native => dispatch(&mut reporter, read_events(reader))?,
        EventFormat::Libtest => dispatch(&mut reporter, read_libtest_events(reader))?,
    };

    if let Some(path) = &cli.output {
        output::write_summary(path, &summary)?;
    }

    Ok(summary)
}

fn exit_code(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<ReporterError>()
        .map(ReporterError::exit_code)
        .unwrap_or(1)
}
