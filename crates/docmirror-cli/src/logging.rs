//! Tracing setup for the CLI
//!
//! Two layers share one registry:
//!
//! - the console layer on stderr, filtered by `RUST_LOG` when set and by
//!   `-v`/`-q` and `logging.level` otherwise
//! - an optional transcript layer writing the whole run, without ANSI
//!   colours, to the configured log file
//!
//! The end-of-run summary is logged under [`SUMMARY_TARGET`]. The console
//! drops that target since the sync command prints the summary itself.

use std::fs::{self, File};
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use docmirror_sync::report::SUMMARY_TARGET;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Console verbosity requested on the command line
#[derive(Debug, Clone, Copy)]
pub struct Verbosity {
    pub verbose: u8,
    pub quiet: bool,
    pub json: bool,
}

impl Verbosity {
    fn console_level<'a>(&self, configured: &'a str) -> &'a str {
        match (self.quiet, self.verbose) {
            (true, _) => "warn",
            (false, 0) => configured,
            (false, 1) => "debug",
            (false, _) => "trace",
        }
    }
}

fn console_filter(verbosity: Verbosity, level: &str) -> Result<EnvFilter> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.console_level(level)));
    let quiet_summary = format!("{SUMMARY_TARGET}=off")
        .parse()
        .context("Invalid summary log directive")?;
    Ok(filter.add_directive(quiet_summary))
}

fn transcript_filter(verbosity: Verbosity, level: &str) -> EnvFilter {
    EnvFilter::new(if verbosity.verbose > 0 { "debug" } else { level })
}

/// Opens (truncating) the transcript file, creating its directory
fn open_transcript(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
    }
    File::create(path).with_context(|| format!("Failed to open log file {}", path.display()))
}

/// Installs the global subscriber
///
/// # Arguments
/// * `verbosity` - Console flags from the command line
/// * `level` - Configured level (`logging.level`)
/// * `transcript` - File receiving the full-run log, if any
pub fn init(verbosity: Verbosity, level: &str, transcript: Option<&Path>) -> Result<()> {
    let console_filter = console_filter(verbosity, level)?;

    let console = if verbosity.json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(console_filter)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_filter(console_filter)
            .boxed()
    };

    let file = match transcript {
        Some(path) => Some(
            fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(open_transcript(path)?))
                .with_filter(transcript_filter(verbosity, level)),
        ),
        None => None,
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init()
        .context("Failed to install tracing subscriber")?;
    Ok(())
}
