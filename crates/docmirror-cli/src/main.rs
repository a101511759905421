//! DocMirror CLI - Mirror a SharePoint document library to a local folder
//!
//! Provides commands for:
//! - Running a one-way mirror pass
//! - Signing in to Microsoft 365 and managing the cached session
//! - Viewing and editing the configuration file

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use docmirror_core::config::Config;

mod commands;
mod logging;
mod output;

use commands::{auth::AuthCommand, config::ConfigCommand, sync::SyncCommand};
use logging::Verbosity;
use output::{get_formatter, OutputFormat};

#[derive(Debug, Parser)]
#[command(
    name = "docmirror",
    version,
    about = "One-way mirror of a SharePoint document library"
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Mirror the configured library into the target folder
    Sync(SyncCommand),
    /// Authentication commands
    #[command(subcommand)]
    Auth(AuthCommand),
    /// View and manage configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

/// Loads the file if it exists; a missing file yields the defaults
fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        Config::load(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))
    } else {
        Ok(Config::default())
    }
}

async fn run(cli: Cli, format: OutputFormat) -> Result<()> {
    let verbosity = Verbosity {
        verbose: cli.verbose,
        quiet: cli.quiet,
        json: cli.json,
    };
    let config_path = cli.config.unwrap_or_else(Config::default_path);

    match cli.command {
        Commands::Sync(cmd) => {
            let config = cmd.apply(load_config(&config_path)?);
            logging::init(
                verbosity,
                &config.logging.level,
                Some(&config.logging.log_path),
            )?;
            cmd.execute(config, format, cli.quiet).await
        }
        Commands::Auth(cmd) => {
            let config = load_config(&config_path)?;
            logging::init(verbosity, &config.logging.level, None)?;
            cmd.execute(config, format, cli.quiet).await
        }
        Commands::Config(cmd) => {
            logging::init(verbosity, "warn", None)?;
            cmd.execute(&config_path, format, cli.quiet).await
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };
    let quiet = cli.quiet;

    match run(cli, format).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            get_formatter(format, quiet).error(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}
