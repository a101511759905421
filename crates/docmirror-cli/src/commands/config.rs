//! Config command - View and manage docmirror configuration
//!
//! Provides the `docmirror config` CLI command which:
//! 1. Shows the effective configuration (YAML or JSON)
//! 2. Validates the configuration file and reports every error
//! 3. Writes a starter configuration file
//! 4. Sets individual values via dot-notation keys

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;
use docmirror_core::config::{Config, ConfigBuilder};
use tracing::info;

use crate::output::{get_formatter, plural, OutputFormat, OutputFormatter};

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current configuration
    Show,
    /// Validate configuration file
    Validate,
    /// Write a new configuration file
    Init {
        /// SharePoint site URL
        #[arg(long)]
        site_url: Option<String>,
        /// Document library display name
        #[arg(long)]
        library: Option<String>,
        /// Local folder to mirror into
        #[arg(long)]
        target: Option<PathBuf>,
        /// Application (client) ID of the app registration
        #[arg(long)]
        client_id: Option<String>,
        /// Tenant ID or domain
        #[arg(long)]
        tenant: Option<String>,
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "remote.library_name")
        key: String,
        /// New value
        value: String,
    },
}

impl ConfigCommand {
    pub async fn execute(
        &self,
        config_path: &Path,
        format: OutputFormat,
        quiet: bool,
    ) -> Result<()> {
        let formatter = get_formatter(format, quiet);
        match self {
            ConfigCommand::Show => execute_show(config_path, format, &*formatter),
            ConfigCommand::Validate => execute_validate(config_path, format, &*formatter),
            ConfigCommand::Init {
                site_url,
                library,
                target,
                client_id,
                tenant,
                force,
            } => {
                if config_path.exists() && !force {
                    anyhow::bail!(
                        "{} already exists (use --force to replace it)",
                        config_path.display()
                    );
                }
                let mut builder = ConfigBuilder::new();
                if let Some(url) = site_url {
                    builder = builder.site_url(url.clone());
                }
                if let Some(name) = library {
                    builder = builder.library_name(name.clone());
                }
                if let Some(path) = target {
                    builder = builder.target_path(path.clone());
                }
                if let Some(id) = client_id {
                    builder = builder.client_id(id.clone());
                }
                if let Some(tenant) = tenant {
                    builder = builder.tenant(tenant.clone());
                }
                execute_init(builder.build(), config_path, format, &*formatter)
            }
            ConfigCommand::Set { key, value } => {
                execute_set(config_path, key, value, format, &*formatter)
            }
        }
    }
}

fn execute_show(
    config_path: &Path,
    format: OutputFormat,
    formatter: &dyn OutputFormatter,
) -> Result<()> {
    let config = Config::load_or_default(config_path);
    info!(config_path = %config_path.display(), "Showing configuration");

    if format == OutputFormat::Json {
        let json =
            serde_json::to_value(&config).context("Failed to serialize configuration to JSON")?;
        formatter.print_json(&json);
    } else {
        formatter.success(&format!("Configuration ({})", config_path.display()));
        let yaml =
            serde_yaml::to_string(&config).context("Failed to serialize configuration to YAML")?;
        formatter.block(yaml.trim_end());
    }
    Ok(())
}

fn execute_validate(
    config_path: &Path,
    format: OutputFormat,
    formatter: &dyn OutputFormatter,
) -> Result<()> {
    if !config_path.exists() {
        anyhow::bail!(
            "Configuration file not found at {}. Run 'docmirror config init' to create one.",
            config_path.display()
        );
    }

    let config = Config::load(config_path)
        .with_context(|| format!("Failed to parse configuration {}", config_path.display()))?;

    info!(config_path = %config_path.display(), "Validating configuration");
    let errors = config.validate();

    if format == OutputFormat::Json {
        let error_strings: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        formatter.print_json(&serde_json::json!({
            "valid": errors.is_empty(),
            "config_path": config_path.display().to_string(),
            "errors": error_strings,
        }));
    } else if errors.is_empty() {
        formatter.success("Configuration is valid");
        formatter.info(&format!("File: {}", config_path.display()));
    } else {
        formatter.error(&format!(
            "Configuration has {} error{}:",
            errors.len(),
            plural(errors.len())
        ));
        formatter.info(&format!("File: {}", config_path.display()));
        for error in &errors {
            formatter.info(&format!("  {} - {}", error.field, error.message));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        anyhow::bail!("Configuration is invalid")
    }
}

fn execute_init(
    config: Config,
    config_path: &Path,
    format: OutputFormat,
    formatter: &dyn OutputFormatter,
) -> Result<()> {
    config.save(config_path)?;
    let missing: Vec<String> = config.validate().iter().map(|e| e.field.clone()).collect();
    info!(config_path = %config_path.display(), "Wrote configuration");

    if format == OutputFormat::Json {
        formatter.print_json(&serde_json::json!({
            "success": true,
            "config_path": config_path.display().to_string(),
            "incomplete": missing,
        }));
    } else {
        formatter.success(&format!("Wrote {}", config_path.display()));
        if !missing.is_empty() {
            formatter.info(&format!("Still to fill in: {}", missing.join(", ")));
        }
    }
    Ok(())
}

fn execute_set(
    config_path: &Path,
    key: &str,
    value: &str,
    format: OutputFormat,
    formatter: &dyn OutputFormatter,
) -> Result<()> {
    let mut config = Config::load_or_default(config_path);
    info!(key = %key, value = %value, "Setting configuration value");

    apply_config_value(&mut config, key, value)?;

    // Only reject the edit if it broke the key being set
    let errors: Vec<String> = config
        .validate()
        .iter()
        .filter(|e| e.field == key)
        .map(|e| e.message.clone())
        .collect();
    if !errors.is_empty() {
        anyhow::bail!("Invalid value for '{key}': {}", errors.join("; "));
    }

    config.save(config_path)?;

    if format == OutputFormat::Json {
        formatter.print_json(&serde_json::json!({
            "success": true,
            "key": key,
            "value": value,
            "config_path": config_path.display().to_string(),
        }));
    } else {
        formatter.success(&format!("Set {key} = {value}"));
        formatter.info(&format!("Saved to {}", config_path.display()));
    }
    Ok(())
}

/// Apply a dot-notation key/value pair to a Config struct
///
/// Supported keys:
/// - remote.site_url, remote.library_name, remote.page_size
/// - sync.target_path, sync.max_concurrent_transfers, sync.download_retries,
///   sync.retry_base_delay_ms
/// - auth.client_id, auth.tenant, auth.interactive
/// - logging.level, logging.log_path, logging.log_skipped
fn apply_config_value(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        // --- remote ---
        "remote.site_url" => config.remote.site_url = value.to_string(),
        "remote.library_name" => config.remote.library_name = value.to_string(),
        "remote.page_size" => {
            config.remote.page_size = value
                .parse::<u32>()
                .context("Expected a positive integer for remote.page_size")?;
        }

        // --- sync ---
        "sync.target_path" => config.sync.target_path = PathBuf::from(value),
        "sync.max_concurrent_transfers" => {
            config.sync.max_concurrent_transfers = value
                .parse::<u32>()
                .context("Expected a positive integer")?;
        }
        "sync.download_retries" => {
            config.sync.download_retries = value
                .parse::<u32>()
                .context("Expected a positive integer")?;
        }
        "sync.retry_base_delay_ms" => {
            config.sync.retry_base_delay_ms = value
                .parse::<u64>()
                .context("Expected a positive integer")?;
        }

        // --- auth ---
        "auth.client_id" => {
            config.auth.client_id = if value.is_empty() || value == "none" {
                None
            } else {
                Some(value.to_string())
            };
        }
        "auth.tenant" => config.auth.tenant = value.to_string(),
        "auth.interactive" => {
            config.auth.interactive = value
                .parse::<bool>()
                .context("Expected true or false")?;
        }

        // --- logging ---
        "logging.level" => config.logging.level = value.to_string(),
        "logging.log_path" => config.logging.log_path = PathBuf::from(value),
        "logging.log_skipped" => {
            config.logging.log_skipped = value
                .parse::<bool>()
                .context("Expected true or false")?;
        }

        _ => anyhow::bail!("Unknown configuration key: '{key}'"),
    }

    Ok(())
}
