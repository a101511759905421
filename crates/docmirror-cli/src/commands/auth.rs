//! Auth commands - Login, Logout, and Status for the cached session
//!
//! Provides the `docmirror auth` CLI subcommands which:
//! 1. `login`  - Signs in (browser or device code) and caches the tokens in
//!    the system keyring for the configured tenant and client.
//! 2. `logout` - Removes the cached tokens.
//! 3. `status` - Shows whether a session is cached and when it expires.

use anyhow::{Context, Result};
use chrono::{Local, Utc};
use clap::Subcommand;
use docmirror_core::config::Config;
use docmirror_graph::auth::{GraphSession, KeyringTokenStorage};
use tracing::info;

use crate::output::{get_formatter, OutputFormat, OutputFormatter};

#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    /// Sign in and cache the session
    Login {
        /// Application (client) ID of the app registration
        #[arg(long)]
        client_id: Option<String>,
        /// Tenant ID or domain
        #[arg(long)]
        tenant: Option<String>,
        /// Sign in with a device code instead of the browser
        #[arg(long)]
        device_code: bool,
    },
    /// Remove the cached session
    Logout {
        #[arg(long)]
        client_id: Option<String>,
        #[arg(long)]
        tenant: Option<String>,
    },
    /// Show the cached session
    Status,
}

impl AuthCommand {
    pub async fn execute(&self, config: Config, format: OutputFormat, quiet: bool) -> Result<()> {
        let fmt = get_formatter(format, quiet);
        match self {
            AuthCommand::Login {
                client_id,
                tenant,
                device_code,
            } => {
                let mut config = with_identity(config, client_id.as_deref(), tenant.as_deref());
                if *device_code {
                    config.auth.interactive = false;
                }
                execute_login(&config, format, &*fmt).await
            }
            AuthCommand::Logout { client_id, tenant } => {
                let config = with_identity(config, client_id.as_deref(), tenant.as_deref());
                execute_logout(&config, format, &*fmt)
            }
            AuthCommand::Status => execute_status(&config, format, &*fmt),
        }
    }
}

fn with_identity(mut config: Config, client_id: Option<&str>, tenant: Option<&str>) -> Config {
    if let Some(id) = client_id {
        config.auth.client_id = Some(id.to_string());
    }
    if let Some(tenant) = tenant {
        config.auth.tenant = tenant.to_string();
    }
    config
}

async fn execute_login(
    config: &Config,
    format: OutputFormat,
    fmt: &dyn OutputFormatter,
) -> Result<()> {
    if config.auth.interactive {
        fmt.info("Opening browser for Microsoft sign-in...");
    }

    let session = super::connect(config, format).await?;
    let expires_at = session.expires_at().await;
    info!(tenant = %session.config().tenant, %expires_at, "Signed in");

    if format == OutputFormat::Json {
        fmt.print_json(&serde_json::json!({
            "success": true,
            "tenant": session.config().tenant,
            "client_id": session.config().client_id,
            "expires_at": expires_at.to_rfc3339(),
        }));
    } else {
        fmt.success(&format!("Signed in to tenant {}", session.config().tenant));
        fmt.info(&format!(
            "Access token valid until {}",
            expires_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
        ));
    }
    Ok(())
}

fn execute_logout(config: &Config, format: OutputFormat, fmt: &dyn OutputFormatter) -> Result<()> {
    let oauth = super::oauth_config(config)?;
    let removed = GraphSession::logout(&oauth).context("Failed to clear cached session")?;
    info!(key = %oauth.storage_key(), removed, "Logout");

    if format == OutputFormat::Json {
        fmt.print_json(&serde_json::json!({ "success": true, "removed": removed }));
    } else if removed {
        fmt.success("Cached session removed");
    } else {
        fmt.info("No cached session. Nothing to log out.");
    }
    Ok(())
}

fn execute_status(config: &Config, format: OutputFormat, fmt: &dyn OutputFormatter) -> Result<()> {
    let oauth = super::oauth_config(config)?;
    let tokens = KeyringTokenStorage::load(&oauth.storage_key())?;

    let status = match &tokens {
        None => "signed_out",
        Some(t) if t.expires_at > Utc::now() => "valid",
        Some(t) if t.refresh_token.is_some() => "refreshable",
        Some(_) => "expired",
    };

    if format == OutputFormat::Json {
        fmt.print_json(&serde_json::json!({
            "tenant": oauth.tenant,
            "client_id": oauth.client_id,
            "status": status,
            "expires_at": tokens.as_ref().map(|t| t.expires_at.to_rfc3339()),
        }));
        return Ok(());
    }

    match tokens {
        None => fmt.info("Not signed in. Run 'docmirror auth login'."),
        Some(t) => {
            fmt.success(&format!("Session cached for tenant {} ({status})", oauth.tenant));
            fmt.info(&format!(
                "Access token expires {}",
                t.expires_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_identity_overrides() {
        let config = with_identity(
            Config::default(),
            Some("client-1"),
            Some("contoso.onmicrosoft.com"),
        );
        assert_eq!(config.auth.client_id.as_deref(), Some("client-1"));
        assert_eq!(config.auth.tenant, "contoso.onmicrosoft.com");
    }

    #[test]
    fn test_with_identity_keeps_config_values() {
        let mut base = Config::default();
        base.auth.client_id = Some("from-file".into());
        let config = with_identity(base, None, None);
        assert_eq!(config.auth.client_id.as_deref(), Some("from-file"));
        assert_eq!(config.auth.tenant, "organizations");
    }

    #[test]
    fn test_logout_requires_client_id() {
        let fmt = get_formatter(OutputFormat::Human, true);
        let err = execute_logout(&Config::default(), OutputFormat::Human, &*fmt).unwrap_err();
        assert!(err.to_string().contains("client ID"));
    }
}
