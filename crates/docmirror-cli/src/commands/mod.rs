//! CLI subcommands

pub mod auth;
pub mod config;
pub mod sync;

use anyhow::{Context, Result};
use docmirror_core::config::Config;
use docmirror_graph::auth::{DevicePrompt, GraphSession, LoginMethod, OAuth2Config};
use tracing::info;

use crate::output::OutputFormat;

/// OAuth2 settings for the configured tenant and client
pub(crate) fn oauth_config(config: &Config) -> Result<OAuth2Config> {
    let client_id = config
        .auth
        .client_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .context("No client ID configured. Use --client-id or set auth.client_id in config.yaml")?;
    Ok(OAuth2Config::new(client_id, config.auth.tenant.trim()))
}

/// Signs in (or reuses the cached session) for the configured tenant
pub(crate) async fn connect(config: &Config, format: OutputFormat) -> Result<GraphSession> {
    let oauth = oauth_config(config)?;
    let method = if config.auth.interactive {
        LoginMethod::Browser
    } else {
        LoginMethod::DeviceCode
    };
    info!(tenant = %oauth.tenant, ?method, "Connecting to Microsoft Graph");

    let json = format == OutputFormat::Json;
    let prompt = move |prompt: &DevicePrompt| {
        if json {
            eprintln!(
                "{}",
                serde_json::json!({
                    "verification_uri": prompt.verification_uri,
                    "user_code": prompt.user_code,
                    "expires_in_secs": prompt.expires_in.as_secs(),
                })
            );
        } else {
            eprintln!(
                "To sign in, open {} and enter the code {} (valid for {} minutes)",
                prompt.verification_uri,
                prompt.user_code,
                prompt.expires_in.as_secs() / 60
            );
        }
    };

    GraphSession::connect(oauth, method, &prompt, true)
        .await
        .context("Authentication failed")
}
