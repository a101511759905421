//! OAuth2 authentication for Microsoft Graph API
//!
//! Two flows are supported against the Microsoft identity platform:
//!
//! - Authorization Code with PKCE (RFC 7636), through the browser and a local
//!   callback server, for interactive use
//! - Device Authorization Grant (RFC 8628) for terminals without a browser;
//!   the user code is shown and the flow polls until sign-in completes
//!
//! ## Components
//!
//! - [`OAuth2Config`] - Tenant, client and scopes for the flows
//! - [`Tokens`] - Access/refresh token pair with expiry
//! - [`KeyringTokenStorage`] - Secure token storage using the system keyring
//! - [`PKCEFlow`] - OAuth2 PKCE challenge/exchange logic
//! - [`LocalCallbackServer`] - Minimal HTTP server for the OAuth redirect
//! - [`DeviceCodeFlow`] - Device code request and polling
//! - [`GraphSession`] - Cached, self-refreshing session used by the provider

use std::fmt;
use std::time::Duration as StdDuration;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use oauth2::basic::{BasicClient, BasicTokenResponse};
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, CsrfToken, DeviceAuthorizationUrl, EndpointNotSet,
    EndpointSet, PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, RefreshToken, Scope,
    StandardDeviceAuthorizationResponse, TokenResponse, TokenUrl,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Microsoft identity platform authority
pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";

/// Default redirect URI for the local callback server
const REDIRECT_URI: &str = "http://127.0.0.1:8400/callback";

/// Keyring service name for storing tokens
const KEYRING_SERVICE: &str = "docmirror";

/// Read-only scopes for SharePoint document libraries
const DEFAULT_SCOPES: &[&str] = &["Sites.Read.All", "Files.Read.All", "offline_access"];

/// Tokens this close to expiry are refreshed before use
const REFRESH_MARGIN_MINUTES: i64 = 5;

/// How long the browser flow waits for the redirect
const CALLBACK_TIMEOUT: StdDuration = StdDuration::from_secs(300);

// ============================================================================
// Tokens
// ============================================================================

/// OAuth2 tokens for one signed-in session
#[derive(Clone, Serialize, Deserialize)]
pub struct Tokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl Tokens {
    /// Whether the access token expires within `margin` from now
    pub fn expires_within(&self, margin: Duration) -> bool {
        self.expires_at <= Utc::now() + margin
    }

    fn from_response(response: &BasicTokenResponse, previous_refresh: Option<&str>) -> Self {
        let expires_at = response
            .expires_in()
            .map(|d| Utc::now() + Duration::seconds(d.as_secs() as i64))
            .unwrap_or_else(|| Utc::now() + Duration::hours(1));

        Self {
            access_token: response.access_token().secret().to_string(),
            refresh_token: response
                .refresh_token()
                .map(|t| t.secret().to_string())
                .or_else(|| previous_refresh.map(str::to_string)),
            expires_at,
        }
    }
}

impl fmt::Debug for Tokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tokens")
            .field("access_token", &"<redacted>")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

// ============================================================================
// OAuth2Config
// ============================================================================

/// Configuration for the OAuth2 flows
#[derive(Debug, Clone)]
pub struct OAuth2Config {
    /// Application (client) ID from the Entra ID app registration
    pub client_id: String,
    /// Tenant ID, domain, or `organizations`
    pub tenant: String,
    /// Identity platform base URL
    pub authority: String,
    /// Redirect URI for receiving the authorization code
    pub redirect_uri: String,
    /// OAuth scopes to request
    pub scopes: Vec<String>,
}

impl OAuth2Config {
    /// Creates a config for the given client and tenant with default settings
    pub fn new(client_id: impl Into<String>, tenant: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            tenant: tenant.into(),
            authority: DEFAULT_AUTHORITY.to_string(),
            redirect_uri: REDIRECT_URI.to_string(),
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Creates a config with custom scopes
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Creates a config with a custom redirect URI
    pub fn with_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uri = uri.into();
        self
    }

    /// Points the flows at another identity endpoint
    pub fn with_authority(mut self, authority: impl Into<String>) -> Self {
        self.authority = authority.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self, name: &str) -> String {
        format!("{}/{}/oauth2/v2.0/{name}", self.authority, self.tenant)
    }

    pub fn authorize_url(&self) -> String {
        self.endpoint("authorize")
    }

    pub fn token_url(&self) -> String {
        self.endpoint("token")
    }

    pub fn device_code_url(&self) -> String {
        self.endpoint("devicecode")
    }

    /// Keyring entry name for this tenant and client
    pub fn storage_key(&self) -> String {
        format!("{}/{}", self.tenant, self.client_id)
    }

    fn scopes(&self) -> impl Iterator<Item = Scope> + '_ {
        self.scopes.iter().map(|s| Scope::new(s.clone()))
    }
}

/// HTTP client for token endpoints; redirects are never followed
fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .context("Failed to build HTTP client for authentication")
}

/// Exchanges a refresh token for new tokens
///
/// The old refresh token is kept when the response does not rotate it.
pub async fn refresh_tokens(config: &OAuth2Config, refresh_token: &str) -> Result<Tokens> {
    info!("Refreshing access token");

    let client = BasicClient::new(ClientId::new(config.client_id.clone()))
        .set_token_uri(TokenUrl::new(config.token_url()).context("Invalid token URL")?);

    let response = client
        .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
        .add_scopes(config.scopes())
        .request_async(&http_client()?)
        .await
        .context("Failed to refresh token")?;

    info!("Successfully refreshed access token");
    Ok(Tokens::from_response(&response, Some(refresh_token)))
}

// ============================================================================
// KeyringTokenStorage
// ============================================================================

/// Stores and retrieves OAuth tokens from the system keyring
///
/// Tokens are serialized as JSON under the service name "docmirror", keyed
/// by `{tenant}/{client_id}` so several tenants can be cached side by side.
pub struct KeyringTokenStorage;

impl KeyringTokenStorage {
    /// Stores tokens in the system keyring under the given key
    pub fn store(key: &str, tokens: &Tokens) -> Result<()> {
        let entry =
            keyring::Entry::new(KEYRING_SERVICE, key).context("Failed to create keyring entry")?;

        let json = serde_json::to_string(tokens).context("Failed to serialize tokens")?;

        entry
            .set_password(&json)
            .context("Failed to store tokens in keyring")?;

        debug!(key, "Stored tokens in keyring");
        Ok(())
    }

    /// Loads tokens from the system keyring
    ///
    /// # Returns
    /// `Some(Tokens)` if found and valid, `None` if not found
    pub fn load(key: &str) -> Result<Option<Tokens>> {
        let entry =
            keyring::Entry::new(KEYRING_SERVICE, key).context("Failed to create keyring entry")?;

        match entry.get_password() {
            Ok(json) => {
                let tokens: Tokens = serde_json::from_str(&json)
                    .context("Failed to deserialize tokens from keyring")?;
                debug!(key, "Loaded tokens from keyring");
                Ok(Some(tokens))
            }
            Err(keyring::Error::NoEntry) => {
                debug!(key, "No tokens found in keyring");
                Ok(None)
            }
            Err(e) => Err(anyhow::Error::new(e).context("Failed to read from keyring")),
        }
    }

    /// Removes tokens from the system keyring
    ///
    /// Returns whether an entry was present.
    pub fn clear(key: &str) -> Result<bool> {
        let entry =
            keyring::Entry::new(KEYRING_SERVICE, key).context("Failed to create keyring entry")?;

        match entry.delete_credential() {
            Ok(()) => {
                info!(key, "Cleared tokens from keyring");
                Ok(true)
            }
            Err(keyring::Error::NoEntry) => {
                debug!(key, "No tokens to clear");
                Ok(false)
            }
            Err(e) => Err(anyhow::Error::new(e).context("Failed to delete from keyring")),
        }
    }
}

// ============================================================================
// PKCEFlow
// ============================================================================

/// OAuth2 PKCE flow implementation using the `oauth2` crate
pub struct PKCEFlow {
    client: BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>,
    config: OAuth2Config,
}

impl PKCEFlow {
    /// Creates a new PKCEFlow with the given configuration
    pub fn new(config: &OAuth2Config) -> Result<Self> {
        let client = BasicClient::new(ClientId::new(config.client_id.clone()))
            .set_auth_uri(AuthUrl::new(config.authorize_url()).context("Invalid authorization URL")?)
            .set_token_uri(TokenUrl::new(config.token_url()).context("Invalid token URL")?)
            .set_redirect_uri(
                RedirectUrl::new(config.redirect_uri.clone()).context("Invalid redirect URI")?,
            );

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// Generates an authorization URL with a PKCE challenge
    ///
    /// # Returns
    /// A tuple of `(authorization_url, csrf_token, pkce_verifier)`.
    /// The `pkce_verifier` must be kept until the code exchange step.
    pub fn generate_auth_url(&self) -> (String, CsrfToken, PkceCodeVerifier) {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let (auth_url, csrf_token) = self
            .client
            .authorize_url(CsrfToken::new_random)
            .add_scopes(self.config.scopes())
            .set_pkce_challenge(pkce_challenge)
            .url();

        debug!("Generated authorization URL");
        (auth_url.to_string(), csrf_token, pkce_verifier)
    }

    /// Exchanges an authorization code for OAuth tokens
    pub async fn exchange_code(
        &self,
        code: String,
        pkce_verifier: PkceCodeVerifier,
    ) -> Result<Tokens> {
        info!("Exchanging authorization code for tokens");

        let response = self
            .client
            .exchange_code(AuthorizationCode::new(code))
            .set_pkce_verifier(pkce_verifier)
            .request_async(&http_client()?)
            .await
            .context("Failed to exchange authorization code")?;

        info!("Successfully obtained OAuth tokens");
        Ok(Tokens::from_response(&response, None))
    }

    /// Runs the browser flow end to end
    ///
    /// Opens the authorization URL, waits for the redirect on the local
    /// callback server, checks the CSRF state and exchanges the code.
    pub async fn login(&self) -> Result<Tokens> {
        info!("Starting OAuth2 PKCE login flow");

        let (auth_url, csrf_token, pkce_verifier) = self.generate_auth_url();
        let server = LocalCallbackServer::bind(&self.config.redirect_uri).await?;

        info!("Opening browser for authentication");
        if let Err(e) = webbrowser::open(&auth_url) {
            warn!(error = %e, "Could not open a browser");
            eprintln!("Open this URL to sign in:\n\n  {auth_url}\n");
        }

        let callback = tokio::time::timeout(CALLBACK_TIMEOUT, server.wait())
            .await
            .context("Timed out waiting for the authentication redirect")??;

        if callback.state != *csrf_token.secret() {
            anyhow::bail!("Authentication callback state does not match the request");
        }

        self.exchange_code(callback.code, pkce_verifier).await
    }
}

// ============================================================================
// LocalCallbackServer
// ============================================================================

/// Minimal HTTP server that listens on localhost for the OAuth2 redirect
///
/// Binds to the host and port of the redirect URI, answers the browser with
/// a small HTML page and hands the authorization code back to the flow.
pub struct LocalCallbackServer {
    listener: tokio::net::TcpListener,
}

/// Parameters extracted from the OAuth2 callback
#[derive(Debug)]
pub struct CallbackParams {
    /// The authorization code
    pub code: String,
    /// The CSRF state parameter
    pub state: String,
}

impl LocalCallbackServer {
    /// Binds the listener for the given redirect URI
    pub async fn bind(redirect_uri: &str) -> Result<Self> {
        let url = url::Url::parse(redirect_uri).context("Invalid redirect URI")?;
        let host = url.host_str().unwrap_or("127.0.0.1");
        let port = url.port_or_known_default().unwrap_or(80);
        let address = format!("{host}:{port}");

        info!(%address, "Starting local OAuth callback server");
        let listener = tokio::net::TcpListener::bind(&address)
            .await
            .with_context(|| format!("Failed to bind callback server to {address}"))?;
        Ok(Self { listener })
    }

    /// Waits for the OAuth redirect
    ///
    /// # Returns
    /// The callback parameters (code and state) extracted from the redirect URL
    pub async fn wait(self) -> Result<CallbackParams> {
        use hyper::server::conn::http1;
        use hyper::service::service_fn;
        use hyper::{Request, StatusCode};
        use hyper_util::rt::TokioIo;
        use tokio::sync::oneshot;

        let (tx, mut rx) = oneshot::channel::<std::result::Result<CallbackParams, String>>();
        let tx = std::sync::Arc::new(Mutex::new(Some(tx)));

        let outcome = loop {
            let (stream, _addr) = tokio::select! {
                outcome = &mut rx => {
                    break outcome
                        .context("Callback server channel closed without receiving parameters")?;
                }
                accepted = self.listener.accept() => {
                    accepted.context("Failed to accept connection on callback server")?
                }
            };

            let io = TokioIo::new(stream);
            let tx_conn = tx.clone();

            let service = service_fn(move |req: Request<hyper::body::Incoming>| {
                let tx_inner = tx_conn.clone();
                async move {
                    let uri = req.uri().to_string();
                    debug!(uri = %uri, "Callback server received request");

                    let outcome = if let Some(params) = parse_callback_params(&uri) {
                        Ok(params)
                    } else if let Some(message) = parse_callback_error(&uri) {
                        Err(message)
                    } else {
                        return Ok::<_, hyper::Error>(html_response(
                            StatusCode::NOT_FOUND,
                            error_html("Missing authorization code in callback"),
                        ));
                    };

                    let response = match &outcome {
                        Ok(_) => html_response(StatusCode::OK, success_html()),
                        Err(message) => html_response(StatusCode::BAD_REQUEST, error_html(message)),
                    };
                    if let Some(sender) = tx_inner.lock().await.take() {
                        let _ = sender.send(outcome);
                    }
                    Ok(response)
                }
            });

            tokio::spawn(async move {
                if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                    warn!(error = %e, "Callback server connection error");
                }
            });
        };

        match outcome {
            Ok(params) => {
                info!("Received OAuth callback with authorization code");
                Ok(params)
            }
            Err(message) => anyhow::bail!("Sign-in was rejected: {message}"),
        }
    }
}

fn html_response(
    status: hyper::StatusCode,
    html: String,
) -> hyper::Response<http_body_util::Full<hyper::body::Bytes>> {
    let mut response = hyper::Response::new(http_body_util::Full::new(hyper::body::Bytes::from(html)));
    *response.status_mut() = status;
    response.headers_mut().insert(
        hyper::header::CONTENT_TYPE,
        hyper::header::HeaderValue::from_static("text/html; charset=utf-8"),
    );
    response
}

/// Parses the authorization code and state from a callback URI
fn parse_callback_params(uri: &str) -> Option<CallbackParams> {
    let url = url::Url::parse(&format!("http://localhost{uri}")).ok()?;
    let mut code = None;
    let mut state = None;

    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.to_string()),
            "state" => state = Some(value.to_string()),
            _ => {}
        }
    }

    Some(CallbackParams {
        code: code?,
        state: state.unwrap_or_default(),
    })
}

/// Parses an `error` redirect from the identity platform
fn parse_callback_error(uri: &str) -> Option<String> {
    let url = url::Url::parse(&format!("http://localhost{uri}")).ok()?;
    let mut error = None;
    let mut description = None;

    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "error" => error = Some(value.to_string()),
            "error_description" => description = Some(value.to_string()),
            _ => {}
        }
    }

    Some(match description {
        Some(description) => format!("{}: {description}", error?),
        None => error?,
    })
}

fn success_html() -> String {
    r#"<!DOCTYPE html>
<html>
<head><title>docmirror - Signed in</title></head>
<body style="font-family: sans-serif; text-align: center; padding-top: 50px;">
    <h1>Signed in</h1>
    <p>docmirror can now read your SharePoint libraries.</p>
    <p>You can close this window and return to the terminal.</p>
</body>
</html>"#
        .to_string()
}

fn error_html(message: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>docmirror - Sign-in failed</title></head>
<body style="font-family: sans-serif; text-align: center; padding-top: 50px;">
    <h1>Sign-in failed</h1>
    <p>{message}</p>
    <p>Please close this window and try again.</p>
</body>
</html>"#
    )
}

// ============================================================================
// DeviceCodeFlow
// ============================================================================

/// What the user needs to finish a device code sign-in
#[derive(Debug, Clone)]
pub struct DevicePrompt {
    pub verification_uri: String,
    pub user_code: String,
    pub expires_in: StdDuration,
}

/// OAuth2 Device Authorization Grant
pub struct DeviceCodeFlow {
    client: BasicClient<EndpointNotSet, EndpointSet, EndpointNotSet, EndpointNotSet, EndpointSet>,
    config: OAuth2Config,
}

impl DeviceCodeFlow {
    pub fn new(config: &OAuth2Config) -> Result<Self> {
        let client = BasicClient::new(ClientId::new(config.client_id.clone()))
            .set_device_authorization_url(
                DeviceAuthorizationUrl::new(config.device_code_url())
                    .context("Invalid device authorization URL")?,
            )
            .set_token_uri(TokenUrl::new(config.token_url()).context("Invalid token URL")?);

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// Requests a device code, shows it through `prompt` and polls until the
    /// user completes sign-in or the code expires
    pub async fn login(&self, prompt: &(dyn Fn(&DevicePrompt) + Send + Sync)) -> Result<Tokens> {
        info!("Starting OAuth2 device code flow");
        let http = http_client()?;

        let details: StandardDeviceAuthorizationResponse = self
            .client
            .exchange_device_code()
            .add_scopes(self.config.scopes())
            .request_async(&http)
            .await
            .context("Failed to request a device code")?;

        prompt(&DevicePrompt {
            verification_uri: details.verification_uri().to_string(),
            user_code: details.user_code().secret().to_string(),
            expires_in: details.expires_in(),
        });

        let response = self
            .client
            .exchange_device_access_token(&details)
            .request_async(&http, tokio::time::sleep, None)
            .await
            .context("Device code sign-in did not complete")?;

        info!("Successfully obtained OAuth tokens");
        Ok(Tokens::from_response(&response, None))
    }
}

// ============================================================================
// GraphSession
// ============================================================================

/// How a new sign-in is performed when no usable tokens are cached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginMethod {
    /// Authorization code with PKCE through the browser
    Browser,
    /// Device code printed to the terminal
    DeviceCode,
}

/// An authenticated session that keeps its access token fresh
///
/// When `persist` is set, tokens are read from and written back to the
/// system keyring under [`OAuth2Config::storage_key`].
pub struct GraphSession {
    config: OAuth2Config,
    persist: bool,
    tokens: Mutex<Tokens>,
}

impl GraphSession {
    /// Wraps tokens that are already known
    pub fn from_tokens(config: OAuth2Config, tokens: Tokens, persist: bool) -> Self {
        Self {
            config,
            persist,
            tokens: Mutex::new(tokens),
        }
    }

    /// Establishes a session
    ///
    /// Cached tokens are used when present, refreshed when close to expiry,
    /// and a new sign-in with `method` happens only when neither works.
    pub async fn connect(
        config: OAuth2Config,
        method: LoginMethod,
        prompt: &(dyn Fn(&DevicePrompt) + Send + Sync),
        persist: bool,
    ) -> Result<Self> {
        let key = config.storage_key();

        let cached = if persist {
            KeyringTokenStorage::load(&key).unwrap_or_else(|e| {
                warn!(error = %e, "Could not read cached tokens");
                None
            })
        } else {
            None
        };

        let mut tokens = None;
        if let Some(cached) = cached {
            if !cached.expires_within(Duration::minutes(REFRESH_MARGIN_MINUTES)) {
                info!("Using cached session");
                tokens = Some(cached);
            } else if let Some(refresh) = cached.refresh_token.as_deref() {
                match refresh_tokens(&config, refresh).await {
                    Ok(fresh) => tokens = Some(fresh),
                    Err(e) => warn!(error = %e, "Cached session could not be refreshed"),
                }
            }
        }

        let tokens = match tokens {
            Some(tokens) => tokens,
            None => match method {
                LoginMethod::Browser => PKCEFlow::new(&config)?.login().await?,
                LoginMethod::DeviceCode => DeviceCodeFlow::new(&config)?.login(prompt).await?,
            },
        };

        let session = Self::from_tokens(config, tokens, persist);
        session.save(&*session.tokens.lock().await);
        Ok(session)
    }

    /// Returns a valid access token, refreshing it first if needed
    pub async fn access_token(&self) -> Result<String> {
        let mut tokens = self.tokens.lock().await;

        if tokens.expires_within(Duration::minutes(REFRESH_MARGIN_MINUTES)) {
            match tokens.refresh_token.clone() {
                Some(refresh) => {
                    let fresh = refresh_tokens(&self.config, &refresh).await?;
                    self.save(&fresh);
                    *tokens = fresh;
                }
                None => warn!("Access token is expiring and no refresh token is available"),
            }
        }

        Ok(tokens.access_token.clone())
    }

    /// Current token expiry
    pub async fn expires_at(&self) -> DateTime<Utc> {
        self.tokens.lock().await.expires_at
    }

    pub fn config(&self) -> &OAuth2Config {
        &self.config
    }

    /// Removes the cached session for a tenant and client
    pub fn logout(config: &OAuth2Config) -> Result<bool> {
        KeyringTokenStorage::clear(&config.storage_key())
    }

    fn save(&self, tokens: &Tokens) {
        if !self.persist {
            return;
        }
        if let Err(e) = KeyringTokenStorage::store(&self.config.storage_key(), tokens) {
            warn!(error = %e, "Could not cache tokens");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oauth2_config_defaults() {
        let config = OAuth2Config::new("test-app-id", "organizations");
        assert_eq!(config.client_id, "test-app-id");
        assert_eq!(config.redirect_uri, REDIRECT_URI);
        assert_eq!(config.scopes.len(), 3);
        assert!(config.scopes.contains(&"Sites.Read.All".to_string()));
        assert!(config.scopes.contains(&"offline_access".to_string()));
    }

    #[test]
    fn test_tenant_endpoints() {
        let config = OAuth2Config::new("app", "contoso.onmicrosoft.com");
        assert_eq!(
            config.token_url(),
            "https://login.microsoftonline.com/contoso.onmicrosoft.com/oauth2/v2.0/token"
        );
        assert_eq!(
            config.device_code_url(),
            "https://login.microsoftonline.com/contoso.onmicrosoft.com/oauth2/v2.0/devicecode"
        );
        assert_eq!(config.storage_key(), "contoso.onmicrosoft.com/app");
    }

    #[test]
    fn test_custom_authority_trailing_slash() {
        let config = OAuth2Config::new("app", "t").with_authority("http://127.0.0.1:9000/");
        assert_eq!(config.authorize_url(), "http://127.0.0.1:9000/t/oauth2/v2.0/authorize");
    }

    #[test]
    fn test_pkce_flow_generates_auth_url() {
        let config = OAuth2Config::new("test-app-id", "organizations");
        let flow = PKCEFlow::new(&config).unwrap();
        let (url, _csrf, _verifier) = flow.generate_auth_url();

        assert!(url.starts_with("https://login.microsoftonline.com/organizations/"));
        assert!(url.contains("test-app-id"));
        assert!(url.contains("code_challenge"));
        assert!(url.contains("Sites.Read.All"));
    }

    #[test]
    fn test_device_flow_creation() {
        let config = OAuth2Config::new("test-app-id", "organizations");
        assert!(DeviceCodeFlow::new(&config).is_ok());
    }

    #[test]
    fn test_tokens_expiry_margin() {
        let tokens = Tokens {
            access_token: "a".into(),
            refresh_token: None,
            expires_at: Utc::now() + Duration::minutes(3),
        };
        assert!(tokens.expires_within(Duration::minutes(5)));
        assert!(!tokens.expires_within(Duration::minutes(1)));
    }

    #[test]
    fn test_tokens_debug_redacts_secret() {
        let tokens = Tokens {
            access_token: "super-secret".into(),
            refresh_token: Some("also-secret".into()),
            expires_at: Utc::now(),
        };
        let debug = format!("{tokens:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("has_refresh_token: true"));
    }

    #[test]
    fn test_parse_callback_params_valid() {
        let params = parse_callback_params("/callback?code=0.AAA.abc123&state=xyz789").unwrap();
        assert_eq!(params.code, "0.AAA.abc123");
        assert_eq!(params.state, "xyz789");
    }

    #[test]
    fn test_parse_callback_params_missing_code() {
        assert!(parse_callback_params("/callback?state=xyz789").is_none());
    }

    #[test]
    fn test_parse_callback_error() {
        let message = parse_callback_error(
            "/callback?error=access_denied&error_description=User%20cancelled",
        )
        .unwrap();
        assert_eq!(message, "access_denied: User cancelled");
        assert!(parse_callback_error("/favicon.ico").is_none());
    }

    #[test]
    fn test_error_html_contains_message() {
        let html = error_html("test error message");
        assert!(html.contains("test error message"));
        assert!(html.contains("Sign-in failed"));
    }

    #[tokio::test]
    async fn test_session_returns_fresh_token_without_refresh() {
        let session = GraphSession::from_tokens(
            OAuth2Config::new("app", "t"),
            Tokens {
                access_token: "current".into(),
                refresh_token: None,
                expires_at: Utc::now() + Duration::hours(1),
            },
            false,
        );
        assert_eq!(session.access_token().await.unwrap(), "current");
    }
}
