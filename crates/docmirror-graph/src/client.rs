//! Microsoft Graph API client
//!
//! Provides a typed HTTP client for interacting with the Microsoft Graph API.
//! Handles authentication headers, throttling (HTTP 429), status mapping to
//! [`GraphError`] and JSON deserialization.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use docmirror_graph::client::GraphClient;
//!
//! # async fn example() -> Result<(), docmirror_graph::GraphError> {
//! let client = GraphClient::new("access-token-here");
//! let site: serde_json::Value = client
//!     .get_json("/sites/contoso.sharepoint.com:/sites/Team")
//!     .await?;
//! println!("{site}");
//! # Ok(())
//! # }
//! ```

use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::GraphError;

/// Base URL for Microsoft Graph API v1.0
const GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";

/// Default retry-after duration when header is missing (30 seconds)
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(30);

/// Longest Retry-After honoured before giving up on a throttled request
const MAX_RETRY_AFTER: Duration = Duration::from_secs(300);

/// Maximum number of retries for 429 responses
const DEFAULT_MAX_THROTTLE_RETRIES: u32 = 5;

// ============================================================================
// GraphClient
// ============================================================================

/// HTTP client for Microsoft Graph API calls
///
/// Wraps `reqwest::Client` with authentication headers and base URL
/// construction. The access token can be swapped while the client is shared,
/// so a long run can continue after a token refresh.
pub struct GraphClient {
    /// The underlying HTTP client
    client: Client,
    /// Base URL for API requests
    base_url: String,
    /// Current OAuth2 access token
    access_token: RwLock<String>,
    /// Retries for throttled (429) responses
    max_throttle_retries: u32,
}

impl GraphClient {
    /// Creates a new GraphClient with the given access token
    pub fn new(access_token: impl Into<String>) -> Self {
        Self::with_base_url(access_token, GRAPH_BASE_URL)
    }

    /// Creates a new GraphClient with a custom base URL (useful for testing)
    pub fn with_base_url(access_token: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: RwLock::new(access_token.into()),
            max_throttle_retries: DEFAULT_MAX_THROTTLE_RETRIES,
        }
    }

    /// Sets how many times a throttled request is retried
    #[must_use]
    pub fn with_max_throttle_retries(mut self, retries: u32) -> Self {
        self.max_throttle_retries = retries;
        self
    }

    /// Updates the access token (e.g., after a token refresh)
    pub fn set_access_token(&self, token: impl Into<String>) {
        *self
            .access_token
            .write()
            .unwrap_or_else(PoisonError::into_inner) = token.into();
        debug!("Updated GraphClient access token");
    }

    /// Returns the current access token
    pub fn access_token(&self) -> String {
        self.access_token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the base URL for API requests
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolves a path relative to the base URL, or passes an absolute URL
    /// (such as an `@odata.nextLink`) through unchanged
    pub fn url_for(&self, path_or_url: &str) -> String {
        if path_or_url.starts_with("http://") || path_or_url.starts_with("https://") {
            path_or_url.to_string()
        } else {
            format!("{}{}", self.base_url, path_or_url)
        }
    }

    /// Creates an authenticated request builder for the given method and path
    ///
    /// Automatically prepends the base URL (for relative paths) and adds the
    /// Authorization header.
    pub fn request(&self, method: Method, path_or_url: &str) -> RequestBuilder {
        self.client
            .request(method, self.url_for(path_or_url))
            .bearer_auth(self.access_token())
    }

    /// Sends a GET request with throttling handled, returning the successful
    /// response or the mapped error
    pub async fn get(&self, path_or_url: &str) -> Result<Response, GraphError> {
        self.execute_with_retry(Method::GET, path_or_url).await
    }

    /// Sends a GET request and deserializes the JSON body
    pub async fn get_json<T: DeserializeOwned>(&self, path_or_url: &str) -> Result<T, GraphError> {
        let response = self.get(path_or_url).await?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            GraphError::InvalidResponse(format!("Failed to parse response from {path_or_url}: {e}"))
        })
    }

    /// Executes an HTTP request with automatic 429 retry.
    ///
    /// On HTTP 429 (Too Many Requests) the `Retry-After` header is honoured
    /// and the request is sent again, up to the configured retry count. Any
    /// other unsuccessful status is mapped to a [`GraphError`].
    pub async fn execute_with_retry(
        &self,
        method: Method,
        path_or_url: &str,
    ) -> Result<Response, GraphError> {
        let mut attempt = 0u32;
        loop {
            let response = self.request(method.clone(), path_or_url).send().await?;
            let status = response.status();

            if status.is_success() {
                if attempt > 0 {
                    info!(path = path_or_url, attempt, "Request succeeded after retry");
                }
                return Ok(response);
            }

            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .map(|v| parse_retry_after(v, DEFAULT_RETRY_AFTER))
                .unwrap_or(DEFAULT_RETRY_AFTER);

            if status == StatusCode::TOO_MANY_REQUESTS
                && attempt < self.max_throttle_retries
                && retry_after <= MAX_RETRY_AFTER
            {
                info!(
                    path = path_or_url,
                    attempt,
                    retry_after_ms = retry_after.as_millis() as u64,
                    "Received 429, backing off"
                );
                tokio::time::sleep(retry_after).await;
                attempt += 1;
                continue;
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                warn!(path = path_or_url, attempts = attempt + 1, "429 retry limit exhausted");
            }

            let body = response.text().await.unwrap_or_default();
            return Err(GraphError::from_status(status, &body, retry_after));
        }
    }
}

/// Parses a `Retry-After` header value (seconds or HTTP-date)
pub fn parse_retry_after(value: &str, default: Duration) -> Duration {
    // Try parsing as integer seconds first (most common for Graph API)
    if let Ok(seconds) = value.trim().parse::<u64>() {
        return Duration::from_secs(seconds);
    }

    if let Ok(date) = chrono::DateTime::parse_from_rfc2822(value.trim()) {
        let target = date.with_timezone(&chrono::Utc);
        let now = chrono::Utc::now();
        if target > now {
            if let Ok(diff) = (target - now).to_std() {
                return diff;
            }
        }
        return Duration::ZERO;
    }

    warn!(value, "Could not parse Retry-After header, using default");
    default
}
