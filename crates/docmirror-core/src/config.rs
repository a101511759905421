//! Configuration module for docmirror.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for docmirror.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub remote: RemoteConfig,
    pub sync: SyncConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
}

/// Remote document library settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Absolute URL of the site hosting the library,
    /// e.g. `https://contoso.sharepoint.com/sites/Team`.
    pub site_url: String,
    /// Display name of the document library, e.g. `Documents`.
    pub library_name: String,
    /// Number of items requested per listing page.
    pub page_size: u32,
}

/// Local mirror settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Root directory of the local mirror.
    pub target_path: PathBuf,
    /// Maximum number of files transferred at the same time (1 = sequential).
    pub max_concurrent_transfers: u32,
    /// Retries for a failed download before it is classified as an error.
    pub download_retries: u32,
    /// Base delay for exponential backoff between download retries.
    pub retry_base_delay_ms: u64,
}

/// Authentication / OAuth settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Azure AD Application (client) ID.
    pub client_id: Option<String>,
    /// Azure AD tenant: a tenant ID, a verified domain, or `organizations`.
    pub tenant: String,
    /// Interactive browser sign-in (`true`) or device-code sign-in (`false`).
    pub interactive: bool,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Path of the full-run transcript. The error report is written next to it.
    pub log_path: PathBuf,
    /// Log every skipped (already current) file at info level.
    pub log_skipped: bool,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Serialize the configuration to YAML and write it to `path`.
    ///
    /// Parent directories are created as needed.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/docmirror/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("docmirror")
            .join("config.yaml")
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Default number of items per listing page.
pub const DEFAULT_PAGE_SIZE: u32 = 500;

/// Upper bound accepted for `remote.page_size`.
pub const MAX_PAGE_SIZE: u32 = 5000;

/// Upper bound accepted for `sync.max_concurrent_transfers`.
pub const MAX_CONCURRENT_TRANSFERS: u32 = 32;

/// Upper bound accepted for `sync.download_retries`.
pub const MAX_DOWNLOAD_RETRIES: u32 = 10;

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            site_url: String::new(),
            library_name: "Documents".to_string(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            target_path: dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("~"))
                .join("DocMirror"),
            max_concurrent_transfers: 1,
            download_retries: 3,
            retry_base_delay_ms: 1000,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            tenant: "organizations".to_string(),
            interactive: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("docmirror");
        Self {
            level: "info".to_string(),
            log_path: data_dir.join("logs").join("docmirror.log"),
            log_skipped: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"remote.site_url"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- remote ---
        let site_url = self.remote.site_url.trim();
        if site_url.is_empty() {
            errors.push(ValidationError {
                field: "remote.site_url".into(),
                message: "is required".into(),
            });
        } else if !site_url.starts_with("https://") && !site_url.starts_with("http://") {
            errors.push(ValidationError {
                field: "remote.site_url".into(),
                message: format!("must be an absolute http(s) URL: {site_url}"),
            });
        }
        if self.remote.library_name.trim().is_empty() {
            errors.push(ValidationError {
                field: "remote.library_name".into(),
                message: "is required".into(),
            });
        }
        if self.remote.page_size == 0 || self.remote.page_size > MAX_PAGE_SIZE {
            errors.push(ValidationError {
                field: "remote.page_size".into(),
                message: format!("must be in range 1..={MAX_PAGE_SIZE}"),
            });
        }

        // --- sync ---
        if self.sync.target_path.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "sync.target_path".into(),
                message: "is required".into(),
            });
        }
        if self.sync.max_concurrent_transfers == 0
            || self.sync.max_concurrent_transfers > MAX_CONCURRENT_TRANSFERS
        {
            errors.push(ValidationError {
                field: "sync.max_concurrent_transfers".into(),
                message: format!("must be in range 1..={MAX_CONCURRENT_TRANSFERS}"),
            });
        }
        if self.sync.download_retries > MAX_DOWNLOAD_RETRIES {
            errors.push(ValidationError {
                field: "sync.download_retries".into(),
                message: format!("must not exceed {MAX_DOWNLOAD_RETRIES}"),
            });
        }

        // --- auth ---
        match self.auth.client_id.as_deref().map(str::trim) {
            None | Some("") => errors.push(ValidationError {
                field: "auth.client_id".into(),
                message: "is required".into(),
            }),
            Some(_) => {}
        }
        if self.auth.tenant.trim().is_empty() {
            errors.push(ValidationError {
                field: "auth.tenant".into(),
                message: "is required".into(),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }
        if self.logging.log_path.file_name().is_none() {
            errors.push(ValidationError {
                field: "logging.log_path".into(),
                message: format!(
                    "must name a file: {}",
                    self.logging.log_path.display()
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use docmirror_core::config::ConfigBuilder;
/// use std::path::PathBuf;
///
/// let config = ConfigBuilder::new()
///     .site_url("https://contoso.sharepoint.com/sites/Team")
///     .library_name("Documents")
///     .target_path(PathBuf::from("/srv/mirror"))
///     .client_id("00000000-0000-0000-0000-000000000000")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Create a builder that starts from an existing configuration.
    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    // --- remote ---

    pub fn site_url(mut self, url: impl Into<String>) -> Self {
        self.config.remote.site_url = url.into();
        self
    }

    pub fn library_name(mut self, name: impl Into<String>) -> Self {
        self.config.remote.library_name = name.into();
        self
    }

    pub fn page_size(mut self, size: u32) -> Self {
        self.config.remote.page_size = size;
        self
    }

    // --- sync ---

    pub fn target_path(mut self, path: PathBuf) -> Self {
        self.config.sync.target_path = path;
        self
    }

    pub fn max_concurrent_transfers(mut self, n: u32) -> Self {
        self.config.sync.max_concurrent_transfers = n;
        self
    }

    pub fn download_retries(mut self, n: u32) -> Self {
        self.config.sync.download_retries = n;
        self
    }

    pub fn retry_base_delay_ms(mut self, ms: u64) -> Self {
        self.config.sync.retry_base_delay_ms = ms;
        self
    }

    // --- auth ---

    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.config.auth.client_id = Some(client_id.into());
        self
    }

    pub fn tenant(mut self, tenant: impl Into<String>) -> Self {
        self.config.auth.tenant = tenant.into();
        self
    }

    pub fn interactive(mut self, interactive: bool) -> Self {
        self.config.auth.interactive = interactive;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn log_path(mut self, path: PathBuf) -> Self {
        self.config.logging.log_path = path;
        self
    }

    pub fn log_skipped(mut self, enabled: bool) -> Self {
        self.config.logging.log_skipped = enabled;
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
