//! Configuration structures for deserialisation.
//!
//! These structures map directly to the JSON configuration file format.
//! Credentials are never read from the file; they come from the environment.

use serde::Deserialize;
use url::Url;

use crate::error::ConfigError;

/// Default Graph API root, including the API version.
pub const DEFAULT_GRAPH_BASE_URL: &str = "https://graph.facebook.com/v19.0";

/// Default HTTP transport port.
pub const DEFAULT_HTTP_PORT: u16 = 8082;

/// Root configuration structure.
///
/// This is the top-level structure that matches the JSON config file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Optional JSON schema reference (ignored during parsing).
    #[serde(rename = "$schema", default)]
    _schema: Option<String>,

    /// Optional comment field (ignored during parsing).
    #[serde(rename = "_comment", default)]
    _comment: Option<String>,

    /// Graph API settings.
    #[serde(default)]
    pub graph: GraphConfig,

    /// HTTP transport settings.
    #[serde(default)]
    pub http: HttpConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Facebook credentials, filled from the environment only.
    #[serde(skip)]
    pub credentials: Credentials,
}

impl Config {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = Url::parse(&self.graph.base_url).map_err(|e| ConfigError::ValidationError {
            message: format!("Invalid Graph API base URL '{}': {e}", self.graph.base_url),
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "Graph API base URL must use http or https, got '{}'",
                    url.scheme()
                ),
            });
        }

        if self.http.port == 0 {
            return Err(ConfigError::ValidationError {
                message: "HTTP port must be non-zero".to_string(),
            });
        }

        Ok(())
    }

    /// Overlays environment variables on top of the file values.
    ///
    /// `lookup` is `std::env::var` in production; tests pass a closure.
    /// An invalid `PORT` is kept aside and only reported by
    /// [`HttpConfig::listen_port`], so it never blocks the stdio transport.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        self.credentials = Credentials {
            app_id: lookup("FB_APP_ID").unwrap_or_default(),
            app_secret: lookup("FB_APP_SECRET").unwrap_or_default(),
            access_token: lookup("FB_ACCESS_TOKEN").unwrap_or_default(),
        };

        if let Some(base_url) = lookup("FB_GRAPH_BASE_URL").filter(|s| !s.is_empty()) {
            self.graph.base_url = base_url;
        }

        if let Some(port) = lookup("PORT").filter(|s| !s.trim().is_empty()) {
            match port.trim().parse::<u16>() {
                Ok(parsed) if parsed != 0 => self.http.port = parsed,
                _ => self.http.invalid_port_env = Some(port),
            }
        }
    }
}

/// Graph API configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GraphConfig {
    /// Graph API root URL, including the version segment.
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_GRAPH_BASE_URL.to_string()
}

/// HTTP transport configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpConfig {
    /// Bind address.
    #[serde(default = "default_host")]
    pub host: String,

    /// Listen port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Raw `PORT` value that did not parse as a non-zero port.
    #[serde(skip)]
    pub invalid_port_env: Option<String>,
}

impl HttpConfig {
    /// Port the HTTP transport should bind.
    ///
    /// # Errors
    ///
    /// Returns an error if `PORT` was set to something other than a
    /// non-zero port number.
    pub fn listen_port(&self) -> Result<u16, ConfigError> {
        match &self.invalid_port_env {
            Some(raw) => Err(ConfigError::ValidationError {
                message: format!("Invalid PORT value '{raw}'"),
            }),
            None => Ok(self.port),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            invalid_port_env: None,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    DEFAULT_HTTP_PORT
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

/// Facebook application credentials.
#[derive(Clone, Default)]
pub struct Credentials {
    /// `FB_APP_ID`.
    pub app_id: String,
    /// `FB_APP_SECRET`.
    pub app_secret: String,
    /// `FB_ACCESS_TOKEN`, appended to every Graph API call.
    pub access_token: String,
}

impl Credentials {
    /// Names of the credential variables that are unset, empty or blank.
    #[must_use]
    pub fn missing(&self) -> Vec<&'static str> {
        [
            ("FB_APP_ID", &self.app_id),
            ("FB_APP_SECRET", &self.app_secret),
            ("FB_ACCESS_TOKEN", &self.access_token),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

// Hand-written so secrets never reach a log line.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("app_id", &self.app_id)
            .field("app_secret", &redact(&self.app_secret))
            .field("access_token", &redact(&self.access_token))
            .finish()
    }
}

const fn redact(value: &str) -> &'static str {
    if value.is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    }
}
