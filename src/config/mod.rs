//! Configuration file loading and environment overlay.
//!
//! # Configuration File Locations
//!
//! The configuration file is optional and searched in the following order:
//!
//! 1. Path specified via `--config` CLI flag (must exist)
//! 2. Default location, used only if present:
//!    - **Linux/macOS:** `~/.fb-insights-mcp/config.json`
//!    - **Windows:** `%USERPROFILE%\.fb-insights-mcp\config.json`
//!
//! # Environment
//!
//! `FB_APP_ID`, `FB_APP_SECRET`, `FB_ACCESS_TOKEN`, `PORT` and
//! `FB_GRAPH_BASE_URL` are applied on top of the file values.

mod settings;

pub use settings::{
    Config, Credentials, GraphConfig, HttpConfig, LoggingConfig, DEFAULT_GRAPH_BASE_URL,
    DEFAULT_HTTP_PORT,
};

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Returns the default configuration directory.
///
/// - **Linux/macOS:** `~/.fb-insights-mcp/`
/// - **Windows:** `%USERPROFILE%\.fb-insights-mcp\`
#[must_use]
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|p| p.join(".fb-insights-mcp"))
}

/// Returns the platform-specific default configuration file path.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    default_config_dir().map(|p| p.join("config.json"))
}

/// Loads the configuration file (if any) and overlays the process environment.
///
/// # Errors
///
/// Returns an error if:
/// - An explicit `path` does not exist
/// - The file cannot be read
/// - The JSON is malformed
/// - An environment override is invalid
/// - Validation fails
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    load_config_with(path, |key| std::env::var(key).ok())
}

/// Like [`load_config`], reading environment variables through `lookup`.
///
/// # Errors
///
/// See [`load_config`].
pub fn load_config_with<F>(path: Option<&Path>, lookup: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(p) => {
            if !p.exists() {
                return Err(ConfigError::NotFound {
                    path: p.to_path_buf(),
                });
            }
            read_config_file(p)?
        }
        None => match default_config_path().filter(|p| p.exists()) {
            Some(p) => read_config_file(&p)?,
            None => Config::default(),
        },
    };

    config.apply_env(lookup);

    // Validate the configuration
    config.validate()?;

    Ok(config)
}

fn read_config_file(path: &Path) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    serde_json::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })
}
