//! Error types for fb-insights-mcp.
//!
//! # Security Note
//!
//! Error messages are carefully crafted to NEVER include the access token.
//! Graph API URLs are logged and reported without their query string.

use std::path::PathBuf;

use serde_json::Value;
use thiserror::Error;

/// Prefix carried by every error `ToolResult` text.
pub const ERROR_PREFIX: &str = "Erro";

/// Errors that can occur during configuration operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed.
    #[error("failed to parse configuration file: {path}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    NotFound {
        /// Path where the configuration file was expected.
        path: PathBuf,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation failure.
        message: String,
    },
}

/// Faults raised by the Graph API client.
///
/// An error *response* from the API is not a fault; it is returned as
/// [`crate::graph::GraphOutcome::ApiError`].
#[derive(Error, Debug)]
pub enum GraphError {
    /// No access token is configured. Raised before any network I/O.
    #[error("missing Facebook access token (set FB_ACCESS_TOKEN)")]
    Configuration,

    /// The request could not be built (bad endpoint, unsupported method).
    #[error("invalid Graph API request: {0}")]
    InvalidRequest(String),

    /// Network failure, timeout, or a response body that is not JSON.
    #[error("Graph API transport failure: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for GraphError {
    fn from(err: reqwest::Error) -> Self {
        // without_url keeps the access_token query parameter out of messages
        Self::Transport(err.without_url().to_string())
    }
}

/// Errors surfaced by tool handlers.
///
/// Every variant is converted into an error `ToolResult` at the handler
/// boundary; none of them escape to the dispatcher.
#[derive(Error, Debug)]
pub enum ToolError {
    /// Bad or missing arguments.
    #[error("{0}")]
    Validation(String),

    /// The Graph API client is not configured.
    #[error("{0}")]
    Configuration(String),

    /// The Graph API answered with a structured error body.
    #[error("{payload}")]
    Api {
        /// Upstream HTTP status.
        status: u16,
        /// Upstream error body, verbatim.
        payload: Value,
    },

    /// Network or decoding failure.
    #[error("{0}")]
    Transport(String),
}

impl ToolError {
    /// Renders the error as the text of an error `ToolResult`.
    #[must_use]
    pub fn to_tool_text(&self) -> String {
        format!("{ERROR_PREFIX}: {self}")
    }
}

impl From<GraphError> for ToolError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::Configuration => Self::Configuration(err.to_string()),
            GraphError::InvalidRequest(_) => Self::Validation(err.to_string()),
            GraphError::Transport(_) => Self::Transport(err.to_string()),
        }
    }
}
