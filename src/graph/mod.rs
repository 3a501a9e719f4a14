//! Facebook Graph API access.
//!
//! Handlers talk to the API through the [`GraphApi`] trait so the transport
//! and dispatcher layers can be exercised against a stub. [`GraphClient`] is
//! the production implementation.
//!
//! The client distinguishes two failure classes:
//!
//! - **API said no**: the response carried a JSON error body. Returned as
//!   [`GraphOutcome::ApiError`], never raised.
//! - **Fault**: missing token, network failure, non-JSON body. Raised as
//!   [`GraphError`].

pub mod client;

use std::fmt;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::GraphError;

pub use client::GraphClient;

/// HTTP method of a Graph API call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HttpMethod {
    /// Read.
    #[default]
    Get,
    /// Create or update.
    Post,
    /// Delete.
    Delete,
}

impl HttpMethod {
    /// Parses a method name, case-insensitively.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            "DELETE" => Some(Self::Delete),
            _ => None,
        }
    }

    /// Upper-case method name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One outbound Graph API call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GraphRequest {
    /// Path relative to the base URL, e.g. `act_123/campaigns`.
    pub endpoint: String,
    /// HTTP method.
    pub method: HttpMethod,
    /// Query parameters. The access token is added by the client.
    pub query: Map<String, Value>,
    /// JSON body, sent only for non-GET methods.
    pub body: Option<Value>,
}

impl GraphRequest {
    /// Creates a GET request for `endpoint` with no parameters.
    #[must_use]
    pub fn get(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    /// Adds a query parameter.
    #[must_use]
    pub fn param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.query.insert(key.to_string(), value.into());
        self
    }

    /// Returns a query parameter, if set.
    #[must_use]
    pub fn query_param(&self, key: &str) -> Option<&Value> {
        self.query.get(key)
    }
}

/// The result of a Graph API call that reached the API.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphOutcome {
    /// 2xx response.
    Success {
        /// HTTP status code.
        status: u16,
        /// Parsed response body.
        payload: Value,
    },
    /// Non-2xx response with a JSON body.
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Parsed error body.
        payload: Value,
    },
}

impl GraphOutcome {
    /// HTTP status code of the response.
    #[must_use]
    pub const fn status(&self) -> u16 {
        match self {
            Self::Success { status, .. } | Self::ApiError { status, .. } => *status,
        }
    }
}

/// The single capability the tool handlers need from the Graph API.
#[async_trait]
pub trait GraphApi: Send + Sync {
    /// Executes one call.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError`] for faults: missing token, unbuildable request,
    /// network failure, or a response body that is not JSON.
    async fn request(&self, request: GraphRequest) -> Result<GraphOutcome, GraphError>;
}
