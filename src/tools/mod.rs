//! The tool handler table.
//!
//! Each tool is a [`ToolKind`] variant. Dispatch over the closed enum is an
//! exhaustive `match`, so adding a tool without a definition or a request
//! plan fails to compile.
//!
//! [`ToolHandlers::execute`] is infallible: validation failures, API errors
//! and client faults all come back as an error [`ToolCallResult`].

pub mod args;
pub mod definitions;

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::{ToolError, ERROR_PREFIX};
use crate::graph::{GraphApi, GraphOutcome};

pub use definitions::{all_definitions, definition};

/// Every tool this server exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    /// `facebook-list-ad-accounts`
    ListAdAccounts,
    /// `facebook-account-info`
    AccountInfo,
    /// `facebook-insights-get`
    InsightsGet,
    /// `facebook-campaigns`
    Campaigns,
    /// `facebook-adsets`
    AdSets,
    /// `facebook-ads`
    Ads,
    /// `facebook-insights`, the generic Graph API passthrough.
    Passthrough,
}

impl ToolKind {
    /// All tools, in catalogue order.
    pub const ALL: [Self; 7] = [
        Self::ListAdAccounts,
        Self::AccountInfo,
        Self::InsightsGet,
        Self::Campaigns,
        Self::AdSets,
        Self::Ads,
        Self::Passthrough,
    ];

    /// Wire name of the tool.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ListAdAccounts => "facebook-list-ad-accounts",
            Self::AccountInfo => "facebook-account-info",
            Self::InsightsGet => "facebook-insights-get",
            Self::Campaigns => "facebook-campaigns",
            Self::AdSets => "facebook-adsets",
            Self::Ads => "facebook-ads",
            Self::Passthrough => "facebook-insights",
        }
    }

    /// Looks a tool up by wire name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Human-readable label prefixed to successful results.
    const fn success_prefix(self) -> &'static str {
        match self {
            Self::ListAdAccounts => "Ad accounts",
            Self::AccountInfo => "Account information",
            Self::InsightsGet => "Insights",
            Self::Campaigns => "Campaigns",
            Self::AdSets => "Ad sets",
            Self::Ads => "Ads",
            Self::Passthrough => "Graph API response",
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A tool definition for listing responses.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON Schema for the tool's input parameters.
    pub input_schema: Value,
}

/// Content item in a tool call response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    /// Text content.
    Text {
        /// The text content.
        text: String,
    },
}

/// Result of a tool call.
///
/// Always carries at least one content block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    /// Content returned by the tool.
    pub content: Vec<ToolContent>,
    /// Whether the tool call resulted in an error.
    pub is_error: bool,
}

impl ToolCallResult {
    /// Creates a successful text result.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
            is_error: false,
        }
    }

    /// Creates an error text result.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text {
                text: message.into(),
            }],
            is_error: true,
        }
    }

    /// Creates the error result for a tool name that is not in the table.
    #[must_use]
    pub fn unknown_tool(name: &str) -> Self {
        Self::error(format!("{ERROR_PREFIX}: Unknown tool: {name}"))
    }

    /// Text of the first content block.
    #[must_use]
    pub fn first_text(&self) -> &str {
        match self.content.first() {
            Some(ToolContent::Text { text }) => text,
            None => "",
        }
    }
}

/// The tool handler table, backed by a Graph API client.
#[derive(Clone)]
pub struct ToolHandlers {
    graph: Arc<dyn GraphApi>,
}

impl ToolHandlers {
    /// Creates the table around `graph`.
    #[must_use]
    pub fn new(graph: Arc<dyn GraphApi>) -> Self {
        Self { graph }
    }

    /// Runs `kind` with `arguments`.
    pub async fn execute(&self, kind: ToolKind, arguments: &Value) -> ToolCallResult {
        info!(tool = %kind, "Executing tool");

        match self.try_execute(kind, arguments).await {
            Ok(payload) => {
                let pretty = serde_json::to_string_pretty(&payload)
                    .unwrap_or_else(|_| payload.to_string());
                ToolCallResult::text(format!("{}: {pretty}", kind.success_prefix()))
            }
            Err(e) => {
                warn!(tool = %kind, error = %e, "Tool call failed");
                ToolCallResult::error(e.to_tool_text())
            }
        }
    }

    /// Runs the tool named `name`; unknown names yield an error result.
    pub async fn call(&self, name: &str, arguments: &Value) -> ToolCallResult {
        match ToolKind::from_name(name) {
            Some(kind) => self.execute(kind, arguments).await,
            None => {
                warn!(tool = name, "Unknown tool requested");
                ToolCallResult::unknown_tool(name)
            }
        }
    }

    async fn try_execute(&self, kind: ToolKind, arguments: &Value) -> Result<Value, ToolError> {
        let request = args::plan(kind, arguments)?;

        match self.graph.request(request).await? {
            GraphOutcome::Success { payload, .. } => Ok(payload),
            GraphOutcome::ApiError { status, payload } => Err(ToolError::Api { status, payload }),
        }
    }
}
