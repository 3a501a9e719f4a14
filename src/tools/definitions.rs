//! Static tool definitions advertised to clients.

use serde_json::json;

use crate::tools::{ToolDefinition, ToolKind};

const ACCOUNT_ID_DESCRIPTION: &str = "Facebook ad account ID (format: act_XXXXXXXXX)";

/// Returns the definition for one tool.
#[must_use]
#[allow(clippy::too_many_lines)]
pub fn definition(kind: ToolKind) -> ToolDefinition {
    let (description, input_schema) = match kind {
        ToolKind::ListAdAccounts => (
            "List every Facebook ad account available to the configured access token.",
            json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
        ),
        ToolKind::AccountInfo => (
            "Get detailed information about one Facebook ad account: status, currency, \
             balance, amount spent, business and spend cap.",
            json!({
                "type": "object",
                "properties": {
                    "accountId": {
                        "type": "string",
                        "description": ACCOUNT_ID_DESCRIPTION
                    }
                },
                "required": ["accountId"]
            }),
        ),
        ToolKind::InsightsGet => (
            "Retrieve insights metrics (e.g. impressions, clicks, spend) for one Facebook \
             ad account over a preset date range.",
            json!({
                "type": "object",
                "properties": {
                    "accountId": {
                        "type": "string",
                        "description": ACCOUNT_ID_DESCRIPTION
                    },
                    "metrics": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Metrics to retrieve (e.g. impressions, clicks, spend)"
                    },
                    "date_preset": {
                        "type": "string",
                        "description": "Preset date range (e.g. today, yesterday, last_7d, last_30d)",
                        "default": "last_30d"
                    },
                    "time_increment": {
                        "type": "integer",
                        "description": "Days per row (1 = daily, 7 = weekly, 30 = monthly)",
                        "default": 1
                    }
                },
                "required": ["accountId", "metrics"]
            }),
        ),
        ToolKind::Campaigns => (
            "List campaigns of a Facebook ad account, optionally filtered by status.",
            json!({
                "type": "object",
                "properties": {
                    "accountId": {
                        "type": "string",
                        "description": ACCOUNT_ID_DESCRIPTION
                    },
                    "status": status_schema("campaigns")
                },
                "required": ["accountId"]
            }),
        ),
        ToolKind::AdSets => (
            "List ad sets of a Facebook campaign, or of a whole ad account when no \
             campaign is given.",
            json!({
                "type": "object",
                "properties": {
                    "accountId": {
                        "type": "string",
                        "description": ACCOUNT_ID_DESCRIPTION
                    },
                    "campaignId": {
                        "type": "string",
                        "description": "Campaign ID (optional, takes precedence over accountId)"
                    },
                    "status": status_schema("ad sets")
                },
                "required": ["accountId"]
            }),
        ),
        ToolKind::Ads => (
            "List ads of a Facebook ad set, or of a whole ad account when no ad set is given.",
            json!({
                "type": "object",
                "properties": {
                    "accountId": {
                        "type": "string",
                        "description": ACCOUNT_ID_DESCRIPTION
                    },
                    "adsetId": {
                        "type": "string",
                        "description": "Ad set ID (optional, takes precedence over accountId)"
                    },
                    "status": status_schema("ads")
                },
                "required": ["accountId"]
            }),
        ),
        ToolKind::Passthrough => (
            "Generic Facebook Graph API call: any endpoint, method, query parameters and body.",
            json!({
                "type": "object",
                "properties": {
                    "endpoint": {
                        "type": "string",
                        "description": "Graph API endpoint (e.g. me/adaccounts, act_XXXXXXXXX/insights)"
                    },
                    "method": {
                        "type": "string",
                        "enum": ["GET", "POST", "DELETE"],
                        "description": "HTTP method",
                        "default": "GET"
                    },
                    "queryParams": {
                        "type": "object",
                        "description": "Query parameters for the call"
                    },
                    "body": {
                        "type": "object",
                        "description": "Request body for POST calls"
                    }
                },
                "required": ["endpoint"]
            }),
        ),
    };

    ToolDefinition {
        name: kind.name().to_string(),
        description: description.to_string(),
        input_schema,
    }
}

fn status_schema(what: &str) -> serde_json::Value {
    json!({
        "type": "string",
        "enum": ["ACTIVE", "PAUSED", "ARCHIVED", "ALL"],
        "description": format!("Status of the {what} to retrieve (ALL disables the filter)"),
        "default": "ACTIVE"
    })
}

/// Returns the definitions of every tool, in catalogue order.
#[must_use]
pub fn all_definitions() -> Vec<ToolDefinition> {
    ToolKind::ALL.iter().copied().map(definition).collect()
}
