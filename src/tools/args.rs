//! Argument validation and Graph API request derivation.
//!
//! [`plan`] turns `(tool, arguments)` into the exact [`GraphRequest`] the
//! handler will issue. It performs no I/O, so the endpoint and query rules
//! are tested here directly.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::ToolError;
use crate::graph::{GraphRequest, HttpMethod};
use crate::tools::ToolKind;

/// Fields projected by `facebook-list-ad-accounts`.
pub const AD_ACCOUNT_LIST_FIELDS: &str = "id,name,account_id,account_status";

/// Fields projected by `facebook-account-info`.
pub const ACCOUNT_INFO_FIELDS: &str = "id,name,account_id,account_status,age,amount_spent,\
balance,business,currency,min_campaign_group_spend_cap";

/// Fields projected by `facebook-campaigns`.
pub const CAMPAIGN_FIELDS: &str = "id,name,status,objective,spend_cap,budget_remaining,\
daily_budget,lifetime_budget,start_time,stop_time";

/// Fields projected by `facebook-adsets`.
pub const ADSET_FIELDS: &str = "id,name,status,campaign_id,daily_budget,lifetime_budget,\
targeting,optimization_goal,bid_amount";

/// Fields projected by `facebook-ads`.
pub const AD_FIELDS: &str = "id,name,status,adset_id,creative,tracking_specs,bid_amount";

const DEFAULT_DATE_PRESET: &str = "last_30d";
const DEFAULT_TIME_INCREMENT: u32 = 1;

/// Status filter for campaign, ad set and ad listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    /// Only active objects.
    #[default]
    Active,
    /// Only paused objects.
    Paused,
    /// Only archived objects.
    Archived,
    /// No filter.
    All,
}

impl StatusFilter {
    /// Parses a status name, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns a validation error for anything but ACTIVE, PAUSED, ARCHIVED
    /// or ALL.
    pub fn parse(value: &str) -> Result<Self, ToolError> {
        match value.trim().to_ascii_uppercase().as_str() {
            "ACTIVE" => Ok(Self::Active),
            "PAUSED" => Ok(Self::Paused),
            "ARCHIVED" => Ok(Self::Archived),
            "ALL" => Ok(Self::All),
            _ => Err(ToolError::Validation(format!(
                "invalid status '{value}', expected one of ACTIVE, PAUSED, ARCHIVED, ALL"
            ))),
        }
    }

    /// The `status` query value, or `None` when the filter is disabled.
    #[must_use]
    pub const fn query_value(self) -> Option<&'static str> {
        match self {
            Self::Active => Some("ACTIVE"),
            Self::Paused => Some("PAUSED"),
            Self::Archived => Some("ARCHIVED"),
            Self::All => None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountArgs {
    account_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsightsArgs {
    account_id: String,
    metrics: Vec<String>,
    #[serde(default, rename = "date_preset")]
    date_preset: Option<String>,
    #[serde(default, rename = "time_increment")]
    time_increment: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListingArgs {
    account_id: String,
    #[serde(default)]
    campaign_id: Option<String>,
    #[serde(default)]
    adset_id: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PassthroughArgs {
    endpoint: String,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    query_params: Option<Map<String, Value>>,
    #[serde(default)]
    body: Option<Value>,
}

/// Builds the Graph API request for `kind` from raw `arguments`.
///
/// `null` arguments are treated as an empty object.
///
/// # Errors
///
/// Returns [`ToolError::Validation`] when the arguments do not match the
/// tool's declared shape.
pub fn plan(kind: ToolKind, arguments: &Value) -> Result<GraphRequest, ToolError> {
    match kind {
        ToolKind::ListAdAccounts => {
            Ok(GraphRequest::get("me/adaccounts").param("fields", AD_ACCOUNT_LIST_FIELDS))
        }
        ToolKind::AccountInfo => {
            let args: AccountArgs = parse(kind, arguments)?;
            let account_id = required_id("accountId", &args.account_id)?;
            Ok(GraphRequest::get(account_id).param("fields", ACCOUNT_INFO_FIELDS))
        }
        ToolKind::InsightsGet => {
            let args: InsightsArgs = parse(kind, arguments)?;
            let account_id = required_id("accountId", &args.account_id)?;

            let metrics: Vec<&str> = args
                .metrics
                .iter()
                .map(|m| m.trim())
                .filter(|m| !m.is_empty())
                .collect();
            if metrics.is_empty() {
                return Err(ToolError::Validation(
                    "metrics must contain at least one metric name".to_string(),
                ));
            }

            let time_increment = args.time_increment.unwrap_or(DEFAULT_TIME_INCREMENT);
            if time_increment == 0 {
                return Err(ToolError::Validation(
                    "time_increment must be at least 1".to_string(),
                ));
            }

            let date_preset = args
                .date_preset
                .filter(|p| !p.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_DATE_PRESET.to_string());

            Ok(GraphRequest::get(format!("{account_id}/insights"))
                .param("fields", metrics.join(","))
                .param("date_preset", date_preset)
                .param("time_increment", time_increment))
        }
        ToolKind::Campaigns => {
            let args: ListingArgs = parse(kind, arguments)?;
            let account_id = required_id("accountId", &args.account_id)?;
            listing(
                format!("{account_id}/campaigns"),
                CAMPAIGN_FIELDS,
                args.status.as_deref(),
            )
        }
        ToolKind::AdSets => {
            let args: ListingArgs = parse(kind, arguments)?;
            let account_id = required_id("accountId", &args.account_id)?;
            let root = optional_id(args.campaign_id.as_deref()).unwrap_or(account_id);
            listing(format!("{root}/adsets"), ADSET_FIELDS, args.status.as_deref())
        }
        ToolKind::Ads => {
            let args: ListingArgs = parse(kind, arguments)?;
            let account_id = required_id("accountId", &args.account_id)?;
            let root = optional_id(args.adset_id.as_deref()).unwrap_or(account_id);
            listing(format!("{root}/ads"), AD_FIELDS, args.status.as_deref())
        }
        ToolKind::Passthrough => {
            let args: PassthroughArgs = parse(kind, arguments)?;
            let endpoint = required_id("endpoint", &args.endpoint)?;

            let method = match args.method.as_deref() {
                None => HttpMethod::Get,
                Some(name) => HttpMethod::parse(name).ok_or_else(|| {
                    ToolError::Validation(format!(
                        "unsupported method '{name}', expected GET, POST or DELETE"
                    ))
                })?,
            };

            Ok(GraphRequest {
                endpoint: endpoint.to_string(),
                method,
                query: args.query_params.unwrap_or_default(),
                body: args.body,
            })
        }
    }
}

fn parse<T: DeserializeOwned>(kind: ToolKind, arguments: &Value) -> Result<T, ToolError> {
    let arguments = match arguments {
        Value::Null => Value::Object(Map::new()),
        other => other.clone(),
    };
    serde_json::from_value(arguments)
        .map_err(|e| ToolError::Validation(format!("invalid arguments for {}: {e}", kind.name())))
}

fn required_id<'a>(field: &str, value: &'a str) -> Result<&'a str, ToolError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ToolError::Validation(format!("{field} cannot be empty")));
    }
    Ok(value)
}

fn optional_id(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn listing(
    endpoint: String,
    fields: &str,
    status: Option<&str>,
) -> Result<GraphRequest, ToolError> {
    let filter = status.map_or(Ok(StatusFilter::default()), StatusFilter::parse)?;
    let mut request = GraphRequest::get(endpoint).param("fields", fields);
    if let Some(status) = filter.query_value() {
        request = request.param("status", status);
    }
    Ok(request)
}
