//! fb-insights-mcp: MCP server for Facebook Marketing Graph API reads
//!
//! Exposes a fixed set of read operations (ad accounts, account info,
//! insights, campaigns, ad sets, ads, and a generic Graph API passthrough)
//! as MCP tools, reachable over JSON-RPC on stdio, the n8n line protocol on
//! stdio, or plain HTTP JSON.
//!
//! # Modules
//!
//! - [`config`]: Configuration loading and validation
//! - [`error`]: Error types
//! - [`graph`]: Graph API request model and HTTP client
//! - [`tools`]: Tool definitions and the handler table
//! - [`mcp`]: Message shapes, dispatcher, and transports

pub mod config;
pub mod error;
pub mod graph;
pub mod mcp;
pub mod tools;
