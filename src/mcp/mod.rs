//! Model Context Protocol (MCP) front end.
//!
//! Three wire shapes reach the same handler table:
//!
//! - JSON-RPC 2.0 over stdio (`listTools`, `executeTool`, and the standard
//!   `initialize`, `tools/list`, `tools/call`, `ping`)
//! - the n8n line protocol over stdio (`{"type": "listTools"}`,
//!   `{"type": "callTool", ...}`)
//! - plain HTTP JSON (`GET /tools`, `POST /execute`, `GET /status`)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         MCP Server                          │
//! │                                                             │
//! │   ┌─────────────┐    ┌─────────────┐    ┌─────────────┐    │
//! │   │  Transport  │───▶│ Dispatcher  │───▶│   Tools     │    │
//! │   │ (stdio/http)│    │ (envelopes) │    │  (handlers) │    │
//! │   └─────────────┘    └─────────────┘    └─────────────┘    │
//! │          │                  │                  │            │
//! │          ▼                  ▼                  ▼            │
//! │   ┌─────────────┐    ┌─────────────┐    ┌─────────────┐    │
//! │   │   message   │    │  protocol   │    │    graph    │    │
//! │   │(shape probe)│    │ (JSON-RPC)  │    │  (client)   │    │
//! │   └─────────────┘    └─────────────┘    └─────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Protocol Version
//!
//! `initialize` reports MCP protocol version 2024-11-05.

pub mod dispatcher;
pub mod http;
pub mod message;
pub mod protocol;
pub mod signal;
pub mod transport;

pub use dispatcher::{Dispatcher, HttpResponse};
pub use http::{router, serve_http};
pub use message::{HttpRequest, InboundMessage, N8nRequest, Rejection};
pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, MCP_PROTOCOL_VERSION};
pub use signal::shutdown_signal;
pub use transport::{ConnectionState, StdioTransport};
