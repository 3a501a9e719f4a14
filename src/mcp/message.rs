//! Inbound message shapes and the probe that tells them apart.
//!
//! A stdio line is one of:
//!
//! 1. A JSON-RPC 2.0 request or notification (has a `jsonrpc` key)
//! 2. An n8n request: `{"type": "listTools"}` or
//!    `{"type": "callTool", "name": ..., "arguments": ...}`
//!
//! The HTTP binding builds [`HttpRequest`] values directly; that shape never
//! arrives over stdio.

use serde_json::{Map, Value};

use crate::mcp::protocol::{
    salvage_request_id, JsonRpcNotification, JsonRpcRequest, RequestId,
};

/// An inbound stdio message after shape detection.
#[derive(Debug, Clone)]
pub enum InboundMessage {
    /// JSON-RPC request expecting a response.
    JsonRpc(JsonRpcRequest),
    /// JSON-RPC notification; produces no output.
    Notification(JsonRpcNotification),
    /// n8n line-protocol request.
    N8n(N8nRequest),
}

/// The n8n line-protocol requests.
#[derive(Debug, Clone, PartialEq)]
pub enum N8nRequest {
    /// `{"type": "listTools"}`
    ListTools,
    /// `{"type": "callTool", "name", "arguments"}`
    CallTool {
        /// Tool name.
        name: String,
        /// Tool arguments (`{}` when absent).
        arguments: Value,
    },
    /// A `type` the server does not know, or a malformed `callTool`.
    Invalid {
        /// What was wrong.
        reason: String,
    },
}

/// Why a stdio line could not be turned into an [`InboundMessage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The line is not valid JSON.
    Parse {
        /// ID recovered from the raw text, if any.
        id: Option<RequestId>,
        /// Parser message.
        detail: String,
    },
    /// The line is a JSON-RPC envelope that does not validate.
    InvalidJsonRpc {
        /// Request ID, if it could be read.
        id: Option<RequestId>,
        /// What was wrong.
        detail: String,
    },
    /// Valid JSON matching no known shape.
    UnknownShape {
        /// Request ID, if present.
        id: Option<RequestId>,
    },
}

/// The synthetic request shape produced by the HTTP binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Upper-case HTTP method.
    pub method: String,
    /// Request path, without query string.
    pub path: String,
    /// Raw request body.
    pub body: String,
}

impl HttpRequest {
    /// Creates a request without a body.
    #[must_use]
    pub fn new(method: &str, path: &str) -> Self {
        Self {
            method: method.to_ascii_uppercase(),
            path: path.to_string(),
            body: String::new(),
        }
    }

    /// Sets the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }
}

/// Parses one stdio line and detects its shape.
///
/// # Errors
///
/// Returns a [`Rejection`] describing why the line cannot be dispatched.
pub fn parse_line(line: &str) -> Result<InboundMessage, Rejection> {
    let value: Value = serde_json::from_str(line).map_err(|e| Rejection::Parse {
        id: salvage_request_id(line),
        detail: e.to_string(),
    })?;

    classify(value)
}

/// Detects the shape of an already-parsed JSON value.
///
/// # Errors
///
/// Returns a [`Rejection`] when the value is not a recognised message.
pub fn classify(value: Value) -> Result<InboundMessage, Rejection> {
    let Value::Object(obj) = value else {
        return Err(Rejection::UnknownShape { id: None });
    };

    if obj.contains_key("jsonrpc") {
        return classify_jsonrpc(obj);
    }

    if let Some(kind) = obj.get("type").and_then(Value::as_str) {
        return Ok(InboundMessage::N8n(classify_n8n(kind, &obj)));
    }

    Err(Rejection::UnknownShape { id: id_of(&obj) })
}

fn classify_jsonrpc(obj: Map<String, Value>) -> Result<InboundMessage, Rejection> {
    let id = id_of(&obj);

    if obj.get("jsonrpc").and_then(Value::as_str) != Some("2.0") {
        return Err(Rejection::InvalidJsonRpc {
            id,
            detail: "jsonrpc field must be \"2.0\"".to_string(),
        });
    }

    let value = Value::Object(obj);

    if value.get("id").is_some() {
        let request: JsonRpcRequest =
            serde_json::from_value(value).map_err(|e| Rejection::InvalidJsonRpc {
                id: id.clone(),
                detail: e.to_string(),
            })?;

        if let Some(problem) = request.validate() {
            return Err(Rejection::InvalidJsonRpc {
                id: Some(request.id),
                detail: problem.to_string(),
            });
        }

        Ok(InboundMessage::JsonRpc(request))
    } else {
        let notification: JsonRpcNotification =
            serde_json::from_value(value).map_err(|e| Rejection::InvalidJsonRpc {
                id: None,
                detail: e.to_string(),
            })?;

        Ok(InboundMessage::Notification(notification))
    }
}

fn classify_n8n(kind: &str, obj: &Map<String, Value>) -> N8nRequest {
    match kind {
        "listTools" => N8nRequest::ListTools,
        "callTool" => match obj.get("name").and_then(Value::as_str) {
            Some(name) if !name.is_empty() => N8nRequest::CallTool {
                name: name.to_string(),
                arguments: obj
                    .get("arguments")
                    .cloned()
                    .unwrap_or_else(|| Value::Object(Map::new())),
            },
            _ => N8nRequest::Invalid {
                reason: "callTool requires a non-empty string 'name'".to_string(),
            },
        },
        other => N8nRequest::Invalid {
            reason: format!("unknown request type '{other}'"),
        },
    }
}

fn id_of(obj: &Map<String, Value>) -> Option<RequestId> {
    obj.get("id")
        .and_then(|id| serde_json::from_value(id.clone()).ok())
}
