//! Protocol normaliser and dispatcher.
//!
//! Every inbound shape resolves to exactly one call: list the tool
//! definitions, invoke one handler, or report status. The dispatcher owns the
//! translation of the outcome back into the envelope of the inbound shape:
//!
//! | Inbound | `ListTools` | `CallTool` |
//! |---|---|---|
//! | JSON-RPC `listTools`/`executeTool` | `{result: {tools}}` | `{result: {result: ToolResult}}` |
//! | JSON-RPC `tools/list`/`tools/call` | `{result: {tools}}` | `{result: ToolResult}` |
//! | n8n | bare `[ToolDefinition]` | `[ToolResult]` |
//! | HTTP | `{tools}` | `{result: ToolResult}` |
//!
//! The n8n asymmetry (bare array vs. single-element array) is what the n8n
//! MCP client node expects and must not be collapsed.

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, error, warn};

use crate::error::ERROR_PREFIX;
use crate::mcp::message::{HttpRequest, InboundMessage, N8nRequest, Rejection};
use crate::mcp::protocol::{
    ErrorCode, JsonRpcError, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, RequestId,
    ServerInfo, ToolCallParams, MCP_PROTOCOL_VERSION, SERVER_DISPLAY_NAME,
};
use crate::tools::{all_definitions, ToolCallResult, ToolDefinition, ToolHandlers, ToolKind};

/// A response for the HTTP binding.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// JSON body, or `None` for an empty body.
    pub body: Option<Value>,
}

impl HttpResponse {
    fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            body: Some(body),
        }
    }

    fn error(status: u16, message: impl Into<String>) -> Self {
        Self::json(status, json!({"error": true, "message": message.into()}))
    }
}

/// Routes inbound messages to the tool handler table.
///
/// Cheap to clone; each clone shares the same immutable handler table.
#[derive(Clone)]
pub struct Dispatcher {
    handlers: ToolHandlers,
}

impl Dispatcher {
    /// Creates a dispatcher over `handlers`.
    #[must_use]
    pub const fn new(handlers: ToolHandlers) -> Self {
        Self { handlers }
    }

    /// Tool definitions advertised by every transport.
    #[must_use]
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        all_definitions()
    }

    /// Invokes one handler.
    async fn call(&self, kind: ToolKind, arguments: &Value) -> ToolCallResult {
        self.handlers.execute(kind, arguments).await
    }

    /// Handles a parsed stdio message. Returns the output line, if any.
    pub async fn handle_message(&self, message: InboundMessage) -> Option<Value> {
        match message {
            InboundMessage::JsonRpc(req) => Some(self.handle_jsonrpc(req).await),
            InboundMessage::Notification(notif) => {
                Self::handle_notification(&notif);
                None
            }
            InboundMessage::N8n(req) => Some(self.handle_n8n(req).await),
        }
    }

    /// Converts a rejected stdio line into its error envelope.
    ///
    /// Returns `None` (after logging) when the line carries no recoverable
    /// correlation ID; such lines are dropped.
    #[must_use]
    pub fn reject(&self, rejection: &Rejection) -> Option<Value> {
        match rejection {
            Rejection::Parse { id: Some(id), detail } => {
                warn!(id = %id, error = %detail, "Malformed JSON line");
                Some(to_json(&JsonRpcError::parse_error(Some(id.clone()), detail)))
            }
            Rejection::Parse { id: None, detail } => {
                warn!(error = %detail, "Dropping malformed JSON line without an id");
                None
            }
            Rejection::InvalidJsonRpc { id, detail } => {
                warn!(error = %detail, "Invalid JSON-RPC envelope");
                Some(to_json(&JsonRpcError::invalid_request(id.clone(), detail.clone())))
            }
            Rejection::UnknownShape { id: Some(id) } => {
                warn!(id = %id, "Message matches no known shape");
                Some(to_json(&JsonRpcError::invalid_request(
                    Some(id.clone()),
                    "message is neither JSON-RPC 2.0 nor an n8n request",
                )))
            }
            Rejection::UnknownShape { id: None } => {
                warn!("Dropping message that matches no known shape");
                None
            }
        }
    }

    /// Handles one JSON-RPC request. The response echoes `req.id`.
    pub async fn handle_jsonrpc(&self, req: JsonRpcRequest) -> Value {
        debug!(id = %req.id, method = %req.method, "JSON-RPC request");

        let response = match req.method.as_str() {
            "listTools" | "tools/list" => Ok(self.jsonrpc_list_tools(req.id.clone())),
            "executeTool" => self.jsonrpc_execute_tool(&req).await,
            "tools/call" => self.jsonrpc_tools_call(&req).await,
            "initialize" => Ok(Self::jsonrpc_initialize(req.id.clone())),
            "ping" => Ok(JsonRpcResponse::success(req.id.clone(), json!({}))),
            _ => Err(JsonRpcError::method_not_found(req.id.clone(), &req.method)),
        };

        match response {
            Ok(resp) => to_json(&resp),
            Err(error) => to_json(&error),
        }
    }

    fn handle_notification(notif: &JsonRpcNotification) {
        debug!(method = %notif.method, "Ignoring JSON-RPC notification");
    }

    fn jsonrpc_list_tools(&self, id: RequestId) -> JsonRpcResponse {
        JsonRpcResponse::success(id, json!({ "tools": self.tool_definitions() }))
    }

    fn jsonrpc_initialize(id: RequestId) -> JsonRpcResponse {
        JsonRpcResponse::success(
            id,
            json!({
                "protocolVersion": MCP_PROTOCOL_VERSION,
                "capabilities": { "tools": {} },
                "serverInfo": ServerInfo::default(),
            }),
        )
    }

    /// `executeTool`: unknown tools are a JSON-RPC error.
    async fn jsonrpc_execute_tool(
        &self,
        req: &JsonRpcRequest,
    ) -> Result<JsonRpcResponse, JsonRpcError> {
        let params = tool_call_params(req)?;
        let kind = ToolKind::from_name(&params.name).ok_or_else(|| {
            warn!(tool = %params.name, "Unknown tool requested");
            JsonRpcError::invalid_params(req.id.clone(), format!("Unknown tool: {}", params.name))
        })?;

        let result = self.call(kind, &params.arguments).await;
        Ok(JsonRpcResponse::success(
            req.id.clone(),
            json!({ "result": result }),
        ))
    }

    /// `tools/call`: unknown tools are an error tool result.
    async fn jsonrpc_tools_call(
        &self,
        req: &JsonRpcRequest,
    ) -> Result<JsonRpcResponse, JsonRpcError> {
        let params = tool_call_params(req)?;
        let result = self.handlers.call(&params.name, &params.arguments).await;
        Ok(JsonRpcResponse::success(req.id.clone(), to_json(&result)))
    }

    /// Handles one n8n request.
    pub async fn handle_n8n(&self, req: N8nRequest) -> Value {
        match req {
            N8nRequest::ListTools => to_json(&self.tool_definitions()),
            N8nRequest::CallTool { name, arguments } => {
                to_json(&[self.handlers.call(&name, &arguments).await])
            }
            N8nRequest::Invalid { reason } => {
                warn!(reason = %reason, "Invalid n8n request");
                to_json(&[ToolCallResult::error(format!("{ERROR_PREFIX}: {reason}"))])
            }
        }
    }

    /// Handles one HTTP request.
    pub async fn handle_http(&self, req: HttpRequest) -> HttpResponse {
        debug!(method = %req.method, path = %req.path, "HTTP request");

        match (req.method.as_str(), req.path.as_str()) {
            ("OPTIONS", _) => HttpResponse {
                status: 200,
                body: None,
            },
            ("GET", "/tools") => {
                HttpResponse::json(200, json!({ "tools": self.tool_definitions() }))
            }
            ("GET", "/status") => HttpResponse::json(200, self.status()),
            ("POST", "/execute") => self.http_execute(&req.body).await,
            _ => HttpResponse::error(404, "Endpoint not found"),
        }
    }

    async fn http_execute(&self, body: &str) -> HttpResponse {
        let body: Value = match serde_json::from_str(body) {
            Ok(body) => body,
            Err(e) => {
                error!(error = %e, "Invalid /execute body");
                return HttpResponse::error(500, format!("Invalid JSON body: {e}"));
            }
        };

        let name = body.get("name").and_then(Value::as_str).unwrap_or_default();
        let Some(kind) = ToolKind::from_name(name) else {
            warn!(tool = name, "Unknown tool requested");
            return HttpResponse::error(404, format!("Tool not found: {name}"));
        };

        let arguments = body.get("parameters").cloned().unwrap_or(Value::Null);
        let result = self.call(kind, &arguments).await;

        match serde_json::to_value(&result) {
            Ok(result) => HttpResponse::json(200, json!({ "result": result })),
            Err(e) => {
                error!(error = %e, "Failed to serialise tool call result");
                HttpResponse::error(500, "Internal error: failed to serialise result")
            }
        }
    }

    fn status(&self) -> Value {
        let names: Vec<String> = self.tool_definitions().into_iter().map(|t| t.name).collect();
        json!({
            "status": "ok",
            "tools": names,
            "version": env!("CARGO_PKG_VERSION"),
            "name": SERVER_DISPLAY_NAME,
        })
    }
}

fn tool_call_params(req: &JsonRpcRequest) -> Result<ToolCallParams, JsonRpcError> {
    req.params
        .as_ref()
        .map(|p| serde_json::from_value::<ToolCallParams>(p.clone()))
        .transpose()
        .map_err(|e| {
            JsonRpcError::invalid_params(req.id.clone(), format!("Invalid tool call params: {e}"))
        })?
        .ok_or_else(|| JsonRpcError::invalid_params(req.id.clone(), "Missing tool call params"))
}

/// Serialises an envelope, degrading to a JSON-RPC internal error.
fn to_json<T: Serialize + ?Sized>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|e| {
        error!(error = %e, "Failed to serialise response");
        json!({
            "jsonrpc": "2.0",
            "id": null,
            "error": {
                "code": ErrorCode::InternalError.code(),
                "message": "Internal error: failed to serialise response",
            }
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GraphError;
    use crate::graph::{GraphApi, GraphOutcome, GraphRequest};
    use crate::mcp::message::parse_line;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Counts calls and answers every request with the same account.
    #[derive(Default)]
    struct CountingGraph {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl GraphApi for CountingGraph {
        async fn request(&self, _request: GraphRequest) -> Result<GraphOutcome, GraphError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(GraphOutcome::Success {
                status: 200,
                payload: json!({"id": "act_123", "name": "Test"}),
            })
        }
    }

    fn dispatcher() -> (Dispatcher, Arc<CountingGraph>) {
        let graph = Arc::new(CountingGraph::default());
        let dispatcher = Dispatcher::new(ToolHandlers::new(graph.clone()));
        (dispatcher, graph)
    }

    async fn line(dispatcher: &Dispatcher, input: &str) -> Option<Value> {
        match parse_line(input) {
            Ok(msg) => dispatcher.handle_message(msg).await,
            Err(rejection) => dispatcher.reject(&rejection),
        }
    }

    #[tokio::test]
    async fn execute_tool_echoes_id_and_wraps_result() {
        let (dispatcher, graph) = dispatcher();

        let out = line(
            &dispatcher,
            r#"{"jsonrpc":"2.0","id":7,"method":"executeTool","params":{"name":"facebook-account-info","arguments":{"accountId":"act_123"}}}"#,
        )
        .await
        .unwrap();

        assert_eq!(out["jsonrpc"], "2.0");
        assert_eq!(out["id"], 7);
        assert_eq!(out["result"]["result"]["isError"], false);
        let text = out["result"]["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("act_123"));
        assert!(text.contains("Test"));
        assert_eq!(graph.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn string_ids_are_preserved() {
        let (dispatcher, _) = dispatcher();
        let out = line(&dispatcher, r#"{"jsonrpc":"2.0","id":"abc","method":"listTools"}"#)
            .await
            .unwrap();
        assert_eq!(out["id"], "abc");
        assert!(out["result"]["tools"].is_array());
    }

    #[tokio::test]
    async fn unknown_method_is_32601() {
        let (dispatcher, _) = dispatcher();
        let out = line(&dispatcher, r#"{"jsonrpc":"2.0","id":1,"method":"deleteTool"}"#)
            .await
            .unwrap();
        assert_eq!(out["error"]["code"], -32601);
        assert_eq!(out["id"], 1);
    }

    #[tokio::test]
    async fn execute_unknown_tool_is_32602_without_handler_call() {
        let (dispatcher, graph) = dispatcher();
        let out = line(
            &dispatcher,
            r#"{"jsonrpc":"2.0","id":2,"method":"executeTool","params":{"name":"nope","arguments":{}}}"#,
        )
        .await
        .unwrap();
        assert_eq!(out["error"]["code"], -32602);
        assert!(out["error"]["message"].as_str().unwrap().contains("nope"));
        assert_eq!(graph.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn execute_without_params_is_32602() {
        let (dispatcher, _) = dispatcher();
        let out = line(&dispatcher, r#"{"jsonrpc":"2.0","id":3,"method":"executeTool"}"#)
            .await
            .unwrap();
        assert_eq!(out["error"]["code"], -32602);
    }

    #[tokio::test]
    async fn tools_call_returns_bare_result() {
        let (dispatcher, _) = dispatcher();
        let out = line(
            &dispatcher,
            r#"{"jsonrpc":"2.0","id":4,"method":"tools/call","params":{"name":"facebook-list-ad-accounts"}}"#,
        )
        .await
        .unwrap();
        assert_eq!(out["result"]["isError"], false);
        assert!(out["result"]["content"].is_array());

        let out = line(
            &dispatcher,
            r#"{"jsonrpc":"2.0","id":5,"method":"tools/call","params":{"name":"nope"}}"#,
        )
        .await
        .unwrap();
        assert_eq!(out["result"]["isError"], true);
    }

    #[tokio::test]
    async fn initialize_and_ping() {
        let (dispatcher, _) = dispatcher();
        let out = line(&dispatcher, r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#)
            .await
            .unwrap();
        assert_eq!(out["result"]["protocolVersion"], MCP_PROTOCOL_VERSION);
        assert_eq!(out["result"]["serverInfo"]["name"], "fb-insights-mcp");

        let out = line(&dispatcher, r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#)
            .await
            .unwrap();
        assert_eq!(out["result"], json!({}));
    }

    #[tokio::test]
    async fn notifications_produce_no_output() {
        let (dispatcher, _) = dispatcher();
        let out = line(&dispatcher, r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#).await;
        assert!(out.is_none());
    }

    #[tokio::test]
    async fn malformed_line_with_id_is_parse_error() {
        let (dispatcher, _) = dispatcher();
        let out = line(&dispatcher, r#"{"jsonrpc":"2.0","id":9,"method":"listTools""#)
            .await
            .unwrap();
        assert_eq!(out["error"]["code"], -32700);
        assert_eq!(out["id"], 9);
    }

    #[tokio::test]
    async fn malformed_line_without_id_is_dropped() {
        let (dispatcher, _) = dispatcher();
        assert!(line(&dispatcher, "{{{").await.is_none());
    }

    #[tokio::test]
    async fn n8n_list_tools_is_bare_array() {
        let (dispatcher, _) = dispatcher();
        let out = line(&dispatcher, r#"{"type":"listTools"}"#).await.unwrap();
        let tools = out.as_array().unwrap();
        assert_eq!(tools.len(), ToolKind::ALL.len());
        assert!(tools[0].get("inputSchema").is_some());
    }

    #[tokio::test]
    async fn n8n_call_tool_is_wrapped_array() {
        let (dispatcher, _) = dispatcher();
        let out = line(
            &dispatcher,
            r#"{"type":"callTool","name":"facebook-list-ad-accounts","arguments":{}}"#,
        )
        .await
        .unwrap();
        let results = out.as_array().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["isError"], false);
    }

    #[tokio::test]
    async fn n8n_unknown_tool_is_wrapped_error() {
        let (dispatcher, graph) = dispatcher();
        let out = line(
            &dispatcher,
            r#"{"type":"callTool","name":"ferramenta-inexistente","arguments":{}}"#,
        )
        .await
        .unwrap();
        assert_eq!(out[0]["isError"], true);
        assert!(out[0]["content"][0]["text"]
            .as_str()
            .unwrap()
            .contains("ferramenta-inexistente"));
        assert_eq!(graph.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn list_tools_agrees_across_shapes() {
        let (dispatcher, _) = dispatcher();

        let names = |tools: &Value| -> Vec<String> {
            tools
                .as_array()
                .unwrap()
                .iter()
                .map(|t| t["name"].as_str().unwrap().to_string())
                .collect()
        };

        let rpc = line(&dispatcher, r#"{"jsonrpc":"2.0","id":1,"method":"listTools"}"#)
            .await
            .unwrap();
        let n8n = line(&dispatcher, r#"{"type":"listTools"}"#).await.unwrap();
        let http = dispatcher.handle_http(HttpRequest::new("GET", "/tools")).await;

        let http_body = http.body.unwrap();
        assert_eq!(names(&rpc["result"]["tools"]), names(&n8n));
        assert_eq!(names(&n8n), names(&http_body["tools"]));
    }

    #[tokio::test]
    async fn http_routes() {
        let (dispatcher, _) = dispatcher();

        let resp = dispatcher.handle_http(HttpRequest::new("GET", "/status")).await;
        assert_eq!(resp.status, 200);
        let body = resp.body.unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["name"], SERVER_DISPLAY_NAME);
        assert_eq!(body["tools"].as_array().unwrap().len(), ToolKind::ALL.len());

        let resp = dispatcher.handle_http(HttpRequest::new("OPTIONS", "/anything")).await;
        assert_eq!(resp, HttpResponse { status: 200, body: None });

        let resp = dispatcher.handle_http(HttpRequest::new("GET", "/nowhere")).await;
        assert_eq!(resp.status, 404);
    }

    #[tokio::test]
    async fn http_execute_statuses() {
        let (dispatcher, graph) = dispatcher();

        let ok = dispatcher
            .handle_http(
                HttpRequest::new("POST", "/execute")
                    .with_body(r#"{"name":"facebook-list-ad-accounts"}"#),
            )
            .await;
        assert_eq!(ok.status, 200);
        assert_eq!(ok.body.unwrap()["result"]["isError"], false);

        let unknown = dispatcher
            .handle_http(HttpRequest::new("POST", "/execute").with_body(r#"{"name":"nope"}"#))
            .await;
        assert_eq!(unknown.status, 404);
        assert_eq!(unknown.body.unwrap()["error"], true);

        let broken = dispatcher
            .handle_http(HttpRequest::new("POST", "/execute").with_body("{oops"))
            .await;
        assert_eq!(broken.status, 500);

        assert_eq!(graph.calls.load(Ordering::SeqCst), 1);
    }
}
