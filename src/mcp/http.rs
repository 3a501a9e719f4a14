//! HTTP binding.
//!
//! A thin axum shell: every request, whatever its path, is turned into an
//! [`HttpRequest`] and routed by [`Dispatcher::handle_http`]. Every response
//! carries permissive CORS headers.

use std::io;
use std::net::SocketAddr;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use tokio::net::TcpListener;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::mcp::dispatcher::Dispatcher;
use crate::mcp::message::HttpRequest;

/// Builds the router for `dispatcher`.
pub fn router(dispatcher: Dispatcher) -> Router {
    Router::new()
        .fallback(handle)
        .layer(TraceLayer::new_for_http())
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET, POST, OPTIONS"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type"),
        ))
        .with_state(dispatcher)
}

async fn handle(
    State(dispatcher): State<Dispatcher>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Response {
    let request = HttpRequest::new(method.as_str(), uri.path())
        .with_body(String::from_utf8_lossy(&body).into_owned());

    let response = dispatcher.handle_http(request).await;
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    match response.body {
        Some(body) => (status, Json(body)).into_response(),
        None => status.into_response(),
    }
}

/// Serves HTTP on `addr` until `shutdown` resolves.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve_http<S>(dispatcher: Dispatcher, addr: SocketAddr, shutdown: S) -> io::Result<()>
where
    S: std::future::Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await.map_err(|e| {
        error!(address = %addr, error = %e, "Failed to bind HTTP listener");
        e
    })?;
    info!(address = %addr, "HTTP server listening");

    axum::serve(listener, router(dispatcher))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("HTTP server shut down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GraphError;
    use crate::graph::{GraphApi, GraphOutcome, GraphRequest};
    use crate::tools::ToolHandlers;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    struct FixedGraph;

    #[async_trait]
    impl GraphApi for FixedGraph {
        async fn request(&self, _request: GraphRequest) -> Result<GraphOutcome, GraphError> {
            Ok(GraphOutcome::Success {
                status: 200,
                payload: json!({"data": [{"id": "act_1"}]}),
            })
        }
    }

    fn app() -> Router {
        router(Dispatcher::new(ToolHandlers::new(Arc::new(FixedGraph))))
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn execute_returns_wrapped_result() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/execute")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"name":"facebook-list-ad-accounts","parameters":{}}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "*"
        );
        let body = body_json(response).await;
        assert_eq!(body["result"]["isError"], false);
    }

    #[tokio::test]
    async fn options_is_empty_200_with_cors() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/execute")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_METHODS],
            "GET, POST, OPTIONS"
        );
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn unknown_path_is_404() {
        let response = app()
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["error"], true);
        assert_eq!(body["message"], "Endpoint not found");
    }

    #[tokio::test]
    async fn query_string_is_ignored_for_routing() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/status?verbose=1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn bind_failure_is_an_error() {
        let held = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = held.local_addr().unwrap();

        let dispatcher = Dispatcher::new(ToolHandlers::new(Arc::new(FixedGraph)));
        let result = serve_http(dispatcher, addr, std::future::ready(())).await;

        assert!(result.is_err());
    }
}
