//! reqwest-backed Graph API client.

use async_trait::async_trait;
use reqwest::{header, Client, Method};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::GraphError;
use crate::graph::{GraphApi, GraphOutcome, GraphRequest, HttpMethod};

/// Graph API client holding the immutable base URL and access token.
#[derive(Clone)]
pub struct GraphClient {
    client: Client,
    base_url: String,
    access_token: String,
}

impl GraphClient {
    /// Creates a client for `base_url` authenticating with `access_token`.
    ///
    /// An empty token is accepted here; every call then fails with
    /// [`GraphError::Configuration`] before touching the network.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(base_url: &str, access_token: &str) -> Result<Self, GraphError> {
        let client = Client::builder()
            .user_agent(concat!("fb-insights-mcp/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
        })
    }

    /// Creates a client from the resolved configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self, GraphError> {
        Self::new(&config.graph.base_url, &config.credentials.access_token)
    }

    /// Full URL for `endpoint`, without query string.
    fn url_for(&self, endpoint: &str) -> Result<String, GraphError> {
        let endpoint = endpoint.trim().trim_start_matches('/');
        if endpoint.is_empty() {
            return Err(GraphError::InvalidRequest(
                "endpoint cannot be empty".to_string(),
            ));
        }
        Ok(format!("{}/{endpoint}", self.base_url))
    }

    /// Query pairs for the request, access token last.
    fn query_pairs(&self, request: &GraphRequest) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = request
            .query
            .iter()
            .filter(|(key, _)| key.as_str() != "access_token")
            .filter_map(|(key, value)| query_value(value).map(|v| (key.clone(), v)))
            .collect();
        pairs.push(("access_token".to_string(), self.access_token.clone()));
        pairs
    }
}

/// Renders a JSON value as a query-string value. `null` drops the parameter.
fn query_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

const fn to_reqwest(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Delete => Method::DELETE,
    }
}

#[async_trait]
impl GraphApi for GraphClient {
    async fn request(&self, request: GraphRequest) -> Result<GraphOutcome, GraphError> {
        if self.access_token.trim().is_empty() {
            return Err(GraphError::Configuration);
        }

        let url = self.url_for(&request.endpoint)?;
        debug!(method = %request.method, url = %url, "Graph API request");

        let mut builder = self
            .client
            .request(to_reqwest(request.method), &url)
            .header(header::CONTENT_TYPE, "application/json")
            .query(&self.query_pairs(&request));

        if request.method != HttpMethod::Get {
            let body = request.body.clone().unwrap_or_else(|| Value::Object(Map::new()));
            builder = builder.json(&body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        let payload: Value = serde_json::from_slice(&bytes).map_err(|e| {
            GraphError::Transport(format!(
                "response body is not JSON (HTTP {}): {e}",
                status.as_u16()
            ))
        })?;

        debug!(status = status.as_u16(), "Graph API response");

        if status.is_success() {
            Ok(GraphOutcome::Success {
                status: status.as_u16(),
                payload,
            })
        } else {
            warn!(status = status.as_u16(), endpoint = %request.endpoint, "Graph API returned an error");
            Ok(GraphOutcome::ApiError {
                status: status.as_u16(),
                payload,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, token: &str) -> GraphClient {
        GraphClient::new(&format!("{}/v19.0", server.uri()), token).unwrap()
    }

    #[tokio::test]
    async fn get_appends_token_and_params() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v19.0/me/adaccounts"))
            .and(query_param("fields", "id,name"))
            .and(query_param("access_token", "tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, "tok");
        let outcome = client
            .request(GraphRequest::get("me/adaccounts").param("fields", "id,name"))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            GraphOutcome::Success {
                status: 200,
                payload: json!({"data": []})
            }
        );
    }

    #[tokio::test]
    async fn numeric_params_are_stringified() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v19.0/act_1/insights"))
            .and(query_param("time_increment", "7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, "tok");
        let outcome = client
            .request(GraphRequest::get("act_1/insights").param("time_increment", 7))
            .await
            .unwrap();
        assert_eq!(outcome.status(), 200);
    }

    #[tokio::test]
    async fn post_sends_json_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v19.0/act_1/campaigns"))
            .and(body_json(json!({"name": "Spring"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "42"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, "tok");
        let request = GraphRequest {
            endpoint: "act_1/campaigns".to_string(),
            method: HttpMethod::Post,
            body: Some(json!({"name": "Spring"})),
            ..GraphRequest::default()
        };
        let outcome = client.request(request).await.unwrap();
        assert_eq!(outcome.status(), 200);
    }

    #[tokio::test]
    async fn api_error_is_returned_not_raised() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v19.0/act_bad"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {"message": "Invalid OAuth access token.", "code": 190}
            })))
            .mount(&server)
            .await;

        let client = client_for(&server, "tok");
        let outcome = client.request(GraphRequest::get("act_bad")).await.unwrap();

        match outcome {
            GraphOutcome::ApiError { status, payload } => {
                assert_eq!(status, 400);
                assert_eq!(payload["error"]["code"], 190);
            }
            GraphOutcome::Success { .. } => panic!("Expected ApiError"),
        }
    }

    #[tokio::test]
    async fn non_json_body_is_a_transport_failure() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v19.0/me"))
            .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
            .mount(&server)
            .await;

        let client = client_for(&server, "tok");
        let err = client.request(GraphRequest::get("me")).await.unwrap_err();
        assert!(matches!(err, GraphError::Transport(_)));
    }

    #[tokio::test]
    async fn empty_token_never_reaches_network() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server, "");
        let err = client
            .request(GraphRequest::get("me/adaccounts"))
            .await
            .unwrap_err();
        assert!(matches!(err, GraphError::Configuration));
    }

    #[tokio::test]
    async fn blank_token_never_reaches_network() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server, " \t\n");
        let err = client
            .request(GraphRequest::get("me/adaccounts"))
            .await
            .unwrap_err();
        assert!(matches!(err, GraphError::Configuration));
    }

    #[tokio::test]
    async fn connection_refused_is_a_transport_failure() {
        // Port 9 (discard) on localhost is not expected to accept HTTP.
        let client = GraphClient::new("http://127.0.0.1:9/v19.0", "tok").unwrap();
        let err = client.request(GraphRequest::get("me")).await.unwrap_err();
        assert!(matches!(err, GraphError::Transport(_)));
        assert!(!err.to_string().contains("tok"));
    }

    #[test]
    fn empty_endpoint_is_rejected() {
        let client = GraphClient::new("https://graph.facebook.com/v19.0/", "tok").unwrap();
        assert!(client.url_for("  ").is_err());
        assert_eq!(
            client.url_for("/me").unwrap(),
            "https://graph.facebook.com/v19.0/me"
        );
    }

    #[test]
    fn caller_cannot_override_access_token() {
        let client = GraphClient::new("https://graph.facebook.com/v19.0", "real").unwrap();
        let request = GraphRequest::get("me")
            .param("access_token", "spoofed")
            .param("limit", Value::Null);
        let pairs = client.query_pairs(&request);
        assert_eq!(
            pairs,
            vec![("access_token".to_string(), "real".to_string())]
        );
    }
}
