use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Method, Url};
use serde::Serialize;

use super::envelope::{ItemEnvelope, ListEnvelope};
use super::error::ClientError;
use super::retry::RetryPolicy;
use crate::models::{CreateTodo, Todo, UpdateTodo};

pub const DEFAULT_API_URL: &str = "http://localhost:5001";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings for [`ApiClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }
}

impl ClientConfig {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }
}

/// What the client is pointed at, for display.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiInfo {
    pub base_url: String,
    pub timeout_ms: u64,
    pub version: &'static str,
}

/// The todo REST API as seen by the state container.
#[async_trait]
pub trait TodoApi: Send + Sync {
    async fn list_todos(&self) -> Result<Vec<Todo>, ClientError>;
    async fn create_todo(&self, req: CreateTodo) -> Result<Todo, ClientError>;
    async fn update_todo(&self, id: &str, req: UpdateTodo) -> Result<Todo, ClientError>;
    async fn delete_todo(&self, id: &str) -> Result<(), ClientError>;
}

/// HTTP client for the todo API.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    config: ClientConfig,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let base_url = Url::parse(&config.base_url).map_err(|e| ClientError::Config {
            message: format!("invalid API URL '{}': {}", config.base_url, e),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::Config {
                message: format!("API URL '{}' cannot carry a path", config.base_url),
            });
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            base_url,
            config,
        })
    }

    pub fn info(&self) -> ApiInfo {
        ApiInfo {
            base_url: self.base_url.to_string(),
            timeout_ms: self.config.timeout.as_millis() as u64,
            version: env!("CARGO_PKG_VERSION"),
        }
    }

    /// Single `GET /health` without retries.
    pub async fn health(&self) -> bool {
        let url = match self.endpoint(&["health"]) {
            Ok(url) => url,
            Err(_) => return false,
        };
        match self.send(Method::GET, url, None).await {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!("Health check failed: {}", e);
                false
            }
        }
    }

    /// Join path segments onto the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::Config {
                message: "API URL cannot carry a path".to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<&serde_json::Value>,
    ) -> Result<Option<serde_json::Value>, ClientError> {
        tracing::debug!(%method, %url, "API request");

        let mut request = self.http.request(method.clone(), url);
        if method == Method::GET {
            request = request.query(&[("_t", chrono::Utc::now().timestamp_millis())]);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let content_length = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        let text = response.text().await?;
        tracing::debug!(status = status.as_u16(), "API response");

        if !status.is_success() {
            return Err(ClientError::from_response(status.as_u16(), &text));
        }
        parse_payload(
            status.as_u16(),
            content_type.as_deref(),
            content_length,
            &text,
        )
    }

    async fn execute(
        &self,
        label: &str,
        method: Method,
        url: Url,
        body: Option<serde_json::Value>,
    ) -> Result<Option<serde_json::Value>, ClientError> {
        self.config
            .retry
            .run(label, || self.send(method.clone(), url.clone(), body.as_ref()))
            .await
    }
}

#[async_trait]
impl TodoApi for ApiClient {
    async fn list_todos(&self) -> Result<Vec<Todo>, ClientError> {
        let url = self.endpoint(&["todos"])?;
        match self.execute("list todos", Method::GET, url, None).await? {
            Some(payload) => Ok(decode::<ListEnvelope>(payload)?.into_items()),
            None => Ok(Vec::new()),
        }
    }

    async fn create_todo(&self, req: CreateTodo) -> Result<Todo, ClientError> {
        req.validate()?;
        let url = self.endpoint(&["todos"])?;
        let body = to_body(&req)?;
        let payload = self
            .execute("create todo", Method::POST, url, Some(body))
            .await?;
        expect_item(payload)
    }

    async fn update_todo(&self, id: &str, req: UpdateTodo) -> Result<Todo, ClientError> {
        req.validate()?;
        let url = self.endpoint(&["todos", id])?;
        let body = to_body(&req)?;
        let payload = self
            .execute("update todo", Method::PUT, url, Some(body))
            .await?;
        expect_item(payload)
    }

    async fn delete_todo(&self, id: &str) -> Result<(), ClientError> {
        let url = self.endpoint(&["todos", id])?;
        self.execute("delete todo", Method::DELETE, url, None)
            .await?;
        Ok(())
    }
}

/// Decide whether a successful response carries a JSON payload.
///
/// 204, `Content-Length: 0`, an empty body, or a non-JSON content type all
/// mean "no payload" rather than an error.
fn parse_payload(
    status: u16,
    content_type: Option<&str>,
    content_length: Option<u64>,
    body: &str,
) -> Result<Option<serde_json::Value>, ClientError> {
    if status == 204 || content_length == Some(0) {
        return Ok(None);
    }
    if content_type.is_some_and(|ct| !ct.to_ascii_lowercase().contains("application/json")) {
        return Ok(None);
    }
    if body.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(body)
        .map(Some)
        .map_err(|e| ClientError::Decode {
            message: format!("invalid JSON: {}", e),
        })
}

fn decode<T: serde::de::DeserializeOwned>(payload: serde_json::Value) -> Result<T, ClientError> {
    serde_json::from_value(payload).map_err(|e| ClientError::Decode {
        message: e.to_string(),
    })
}

fn expect_item(payload: Option<serde_json::Value>) -> Result<Todo, ClientError> {
    let payload = payload.ok_or_else(|| ClientError::Decode {
        message: "expected a todo in the response body".to_string(),
    })?;
    Ok(decode::<ItemEnvelope>(payload)?.into_item())
}

fn to_body<T: Serialize>(value: &T) -> Result<serde_json::Value, ClientError> {
    serde_json::to_value(value).map_err(|e| ClientError::Decode {
        message: format!("failed to encode request: {}", e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> ApiClient {
        ApiClient::new(ClientConfig {
            base_url: base.to_string(),
            timeout: Duration::from_millis(200),
            retry: RetryPolicy::none(),
        })
        .unwrap()
    }

    #[test]
    fn test_client_config_default() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:5001");
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.retry, RetryPolicy::default());
    }

    #[test]
    fn test_invalid_base_url_is_config_error() {
        let err = ApiClient::new(ClientConfig::with_base_url("not a url")).err().unwrap();
        assert!(matches!(err, ClientError::Config { .. }));

        let err = ApiClient::new(ClientConfig::with_base_url("mailto:someone@example.com"))
            .err()
            .unwrap();
        assert!(matches!(err, ClientError::Config { .. }));
    }

    #[test]
    fn test_endpoint_joins_segments() {
        let api = client("http://localhost:5001");
        assert_eq!(
            api.endpoint(&["todos"]).unwrap().as_str(),
            "http://localhost:5001/todos"
        );

        let prefixed = client("http://example.com/api/");
        assert_eq!(
            prefixed.endpoint(&["todos", "abc"]).unwrap().as_str(),
            "http://example.com/api/todos/abc"
        );
    }

    #[test]
    fn test_endpoint_encodes_ids() {
        let api = client("http://localhost:5001");
        let url = api.endpoint(&["todos", "a/b c"]).unwrap();
        assert_eq!(url.path(), "/todos/a%2Fb%20c");
    }

    #[test]
    fn test_info_reports_config() {
        let info = client("http://localhost:5001").info();
        assert_eq!(info.base_url, "http://localhost:5001/");
        assert_eq!(info.timeout_ms, 200);
        assert_eq!(info.version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_parse_payload_permissive_cases() {
        assert!(parse_payload(204, Some("application/json"), None, "").unwrap().is_none());
        assert!(parse_payload(200, Some("application/json"), Some(0), "").unwrap().is_none());
        assert!(parse_payload(200, Some("text/html"), None, "<html/>").unwrap().is_none());
        assert!(parse_payload(200, None, None, "   ").unwrap().is_none());

        let value = parse_payload(200, Some("application/json; charset=utf-8"), None, "[]")
            .unwrap()
            .unwrap();
        assert!(value.as_array().unwrap().is_empty());
    }

    #[test]
    fn test_parse_payload_rejects_malformed_json() {
        let err = parse_payload(200, Some("application/json"), None, "{oops").unwrap_err();
        assert!(matches!(err, ClientError::Decode { .. }));
    }

    #[test]
    fn test_expect_item_requires_payload() {
        assert!(matches!(expect_item(None), Err(ClientError::Decode { .. })));
    }

    #[tokio::test]
    async fn test_create_validates_before_network() {
        // Nothing listens on port 9; a request would surface as Transport.
        let api = client("http://127.0.0.1:9");
        let err = api.create_todo(CreateTodo::new("   ", None)).await.unwrap_err();
        assert!(matches!(err, ClientError::Validation { .. }));
        assert_eq!(err.user_message(), "Title is required");

        let err = api
            .update_todo(
                "x",
                UpdateTodo {
                    title: Some("t".repeat(101)),
                    ..UpdateTodo::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        let api = client("http://127.0.0.1:9");
        let err = api.list_todos().await.unwrap_err();
        assert!(matches!(err, ClientError::Transport { .. }), "got {:?}", err);
        assert_eq!(err.status(), Some(0));
        assert!(!api.health().await);
    }
}
