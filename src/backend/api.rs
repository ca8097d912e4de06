use std::sync::Arc;
use std::time::Instant;

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::db::DbHandle;
use super::metrics::MetricsCollector;
use crate::errors::TodoError;
use crate::models::{CreateTodo, FieldErrors, UpdateTodo};

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub db: DbHandle,
    pub metrics: Arc<MetricsCollector>,
    pub service: ServiceInfo,
}

pub type SharedState = Arc<AppState>;

/// Static facts about the running process reported by `/health` and `/metrics`.
pub struct ServiceInfo {
    pub environment: String,
    pub version: &'static str,
    pub started_at: Instant,
}

impl ServiceInfo {
    pub fn new(environment: impl Into<String>) -> Self {
        Self {
            environment: environment.into(),
            version: env!("CARGO_PKG_VERSION"),
            started_at: Instant::now(),
        }
    }
}

// ── Response payload types ────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub version: &'static str,
    pub environment: String,
}

#[derive(Debug, Serialize)]
pub struct ProcessMetrics {
    /// Seconds since the server started.
    pub uptime: f64,
    pub memory: MemoryUsage,
    pub timestamp: DateTime<Utc>,
    pub pid: u32,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryUsage {
    pub rss_bytes: Option<u64>,
    pub virtual_bytes: Option<u64>,
}

// ── Error handling ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, Json(serde_json::json!({"error": msg}))).into_response()
            }
            ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, Json(serde_json::json!({"error": msg}))).into_response()
            }
            ApiError::Internal(msg) => {
                // Detail stays in the log; clients only see a generic message
                tracing::error!("Unhandled server error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({
                        "error": "Internal server error",
                        "timestamp": Utc::now(),
                    })),
                )
                    .into_response()
            }
        }
    }
}

impl From<TodoError> for ApiError {
    fn from(err: TodoError) -> Self {
        match err {
            TodoError::Validation(errors) => ApiError::BadRequest(errors.summary()),
            TodoError::NotFound { .. } => ApiError::NotFound("Todo not found".to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<FieldErrors> for ApiError {
    fn from(errors: FieldErrors) -> Self {
        ApiError::BadRequest(errors.summary())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(format!("Invalid request body: {}", rejection.body_text()))
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/todos", get(list_todos).post(create_todo))
        .route("/todos/{id}", put(update_todo).delete(delete_todo))
        .route("/health", get(health_check))
        .route("/metrics", get(process_metrics))
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn health_check(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK",
        timestamp: Utc::now(),
        version: state.service.version,
        environment: state.service.environment.clone(),
    })
}

async fn process_metrics(State(state): State<SharedState>) -> Json<ProcessMetrics> {
    Json(ProcessMetrics {
        uptime: state.service.started_at.elapsed().as_secs_f64(),
        memory: read_memory_usage(),
        timestamp: Utc::now(),
        pid: std::process::id(),
    })
}

async fn list_todos(State(state): State<SharedState>) -> Result<impl IntoResponse, ApiError> {
    let todos = state.db.call(|db| db.list_todos()).await?;
    Ok(Json(todos))
}

async fn create_todo(
    State(state): State<SharedState>,
    payload: Result<Json<CreateTodo>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    req.validate()?;
    let todo = state.db.call(move |db| db.create_todo(req)).await?;
    tracing::debug!(id = %todo.id, "Todo created");
    Ok((StatusCode::CREATED, Json(todo)))
}

async fn update_todo(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateTodo>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    req.validate()?;
    let todo = state.db.call(move |db| db.update_todo(&id, req)).await?;
    tracing::debug!(id = %todo.id, completed = todo.completed, "Todo updated");
    Ok(Json(todo))
}

async fn delete_todo(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted_id = id.clone();
    state.db.call(move |db| db.delete_todo(&id)).await?;
    tracing::debug!(id = %deleted_id, "Todo deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ── Helpers ───────────────────────────────────────────────────────────

/// Resident and virtual memory of this process, where the platform exposes them.
fn read_memory_usage() -> MemoryUsage {
    std::fs::read_to_string("/proc/self/status")
        .map(|status| parse_proc_status(&status))
        .unwrap_or_default()
}

fn parse_proc_status(status: &str) -> MemoryUsage {
    let kb_field = |name: &str| {
        status
            .lines()
            .find_map(|line| line.strip_prefix(name))
            .and_then(|rest| rest.trim().trim_end_matches("kB").trim().parse::<u64>().ok())
            .map(|kb| kb * 1024)
    };
    MemoryUsage {
        rss_bytes: kb_field("VmRSS:"),
        virtual_bytes: kb_field("VmSize:"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::db::TodoDb;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_state() -> SharedState {
        let db = TodoDb::new_in_memory().unwrap();
        Arc::new(AppState {
            db: DbHandle::new(db),
            metrics: Arc::new(MetricsCollector::new()),
            service: ServiceInfo::new("test"),
        })
    }

    fn test_app() -> Router {
        api_router().with_state(test_state())
    }

    async fn body_json<T: serde::de::DeserializeOwned>(body: Body) -> T {
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn create(app: &Router, body: serde_json::Value) -> serde_json::Value {
        let response = app
            .clone()
            .oneshot(json_request("POST", "/todos", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        body_json(response.into_body()).await
    }

    // 1. Health check
    #[tokio::test]
    async fn test_health_check() {
        let app = test_app();

        let request = Request::builder()
            .method("GET")
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let health: serde_json::Value = body_json(response.into_body()).await;
        assert_eq!(health["status"], "OK");
        assert_eq!(health["environment"], "test");
        assert_eq!(health["version"], env!("CARGO_PKG_VERSION"));
        assert!(health["timestamp"].is_string());
    }

    // 2. Process metrics
    #[tokio::test]
    async fn test_process_metrics() {
        let app = test_app();

        let request = Request::builder()
            .uri("/metrics")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let metrics: serde_json::Value = body_json(response.into_body()).await;
        assert!(metrics["uptime"].as_f64().unwrap() >= 0.0);
        assert_eq!(metrics["pid"].as_u64().unwrap(), std::process::id() as u64);
        assert!(metrics["memory"].is_object());
        assert!(metrics["timestamp"].is_string());
    }

    // 3. List (empty)
    #[tokio::test]
    async fn test_list_todos_empty() {
        let app = test_app();

        let request = Request::builder()
            .uri("/todos")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let todos: Vec<serde_json::Value> = body_json(response.into_body()).await;
        assert!(todos.is_empty());
    }

    // 4. Create
    #[tokio::test]
    async fn test_create_todo() {
        let app = test_app();

        let todo = create(
            &app,
            serde_json::json!({"title": "Buy milk", "description": "2 litres"}),
        )
        .await;
        assert_eq!(todo["title"], "Buy milk");
        assert_eq!(todo["description"], "2 litres");
        assert_eq!(todo["completed"], false);
        assert!(!todo["id"].as_str().unwrap().is_empty());
        assert_eq!(todo["createdAt"], todo["updatedAt"]);
    }

    // 5. Create without a title
    #[tokio::test]
    async fn test_create_todo_requires_title() {
        let state = test_state();
        let app = api_router().with_state(state.clone());

        for body in [
            serde_json::json!({}),
            serde_json::json!({"title": ""}),
            serde_json::json!({"title": "   ", "description": "x"}),
        ] {
            let response = app
                .clone()
                .oneshot(json_request("POST", "/todos", body))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            let err: serde_json::Value = body_json(response.into_body()).await;
            assert_eq!(err["error"], "Title is required");
        }

        let stored = state.db.call(|db| db.list_todos()).await.unwrap();
        assert!(stored.is_empty());
    }

    // 6. Create with an over-long title
    #[tokio::test]
    async fn test_create_todo_rejects_long_title() {
        let app = test_app();
        let response = app
            .oneshot(json_request(
                "POST",
                "/todos",
                serde_json::json!({"title": "x".repeat(101)}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    // 7. Malformed JSON
    #[tokio::test]
    async fn test_create_todo_malformed_json_is_bad_request() {
        let app = test_app();
        let request = Request::builder()
            .method("POST")
            .uri("/todos")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let err: serde_json::Value = body_json(response.into_body()).await;
        assert!(err["error"].as_str().unwrap().starts_with("Invalid request body"));
    }

    // 8. Update
    #[tokio::test]
    async fn test_update_todo() {
        let app = test_app();
        let todo = create(
            &app,
            serde_json::json!({"title": "Old title", "description": "Old desc"}),
        )
        .await;
        let id = todo["id"].as_str().unwrap();

        let response = app
            .clone()
            .oneshot(json_request(
                "PUT",
                &format!("/todos/{}", id),
                serde_json::json!({"title": "New title", "completed": true}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let updated: serde_json::Value = body_json(response.into_body()).await;
        assert_eq!(updated["title"], "New title");
        assert_eq!(updated["description"], "Old desc");
        assert_eq!(updated["completed"], true);
        assert_eq!(updated["createdAt"], todo["createdAt"]);
    }

    // 9. Update with only `completed`
    #[tokio::test]
    async fn test_update_completed_only_preserves_fields() {
        let app = test_app();
        let todo = create(&app, serde_json::json!({"title": "Keep", "description": "me"})).await;
        let id = todo["id"].as_str().unwrap();

        let response = app
            .oneshot(json_request(
                "PUT",
                &format!("/todos/{}", id),
                serde_json::json!({"completed": true}),
            ))
            .await
            .unwrap();
        let updated: serde_json::Value = body_json(response.into_body()).await;
        assert_eq!(updated["title"], "Keep");
        assert_eq!(updated["description"], "me");
        assert_eq!(updated["completed"], true);
    }

    // 10. Update validation and not-found
    #[tokio::test]
    async fn test_update_todo_errors() {
        let app = test_app();
        let todo = create(&app, serde_json::json!({"title": "Valid"})).await;
        let id = todo["id"].as_str().unwrap();

        let response = app
            .clone()
            .oneshot(json_request(
                "PUT",
                &format!("/todos/{}", id),
                serde_json::json!({"title": ""}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .oneshot(json_request(
                "PUT",
                "/todos/does-not-exist",
                serde_json::json!({"completed": true}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let err: serde_json::Value = body_json(response.into_body()).await;
        assert_eq!(err["error"], "Todo not found");
    }

    // 11. Delete
    #[tokio::test]
    async fn test_delete_todo() {
        let app = test_app();
        let todo = create(&app, serde_json::json!({"title": "Delete me"})).await;
        let id = todo["id"].as_str().unwrap();

        let request = Request::builder()
            .method("DELETE")
            .uri(format!("/todos/{}", id))
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert!(bytes.is_empty());

        // Deleting again is a 404
        let request = Request::builder()
            .method("DELETE")
            .uri(format!("/todos/{}", id))
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        // And so is updating it
        let response = app
            .clone()
            .oneshot(json_request(
                "PUT",
                &format!("/todos/{}", id),
                serde_json::json!({"completed": true}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        // Verify the list is empty
        let request = Request::builder().uri("/todos").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        let todos: Vec<serde_json::Value> = body_json(response.into_body()).await;
        assert!(todos.is_empty());
    }

    // 12. Store failure maps to a generic 500
    #[tokio::test]
    async fn test_store_failure_is_generic_internal_error() {
        let state = test_state();
        // Break the store underneath the handler
        state.db.lock_sync().unwrap().drop_table_for_test();
        let app = api_router().with_state(state);

        let request = Request::builder().uri("/todos").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let err: serde_json::Value = body_json(response.into_body()).await;
        assert_eq!(err["error"], "Internal server error");
        assert!(err["timestamp"].is_string());
        assert!(!err.to_string().contains("no such table"));
    }

    #[test]
    fn test_parse_proc_status() {
        let status = "Name:\tchecky\nVmSize:\t  204800 kB\nVmRSS:\t   10240 kB\n";
        let usage = parse_proc_status(status);
        assert_eq!(usage.virtual_bytes, Some(204800 * 1024));
        assert_eq!(usage.rss_bytes, Some(10240 * 1024));

        let empty = parse_proc_status("");
        assert!(empty.rss_bytes.is_none());
    }

    #[test]
    fn test_todo_error_maps_to_api_error() {
        assert!(matches!(
            ApiError::from(TodoError::NotFound { id: "x".into() }),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            ApiError::from(TodoError::LockPoisoned),
            ApiError::Internal(_)
        ));
    }
}
