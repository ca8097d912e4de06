use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{Router, middleware};
use tower_http::cors::CorsLayer;

use super::api::{self, AppState, ServiceInfo, SharedState};
use super::db::{DEFAULT_TABLE, DbHandle, TodoDb};
use super::metrics::{
    DEFAULT_FLUSH_INTERVAL, HttpMetricsSink, LogMetricsSink, MetricsCollector, MetricsSink,
    spawn_flush_task, track_requests,
};

pub const DEFAULT_PORT: u16 = 5001;
pub const DEFAULT_REGION: &str = "eu-west-1";
pub const DEFAULT_ENVIRONMENT: &str = "development";

/// Configuration for the todo API server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub table_name: String,
    pub region: String,
    pub environment: String,
    pub metrics: MetricsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            db_path: PathBuf::from(".checky/todos.db"),
            table_name: DEFAULT_TABLE.to_string(),
            region: DEFAULT_REGION.to_string(),
            environment: DEFAULT_ENVIRONMENT.to_string(),
            metrics: MetricsConfig::default(),
        }
    }
}

/// Periodic metrics push settings.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    pub enabled: bool,
    /// Monitoring endpoint; reports go to the log when unset.
    pub endpoint: Option<String>,
    pub interval: Duration,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: None,
            interval: DEFAULT_FLUSH_INTERVAL,
        }
    }
}

/// Metrics push runs in production unless explicitly overridden.
pub fn metrics_enabled_for(environment: &str, override_flag: Option<bool>) -> bool {
    override_flag.unwrap_or_else(|| environment.eq_ignore_ascii_case("production"))
}

/// Build the full application router: API routes, request metrics and CORS.
pub fn build_router(state: SharedState) -> Router {
    let metrics = state.metrics.clone();

    api::api_router()
        .with_state(state)
        .layer(middleware::from_fn_with_state(metrics, track_requests))
        .layer(CorsLayer::permissive())
}

/// Open the store at the configured path, creating its directory and table.
pub fn open_store(config: &ServerConfig) -> Result<TodoDb> {
    if let Some(parent) = config
        .db_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
    {
        std::fs::create_dir_all(parent).context("Failed to create database directory")?;
    }
    TodoDb::new(&config.db_path, &config.table_name).with_context(|| {
        format!(
            "Failed to initialize todo store at {}",
            config.db_path.display()
        )
    })
}

/// Create the table if it does not exist, then return without serving.
pub fn init_store(config: &ServerConfig) -> Result<()> {
    let db = open_store(config)?;
    tracing::info!(
        path = %config.db_path.display(),
        table = db.table(),
        "Todo table ready"
    );
    Ok(())
}

fn metrics_sink(config: &ServerConfig) -> Result<Arc<dyn MetricsSink>> {
    match &config.metrics.endpoint {
        Some(endpoint) => Ok(Arc::new(HttpMetricsSink::new(
            endpoint.clone(),
            config.region.clone(),
        )?)),
        None => Ok(Arc::new(LogMetricsSink)),
    }
}

/// Start the todo API server and run until Ctrl+C or SIGTERM.
pub async fn start_server(config: ServerConfig) -> Result<()> {
    let db = open_store(&config)?;
    let metrics = Arc::new(MetricsCollector::new());

    let state = Arc::new(AppState {
        db: DbHandle::new(db),
        metrics: metrics.clone(),
        service: ServiceInfo::new(config.environment.clone()),
    });

    let flush_task = if config.metrics.enabled {
        let sink = metrics_sink(&config)?;
        tracing::info!(
            interval_secs = config.metrics.interval.as_secs(),
            endpoint = config.metrics.endpoint.as_deref().unwrap_or("log"),
            "Metrics push enabled"
        );
        Some(spawn_flush_task(metrics, sink, config.metrics.interval))
    } else {
        None
    };

    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    let local_addr = listener.local_addr()?;
    tracing::info!(
        environment = %config.environment,
        table = %config.table_name,
        "Todo API listening on http://{}",
        local_addr
    );

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error");

    if let Some(handle) = flush_task {
        handle.abort();
    }
    result?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("SIGINT received, shutting down"),
        _ = terminate => tracing::info!("SIGTERM received, shutting down"),
    }
}
