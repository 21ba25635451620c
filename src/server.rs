//! HTTP server for health and metrics
//!
//! Small observability surface that runs beside the poll loop. It never
//! touches the sync path; handlers read a startup snapshot and the process
//! metrics registry only.
//!
//! # Routes
//!
//! - `GET /health` - Liveness plus a redacted configuration summary
//! - `GET /metrics` - Prometheus text format
//!
//! # Example
//!
//! ```no_run
//! use notion_courier::config::CourierConfig;
//! use notion_courier::server::{HealthServer, HealthState};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = CourierConfig::from_env().expect("config");
//!     let server = HealthServer::new(HealthState::from_config(&config));
//!
//!     server.run("0.0.0.0:8080").await.expect("Server failed");
//! }
//! ```

use crate::config::CourierConfig;
use crate::courier::metrics;
use crate::Result;
use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;

/// Startup snapshot served by the health endpoint
///
/// Secrets are reduced to set/unset booleans; the endpoint must stay safe to
/// expose inside a cluster.
#[derive(Debug)]
pub struct HealthState {
    started_at: Instant,
    poll_interval_secs: u64,
    dry_run: bool,
    notion_token_set: bool,
    notion_database_set: bool,
    github_token_set: bool,
    repo: String,
    project_configured: bool,
}

impl HealthState {
    /// Snapshot the parts of the configuration the endpoint reports
    pub fn from_config(config: &CourierConfig) -> Self {
        Self {
            started_at: Instant::now(),
            poll_interval_secs: config.poll_interval.as_secs(),
            dry_run: config.dry_run,
            notion_token_set: !config.notion_token.is_empty(),
            notion_database_set: !config.notion_database_id.is_empty(),
            github_token_set: !config.github_token.is_empty(),
            repo: config.repo_slug(),
            project_configured: config.github_project_id.is_some(),
        }
    }
}

/// HTTP server for the health and metrics endpoints
pub struct HealthServer {
    state: Arc<HealthState>,
}

impl HealthServer {
    /// Create a new server
    pub fn new(state: HealthState) -> Self {
        Self {
            state: Arc::new(state),
        }
    }

    /// Build the router
    fn router(state: Arc<HealthState>) -> Router {
        Router::new()
            .route("/health", get(health))
            .route("/metrics", get(serve_metrics))
            .with_state(state)
    }

    /// Run the server on the given address
    pub async fn run(self, addr: &str) -> Result<()> {
        let listener = TcpListener::bind(addr).await?;

        tracing::info!(addr = addr, "Health server listening");

        axum::serve(listener, Self::router(self.state)).await?;
        Ok(())
    }
}

async fn health(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "hostname": local_hostname(),
        "uptime_seconds": state.started_at.elapsed().as_secs(),
        "poll_interval_seconds": state.poll_interval_secs,
        "dry_run": state.dry_run,
        "notion_token_set": state.notion_token_set,
        "notion_database_set": state.notion_database_set,
        "github_token_set": state.github_token_set,
        "repo": state.repo,
        "project_configured": state.project_configured,
    }))
}

async fn serve_metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::encode_metrics(),
    )
}

fn local_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::{FieldMappings, StatusTransition};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::path::PathBuf;
    use std::time::Duration;
    use tower::ServiceExt;

    fn test_state() -> Arc<HealthState> {
        let config = CourierConfig {
            notion_token: "secret_n".to_string(),
            notion_database_id: "db-1".to_string(),
            github_token: "ghp_x".to_string(),
            github_owner: "acme".to_string(),
            github_repo: "product".to_string(),
            github_project_id: Some("PVT_1".to_string()),
            project_create_draft: false,
            poll_interval: Duration::from_secs(120),
            dry_run: true,
            transition: StatusTransition::default(),
            ledger_path: PathBuf::from("/tmp/ledger.db"),
            listen_addr: "127.0.0.1:8080".to_string(),
            field_mappings: FieldMappings::default(),
        };
        Arc::new(HealthState::from_config(&config))
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = HealthServer::router(test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(body["status"], "ok");
        assert_eq!(body["repo"], "acme/product");
        assert_eq!(body["dry_run"], true);
        assert_eq!(body["notion_token_set"], true);
        assert_eq!(body["project_configured"], true);
        // The token itself never appears
        assert!(!String::from_utf8_lossy(&bytes).contains("secret_n"));
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let app = HealthServer::router(test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/metrics")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; version=0.0.4"
        );
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let app = HealthServer::router(test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/nope")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
