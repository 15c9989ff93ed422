use crate::handlers::*;
use crate::AppState;
use axum::routing::{get, post};
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

/// API server configuration
#[derive(Clone)]
pub struct Config {
    /// Address to listen on
    pub listen_addr: SocketAddr,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
        }
    }
}

/// Build the HTTP router over shared state
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health checks
        .route("/healthz", get(healthz))
        .route("/livez", get(livez))
        .route("/readyz", get(readyz))
        // Clusters
        .route("/api/v1/clusters", get(list_clusters).post(create_cluster))
        .route("/api/v1/clusters/{id}", get(get_cluster))
        .route(
            "/api/v1/clusters/{id}/deployments",
            get(list_cluster_deployments),
        )
        .route("/api/v1/clusters/{id}/queue", get(cluster_queue_status))
        .route("/api/v1/clusters/{id}/drain", post(drain_cluster))
        // Deployments
        .route("/api/v1/deployments", post(create_deployment))
        .route("/api/v1/deployments/{id}", get(get_deployment))
        .route("/api/v1/deployments/{id}/stop", post(stop_deployment))
        // Scheduler
        .route("/api/v1/schedule", post(schedule))
        .route("/api/v1/queues", get(queue_status))
        // Add tracing and state
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// API server
pub struct ApiServer {
    config: Config,
    state: Arc<AppState>,
}

impl ApiServer {
    /// Create a new API server
    pub fn new(config: Config, state: Arc<AppState>) -> Self {
        Self { config, state }
    }

    /// Build the router
    fn build_router(&self) -> Router {
        router(self.state.clone())
    }

    /// Run the server until `shutdown` resolves
    pub async fn run(self, shutdown: impl Future<Output = ()> + Send + 'static) -> Result<(), std::io::Error> {
        let app = self.build_router();

        info!("Starting API server on {}", self.config.listen_addr);

        let listener = TcpListener::bind(self.config.listen_addr).await?;

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
    }
}

/// Health check endpoint
async fn healthz() -> &'static str {
    "ok"
}

/// Liveness probe
async fn livez() -> &'static str {
    "ok"
}

/// Readiness probe
async fn readyz() -> &'static str {
    "ok"
}
