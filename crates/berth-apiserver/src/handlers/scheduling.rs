use crate::handlers::clusters::load_cluster;
use crate::response::ApiResponse;
use crate::validation::validate_id;
use crate::{ApiError, AppState, Result};
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use berth_core::QueueLengths;
use berth_scheduler::{DrainReport, SubmitRequest};
use berth_storage::RecordStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Response of `POST /api/v1/schedule`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleResponse {
    pub message: String,
    pub deployment_id: String,
    pub cluster_id: String,
    pub drain: DrainReport,
}

/// Queue lengths of one cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterQueueStatus {
    pub cluster_id: String,
    pub cluster_name: String,
    pub queues: QueueLengths,
}

/// POST /api/v1/schedule
///
/// Queue an existing deployment record on a cluster.
pub async fn schedule(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SubmitRequest>,
) -> Result<Response> {
    validate_id("Cluster", &req.cluster_id)?;
    validate_id("Deployment", &req.deployment_id)?;

    if state.storage.get_deployment(&req.deployment_id)?.is_none() {
        return Err(ApiError::NotFound(format!(
            "Deployment not found: {}",
            req.deployment_id
        )));
    }

    let outcome = state.engine.submit(req).await?;

    Ok(ApiResponse::ok(ScheduleResponse {
        message: "Deployment queued successfully".to_string(),
        deployment_id: outcome.deployment_id,
        cluster_id: outcome.cluster_id,
        drain: outcome.drain,
    })
    .into_response())
}

/// POST /api/v1/clusters/{id}/drain
pub async fn drain_cluster(
    State(state): State<Arc<AppState>>,
    Path(cluster_id): Path<String>,
) -> Result<Response> {
    let cluster = load_cluster(&state, &cluster_id)?;
    info!("Manual drain requested for cluster {}", cluster.id);

    let report = state.engine.drain(&cluster.id).await?;

    Ok(ApiResponse::ok(report).into_response())
}

/// GET /api/v1/clusters/{id}/queue
pub async fn cluster_queue_status(
    State(state): State<Arc<AppState>>,
    Path(cluster_id): Path<String>,
) -> Result<Response> {
    let cluster = load_cluster(&state, &cluster_id)?;
    let queues = state.engine.queue_status(&cluster.id).await?;

    Ok(ApiResponse::ok(ClusterQueueStatus {
        cluster_id: cluster.id,
        cluster_name: cluster.name,
        queues,
    })
    .into_response())
}

/// GET /api/v1/queues
pub async fn queue_status(State(state): State<Arc<AppState>>) -> Result<Response> {
    let mut statuses = Vec::new();
    for cluster in state.storage.list_clusters()? {
        let queues = state.engine.queue_status(&cluster.id).await?;
        statuses.push(ClusterQueueStatus {
            cluster_id: cluster.id,
            cluster_name: cluster.name,
            queues,
        });
    }

    Ok(ApiResponse::ok(statuses).into_response())
}
