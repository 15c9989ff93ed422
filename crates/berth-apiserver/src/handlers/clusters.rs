use crate::response::ApiResponse;
use crate::validation::{validate_id, validate_name};
use crate::{ApiError, AppState, Result};
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use berth_core::{Cluster, Deployment, Resources};
use berth_storage::RecordStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Body of `POST /api/v1/clusters`
#[derive(Debug, Clone, Deserialize)]
pub struct CreateClusterRequest {
    pub name: String,
    pub total_cpu: f64,
    pub total_gpu: f64,
    pub total_ram: f64,
}

/// Cluster totals and utilization as served over HTTP
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterStatus {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub total_cpu: f64,
    pub total_gpu: f64,
    pub total_ram: f64,
    pub utilized_cpu: f64,
    pub utilized_gpu: f64,
    pub utilized_ram: f64,
}

impl From<&Cluster> for ClusterStatus {
    fn from(cluster: &Cluster) -> Self {
        Self {
            id: cluster.id.clone(),
            name: cluster.name.clone(),
            created_at: cluster.created_at,
            total_cpu: cluster.total.cpu,
            total_gpu: cluster.total.gpu,
            total_ram: cluster.total.ram,
            utilized_cpu: cluster.utilized.cpu,
            utilized_gpu: cluster.utilized.gpu,
            utilized_ram: cluster.utilized.ram,
        }
    }
}

/// Look up a cluster or fail with 404
pub(crate) fn load_cluster(state: &AppState, cluster_id: &str) -> Result<Cluster> {
    validate_id("Cluster", cluster_id)?;
    state
        .storage
        .get_cluster(cluster_id)?
        .ok_or_else(|| ApiError::NotFound(format!("Cluster not found: {}", cluster_id)))
}

/// POST /api/v1/clusters
pub async fn create_cluster(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateClusterRequest>,
) -> Result<Response> {
    validate_name("Cluster", &req.name)?;

    let cluster = Cluster::new(
        req.name,
        Resources::new(req.total_cpu, req.total_gpu, req.total_ram),
    );
    cluster.validate()?;

    state.storage.put_cluster(&cluster)?;
    info!("Created cluster {} ({})", cluster.name, cluster.id);

    Ok(ApiResponse::created(ClusterStatus::from(&cluster)).into_response())
}

/// GET /api/v1/clusters/{id}
pub async fn get_cluster(
    State(state): State<Arc<AppState>>,
    Path(cluster_id): Path<String>,
) -> Result<Response> {
    let cluster = load_cluster(&state, &cluster_id)?;
    Ok(ApiResponse::ok(ClusterStatus::from(&cluster)).into_response())
}

/// GET /api/v1/clusters
pub async fn list_clusters(State(state): State<Arc<AppState>>) -> Result<Response> {
    let clusters: Vec<ClusterStatus> = state
        .storage
        .list_clusters()?
        .iter()
        .map(ClusterStatus::from)
        .collect();

    Ok(ApiResponse::ok(clusters).into_response())
}

/// GET /api/v1/clusters/{id}/deployments
///
/// Deployments that have been placed on the cluster, running or stopped.
pub async fn list_cluster_deployments(
    State(state): State<Arc<AppState>>,
    Path(cluster_id): Path<String>,
) -> Result<Response> {
    let cluster = load_cluster(&state, &cluster_id)?;

    let deployments: Vec<Deployment> = state
        .storage
        .list_deployments()?
        .into_iter()
        .filter(|d| d.cluster_id.as_deref() == Some(cluster.id.as_str()))
        .collect();

    Ok(ApiResponse::ok(deployments).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use berth_storage::RedbBackend;

    fn setup_state() -> Arc<AppState> {
        let storage = Arc::new(RedbBackend::in_memory().unwrap());
        Arc::new(AppState::new(storage))
    }

    fn request(name: &str) -> CreateClusterRequest {
        CreateClusterRequest {
            name: name.to_string(),
            total_cpu: 8.0,
            total_gpu: 1.0,
            total_ram: 32.0,
        }
    }

    #[tokio::test]
    async fn test_create_cluster_starts_idle() {
        let state = setup_state();

        let response = create_cluster(State(state.clone()), Json(request("edge")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let clusters = state.storage.list_clusters().unwrap();
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].name, "edge");
        assert_eq!(clusters[0].utilized, Resources::zero());
    }

    #[tokio::test]
    async fn test_create_cluster_rejects_negative_capacity() {
        let state = setup_state();
        let mut req = request("edge");
        req.total_ram = -1.0;

        let result = create_cluster(State(state.clone()), Json(req)).await;
        assert!(matches!(result, Err(ApiError::ValidationFailed(_))));
        assert!(state.storage.list_clusters().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_missing_cluster() {
        let state = setup_state();
        let result = get_cluster(State(state), Path("missing".to_string())).await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }

    #[test]
    fn test_cluster_status_flattens_resources() {
        let mut cluster = Cluster::new("edge", Resources::new(8.0, 1.0, 32.0));
        cluster.utilized = Resources::new(2.0, 0.0, 4.0);

        let status = ClusterStatus::from(&cluster);
        assert_eq!(status.total_gpu, 1.0);
        assert_eq!(status.utilized_cpu, 2.0);
        assert_eq!(status.utilized_ram, 4.0);
    }
}
