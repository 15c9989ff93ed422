use crate::handlers::clusters::load_cluster;
use crate::response::ApiResponse;
use crate::validation::{validate_id, validate_name};
use crate::{ApiError, AppState, Result};
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use berth_core::{ClusterUtilization, Deployment, DeploymentStatus, Priority, Resources};
use berth_scheduler::{admission, DrainReport, SchedulerError, SubmitRequest};
use berth_storage::RecordStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

fn default_deployment_name() -> String {
    "deployment".to_string()
}

/// Body of `POST /api/v1/deployments`
#[derive(Debug, Clone, Deserialize)]
pub struct CreateDeploymentRequest {
    #[serde(default = "default_deployment_name")]
    pub name: String,
    pub docker_image: String,
    pub cpu_required: f64,
    pub gpu_required: f64,
    pub ram_required: f64,
    pub priority: Priority,
    pub cluster_id: String,
    #[serde(default)]
    pub service_name: Option<String>,
}

/// Response of `POST /api/v1/deployments`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDeploymentResponse {
    pub message: String,
    pub deployment_id: String,
    pub cluster_id: String,
    /// Status after the drain pass triggered by the submission
    pub status: DeploymentStatus,
    pub drain: DrainReport,
}

/// Response of `POST /api/v1/deployments/{id}/stop`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopDeploymentResponse {
    pub message: String,
    pub deployment_id: String,
    pub cluster_status: ClusterUtilization,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drain: Option<DrainReport>,
}

/// POST /api/v1/deployments
///
/// Persists the deployment as queued and submits it to its cluster. A
/// requirement larger than the cluster's totals is refused up front since no
/// amount of waiting would ever admit it.
///
/// The record is written before submission. If submission then fails, the
/// queued record stays and the error body carries its `deployment_id`;
/// clients resubmit it with `POST /api/v1/schedule` instead of calling this
/// endpoint again, which would create a second deployment.
pub async fn create_deployment(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateDeploymentRequest>,
) -> Result<Response> {
    validate_name("Deployment", &req.name)?;
    let cluster = load_cluster(&state, &req.cluster_id)?;

    let deployment = Deployment::new(
        req.name,
        req.docker_image,
        Resources::new(req.cpu_required, req.gpu_required, req.ram_required),
        req.priority,
    );
    deployment.validate()?;

    let fit = admission::fits_total(&cluster, &deployment);
    if !fit.admitted {
        let reason = fit.reason.unwrap_or_default();
        return Err(SchedulerError::capacity_exceeded(&cluster.id, reason).into());
    }

    state.storage.put_deployment(&deployment)?;
    info!(
        "Created deployment {} ({}) for cluster {}",
        deployment.name, deployment.id, cluster.id
    );

    let outcome = state
        .engine
        .submit(SubmitRequest {
            deployment_id: deployment.id.clone(),
            cluster_id: cluster.id.clone(),
            priority: deployment.priority,
            cpu: deployment.required.cpu,
            gpu: deployment.required.gpu,
            ram: deployment.required.ram,
            docker_image: deployment.docker_image.clone(),
            service_name: req.service_name,
        })
        .await
        .map_err(|e| ApiError::Unscheduled {
            deployment_id: deployment.id.clone(),
            cause: Box::new(e.into()),
        })?;

    let status = state
        .storage
        .get_deployment(&deployment.id)?
        .map(|d| d.status)
        .unwrap_or(deployment.status);

    Ok(ApiResponse::created(CreateDeploymentResponse {
        message: "Deployment scheduled successfully".to_string(),
        deployment_id: outcome.deployment_id,
        cluster_id: outcome.cluster_id,
        status,
        drain: outcome.drain,
    })
    .into_response())
}

/// GET /api/v1/deployments/{id}
pub async fn get_deployment(
    State(state): State<Arc<AppState>>,
    Path(deployment_id): Path<String>,
) -> Result<Response> {
    validate_id("Deployment", &deployment_id)?;

    let deployment = state
        .storage
        .get_deployment(&deployment_id)?
        .ok_or_else(|| ApiError::NotFound(format!("Deployment not found: {}", deployment_id)))?;

    Ok(ApiResponse::ok(deployment).into_response())
}

/// POST /api/v1/deployments/{id}/stop
pub async fn stop_deployment(
    State(state): State<Arc<AppState>>,
    Path(deployment_id): Path<String>,
) -> Result<Response> {
    validate_id("Deployment", &deployment_id)?;
    info!("Stopping deployment {}", deployment_id);

    let outcome = state.engine.stop(&deployment_id).await?;

    Ok(ApiResponse::ok(StopDeploymentResponse {
        message: "Deployment stopped successfully".to_string(),
        deployment_id: outcome.deployment_id,
        cluster_status: outcome.cluster_status,
        drain: outcome.drain,
    })
    .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::schedule;
    use axum::http::StatusCode;
    use berth_core::Cluster;
    use berth_scheduler::{SchedulerConfig, SchedulingEngine};
    use berth_storage::{RedbBackend, StorageError};
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Record store whose paired commits fail while `down` is set
    struct UnreliableRecords {
        inner: Arc<RedbBackend>,
        down: AtomicBool,
    }

    impl RecordStore for UnreliableRecords {
        fn get_cluster(&self, id: &str) -> berth_storage::Result<Option<Cluster>> {
            self.inner.get_cluster(id)
        }

        fn put_cluster(&self, cluster: &Cluster) -> berth_storage::Result<()> {
            self.inner.put_cluster(cluster)
        }

        fn list_clusters(&self) -> berth_storage::Result<Vec<Cluster>> {
            self.inner.list_clusters()
        }

        fn get_deployment(&self, id: &str) -> berth_storage::Result<Option<Deployment>> {
            self.inner.get_deployment(id)
        }

        fn put_deployment(&self, deployment: &Deployment) -> berth_storage::Result<()> {
            self.inner.put_deployment(deployment)
        }

        fn list_deployments(&self) -> berth_storage::Result<Vec<Deployment>> {
            self.inner.list_deployments()
        }

        fn put_cluster_and_deployment(
            &self,
            cluster: &Cluster,
            deployment: &Deployment,
        ) -> berth_storage::Result<()> {
            if self.down.load(Ordering::SeqCst) {
                return Err(StorageError::transaction_error("store offline"));
            }
            self.inner.put_cluster_and_deployment(cluster, deployment)
        }
    }

    fn setup_state() -> (Arc<AppState>, Cluster) {
        let storage = Arc::new(RedbBackend::in_memory().unwrap());
        let cluster = Cluster::new("edge", Resources::new(4.0, 0.0, 8.0));
        storage.put_cluster(&cluster).unwrap();
        (Arc::new(AppState::new(storage)), cluster)
    }

    fn request(cluster: &Cluster, cpu: f64) -> CreateDeploymentRequest {
        CreateDeploymentRequest {
            name: "web".to_string(),
            docker_image: "nginx:1.27".to_string(),
            cpu_required: cpu,
            gpu_required: 0.0,
            ram_required: 1.0,
            priority: Priority::High,
            cluster_id: cluster.id.clone(),
            service_name: None,
        }
    }

    #[tokio::test]
    async fn test_create_deployment_is_admitted_when_it_fits() {
        let (state, cluster) = setup_state();

        let response = create_deployment(State(state.clone()), Json(request(&cluster, 3.0)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let deployments = state.storage.list_deployments().unwrap();
        assert_eq!(deployments.len(), 1);
        assert_eq!(deployments[0].status, DeploymentStatus::Running);
        assert_eq!(
            state.storage.get_cluster(&cluster.id).unwrap().unwrap().utilized.cpu,
            3.0
        );
    }

    #[tokio::test]
    async fn test_failed_submission_reports_saved_deployment() {
        let storage = Arc::new(RedbBackend::in_memory().unwrap());
        let cluster = Cluster::new("edge", Resources::new(4.0, 0.0, 8.0));
        storage.put_cluster(&cluster).unwrap();
        let records = Arc::new(UnreliableRecords {
            inner: storage.clone(),
            down: AtomicBool::new(true),
        });
        let engine = SchedulingEngine::new(records.clone(), storage.clone(), SchedulerConfig::default());
        let state = Arc::new(AppState {
            storage,
            engine: Arc::new(engine),
        });

        let result = create_deployment(State(state.clone()), Json(request(&cluster, 1.0))).await;

        let saved = state.storage.list_deployments().unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].status, DeploymentStatus::Queued);
        match result {
            Err(ApiError::Unscheduled { deployment_id, .. }) => assert_eq!(deployment_id, saved[0].id),
            other => panic!("expected Unscheduled, got {:?}", other.map(|r| r.status())),
        }

        // Resubmitting the saved record admits it without a second deployment
        records.down.store(false, Ordering::SeqCst);
        let retry = SubmitRequest {
            deployment_id: saved[0].id.clone(),
            cluster_id: cluster.id.clone(),
            priority: Priority::High,
            cpu: 1.0,
            gpu: 0.0,
            ram: 1.0,
            docker_image: "nginx:1.27".to_string(),
            service_name: None,
        };
        let response = schedule(State(state.clone()), Json(retry)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let saved = state.storage.list_deployments().unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].status, DeploymentStatus::Running);
        assert_eq!(
            state.storage.get_cluster(&cluster.id).unwrap().unwrap().utilized.cpu,
            1.0
        );
    }

    #[tokio::test]
    async fn test_create_deployment_larger_than_cluster_is_refused() {
        let (state, cluster) = setup_state();

        let result = create_deployment(State(state.clone()), Json(request(&cluster, 5.0))).await;

        assert!(matches!(result, Err(ApiError::ValidationFailed(_))));
        assert!(state.storage.list_deployments().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_deployment_for_unknown_cluster() {
        let (state, cluster) = setup_state();
        let mut req = request(&cluster, 1.0);
        req.cluster_id = "missing".to_string();

        let result = create_deployment(State(state), Json(req)).await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_stop_queued_deployment_conflicts() {
        let (state, _cluster) = setup_state();
        let deployment = Deployment::new("web", "nginx:1.27", Resources::new(1.0, 0.0, 1.0), Priority::Low);
        state.storage.put_deployment(&deployment).unwrap();

        let result = stop_deployment(State(state), Path(deployment.id.clone())).await;
        assert!(matches!(result, Err(ApiError::Conflict(_))));
    }
}
