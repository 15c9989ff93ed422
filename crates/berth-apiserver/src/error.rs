use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use berth_core::BerthError;
use berth_scheduler::SchedulerError;
use berth_storage::StorageError;
use serde_json::json;
use tracing::error;

/// API error type
#[derive(Debug)]
pub enum ApiError {
    /// Record not found (404)
    NotFound(String),

    /// Request conflicts with the record's current state (409)
    Conflict(String),

    /// Invalid input (400)
    BadRequest(String),

    /// Validation failed (422)
    ValidationFailed(String),

    /// Record or queue store unavailable (503)
    ServiceUnavailable(String),

    /// Internal server error (500)
    Internal(String),

    /// A deployment record was saved but could not be submitted. The status
    /// comes from `cause`; the body also carries `deployment_id` so the client
    /// resubmits that record instead of creating another one.
    Unscheduled {
        deployment_id: String,
        cause: Box<ApiError>,
    },
}

/// Result type for API operations
pub type Result<T> = std::result::Result<T, ApiError>;

impl ApiError {
    fn status_and_message(self) -> (StatusCode, String) {
        match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::ValidationFailed(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            ApiError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            ApiError::Unscheduled {
                deployment_id,
                cause,
            } => {
                let (status, msg) = cause.status_and_message();
                (
                    status,
                    format!(
                        "Deployment {} was saved as queued but not scheduled: {}. \
                         Resubmit it with POST /api/v1/schedule",
                        deployment_id, msg
                    ),
                )
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let deployment_id = match &self {
            ApiError::Unscheduled { deployment_id, .. } => Some(deployment_id.clone()),
            _ => None,
        };
        let (status, message) = self.status_and_message();

        let mut body = json!({
            "status": "Failure",
            "error": message,
            "code": status.as_u16()
        });
        if let Some(id) = deployment_id {
            body["deployment_id"] = json!(id);
        }

        (status, Json(body)).into_response()
    }
}

impl From<BerthError> for ApiError {
    fn from(err: BerthError) -> Self {
        match err {
            BerthError::ValidationFailed { .. } => ApiError::ValidationFailed(err.to_string()),
            BerthError::InvalidPriority { .. } => ApiError::BadRequest(err.to_string()),
            _ => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        error!("Store failure: {}", err);
        ApiError::ServiceUnavailable(err.to_string())
    }
}

impl From<SchedulerError> for ApiError {
    fn from(err: SchedulerError) -> Self {
        match err {
            SchedulerError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            SchedulerError::InvalidState { .. } | SchedulerError::Inconsistent { .. } => {
                ApiError::Conflict(err.to_string())
            }
            SchedulerError::CapacityExceeded { .. } => ApiError::ValidationFailed(err.to_string()),
            SchedulerError::UpstreamUnavailable(e) => e.into(),
            SchedulerError::CoreError(e) => e.into(),
            SchedulerError::InternalError { .. } => {
                error!("Scheduler internal error: {}", err);
                ApiError::Internal(err.to_string())
            }
        }
    }
}
