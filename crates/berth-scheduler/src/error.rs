// Allow unused assignments for diagnostic fields - they're used by the macros
#![allow(unused_assignments)]

use berth_core::DeploymentStatus;
use miette::Diagnostic;
use thiserror::Error;

/// Scheduler error type
#[derive(Error, Debug, Diagnostic)]
pub enum SchedulerError {
    /// Referenced cluster or deployment does not exist
    #[error("{kind} not found: {id}")]
    #[diagnostic(
        code(scheduler::not_found),
        help("Verify the {kind} id is correct and the record has not been deleted")
    )]
    NotFound {
        kind: String,
        id: String,
    },

    /// Operation not valid for the deployment's current status
    #[error("Deployment {deployment_id} is {status}, expected {expected}")]
    #[diagnostic(
        code(scheduler::invalid_state),
        help("Only running deployments can be stopped")
    )]
    InvalidState {
        deployment_id: String,
        status: DeploymentStatus,
        expected: DeploymentStatus,
    },

    /// Records disagree with each other
    #[error("Inconsistent state for deployment {deployment_id}: {message}")]
    #[diagnostic(
        code(scheduler::inconsistent),
        help("The deployment record is missing data the scheduler relies on; repair it before retrying")
    )]
    Inconsistent {
        deployment_id: String,
        message: String,
    },

    /// Request can never fit the target cluster
    #[error("Deployment cannot fit cluster {cluster_id}: {reason}")]
    #[diagnostic(
        code(scheduler::capacity_exceeded),
        help("Reduce the resource requirements or target a larger cluster")
    )]
    CapacityExceeded {
        cluster_id: String,
        reason: String,
    },

    /// Record or queue store failed
    #[error("Upstream store unavailable: {0}")]
    #[diagnostic(
        code(scheduler::upstream_unavailable),
        help("The pass was aborted without partial commits; retry the request")
    )]
    UpstreamUnavailable(#[from] berth_storage::StorageError),

    /// Core error
    #[error("Core error: {0}")]
    #[diagnostic(
        code(scheduler::core_error),
        help("This is an internal error")
    )]
    CoreError(#[from] berth_core::BerthError),

    /// Internal error
    #[error("Internal error: {message}")]
    #[diagnostic(
        code(scheduler::internal_error),
        help("This is likely a bug. Please report it")
    )]
    InternalError {
        message: String,
    },
}

/// Result type for scheduler operations
pub type Result<T> = std::result::Result<T, SchedulerError>;

impl SchedulerError {
    /// Create a NotFound error for a cluster
    pub fn cluster_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: "Cluster".to_string(),
            id: id.into(),
        }
    }

    /// Create a NotFound error for a deployment
    pub fn deployment_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: "Deployment".to_string(),
            id: id.into(),
        }
    }

    /// Create an InvalidState error
    pub fn invalid_state(
        deployment_id: impl Into<String>,
        status: DeploymentStatus,
        expected: DeploymentStatus,
    ) -> Self {
        Self::InvalidState {
            deployment_id: deployment_id.into(),
            status,
            expected,
        }
    }

    /// Create an Inconsistent error
    pub fn inconsistent(deployment_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Inconsistent {
            deployment_id: deployment_id.into(),
            message: message.into(),
        }
    }

    /// Create a CapacityExceeded error
    pub fn capacity_exceeded(cluster_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CapacityExceeded {
            cluster_id: cluster_id.into(),
            reason: reason.into(),
        }
    }

    /// Create an InternalError
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }
}
