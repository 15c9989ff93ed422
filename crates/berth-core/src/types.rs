use crate::{BerthError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// CPU, GPU and RAM amounts, used both for capacity and for requirements
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Resources {
    /// CPU cores
    pub cpu: f64,
    /// GPU devices
    pub gpu: f64,
    /// RAM in GB
    pub ram: f64,
}

impl Resources {
    /// Create a new set of resource amounts
    pub fn new(cpu: f64, gpu: f64, ram: f64) -> Self {
        Self { cpu, gpu, ram }
    }

    /// All dimensions zero
    pub fn zero() -> Self {
        Self::default()
    }

    /// Iterate over `(dimension name, amount)` pairs
    pub fn dimensions(&self) -> [(&'static str, f64); 3] {
        [("cpu", self.cpu), ("gpu", self.gpu), ("ram", self.ram)]
    }

    /// Reject negative, NaN or infinite amounts
    pub fn validate(&self, record_type: &str) -> Result<()> {
        for (name, amount) in self.dimensions() {
            if !amount.is_finite() || amount < 0.0 {
                return Err(BerthError::validation_failed(
                    record_type,
                    format!("{} must be a finite value >= 0, got {}", name, amount),
                    "Resource amounts must be zero or greater",
                ));
            }
        }
        Ok(())
    }
}

/// Priority tier of a deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = BerthError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "high" => Ok(Priority::High),
            "low" => Ok(Priority::Low),
            other => Err(BerthError::invalid_priority(other)),
        }
    }
}

/// Lifecycle status of a deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentStatus {
    #[default]
    Queued,
    Running,
    Stopped,
}

impl fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeploymentStatus::Queued => "queued",
            DeploymentStatus::Running => "running",
            DeploymentStatus::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// A capacity-bounded cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub id: String,
    pub name: String,
    /// Total capacity
    pub total: Resources,
    /// Capacity currently committed to running deployments
    #[serde(default)]
    pub utilized: Resources,
    pub created_at: DateTime<Utc>,
}

impl Cluster {
    /// Create an idle cluster with a generated id
    pub fn new(name: impl Into<String>, total: Resources) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            total,
            utilized: Resources::zero(),
            created_at: Utc::now(),
        }
    }

    /// Capacity not yet committed, per dimension
    pub fn remaining(&self) -> Resources {
        Resources::new(
            self.total.cpu - self.utilized.cpu,
            self.total.gpu - self.utilized.gpu,
            self.total.ram - self.utilized.ram,
        )
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(BerthError::validation_failed(
                "Cluster",
                "name is empty",
                "Give the cluster a non-empty name",
            ));
        }
        self.total.validate("Cluster")
    }
}

/// A workload to be placed on a cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deployment {
    pub id: String,
    pub name: String,
    pub docker_image: String,
    /// Resources the deployment needs while running
    pub required: Resources,
    pub priority: Priority,
    #[serde(default)]
    pub status: DeploymentStatus,
    /// Cluster the deployment is placed on, once admitted
    #[serde(default)]
    pub cluster_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Deployment {
    /// Create a queued deployment with a generated id
    pub fn new(
        name: impl Into<String>,
        docker_image: impl Into<String>,
        required: Resources,
        priority: Priority,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            docker_image: docker_image.into(),
            required,
            priority,
            status: DeploymentStatus::Queued,
            cluster_id: None,
            created_at: Utc::now(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.docker_image.trim().is_empty() {
            return Err(BerthError::validation_failed(
                "Deployment",
                "docker_image is empty",
                "Specify the image to run, e.g. 'nginx:1.27'",
            ));
        }
        self.required.validate("Deployment")
    }
}

/// Snapshot of a submission, as held in a tier queue
///
/// Entries are never rewritten once enqueued. The drain loop reads the live
/// cluster and deployment records separately when it decides on admission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub deployment_id: String,
    pub cluster_id: String,
    pub priority: Priority,
    pub cpu: f64,
    pub gpu: f64,
    pub ram: f64,
    pub docker_image: String,
    #[serde(default)]
    pub service_name: Option<String>,
    pub enqueued_at: DateTime<Utc>,
}

impl QueueEntry {
    /// Snapshot a deployment record for submission to a cluster
    pub fn from_deployment(
        deployment: &Deployment,
        cluster_id: impl Into<String>,
        service_name: Option<String>,
    ) -> Self {
        Self {
            deployment_id: deployment.id.clone(),
            cluster_id: cluster_id.into(),
            priority: deployment.priority,
            cpu: deployment.required.cpu,
            gpu: deployment.required.gpu,
            ram: deployment.required.ram,
            docker_image: deployment.docker_image.clone(),
            service_name,
            enqueued_at: Utc::now(),
        }
    }

    /// Requirement recorded at submission time
    pub fn requirement(&self) -> Resources {
        Resources::new(self.cpu, self.gpu, self.ram)
    }
}

/// Queue lengths of a cluster's two tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QueueLengths {
    pub high_priority: u64,
    pub low_priority: u64,
}

impl QueueLengths {
    pub fn get(&self, priority: Priority) -> u64 {
        match priority {
            Priority::High => self.high_priority,
            Priority::Low => self.low_priority,
        }
    }

    pub fn total(&self) -> u64 {
        self.high_priority + self.low_priority
    }
}

/// Utilization snapshot returned after a release
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterUtilization {
    pub name: String,
    pub utilized_cpu: f64,
    pub utilized_gpu: f64,
    pub utilized_ram: f64,
}

impl From<&Cluster> for ClusterUtilization {
    fn from(cluster: &Cluster) -> Self {
        Self {
            name: cluster.name.clone(),
            utilized_cpu: cluster.utilized.cpu,
            utilized_gpu: cluster.utilized.gpu,
            utilized_ram: cluster.utilized.ram,
        }
    }
}
