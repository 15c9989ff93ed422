use berth_core::{ClusterUtilization, Priority, QueueEntry, QueueLengths};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result of an admission check
#[derive(Debug, Clone, PartialEq)]
pub struct AdmissionResult {
    /// Whether every dimension fits
    pub admitted: bool,
    /// First dimension that did not fit (if any)
    pub reason: Option<String>,
}

impl AdmissionResult {
    /// Create an admitting result
    pub fn admit() -> Self {
        Self {
            admitted: true,
            reason: None,
        }
    }

    /// Create a denying result
    pub fn deny(reason: String) -> Self {
        Self {
            admitted: false,
            reason: Some(reason),
        }
    }
}

/// Why an entry left its queue without being admitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscardReason {
    /// The deployment record no longer exists
    DeploymentMissing,
    /// The cluster record no longer exists
    ClusterMissing,
    /// The deployment is no longer queued
    NotQueued,
    /// The stored entry could not be decoded
    Undecodable,
}

impl fmt::Display for DiscardReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DiscardReason::DeploymentMissing => "deployment missing",
            DiscardReason::ClusterMissing => "cluster missing",
            DiscardReason::NotQueued => "deployment not queued",
            DiscardReason::Undecodable => "undecodable entry",
        };
        f.write_str(s)
    }
}

/// What happened to one popped entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Disposition {
    /// Committed against the ledger, deployment now running
    Admitted,
    /// Did not fit; re-appended to the tail of its tier
    Rotated,
    /// Removed without admission
    Discarded { reason: DiscardReason },
}

/// Outcome of draining one tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierReport {
    pub priority: Priority,
    /// Deployment ids admitted, in admission order
    pub admitted: Vec<String>,
    /// Deployment ids rotated back to the tail
    pub rotated: Vec<String>,
    /// Deployment ids dropped as stale
    pub discarded: Vec<String>,
    /// Number of admission checks performed
    pub attempts: usize,
    /// The pass stopped because it reached an entry it had already tried
    pub cycle_detected: bool,
}

impl TierReport {
    pub fn new(priority: Priority) -> Self {
        Self {
            priority,
            admitted: Vec::new(),
            rotated: Vec::new(),
            discarded: Vec::new(),
            attempts: 0,
            cycle_detected: false,
        }
    }

    /// Record the disposition of one entry
    pub fn record(&mut self, deployment_id: &str, disposition: &Disposition) {
        let id = deployment_id.to_string();
        match disposition {
            Disposition::Admitted => {
                self.attempts += 1;
                self.admitted.push(id);
            }
            Disposition::Rotated => {
                self.attempts += 1;
                self.rotated.push(id);
            }
            Disposition::Discarded { .. } => self.discarded.push(id),
        }
    }
}

/// Outcome of one drain pass over a cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrainReport {
    pub cluster_id: String,
    /// Queue lengths when the pass began
    pub initial: QueueLengths,
    pub high: TierReport,
    /// `None` when the low tier was skipped this pass
    pub low: Option<TierReport>,
}

impl DrainReport {
    /// Deployment ids admitted across both tiers
    pub fn admitted(&self) -> impl Iterator<Item = &String> {
        self.high
            .admitted
            .iter()
            .chain(self.low.iter().flat_map(|low| low.admitted.iter()))
    }
}

/// A request to queue a deployment on a cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub deployment_id: String,
    pub cluster_id: String,
    pub priority: Priority,
    pub cpu: f64,
    pub gpu: f64,
    pub ram: f64,
    pub docker_image: String,
    #[serde(default)]
    pub service_name: Option<String>,
}

impl SubmitRequest {
    /// Freeze the request into the entry stored in the tier queue
    pub fn into_entry(self) -> QueueEntry {
        QueueEntry {
            deployment_id: self.deployment_id,
            cluster_id: self.cluster_id,
            priority: self.priority,
            cpu: self.cpu,
            gpu: self.gpu,
            ram: self.ram,
            docker_image: self.docker_image,
            service_name: self.service_name,
            enqueued_at: Utc::now(),
        }
    }
}

/// Acceptance of a submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitOutcome {
    pub deployment_id: String,
    pub cluster_id: String,
    /// The drain pass triggered by the submission
    pub drain: DrainReport,
}

/// Result of stopping a running deployment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopOutcome {
    pub deployment_id: String,
    pub cluster_id: String,
    /// Cluster utilization right after the release
    pub cluster_status: ClusterUtilization,
    /// The drain pass triggered by the release, if it completed
    pub drain: Option<DrainReport>,
}
