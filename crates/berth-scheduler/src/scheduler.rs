use crate::admission;
use crate::ledger;
use crate::locks::ClusterLocks;
use crate::queue::PriorityQueueStore;
use crate::types::{
    DiscardReason, Disposition, DrainReport, StopOutcome, SubmitOutcome, SubmitRequest,
    TierReport,
};
use crate::{Result, SchedulerError};
use berth_core::{
    Cluster, ClusterUtilization, Deployment, DeploymentStatus, Priority, QueueEntry, QueueLengths,
};
use berth_storage::{QueueBackend, RecordStore};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Configuration for the scheduling engine
#[derive(Debug, Clone, Default)]
pub struct SchedulerConfig {
    /// Also drain the low tier when the high tier was non-empty at the start
    /// of a pass but is empty once the high tier has been drained.
    ///
    /// Off by default: any high-priority backlog at pass start keeps the low
    /// tier untouched for the whole pass.
    pub low_tier_after_high_drains: bool,
}

/// What a drain pass decided for one popped entry, before acting on it
enum Decision {
    Admit {
        cluster: Cluster,
        deployment: Deployment,
    },
    Rotate {
        reason: String,
    },
    Discard(DiscardReason),
}

/// Per-cluster, two-tier admission engine
///
/// Every `submit` and `stop` runs a drain pass over the affected cluster
/// before returning. Passes over one cluster are serialized by
/// [`ClusterLocks`]; passes over different clusters run concurrently.
pub struct SchedulingEngine {
    records: Arc<dyn RecordStore>,
    queues: PriorityQueueStore,
    locks: ClusterLocks,
    config: SchedulerConfig,
}

impl SchedulingEngine {
    /// Create a new engine
    pub fn new(
        records: Arc<dyn RecordStore>,
        queues: Arc<dyn QueueBackend>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            records,
            queues: PriorityQueueStore::new(queues),
            locks: ClusterLocks::new(),
            config,
        }
    }

    /// Record store the engine reads and commits through
    pub fn records(&self) -> &Arc<dyn RecordStore> {
        &self.records
    }

    /// Queue a deployment on a cluster and run a drain pass for that cluster
    ///
    /// Success means the entry was accepted into its tier queue. Whether it
    /// was admitted during the triggered pass is visible in the returned
    /// drain report.
    pub async fn submit(&self, request: SubmitRequest) -> Result<SubmitOutcome> {
        if self.records.get_cluster(&request.cluster_id)?.is_none() {
            return Err(SchedulerError::cluster_not_found(&request.cluster_id));
        }

        let entry = request.into_entry();
        let cluster_id = entry.cluster_id.clone();
        let deployment_id = entry.deployment_id.clone();

        let _guard = self.locks.lock(&cluster_id).await;

        let length = self.queues.enqueue(&entry)?;
        info!(
            "Queued deployment {} on cluster {} ({} tier, {} waiting)",
            deployment_id, cluster_id, entry.priority, length
        );

        let drain = self.drain_locked(&cluster_id)?;

        Ok(SubmitOutcome {
            deployment_id,
            cluster_id,
            drain,
        })
    }

    /// Stop a running deployment, release its resources and drain its cluster
    pub async fn stop(&self, deployment_id: &str) -> Result<StopOutcome> {
        let deployment = self.running_deployment(deployment_id)?;
        let cluster_id = deployment
            .cluster_id
            .clone()
            .ok_or_else(|| SchedulerError::inconsistent(deployment_id, "running without a cluster"))?;

        let _guard = self.locks.lock(&cluster_id).await;

        // Re-read under the lock, a concurrent stop may have won the race
        let mut deployment = self.running_deployment(deployment_id)?;
        if deployment.cluster_id.as_deref() != Some(cluster_id.as_str()) {
            return Err(SchedulerError::inconsistent(
                deployment_id,
                "cluster link changed while stopping",
            ));
        }

        let mut cluster = self
            .records
            .get_cluster(&cluster_id)?
            .ok_or_else(|| SchedulerError::cluster_not_found(&cluster_id))?;

        ledger::credit(&mut cluster, &deployment.required);
        deployment.status = DeploymentStatus::Stopped;
        self.records.put_cluster_and_deployment(&cluster, &deployment)?;

        info!(
            "Stopped deployment {} on cluster {}, released cpu={} gpu={} ram={}",
            deployment_id,
            cluster_id,
            deployment.required.cpu,
            deployment.required.gpu,
            deployment.required.ram
        );

        // The release is durable at this point; a failed pass is retried by
        // the next submit or stop on this cluster.
        let drain = match self.drain_locked(&cluster_id) {
            Ok(report) => Some(report),
            Err(e) => {
                error!("Drain after stopping {} failed: {}", deployment_id, e);
                None
            }
        };

        Ok(StopOutcome {
            deployment_id: deployment_id.to_string(),
            cluster_id,
            cluster_status: ClusterUtilization::from(&cluster),
            drain,
        })
    }

    /// Run a drain pass over a cluster's queues
    pub async fn drain(&self, cluster_id: &str) -> Result<DrainReport> {
        let _guard = self.locks.lock(cluster_id).await;
        self.drain_locked(cluster_id)
    }

    /// Queue lengths of a cluster's two tiers
    pub async fn queue_status(&self, cluster_id: &str) -> Result<QueueLengths> {
        self.queues.lengths(cluster_id)
    }

    fn running_deployment(&self, deployment_id: &str) -> Result<Deployment> {
        let deployment = self
            .records
            .get_deployment(deployment_id)?
            .ok_or_else(|| SchedulerError::deployment_not_found(deployment_id))?;

        if deployment.status != DeploymentStatus::Running {
            return Err(SchedulerError::invalid_state(
                deployment_id,
                deployment.status,
                DeploymentStatus::Running,
            ));
        }

        Ok(deployment)
    }

    /// Drain pass body. The caller holds the cluster's lock.
    fn drain_locked(&self, cluster_id: &str) -> Result<DrainReport> {
        let initial = self.queues.lengths(cluster_id)?;

        if initial.total() == 0 {
            debug!("No queued deployments for cluster {}", cluster_id);
        } else {
            info!(
                "Draining cluster {} (high={}, low={})",
                cluster_id, initial.high_priority, initial.low_priority
            );
        }

        let high = self.drain_tier(cluster_id, Priority::High)?;

        let run_low = initial.high_priority == 0
            || (self.config.low_tier_after_high_drains
                && self.queues.length(cluster_id, Priority::High)? == 0);

        let low = if run_low {
            Some(self.drain_tier(cluster_id, Priority::Low)?)
        } else {
            debug!(
                "Skipping low tier of cluster {}: {} high-priority entries were pending",
                cluster_id, initial.high_priority
            );
            None
        };

        let report = DrainReport {
            cluster_id: cluster_id.to_string(),
            initial,
            high,
            low,
        };

        let admitted = report.admitted().count();
        if admitted > 0 {
            info!("Admitted {} deployments on cluster {}", admitted, cluster_id);
        }

        Ok(report)
    }

    /// Serve one tier until it is empty or every remaining entry has been
    /// tried once in this invocation
    fn drain_tier(&self, cluster_id: &str, tier: Priority) -> Result<TierReport> {
        let mut report = TierReport::new(tier);
        let mut seen: HashSet<String> = HashSet::new();

        loop {
            let front = match self.queues.peek_front(cluster_id, tier) {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(SchedulerError::CoreError(e)) => {
                    error!(
                        "Discarding {} entry on cluster {} ({}): {}",
                        tier,
                        cluster_id,
                        DiscardReason::Undecodable,
                        e
                    );
                    self.queues.discard_front(cluster_id, tier)?;
                    continue;
                }
                Err(e) => return Err(e),
            };

            if seen.contains(&front.deployment_id) {
                debug!(
                    "Every remaining {} entry on cluster {} has been tried, stopping",
                    tier, cluster_id
                );
                report.cycle_detected = true;
                break;
            }

            let entry = self.queues.pop_front(cluster_id, tier)?.ok_or_else(|| {
                SchedulerError::internal_error(format!(
                    "{} queue of cluster {} emptied between peek and pop",
                    tier, cluster_id
                ))
            })?;
            seen.insert(entry.deployment_id.clone());

            let disposition = self.settle(&entry)?;
            report.record(&entry.deployment_id, &disposition);
        }

        Ok(report)
    }

    /// Account for a popped entry exactly once: commit it, discard it, or put
    /// it back. On failure the entry is returned to its queue before the
    /// error is surfaced.
    fn settle(&self, entry: &QueueEntry) -> Result<Disposition> {
        let decision = match self.decide(entry) {
            Ok(decision) => decision,
            Err(e) => return Err(self.requeue_after_failure(entry, e)),
        };

        match decision {
            Decision::Discard(reason) => {
                warn!(
                    "Discarding queue entry for deployment {} on cluster {}: {}",
                    entry.deployment_id, entry.cluster_id, reason
                );
                Ok(Disposition::Discarded { reason })
            }
            Decision::Rotate { reason } => {
                debug!(
                    "Deployment {} does not fit cluster {} yet: {}",
                    entry.deployment_id, entry.cluster_id, reason
                );
                self.queues.rotate(entry).map_err(|e| {
                    error!(
                        "Lost queue entry for deployment {}: rotation failed: {}",
                        entry.deployment_id, e
                    );
                    e
                })?;
                Ok(Disposition::Rotated)
            }
            Decision::Admit {
                mut cluster,
                mut deployment,
            } => {
                ledger::debit(&mut cluster, &deployment.required);
                deployment.status = DeploymentStatus::Running;
                deployment.cluster_id = Some(cluster.id.clone());

                if let Err(e) = self.records.put_cluster_and_deployment(&cluster, &deployment) {
                    return Err(self.requeue_after_failure(entry, e.into()));
                }

                info!(
                    "Admitted deployment {} on cluster {} (utilized cpu={} gpu={} ram={})",
                    deployment.id,
                    cluster.id,
                    cluster.utilized.cpu,
                    cluster.utilized.gpu,
                    cluster.utilized.ram
                );
                Ok(Disposition::Admitted)
            }
        }
    }

    /// Read the live records for an entry and decide its fate
    fn decide(&self, entry: &QueueEntry) -> Result<Decision> {
        let Some(deployment) = self.records.get_deployment(&entry.deployment_id)? else {
            return Ok(Decision::Discard(DiscardReason::DeploymentMissing));
        };
        let Some(cluster) = self.records.get_cluster(&entry.cluster_id)? else {
            return Ok(Decision::Discard(DiscardReason::ClusterMissing));
        };

        if deployment.status != DeploymentStatus::Queued {
            return Ok(Decision::Discard(DiscardReason::NotQueued));
        }

        let admission = admission::check(&cluster, &deployment);
        if admission.admitted {
            Ok(Decision::Admit {
                cluster,
                deployment,
            })
        } else {
            Ok(Decision::Rotate {
                reason: admission.reason.unwrap_or_default(),
            })
        }
    }

    fn requeue_after_failure(&self, entry: &QueueEntry, err: SchedulerError) -> SchedulerError {
        match self.queues.rotate(entry) {
            Ok(_) => warn!(
                "Returned deployment {} to the {} queue of cluster {} after error: {}",
                entry.deployment_id, entry.priority, entry.cluster_id, err
            ),
            Err(requeue_err) => error!(
                "Lost queue entry for deployment {} after error: {} (requeue failed: {})",
                entry.deployment_id, err, requeue_err
            ),
        }
        err
    }
}
