use crate::Result;
use berth_core::{Priority, QueueEntry, QueueLengths};
use berth_storage::{KeyEncoder, QueueBackend};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Ways an entry is appended to a tier queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueOp {
    /// First append, on submission
    Enqueue,
    /// Re-append of an entry just popped by a drain pass that did not fit
    Rotate,
}

impl fmt::Display for QueueOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueOp::Enqueue => f.write_str("enqueue"),
            QueueOp::Rotate => f.write_str("rotate"),
        }
    }
}

/// Per-cluster, per-tier FIFO queues of pending deployments
///
/// Entries are JSON snapshots held in a [`QueueBackend`] under
/// `cluster/{cluster_id}/{priority}`.
#[derive(Clone)]
pub struct PriorityQueueStore {
    backend: Arc<dyn QueueBackend>,
}

impl PriorityQueueStore {
    pub fn new(backend: Arc<dyn QueueBackend>) -> Self {
        Self { backend }
    }

    /// Append a freshly submitted entry to the tail of its tier
    pub fn enqueue(&self, entry: &QueueEntry) -> Result<u64> {
        self.append(entry, QueueOp::Enqueue)
    }

    /// Put an entry that did not fit back at the tail of its tier
    pub fn rotate(&self, entry: &QueueEntry) -> Result<u64> {
        self.append(entry, QueueOp::Rotate)
    }

    /// Append an entry to the tail of its tier queue, returning the new length
    pub fn append(&self, entry: &QueueEntry, op: QueueOp) -> Result<u64> {
        let queue = KeyEncoder::queue_name(&entry.cluster_id, entry.priority);
        let data = berth_core::to_json_vec(entry)?;
        let length = self.backend.push_back(&queue, &data)?;

        debug!(
            %op,
            queue = %queue,
            deployment = %entry.deployment_id,
            length,
            "queue append"
        );
        Ok(length)
    }

    /// Oldest entry of a tier, left in place
    pub fn peek_front(&self, cluster_id: &str, priority: Priority) -> Result<Option<QueueEntry>> {
        let queue = KeyEncoder::queue_name(cluster_id, priority);
        match self.backend.peek_front(&queue)? {
            Some(data) => Ok(Some(berth_core::from_json_slice(&data)?)),
            None => Ok(None),
        }
    }

    /// Remove and return the oldest entry of a tier
    pub fn pop_front(&self, cluster_id: &str, priority: Priority) -> Result<Option<QueueEntry>> {
        let queue = KeyEncoder::queue_name(cluster_id, priority);
        match self.backend.pop_front(&queue)? {
            Some(data) => Ok(Some(berth_core::from_json_slice(&data)?)),
            None => Ok(None),
        }
    }

    /// Drop the oldest item of a tier without decoding it
    ///
    /// Used to get rid of an entry that cannot be decoded and would otherwise
    /// block the head of the queue forever.
    pub fn discard_front(&self, cluster_id: &str, priority: Priority) -> Result<bool> {
        let queue = KeyEncoder::queue_name(cluster_id, priority);
        let removed = self.backend.pop_front(&queue)?.is_some();
        if removed {
            warn!(queue = %queue, "discarded undecodable queue entry");
        }
        Ok(removed)
    }

    pub fn length(&self, cluster_id: &str, priority: Priority) -> Result<u64> {
        let queue = KeyEncoder::queue_name(cluster_id, priority);
        Ok(self.backend.length(&queue)?)
    }

    /// Lengths of both tiers of a cluster
    pub fn lengths(&self, cluster_id: &str) -> Result<QueueLengths> {
        Ok(QueueLengths {
            high_priority: self.length(cluster_id, Priority::High)?,
            low_priority: self.length(cluster_id, Priority::Low)?,
        })
    }
}
