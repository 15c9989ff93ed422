//! Berth Scheduler - Admission-controlled deployment dispatch
//!
//! This crate provides:
//! - Per-cluster, two-tier priority queues of pending deployments
//! - Admission checks against a cluster's remaining capacity
//! - Resource ledger debits and release credits
//! - The drain pass that admits, rotates or discards queued work

pub mod admission;
pub mod error;
pub mod ledger;
pub mod locks;
pub mod queue;
pub mod scheduler;
pub mod types;

// Re-export commonly used types
pub use error::{Result, SchedulerError};
pub use queue::PriorityQueueStore;
pub use scheduler::{SchedulerConfig, SchedulingEngine};
pub use types::{
    AdmissionResult, DiscardReason, Disposition, DrainReport, StopOutcome, SubmitOutcome,
    SubmitRequest, TierReport,
};
