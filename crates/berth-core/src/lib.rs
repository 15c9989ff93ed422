//! Berth Core - Fundamental types for the Berth deployment scheduler
//!
//! This crate provides:
//! - Cluster and deployment records
//! - Queue entry snapshots and queue status types
//! - Error types with miette diagnostics
//! - Serialization helpers

pub mod error;
pub mod types;

// Re-export commonly used types
pub use error::{BerthError, Result};
pub use types::{
    Cluster, ClusterUtilization, Deployment, DeploymentStatus, Priority, QueueEntry,
    QueueLengths, Resources,
};

/// Serialize a record to JSON bytes
pub fn to_json_vec<T: serde::Serialize>(record: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(record).map_err(|e| {
        BerthError::serialization_error(
            format!("Failed to serialize to JSON: {}", e),
            Some(Box::new(e)),
        )
    })
}

/// Deserialize a record from JSON bytes
pub fn from_json_slice<T: for<'de> serde::Deserialize<'de>>(data: &[u8]) -> Result<T> {
    serde_json::from_slice(data).map_err(|e| {
        BerthError::serialization_error(
            format!("Failed to deserialize from JSON: {}", e),
            Some(Box::new(e)),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_serialization() {
        let cluster = Cluster::new("gpu-pool", Resources::new(16.0, 2.0, 64.0));

        let json = to_json_vec(&cluster).unwrap();
        assert!(String::from_utf8_lossy(&json).contains("gpu-pool"));

        let deserialized: Cluster = from_json_slice(&json).unwrap();
        assert_eq!(deserialized.id, cluster.id);
        assert_eq!(deserialized.total, cluster.total);
    }

    #[test]
    fn test_from_json_slice_rejects_garbage() {
        let result: Result<Deployment> = from_json_slice(b"{not json");
        assert!(matches!(result, Err(BerthError::SerializationError { .. })));
    }
}
