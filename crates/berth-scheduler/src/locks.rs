use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Per-cluster exclusion for drain passes, debits and credits
///
/// Passes over different clusters proceed in parallel; two passes over the
/// same cluster never overlap.
#[derive(Default)]
pub struct ClusterLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ClusterLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `cluster_id`
    pub async fn lock(&self, cluster_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.entry(cluster_id.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_cluster_is_exclusive() {
        let locks = ClusterLocks::new();
        let _guard = locks.lock("a").await;

        let second = tokio::time::timeout(Duration::from_millis(50), locks.lock("a")).await;
        assert!(second.is_err());
    }

    #[tokio::test]
    async fn test_different_clusters_do_not_block() {
        let locks = ClusterLocks::new();
        let _a = locks.lock("a").await;

        let b = tokio::time::timeout(Duration::from_millis(50), locks.lock("b")).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn test_released_lock_can_be_retaken() {
        let locks = ClusterLocks::new();
        drop(locks.lock("a").await);

        let again = tokio::time::timeout(Duration::from_millis(50), locks.lock("a")).await;
        assert!(again.is_ok());
    }
}
