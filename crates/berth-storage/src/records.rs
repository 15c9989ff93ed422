use crate::Result;
use berth_core::{Cluster, Deployment};

/// Read/update contract for cluster and deployment records
///
/// A missing record is `Ok(None)`, never an error.
pub trait RecordStore: Send + Sync {
    fn get_cluster(&self, id: &str) -> Result<Option<Cluster>>;

    fn put_cluster(&self, cluster: &Cluster) -> Result<()>;

    fn list_clusters(&self) -> Result<Vec<Cluster>>;

    fn get_deployment(&self, id: &str) -> Result<Option<Deployment>>;

    fn put_deployment(&self, deployment: &Deployment) -> Result<()>;

    fn list_deployments(&self) -> Result<Vec<Deployment>>;

    /// Persist a cluster and a deployment in a single transaction
    ///
    /// Either both records are written or neither is.
    fn put_cluster_and_deployment(&self, cluster: &Cluster, deployment: &Deployment)
        -> Result<()>;
}
