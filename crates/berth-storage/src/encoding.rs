use berth_core::Priority;

/// Key encoder for storage keys
pub struct KeyEncoder;

impl KeyEncoder {
    /// Record kinds stored in the resources table
    pub const CLUSTER: &'static str = "Cluster";
    pub const DEPLOYMENT: &'static str = "Deployment";

    /// Encode a record key: v1/{kind}/{id}
    pub fn encode_record_key(kind: &str, id: &str) -> String {
        format!("v1/{}/{}", kind, id)
    }

    /// Encode a cluster record key
    pub fn cluster_key(id: &str) -> String {
        Self::encode_record_key(Self::CLUSTER, id)
    }

    /// Encode a deployment record key
    pub fn deployment_key(id: &str) -> String {
        Self::encode_record_key(Self::DEPLOYMENT, id)
    }

    /// Encode a prefix for scanning all records of a kind
    pub fn encode_prefix(kind: &str) -> String {
        format!("v1/{}/", kind)
    }

    /// Name of the tier queue for a cluster: cluster/{cluster_id}/{priority}
    pub fn queue_name(cluster_id: &str, priority: Priority) -> String {
        format!("cluster/{}/{}", cluster_id, priority.as_str())
    }

    /// Key of a queue slot. Sequence numbers are zero-padded so keys sort in
    /// arrival order.
    pub fn queue_item_key(queue: &str, seq: u64) -> String {
        format!("{}/{:020}", queue, seq)
    }

    /// Key of a queue's head cursor (next slot to pop)
    pub fn queue_head_key(queue: &str) -> String {
        format!("{}/head", queue)
    }

    /// Key of a queue's tail cursor (next slot to fill)
    pub fn queue_tail_key(queue: &str) -> String {
        format!("{}/tail", queue)
    }
}
