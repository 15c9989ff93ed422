//! Resource ledger
//!
//! Debits and credits a cluster's utilized capacity. Callers persist the
//! cluster afterwards and hold the cluster's lock from `crate::locks` for the
//! whole read-modify-write.

use berth_core::{Cluster, Resources};
use tracing::{debug, warn};

/// Commit `required` against the cluster. Admission must already have passed.
pub fn debit(cluster: &mut Cluster, required: &Resources) {
    cluster.utilized.cpu += required.cpu;
    cluster.utilized.gpu += required.gpu;
    cluster.utilized.ram += required.ram;

    debug!(cluster = %cluster.id, utilized = ?cluster.utilized, "ledger debit");
}

/// Return `required` to the cluster, clamping each dimension at zero
pub fn credit(cluster: &mut Cluster, required: &Resources) {
    let cpu = cluster.utilized.cpu - required.cpu;
    let gpu = cluster.utilized.gpu - required.gpu;
    let ram = cluster.utilized.ram - required.ram;

    if cpu < 0.0 || gpu < 0.0 || ram < 0.0 {
        warn!(
            cluster = %cluster.id,
            cpu, gpu, ram,
            "ledger credit went negative, clamping to zero"
        );
    }

    cluster.utilized = Resources::new(cpu.max(0.0), gpu.max(0.0), ram.max(0.0));

    debug!(cluster = %cluster.id, utilized = ?cluster.utilized, "ledger credit");
}
