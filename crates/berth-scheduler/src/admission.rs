//! Admission checks
//!
//! A deployment is admitted only when every dimension of its requirement fits
//! the cluster's remaining capacity. There is no partial admission.
//!
//! Fit is tested as `utilized + required <= total`, the same sum the ledger
//! stores on debit, so an admitted deployment never pushes utilization past
//! the total through float rounding.

use crate::types::AdmissionResult;
use berth_core::{Cluster, Deployment, Resources};
use tracing::debug;

/// Whether `deployment` fits the remaining capacity of `cluster` right now
pub fn can_admit(cluster: &Cluster, deployment: &Deployment) -> bool {
    check(cluster, deployment).admitted
}

/// Admission check that reports the first dimension that does not fit
pub fn check(cluster: &Cluster, deployment: &Deployment) -> AdmissionResult {
    let result = compare(
        &cluster.total,
        &cluster.utilized,
        &deployment.required,
        "available",
    );

    debug!(
        cluster = %cluster.id,
        deployment = %deployment.id,
        admitted = result.admitted,
        "admission check"
    );

    result
}

/// Whether `deployment` could fit `cluster` at all, i.e. when it is idle
pub fn fits_total(cluster: &Cluster, deployment: &Deployment) -> AdmissionResult {
    compare(&cluster.total, &Resources::default(), &deployment.required, "total")
}

fn compare(
    total: &Resources,
    utilized: &Resources,
    required: &Resources,
    label: &str,
) -> AdmissionResult {
    let dimensions = total
        .dimensions()
        .into_iter()
        .zip(utilized.dimensions())
        .zip(required.dimensions());

    for (((name, total), (_, used)), (_, need)) in dimensions {
        if used + need > total {
            let have = total - used;
            return AdmissionResult::deny(format!(
                "Insufficient {}: requested {}, {} {}",
                name, need, label, have
            ));
        }
    }
    AdmissionResult::admit()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger;
    use berth_core::Priority;

    fn cluster(total: Resources, utilized: Resources) -> Cluster {
        let mut cluster = Cluster::new("test", total);
        cluster.utilized = utilized;
        cluster
    }

    fn deployment(required: Resources) -> Deployment {
        Deployment::new("web", "nginx:1.27", required, Priority::High)
    }

    #[test]
    fn test_rejects_when_cpu_short() {
        let c = cluster(Resources::new(10.0, 0.0, 16.0), Resources::new(8.0, 0.0, 0.0));
        let d = deployment(Resources::new(3.0, 0.0, 0.0));

        assert!(!can_admit(&c, &d));
        let result = check(&c, &d);
        assert_eq!(
            result.reason,
            Some("Insufficient cpu: requested 3, available 2".to_string())
        );
    }

    #[test]
    fn test_admits_when_all_dimensions_fit() {
        let c = cluster(Resources::new(10.0, 0.0, 16.0), Resources::new(4.0, 0.0, 2.0));
        let d = deployment(Resources::new(3.0, 0.0, 1.0));
        assert!(can_admit(&c, &d));
    }

    #[test]
    fn test_exact_fit_is_admitted() {
        let c = cluster(Resources::new(4.0, 1.0, 8.0), Resources::new(2.0, 0.0, 4.0));
        let d = deployment(Resources::new(2.0, 1.0, 4.0));
        assert!(can_admit(&c, &d));
    }

    #[test]
    fn test_all_or_nothing() {
        // cpu and ram fit, gpu does not
        let c = cluster(Resources::new(16.0, 1.0, 64.0), Resources::new(0.0, 1.0, 0.0));
        let d = deployment(Resources::new(1.0, 1.0, 1.0));

        let result = check(&c, &d);
        assert!(!result.admitted);
        assert!(result.reason.unwrap().starts_with("Insufficient gpu"));
    }

    #[test]
    fn test_fits_total_ignores_utilization() {
        let c = cluster(Resources::new(4.0, 0.0, 8.0), Resources::new(4.0, 0.0, 8.0));
        assert!(fits_total(&c, &deployment(Resources::new(4.0, 0.0, 8.0))).admitted);
        assert!(!fits_total(&c, &deployment(Resources::new(5.0, 0.0, 8.0))).admitted);
    }

    #[test]
    fn test_admission_matches_debited_value() {
        // 1.7 - 0.6 >= 1.1 holds in f64, but 0.6 + 1.1 lands just above 1.7
        let mut c = cluster(Resources::new(1.7, 0.0, 4.0), Resources::new(0.6, 0.0, 0.0));
        let d = deployment(Resources::new(1.1, 0.0, 1.0));

        assert!(!can_admit(&c, &d));

        // Whatever is admitted must keep the ledger within totals
        for cpu in [0.1, 0.3, 0.7, 1.0, 1.09] {
            let d = deployment(Resources::new(cpu, 0.0, 1.0));
            if can_admit(&c, &d) {
                let mut debited = c.clone();
                ledger::debit(&mut debited, &d.required);
                assert!(debited.utilized.cpu <= debited.total.cpu);
            }
        }

        c.utilized = Resources::new(0.6, 0.0, 0.0);
        let d = deployment(Resources::new(1.0, 0.0, 1.0));
        assert!(can_admit(&c, &d));
        ledger::debit(&mut c, &d.required);
        assert!(c.utilized.cpu <= c.total.cpu);
    }
}
