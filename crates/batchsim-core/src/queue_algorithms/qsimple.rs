//! QSimple policy: FIFO jobs, first eligible host in cluster order.

use crate::cluster::Cluster;
use crate::job::Job;
use crate::queue_algorithm::{HostBudget, QueueAlgorithm};

pub struct QSimple;

impl QSimple {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for QSimple {
    fn default() -> Self {
        Self::new()
    }
}

impl QueueAlgorithm for QSimple {
    fn name(&self) -> &str {
        "QSimple"
    }

    fn sort(&self, jobs: &mut [Job]) {
        jobs.sort_by_key(|j| j.submit_time);
    }

    fn match_jobs(&self, jobs: &[Job], cluster: &Cluster, static_table: bool) -> Vec<(u64, usize)> {
        let mut budget = HostBudget::new(cluster);
        let mut plan = Vec::new();
        for job in jobs {
            let candidates = job.eligible_hosts(cluster, static_table);
            if let Some(&host) = candidates.iter().find(|&&h| budget.fits(h, job)) {
                budget.commit(host, job);
                plan.push((job.id, host));
            }
        }
        plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{Host, HostStatus};
    use crate::scenario::ScenarioEntry;

    #[test]
    fn first_fit_in_cluster_order() {
        let mut cluster = Cluster::new();
        cluster.add_host(Host::new("a", 1, 1_000, 1.0, HostStatus::Ok));
        cluster.add_host(Host::new("b", 8, 1_000, 1.0, HostStatus::Ok));
        let mut job = Job::from_entry(
            1,
            &ScenarioEntry {
                submit_time: 0,
                slot_required: 1,
                mem_required: 0,
                cpu_time: 1000,
                non_cpu_time: 0,
                queue_name: "normal".to_owned(),
            },
            0,
        );
        job.set_pending(0);
        let plan = QSimple::new().match_jobs(&[job], &cluster, false);
        assert_eq!(plan, vec![(1, 0)]);
    }
}
