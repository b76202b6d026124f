//! OLB (One Level Back) policy.

use crate::cluster::Cluster;
use crate::job::Job;
use crate::queue_algorithm::{HostBudget, QueueAlgorithm};

/// Jobs in FIFO order of pend start; hosts ranked by free slots descending;
/// greedy first-fit over that ranking.
pub struct Olb;

impl Olb {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for Olb {
    fn default() -> Self {
        Self::new()
    }
}

impl QueueAlgorithm for Olb {
    fn name(&self) -> &str {
        "OLB"
    }

    fn sort(&self, jobs: &mut [Job]) {
        jobs.sort_by_key(|j| j.pend_start_time());
    }

    fn match_jobs(&self, jobs: &[Job], cluster: &Cluster, static_table: bool) -> Vec<(u64, usize)> {
        let mut budget = HostBudget::new(cluster);
        let mut plan = Vec::new();
        for job in jobs {
            let mut candidates = job.eligible_hosts(cluster, static_table);
            candidates.sort_by(|&a, &b| budget.free_slots(b).cmp(&budget.free_slots(a)));
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

    fn pending_job(id: u64, slots: u32, pend_start: u64) -> Job {
        let mut job = Job::from_entry(
            id,
            &ScenarioEntry {
                submit_time: 0,
                slot_required: slots,
                mem_required: 0,
                cpu_time: 1000,
                non_cpu_time: 0,
                queue_name: "normal".to_owned(),
            },
            0,
        );
        job.set_pending(pend_start);
        job
    }

    #[test]
    fn prefers_host_with_most_free_slots() {
        let mut cluster = Cluster::new();
        cluster.add_host(Host::new("small", 2, 1_000, 1.0, HostStatus::Ok));
        cluster.add_host(Host::new("big", 8, 1_000, 1.0, HostStatus::Ok));
        let jobs = vec![pending_job(1, 1, 0)];
        let plan = Olb::new().match_jobs(&jobs, &cluster, false);
        assert_eq!(plan, vec![(1, 1)]);
    }

    #[test]
    fn budget_is_respected_across_the_plan() {
        let mut cluster = Cluster::new();
        cluster.add_host(Host::new("only", 2, 1_000, 1.0, HostStatus::Ok));
        let jobs = vec![pending_job(1, 2, 0), pending_job(2, 2, 0)];
        let plan = Olb::new().match_jobs(&jobs, &cluster, false);
        assert_eq!(plan, vec![(1, 0)]);
    }

    #[test]
    fn sort_is_fifo_by_pend_start() {
        let mut jobs = vec![pending_job(1, 1, 500), pending_job(2, 1, 100), pending_job(3, 1, 500)];
        Olb::new().sort(&mut jobs);
        let ids: Vec<u64> = jobs.iter().map(|j| j.id).collect();
        assert_eq!(ids, vec![2, 1, 3]);
    }
}
