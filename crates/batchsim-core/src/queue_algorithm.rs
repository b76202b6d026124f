//! Queue scheduling policies.

use std::rc::Rc;

use crate::cluster::Cluster;
use crate::job::Job;

/// A scheduling strategy bound to a queue.
///
/// `sort` defines a strict weak order over the pending jobs (implementations
/// must use a stable sort so insertion order survives ties). `match_jobs`
/// turns the sorted slice into a dispatch plan: each job is paired with at
/// most one host and every host's capacity budget is respected across the
/// whole plan. Commit happens later, so a pair may still be skipped when the
/// host loses eligibility in between.
pub trait QueueAlgorithm {
    /// Registry key of this policy.
    fn name(&self) -> &str;

    fn sort(&self, jobs: &mut [Job]);

    /// Returns `(job id, host index)` pairs.
    fn match_jobs(&self, jobs: &[Job], cluster: &Cluster, static_table: bool) -> Vec<(u64, usize)>;
}

/// Scratch copy of per-host free counters, used by policies to track the
/// capacity budget while building a plan.
pub(crate) struct HostBudget {
    free_slots: Vec<u32>,
    free_memory: Vec<u64>,
}

impl HostBudget {
    pub(crate) fn new(cluster: &Cluster) -> Self {
        Self {
            free_slots: cluster.hosts().iter().map(|h| h.free_slots()).collect(),
            free_memory: cluster.hosts().iter().map(|h| h.free_memory()).collect(),
        }
    }

    pub(crate) fn fits(&self, host: usize, job: &Job) -> bool {
        self.free_slots[host] >= job.slot_required && self.free_memory[host] >= job.mem_required
    }

    pub(crate) fn commit(&mut self, host: usize, job: &Job) {
        self.free_slots[host] -= job.slot_required;
        self.free_memory[host] -= job.mem_required;
    }

    pub(crate) fn free_slots(&self, host: usize) -> u32 {
        self.free_slots[host]
    }

    pub(crate) fn free_memory(&self, host: usize) -> u64 {
        self.free_memory[host]
    }
}

/// Resolves a parameterless built-in policy by name.
///
/// Gene-parameterized policies are constructed directly from their decoded
/// parameters instead.
pub fn queue_algorithm_resolver(name: &str) -> Option<Rc<dyn QueueAlgorithm>> {
    match name {
        "OLB" => Some(Rc::new(crate::queue_algorithms::olb::Olb::new())),
        "QSimple" => Some(Rc::new(crate::queue_algorithms::qsimple::QSimple::new())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolver_knows_builtin_policies() {
        assert_eq!(queue_algorithm_resolver("OLB").unwrap().name(), "OLB");
        assert_eq!(queue_algorithm_resolver("QSimple").unwrap().name(), "QSimple");
        assert!(queue_algorithm_resolver("NoSuchPolicy").is_none());
    }
}
