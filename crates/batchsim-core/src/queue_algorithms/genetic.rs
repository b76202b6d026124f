//! Gene-parameterized scheduling policy.
//!
//! Job order and host choice are driven by weighted scores whose weights are
//! decoded from a chromosome; the GA searches this weight space.

use crate::cluster::Cluster;
use crate::job::Job;
use crate::queue_algorithm::{HostBudget, QueueAlgorithm};

/// Number of policy parameters a chromosome encodes.
pub const NUM_POLICY_GENES: usize = 6;

/// Decoded policy parameters. Genes arrive in `[0, 1)` and are mapped to
/// weights in `[-1, 1)` so a policy can also prefer small jobs or packed
/// hosts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PolicyGenes {
    pub job_slots_weight: f64,
    pub job_memory_weight: f64,
    pub job_wait_weight: f64,
    pub host_slots_weight: f64,
    pub host_memory_weight: f64,
    pub host_factor_weight: f64,
}

impl PolicyGenes {
    pub fn from_genes(genes: &[f64]) -> Option<Self> {
        if genes.len() != NUM_POLICY_GENES {
            return None;
        }
        let w = |g: f64| 2.0 * g - 1.0;
        Some(Self {
            job_slots_weight: w(genes[0]),
            job_memory_weight: w(genes[1]),
            job_wait_weight: w(genes[2]),
            host_slots_weight: w(genes[3]),
            host_memory_weight: w(genes[4]),
            host_factor_weight: w(genes[5]),
        })
    }
}

pub struct GeneticPolicy {
    params: PolicyGenes,
}

impl GeneticPolicy {
    pub fn new(params: PolicyGenes) -> Self {
        Self { params }
    }

    fn job_score(&self, job: &Job) -> f64 {
        let p = &self.params;
        p.job_slots_weight * job.slot_required as f64
            + p.job_memory_weight * job.mem_required as f64 / 1024.0
            + p.job_wait_weight * job.pend_start_time().unwrap_or(0) as f64
    }

    fn host_score(&self, cluster: &Cluster, budget: &HostBudget, host: usize) -> f64 {
        let p = &self.params;
        let h = cluster.host(host);
        let slots_norm = budget.free_slots(host) as f64 / h.total_slots().max(1) as f64;
        let mem_norm = budget.free_memory(host) as f64 / h.total_memory().max(1) as f64;
        p.host_slots_weight * slots_norm + p.host_memory_weight * mem_norm + p.host_factor_weight * h.cpu_factor()
    }
}

impl QueueAlgorithm for GeneticPolicy {
    fn name(&self) -> &str {
        "Genetic"
    }

    fn sort(&self, jobs: &mut [Job]) {
        jobs.sort_by(|a, b| self.job_score(b).total_cmp(&self.job_score(a)));
    }

    fn match_jobs(&self, jobs: &[Job], cluster: &Cluster, static_table: bool) -> Vec<(u64, usize)> {
        let mut budget = HostBudget::new(cluster);
        let mut plan = Vec::new();
        for job in jobs {
            let best = job
                .eligible_hosts(cluster, static_table)
                .into_iter()
                .filter(|&h| budget.fits(h, job))
                .max_by(|&a, &b| {
                    self.host_score(cluster, &budget, a)
                        .total_cmp(&self.host_score(cluster, &budget, b))
                });
            if let Some(host) = best {
                budget.commit(host, job);
                plan.push((job.id, host));
            }
        }
        plan
    }
}
