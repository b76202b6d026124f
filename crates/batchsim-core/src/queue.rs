//! Job queue: pending set plus a pluggable dispatch policy.

use std::rc::Rc;

use crate::cluster::Cluster;
use crate::config::SimulationConfig;
use crate::event::EventPayload;
use crate::event_queue::EventQueue;
use crate::job::Job;
use crate::queue_algorithm::QueueAlgorithm;
use crate::simulation::PRIORITY_JOB_FINISHED;
use crate::{DurationMs, TimeMs};

/// What one dispatch step did to this queue.
pub struct DispatchOutcome {
    /// Jobs moved to RUN; allocations are committed and finish events scheduled.
    pub dispatched: Vec<Job>,
    /// Jobs dropped to EXIT because no host can ever satisfy them.
    pub exited: Vec<Job>,
    /// Number of jobs still pending after this step.
    pub pending_after: usize,
}

pub struct Queue {
    name: String,
    priority: i32,
    pending: Vec<Job>,
    algorithm: Rc<dyn QueueAlgorithm>,
}

impl Queue {
    pub fn new(name: &str, priority: i32, algorithm: Rc<dyn QueueAlgorithm>) -> Self {
        Self {
            name: name.to_owned(),
            priority,
            pending: Vec::new(),
            algorithm,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn algorithm_name(&self) -> &str {
        self.algorithm.name()
    }

    pub fn num_pending_jobs(&self) -> usize {
        self.pending.len()
    }

    pub fn pending_jobs(&self) -> &[Job] {
        &self.pending
    }

    /// Adds a job to the pending set. The job must already be PEND.
    pub fn push(&mut self, job: Job) {
        self.pending.push(job);
    }

    /// One dispatch step: order the pending set, drop unsatisfiable jobs to
    /// EXIT, build the policy's plan and commit it pair by pair. A pair whose
    /// host rejects the allocation (eligibility lost since planning) is
    /// skipped and the job stays pending for the next cycle.
    pub fn dispatch(
        &mut self,
        cluster: &mut Cluster,
        events: &mut EventQueue,
        config: &SimulationConfig,
        now: TimeMs,
    ) -> DispatchOutcome {
        self.algorithm.sort(&mut self.pending);

        let mut exited = Vec::new();
        let mut keep = Vec::with_capacity(self.pending.len());
        for mut job in self.pending.drain(..) {
            if job.has_zero_run_time() || !cluster.can_ever_run(&job) {
                job.set_exited(now);
                exited.push(job);
            } else {
                keep.push(job);
            }
        }
        self.pending = keep;

        let static_table = config.use_static_host_table_for_jobs;
        let plan = self.algorithm.match_jobs(&self.pending, cluster, static_table);

        let mut dispatched = Vec::new();
        for (job_id, host_index) in plan {
            let Some(pos) = self.pending.iter().position(|j| j.id == job_id) else {
                continue;
            };
            if !cluster.allocate(host_index, &self.pending[pos]) {
                // host lost eligibility between planning and commit
                continue;
            }
            let mut job = self.pending.remove(pos);
            let host = cluster.host(host_index);
            let run_time = scaled_run_time(host.expected_run_time(&job), config.runtime_multiplier);
            job.set_running(now, host.name(), run_time);
            events.push(now + run_time, PRIORITY_JOB_FINISHED, EventPayload::JobFinished { job_id: job.id });
            dispatched.push(job);
        }

        DispatchOutcome {
            dispatched,
            exited,
            pending_after: self.pending.len(),
        }
    }
}

/// Applies the configured runtime multiplier to an expected run time,
/// truncating toward zero.
fn scaled_run_time(base: DurationMs, multiplier: f64) -> DurationMs {
    (base as f64 * multiplier).trunc() as DurationMs
}
