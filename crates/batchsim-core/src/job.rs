//! Job lifecycle and timing accounting.

use std::fmt::{Display, Formatter};

use serde::Serialize;

use crate::cluster::Cluster;
use crate::scenario::ScenarioEntry;
use crate::{DurationMs, TimeMs};

/// LSF-style job states. Only WAIT, PEND, RUN, DONE and EXIT are reachable
/// in this simulator; the rest exist for jobmart compatibility.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub enum JobState {
    Wait,
    Pend,
    Run,
    Done,
    Exit,
    Psusp,
    Ususp,
    Ssusp,
    PostDone,
    PostErr,
    Unkwn,
    Zombi,
}

impl Display for JobState {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        let s = match self {
            JobState::Wait => "WAIT",
            JobState::Pend => "PEND",
            JobState::Run => "RUN",
            JobState::Done => "DONE",
            JobState::Exit => "EXIT",
            JobState::Psusp => "PSUSP",
            JobState::Ususp => "USUSP",
            JobState::Ssusp => "SSUSP",
            JobState::PostDone => "POST_DONE",
            JobState::PostErr => "POST_ERR",
            JobState::Unkwn => "UNKWN",
            JobState::Zombi => "ZOMBI",
        };
        write!(f, "{}", s)
    }
}

/// A workload record bound to its managing queue by index.
#[derive(Clone, Debug, Serialize)]
pub struct Job {
    pub id: u64,
    pub slot_required: u32,
    pub mem_required: u64,
    pub submit_time: TimeMs,
    pub cpu_time: DurationMs,
    pub non_cpu_time: DurationMs,
    pub queue_index: usize,
    pub priority: i32,
    pub state: JobState,
    /// Estimated run time, computed against the assigned host at dispatch.
    pub run_time: Option<DurationMs>,
    pub run_host_name: Option<String>,
    pub start_time: Option<TimeMs>,
    pub finish_time: Option<TimeMs>,
    pub total_pending_duration: DurationMs,
    pend_start_time: Option<TimeMs>,
}

impl Job {
    pub fn from_entry(id: u64, entry: &ScenarioEntry, queue_index: usize) -> Self {
        Self {
            id,
            slot_required: entry.slot_required,
            mem_required: entry.mem_required,
            submit_time: entry.submit_time,
            cpu_time: entry.cpu_time,
            non_cpu_time: entry.non_cpu_time,
            queue_index,
            priority: 0,
            state: JobState::Wait,
            run_time: None,
            run_host_name: None,
            start_time: None,
            finish_time: None,
            total_pending_duration: 0,
            pend_start_time: None,
        }
    }

    /// Moves the job to PEND. The pend start time is recorded only on the
    /// first transition.
    pub fn set_pending(&mut self, time: TimeMs) {
        self.state = JobState::Pend;
        if self.pend_start_time.is_none() {
            self.pend_start_time = Some(time);
        }
    }

    pub fn pend_start_time(&self) -> Option<TimeMs> {
        self.pend_start_time
    }

    pub fn update_total_pending_duration(&mut self, current_time: TimeMs) {
        if let Some(pend_start) = self.pend_start_time {
            self.total_pending_duration = current_time.saturating_sub(pend_start);
        }
    }

    /// Moves the job to RUN on the given host.
    pub fn set_running(&mut self, time: TimeMs, host_name: &str, run_time: DurationMs) {
        self.state = JobState::Run;
        self.start_time = Some(time);
        self.run_time = Some(run_time);
        self.run_host_name = Some(host_name.to_owned());
        self.update_total_pending_duration(time);
    }

    pub fn set_finished(&mut self, time: TimeMs) {
        self.state = JobState::Done;
        self.finish_time = Some(time);
    }

    pub fn set_exited(&mut self, time: TimeMs) {
        self.state = JobState::Exit;
        self.update_total_pending_duration(time);
    }

    /// Whether the estimated run time can only come out non-positive.
    pub fn has_zero_run_time(&self) -> bool {
        self.cpu_time == 0 && self.non_cpu_time == 0
    }

    /// Hosts eligible to run this job, in cluster insertion order.
    pub fn eligible_hosts(&self, cluster: &Cluster, static_table: bool) -> Vec<usize> {
        cluster.eligible_hosts(self, static_table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> ScenarioEntry {
        ScenarioEntry {
            submit_time: 100,
            slot_required: 1,
            mem_required: 1000,
            cpu_time: 5000,
            non_cpu_time: 0,
            queue_name: "normal".to_owned(),
        }
    }

    #[test]
    fn pend_start_is_recorded_once() {
        let mut job = Job::from_entry(1, &entry(), 0);
        assert_eq!(job.state, JobState::Wait);
        job.set_pending(100);
        job.set_pending(900);
        assert_eq!(job.pend_start_time(), Some(100));
        job.update_total_pending_duration(1500);
        assert_eq!(job.total_pending_duration, 1400);
    }

    #[test]
    fn lifecycle_timestamps() {
        let mut job = Job::from_entry(1, &entry(), 0);
        job.set_pending(100);
        job.set_running(1100, "host01", 5000);
        assert_eq!(job.state, JobState::Run);
        assert_eq!(job.start_time, Some(1100));
        assert_eq!(job.total_pending_duration, 1000);
        assert_eq!(job.run_host_name.as_deref(), Some("host01"));
        job.set_finished(6100);
        assert_eq!(job.state, JobState::Done);
        assert!(job.finish_time >= job.start_time);
    }
}
