//! Host state: slot/memory capacity, status and job eligibility.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::Serialize;

use crate::job::Job;
use crate::DurationMs;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub enum HostStatus {
    Ok,
    Closed,
    Unavail,
}

impl Display for HostStatus {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            HostStatus::Ok => write!(f, "OK"),
            HostStatus::Closed => write!(f, "CLOSED"),
            HostStatus::Unavail => write!(f, "UNAVAIL"),
        }
    }
}

impl FromStr for HostStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "OK" => Ok(HostStatus::Ok),
            "CLOSED" => Ok(HostStatus::Closed),
            "UNAVAIL" => Ok(HostStatus::Unavail),
            other => Err(format!("unrecognized host status: {}", other)),
        }
    }
}

/// A resource unit of the cluster.
///
/// Free resources are mutated only through [`Cluster`](crate::Cluster), which
/// bumps its version counter on every change.
#[derive(Clone, Debug, Serialize)]
pub struct Host {
    name: String,
    total_slots: u32,
    free_slots: u32,
    total_memory: u64,
    free_memory: u64,
    cpu_factor: f64,
    status: HostStatus,
}

impl Host {
    pub fn new(name: &str, total_slots: u32, total_memory: u64, cpu_factor: f64, status: HostStatus) -> Self {
        Self {
            name: name.to_owned(),
            total_slots,
            free_slots: total_slots,
            total_memory,
            free_memory: total_memory,
            cpu_factor,
            status,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn total_slots(&self) -> u32 {
        self.total_slots
    }

    pub fn free_slots(&self) -> u32 {
        self.free_slots
    }

    pub fn total_memory(&self) -> u64 {
        self.total_memory
    }

    pub fn free_memory(&self) -> u64 {
        self.free_memory
    }

    pub fn cpu_factor(&self) -> f64 {
        self.cpu_factor
    }

    pub fn status(&self) -> HostStatus {
        self.status
    }

    pub fn set_status(&mut self, status: HostStatus) {
        self.status = status;
    }

    /// Checks whether the host can run the job.
    ///
    /// In static-table mode eligibility is judged against total capacities
    /// regardless of what is currently allocated; in dynamic mode against the
    /// free counters.
    pub fn is_eligible(&self, job: &Job, static_table: bool) -> bool {
        if self.status != HostStatus::Ok {
            return false;
        }
        if static_table {
            self.total_slots >= job.slot_required && self.total_memory >= job.mem_required
        } else {
            self.free_slots >= job.slot_required && self.free_memory >= job.mem_required
        }
    }

    /// Whether the host's total capacity could ever satisfy the job,
    /// irrespective of status and current load.
    pub fn can_ever_run(&self, job: &Job) -> bool {
        self.total_slots >= job.slot_required && self.total_memory >= job.mem_required
    }

    /// Estimated run time on this host: `cpu_time / cpu_factor +
    /// non_cpu_time`, truncated toward zero to whole milliseconds.
    /// A zero cpu factor is treated as 1.
    pub fn expected_run_time(&self, job: &Job) -> DurationMs {
        let factor = if self.cpu_factor == 0.0 { 1.0 } else { self.cpu_factor };
        (job.cpu_time as f64 / factor).trunc() as DurationMs + job.non_cpu_time
    }

    pub(crate) fn try_allocate(&mut self, job: &Job) -> bool {
        if self.status != HostStatus::Ok
            || self.free_slots < job.slot_required
            || self.free_memory < job.mem_required
        {
            return false;
        }
        self.free_slots -= job.slot_required;
        self.free_memory -= job.mem_required;
        true
    }

    pub(crate) fn release(&mut self, job: &Job) {
        self.free_slots = (self.free_slots + job.slot_required).min(self.total_slots);
        self.free_memory = (self.free_memory + job.mem_required).min(self.total_memory);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::ScenarioEntry;

    fn job(slots: u32, mem: u64, cpu: u64, non_cpu: u64) -> Job {
        Job::from_entry(
            0,
            &ScenarioEntry {
                submit_time: 0,
                slot_required: slots,
                mem_required: mem,
                cpu_time: cpu,
                non_cpu_time: non_cpu,
                queue_name: "normal".to_owned(),
            },
            0,
        )
    }

    #[test]
    fn allocate_and_release_conserve_resources() {
        let mut host = Host::new("h1", 4, 16_000_000, 1.0, HostStatus::Ok);
        let j = job(2, 1_000_000, 1000, 0);
        assert!(host.try_allocate(&j));
        assert_eq!(host.free_slots(), 2);
        assert_eq!(host.free_memory(), 15_000_000);
        host.release(&j);
        assert_eq!(host.free_slots(), 4);
        assert_eq!(host.free_memory(), 16_000_000);
    }

    #[test]
    fn allocation_fails_when_closed_or_full() {
        let mut host = Host::new("h1", 1, 1_000_000, 1.0, HostStatus::Ok);
        let j = job(1, 500_000, 1000, 0);
        assert!(host.try_allocate(&j));
        assert!(!host.try_allocate(&j));
        host.release(&j);
        host.set_status(HostStatus::Closed);
        assert!(!host.try_allocate(&j));
    }

    #[test]
    fn static_eligibility_ignores_free_counters() {
        let mut host = Host::new("h1", 2, 2_000_000, 1.0, HostStatus::Ok);
        let j = job(2, 1_000_000, 1000, 0);
        assert!(host.try_allocate(&j));
        assert!(host.is_eligible(&j, true));
        assert!(!host.is_eligible(&j, false));
    }

    #[test]
    fn expected_run_time_scales_with_cpu_factor() {
        let fast = Host::new("fast", 4, 1_000_000, 2.0, HostStatus::Ok);
        let slow = Host::new("slow", 4, 1_000_000, 0.5, HostStatus::Ok);
        let broken = Host::new("broken", 4, 1_000_000, 0.0, HostStatus::Ok);
        let j = job(1, 0, 1000, 500);
        assert_eq!(fast.expected_run_time(&j), 1000);
        assert_eq!(slow.expected_run_time(&j), 2500);
        assert_eq!(broken.expected_run_time(&j), 1500);
    }
}
