//! Cluster state: insertion-ordered host inventory with a version counter.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::error::SimulationError;
use crate::host::{Host, HostStatus};
use crate::job::Job;

/// Insertion-ordered set of hosts indexed by name.
///
/// The version counter is monotone and bumped on every resource change,
/// including host registration; the dispatcher uses it to suppress redundant
/// dispatch cycles. Cloning a cluster yields an independent copy, which is
/// how GA workers materialize their own mutable state from a blueprint.
#[derive(Clone, Default)]
pub struct Cluster {
    hosts: Vec<Host>,
    name_to_index: HashMap<String, usize>,
    version: u64,
}

impl Cluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a host inventory from a whitespace- or comma-delimited file with
    /// rows `host_name, total_slots, total_memory_kb, cpu_factor, initial_status`.
    pub fn from_topology_file<P: AsRef<Path>>(path: P) -> Result<Self, SimulationError> {
        let content = fs::read_to_string(path)?;
        Self::parse_topology(&content)
    }

    pub fn parse_topology(content: &str) -> Result<Self, SimulationError> {
        let mut cluster = Self::new();
        for (lineno, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = line.split(|c: char| c == ',' || c.is_whitespace())
                .filter(|s| !s.is_empty())
                .collect();
            let parse = |msg: &str| SimulationError::ScenarioParse {
                line: lineno + 1,
                message: msg.to_owned(),
            };
            if fields.len() != 5 {
                return Err(parse(&format!("expected 5 host fields, got {}", fields.len())));
            }
            let total_slots: u32 = fields[1].parse().map_err(|_| parse("bad total_slots"))?;
            let total_memory: u64 = fields[2].parse().map_err(|_| parse("bad total_memory_kb"))?;
            let cpu_factor: f64 = fields[3].parse().map_err(|_| parse("bad cpu_factor"))?;
            let status = HostStatus::from_str(fields[4]).map_err(|e| parse(&e))?;
            cluster.add_host(Host::new(fields[0], total_slots, total_memory, cpu_factor, status));
        }
        Ok(cluster)
    }

    /// Registers a host and returns its index. Bumps the version.
    pub fn add_host(&mut self, host: Host) -> usize {
        let index = self.hosts.len();
        self.name_to_index.insert(host.name().to_owned(), index);
        self.hosts.push(host);
        self.version += 1;
        index
    }

    pub fn host(&self, index: usize) -> &Host {
        &self.hosts[index]
    }

    pub fn hosts(&self) -> &[Host] {
        &self.hosts
    }

    pub fn num_hosts(&self) -> usize {
        self.hosts.len()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn lookup_index(&self, name: &str) -> Result<usize, SimulationError> {
        self.name_to_index
            .get(name)
            .copied()
            .ok_or_else(|| SimulationError::UnknownHost(name.to_owned()))
    }

    pub fn find_host(&self, name: &str) -> Result<&Host, SimulationError> {
        Ok(&self.hosts[self.lookup_index(name)?])
    }

    /// Changes a host's status. Bumps the version so the dispatcher revisits.
    pub fn set_host_status(&mut self, index: usize, status: HostStatus) {
        self.hosts[index].set_status(status);
        self.version += 1;
    }

    /// Commits the job's resources on the host. Returns false and leaves the
    /// host untouched when it is not OK or lacks free resources.
    pub fn allocate(&mut self, index: usize, job: &Job) -> bool {
        if self.hosts[index].try_allocate(job) {
            self.version += 1;
            true
        } else {
            false
        }
    }

    /// Returns the job's resources to the host. Bumps the version.
    pub fn release(&mut self, index: usize, job: &Job) {
        self.hosts[index].release(job);
        self.version += 1;
    }

    /// Indices of hosts that pass the eligibility predicate, in insertion order.
    pub fn eligible_hosts(&self, job: &Job, static_table: bool) -> Vec<usize> {
        self.hosts
            .iter()
            .enumerate()
            .filter(|(_, h)| h.is_eligible(job, static_table))
            .map(|(i, _)| i)
            .collect()
    }

    /// Whether any host's total capacity could ever satisfy the job.
    pub fn can_ever_run(&self, job: &Job) -> bool {
        self.hosts.iter().any(|h| h.can_ever_run(job))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::ScenarioEntry;

    fn job(slots: u32, mem: u64) -> Job {
        Job::from_entry(
            0,
            &ScenarioEntry {
                submit_time: 0,
                slot_required: slots,
                mem_required: mem,
                cpu_time: 1000,
                non_cpu_time: 0,
                queue_name: "normal".to_owned(),
            },
            0,
        )
    }

    #[test]
    fn version_bumps_on_every_resource_change() {
        let mut cluster = Cluster::new();
        cluster.add_host(Host::new("a", 4, 1_000_000, 1.0, HostStatus::Ok));
        let v0 = cluster.version();
        let j = job(1, 100);
        assert!(cluster.allocate(0, &j));
        assert!(cluster.version() > v0);
        let v1 = cluster.version();
        cluster.release(0, &j);
        assert!(cluster.version() > v1);
    }

    #[test]
    fn failed_allocation_does_not_bump_version() {
        let mut cluster = Cluster::new();
        cluster.add_host(Host::new("a", 1, 100, 1.0, HostStatus::Ok));
        let v0 = cluster.version();
        assert!(!cluster.allocate(0, &job(8, 100)));
        assert_eq!(cluster.version(), v0);
    }

    #[test]
    fn status_change_bumps_version() {
        let mut cluster = Cluster::new();
        cluster.add_host(Host::new("a", 4, 1_000_000, 1.0, HostStatus::Ok));
        let v0 = cluster.version();
        cluster.set_host_status(0, HostStatus::Unavail);
        assert!(cluster.version() > v0);
        assert!(cluster.eligible_hosts(&job(1, 100), false).is_empty());
    }

    #[test]
    fn eligible_hosts_in_insertion_order() {
        let mut cluster = Cluster::new();
        cluster.add_host(Host::new("big", 8, 1_000_000, 1.0, HostStatus::Ok));
        cluster.add_host(Host::new("down", 8, 1_000_000, 1.0, HostStatus::Unavail));
        cluster.add_host(Host::new("small", 1, 1_000_000, 1.0, HostStatus::Ok));
        let j = job(2, 100);
        assert_eq!(cluster.eligible_hosts(&j, false), vec![0]);
        assert!(cluster.can_ever_run(&j));
        assert!(!cluster.can_ever_run(&job(16, 100)));
    }

    #[test]
    fn parses_topology_rows() {
        let cluster = Cluster::parse_topology(
            "# name slots mem_kb factor status\n\
             host01 4 16000000 1.0 OK\n\
             host02, 8, 32000000, 2.0, CLOSED\n",
        )
        .unwrap();
        assert_eq!(cluster.num_hosts(), 2);
        assert_eq!(cluster.find_host("host02").unwrap().total_slots(), 8);
        assert_eq!(cluster.host(1).status(), HostStatus::Closed);
        assert!(Cluster::parse_topology("host01 4 bad 1.0 OK\n").is_err());
    }
}
