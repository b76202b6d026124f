use std::rc::Rc;

use batchsim_core::cluster::Cluster;
use batchsim_core::config::SimulationConfig;
use batchsim_core::error::SimulationError;
use batchsim_core::host::{Host, HostStatus};
use batchsim_core::job::JobState;
use batchsim_core::queue::Queue;
use batchsim_core::queue_algorithm::queue_algorithm_resolver;
use batchsim_core::scenario::{Scenario, ScenarioEntry};
use batchsim_core::simulation::ClusterSimulation;

fn entry(submit: u64, slots: u32, mem: u64, cpu: u64, non_cpu: u64, queue: &str) -> ScenarioEntry {
    ScenarioEntry {
        submit_time: submit,
        slot_required: slots,
        mem_required: mem,
        cpu_time: cpu,
        non_cpu_time: non_cpu,
        queue_name: queue.to_owned(),
    }
}

fn single_host_cluster(slots: u32, memory_kb: u64, cpu_factor: f64) -> Cluster {
    let mut cluster = Cluster::new();
    cluster.add_host(Host::new("host01", slots, memory_kb, cpu_factor, HostStatus::Ok));
    cluster
}

fn default_sim(scenario: Scenario, cluster: Cluster) -> ClusterSimulation {
    ClusterSimulation::with_default_queue(
        scenario,
        cluster,
        queue_algorithm_resolver("OLB").unwrap(),
        SimulationConfig::quiet(),
    )
    .unwrap()
}

#[test]
// One job on an idle four-slot host: the first dispatch tick fires one
// dispatch period after submission, so the job starts at 1000 ms, runs for
// its cpu time and finishes at 2000 ms.
fn single_job_single_host() {
    let scenario = Scenario::from_entries(vec![entry(0, 1, 1_000_000, 1000, 0, "normal")]);
    let cluster = single_host_cluster(4, 16_000_000, 1.0);
    let mut sim = default_sim(scenario, cluster);
    let summary = sim.run();

    assert_eq!(summary.num_submitted_jobs, 1);
    assert_eq!(summary.num_successful_jobs, 1);
    assert_eq!(summary.num_failed_jobs, 0);

    let job = &sim.completed_jobs()[0];
    assert_eq!(job.state, JobState::Done);
    assert_eq!(job.start_time, Some(1000));
    assert_eq!(job.finish_time, Some(2000));
    assert_eq!(job.total_pending_duration, 1000);
    assert_eq!(summary.total_pending_duration, 1000);
    assert_eq!(summary.latest_finish_time, 2000);
}

#[test]
// Two jobs contending for one slot: the second waits for the first to
// finish and is picked up by the dispatch cycle at the finish timestamp.
fn two_jobs_one_host_queueing() {
    let scenario = Scenario::from_entries(vec![
        entry(0, 1, 0, 5000, 0, "normal"),
        entry(0, 1, 0, 5000, 0, "normal"),
    ]);
    let cluster = single_host_cluster(1, 16_000_000, 1.0);
    let mut sim = default_sim(scenario, cluster);
    let summary = sim.run();

    assert_eq!(summary.num_successful_jobs, 2);
    let first = sim.completed_jobs().iter().find(|j| j.id == 0).unwrap();
    let second = sim.completed_jobs().iter().find(|j| j.id == 1).unwrap();
    assert_eq!(first.start_time, Some(1000));
    assert_eq!(first.finish_time, Some(6000));
    assert_eq!(second.start_time, Some(6000));
    assert_eq!(second.finish_time, Some(11000));
    assert!(summary.total_pending_duration >= 7000);
}

#[test]
// A job requiring more slots than any host owns exits at dispatch time
// without touching host resources.
fn unsatisfiable_job_exits() {
    let scenario = Scenario::from_entries(vec![entry(0, 8, 0, 5000, 0, "normal")]);
    let cluster = single_host_cluster(2, 16_000_000, 1.0);
    let mut sim = default_sim(scenario, cluster);
    let summary = sim.run();

    assert_eq!(summary.num_failed_jobs, 1);
    assert_eq!(summary.num_successful_jobs, 0);
    let job = &sim.completed_jobs()[0];
    assert_eq!(job.state, JobState::Exit);
    assert_eq!(job.finish_time, None);
    assert_eq!(sim.cluster().host(0).free_slots(), 2);
}

#[test]
// After the last job finishes, the dispatcher runs one further cycle,
// goes quiescent and lets the event queue drain completely.
fn dispatch_quiescence() {
    let scenario = Scenario::from_entries(vec![entry(0, 1, 0, 30_000, 0, "normal")]);
    let cluster = single_host_cluster(4, 16_000_000, 1.0);
    let mut sim = default_sim(scenario, cluster);
    sim.run();

    assert!(!sim.next_dispatch_reserved());
    assert_eq!(sim.event_count(), 0);
    assert_eq!(sim.num_pending_jobs(), 0);
    assert_eq!(sim.running_jobs().count(), 0);
}

#[test]
// Time never runs backward and host bookkeeping balances after the run.
fn clock_monotone_and_resources_conserved() {
    let scenario = Scenario::from_entries(vec![
        entry(0, 2, 1_000_000, 3000, 0, "normal"),
        entry(0, 1, 500_000, 7000, 100, "normal"),
        entry(2500, 1, 250_000, 1000, 0, "normal"),
        entry(9000, 4, 2_000_000, 500, 500, "normal"),
    ]);
    let cluster = single_host_cluster(4, 16_000_000, 1.0);
    let mut sim = default_sim(scenario, cluster);
    let summary = sim.run();

    assert_eq!(summary.num_successful_jobs, 4);
    let host = sim.cluster().host(0);
    assert_eq!(host.free_slots(), host.total_slots());
    assert_eq!(host.free_memory(), host.total_memory());

    // every job observed the full lifecycle in order
    for job in sim.completed_jobs() {
        assert_eq!(job.state, JobState::Done);
        let start = job.start_time.unwrap();
        let finish = job.finish_time.unwrap();
        assert!(start >= job.submit_time);
        assert!(finish >= start);
        assert_eq!(job.total_pending_duration, start - job.pend_start_time().unwrap());
    }
}

#[test]
// The cpu factor scales run time: a factor-2 host halves the cpu part.
fn cpu_factor_halves_run_time() {
    let scenario = Scenario::from_entries(vec![entry(0, 1, 0, 4000, 500, "normal")]);
    let cluster = single_host_cluster(4, 16_000_000, 2.0);
    let mut sim = default_sim(scenario, cluster);
    sim.run();

    let job = &sim.completed_jobs()[0];
    assert_eq!(job.run_time, Some(2500));
    assert_eq!(job.finish_time, Some(3500));
}

#[test]
fn unknown_queue_is_rejected_at_construction() {
    let scenario = Scenario::from_entries(vec![entry(0, 1, 0, 1000, 0, "nosuch")]);
    let cluster = single_host_cluster(4, 16_000_000, 1.0);
    let mut config = SimulationConfig::quiet();
    config.use_only_default_queue = false;
    let queues = vec![Queue::new("normal", 0, queue_algorithm_resolver("OLB").unwrap())];
    let result = ClusterSimulation::new(scenario, cluster, queues, config);
    assert!(matches!(result, Err(SimulationError::UnknownQueue(name)) if name == "nosuch"));
}

#[test]
// With multiple queues, submissions land in their named queues and the
// higher-priority queue dispatches first when both contend for one slot.
fn multi_queue_dispatch_respects_queue_priority() {
    let scenario = Scenario::from_entries(vec![
        entry(0, 1, 0, 2000, 0, "normal"),
        entry(0, 1, 0, 2000, 0, "priority"),
    ]);
    let cluster = single_host_cluster(1, 16_000_000, 1.0);
    let mut config = SimulationConfig::quiet();
    config.use_only_default_queue = false;
    let algorithm = queue_algorithm_resolver("OLB").unwrap();
    let queues = vec![
        Queue::new("normal", 10, Rc::clone(&algorithm)),
        Queue::new("priority", 50, algorithm),
    ];
    let mut sim = ClusterSimulation::new(scenario, cluster, queues, config).unwrap();
    let summary = sim.run();

    assert_eq!(summary.num_successful_jobs, 2);
    let normal_job = sim.completed_jobs().iter().find(|j| j.id == 0).unwrap();
    let priority_job = sim.completed_jobs().iter().find(|j| j.id == 1).unwrap();
    assert!(priority_job.start_time.unwrap() < normal_job.start_time.unwrap());
}

#[test]
// A closed host never receives jobs even though its capacity fits.
fn closed_host_is_skipped() {
    let scenario = Scenario::from_entries(vec![entry(0, 1, 0, 1000, 0, "normal")]);
    let mut cluster = Cluster::new();
    cluster.add_host(Host::new("closed", 8, 16_000_000, 1.0, HostStatus::Closed));
    cluster.add_host(Host::new("open", 1, 16_000_000, 1.0, HostStatus::Ok));
    let mut sim = default_sim(scenario, cluster);
    let summary = sim.run();

    assert_eq!(summary.num_successful_jobs, 1);
    assert_eq!(sim.completed_jobs()[0].run_host_name.as_deref(), Some("open"));
}
