//! The simulation engine: clock, event loop, dispatcher and statistics.

use std::collections::HashMap;
use std::rc::Rc;

use log::Level;
use serde::Serialize;

use crate::cluster::Cluster;
use crate::config::SimulationConfig;
use crate::error::SimulationError;
use crate::event::EventPayload;
use crate::event_queue::EventQueue;
use crate::job::Job;
use crate::logger::{FileLogger, Logger, StdoutLogger};
use crate::output::{SimulationOutput, LOG_OUTPUT_FILE_NAME};
use crate::queue::Queue;
use crate::queue_algorithm::QueueAlgorithm;
use crate::scenario::Scenario;
use crate::{DurationMs, TimeMs};

pub const PRIORITY_SCENARIO: u8 = 0;
pub const PRIORITY_DISPATCH: u8 = 1;
pub const PRIORITY_JOB_FINISHED: u8 = 2;

/// Aggregate results of one simulation run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SimulationSummary {
    pub num_submitted_jobs: usize,
    pub num_successful_jobs: usize,
    pub num_failed_jobs: usize,
    pub total_pending_duration: DurationMs,
    pub total_queuing_time: DurationMs,
    pub latest_finish_time: TimeMs,
    pub makespan: DurationMs,
}

/// Discrete-event simulation of one cluster run.
///
/// The engine owns every piece of mutable state (cluster, queues, running
/// jobs, statistics) and executes events strictly one at a time, so no
/// locking is involved anywhere below the GA layer.
pub struct ClusterSimulation {
    config: SimulationConfig,
    current_time: TimeMs,
    start_time: TimeMs,
    events: EventQueue,
    cluster: Cluster,
    scenario: Scenario,
    queues: Vec<Queue>,
    queue_index: HashMap<String, usize>,
    running: HashMap<u64, Job>,
    completed: Vec<Job>,
    next_job_id: u64,

    next_dispatch_reserved: bool,
    latest_cluster_version: u64,
    num_dispatched_slots: usize,

    num_submitted_jobs: usize,
    newly_submitted_jobs: usize,
    num_successful_jobs: usize,
    num_failed_jobs: usize,
    num_pending_jobs: usize,
    total_pending_duration: DurationMs,
    total_queuing_time: DurationMs,
    latest_finish_time: TimeMs,

    job_submit_record: Vec<(TimeMs, usize)>,
    using_slot_record: Vec<(TimeMs, usize)>,
    pending_record: Vec<(TimeMs, usize)>,

    loggers: Vec<Box<dyn Logger>>,
    output: SimulationOutput,
}

impl ClusterSimulation {
    /// Builds an engine over explicit queues.
    ///
    /// Fails with [`SimulationError::UnknownQueue`] when a scenario entry
    /// references a queue that was not provided (unless every submission is
    /// routed to the default queue).
    pub fn new(
        scenario: Scenario,
        cluster: Cluster,
        queues: Vec<Queue>,
        config: SimulationConfig,
    ) -> Result<Self, SimulationError> {
        assert!(!queues.is_empty(), "at least one queue is required");
        let mut queues = queues;
        // higher-priority queues dispatch first
        queues.sort_by_key(|q| std::cmp::Reverse(q.priority()));
        let queue_index: HashMap<String, usize> = queues
            .iter()
            .enumerate()
            .map(|(i, q)| (q.name().to_owned(), i))
            .collect();

        if !config.use_only_default_queue {
            for entry in scenario.entries() {
                if !queue_index.contains_key(&entry.queue_name) {
                    return Err(SimulationError::UnknownQueue(entry.queue_name.clone()));
                }
            }
        }

        let current_time = scenario.first_submit_time().unwrap_or(0);

        let mut events = EventQueue::new();
        for entry in scenario.entries() {
            events.push(entry.submit_time, PRIORITY_SCENARIO, EventPayload::JobSubmit);
        }
        events.push(current_time + config.logging_frequency, PRIORITY_SCENARIO, EventPayload::Log);
        events.push(
            current_time + config.counting_frequency,
            PRIORITY_SCENARIO,
            EventPayload::CountNewJobs,
        );

        let mut loggers: Vec<Box<dyn Logger>> = Vec::new();
        if config.console_output {
            loggers.push(Box::new(StdoutLogger::new()));
        }
        if config.log_file_output {
            loggers.push(Box::new(FileLogger::new()));
        }

        let output = match SimulationOutput::new(&config) {
            Ok(output) => output,
            Err(e) => {
                log::error!("cannot create output files: {}", e);
                SimulationOutput::disabled(&config)
            }
        };

        Ok(Self {
            config,
            current_time,
            start_time: current_time,
            events,
            cluster,
            scenario,
            queues,
            queue_index,
            running: HashMap::new(),
            completed: Vec::new(),
            next_job_id: 0,
            next_dispatch_reserved: false,
            latest_cluster_version: 0,
            num_dispatched_slots: 0,
            num_submitted_jobs: 0,
            newly_submitted_jobs: 0,
            num_successful_jobs: 0,
            num_failed_jobs: 0,
            num_pending_jobs: 0,
            total_pending_duration: 0,
            total_queuing_time: 0,
            latest_finish_time: 0,
            job_submit_record: Vec::new(),
            using_slot_record: Vec::new(),
            pending_record: Vec::new(),
            loggers,
            output,
        })
    }

    /// Builds an engine with a single default queue managed by the given
    /// policy; every submission is routed there regardless of queue name.
    pub fn with_default_queue(
        scenario: Scenario,
        cluster: Cluster,
        algorithm: Rc<dyn QueueAlgorithm>,
        mut config: SimulationConfig,
    ) -> Result<Self, SimulationError> {
        config.use_only_default_queue = true;
        let queues = vec![Queue::new("normal", 0, algorithm)];
        Self::new(scenario, cluster, queues, config)
    }

    pub fn current_time(&self) -> TimeMs {
        self.current_time
    }

    pub fn cluster(&self) -> &Cluster {
        &self.cluster
    }

    pub fn event_count(&self) -> usize {
        self.events.size()
    }

    pub fn num_pending_jobs(&self) -> usize {
        self.num_pending_jobs
    }

    pub fn next_dispatch_reserved(&self) -> bool {
        self.next_dispatch_reserved
    }

    pub fn default_queue(&self) -> &Queue {
        &self.queues[0]
    }

    pub fn find_queue(&self, name: &str) -> Result<&Queue, SimulationError> {
        self.queue_index
            .get(name)
            .map(|&i| &self.queues[i])
            .ok_or_else(|| SimulationError::UnknownQueue(name.to_owned()))
    }

    /// Jobs currently in RUN state.
    pub fn running_jobs(&self) -> impl Iterator<Item = &Job> {
        self.running.values()
    }

    /// Jobs that reached DONE or EXIT, in completion order.
    pub fn completed_jobs(&self) -> &[Job] {
        &self.completed
    }

    pub fn summary(&self) -> SimulationSummary {
        SimulationSummary {
            num_submitted_jobs: self.num_submitted_jobs,
            num_successful_jobs: self.num_successful_jobs,
            num_failed_jobs: self.num_failed_jobs,
            total_pending_duration: self.total_pending_duration,
            total_queuing_time: self.total_queuing_time,
            latest_finish_time: self.latest_finish_time,
            makespan: self.latest_finish_time.saturating_sub(self.start_time),
        }
    }

    /// Drains the event set, advancing the clock monotonically, until no
    /// events, pending jobs or unsubmitted entries remain.
    pub fn run(&mut self) -> SimulationSummary {
        self.log(
            Level::Info,
            format!(
                "simulation start: {} hosts, {} queues, {} scenario entries",
                self.cluster.num_hosts(),
                self.queues.len(),
                self.scenario.count()
            ),
        );
        loop {
            if self.events.is_empty() && self.num_pending_jobs == 0 && self.scenario.count() == 0 {
                break;
            }
            let Some(event) = self.events.pop_min() else {
                self.log(Level::Warn, "event queue drained with work remaining".to_owned());
                break;
            };
            if event.time > self.current_time {
                self.current_time = event.time;
            }
            if self.config.debug_events {
                self.log(
                    Level::Debug,
                    format!("event [{}] at {} ms", event.event_type().as_str(), event.time),
                );
            }
            match event.payload {
                EventPayload::JobSubmit => self.on_job_submit(),
                EventPayload::JobFinished { job_id } => self.on_job_finished(job_id),
                EventPayload::Dispatch => self.on_dispatch(),
                EventPayload::Log => self.on_log(),
                EventPayload::CountNewJobs => self.on_count_new_jobs(),
                EventPayload::JobReserved { job_id } => {
                    self.log(Level::Warn, format!("unhandled reserved-job event for job {}", job_id));
                }
            }
        }
        self.finalize()
    }

    /// Arms the next dispatch cycle. Idempotent: a second reservation while
    /// one is outstanding is ignored.
    pub fn reserve_dispatch_event(&mut self) {
        if self.next_dispatch_reserved {
            return;
        }
        self.events.push(
            self.current_time + self.config.dispatch_frequency,
            PRIORITY_DISPATCH,
            EventPayload::Dispatch,
        );
        self.next_dispatch_reserved = true;
    }

    fn schedule_next_dispatch(&mut self) {
        self.events.push(
            self.current_time + self.config.dispatch_frequency,
            PRIORITY_DISPATCH,
            EventPayload::Dispatch,
        );
    }

    fn on_job_submit(&mut self) {
        let Some(entry) = self.scenario.pop_next() else {
            self.log(Level::Warn, "submission event without a scenario entry".to_owned());
            return;
        };
        let queue_index = if self.config.use_only_default_queue {
            0
        } else {
            // validated at construction
            self.queue_index[&entry.queue_name]
        };
        let id = self.next_job_id;
        self.next_job_id += 1;
        let mut job = Job::from_entry(id, &entry, queue_index);
        job.set_pending(self.current_time);
        self.log(
            Level::Info,
            format!(
                "job {} submitted to queue {} ({} slots, {} KB)",
                id,
                self.queues[queue_index].name(),
                job.slot_required,
                job.mem_required
            ),
        );
        self.queues[queue_index].push(job);
        self.num_submitted_jobs += 1;
        self.newly_submitted_jobs += 1;
        self.job_submit_record.push((self.current_time, self.num_submitted_jobs));
        self.reserve_dispatch_event();
    }

    /// One dispatch cycle.
    ///
    /// The cluster version gates the work: with no change since the last
    /// cycle there is nothing new to try, so the cycle either goes quiescent
    /// or re-arms itself to wait for a change.
    fn on_dispatch(&mut self) {
        let version = self.cluster.version();
        if version == self.latest_cluster_version {
            if self.scenario.count() == 0 && self.num_pending_jobs == 0 {
                self.next_dispatch_reserved = false;
                return;
            }
            self.schedule_next_dispatch();
            return;
        }
        self.latest_cluster_version = version;

        let mut any_pending = false;
        for index in 0..self.queues.len() {
            let outcome =
                self.queues[index].dispatch(&mut self.cluster, &mut self.events, &self.config, self.current_time);
            any_pending |= outcome.pending_after > 0;
            for job in outcome.dispatched {
                self.num_dispatched_slots += job.slot_required as usize;
                self.log(
                    Level::Info,
                    format!(
                        "job {} dispatched to host {} (expected run time {} ms)",
                        job.id,
                        job.run_host_name.as_deref().unwrap_or("?"),
                        job.run_time.unwrap_or(0)
                    ),
                );
                self.running.insert(job.id, job);
            }
            for job in outcome.exited {
                self.num_failed_jobs += 1;
                self.log(
                    Level::Warn,
                    format!("job {} cannot be satisfied by any host, marked EXIT", job.id),
                );
                self.completed.push(job);
            }
        }
        self.num_pending_jobs = self.queues.iter().map(|q| q.num_pending_jobs()).sum();

        if any_pending {
            self.schedule_next_dispatch();
        } else {
            self.next_dispatch_reserved = false;
            self.latest_cluster_version = 0;
        }

        self.using_slot_record.push((self.current_time, self.num_dispatched_slots));
        self.pending_record.push((self.current_time, self.num_pending_jobs));
    }

    fn on_job_finished(&mut self, job_id: u64) {
        let Some(mut job) = self.running.remove(&job_id) else {
            self.log(Level::Warn, format!("finish event for unknown job {}", job_id));
            return;
        };
        if let Some(host_index) = job
            .run_host_name
            .as_deref()
            .and_then(|name| self.cluster.lookup_index(name).ok())
        {
            self.cluster.release(host_index, &job);
        }
        self.num_dispatched_slots = self.num_dispatched_slots.saturating_sub(job.slot_required as usize);
        job.set_finished(self.current_time);
        self.num_successful_jobs += 1;
        self.latest_finish_time = self.latest_finish_time.max(self.current_time);
        self.total_queuing_time += self.current_time.saturating_sub(job.submit_time);
        self.total_pending_duration += job.total_pending_duration;
        self.log(
            Level::Info,
            format!(
                "job {} finished on host {}",
                job.id,
                job.run_host_name.as_deref().unwrap_or("?")
            ),
        );
        let queue_name = self.queues[job.queue_index].name().to_owned();
        if let Err(e) = self.output.write_jobmart(&job, &queue_name) {
            self.log(Level::Error, format!("cannot write jobmart row: {}", e));
        }
        self.completed.push(job);
        self.reserve_dispatch_event();
    }

    fn on_log(&mut self) {
        self.log(
            Level::Info,
            format!(
                "status: {} pending, {} running, {} slots in use",
                self.num_pending_jobs,
                self.running.len(),
                self.num_dispatched_slots
            ),
        );
        if !self.is_done() {
            self.events.push(
                self.current_time + self.config.logging_frequency,
                PRIORITY_SCENARIO,
                EventPayload::Log,
            );
        }
    }

    fn on_count_new_jobs(&mut self) {
        self.log(
            Level::Info,
            format!("{} jobs submitted in the last counting period", self.newly_submitted_jobs),
        );
        self.newly_submitted_jobs = 0;
        if !self.is_done() {
            self.events.push(
                self.current_time + self.config.counting_frequency,
                PRIORITY_SCENARIO,
                EventPayload::CountNewJobs,
            );
        }
    }

    fn is_done(&self) -> bool {
        self.scenario.count() == 0 && self.num_pending_jobs == 0 && self.running.is_empty()
    }

    fn finalize(&mut self) -> SimulationSummary {
        let summary = self.summary();
        self.print_summary(&summary);
        if let Err(e) =
            self.output
                .save_records(&self.using_slot_record, &self.pending_record, &self.job_submit_record)
        {
            self.log(Level::Error, format!("cannot save report files: {}", e));
        }
        if self.config.log_file_output {
            let path = self.output.directory().join(LOG_OUTPUT_FILE_NAME);
            for logger in &self.loggers {
                if let Err(e) = logger.save_log(&path) {
                    log::error!("cannot save simulation log: {}", e);
                }
            }
        }
        summary
    }

    pub fn print_summary(&mut self, summary: &SimulationSummary) {
        let lines = [
            "### Simulation summary ###".to_owned(),
            format!("submitted jobs:         {}", summary.num_submitted_jobs),
            format!("successful jobs:        {}", summary.num_successful_jobs),
            format!("failed jobs:            {}", summary.num_failed_jobs),
            format!("total pending duration: {} ms", summary.total_pending_duration),
            format!("total queuing time:     {} ms", summary.total_queuing_time),
            format!("latest finish time:     {} ms", summary.latest_finish_time),
            format!("makespan:               {} ms", summary.makespan),
        ];
        for line in lines {
            self.log(Level::Info, line);
        }
    }

    fn log(&mut self, level: Level, message: String) {
        let time = self.current_time;
        for logger in &mut self.loggers {
            logger.log(level, time, message.clone());
        }
    }
}
