//! Discrete-event simulation of a batch-job compute cluster.
//!
//! The simulator advances virtual time by draining an ordered event set.
//! Pending jobs are held in queues and bound to hosts by pluggable
//! scheduling policies; hosts account for slot and memory capacity, and the
//! engine collects pending/running statistics along the way.

pub mod cluster;
pub mod config;
pub mod error;
pub mod event;
pub mod event_queue;
pub mod host;
pub mod job;
pub mod logger;
pub mod output;
pub mod queue;
pub mod queue_algorithm;
pub mod queue_algorithms;
pub mod scenario;
pub mod simulation;

pub use cluster::Cluster;
pub use config::SimulationConfig;
pub use error::SimulationError;
pub use event::{EventId, EventItem, EventPayload, EventType};
pub use event_queue::EventQueue;
pub use host::{Host, HostStatus};
pub use job::{Job, JobState};
pub use queue::Queue;
pub use queue_algorithm::{queue_algorithm_resolver, QueueAlgorithm};
pub use scenario::{Scenario, ScenarioEntry};
pub use simulation::{ClusterSimulation, SimulationSummary};

/// Simulated time in integer milliseconds since epoch.
pub type TimeMs = u64;

/// Simulated duration in integer milliseconds.
pub type DurationMs = u64;
