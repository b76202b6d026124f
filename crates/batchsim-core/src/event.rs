//! Simulation events.

use std::cmp::Ordering;

use serde::Serialize;

use crate::TimeMs;

/// Event identifier, unique within one engine instance.
///
/// Events are numbered sequentially starting from 0, so the identifier also
/// encodes insertion order.
pub type EventId = u64;

/// Classification of events, mostly used for logging.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub enum EventType {
    Scenario,
    JobFinished,
    JobReserved,
    Dispatch,
    Log,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Scenario => "Scenario",
            EventType::JobFinished => "Job Finished",
            EventType::JobReserved => "Job Reserved",
            EventType::Dispatch => "Dispatch",
            EventType::Log => "Log",
        }
    }
}

/// Tagged event payload dispatched by the engine.
///
/// Payloads carry only plain parameters; the acted-upon state lives in the
/// engine, so the queue stays serializable and debuggable.
#[derive(Clone, Debug, Serialize)]
pub enum EventPayload {
    /// Submit the next scenario entry to its queue.
    JobSubmit,
    /// A running job reached its expected finish time.
    JobFinished { job_id: u64 },
    /// A reserved job becomes eligible for dispatch.
    JobReserved { job_id: u64 },
    /// Run one dispatch cycle over all queues.
    Dispatch,
    /// Periodic status line.
    Log,
    /// Periodic accounting of newly submitted jobs.
    CountNewJobs,
}

impl EventPayload {
    pub fn event_type(&self) -> EventType {
        match self {
            EventPayload::JobSubmit => EventType::Scenario,
            EventPayload::JobFinished { .. } => EventType::JobFinished,
            EventPayload::JobReserved { .. } => EventType::JobReserved,
            EventPayload::Dispatch => EventType::Dispatch,
            EventPayload::Log => EventType::Log,
            EventPayload::CountNewJobs => EventType::Scenario,
        }
    }
}

/// Representation of a scheduled event.
#[derive(Clone, Debug, Serialize)]
pub struct EventItem {
    pub id: EventId,
    pub time: TimeMs,
    pub priority: u8,
    pub payload: EventPayload,
}

impl EventItem {
    pub fn event_type(&self) -> EventType {
        self.payload.event_type()
    }
}

impl Eq for EventItem {}

impl PartialEq for EventItem {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

/// Earlier time first, then higher priority, then insertion order.
impl Ord for EventItem {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .cmp(&other.time)
            .then_with(|| other.priority.cmp(&self.priority))
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for EventItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
