//! Ordered event set with by-id mutation.
//!
//! Dispatch events periodically reschedule themselves and job-finish events
//! may be delayed after the fact, so a plain binary heap is not enough: the
//! queue pairs an ordered tree with a hash index from event id to tree key.

use std::collections::{BTreeMap, HashMap};

use crate::event::{EventId, EventItem, EventPayload};
use crate::{DurationMs, TimeMs};

/// Tree key replicating [`EventItem`] ordering: earlier time first, higher
/// priority on ties, insertion order on full ties.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct EventKey {
    time: TimeMs,
    priority: u8,
    id: EventId,
}

impl Ord for EventKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.time
            .cmp(&other.time)
            .then_with(|| other.priority.cmp(&self.priority))
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for EventKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Default)]
pub struct EventQueue {
    entries: BTreeMap<EventKey, EventItem>,
    index: HashMap<EventId, EventKey>,
    next_id: EventId,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules a payload at an absolute time and returns the event id.
    pub fn push(&mut self, time: TimeMs, priority: u8, payload: EventPayload) -> EventId {
        let id = self.next_id;
        self.next_id += 1;
        let key = EventKey { time, priority, id };
        self.entries.insert(
            key,
            EventItem {
                id,
                time,
                priority,
                payload,
            },
        );
        self.index.insert(id, key);
        id
    }

    /// Removes and returns the earliest event (highest priority on ties).
    pub fn pop_min(&mut self) -> Option<EventItem> {
        let (&key, _) = self.entries.iter().next()?;
        let item = self.entries.remove(&key)?;
        self.index.remove(&item.id);
        Some(item)
    }

    /// Returns the event with the given id, or `None` when it is absent or
    /// already popped.
    pub fn find_by_id(&self, id: EventId) -> Option<&EventItem> {
        let key = self.index.get(&id)?;
        self.entries.get(key)
    }

    /// Removes the event with the given id.
    pub fn erase(&mut self, id: EventId) -> Option<EventItem> {
        let key = self.index.remove(&id)?;
        self.entries.remove(&key)
    }

    /// Shifts the event's time forward and re-establishes ordering.
    /// No-op when the id is absent.
    pub fn add_delay(&mut self, id: EventId, delay: DurationMs) {
        let Some(&key) = self.index.get(&id) else {
            return;
        };
        let mut item = self.entries.remove(&key).expect("indexed event must be present");
        item.time += delay;
        let new_key = EventKey {
            time: item.time,
            priority: item.priority,
            id,
        };
        self.entries.insert(new_key, item);
        self.index.insert(id, new_key);
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_in_time_order() {
        let mut q = EventQueue::new();
        q.push(300, 0, EventPayload::Log);
        q.push(100, 0, EventPayload::Dispatch);
        q.push(200, 0, EventPayload::JobSubmit);
        let times: Vec<TimeMs> = std::iter::from_fn(|| q.pop_min()).map(|e| e.time).collect();
        assert_eq!(times, vec![100, 200, 300]);
    }

    #[test]
    fn higher_priority_wins_time_ties() {
        let mut q = EventQueue::new();
        q.push(1000, 1, EventPayload::Dispatch);
        q.push(1000, 2, EventPayload::JobFinished { job_id: 7 });
        q.push(1000, 0, EventPayload::JobSubmit);
        let first = q.pop_min().unwrap();
        assert_eq!(first.priority, 2);
        assert_eq!(q.pop_min().unwrap().priority, 1);
        assert_eq!(q.pop_min().unwrap().priority, 0);
    }

    #[test]
    fn full_ties_pop_in_insertion_order() {
        let mut q = EventQueue::new();
        let a = q.push(500, 1, EventPayload::JobReserved { job_id: 1 });
        let b = q.push(500, 1, EventPayload::JobReserved { job_id: 2 });
        let c = q.push(500, 1, EventPayload::JobReserved { job_id: 3 });
        let ids: Vec<EventId> = std::iter::from_fn(|| q.pop_min()).map(|e| e.id).collect();
        assert_eq!(ids, vec![a, b, c]);
    }

    #[test]
    fn add_delay_reorders() {
        let mut q = EventQueue::new();
        let early = q.push(100, 0, EventPayload::Dispatch);
        q.push(200, 0, EventPayload::Log);
        q.add_delay(early, 500);
        assert_eq!(q.pop_min().unwrap().time, 200);
        let delayed = q.pop_min().unwrap();
        assert_eq!(delayed.id, early);
        assert_eq!(delayed.time, 600);
    }

    #[test]
    fn add_delay_on_absent_id_is_noop() {
        let mut q = EventQueue::new();
        q.push(100, 0, EventPayload::Log);
        q.add_delay(42, 1000);
        assert_eq!(q.size(), 1);
        assert_eq!(q.pop_min().unwrap().time, 100);
    }

    #[test]
    fn find_and_erase() {
        let mut q = EventQueue::new();
        let id = q.push(100, 0, EventPayload::JobFinished { job_id: 3 });
        assert!(q.find_by_id(id).is_some());
        assert!(q.find_by_id(999).is_none());
        assert!(q.erase(id).is_some());
        assert!(q.find_by_id(id).is_none());
        assert!(q.is_empty());
    }
}
