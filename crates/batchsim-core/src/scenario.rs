//! Workload scenario: a finite source of timestamped submission entries.

use std::collections::VecDeque;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SimulationError;
use crate::{DurationMs, TimeMs};

/// One historical job submission.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScenarioEntry {
    pub submit_time: TimeMs,
    pub slot_required: u32,
    pub mem_required: u64,
    pub cpu_time: DurationMs,
    pub non_cpu_time: DurationMs,
    pub queue_name: String,
}

/// Ordered stream of submissions, non-decreasing by submit time.
#[derive(Clone, Default)]
pub struct Scenario {
    entries: VecDeque<ScenarioEntry>,
}

impl Scenario {
    pub fn from_entries(entries: Vec<ScenarioEntry>) -> Self {
        debug_assert!(
            entries.windows(2).all(|w| w[0].submit_time <= w[1].submit_time),
            "scenario entries must be ordered by submit time"
        );
        Self {
            entries: entries.into(),
        }
    }

    /// Loads a scenario from a whitespace- or comma-delimited file with rows
    /// `submit_time_ms, slot_required, mem_required_kb, cpu_time_ms,
    /// non_cpu_time_ms, queue_name`.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SimulationError> {
        let content = fs::read_to_string(path)?;
        Self::parse_str(&content)
    }

    pub fn parse_str(content: &str) -> Result<Self, SimulationError> {
        let mut entries = Vec::new();
        let mut last_time: TimeMs = 0;
        for (lineno, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let parse = |msg: &str| SimulationError::ScenarioParse {
                line: lineno + 1,
                message: msg.to_owned(),
            };
            let fields: Vec<&str> = line
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|s| !s.is_empty())
                .collect();
            if fields.len() != 6 {
                return Err(parse(&format!("expected 6 scenario fields, got {}", fields.len())));
            }
            let entry = ScenarioEntry {
                submit_time: fields[0].parse().map_err(|_| parse("bad submit_time_ms"))?,
                slot_required: fields[1].parse().map_err(|_| parse("bad slot_required"))?,
                mem_required: fields[2].parse().map_err(|_| parse("bad mem_required_kb"))?,
                cpu_time: fields[3].parse().map_err(|_| parse("bad cpu_time_ms"))?,
                non_cpu_time: fields[4].parse().map_err(|_| parse("bad non_cpu_time_ms"))?,
                queue_name: fields[5].to_owned(),
            };
            if entry.submit_time < last_time {
                return Err(parse("submit times must be non-decreasing"));
            }
            last_time = entry.submit_time;
            entries.push(entry);
        }
        Ok(Self::from_entries(entries))
    }

    /// Number of entries not yet submitted.
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    /// Takes the next entry, or `None` when the scenario is exhausted.
    pub fn pop_next(&mut self) -> Option<ScenarioEntry> {
        self.entries.pop_front()
    }

    /// Remaining entries, in submission order.
    pub fn entries(&self) -> impl Iterator<Item = &ScenarioEntry> {
        self.entries.iter()
    }

    pub fn first_submit_time(&self) -> Option<TimeMs> {
        self.entries.front().map(|e| e.submit_time)
    }
}
