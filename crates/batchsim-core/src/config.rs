//! Simulation configuration.

use serde::{Deserialize, Serialize};

use crate::error::SimulationError;
use crate::DurationMs;

/// Auxiliary structure to parse SimulationConfig from file
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone, Default)]
pub struct SimulationConfigRaw {
    /// route every submission to the single default queue
    pub use_only_default_queue: Option<bool>,
    /// judge host eligibility against total instead of free capacity
    pub use_static_host_table_for_jobs: Option<bool>,
    /// mirror the simulation log to stdout
    pub console_output: Option<bool>,
    /// collect the simulation log and save it under the log directory
    pub log_file_output: Option<bool>,
    /// write one tabular row per completed job
    pub jobmart_file_output: Option<bool>,
    /// write slots-in-use and pending-count time series
    pub slots_file_output: Option<bool>,
    /// write the cumulative submission time series
    pub job_submit_file_output: Option<bool>,
    /// trace every event pop
    pub debug_events: Option<bool>,
    /// period between dispatch cycles, ms
    pub dispatch_frequency: Option<DurationMs>,
    /// period between status log lines, ms
    pub logging_frequency: Option<DurationMs>,
    /// period between new-job accounting ticks, ms
    pub counting_frequency: Option<DurationMs>,
    /// scalar applied to every expected run time after computation
    pub runtime_multiplier: Option<f64>,
    /// directory for output files
    pub log_directory: Option<String>,
}

/// All former compile-time switches of the simulator, carried as a plain
/// record so tests and the GA can vary them per engine instance.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct SimulationConfig {
    pub use_only_default_queue: bool,
    pub use_static_host_table_for_jobs: bool,
    pub console_output: bool,
    pub log_file_output: bool,
    pub jobmart_file_output: bool,
    pub slots_file_output: bool,
    pub job_submit_file_output: bool,
    pub debug_events: bool,
    pub dispatch_frequency: DurationMs,
    pub logging_frequency: DurationMs,
    pub counting_frequency: DurationMs,
    pub runtime_multiplier: f64,
    pub log_directory: String,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::from_raw(SimulationConfigRaw::default())
    }
}

impl SimulationConfig {
    pub fn from_raw(raw: SimulationConfigRaw) -> Self {
        Self {
            use_only_default_queue: raw.use_only_default_queue.unwrap_or(true),
            use_static_host_table_for_jobs: raw.use_static_host_table_for_jobs.unwrap_or(true),
            console_output: raw.console_output.unwrap_or(false),
            log_file_output: raw.log_file_output.unwrap_or(true),
            jobmart_file_output: raw.jobmart_file_output.unwrap_or(true),
            slots_file_output: raw.slots_file_output.unwrap_or(true),
            job_submit_file_output: raw.job_submit_file_output.unwrap_or(true),
            debug_events: raw.debug_events.unwrap_or(false),
            dispatch_frequency: raw.dispatch_frequency.unwrap_or(1000),
            logging_frequency: raw.logging_frequency.unwrap_or(10_000),
            counting_frequency: raw.counting_frequency.unwrap_or(10_000),
            runtime_multiplier: raw.runtime_multiplier.unwrap_or(1.0),
            log_directory: raw.log_directory.unwrap_or_else(|| "logs".to_owned()),
        }
    }

    /// Reads parameter values from a .yaml file, falling back to defaults for
    /// absent parameters.
    pub fn from_file(file_name: &str) -> Result<Self, SimulationError> {
        let content = std::fs::read_to_string(file_name)?;
        let raw: SimulationConfigRaw =
            serde_yaml::from_str(&content).map_err(|e| SimulationError::ScenarioParse {
                line: e.location().map(|l| l.line()).unwrap_or(0),
                message: e.to_string(),
            })?;
        Ok(Self::from_raw(raw))
    }

    /// Configuration with every file sink disabled; used by GA fitness runs
    /// and tests that do not care about report files.
    pub fn quiet() -> Self {
        Self {
            console_output: false,
            log_file_output: false,
            jobmart_file_output: false,
            slots_file_output: false,
            job_submit_file_output: false,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_settings() {
        let config = SimulationConfig::default();
        assert!(config.use_only_default_queue);
        assert!(config.use_static_host_table_for_jobs);
        assert_eq!(config.dispatch_frequency, 1000);
        assert_eq!(config.logging_frequency, 10_000);
        assert_eq!(config.counting_frequency, 10_000);
        assert_eq!(config.runtime_multiplier, 1.0);
        assert_eq!(config.log_directory, "logs");
    }

    #[test]
    fn yaml_overrides_are_applied() {
        let raw: SimulationConfigRaw =
            serde_yaml::from_str("dispatch_frequency: 500\nconsole_output: true\n").unwrap();
        let config = SimulationConfig::from_raw(raw);
        assert_eq!(config.dispatch_frequency, 500);
        assert!(config.console_output);
        assert!(config.log_file_output);
    }
}
