//! Tabular report files written under the log directory.
//!
//! Output I/O failures are reported to the caller, which logs them and
//! carries on; a broken report file never aborts a simulation.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::SimulationConfig;
use crate::job::Job;
use crate::TimeMs;

pub const LOG_OUTPUT_FILE_NAME: &str = "log_output.txt";
pub const JOBMART_FILE_NAME: &str = "jobmart_raw_replica.txt";
pub const PERFORMANCE_FILE_NAME: &str = "performance.txt";
pub const PENDING_FILE_NAME: &str = "pending.txt";
pub const JOB_SUBMIT_FILE_NAME: &str = "job_submit.txt";

/// One row of the jobmart replica, mirroring the enterprise workload-
/// management schema for completed jobs.
#[derive(Serialize)]
struct JobmartRecord<'a> {
    start_time: TimeMs,
    finish_time: TimeMs,
    queue_name: &'a str,
    exec_hostname: &'a str,
    num_slots: u32,
    job_id: u64,
    job_pend_time_ms: u64,
    job_run_time_ms: u64,
}

#[derive(Serialize)]
struct SeriesRecord {
    time: TimeMs,
    value: usize,
}

pub struct SimulationOutput {
    directory: PathBuf,
    jobmart: Option<csv::Writer<File>>,
    slots_output: bool,
    job_submit_output: bool,
}

impl SimulationOutput {
    /// Creates the log directory and the per-job report writer according to
    /// the config switches.
    pub fn new(config: &SimulationConfig) -> Result<Self, std::io::Error> {
        let directory = PathBuf::from(&config.log_directory);
        let any_file = config.jobmart_file_output
            || config.slots_file_output
            || config.job_submit_file_output
            || config.log_file_output;
        if any_file {
            fs::create_dir_all(&directory)?;
        }
        let jobmart = if config.jobmart_file_output {
            let writer = csv::WriterBuilder::new()
                .delimiter(b'\t')
                .from_path(directory.join(JOBMART_FILE_NAME))?;
            Some(writer)
        } else {
            None
        };
        Ok(Self {
            directory,
            jobmart,
            slots_output: config.slots_file_output,
            job_submit_output: config.job_submit_file_output,
        })
    }

    /// Output with every sink turned off, used when the log directory cannot
    /// be created: the simulation still runs to completion.
    pub fn disabled(config: &SimulationConfig) -> Self {
        Self {
            directory: PathBuf::from(&config.log_directory),
            jobmart: None,
            slots_output: false,
            job_submit_output: false,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Appends one completed-job row. The job must carry start/finish times.
    pub fn write_jobmart(&mut self, job: &Job, queue_name: &str) -> Result<(), std::io::Error> {
        let Some(writer) = self.jobmart.as_mut() else {
            return Ok(());
        };
        let start = job.start_time.unwrap_or(0);
        let finish = job.finish_time.unwrap_or(start);
        writer.serialize(JobmartRecord {
            start_time: start,
            finish_time: finish,
            queue_name,
            exec_hostname: job.run_host_name.as_deref().unwrap_or(""),
            num_slots: job.slot_required,
            job_id: job.id,
            job_pend_time_ms: job.total_pending_duration,
            job_run_time_ms: finish - start,
        })?;
        Ok(())
    }

    /// Writes the collected time series and flushes the jobmart file.
    pub fn save_records(
        &mut self,
        using_slot_record: &[(TimeMs, usize)],
        pending_record: &[(TimeMs, usize)],
        job_submit_record: &[(TimeMs, usize)],
    ) -> Result<(), std::io::Error> {
        if let Some(writer) = self.jobmart.as_mut() {
            writer.flush()?;
        }
        if self.slots_output {
            write_series(&self.directory.join(PERFORMANCE_FILE_NAME), using_slot_record)?;
            write_series(&self.directory.join(PENDING_FILE_NAME), pending_record)?;
        }
        if self.job_submit_output {
            write_series(&self.directory.join(JOB_SUBMIT_FILE_NAME), job_submit_record)?;
        }
        Ok(())
    }
}

fn write_series(path: &Path, series: &[(TimeMs, usize)]) -> Result<(), std::io::Error> {
    let mut wtr = csv::Writer::from_path(path)?;
    for &(time, value) in series {
        wtr.serialize(SeriesRecord { time, value })?;
    }
    wtr.flush()?;
    Ok(())
}
