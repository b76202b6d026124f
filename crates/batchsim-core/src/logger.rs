//! Logging facilities to record events during simulation.

use std::fs::File;
use std::path::Path;

use atty::Stream;
use colored::{Color, ColoredString, Colorize};
use log::Level;
use serde::Serialize;

use crate::TimeMs;

/// Applies the color to the string if stderr (log) goes to console.
pub fn get_colored(s: &str, color: Color) -> ColoredString {
    if atty::is(Stream::Stderr) {
        s.color(color)
    } else {
        s.normal()
    }
}

pub trait Logger {
    fn log(&mut self, level: Level, time: TimeMs, message: String);

    fn save_log(&self, _path: &Path) -> Result<(), std::io::Error> {
        Ok(())
    }
}

/// Forwards records to the `log` crate with the simulation clock prepended.
#[derive(Default)]
pub struct StdoutLogger {}

impl StdoutLogger {
    pub fn new() -> Self {
        Self {}
    }
}

impl Logger for StdoutLogger {
    fn log(&mut self, level: Level, time: TimeMs, message: String) {
        let colored_level = match level {
            Level::Error => get_colored("ERROR", Color::Red),
            Level::Warn => get_colored("WARN", Color::Yellow),
            Level::Info => get_colored("INFO", Color::Green),
            Level::Debug => get_colored("DEBUG", Color::Blue),
            Level::Trace => get_colored("TRACE", Color::Cyan),
        };
        log::log!(target: "simulation", level, "[{} ms {}] {}", time, colored_level, message);
    }
}

#[derive(Serialize)]
struct LogEntry {
    time: TimeMs,
    level: String,
    message: String,
}

/// Collects records in memory for saving to a log file after the run.
pub struct FileLogger {
    log: Vec<LogEntry>,
    level: Level,
}

impl Default for FileLogger {
    fn default() -> Self {
        Self {
            log: Vec::new(),
            level: Level::Info,
        }
    }
}

impl FileLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(level: Level) -> Self {
        Self { log: Vec::new(), level }
    }
}

impl Logger for FileLogger {
    fn log(&mut self, level: Level, time: TimeMs, message: String) {
        if self.level < level {
            return;
        }
        self.log.push(LogEntry {
            time,
            level: level.to_string(),
            message,
        });
    }

    fn save_log(&self, path: &Path) -> Result<(), std::io::Error> {
        let file = File::create(path)?;
        let mut wtr = csv::Writer::from_writer(file);
        for entry in &self.log {
            wtr.serialize(entry)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_logger_filters_by_level() {
        let mut logger = FileLogger::with_level(Level::Info);
        logger.log(Level::Info, 0, "kept".to_owned());
        logger.log(Level::Debug, 0, "dropped".to_owned());
        assert_eq!(logger.log.len(), 1);
    }
}
