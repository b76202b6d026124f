//! Simulation error kinds.
//!
//! Structural errors (malformed input, unknown names) fail the whole run and
//! surface to the caller. Recoverable dispatch conditions (a host losing
//! eligibility, an unsatisfiable job) are absorbed and counted by the engine
//! instead of being raised.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimulationError {
    /// Malformed scenario or topology input; fatal to the current run.
    #[error("parse error at line {line}: {message}")]
    ScenarioParse { line: usize, message: String },

    /// A submission references a queue that is not registered.
    #[error("unknown queue: {0}")]
    UnknownQueue(String),

    /// A lookup references a host that is not registered.
    #[error("unknown host: {0}")]
    UnknownHost(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
