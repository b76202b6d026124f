//! Built-in queue scheduling policies.

pub mod genetic;
pub mod olb;
pub mod qsimple;
