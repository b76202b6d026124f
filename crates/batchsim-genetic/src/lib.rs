//! Static genetic algorithm searching for cluster queue-scheduling
//! parameters.
//!
//! A chromosome encodes the weights of the gene-parameterized scheduling
//! policy; its fitness is obtained by running a full cluster simulation over
//! a fixed workload scenario. Fitness evaluation is data-parallel across
//! chromosomes, each worker owning its own simulation engine.

pub mod chromosome;
pub mod driver;
pub mod evaluator;
pub mod population;

pub use chromosome::{Chromosome, ChromosomeKind, GENE_COUNT};
pub use driver::{EpochRecord, GeneticDriver};
pub use evaluator::{calculate_fitness_parallel, evaluate_genes, SimulationBlueprint};
pub use population::{load_population, save_population, PopulationError};

/// Survivor pool size kept across generations.
pub const NUM_POPULATION_TO_KEEP: usize = 10;

/// Offspring produced per generation.
pub const NUM_OFFSPRING: usize = 10;

/// Generations executed by a full driver run.
pub const NUM_ITERATIONS: usize = 100;

/// Checkpoint the population every this many generations.
pub const SAVE_INTERVAL: usize = 10;

/// Per-gene mutation probability, also the probability of spawning a mutant
/// from a surviving individual.
pub const MUTATION_RATE: f64 = 0.1;

/// Print per-epoch progress to stdout.
pub const CONSOLE_OUTPUT: bool = true;

/// Fitness penalty per failed job, dominating any pending-time difference.
pub const FAILED_JOB_PENALTY: f64 = 1.0e7;
