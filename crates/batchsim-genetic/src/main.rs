use std::process;
use std::time::Instant;

use clap::Parser;

use batchsim_core::cluster::Cluster;
use batchsim_core::scenario::Scenario;

use batchsim_genetic::driver::GeneticDriver;
use batchsim_genetic::evaluator::SimulationBlueprint;
use batchsim_genetic::population::{load_population, PopulationError};

#[derive(Parser, Debug)]
#[clap(about, long_about = None)]
struct Args {
    /// Optional population file to load. If provided, the initial population
    /// is replaced with the given population.
    #[clap(short, long)]
    population: Option<String>,

    /// Scenario file with job submissions
    #[clap(short, long, default_value = "data/scenario.txt")]
    scenario: String,

    /// Cluster topology file
    #[clap(long, default_value = "data/hosts.txt")]
    hosts: String,

    /// RNG seed
    #[clap(long, default_value = "123")]
    seed: u64,

    /// Directory for checkpoints and result files
    #[clap(short, long, default_value = ".")]
    output_dir: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let scenario = Scenario::from_file(&args.scenario)?;
    let cluster = Cluster::from_topology_file(&args.hosts)?;
    let blueprint = SimulationBlueprint::new(scenario, cluster);

    let time_before_initialization = Instant::now();

    let mut driver = match &args.population {
        Some(path) => {
            let population = load_and_check(path)?;
            GeneticDriver::from_population(blueprint, population, args.seed)
                .unwrap_or_else(|_| incompatible_population())
        }
        None => GeneticDriver::new(blueprint, args.seed),
    }
    .with_save_dir(&args.output_dir);

    driver.initialize();
    let time_after_initialization = Instant::now();

    driver.run();
    let time_finished = Instant::now();

    driver.finish()?;
    driver.append_summary_lines(&[
        format!(
            "- Time elapsed for initialisation: {} ms",
            time_after_initialization.duration_since(time_before_initialization).as_millis()
        ),
        format!(
            "- Time elapsed for genetic algorithm: {} min",
            time_finished.duration_since(time_after_initialization).as_secs() / 60
        ),
    ])?;
    Ok(())
}

fn load_and_check(path: &str) -> Result<Vec<batchsim_genetic::Chromosome>, Box<dyn std::error::Error>> {
    match load_population(path) {
        Ok(population) => Ok(population),
        Err(PopulationError::Incompatible { .. }) => incompatible_population(),
        Err(e) => Err(e.into()),
    }
}

/// A size or gene-count mismatch is a normal way to end the program.
fn incompatible_population() -> ! {
    println!("Incompatible population.");
    process::exit(0);
}
