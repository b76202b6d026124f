//! GA driver: population, offspring, mutants and selection across
//! generations.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use serde::Serialize;
use threadpool::ThreadPool;

use crate::chromosome::Chromosome;
use crate::evaluator::{calculate_fitness_parallel, SimulationBlueprint};
use crate::population::{save_population, PopulationError};
use crate::{CONSOLE_OUTPUT, MUTATION_RATE, NUM_ITERATIONS, NUM_OFFSPRING, NUM_POPULATION_TO_KEEP, SAVE_INTERVAL};

pub const BEST_CHROMOSOME_FILE_NAME: &str = "best_chromosome.bin";
pub const POPULATION_FILE_NAME: &str = "last_population.bin";
pub const RECORDS_FILE_NAME: &str = "records.csv";
pub const SUMMARY_FILE_NAME: &str = "summary.txt";

/// Best fitness seen at the end of one generation.
#[derive(Clone, Debug, Serialize)]
pub struct EpochRecord {
    pub iteration: usize,
    pub best_fitness: f64,
}

/// Tournament selection with k = 2: sample two individuals, keep the fitter.
/// Every individual in the pool must already be evaluated.
pub fn tournament_select<'a, R: Rng>(pool: &'a [Chromosome], rng: &mut R) -> &'a Chromosome {
    let a = &pool[rng.gen_range(0..pool.len())];
    let b = &pool[rng.gen_range(0..pool.len())];
    let fa = a.cached_fitness().unwrap_or(f64::NEG_INFINITY);
    let fb = b.cached_fitness().unwrap_or(f64::NEG_INFINITY);
    if fa >= fb {
        a
    } else {
        b
    }
}

/// Produces [`NUM_OFFSPRING`] children, pairing parents by tournament
/// selection.
pub fn generate_offspring<R: Rng>(population: &[Chromosome], rng: &mut R) -> Vec<Chromosome> {
    (0..NUM_OFFSPRING)
        .map(|_| {
            let a = tournament_select(population, rng);
            let b = tournament_select(population, rng);
            Chromosome::crossover(a, b, rng)
        })
        .collect()
}

/// Pushes a mutated copy of each pool member into `mutants`, independently
/// with probability [`MUTATION_RATE`].
pub fn get_mutants<R: Rng>(pool: &[Chromosome], mutants: &mut Vec<Chromosome>, rng: &mut R) {
    for chromosome in pool {
        if rng.gen_bool(MUTATION_RATE) {
            mutants.push(chromosome.mutate(rng));
        }
    }
}

/// Merges the three pools and keeps the top individuals by fitness, as many
/// as the population held. Ties go to the lower age, then to insertion order
/// (population, then offspring, then mutants).
pub fn select_survivors(
    population: &[Chromosome],
    offspring: &[Chromosome],
    mutants: &[Chromosome],
) -> Vec<Chromosome> {
    let keep = population.len();
    let mut merged: Vec<Chromosome> = Vec::with_capacity(keep + offspring.len() + mutants.len());
    merged.extend_from_slice(population);
    merged.extend_from_slice(offspring);
    merged.extend_from_slice(mutants);
    merged.sort_by(|a, b| {
        let fa = a.cached_fitness().unwrap_or(f64::NEG_INFINITY);
        let fb = b.cached_fitness().unwrap_or(f64::NEG_INFINITY);
        fb.total_cmp(&fa).then_with(|| a.age().cmp(&b.age()))
    });
    merged.truncate(keep);
    merged
}

pub struct GeneticDriver {
    blueprint: Arc<SimulationBlueprint>,
    population: Vec<Chromosome>,
    offspring: Vec<Chromosome>,
    mutants: Vec<Chromosome>,
    pool: ThreadPool,
    rng: Pcg64,
    epoch_record: Vec<EpochRecord>,
    save_dir: Option<PathBuf>,
    iterations_run: usize,
}

impl GeneticDriver {
    /// Driver over a randomly generated initial population.
    pub fn new(blueprint: SimulationBlueprint, seed: u64) -> Self {
        let mut rng = Pcg64::seed_from_u64(seed);
        let population = (0..NUM_POPULATION_TO_KEEP).map(|_| Chromosome::random(&mut rng)).collect();
        Self::from_parts(blueprint, population, rng)
    }

    /// Driver over a previously persisted population.
    ///
    /// Fails with [`PopulationError::Incompatible`] when the loaded
    /// population does not hold exactly [`NUM_POPULATION_TO_KEEP`]
    /// chromosomes.
    pub fn from_population(
        blueprint: SimulationBlueprint,
        population: Vec<Chromosome>,
        seed: u64,
    ) -> Result<Self, PopulationError> {
        if population.len() != NUM_POPULATION_TO_KEEP {
            return Err(PopulationError::Incompatible {
                expected: NUM_POPULATION_TO_KEEP,
                found: population.len(),
            });
        }
        Ok(Self::from_parts(blueprint, population, Pcg64::seed_from_u64(seed)))
    }

    fn from_parts(blueprint: SimulationBlueprint, population: Vec<Chromosome>, rng: Pcg64) -> Self {
        Self {
            blueprint: Arc::new(blueprint),
            population,
            offspring: Vec::new(),
            mutants: Vec::new(),
            pool: ThreadPool::new(num_cpus::get()),
            rng,
            epoch_record: Vec::new(),
            save_dir: None,
            iterations_run: 0,
        }
    }

    /// Persist checkpoints and final artifacts under the given directory.
    pub fn with_save_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.save_dir = Some(dir.as_ref().to_owned());
        self
    }

    pub fn population(&self) -> &[Chromosome] {
        &self.population
    }

    pub fn epoch_record(&self) -> &[EpochRecord] {
        &self.epoch_record
    }

    pub fn best(&self) -> &Chromosome {
        self.population
            .iter()
            .max_by(|a, b| {
                a.cached_fitness()
                    .unwrap_or(f64::NEG_INFINITY)
                    .total_cmp(&b.cached_fitness().unwrap_or(f64::NEG_INFINITY))
            })
            .expect("population is never empty")
    }

    /// Evaluates the initial population, produces and evaluates the first
    /// offspring batch and folds both into the starting population.
    pub fn initialize(&mut self) {
        calculate_fitness_parallel(&mut self.population, &self.blueprint, &self.pool);
        self.offspring = generate_offspring(&self.population, &mut self.rng);
        calculate_fitness_parallel(&mut self.offspring, &self.blueprint, &self.pool);
        self.population = select_survivors(&self.population, &self.offspring, &[]);
        // initialization can be the expensive part, checkpoint right away
        self.checkpoint_population();
    }

    /// Runs the full configured number of generations.
    pub fn run(&mut self) {
        self.run_for(NUM_ITERATIONS);
    }

    pub fn run_for(&mut self, iterations: usize) {
        for _ in 0..iterations {
            let iter = self.iterations_run;
            if CONSOLE_OUTPUT {
                println!("Epoch {}", iter + 1);
            }

            self.offspring = generate_offspring(&self.population, &mut self.rng);
            calculate_fitness_parallel(&mut self.offspring, &self.blueprint, &self.pool);

            self.mutants.clear();
            get_mutants(&self.population, &mut self.mutants, &mut self.rng);
            get_mutants(&self.offspring, &mut self.mutants, &mut self.rng);
            calculate_fitness_parallel(&mut self.mutants, &self.blueprint, &self.pool);

            self.population = select_survivors(&self.population, &self.offspring, &self.mutants);
            self.mutants.clear();

            let best = self.best();
            let best_fitness = best.cached_fitness().unwrap_or(f64::NEG_INFINITY);
            if CONSOLE_OUTPUT {
                println!(
                    "Best fitness: {:.3} Age: {} Type: {}",
                    best_fitness,
                    best.age(),
                    best.kind()
                );
            }
            self.epoch_record.push(EpochRecord {
                iteration: iter,
                best_fitness,
            });

            for chromosome in &mut self.population {
                chromosome.increase_age();
            }

            if iter % SAVE_INTERVAL == 0 {
                self.checkpoint_population();
            }
            self.iterations_run += 1;
        }
    }

    /// Persists the best chromosome, the population, the epoch record and a
    /// run summary.
    pub fn finish(&self) -> Result<(), std::io::Error> {
        let Some(dir) = self.save_dir.as_deref() else {
            return Ok(());
        };
        self.best().save(dir.join(BEST_CHROMOSOME_FILE_NAME))?;
        save_population(&self.population, dir.join(POPULATION_FILE_NAME))?;

        let mut records = csv::Writer::from_path(dir.join(RECORDS_FILE_NAME))?;
        for record in &self.epoch_record {
            records.serialize(record)?;
        }
        records.flush()?;

        let mut summary = File::create(dir.join(SUMMARY_FILE_NAME))?;
        writeln!(summary, "- Iterations: {}", self.iterations_run)?;
        writeln!(
            summary,
            "- Best fitness: {:.3}",
            self.best().cached_fitness().unwrap_or(f64::NEG_INFINITY)
        )?;
        let (initial, crossover, mutation) = self.population_composition();
        writeln!(
            summary,
            "- Population composition: {} initial, {} crossover, {} mutation",
            initial, crossover, mutation
        )?;
        Ok(())
    }

    /// Appends free-form lines to the run summary, e.g. timing notes.
    pub fn append_summary_lines(&self, lines: &[String]) -> Result<(), std::io::Error> {
        let Some(dir) = self.save_dir.as_deref() else {
            return Ok(());
        };
        let mut summary = OpenOptions::new()
            .append(true)
            .create(true)
            .open(dir.join(SUMMARY_FILE_NAME))?;
        for line in lines {
            writeln!(summary, "{}", line)?;
        }
        Ok(())
    }

    fn population_composition(&self) -> (usize, usize, usize) {
        use crate::chromosome::ChromosomeKind;
        let count = |kind: ChromosomeKind| self.population.iter().filter(|c| c.kind() == kind).count();
        (
            count(ChromosomeKind::Initial),
            count(ChromosomeKind::Crossover),
            count(ChromosomeKind::Mutation),
        )
    }

    fn checkpoint_population(&self) {
        if let Some(dir) = self.save_dir.as_deref() {
            if let Err(e) = save_population(&self.population, dir.join(POPULATION_FILE_NAME)) {
                log::error!("cannot checkpoint population: {}", e);
            }
        }
    }
}
