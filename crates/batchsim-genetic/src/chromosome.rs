//! Chromosome: encoded scheduling-policy parameters.

use std::fmt::{Display, Formatter};
use std::path::Path;

use rand::Rng;

use batchsim_core::queue_algorithms::genetic::NUM_POLICY_GENES;

use crate::evaluator::{evaluate_genes, SimulationBlueprint};
use crate::population::{self, PopulationError};
use crate::MUTATION_RATE;

/// Number of genes every chromosome carries, fixed by the policy it encodes.
pub const GENE_COUNT: usize = NUM_POLICY_GENES;

/// Which operator produced an individual.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ChromosomeKind {
    Initial,
    Crossover,
    Mutation,
}

impl ChromosomeKind {
    pub fn as_u8(&self) -> u8 {
        match self {
            ChromosomeKind::Initial => 0,
            ChromosomeKind::Crossover => 1,
            ChromosomeKind::Mutation => 2,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(ChromosomeKind::Initial),
            1 => Some(ChromosomeKind::Crossover),
            2 => Some(ChromosomeKind::Mutation),
            _ => None,
        }
    }
}

impl Display for ChromosomeKind {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            ChromosomeKind::Initial => write!(f, "initial"),
            ChromosomeKind::Crossover => write!(f, "crossover"),
            ChromosomeKind::Mutation => write!(f, "mutation"),
        }
    }
}

/// A fixed-length gene vector plus age, producing operator and cached
/// fitness. Larger fitness is better.
#[derive(Clone, Debug, PartialEq)]
pub struct Chromosome {
    genes: Vec<f64>,
    age: u32,
    kind: ChromosomeKind,
    fitness: Option<f64>,
}

impl Chromosome {
    /// Uniformly random genes in `[0, 1)`.
    pub fn random<R: Rng>(rng: &mut R) -> Self {
        Self {
            genes: (0..GENE_COUNT).map(|_| rng.gen_range(0.0..1.0)).collect(),
            age: 0,
            kind: ChromosomeKind::Initial,
            fitness: None,
        }
    }

    pub fn from_parts(genes: Vec<f64>, age: u32, kind: ChromosomeKind, fitness: Option<f64>) -> Self {
        assert_eq!(genes.len(), GENE_COUNT, "gene vector has wrong length");
        Self {
            genes,
            age,
            kind,
            fitness,
        }
    }

    pub fn genes(&self) -> &[f64] {
        &self.genes
    }

    pub fn age(&self) -> u32 {
        self.age
    }

    pub fn kind(&self) -> ChromosomeKind {
        self.kind
    }

    pub fn cached_fitness(&self) -> Option<f64> {
        self.fitness
    }

    pub fn set_fitness(&mut self, fitness: f64) {
        self.fitness = Some(fitness);
    }

    pub fn increase_age(&mut self) {
        self.age += 1;
    }

    /// Returns the cached fitness, running a fresh simulation to fill the
    /// cache if needed.
    pub fn fitness(&mut self, blueprint: &SimulationBlueprint) -> f64 {
        if let Some(fitness) = self.fitness {
            return fitness;
        }
        let fitness = evaluate_genes(&self.genes, blueprint);
        self.fitness = Some(fitness);
        fitness
    }

    /// Uniform crossover: every gene comes from one of the two parents with
    /// equal probability.
    pub fn crossover<R: Rng>(a: &Self, b: &Self, rng: &mut R) -> Self {
        let genes = a
            .genes
            .iter()
            .zip(&b.genes)
            .map(|(&x, &y)| if rng.gen_bool(0.5) { x } else { y })
            .collect();
        Self {
            genes,
            age: 0,
            kind: ChromosomeKind::Crossover,
            fitness: None,
        }
    }

    /// Copy with every gene independently resampled with probability
    /// [`MUTATION_RATE`].
    pub fn mutate<R: Rng>(&self, rng: &mut R) -> Self {
        let genes = self
            .genes
            .iter()
            .map(|&g| {
                if rng.gen_bool(MUTATION_RATE) {
                    rng.gen_range(0.0..1.0)
                } else {
                    g
                }
            })
            .collect();
        Self {
            genes,
            age: 0,
            kind: ChromosomeKind::Mutation,
            fitness: None,
        }
    }

    /// Writes this chromosome as one little-endian binary record.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), std::io::Error> {
        population::save_chromosome(self, path)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, PopulationError> {
        population::load_chromosome(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg64;

    #[test]
    fn crossover_mixes_parent_genes() {
        let mut rng = Pcg64::seed_from_u64(7);
        let a = Chromosome::from_parts(vec![0.0; GENE_COUNT], 3, ChromosomeKind::Initial, Some(1.0));
        let b = Chromosome::from_parts(vec![1.0; GENE_COUNT], 5, ChromosomeKind::Initial, Some(2.0));
        let child = Chromosome::crossover(&a, &b, &mut rng);
        assert_eq!(child.kind(), ChromosomeKind::Crossover);
        assert_eq!(child.age(), 0);
        assert_eq!(child.cached_fitness(), None);
        assert!(child.genes().iter().all(|&g| g == 0.0 || g == 1.0));
    }

    #[test]
    fn crossover_is_reproducible_for_a_seed() {
        let a = Chromosome::random(&mut Pcg64::seed_from_u64(1));
        let b = Chromosome::random(&mut Pcg64::seed_from_u64(2));
        let c1 = Chromosome::crossover(&a, &b, &mut Pcg64::seed_from_u64(42));
        let c2 = Chromosome::crossover(&a, &b, &mut Pcg64::seed_from_u64(42));
        assert_eq!(c1, c2);
    }

    #[test]
    fn mutation_keeps_genes_in_range() {
        let mut rng = Pcg64::seed_from_u64(9);
        let base = Chromosome::random(&mut rng);
        let mutant = base.mutate(&mut rng);
        assert_eq!(mutant.kind(), ChromosomeKind::Mutation);
        assert!(mutant.genes().iter().all(|&g| (0.0..1.0).contains(&g)));
    }
}
