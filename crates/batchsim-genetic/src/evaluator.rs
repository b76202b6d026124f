//! Parallel fitness evaluation.
//!
//! Distinct chromosomes are independent, so their simulations run on a
//! worker pool; each task materializes its own mutable cluster and scenario
//! cursor from the shared immutable blueprint.

use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use std::sync::mpsc::channel;
use std::sync::Arc;

use threadpool::ThreadPool;

use batchsim_core::cluster::Cluster;
use batchsim_core::config::SimulationConfig;
use batchsim_core::queue_algorithms::genetic::{GeneticPolicy, PolicyGenes};
use batchsim_core::scenario::Scenario;
use batchsim_core::simulation::ClusterSimulation;

use crate::chromosome::Chromosome;
use crate::FAILED_JOB_PENALTY;

/// Immutable inputs every fitness run starts from.
pub struct SimulationBlueprint {
    pub scenario: Scenario,
    pub cluster: Cluster,
    pub config: SimulationConfig,
}

impl SimulationBlueprint {
    /// Blueprint with file outputs disabled; fitness runs should not fight
    /// over report files.
    pub fn new(scenario: Scenario, cluster: Cluster) -> Self {
        Self {
            scenario,
            cluster,
            config: SimulationConfig::quiet(),
        }
    }
}

/// Runs one simulation with the genes decoded into the queue policy and
/// folds the summary into a scalar where larger is better.
pub fn evaluate_genes(genes: &[f64], blueprint: &SimulationBlueprint) -> f64 {
    let params = PolicyGenes::from_genes(genes).expect("chromosome gene count must match the policy");
    let algorithm = Rc::new(GeneticPolicy::new(params));
    let mut sim = ClusterSimulation::with_default_queue(
        blueprint.scenario.clone(),
        blueprint.cluster.clone(),
        algorithm,
        blueprint.config.clone(),
    )
    .expect("blueprint must describe a valid simulation");
    let summary = sim.run();
    -(summary.total_pending_duration as f64 + FAILED_JOB_PENALTY * summary.num_failed_jobs as f64)
}

/// Fills the fitness cache of every chromosome that does not have one yet.
///
/// Evaluation is at-most-once per chromosome: cached individuals are not
/// resubmitted. A worker that panics poisons its chromosome with `-inf`
/// instead of crashing the generation.
pub fn calculate_fitness_parallel(
    chromosomes: &mut [Chromosome],
    blueprint: &Arc<SimulationBlueprint>,
    pool: &ThreadPool,
) {
    let (tx, rx) = channel();
    let mut submitted = 0;
    for (index, chromosome) in chromosomes.iter().enumerate() {
        if chromosome.cached_fitness().is_some() {
            continue;
        }
        let genes = chromosome.genes().to_vec();
        let blueprint = Arc::clone(blueprint);
        let tx = tx.clone();
        submitted += 1;
        pool.execute(move || {
            let fitness = panic::catch_unwind(AssertUnwindSafe(|| evaluate_genes(&genes, &blueprint)))
                .unwrap_or(f64::NEG_INFINITY);
            tx.send((index, fitness)).expect("evaluation collector hung up");
        });
    }
    for (index, fitness) in rx.iter().take(submitted) {
        chromosomes[index].set_fitness(fitness);
    }
}
