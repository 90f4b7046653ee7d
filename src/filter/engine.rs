use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::num::NonZeroUsize;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::core::external::FrequencyOracle;
use crate::filter::predicate::Predicate;
use crate::store::{FilterCounts, GenomeStore, PopulationStore};

/// Configuration for the parallel filter engine
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Upper bound on worker threads; `None` uses the available parallelism
    pub max_threads: Option<usize>,
}

impl EngineConfig {
    #[must_use]
    pub fn with_max_threads(max_threads: usize) -> Self {
        Self {
            max_threads: Some(max_threads),
        }
    }
}

/// Fans work out across the genomes of a population.
///
/// One task per genome, so at most `min(genome_count, threads)` run at once.
/// An engine with a thread bound owns a pool built once and reused by every
/// operation; without one it runs on the global rayon pool. Work inside a
/// genome is sequential. A panicking genome task is logged and skipped; its
/// siblings run to completion.
#[derive(Debug, Clone, Default)]
pub struct ParallelFilterEngine {
    config: EngineConfig,
    pool: Option<Arc<ThreadPool>>,
}

impl ParallelFilterEngine {
    /// Create an engine on the global pool, bounded by the available parallelism
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(config: EngineConfig) -> Self {
        let pool = config.max_threads.and_then(|threads| {
            let threads = threads.max(1);
            match ThreadPoolBuilder::new().num_threads(threads).build() {
                Ok(pool) => Some(Arc::new(pool)),
                Err(e) => {
                    warn!("Failed to build a pool of {} workers ({}), using the global pool", threads, e);
                    None
                }
            }
        });
        Self { config, pool }
    }

    /// Threads available to the engine
    #[must_use]
    pub fn thread_count(&self) -> usize {
        match &self.pool {
            Some(pool) => pool.current_num_threads(),
            None => self.config.max_threads.unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(NonZeroUsize::get)
                    .unwrap_or(1)
            }),
        }
    }

    /// Genome tasks running at once for a population of `genome_count` genomes
    #[must_use]
    pub fn worker_count(&self, genome_count: usize) -> usize {
        genome_count.min(self.thread_count()).max(1)
    }

    fn run<T, F>(&self, job: F) -> T
    where
        F: FnOnce() -> T + Send,
        T: Send,
    {
        match &self.pool {
            Some(pool) => pool.install(job),
            None => job(),
        }
    }

    /// Apply `f` to every genome in parallel, collecting the results of the
    /// tasks that complete
    pub fn map_genomes<T, F>(&self, population: &PopulationStore, f: F) -> Vec<T>
    where
        F: Fn(&GenomeStore) -> T + Send + Sync,
        T: Send,
    {
        population.with_genomes(|genomes| {
            self.run(|| {
                genomes
                    .par_iter()
                    .filter_map(|(id, genome)| {
                        catch_unwind(AssertUnwindSafe(|| f(genome)))
                            .map_err(|_| error!("Task for genome {} panicked", id))
                            .ok()
                    })
                    .collect()
            })
        })
    }

    /// Filtered copy of every genome, reassembled into a new population.
    ///
    /// Each task works on its own clone of the predicate. Genomes left without
    /// contigs are not carried over.
    #[must_use]
    pub fn filter_copy(&self, population: &PopulationStore, predicate: &Predicate) -> PopulationStore {
        let filtered = self.map_genomes(population, |genome| {
            let worker_predicate = predicate.clone();
            genome.filter_copy(&worker_predicate)
        });

        let result = PopulationStore::new(population.population_id(), population.data_source());
        for genome in filtered {
            if genome.contig_count() == 0 {
                debug!("Genome {} is empty after filtering", genome.genome_id());
                continue;
            }
            if let Err(e) = result.add_genome(genome) {
                error!("Failed to reassemble filtered population: {}", e);
            }
        }
        result
    }

    /// Filter every genome in place, then prune genomes left without contigs.
    ///
    /// Requires exclusive access to the population for its whole duration.
    pub fn filter_in_place(
        &self,
        population: &mut PopulationStore,
        predicate: &Predicate,
    ) -> FilterCounts {
        let genomes = population.genomes_mut();
        let counts = self.run(|| {
            genomes
                .par_iter_mut()
                .map(|(id, genome)| {
                    let worker_predicate = predicate.clone();
                    catch_unwind(AssertUnwindSafe(|| genome.filter_in_place(&worker_predicate)))
                        .unwrap_or_else(|_| {
                            error!("Filtering genome {} panicked", id);
                            FilterCounts::default()
                        })
                })
                .sum()
        });
        genomes.retain(|_, genome| genome.contig_count() > 0);
        counts
    }

    /// Diploid reconciliation of every genome in parallel
    pub fn reconcile_diploid(
        &self,
        population: &mut PopulationStore,
        oracle: &dyn FrequencyOracle,
        population_code: &str,
    ) -> FilterCounts {
        let genomes = population.genomes_mut();
        let counts = self.run(|| {
            genomes
                .par_iter_mut()
                .map(|(id, genome)| {
                    catch_unwind(AssertUnwindSafe(|| {
                        genome.reconcile_diploid(oracle, population_code)
                    }))
                    .unwrap_or_else(|_| {
                        error!("Diploid reconciliation of genome {} panicked", id);
                        FilterCounts::default()
                    })
                })
                .sum()
        });
        genomes.retain(|_, genome| genome.contig_count() > 0);
        counts
    }

    /// Total record count, one task per genome
    #[must_use]
    pub fn variant_count(&self, population: &PopulationStore) -> usize {
        self.map_genomes(population, GenomeStore::variant_count)
            .into_iter()
            .sum()
    }
}
