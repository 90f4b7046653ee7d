use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Mutex, PoisonError, RwLock};
use tracing::{debug, info, warn};

use crate::core::external::FrequencyOracle;
use crate::core::types::{DataSource, GenomeId, Phase};
use crate::core::variant::VariantHandle;
use crate::filter::engine::ParallelFilterEngine;
use crate::filter::predicate::Predicate;
use crate::store::genome::GenomeStore;
use crate::store::{exclusive, read_lock, write_lock, FilterCounts, StoreError};

/// Top-level container: the genomes of one population
#[derive(Debug)]
pub struct PopulationStore {
    population_id: String,
    data_source: DataSource,
    genomes: RwLock<BTreeMap<GenomeId, GenomeStore>>,
}

impl Clone for PopulationStore {
    fn clone(&self) -> Self {
        Self {
            population_id: self.population_id.clone(),
            data_source: self.data_source,
            genomes: RwLock::new(read_lock(&self.genomes).clone()),
        }
    }
}

impl PopulationStore {
    #[must_use]
    pub fn new(population_id: impl Into<String>, data_source: DataSource) -> Self {
        Self {
            population_id: population_id.into(),
            data_source,
            genomes: RwLock::new(BTreeMap::new()),
        }
    }

    #[must_use]
    pub fn population_id(&self) -> &str {
        &self.population_id
    }

    #[must_use]
    pub fn data_source(&self) -> DataSource {
        self.data_source
    }

    #[must_use]
    pub fn genome_count(&self) -> usize {
        read_lock(&self.genomes).len()
    }

    #[must_use]
    pub fn genome_ids(&self) -> Vec<GenomeId> {
        read_lock(&self.genomes).keys().cloned().collect()
    }

    pub fn with_genome<R>(&self, genome_id: &GenomeId, f: impl FnOnce(&GenomeStore) -> R) -> Option<R> {
        read_lock(&self.genomes).get(genome_id).map(f)
    }

    pub fn with_genomes<R>(&self, f: impl FnOnce(&BTreeMap<GenomeId, GenomeStore>) -> R) -> R {
        f(&read_lock(&self.genomes))
    }

    pub(crate) fn genomes_mut(&mut self) -> &mut BTreeMap<GenomeId, GenomeStore> {
        exclusive(&mut self.genomes)
    }

    /// Existing genome, or a new empty one
    pub fn get_or_create_genome(&mut self, genome_id: &GenomeId) -> &mut GenomeStore {
        self.genomes_mut()
            .entry(genome_id.clone())
            .or_insert_with(|| GenomeStore::new(genome_id.clone()))
    }

    /// Insert a whole genome
    ///
    /// # Errors
    ///
    /// Returns `StoreError::DuplicateGenome` if the id is already present; the
    /// existing genome is left untouched.
    pub fn add_genome(&self, genome: GenomeStore) -> Result<(), StoreError> {
        let mut genomes = write_lock(&self.genomes);
        if genomes.contains_key(genome.genome_id()) {
            let e = StoreError::DuplicateGenome(genome.genome_id().clone());
            warn!("Population {}: {}", self.population_id, e);
            return Err(e);
        }
        genomes.insert(genome.genome_id().clone(), genome);
        Ok(())
    }

    /// Add one shared record to each target genome, creating genomes as needed.
    ///
    /// Every target is attempted; returns `true` only if all succeeded.
    pub fn add_variant(&self, record: VariantHandle, targets: &[GenomeId]) -> bool {
        let mut all_added = true;
        for genome_id in targets {
            let result = {
                let genomes = read_lock(&self.genomes);
                genomes
                    .get(genome_id)
                    .map(|genome| genome.add_variant(record.clone()))
            };
            let result = match result {
                Some(result) => result,
                None => write_lock(&self.genomes)
                    .entry(genome_id.clone())
                    .or_insert_with(|| GenomeStore::new(genome_id.clone()))
                    .add_variant(record.clone()),
            };
            if let Err(e) = result {
                warn!("Genome {}: {}", genome_id, e);
                all_added = false;
            }
        }
        all_added
    }

    /// Append every genome of `other`, merging into genomes with the same id
    pub fn merge_unconditional(&self, other: &PopulationStore) -> usize {
        let incoming: Vec<GenomeStore> = other.with_genomes(|genomes| genomes.values().cloned().collect());
        let mut merged = 0;
        for genome in incoming {
            let existing = read_lock(&self.genomes)
                .get(genome.genome_id())
                .map(|target| target.merge_unconditional(&genome));
            merged += match existing {
                Some(count) => count,
                None => {
                    let count = genome.variant_count();
                    write_lock(&self.genomes)
                        .entry(genome.genome_id().clone())
                        .or_insert_with(|| GenomeStore::new(genome.genome_id().clone()))
                        .merge_unconditional(&genome);
                    count
                }
            };
        }
        debug!("Merged {} calls into population {}", merged, self.population_id);
        merged
    }

    /// Structural copy sharing the records
    #[must_use]
    pub fn deep_copy(&self) -> PopulationStore {
        self.filter_copy(&Predicate::AlwaysTrue)
    }

    /// Remove every genome
    pub fn clear(&mut self) -> FilterCounts {
        self.filter_in_place(&Predicate::AlwaysFalse)
    }

    /// Give every genome an entry, possibly empty, for every contig seen in
    /// any genome. Returns the number of contigs in the union.
    pub fn square_contigs(&self) -> usize {
        let genomes = read_lock(&self.genomes);
        let union: BTreeSet<_> = genomes
            .values()
            .flat_map(GenomeStore::contig_ids)
            .collect();
        for genome in genomes.values() {
            for contig_id in &union {
                if genome.ensure_contig(contig_id) {
                    debug!("Added empty contig {} to genome {}", contig_id, genome.genome_id());
                }
            }
        }
        union.len()
    }

    /// Every call of every genome in one genome named after the population
    #[must_use]
    pub fn compress_to_single_genome(&self) -> GenomeStore {
        let compressed = GenomeStore::new(GenomeId::new(self.population_id.clone()));
        for genome in read_lock(&self.genomes).values() {
            compressed.merge_unconditional(genome);
        }
        compressed
    }

    /// One synthetic genome holding each distinct call once, phase dropped
    #[must_use]
    pub fn unique_genome_of_distinct_variants(&self) -> PopulationStore {
        self.unique_genome_of_distinct_variants_with(&ParallelFilterEngine::default())
    }

    #[must_use]
    pub fn unique_genome_of_distinct_variants_with(&self, engine: &ParallelFilterEngine) -> PopulationStore {
        let seen: Mutex<HashSet<[u8; 16]>> = Mutex::new(HashSet::new());
        let distinct = GenomeStore::new(GenomeId::new(self.population_id.clone()));

        engine.map_genomes(self, |genome| {
            for record in genome.variants() {
                let is_new = seen
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(record.identity_digest());
                if !is_new {
                    continue;
                }
                let unphased = if record.phase().is_phased() {
                    record.with_phase(Phase::Unphased).into_handle()
                } else {
                    record
                };
                if let Err(e) = distinct.add_variant(unphased) {
                    warn!("Distinct genome skipped a call: {}", e);
                }
            }
        });

        let result = PopulationStore::new(self.population_id.clone(), self.data_source);
        if let Err(e) = result.add_genome(distinct) {
            warn!("{}", e);
        }
        result
    }

    /// Total record count, one task per genome
    #[must_use]
    pub fn variant_count(&self) -> usize {
        ParallelFilterEngine::default().variant_count(self)
    }

    /// New population holding the calls the predicate accepts
    #[must_use]
    pub fn filter_copy(&self, predicate: &Predicate) -> PopulationStore {
        self.filter_copy_with(&ParallelFilterEngine::default(), predicate)
    }

    /// As [`filter_copy`](Self::filter_copy) on a configured engine.
    ///
    /// A predicate that resolves on the population alone keeps or drops every
    /// genome without visiting them.
    #[must_use]
    pub fn filter_copy_with(&self, engine: &ParallelFilterEngine, predicate: &Predicate) -> PopulationStore {
        let residual = predicate.resolve_population(self);
        match residual.constant() {
            Some(true) => self.clone(),
            Some(false) => Self::new(self.population_id.clone(), self.data_source),
            None => engine.filter_copy(self, &residual),
        }
    }

    /// Drop the calls the predicate rejects, pruning empty genomes and contigs
    pub fn filter_in_place(&mut self, predicate: &Predicate) -> FilterCounts {
        self.filter_in_place_with(&ParallelFilterEngine::default(), predicate)
    }

    pub fn filter_in_place_with(
        &mut self,
        engine: &ParallelFilterEngine,
        predicate: &Predicate,
    ) -> FilterCounts {
        let residual = predicate.resolve_population(self);
        let counts = match residual.constant() {
            Some(true) => {
                let count = engine.variant_count(self);
                FilterCounts::new(count, count)
            }
            Some(false) => {
                let count = engine.variant_count(self);
                self.genomes_mut().clear();
                FilterCounts::new(count, 0)
            }
            None => engine.filter_in_place(self, &residual),
        };
        info!(
            "Population {}: kept {} of {} calls",
            self.population_id, counts.after, counts.before
        );
        counts
    }

    /// Diploid reconciliation across genomes in parallel
    pub fn reconcile_diploid(
        &mut self,
        oracle: &dyn FrequencyOracle,
        population_code: &str,
    ) -> FilterCounts {
        self.reconcile_diploid_with(&ParallelFilterEngine::default(), oracle, population_code)
    }

    pub fn reconcile_diploid_with(
        &mut self,
        engine: &ParallelFilterEngine,
        oracle: &dyn FrequencyOracle,
        population_code: &str,
    ) -> FilterCounts {
        debug!(
            "Reconciling population {} ({}) with code '{}'",
            self.population_id, self.data_source, population_code
        );
        engine.reconcile_diploid(self, oracle, population_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ContigId;
    use crate::core::variant::VariantRecord;
    use crate::filter::leaves::{MinGenomeCountFilter, SnpFilter};

    fn call(contig: &str, offset: u64, alt: &str, phase: Phase) -> VariantHandle {
        VariantRecord::new(ContigId::new(contig), offset, "A", alt, phase).into_handle()
    }

    fn ids(names: &[&str]) -> Vec<GenomeId> {
        names.iter().map(|n| GenomeId::new(*n)).collect()
    }

    #[test]
    fn test_add_variant_shares_record_across_genomes() {
        let population = PopulationStore::new("pop", DataSource::Generic);
        let record = call("chr1", 10, "G", Phase::Unphased);
        assert!(population.add_variant(record.clone(), &ids(&["G1", "G2"])));
        assert_eq!(population.genome_count(), 2);
        assert_eq!(population.variant_count(), 2);

        let held = population
            .with_genome(&GenomeId::new("G2"), GenomeStore::variants)
            .unwrap();
        assert!(std::sync::Arc::ptr_eq(&held[0], &record));
    }

    #[test]
    fn test_add_genome_duplicate() {
        let population = PopulationStore::new("pop", DataSource::Generic);
        population.add_genome(GenomeStore::new(GenomeId::new("G1"))).unwrap();
        let err = population
            .add_genome(GenomeStore::new(GenomeId::new("G1")))
            .unwrap_err();
        assert_eq!(err, StoreError::DuplicateGenome(GenomeId::new("G1")));
        assert_eq!(population.genome_count(), 1);
    }

    #[test]
    fn test_get_or_create_genome() {
        let mut population = PopulationStore::new("pop", DataSource::Generic);
        population
            .get_or_create_genome(&GenomeId::new("G1"))
            .add_variant(call("chr1", 1, "G", Phase::Unphased))
            .unwrap();
        population.get_or_create_genome(&GenomeId::new("G1"));
        assert_eq!(population.genome_count(), 1);
        assert_eq!(population.variant_count(), 1);
    }

    #[test]
    fn test_square_contigs() {
        let population = PopulationStore::new("pop", DataSource::Generic);
        population.add_variant(call("chrA", 1, "G", Phase::Unphased), &ids(&["G1", "G2"]));
        population.add_variant(call("chrB", 1, "G", Phase::Unphased), &ids(&["G2"]));

        assert_eq!(population.square_contigs(), 2);
        let g1_contigs = population
            .with_genome(&GenomeId::new("G1"), GenomeStore::contig_ids)
            .unwrap();
        assert_eq!(g1_contigs, vec![ContigId::new("chrA"), ContigId::new("chrB")]);
        let empty_b = population
            .with_genome(&GenomeId::new("G1"), |g| {
                g.with_contig(&ContigId::new("chrB"), |c| c.is_empty())
            })
            .flatten();
        assert_eq!(empty_b, Some(true));
        assert_eq!(population.variant_count(), 3);
    }

    #[test]
    fn test_compress_keeps_duplicates() {
        let population = PopulationStore::new("pop", DataSource::Generic);
        population.add_variant(call("chr1", 5, "G", Phase::Unphased), &ids(&["G1", "G2"]));
        population.add_variant(call("chr1", 6, "T", Phase::Unphased), &ids(&["G2"]));

        let compressed = population.compress_to_single_genome();
        assert_eq!(compressed.genome_id().as_str(), "pop");
        assert_eq!(compressed.variant_count(), 3);
    }

    #[test]
    fn test_unique_genome_drops_phase() {
        let population = PopulationStore::new("pop", DataSource::Generic);
        population.add_variant(call("chr1", 5, "G", Phase::Haplotype(0)), &ids(&["G1"]));
        population.add_variant(call("chr1", 5, "G", Phase::Haplotype(1)), &ids(&["G2"]));
        population.add_variant(call("chr1", 5, "G", Phase::Unphased), &ids(&["G3"]));
        population.add_variant(call("chr1", 9, "C", Phase::Unphased), &ids(&["G3"]));

        let distinct = population.unique_genome_of_distinct_variants();
        assert_eq!(distinct.genome_count(), 1);
        assert_eq!(distinct.variant_count(), 2);
        let phases: Vec<Phase> = distinct
            .with_genome(&GenomeId::new("pop"), GenomeStore::variants)
            .unwrap()
            .iter()
            .map(|r| r.phase())
            .collect();
        assert!(phases.iter().all(|p| !p.is_phased()));
    }

    #[test]
    fn test_population_level_predicate_short_circuits() {
        let mut population = PopulationStore::new("pop", DataSource::Generic);
        population.add_variant(call("chr1", 5, "G", Phase::Unphased), &ids(&["G1", "G2"]));

        let keep = population.filter_copy(&Predicate::population(MinGenomeCountFilter(2)));
        assert_eq!(keep.variant_count(), 2);
        let drop = population.filter_copy(&Predicate::population(MinGenomeCountFilter(3)));
        assert_eq!(drop.genome_count(), 0);

        let counts = population.filter_in_place(&Predicate::population(MinGenomeCountFilter(3)));
        assert_eq!(counts, FilterCounts::new(2, 0));
        assert_eq!(population.genome_count(), 0);
    }

    #[test]
    fn test_filter_in_place_prunes_genomes() {
        let mut population = PopulationStore::new("pop", DataSource::Generic);
        population.add_variant(call("chr1", 5, "G", Phase::Unphased), &ids(&["G1"]));
        population.add_variant(call("chr1", 6, "GT", Phase::Unphased), &ids(&["G2"]));

        let counts = population.filter_in_place(&Predicate::variant(SnpFilter));
        assert_eq!(counts, FilterCounts::new(2, 1));
        assert_eq!(population.genome_ids(), ids(&["G1"]));
    }

    #[test]
    fn test_deep_copy_and_clear() {
        let mut population = PopulationStore::new("pop", DataSource::Gnomad);
        population.add_variant(call("chr1", 5, "G", Phase::Unphased), &ids(&["G1", "G2"]));

        let copy = population.deep_copy();
        let counts = population.clear();
        assert_eq!(counts, FilterCounts::new(2, 0));
        assert_eq!(population.genome_count(), 0);
        assert_eq!(copy.genome_count(), 2);
        assert_eq!(copy.data_source(), DataSource::Gnomad);
    }

    #[test]
    fn test_merge_unconditional() {
        let target = PopulationStore::new("pop", DataSource::Generic);
        target.add_variant(call("chr1", 5, "G", Phase::Unphased), &ids(&["G1"]));
        let other = PopulationStore::new("other", DataSource::Generic);
        other.add_variant(call("chr1", 5, "G", Phase::Unphased), &ids(&["G1", "G9"]));

        assert_eq!(target.merge_unconditional(&other), 2);
        assert_eq!(target.genome_ids(), ids(&["G1", "G9"]));
        assert_eq!(target.variant_count(), 3);
    }
}
