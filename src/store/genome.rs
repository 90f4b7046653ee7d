use std::collections::BTreeMap;
use std::sync::RwLock;
use tracing::{debug, warn};

use crate::core::external::{FrequencyOracle, ReferenceSequenceProvider};
use crate::core::types::{ContigId, GenomeId};
use crate::core::variant::VariantHandle;
use crate::filter::predicate::Predicate;
use crate::store::contig::ContigStore;
use crate::store::{
    exclusive, read_lock, write_lock, FilterCounts, StoreError, ValidationCounts,
};

/// Variant calls of one genome, keyed by contig
#[derive(Debug)]
pub struct GenomeStore {
    genome_id: GenomeId,
    contigs: RwLock<BTreeMap<ContigId, ContigStore>>,
}

impl Clone for GenomeStore {
    fn clone(&self) -> Self {
        Self {
            genome_id: self.genome_id.clone(),
            contigs: RwLock::new(read_lock(&self.contigs).clone()),
        }
    }
}

impl GenomeStore {
    #[must_use]
    pub fn new(genome_id: GenomeId) -> Self {
        Self {
            genome_id,
            contigs: RwLock::new(BTreeMap::new()),
        }
    }

    #[must_use]
    pub fn genome_id(&self) -> &GenomeId {
        &self.genome_id
    }

    /// Existing contig, or a new empty one
    pub fn get_or_create_contig(&mut self, contig_id: &ContigId) -> &mut ContigStore {
        exclusive(&mut self.contigs)
            .entry(contig_id.clone())
            .or_insert_with(|| ContigStore::new(contig_id.clone()))
    }

    /// Route a record to its contig, creating the contig on first use
    ///
    /// # Errors
    ///
    /// Propagates `StoreError` from [`ContigStore::add_variant`].
    pub fn add_variant(&self, record: VariantHandle) -> Result<(), StoreError> {
        {
            let contigs = read_lock(&self.contigs);
            if let Some(contig) = contigs.get(record.contig_id()) {
                return contig.add_variant(record);
            }
        }

        let mut contigs = write_lock(&self.contigs);
        let contig_id = record.contig_id().clone();
        contigs
            .entry(contig_id.clone())
            .or_insert_with(|| ContigStore::new(contig_id))
            .add_variant(record)
    }

    /// Insert a contig that must not exist yet
    ///
    /// # Errors
    ///
    /// Returns `StoreError::DuplicateContig` if the id is already present.
    pub fn add_contig(&self, contig: ContigStore) -> Result<(), StoreError> {
        let mut contigs = write_lock(&self.contigs);
        if contigs.contains_key(contig.contig_id()) {
            warn!(
                "Contig {} already exists in genome {}",
                contig.contig_id(),
                self.genome_id
            );
            return Err(StoreError::DuplicateContig {
                genome: self.genome_id.clone(),
                contig: contig.contig_id().clone(),
            });
        }
        contigs.insert(contig.contig_id().clone(), contig);
        Ok(())
    }

    /// Make sure a (possibly empty) contig exists; true if it was created
    pub fn ensure_contig(&self, contig_id: &ContigId) -> bool {
        let mut contigs = write_lock(&self.contigs);
        if contigs.contains_key(contig_id) {
            return false;
        }
        contigs.insert(contig_id.clone(), ContigStore::new(contig_id.clone()));
        true
    }

    #[must_use]
    pub fn contig_ids(&self) -> Vec<ContigId> {
        read_lock(&self.contigs).keys().cloned().collect()
    }

    #[must_use]
    pub fn contig_count(&self) -> usize {
        read_lock(&self.contigs).len()
    }

    /// Run `f` against a contig; `None` when the contig is absent
    pub fn with_contig<R>(&self, contig_id: &ContigId, f: impl FnOnce(&ContigStore) -> R) -> Option<R> {
        read_lock(&self.contigs).get(contig_id).map(f)
    }

    /// Run `f` with read access to every contig
    pub fn with_contigs<R>(&self, f: impl FnOnce(&BTreeMap<ContigId, ContigStore>) -> R) -> R {
        f(&read_lock(&self.contigs))
    }

    #[must_use]
    pub fn variant_count(&self) -> usize {
        read_lock(&self.contigs)
            .values()
            .map(ContigStore::variant_count)
            .sum()
    }

    /// All calls ordered by contig then offset
    #[must_use]
    pub fn variants(&self) -> Vec<VariantHandle> {
        read_lock(&self.contigs)
            .values()
            .flat_map(ContigStore::variants)
            .collect()
    }

    /// Append every call of `other`; duplicates are kept
    pub fn merge_unconditional(&self, other: &GenomeStore) -> usize {
        let records = other.variants();
        let mut merged = 0;
        for record in records {
            match self.add_variant(record) {
                Ok(()) => merged += 1,
                Err(e) => warn!("Merge into genome {} skipped a call: {}", self.genome_id, e),
            }
        }
        merged
    }

    /// New genome holding the calls the predicate accepts.
    ///
    /// A predicate that resolves on the genome alone keeps or drops everything;
    /// otherwise each contig is filtered and empty contigs are left out.
    #[must_use]
    pub fn filter_copy(&self, predicate: &Predicate) -> GenomeStore {
        let residual = predicate.resolve_genome(self);
        match residual.constant() {
            Some(true) => self.clone(),
            Some(false) => Self::new(self.genome_id.clone()),
            None => {
                let contigs = read_lock(&self.contigs)
                    .iter()
                    .map(|(id, contig)| (id.clone(), contig.filter_copy(&residual)))
                    .filter(|(_, contig)| !contig.is_empty())
                    .collect();
                Self {
                    genome_id: self.genome_id.clone(),
                    contigs: RwLock::new(contigs),
                }
            }
        }
    }

    /// Drop the calls the predicate rejects, then prune empty contigs
    pub fn filter_in_place(&mut self, predicate: &Predicate) -> FilterCounts {
        let residual = predicate.resolve_genome(self);
        let contigs = exclusive(&mut self.contigs);
        let counts = match residual.constant() {
            Some(true) => {
                let count = contigs.values().map(ContigStore::variant_count).sum();
                FilterCounts::new(count, count)
            }
            Some(false) => {
                let count = contigs.values().map(ContigStore::variant_count).sum();
                contigs.clear();
                FilterCounts::new(count, 0)
            }
            None => contigs
                .values_mut()
                .map(|contig| contig.filter_in_place(&residual))
                .sum(),
        };
        contigs.retain(|_, contig| !contig.is_empty());
        counts
    }

    /// Diploid reconciliation on every contig, then prune empty contigs
    pub fn reconcile_diploid(
        &mut self,
        oracle: &dyn FrequencyOracle,
        population_code: &str,
    ) -> FilterCounts {
        let contigs = exclusive(&mut self.contigs);
        let counts: FilterCounts = contigs
            .values_mut()
            .map(|contig| contig.reconcile_diploid(oracle, population_code))
            .sum();
        contigs.retain(|_, contig| !contig.is_empty());
        counts
    }

    /// Compare each call's reference allele with the reference sequence.
    ///
    /// Mismatches and missing reference data are logged and counted, never fatal.
    pub fn validate(&self, reference: &dyn ReferenceSequenceProvider) -> ValidationCounts {
        let mut counts = ValidationCounts::default();
        for record in self.variants() {
            counts.examined += 1;
            match reference.bases(record.contig_id(), record.offset(), record.reference_length()) {
                Some(bases) if bases.eq_ignore_ascii_case(record.reference()) => {
                    counts.matched += 1;
                }
                Some(bases) => {
                    warn!(
                        "Genome {}: {} reference allele differs from reference sequence '{}'",
                        self.genome_id, record, bases
                    );
                }
                None => {
                    warn!(
                        "Genome {}: no reference sequence for {}",
                        self.genome_id, record
                    );
                }
            }
        }
        debug!(
            "Genome {} validated {} of {} calls",
            self.genome_id, counts.matched, counts.examined
        );
        counts
    }
}
