//! Built-in predicate leaves.

use std::collections::HashSet;

use crate::core::types::{ContigId, GenomeId, Phase};
use crate::core::variant::VariantRecord;
use crate::filter::predicate::{ContigFilter, GenomeFilter, PopulationFilter, VariantFilter};
use crate::store::{ContigStore, GenomeStore, PopulationStore};

/// Single base substitutions
#[derive(Debug, Clone, Copy, Default)]
pub struct SnpFilter;

impl VariantFilter for SnpFilter {
    fn accepts(&self, record: &VariantRecord) -> bool {
        record.is_snp()
    }
}

/// Records whose FILTER column is `PASS` or missing
#[derive(Debug, Clone, Copy, Default)]
pub struct PassFilter;

impl VariantFilter for PassFilter {
    fn accepts(&self, record: &VariantRecord) -> bool {
        record.evidence().passed()
    }
}

/// Records assigned to one phase
#[derive(Debug, Clone, Copy)]
pub struct PhaseFilter(pub Phase);

impl VariantFilter for PhaseFilter {
    fn accepts(&self, record: &VariantRecord) -> bool {
        record.phase() == self.0
    }
}

/// Records on one contig with an offset in `[start, end)`
#[derive(Debug, Clone)]
pub struct RegionFilter {
    pub contig_id: ContigId,
    pub start: u64,
    pub end: u64,
}

impl RegionFilter {
    pub fn new(contig_id: impl Into<String>, start: u64, end: u64) -> Self {
        Self {
            contig_id: ContigId::new(contig_id),
            start,
            end,
        }
    }
}

impl VariantFilter for RegionFilter {
    fn accepts(&self, record: &VariantRecord) -> bool {
        record.contig_id() == &self.contig_id
            && record.offset() >= self.start
            && record.offset() < self.end
    }
}

/// Whole contigs selected by id
#[derive(Debug, Clone)]
pub struct ContigIdFilter(pub ContigId);

impl ContigFilter for ContigIdFilter {
    fn accepts(&self, contig: &ContigStore) -> bool {
        contig.contig_id() == &self.0
    }
}

/// Whole genomes selected by id
#[derive(Debug, Clone, Default)]
pub struct GenomeListFilter {
    genomes: HashSet<GenomeId>,
}

impl GenomeListFilter {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            genomes: ids.into_iter().map(GenomeId::new).collect(),
        }
    }
}

impl GenomeFilter for GenomeListFilter {
    fn accepts(&self, genome: &GenomeStore) -> bool {
        self.genomes.contains(genome.genome_id())
    }
}

/// Genomes holding at least the given number of records
#[derive(Debug, Clone, Copy)]
pub struct MinVariantCountFilter(pub usize);

impl GenomeFilter for MinVariantCountFilter {
    fn accepts(&self, genome: &GenomeStore) -> bool {
        genome.variant_count() >= self.0
    }
}

/// Populations holding at least the given number of genomes
#[derive(Debug, Clone, Copy)]
pub struct MinGenomeCountFilter(pub usize);

impl PopulationFilter for MinGenomeCountFilter {
    fn accepts(&self, population: &PopulationStore) -> bool {
        population.genome_count() >= self.0
    }
}
