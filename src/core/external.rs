//! Interfaces to collaborators the store consumes but does not own.
//!
//! - [`FrequencyOracle`]: population allele frequencies, used to break ties
//!   during diploid reconciliation
//! - [`ReferenceSequenceProvider`]: reference bases, used by genome validation
//!
//! Both are implemented here in their simplest useful forms; ingestion code
//! can supply richer ones.

use std::collections::HashMap;

use crate::core::types::{ContigId, DataSource};
use crate::core::variant::VariantRecord;

/// Source of population allele frequencies
pub trait FrequencyOracle: Send + Sync {
    /// Frequency of the record's alternate allele in the given population,
    /// or `None` when no data is available.
    fn frequency(&self, record: &VariantRecord, population_code: &str) -> Option<f64>;
}

/// Source of reference genome bases
pub trait ReferenceSequenceProvider: Send + Sync {
    /// Reference bases covering `[offset, offset + length)`, or `None` if the
    /// contig is unknown or the span runs past its end.
    fn bases(&self, contig_id: &ContigId, offset: u64, length: u64) -> Option<String>;
}

/// Reads allele frequencies from the INFO fields kept in a record's evidence.
///
/// The data-source tag selects the field naming convention:
///
/// | Source | Fields tried |
/// |--------|--------------|
/// | Generic | `AF` |
/// | gnomAD | `AF_<code>`, `AF` |
/// | 1000 Genomes | `<code>_AF`, `AF` |
///
/// Comma separated values are indexed by the record's allele index.
#[derive(Debug, Clone, Copy, Default)]
pub struct InfoFrequencyOracle {
    data_source: DataSource,
}

impl InfoFrequencyOracle {
    #[must_use]
    pub fn new(data_source: DataSource) -> Self {
        Self { data_source }
    }

    fn field_names(&self, population_code: &str) -> Vec<String> {
        let code = population_code.trim();
        let mut names = Vec::with_capacity(2);
        if !code.is_empty() {
            match self.data_source {
                DataSource::Generic => {}
                DataSource::Gnomad => names.push(format!("AF_{}", code.to_lowercase())),
                DataSource::ThousandGenomes => names.push(format!("{}_AF", code.to_uppercase())),
            }
        }
        names.push("AF".to_string());
        names
    }
}

impl FrequencyOracle for InfoFrequencyOracle {
    fn frequency(&self, record: &VariantRecord, population_code: &str) -> Option<f64> {
        let evidence = record.evidence();
        self.field_names(population_code).iter().find_map(|name| {
            evidence
                .info(name)
                .and_then(|value| value.split(',').nth(evidence.allele_index))
                .and_then(|value| value.trim().parse::<f64>().ok())
                .filter(|freq| freq.is_finite())
        })
    }
}

/// Frequencies supplied up front, keyed by phase-insensitive identity
#[derive(Debug, Clone, Default)]
pub struct TableFrequencyOracle {
    frequencies: HashMap<String, f64>,
}

impl TableFrequencyOracle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_frequency(mut self, identity: impl Into<String>, frequency: f64) -> Self {
        self.frequencies.insert(identity.into(), frequency);
        self
    }

    pub fn insert(&mut self, identity: impl Into<String>, frequency: f64) {
        self.frequencies.insert(identity.into(), frequency);
    }
}

impl FrequencyOracle for TableFrequencyOracle {
    fn frequency(&self, record: &VariantRecord, _population_code: &str) -> Option<f64> {
        self.frequencies.get(record.identity()).copied()
    }
}

/// Whole reference sequences held in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryReference {
    sequences: HashMap<ContigId, Vec<u8>>,
}

impl InMemoryReference {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a contig sequence; bases are stored uppercase
    pub fn insert(&mut self, contig_id: ContigId, sequence: &[u8]) {
        let upper = sequence.iter().map(u8::to_ascii_uppercase).collect();
        self.sequences.insert(contig_id, upper);
    }

    #[must_use]
    pub fn with_sequence(mut self, contig_id: impl Into<String>, sequence: &str) -> Self {
        self.insert(ContigId::new(contig_id), sequence.as_bytes());
        self
    }

    #[must_use]
    pub fn contig_length(&self, contig_id: &ContigId) -> Option<u64> {
        self.sequences.get(contig_id).map(|s| s.len() as u64)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }
}

impl ReferenceSequenceProvider for InMemoryReference {
    fn bases(&self, contig_id: &ContigId, offset: u64, length: u64) -> Option<String> {
        let sequence = self.sequences.get(contig_id)?;
        let start = usize::try_from(offset).ok()?;
        let end = start.checked_add(usize::try_from(length).ok()?)?;
        sequence
            .get(start..end)
            .map(|bases| String::from_utf8_lossy(bases).into_owned())
    }
}
