//! # variant-store
//!
//! A hierarchical in-memory store for population variant calls.
//!
//! Variant calls from many genomes are held in a tree of containers:
//!
//! ```text
//! PopulationStore → GenomeStore → ContigStore → OffsetStore → VariantHandle
//! ```
//!
//! Records are immutable and shared between containers through
//! reference-counted handles, so copies, subsets and set-algebra results never
//! duplicate record data.
//!
//! ## Features
//!
//! - **Windowed queries**: Sorted calls per phase, aware of upstream deletions
//! - **Composable filters**: Predicates at variant, contig, genome and population level
//! - **Parallel evaluation**: One task per genome on a bounded thread pool
//! - **Diploid reconciliation**: Resolve competing calls using allele frequencies
//! - **Set algebra**: Intersection, union and complement between contigs
//! - **Validation**: Check reference alleles against a FASTA
//!
//! ## Example
//!
//! ```rust
//! use variant_store::{ContigId, DataSource, GenomeId, Phase, PopulationStore, VariantRecord};
//!
//! let population = PopulationStore::new("cohort", DataSource::Generic);
//! let record = VariantRecord::new(ContigId::new("chr1"), 99, "A", "G", Phase::Haplotype(0));
//! population.add_variant(record.into_handle(), &[GenomeId::new("HG01"), GenomeId::new("HG02")]);
//!
//! let window = population
//!     .with_genome(&GenomeId::new("HG01"), |genome| {
//!         genome.with_contig(&ContigId::new("chr1"), |contig| {
//!             contig.get_sorted_variants(Phase::Haplotype(0), 0, 1000)
//!         })
//!     })
//!     .flatten()
//!     .unwrap_or_default();
//! assert_eq!(window.len(), 1);
//! ```
//!
//! ## Modules
//!
//! - [`core`]: Variant records, identifiers and collaborator interfaces
//! - [`store`]: The container hierarchy
//! - [`filter`]: Predicates and the parallel filter engine
//! - [`parsing`]: VCF and FASTA loaders
//! - [`cli`]: Command-line interface implementation

pub mod cli;
pub mod core;
pub mod filter;
pub mod parsing;
pub mod store;
pub mod utils;

// Re-export commonly used types for convenience
pub use core::external::{
    FrequencyOracle, InMemoryReference, InfoFrequencyOracle, ReferenceSequenceProvider,
    TableFrequencyOracle,
};
pub use core::types::*;
pub use core::variant::{Evidence, VariantHandle, VariantRecord};
pub use filter::{EngineConfig, ParallelFilterEngine, Predicate};
pub use store::{
    ContigStore, FilterCounts, GenomeStore, OffsetStore, PopulationStore, StoreError,
    ValidationCounts,
};
