//! Predicates and the parallel filter engine.
//!
//! - [`predicate`]: the [`Predicate`] sum type, its leaf traits and partial evaluation
//! - [`leaves`]: built-in leaves (SNPs, regions, phases, genome lists, ...)
//! - [`engine`]: [`ParallelFilterEngine`], one task per genome
//!
//! ## Example
//!
//! ```rust
//! use variant_store::filter::{leaves::SnpFilter, Predicate};
//! use variant_store::{ContigId, DataSource, GenomeId, Phase, PopulationStore, VariantRecord};
//!
//! let population = PopulationStore::new("demo", DataSource::Generic);
//! let snp = VariantRecord::new(ContigId::new("chr1"), 99, "A", "G", Phase::Unphased);
//! let del = VariantRecord::new(ContigId::new("chr1"), 120, "AT", "A", Phase::Unphased);
//! population.add_variant(snp.into_handle(), &[GenomeId::new("HG01")]);
//! population.add_variant(del.into_handle(), &[GenomeId::new("HG01")]);
//!
//! let snps = population.filter_copy(&Predicate::variant(SnpFilter));
//! assert_eq!(snps.variant_count(), 1);
//! assert_eq!(population.variant_count(), 2);
//! ```

pub mod engine;
pub mod leaves;
pub mod predicate;

pub use engine::{EngineConfig, ParallelFilterEngine};
pub use predicate::{
    ContigFilter, GenomeFilter, PopulationFilter, Predicate, UniqueVariantFilter, VariantFilter,
};
