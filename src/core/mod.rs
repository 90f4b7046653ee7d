//! Core data types for variant storage.
//!
//! This module provides the fundamental types used throughout the library:
//!
//! - [`VariantRecord`]: An immutable variant call (contig, offset, alleles, phase, evidence)
//! - [`VariantHandle`]: Reference-counted handle shared by every container holding a record
//! - [`ContigId`], [`GenomeId`], [`DataSource`]: Identifiers and population metadata
//! - [`Phase`], [`VariantEquality`], [`Granularity`]: Classification types
//! - [`FrequencyOracle`], [`ReferenceSequenceProvider`]: Collaborator interfaces
//!
//! ## Canonical Identity
//!
//! Records compare equal through a canonical identity string:
//!
//! | Flavor | Example |
//! |--------|---------|
//! | Phase-insensitive | `chr1:100:A>G` |
//! | Phase-sensitive | `chr1:100:A>G:1` |
//!
//! Offsets are 0-based. Evidence never takes part in equality.
//!
//! [`VariantRecord`]: variant::VariantRecord
//! [`VariantHandle`]: variant::VariantHandle
//! [`ContigId`]: types::ContigId
//! [`GenomeId`]: types::GenomeId
//! [`DataSource`]: types::DataSource
//! [`Phase`]: types::Phase
//! [`VariantEquality`]: types::VariantEquality
//! [`Granularity`]: types::Granularity
//! [`FrequencyOracle`]: external::FrequencyOracle
//! [`ReferenceSequenceProvider`]: external::ReferenceSequenceProvider

pub mod external;
pub mod types;
pub mod variant;
