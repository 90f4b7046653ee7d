//! Composable predicates over the variant store.
//!
//! A [`Predicate`] is a closed sum type. Leaves carry a granularity (variant,
//! contig, genome or population); combinators join them with boolean logic.
//!
//! Evaluation is partial: walking down the store, each container *resolves*
//! the predicate, replacing the leaves of its own granularity with constants.
//! A residual that collapses to `AlwaysTrue` keeps the whole container, one
//! that collapses to `AlwaysFalse` drops it, anything else descends a level.
//! Leaves coarser than the level a walk starts from pass.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::core::types::{Granularity, VariantEquality};
use crate::core::variant::VariantRecord;
use crate::store::{ContigStore, GenomeStore, PopulationStore};

/// Predicate leaf evaluated against a single record
pub trait VariantFilter: Send + Sync + fmt::Debug {
    fn accepts(&self, record: &VariantRecord) -> bool;
}

/// Predicate leaf evaluated once per contig
pub trait ContigFilter: Send + Sync + fmt::Debug {
    fn accepts(&self, contig: &ContigStore) -> bool;
}

/// Predicate leaf evaluated once per genome
pub trait GenomeFilter: Send + Sync + fmt::Debug {
    fn accepts(&self, genome: &GenomeStore) -> bool;
}

/// Predicate leaf evaluated once per population
pub trait PopulationFilter: Send + Sync + fmt::Debug {
    fn accepts(&self, population: &PopulationStore) -> bool;
}

/// Adapts a closure into a predicate leaf
pub struct FnFilter<F>(F);

impl<F> fmt::Debug for FnFilter<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnFilter")
    }
}

impl<F> VariantFilter for FnFilter<F>
where
    F: Fn(&VariantRecord) -> bool + Send + Sync,
{
    fn accepts(&self, record: &VariantRecord) -> bool {
        (self.0)(record)
    }
}

impl<F> ContigFilter for FnFilter<F>
where
    F: Fn(&ContigStore) -> bool + Send + Sync,
{
    fn accepts(&self, contig: &ContigStore) -> bool {
        (self.0)(contig)
    }
}

impl<F> GenomeFilter for FnFilter<F>
where
    F: Fn(&GenomeStore) -> bool + Send + Sync,
{
    fn accepts(&self, genome: &GenomeStore) -> bool {
        (self.0)(genome)
    }
}

impl<F> PopulationFilter for FnFilter<F>
where
    F: Fn(&PopulationStore) -> bool + Send + Sync,
{
    fn accepts(&self, population: &PopulationStore) -> bool {
        (self.0)(population)
    }
}

/// Keeps the first record of every distinct variant it sees.
///
/// Stateful: each independent evaluation must work on its own clone.
#[derive(Debug, Clone, Default)]
pub struct UniqueVariantFilter {
    mode: VariantEquality,
    seen: HashSet<String>,
}

impl UniqueVariantFilter {
    #[must_use]
    pub fn new(mode: VariantEquality) -> Self {
        Self {
            mode,
            seen: HashSet::new(),
        }
    }

    pub fn accepts(&mut self, record: &VariantRecord) -> bool {
        let key = match self.mode {
            VariantEquality::PhaseInsensitive => record.identity().to_string(),
            VariantEquality::PhaseSensitive => record.phased_identity(),
        };
        self.seen.insert(key)
    }
}

/// A filter over the variant store
#[derive(Debug, Clone)]
pub enum Predicate {
    AlwaysTrue,
    AlwaysFalse,
    Variant(Arc<dyn VariantFilter>),
    Contig(Arc<dyn ContigFilter>),
    Genome(Arc<dyn GenomeFilter>),
    Population(Arc<dyn PopulationFilter>),
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
    Not(Box<Predicate>),
    Unique(UniqueVariantFilter),
}

/// Container a predicate is resolved against
#[derive(Clone, Copy)]
enum Scope<'a> {
    Population(&'a PopulationStore),
    Genome(&'a GenomeStore),
    Contig(&'a ContigStore),
}

impl Scope<'_> {
    fn granularity(self) -> Granularity {
        match self {
            Self::Population(_) => Granularity::Population,
            Self::Genome(_) => Granularity::Genome,
            Self::Contig(_) => Granularity::Contig,
        }
    }
}

impl Predicate {
    pub fn variant(filter: impl VariantFilter + 'static) -> Self {
        Self::Variant(Arc::new(filter))
    }

    pub fn contig(filter: impl ContigFilter + 'static) -> Self {
        Self::Contig(Arc::new(filter))
    }

    pub fn genome(filter: impl GenomeFilter + 'static) -> Self {
        Self::Genome(Arc::new(filter))
    }

    pub fn population(filter: impl PopulationFilter + 'static) -> Self {
        Self::Population(Arc::new(filter))
    }

    pub fn variant_fn<F>(f: F) -> Self
    where
        F: Fn(&VariantRecord) -> bool + Send + Sync + 'static,
    {
        Self::Variant(Arc::new(FnFilter(f)))
    }

    pub fn contig_fn<F>(f: F) -> Self
    where
        F: Fn(&ContigStore) -> bool + Send + Sync + 'static,
    {
        Self::Contig(Arc::new(FnFilter(f)))
    }

    pub fn genome_fn<F>(f: F) -> Self
    where
        F: Fn(&GenomeStore) -> bool + Send + Sync + 'static,
    {
        Self::Genome(Arc::new(FnFilter(f)))
    }

    pub fn population_fn<F>(f: F) -> Self
    where
        F: Fn(&PopulationStore) -> bool + Send + Sync + 'static,
    {
        Self::Population(Arc::new(FnFilter(f)))
    }

    /// Keep only the first occurrence of each distinct variant
    #[must_use]
    pub fn unique(mode: VariantEquality) -> Self {
        Self::Unique(UniqueVariantFilter::new(mode))
    }

    #[must_use]
    pub fn and(self, other: Predicate) -> Self {
        Self::And(Box::new(self), Box::new(other))
    }

    #[must_use]
    pub fn or(self, other: Predicate) -> Self {
        Self::Or(Box::new(self), Box::new(other))
    }

    /// `Some(result)` if the predicate no longer depends on its input
    #[must_use]
    pub fn constant(&self) -> Option<bool> {
        match self {
            Self::AlwaysTrue => Some(true),
            Self::AlwaysFalse => Some(false),
            _ => None,
        }
    }

    /// Finest granularity the predicate must descend to, `None` for constants
    #[must_use]
    pub fn granularity(&self) -> Option<Granularity> {
        match self {
            Self::AlwaysTrue | Self::AlwaysFalse => None,
            Self::Variant(_) | Self::Unique(_) => Some(Granularity::Variant),
            Self::Contig(_) => Some(Granularity::Contig),
            Self::Genome(_) => Some(Granularity::Genome),
            Self::Population(_) => Some(Granularity::Population),
            Self::And(a, b) | Self::Or(a, b) => match (a.granularity(), b.granularity()) {
                (Some(x), Some(y)) => Some(x.min(y)),
                (x, y) => x.or(y),
            },
            Self::Not(inner) => inner.granularity(),
        }
    }

    #[must_use]
    pub fn resolve_population(&self, population: &PopulationStore) -> Predicate {
        self.resolve(Scope::Population(population))
    }

    #[must_use]
    pub fn resolve_genome(&self, genome: &GenomeStore) -> Predicate {
        self.resolve(Scope::Genome(genome))
    }

    #[must_use]
    pub fn resolve_contig(&self, contig: &ContigStore) -> Predicate {
        self.resolve(Scope::Contig(contig))
    }

    fn resolve(&self, scope: Scope<'_>) -> Predicate {
        let level = scope.granularity();
        match self {
            Self::Population(filter) => match scope {
                Scope::Population(population) => Self::from_bool(filter.accepts(population)),
                _ => Self::AlwaysTrue,
            },
            Self::Genome(filter) => match scope {
                Scope::Genome(genome) => Self::from_bool(filter.accepts(genome)),
                _ if level > Granularity::Genome => self.clone(),
                _ => Self::AlwaysTrue,
            },
            Self::Contig(filter) => match scope {
                Scope::Contig(contig) => Self::from_bool(filter.accepts(contig)),
                _ => self.clone(),
            },
            Self::And(a, b) => match (a.resolve(scope), b.resolve(scope)) {
                (Self::AlwaysFalse, _) | (_, Self::AlwaysFalse) => Self::AlwaysFalse,
                (Self::AlwaysTrue, other) | (other, Self::AlwaysTrue) => other,
                (x, y) => x.and(y),
            },
            Self::Or(a, b) => match (a.resolve(scope), b.resolve(scope)) {
                (Self::AlwaysTrue, _) | (_, Self::AlwaysTrue) => Self::AlwaysTrue,
                (Self::AlwaysFalse, other) | (other, Self::AlwaysFalse) => other,
                (x, y) => x.or(y),
            },
            Self::Not(inner) => match inner.resolve(scope) {
                Self::AlwaysTrue => Self::AlwaysFalse,
                Self::AlwaysFalse => Self::AlwaysTrue,
                other => !other,
            },
            Self::AlwaysTrue | Self::AlwaysFalse | Self::Variant(_) | Self::Unique(_) => {
                self.clone()
            }
        }
    }

    /// Evaluate against one record.
    ///
    /// Container leaves that were never resolved pass. Stateful leaves update
    /// their state, hence `&mut self`.
    pub fn accepts(&mut self, record: &VariantRecord) -> bool {
        match self {
            Self::AlwaysTrue => true,
            Self::AlwaysFalse => false,
            Self::Variant(filter) => filter.accepts(record),
            Self::Contig(_) | Self::Genome(_) | Self::Population(_) => true,
            Self::And(a, b) => a.accepts(record) && b.accepts(record),
            Self::Or(a, b) => a.accepts(record) || b.accepts(record),
            Self::Not(inner) => !inner.accepts(record),
            Self::Unique(unique) => unique.accepts(record),
        }
    }

    fn from_bool(value: bool) -> Self {
        if value {
            Self::AlwaysTrue
        } else {
            Self::AlwaysFalse
        }
    }
}

impl std::ops::Not for Predicate {
    type Output = Predicate;

    fn not(self) -> Predicate {
        Predicate::Not(Box::new(self))
    }
}
