//! Hierarchical in-memory variant store.
//!
//! The store is a tree of exclusively owned containers:
//! `PopulationStore` → `GenomeStore` → `ContigStore` → `OffsetStore` → `VariantHandle`
//!
//! Only the leaf records are shared (`Arc`); every container owns its children
//! through a key map, so the ownership graph never contains cycles.
//!
//! ## Locking
//!
//! Each container guards its own key map with an `RwLock`. Shared (`&self`)
//! write paths such as `add_variant` take locks strictly top-down
//! (population → genome → contig). Exclusive (`&mut self`) paths reach the maps
//! through `RwLock::get_mut` and take no locks at all. A read that spans two
//! levels is not atomic as a whole.
//!
//! ## Errors
//!
//! Per-item problems never abort bulk operations. They are logged through
//! `tracing` and reflected in the returned [`FilterCounts`] or
//! [`ValidationCounts`]. Single-item entry points return [`StoreError`].

use serde::Serialize;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;
use tracing::warn;

use crate::core::types::{ContigId, GenomeId};

pub mod contig;
pub mod genome;
pub mod offset;
pub mod population;

pub use contig::ContigStore;
pub use genome::GenomeStore;
pub use offset::OffsetStore;
pub use population::PopulationStore;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Variant at offset {record_offset} cannot be stored under offset {key} on contig {contig}")]
    StructuralConflict {
        contig: ContigId,
        key: u64,
        record_offset: u64,
    },

    #[error("Variant on contig {record_contig} cannot be stored in contig {contig}")]
    ContigMismatch {
        contig: ContigId,
        record_contig: ContigId,
    },

    #[error("Genome {0} already exists")]
    DuplicateGenome(GenomeId),

    #[error("Contig {contig} already exists in genome {genome}")]
    DuplicateContig { genome: GenomeId, contig: ContigId },
}

/// Record counts before and after an operation that removes records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FilterCounts {
    pub before: usize,
    pub after: usize,
}

impl FilterCounts {
    #[must_use]
    pub fn new(before: usize, after: usize) -> Self {
        Self { before, after }
    }

    #[must_use]
    pub fn removed(&self) -> usize {
        self.before.saturating_sub(self.after)
    }
}

impl std::ops::Add for FilterCounts {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            before: self.before + rhs.before,
            after: self.after + rhs.after,
        }
    }
}

impl std::ops::AddAssign for FilterCounts {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl std::iter::Sum for FilterCounts {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |acc, counts| acc + counts)
    }
}

/// Result of checking records against a reference sequence
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ValidationCounts {
    pub examined: usize,
    pub matched: usize,
}

impl ValidationCounts {
    #[must_use]
    pub fn mismatched(&self) -> usize {
        self.examined.saturating_sub(self.matched)
    }
}

impl std::ops::Add for ValidationCounts {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            examined: self.examined + rhs.examined,
            matched: self.matched + rhs.matched,
        }
    }
}

impl std::iter::Sum for ValidationCounts {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |acc, counts| acc + counts)
    }
}

/// Acquire a read guard, recovering the data if a writer panicked
pub(crate) fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| {
        warn!("Recovering from poisoned store lock");
        PoisonError::into_inner(poisoned)
    })
}

/// Acquire a write guard, recovering the data if a writer panicked
pub(crate) fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| {
        warn!("Recovering from poisoned store lock");
        PoisonError::into_inner(poisoned)
    })
}

/// Exclusive access to the lock's data without locking
pub(crate) fn exclusive<T>(lock: &mut RwLock<T>) -> &mut T {
    lock.get_mut().unwrap_or_else(PoisonError::into_inner)
}
