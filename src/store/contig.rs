use std::collections::BTreeMap;
use std::sync::RwLock;
use tracing::{debug, warn};

use crate::core::external::FrequencyOracle;
use crate::core::types::{ContigId, Phase, VariantEquality};
use crate::core::variant::VariantHandle;
use crate::filter::predicate::Predicate;
use crate::store::offset::OffsetStore;
use crate::store::{exclusive, read_lock, write_lock, FilterCounts, StoreError};

/// Coordinate-ordered variant calls on one contig
#[derive(Debug)]
pub struct ContigStore {
    contig_id: ContigId,
    offsets: RwLock<BTreeMap<u64, OffsetStore>>,
}

impl Clone for ContigStore {
    fn clone(&self) -> Self {
        Self {
            contig_id: self.contig_id.clone(),
            offsets: RwLock::new(self.snapshot()),
        }
    }
}

impl ContigStore {
    #[must_use]
    pub fn new(contig_id: ContigId) -> Self {
        Self {
            contig_id,
            offsets: RwLock::new(BTreeMap::new()),
        }
    }

    fn from_offsets(contig_id: ContigId, offsets: BTreeMap<u64, OffsetStore>) -> Self {
        Self {
            contig_id,
            offsets: RwLock::new(offsets),
        }
    }

    #[must_use]
    pub fn contig_id(&self) -> &ContigId {
        &self.contig_id
    }

    /// Route a record to the offset it is anchored at
    ///
    /// # Errors
    ///
    /// Returns `StoreError::ContigMismatch` if the record belongs to another contig.
    pub fn add_variant(&self, record: VariantHandle) -> Result<(), StoreError> {
        if record.contig_id() != &self.contig_id {
            warn!("Rejected {} for contig {}", record, self.contig_id);
            return Err(StoreError::ContigMismatch {
                contig: self.contig_id.clone(),
                record_contig: record.contig_id().clone(),
            });
        }
        write_lock(&self.offsets)
            .entry(record.offset())
            .or_default()
            .add_variant(record);
        Ok(())
    }

    /// Insert or replace the calls at `offset`.
    ///
    /// An empty store removes the offset.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::StructuralConflict` without inserting anything if any
    /// record is anchored at a different offset.
    pub fn add_offset(&self, offset: u64, store: OffsetStore) -> Result<(), StoreError> {
        if let Some(record) = store.iter().find(|record| record.offset() != offset) {
            warn!(
                "Rejected offset store for {}:{}, holds {}",
                self.contig_id, offset, record
            );
            return Err(StoreError::StructuralConflict {
                contig: self.contig_id.clone(),
                key: offset,
                record_offset: record.offset(),
            });
        }

        let mut offsets = write_lock(&self.offsets);
        if store.is_empty() {
            offsets.remove(&offset);
        } else {
            offsets.insert(offset, store);
        }
        Ok(())
    }

    #[must_use]
    pub fn variant_count(&self) -> usize {
        read_lock(&self.offsets).values().map(OffsetStore::len).sum()
    }

    #[must_use]
    pub fn offset_count(&self) -> usize {
        read_lock(&self.offsets).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        read_lock(&self.offsets).is_empty()
    }

    /// Calls stored at `offset`; empty when the offset is absent
    #[must_use]
    pub fn offset_variants(&self, offset: u64) -> Vec<VariantHandle> {
        read_lock(&self.offsets)
            .get(&offset)
            .map(|store| store.variants().to_vec())
            .unwrap_or_default()
    }

    /// All calls in coordinate order
    #[must_use]
    pub fn variants(&self) -> Vec<VariantHandle> {
        read_lock(&self.offsets)
            .values()
            .flat_map(|store| store.iter().cloned())
            .collect()
    }

    /// Run `f` with read access to the offset map
    pub fn with_offsets<R>(&self, f: impl FnOnce(&BTreeMap<u64, OffsetStore>) -> R) -> R {
        f(&read_lock(&self.offsets))
    }

    /// Copy of the offset map; records are shared
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<u64, OffsetStore> {
        read_lock(&self.offsets).clone()
    }

    /// One call per offset for `phase` in `[start, end)`.
    ///
    /// The nearest upstream call is included when its reference span reaches
    /// into the window. Afterwards a call is dropped when its predecessor in
    /// the window deletes at least as many bases as separate the two; this is
    /// a single left-to-right pass over the assembled window.
    #[must_use]
    pub fn get_sorted_variants(
        &self,
        phase: Phase,
        start: u64,
        end: u64,
    ) -> BTreeMap<u64, VariantHandle> {
        if start >= end {
            return BTreeMap::new();
        }

        let offsets = read_lock(&self.offsets);
        let in_phase =
            |store: &OffsetStore| store.iter().find(|record| record.phase() == phase).cloned();

        let mut window: Vec<(u64, VariantHandle)> = Vec::new();
        let upstream = offsets
            .range(..start)
            .rev()
            .find_map(|(offset, store)| in_phase(store).map(|record| (*offset, record)));
        if let Some((offset, record)) = upstream {
            if start < record.end() {
                window.push((offset, record));
            }
        }
        window.extend(
            offsets
                .range(start..end)
                .filter_map(|(offset, store)| in_phase(store).map(|record| (*offset, record))),
        );
        drop(offsets);

        let mut sorted = BTreeMap::new();
        for (index, (offset, record)) in window.iter().enumerate() {
            if index > 0 {
                let (previous_offset, previous) = &window[index - 1];
                let gap = i64::try_from(offset - previous_offset).unwrap_or(i64::MAX);
                if previous.length_delta() >= gap {
                    debug!("Suppressing {} inside upstream deletion {}", record, previous);
                    continue;
                }
            }
            sorted.insert(*offset, record.clone());
        }
        sorted
    }

    /// Calls of `self` whose identity matches a call at the same offset in `template`.
    ///
    /// Quadratic in the calls per shared offset, which is small in practice.
    #[must_use]
    pub fn find_matching_template(&self, template: &ContigStore) -> ContigStore {
        let template = template.snapshot();
        let offsets = read_lock(&self.offsets);
        let matched = offsets
            .iter()
            .filter_map(|(offset, store)| {
                let candidates = template.get(offset)?;
                let kept: Vec<VariantHandle> = store
                    .iter()
                    .filter(|record| candidates.iter().any(|t| t.is_analogous(record)))
                    .cloned()
                    .collect();
                (!kept.is_empty()).then(|| (*offset, OffsetStore::from_variants(kept)))
            })
            .collect();
        Self::from_offsets(self.contig_id.clone(), matched)
    }

    /// Calls with an offset in `[start, end)`; records are shared
    #[must_use]
    pub fn subset(&self, start: u64, end: u64) -> ContigStore {
        if start >= end {
            return Self::new(self.contig_id.clone());
        }
        let offsets = read_lock(&self.offsets)
            .range(start..end)
            .map(|(offset, store)| (*offset, store.clone()))
            .collect();
        Self::from_offsets(self.contig_id.clone(), offsets)
    }

    #[must_use]
    pub fn set_intersection(&self, other: &ContigStore, mode: VariantEquality) -> ContigStore {
        let other = other.snapshot();
        let offsets = read_lock(&self.offsets)
            .iter()
            .filter_map(|(offset, store)| {
                let common = store.set_intersection(other.get(offset)?, mode);
                (!common.is_empty()).then_some((*offset, common))
            })
            .collect();
        Self::from_offsets(self.contig_id.clone(), offsets)
    }

    #[must_use]
    pub fn set_union(&self, other: &ContigStore, mode: VariantEquality) -> ContigStore {
        let mut merged = other.snapshot();
        for (offset, store) in read_lock(&self.offsets).iter() {
            let combined = match merged.get(offset) {
                Some(theirs) => store.set_union(theirs, mode),
                None => store.clone(),
            };
            merged.insert(*offset, combined);
        }
        Self::from_offsets(self.contig_id.clone(), merged)
    }

    #[must_use]
    pub fn set_complement(&self, other: &ContigStore, mode: VariantEquality) -> ContigStore {
        let other = other.snapshot();
        let offsets = read_lock(&self.offsets)
            .iter()
            .filter_map(|(offset, store)| {
                let remaining = match other.get(offset) {
                    Some(theirs) => store.set_complement(theirs, mode),
                    None => store.clone(),
                };
                (!remaining.is_empty()).then_some((*offset, remaining))
            })
            .collect();
        Self::from_offsets(self.contig_id.clone(), offsets)
    }

    /// New contig holding the calls the predicate accepts
    #[must_use]
    pub fn filter_copy(&self, predicate: &Predicate) -> ContigStore {
        let mut residual = predicate.resolve_contig(self);
        match residual.constant() {
            Some(true) => self.clone(),
            Some(false) => Self::new(self.contig_id.clone()),
            None => {
                let offsets = read_lock(&self.offsets)
                    .iter()
                    .map(|(offset, store)| (*offset, store.filter_copy(&mut residual)))
                    .filter(|(_, store)| !store.is_empty())
                    .collect();
                Self::from_offsets(self.contig_id.clone(), offsets)
            }
        }
    }

    /// Drop the calls the predicate rejects, then prune empty offsets
    pub fn filter_in_place(&mut self, predicate: &Predicate) -> FilterCounts {
        let mut residual = predicate.resolve_contig(self);
        let offsets = exclusive(&mut self.offsets);
        let before: usize = offsets.values().map(OffsetStore::len).sum();
        match residual.constant() {
            Some(true) => FilterCounts::new(before, before),
            Some(false) => {
                offsets.clear();
                FilterCounts::new(before, 0)
            }
            None => {
                let counts: FilterCounts = offsets
                    .values_mut()
                    .map(|store| store.filter_in_place(&mut residual))
                    .sum();
                offsets.retain(|_, store| !store.is_empty());
                counts
            }
        }
    }

    /// Apply diploid reconciliation to every offset, then prune empty offsets
    pub fn reconcile_diploid(
        &mut self,
        oracle: &dyn FrequencyOracle,
        population_code: &str,
    ) -> FilterCounts {
        let offsets = exclusive(&mut self.offsets);
        let counts: FilterCounts = offsets
            .values_mut()
            .map(|store| store.reconcile_diploid(oracle, population_code))
            .sum();
        offsets.retain(|_, store| !store.is_empty());
        counts
    }
}
