use tracing::{debug, warn};

use crate::core::external::FrequencyOracle;
use crate::core::types::{Phase, VariantEquality};
use crate::core::variant::VariantHandle;
use crate::filter::predicate::Predicate;
use crate::store::FilterCounts;

/// Variant calls anchored at a single contig offset.
///
/// Not synchronised; the owning [`ContigStore`](crate::store::ContigStore)
/// guards access.
#[derive(Debug, Clone, Default)]
pub struct OffsetStore {
    variants: Vec<VariantHandle>,
}

impl OffsetStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_variants(variants: Vec<VariantHandle>) -> Self {
        Self { variants }
    }

    /// Unconditional append
    pub fn add_variant(&mut self, record: VariantHandle) {
        self.variants.push(record);
    }

    #[must_use]
    pub fn variants(&self) -> &[VariantHandle] {
        &self.variants
    }

    pub fn iter(&self) -> impl Iterator<Item = &VariantHandle> {
        self.variants.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.variants.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    /// New store holding the records the predicate accepts
    #[must_use]
    pub fn filter_copy(&self, predicate: &mut Predicate) -> OffsetStore {
        Self {
            variants: self
                .variants
                .iter()
                .filter(|record| predicate.accepts(record))
                .cloned()
                .collect(),
        }
    }

    /// Drop the records the predicate rejects
    pub fn filter_in_place(&mut self, predicate: &mut Predicate) -> FilterCounts {
        let before = self.variants.len();
        self.variants.retain(|record| predicate.accepts(record));
        FilterCounts::new(before, self.variants.len())
    }

    /// Reduce the calls at this offset to a plausible diploid set.
    ///
    /// Two calls on the same haplotype, or a phased and an unphased call,
    /// compete: the one with the higher population frequency wins, or the
    /// first when a frequency is missing.
    /// More than two calls are grouped by identity and only the most frequent
    /// group survives, reduced to one call per haplotype (phased) or the first
    /// two (unphased). Without any frequency data the offset is cleared.
    pub fn reconcile_diploid(
        &mut self,
        oracle: &dyn FrequencyOracle,
        population_code: &str,
    ) -> FilterCounts {
        let before = self.variants.len();
        match before {
            0 | 1 => {}
            2 => self.reconcile_pair(oracle, population_code),
            _ => self.reconcile_many(oracle, population_code),
        }
        FilterCounts::new(before, self.variants.len())
    }

    fn reconcile_pair(&mut self, oracle: &dyn FrequencyOracle, population_code: &str) {
        let (first, second) = (&self.variants[0], &self.variants[1]);
        let compatible = match (first.phase(), second.phase()) {
            (Phase::Unphased, Phase::Unphased) => true,
            (a, b) => a.is_phased() && b.is_phased() && a != b,
        };
        if compatible {
            return;
        }

        match (
            oracle.frequency(first, population_code),
            oracle.frequency(second, population_code),
        ) {
            (Some(first_freq), Some(second_freq)) if second_freq > first_freq => {
                debug!("Keeping {} over {} on frequency", second, first);
                self.variants.remove(0);
            }
            (Some(_), Some(_)) => {
                self.variants.truncate(1);
            }
            _ => {
                warn!(
                    "No frequency to choose between {} and {}, keeping the first",
                    first, second
                );
                self.variants.truncate(1);
            }
        }
    }

    fn reconcile_many(&mut self, oracle: &dyn FrequencyOracle, population_code: &str) {
        let mut groups: Vec<Vec<VariantHandle>> = Vec::new();
        for record in &self.variants {
            match groups
                .iter_mut()
                .find(|group| group[0].is_analogous(record))
            {
                Some(group) => group.push(record.clone()),
                None => groups.push(vec![record.clone()]),
            }
        }

        let mut best: Option<(usize, f64)> = None;
        for (index, group) in groups.iter().enumerate() {
            let frequency = group
                .iter()
                .find_map(|record| oracle.frequency(record, population_code));
            if let Some(frequency) = frequency {
                if best.map_or(true, |(_, top)| frequency > top) {
                    best = Some((index, frequency));
                }
            }
        }

        let Some((index, _)) = best else {
            warn!(
                "No frequency data for {} competing calls at {}, clearing offset",
                self.variants.len(),
                self.variants[0].identity()
            );
            self.variants.clear();
            return;
        };

        let mut kept = groups.swap_remove(index);
        if kept.iter().any(|record| record.phase().is_phased()) {
            let mut phases = Vec::with_capacity(2);
            kept.retain(|record| {
                let phase = record.phase();
                if phase.is_phased() && !phases.contains(&phase) {
                    phases.push(phase);
                    true
                } else {
                    false
                }
            });
        }
        kept.truncate(2);
        self.variants = kept;
    }

    /// Records of `self` paired with an equal record in `other`.
    ///
    /// Each record of `other` pairs with at most one record of `self`, so
    /// repeated calls (homozygous genotypes) count once per copy.
    #[must_use]
    pub fn set_intersection(&self, other: &OffsetStore, mode: VariantEquality) -> OffsetStore {
        let (ours, _) = self.pair_with(other, mode);
        Self {
            variants: self.select(&ours, true),
        }
    }

    /// Records of `self` plus the records of `other` left unpaired
    #[must_use]
    pub fn set_union(&self, other: &OffsetStore, mode: VariantEquality) -> OffsetStore {
        let (_, theirs) = self.pair_with(other, mode);
        let mut variants = self.variants.clone();
        variants.extend(other.select(&theirs, false));
        Self { variants }
    }

    /// Records of `self` left unpaired by `other`
    #[must_use]
    pub fn set_complement(&self, other: &OffsetStore, mode: VariantEquality) -> OffsetStore {
        let (ours, _) = self.pair_with(other, mode);
        Self {
            variants: self.select(&ours, false),
        }
    }

    /// Greedy one-to-one pairing of equal records, in insertion order
    fn pair_with(&self, other: &OffsetStore, mode: VariantEquality) -> (Vec<bool>, Vec<bool>) {
        let mut ours = vec![false; self.variants.len()];
        let mut theirs = vec![false; other.variants.len()];
        for (index, record) in self.variants.iter().enumerate() {
            let partner = (0..other.variants.len())
                .find(|&j| !theirs[j] && other.variants[j].equals(record, mode));
            if let Some(j) = partner {
                ours[index] = true;
                theirs[j] = true;
            }
        }
        (ours, theirs)
    }

    fn select(&self, paired: &[bool], keep_paired: bool) -> Vec<VariantHandle> {
        self.variants
            .iter()
            .zip(paired)
            .filter(|(_, is_paired)| **is_paired == keep_paired)
            .map(|(record, _)| record.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::external::TableFrequencyOracle;
    use crate::core::types::ContigId;
    use crate::core::variant::VariantRecord;

    fn call(alt: &str, phase: Phase) -> VariantHandle {
        VariantRecord::new(ContigId::new("chr1"), 100, "A", alt, phase).into_handle()
    }

    fn store(calls: &[VariantHandle]) -> OffsetStore {
        OffsetStore::from_variants(calls.to_vec())
    }

    fn alts(store: &OffsetStore) -> Vec<&str> {
        store.iter().map(|r| r.alternate()).collect()
    }

    #[test]
    fn test_filter_copy_leaves_source() {
        let source = store(&[call("G", Phase::Unphased), call("T", Phase::Unphased)]);
        let mut pred = Predicate::variant_fn(|r| r.alternate() == "T");
        let copy = source.filter_copy(&mut pred);
        assert_eq!(alts(&copy), vec!["T"]);
        assert_eq!(source.len(), 2);
    }

    #[test]
    fn test_filter_in_place_counts() {
        let mut target = store(&[call("G", Phase::Unphased), call("T", Phase::Unphased)]);
        let counts = target.filter_in_place(&mut Predicate::AlwaysFalse);
        assert_eq!(counts, FilterCounts::new(2, 0));
        assert!(target.is_empty());
    }

    #[test]
    fn test_diploid_small_offsets_untouched() {
        let oracle = TableFrequencyOracle::new();
        let mut unphased = store(&[call("G", Phase::Unphased), call("T", Phase::Unphased)]);
        assert_eq!(
            unphased.reconcile_diploid(&oracle, "nfe"),
            FilterCounts::new(2, 2)
        );

        let mut complementary = store(&[call("G", Phase::Haplotype(0)), call("T", Phase::Haplotype(1))]);
        assert_eq!(complementary.reconcile_diploid(&oracle, "nfe").after, 2);

        let mut single = store(&[call("G", Phase::Haplotype(0))]);
        assert_eq!(single.reconcile_diploid(&oracle, "nfe").after, 1);
    }

    #[test]
    fn test_diploid_same_phase_pair_keeps_frequent() {
        let oracle = TableFrequencyOracle::new()
            .with_frequency("chr1:100:A>G", 0.1)
            .with_frequency("chr1:100:A>T", 0.6);
        let mut offset = store(&[call("G", Phase::Haplotype(0)), call("T", Phase::Haplotype(0))]);
        let counts = offset.reconcile_diploid(&oracle, "nfe");
        assert_eq!(counts, FilterCounts::new(2, 1));
        assert_eq!(alts(&offset), vec!["T"]);
    }

    #[test]
    fn test_diploid_same_phase_pair_without_frequency_keeps_first() {
        let oracle = TableFrequencyOracle::new().with_frequency("chr1:100:A>T", 0.6);
        let mut offset = store(&[call("G", Phase::Haplotype(1)), call("T", Phase::Haplotype(1))]);
        offset.reconcile_diploid(&oracle, "nfe");
        assert_eq!(alts(&offset), vec!["G"]);
    }

    #[test]
    fn test_diploid_mixed_pair_competes() {
        let oracle = TableFrequencyOracle::new()
            .with_frequency("chr1:100:A>G", 0.5)
            .with_frequency("chr1:100:A>T", 0.2);
        let mut offset = store(&[call("T", Phase::Unphased), call("G", Phase::Haplotype(1))]);
        assert_eq!(offset.reconcile_diploid(&oracle, "nfe"), FilterCounts::new(2, 1));
        assert_eq!(alts(&offset), vec!["G"]);
    }

    #[test]
    fn test_diploid_many_keeps_most_frequent_group() {
        let oracle = TableFrequencyOracle::new()
            .with_frequency("chr1:100:A>G", 0.2)
            .with_frequency("chr1:100:A>T", 0.7);
        let mut offset = store(&[
            call("G", Phase::Haplotype(0)),
            call("T", Phase::Haplotype(0)),
            call("T", Phase::Haplotype(0)),
            call("T", Phase::Haplotype(1)),
        ]);
        let counts = offset.reconcile_diploid(&oracle, "nfe");
        assert_eq!(counts, FilterCounts::new(4, 2));
        assert_eq!(alts(&offset), vec!["T", "T"]);
        assert_eq!(offset.variants()[0].phase(), Phase::Haplotype(0));
        assert_eq!(offset.variants()[1].phase(), Phase::Haplotype(1));
    }

    #[test]
    fn test_diploid_many_unphased_truncates() {
        let oracle = TableFrequencyOracle::new().with_frequency("chr1:100:A>C", 0.3);
        let mut offset = store(&[
            call("C", Phase::Unphased),
            call("C", Phase::Unphased),
            call("C", Phase::Unphased),
            call("G", Phase::Unphased),
        ]);
        offset.reconcile_diploid(&oracle, "");
        assert_eq!(alts(&offset), vec!["C", "C"]);
    }

    #[test]
    fn test_diploid_many_without_frequency_clears() {
        let oracle = TableFrequencyOracle::new();
        let mut offset = store(&[
            call("C", Phase::Unphased),
            call("G", Phase::Unphased),
            call("T", Phase::Unphased),
        ]);
        let counts = offset.reconcile_diploid(&oracle, "");
        assert_eq!(counts, FilterCounts::new(3, 0));
        assert!(offset.is_empty());
    }

    #[test]
    fn test_set_algebra_shares_records() {
        let a = call("G", Phase::Haplotype(0));
        let b = call("T", Phase::Haplotype(0));
        let left = store(&[a.clone(), b.clone()]);
        let right = store(&[call("G", Phase::Haplotype(1))]);

        let inter = left.set_intersection(&right, VariantEquality::PhaseInsensitive);
        assert_eq!(alts(&inter), vec!["G"]);
        assert!(std::sync::Arc::ptr_eq(&inter.variants()[0], &a));

        let comp = left.set_complement(&right, VariantEquality::PhaseInsensitive);
        assert_eq!(alts(&comp), vec!["T"]);

        let union = left.set_union(&right, VariantEquality::PhaseInsensitive);
        assert_eq!(union.len(), 2);
        assert_eq!(
            union.len(),
            left.len() + right.len() - inter.len()
        );

        let strict = left.set_intersection(&right, VariantEquality::PhaseSensitive);
        assert!(strict.is_empty());
        let strict_union = left.set_union(&right, VariantEquality::PhaseSensitive);
        assert_eq!(strict_union.len(), 3);
    }

    #[test]
    fn test_set_algebra_counts_homozygous_copies() {
        let g0 = call("G", Phase::Haplotype(0));
        let g1 = call("G", Phase::Haplotype(1));
        let unphased = call("G", Phase::Unphased);
        let cases = [
            (store(&[g0.clone(), g1.clone()]), store(&[g0.clone()])),
            (store(&[g0.clone()]), store(&[g0.clone(), g1.clone()])),
            (store(&[unphased.clone(), unphased.clone()]), store(&[unphased.clone()])),
            (store(&[unphased.clone()]), store(&[unphased.clone(), unphased.clone()])),
        ];

        for (left, right) in &cases {
            for mode in [VariantEquality::PhaseInsensitive, VariantEquality::PhaseSensitive] {
                let inter = left.set_intersection(right, mode);
                let union = left.set_union(right, mode);
                let comp = left.set_complement(right, mode);
                assert_eq!(union.len(), left.len() + right.len() - inter.len());
                assert_eq!(comp.len(), left.len() - inter.len());
                assert_eq!(inter.len(), right.set_intersection(left, mode).len());
            }
        }

        let inter = store(&[g0.clone(), g1.clone()])
            .set_intersection(&store(&[g0.clone()]), VariantEquality::PhaseInsensitive);
        assert_eq!(inter.len(), 1);
        assert!(std::sync::Arc::ptr_eq(&inter.variants()[0], &g0));
    }
}
