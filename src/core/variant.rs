use serde::Serialize;
use std::sync::Arc;

use crate::core::types::{ContigId, Phase, VariantEquality};

/// Shared, read-only handle to a variant call.
///
/// Containers and set-algebra results clone the handle, never the record.
pub type VariantHandle = Arc<VariantRecord>;

/// Evidence carried with a variant call.
///
/// The store treats this as opaque. Collaborators such as frequency lookups
/// read the INFO pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Evidence {
    /// INFO key/value pairs in file order (flags have an empty value)
    pub info: Vec<(String, String)>,

    /// FILTER column value ("PASS", "." or a list of failed filters)
    pub filter: String,

    /// 0-based index of the alternate allele among the site's ALT alleles
    pub allele_index: usize,
}

impl Evidence {
    /// Look up an INFO value by key
    #[must_use]
    pub fn info(&self, key: &str) -> Option<&str> {
        self.info
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        self.filter == "PASS" || self.filter == "."
    }
}

/// A single immutable variant call anchored at a 0-based contig offset
#[derive(Debug, Clone, Serialize)]
pub struct VariantRecord {
    contig_id: ContigId,
    offset: u64,
    reference: String,
    alternate: String,
    phase: Phase,
    #[serde(skip)]
    evidence: Arc<Evidence>,
    identity: String,
}

impl VariantRecord {
    pub fn new(
        contig_id: ContigId,
        offset: u64,
        reference: impl Into<String>,
        alternate: impl Into<String>,
        phase: Phase,
    ) -> Self {
        Self::with_evidence(
            contig_id,
            offset,
            reference,
            alternate,
            phase,
            Arc::new(Evidence::default()),
        )
    }

    pub fn with_evidence(
        contig_id: ContigId,
        offset: u64,
        reference: impl Into<String>,
        alternate: impl Into<String>,
        phase: Phase,
        evidence: Arc<Evidence>,
    ) -> Self {
        let reference = reference.into();
        let alternate = alternate.into();
        let identity = format!("{contig_id}:{offset}:{reference}>{alternate}");
        Self {
            contig_id,
            offset,
            reference,
            alternate,
            phase,
            evidence,
            identity,
        }
    }

    /// Copy of this record assigned to another phase; evidence stays shared
    #[must_use]
    pub fn with_phase(&self, phase: Phase) -> Self {
        Self {
            phase,
            ..self.clone()
        }
    }

    /// Wrap into a shareable handle
    #[must_use]
    pub fn into_handle(self) -> VariantHandle {
        Arc::new(self)
    }

    #[must_use]
    pub fn contig_id(&self) -> &ContigId {
        &self.contig_id
    }

    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    #[must_use]
    pub fn reference(&self) -> &str {
        &self.reference
    }

    #[must_use]
    pub fn alternate(&self) -> &str {
        &self.alternate
    }

    #[must_use]
    pub fn reference_length(&self) -> u64 {
        self.reference.len() as u64
    }

    #[must_use]
    pub fn alternate_length(&self) -> u64 {
        self.alternate.len() as u64
    }

    /// First coordinate past the reference span
    #[must_use]
    pub fn end(&self) -> u64 {
        self.offset + self.reference_length()
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn evidence(&self) -> &Evidence {
        &self.evidence
    }

    /// Single base substitution
    #[must_use]
    pub fn is_snp(&self) -> bool {
        self.reference.len() == 1 && self.alternate.len() == 1
    }

    #[must_use]
    pub fn is_indel(&self) -> bool {
        self.reference.len() != self.alternate.len()
    }

    /// Bases removed (positive) or inserted (negative) by this call
    #[must_use]
    pub fn length_delta(&self) -> i64 {
        i64::try_from(self.reference.len()).unwrap_or(i64::MAX)
            - i64::try_from(self.alternate.len()).unwrap_or(i64::MAX)
    }

    /// Phase-insensitive canonical identity, `contig:offset:REF>ALT`
    #[must_use]
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Phase-sensitive canonical identity, `contig:offset:REF>ALT:phase`
    #[must_use]
    pub fn phased_identity(&self) -> String {
        format!("{}:{}", self.identity, self.phase)
    }

    /// Compact 16 byte digest of the phase-insensitive identity
    #[must_use]
    pub fn identity_digest(&self) -> [u8; 16] {
        md5::compute(self.identity.as_bytes()).0
    }

    /// Same position and alleles; evidence is ignored
    #[must_use]
    pub fn is_analogous(&self, other: &VariantRecord) -> bool {
        self.identity == other.identity
    }

    /// Record equality under the given comparison mode
    #[must_use]
    pub fn equals(&self, other: &VariantRecord, mode: VariantEquality) -> bool {
        match mode {
            VariantEquality::PhaseInsensitive => self.is_analogous(other),
            VariantEquality::PhaseSensitive => {
                self.is_analogous(other) && self.phase == other.phase
            }
        }
    }
}

impl std::fmt::Display for VariantRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.identity, self.phase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snp(offset: u64, alt: &str, phase: Phase) -> VariantRecord {
        VariantRecord::new(ContigId::new("chr1"), offset, "A", alt, phase)
    }

    #[test]
    fn test_identity_formats() {
        let record = snp(100, "G", Phase::Haplotype(1));
        assert_eq!(record.identity(), "chr1:100:A>G");
        assert_eq!(record.phased_identity(), "chr1:100:A>G:1");
    }

    #[test]
    fn test_analogous_ignores_phase_and_evidence() {
        let a = snp(100, "G", Phase::Haplotype(0));
        let evidence = Arc::new(Evidence {
            info: vec![("AF".to_string(), "0.5".to_string())],
            filter: "PASS".to_string(),
            allele_index: 0,
        });
        let b = VariantRecord::with_evidence(
            ContigId::new("chr1"),
            100,
            "A",
            "G",
            Phase::Haplotype(1),
            evidence,
        );
        assert!(a.is_analogous(&b));
        assert!(a.equals(&b, VariantEquality::PhaseInsensitive));
        assert!(!a.equals(&b, VariantEquality::PhaseSensitive));
        assert!(!a.is_analogous(&snp(100, "T", Phase::Haplotype(0))));
    }

    #[test]
    fn test_with_phase_shares_evidence() {
        let record = snp(5, "C", Phase::Haplotype(0));
        let unphased = record.with_phase(Phase::Unphased);
        assert_eq!(unphased.phase(), Phase::Unphased);
        assert!(Arc::ptr_eq(&record.evidence, &unphased.evidence));
        assert_eq!(record.identity_digest(), unphased.identity_digest());
    }

    #[test]
    fn test_lengths() {
        let deletion = VariantRecord::new(ContigId::new("chr1"), 95, "ACGTA", "A", Phase::Unphased);
        assert_eq!(deletion.reference_length(), 5);
        assert_eq!(deletion.alternate_length(), 1);
        assert_eq!(deletion.length_delta(), 4);
        assert_eq!(deletion.end(), 100);
        assert!(deletion.is_indel());
        assert!(!deletion.is_snp());
        assert!(snp(1, "T", Phase::Unphased).is_snp());
    }

    #[test]
    fn test_evidence_lookup() {
        let evidence = Evidence {
            info: vec![
                ("DP".to_string(), "30".to_string()),
                ("DB".to_string(), String::new()),
            ],
            filter: "PASS".to_string(),
            allele_index: 0,
        };
        assert_eq!(evidence.info("DP"), Some("30"));
        assert_eq!(evidence.info("DB"), Some(""));
        assert_eq!(evidence.info("AF"), None);
        assert!(evidence.passed());
    }
}
