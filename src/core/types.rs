use serde::{Deserialize, Serialize};

/// Identifier of a contig (chromosome or other sequence)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContigId(pub String);

impl ContigId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContigId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ContigId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Identifier of a genome (one sequenced sample)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GenomeId(pub String);

impl GenomeId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for GenomeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for GenomeId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Origin of a population's variant calls.
///
/// The store never interprets this tag; it selects which INFO fields a
/// frequency lookup reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    /// Plain VCF with a single `AF` field
    #[default]
    Generic,
    /// gnomAD style `AF_<population>` fields
    Gnomad,
    /// 1000 Genomes style `<population>_AF` fields
    ThousandGenomes,
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Generic => write!(f, "generic"),
            Self::Gnomad => write!(f, "gnomAD"),
            Self::ThousandGenomes => write!(f, "1000 Genomes"),
        }
    }
}

/// Haplotype assignment of a variant call
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// No haplotype grouping is known
    #[default]
    Unphased,
    /// Member of the given haplotype (0 = first copy, 1 = second copy)
    Haplotype(u8),
}

impl Phase {
    #[must_use]
    pub fn is_phased(self) -> bool {
        matches!(self, Self::Haplotype(_))
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unphased => write!(f, "."),
            Self::Haplotype(id) => write!(f, "{id}"),
        }
    }
}

/// How two records are compared in set algebra
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantEquality {
    /// Position and alleles only
    #[default]
    PhaseInsensitive,
    /// Position, alleles and phase
    PhaseSensitive,
}

/// Granularity at which a predicate leaf is evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Variant,
    Contig,
    Genome,
    Population,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::Unphased.to_string(), ".");
        assert_eq!(Phase::Haplotype(1).to_string(), "1");
        assert!(Phase::Haplotype(0).is_phased());
        assert!(!Phase::Unphased.is_phased());
    }

    #[test]
    fn test_granularity_order() {
        assert!(Granularity::Variant < Granularity::Contig);
        assert!(Granularity::Genome < Granularity::Population);
    }

    #[test]
    fn test_ids_order_by_name() {
        let mut ids = vec![GenomeId::new("HG02"), GenomeId::new("HG01")];
        ids.sort();
        assert_eq!(ids[0].as_str(), "HG01");
    }
}
