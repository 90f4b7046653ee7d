//! Centralized validation and helper functions.

/// Maximum number of samples allowed in a single VCF (DOS protection)
pub const MAX_SAMPLES: usize = 100_000;

/// Maximum allele length accepted from input files
pub const MAX_ALLELE_LENGTH: usize = 1_000_000;

/// Validate that a string is a plain nucleotide allele.
///
/// # Examples
///
/// ```
/// use variant_store::utils::validation::is_valid_allele;
///
/// assert!(is_valid_allele("ACGT"));
/// assert!(is_valid_allele("acgtn"));
/// assert!(!is_valid_allele(""));
/// assert!(!is_valid_allele("<DEL>"));
/// ```
#[must_use]
pub fn is_valid_allele(s: &str) -> bool {
    !s.is_empty()
        && s.len() <= MAX_ALLELE_LENGTH
        && s.bytes()
            .all(|b| matches!(b.to_ascii_uppercase(), b'A' | b'C' | b'G' | b'T' | b'N'))
}

/// Normalize an allele to uppercase.
/// Returns None if the input is not a valid allele.
#[must_use]
pub fn normalize_allele(s: &str) -> Option<String> {
    if is_valid_allele(s) {
        Some(s.to_ascii_uppercase())
    } else {
        None
    }
}

/// Symbolic, breakend and overlapping-deletion alleles carry no literal
/// sequence and are not stored.
///
/// # Examples
///
/// ```
/// use variant_store::utils::validation::is_symbolic_allele;
///
/// assert!(is_symbolic_allele("<DUP>"));
/// assert!(is_symbolic_allele("G]17:198982]"));
/// assert!(is_symbolic_allele("*"));
/// assert!(!is_symbolic_allele("GA"));
/// ```
#[must_use]
pub fn is_symbolic_allele(s: &str) -> bool {
    s == "*" || s.starts_with('<') || s.contains('[') || s.contains(']')
}

/// Check if adding another sample would exceed the maximum allowed.
///
/// Call this with the current count BEFORE adding a new sample.
/// Returns an error message if adding would exceed the limit, None if safe to add.
#[must_use]
pub fn check_sample_limit(count: usize) -> Option<String> {
    if count >= MAX_SAMPLES {
        Some(format!(
            "Too many samples: adding another would exceed maximum of {MAX_SAMPLES}"
        ))
    } else {
        None
    }
}
