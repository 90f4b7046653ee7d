//! Parsers for loading variant calls and reference sequences.
//!
//! This module provides parsers for:
//!
//! - **VCF files**: Load sample genotypes into a [`PopulationStore`](crate::store::PopulationStore)
//! - **FASTA files**: Load reference sequences for allele validation
//!
//! Both accept plain text and gzip/bgzip compressed input.
//!
//! ## Example
//!
//! ```rust,no_run
//! use variant_store::parsing::vcf::{parse_vcf_file, VcfOptions};
//! use variant_store::parsing::fasta::parse_fasta_file;
//! use std::path::Path;
//!
//! let population = parse_vcf_file(Path::new("calls.vcf.gz"), &VcfOptions::default()).unwrap();
//! let reference = parse_fasta_file(Path::new("ref.fa")).unwrap();
//! ```

use std::path::Path;
use thiserror::Error;

pub mod fasta;
pub mod vcf;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid format at line {line}: {message}")]
    InvalidFormat { line: usize, message: String },

    #[error("noodles error: {0}")]
    Noodles(String),
}

impl ParseError {
    pub(crate) fn invalid(line: usize, message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            line,
            message: message.into(),
        }
    }
}

/// Check if the path is a gzipped file
#[allow(clippy::case_sensitive_file_extension_comparisons)] // Already lowercased
pub(crate) fn is_gzipped(path: &Path) -> bool {
    let path_str = path.to_string_lossy().to_lowercase();
    path_str.ends_with(".gz") || path_str.ends_with(".bgz")
}
