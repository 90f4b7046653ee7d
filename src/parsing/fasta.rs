//! Parser for reference FASTA files using noodles.
//!
//! Loads whole sequences into an [`InMemoryReference`] for allele validation.
//! Supports both uncompressed and gzip/bgzip compressed files.

use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use noodles::fasta;
use tracing::{debug, info};

use crate::core::external::InMemoryReference;
use crate::core::types::ContigId;
use crate::parsing::{is_gzipped, ParseError};

/// Parse a FASTA file into an in-memory reference.
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be read, `ParseError::Noodles` if
/// parsing fails, or `ParseError::InvalidFormat` if no sequences are found.
pub fn parse_fasta_file(path: &Path) -> Result<InMemoryReference, ParseError> {
    let file = std::fs::File::open(path)?;
    let reference = if is_gzipped(path) {
        parse_fasta_reader(BufReader::new(MultiGzDecoder::new(file)))?
    } else {
        parse_fasta_reader(BufReader::new(file))?
    };
    info!("Loaded {} sequences from {}", reference.len(), path.display());
    Ok(reference)
}

/// Parse FASTA text into an in-memory reference.
///
/// # Errors
///
/// Returns `ParseError::Noodles` if parsing fails or
/// `ParseError::InvalidFormat` if no sequences are found.
pub fn parse_fasta_text(text: &str) -> Result<InMemoryReference, ParseError> {
    parse_fasta_reader(text.as_bytes())
}

fn parse_fasta_reader<R: BufRead>(reader: R) -> Result<InMemoryReference, ParseError> {
    let mut fasta_reader = fasta::io::Reader::new(reader);
    let mut reference = InMemoryReference::new();

    for result in fasta_reader.records() {
        let record = result
            .map_err(|e| ParseError::Noodles(format!("Failed to parse FASTA record: {e}")))?;

        let name = String::from_utf8_lossy(record.name()).to_string();
        let sequence = record.sequence();
        debug!("Read sequence {} ({} bases)", name, sequence.len());
        reference.insert(ContigId::new(name), sequence.as_ref());
    }

    if reference.is_empty() {
        return Err(ParseError::invalid(0, "no sequences found in FASTA"));
    }

    Ok(reference)
}
