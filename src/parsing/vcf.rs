//! Parser for VCF variant calls.
//!
//! Each sample column becomes one genome. For every sample, each non-reference
//! allele index in `GT` yields one record:
//!
//! | Genotype | Records |
//! |----------|---------|
//! | `0/1` | alt 1, unphased |
//! | `1|2` | alt 1 on haplotype 0, alt 2 on haplotype 1 |
//! | `./.`, `0|0` | none |
//!
//! Sites-only files (no sample columns) load every ALT allele into a single
//! caller-named genome. Symbolic alleles are skipped.
//!
//! Supports plain text and gzip/bgzip compressed files. Records are read
//! with the noodles VCF reader; INFO values are kept as text evidence.

use std::collections::HashMap;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use flate2::read::MultiGzDecoder;
use noodles::vcf;
use noodles::vcf::variant::record::samples::keys::key;
use noodles::vcf::variant::record::samples::series::value::genotype::Phasing;
use noodles::vcf::variant::record_buf::info::field::value::Array as InfoArray;
use noodles::vcf::variant::record_buf::info::field::Value as InfoValue;
use noodles::vcf::variant::record_buf::samples::sample::value::genotype::Genotype;
use noodles::vcf::variant::record_buf::samples::sample::Value as SampleValue;
use noodles::vcf::variant::RecordBuf;
use tracing::{debug, info};

use crate::core::types::{ContigId, DataSource, GenomeId, Phase};
use crate::core::variant::{Evidence, VariantHandle, VariantRecord};
use crate::parsing::{is_gzipped, ParseError};
use crate::store::PopulationStore;
use crate::utils::validation::{check_sample_limit, is_symbolic_allele, normalize_allele};

/// How a VCF maps onto a population
#[derive(Debug, Clone)]
pub struct VcfOptions {
    /// Id of the population the file is loaded into
    pub population_id: String,

    /// Frequency field convention of the file
    pub data_source: DataSource,

    /// Genome receiving the calls of a sites-only file
    pub sites_genome: GenomeId,
}

impl Default for VcfOptions {
    fn default() -> Self {
        Self {
            population_id: "population".to_string(),
            data_source: DataSource::Generic,
            sites_genome: GenomeId::new("sites"),
        }
    }
}

/// Parse a VCF file into a population, one genome per sample
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be read, `ParseError::Noodles`
/// for an invalid header, or `ParseError::InvalidFormat` for malformed records.
pub fn parse_vcf_file(path: &Path, options: &VcfOptions) -> Result<PopulationStore, ParseError> {
    let file = std::fs::File::open(path)?;
    let population = if is_gzipped(path) {
        parse_vcf_reader(BufReader::new(MultiGzDecoder::new(file)), options)?
    } else {
        parse_vcf_reader(BufReader::new(file), options)?
    };
    info!(
        "Loaded {} calls for {} genomes from {}",
        population.variant_count(),
        population.genome_count(),
        path.display()
    );
    Ok(population)
}

/// Parse VCF text into a population
///
/// # Errors
///
/// Returns `ParseError::Noodles` for an invalid header, or
/// `ParseError::InvalidFormat` for malformed records.
pub fn parse_vcf_text(text: &str, options: &VcfOptions) -> Result<PopulationStore, ParseError> {
    parse_vcf_reader(text.as_bytes(), options)
}

/// Parse a VCF stream from any buffered reader
///
/// # Errors
///
/// Returns `ParseError::Io` on read failure, `ParseError::Noodles` for an
/// invalid header, or `ParseError::InvalidFormat` for malformed records.
pub fn parse_vcf_reader<R: BufRead>(reader: R, options: &VcfOptions) -> Result<PopulationStore, ParseError> {
    let mut reader = vcf::io::Reader::new(LineCounter::new(reader));
    let header = reader
        .read_header()
        .map_err(|e| ParseError::Noodles(format!("Failed to read VCF header: {e}")))?;

    let mut population = PopulationStore::new(options.population_id.clone(), options.data_source);
    let samples = sample_genomes(&header, reader.get_ref().consumed_lines())?;
    let sites_only = samples.is_empty();
    let targets = if sites_only {
        population.get_or_create_genome(&options.sites_genome);
        vec![options.sites_genome.clone()]
    } else {
        for genome_id in &samples {
            population.get_or_create_genome(genome_id);
        }
        samples
    };

    let mut record = RecordBuf::default();
    loop {
        let line_number = reader.get_ref().consumed_lines() + 1;
        match reader.read_record_buf(&header, &mut record) {
            Ok(0) => break,
            Ok(_) => add_record(&record, line_number, &targets, sites_only, &population)?,
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                return Err(ParseError::invalid(line_number, e.to_string()));
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(population)
}

/// Sample genome ids from the header; empty for a sites-only file
fn sample_genomes(header: &vcf::Header, header_line: usize) -> Result<Vec<GenomeId>, ParseError> {
    let names = header.sample_names();
    if let Some(message) = check_sample_limit(names.len().saturating_sub(1)) {
        return Err(ParseError::invalid(header_line, message));
    }
    debug!("VCF header lists {} samples", names.len());
    Ok(names.iter().map(|name| GenomeId::new(name.as_str())).collect())
}

fn add_record(
    record: &RecordBuf,
    line_number: usize,
    genomes: &[GenomeId],
    sites_only: bool,
    population: &PopulationStore,
) -> Result<(), ParseError> {
    let contig_id = ContigId::new(record.reference_sequence_name());
    let position = record
        .variant_start()
        .ok_or_else(|| ParseError::invalid(line_number, "POS must be 1-based"))?;
    let offset = position.get() as u64 - 1;

    let reference = normalize_allele(record.reference_bases()).ok_or_else(|| {
        ParseError::invalid(line_number, format!("invalid REF allele '{}'", record.reference_bases()))
    })?;

    let alternate_bases: &[String] = record.alternate_bases().as_ref();
    if alternate_bases.is_empty() {
        return Ok(());
    }
    let mut alternates = Vec::with_capacity(alternate_bases.len());
    for alt in alternate_bases {
        if is_symbolic_allele(alt) {
            alternates.push(None);
            continue;
        }
        let alt = normalize_allele(alt)
            .ok_or_else(|| ParseError::invalid(line_number, format!("invalid ALT allele '{alt}'")))?;
        alternates.push(Some(alt));
    }

    let info = info_pairs(record);
    let filter = filter_text(record);
    let mut handles: HashMap<(usize, Phase), VariantHandle> = HashMap::new();
    let mut call = |allele_index: usize, phase: Phase| -> Option<VariantHandle> {
        let alternate = alternates.get(allele_index)?.as_ref()?;
        let handle = handles.entry((allele_index, phase)).or_insert_with(|| {
            let evidence = Evidence {
                info: info.clone(),
                filter: filter.clone(),
                allele_index,
            };
            VariantRecord::with_evidence(
                contig_id.clone(),
                offset,
                reference.clone(),
                alternate.clone(),
                phase,
                Arc::new(evidence),
            )
            .into_handle()
        });
        Some(handle.clone())
    };

    if sites_only {
        for allele_index in 0..alternates.len() {
            if let Some(record) = call(allele_index, Phase::Unphased) {
                population.add_variant(record, genomes);
            }
        }
        return Ok(());
    }

    let samples = record.samples();
    let Some(series) = samples.select(key::GENOTYPE) else {
        debug!("Line {}: no GT field, skipping", line_number);
        return Ok(());
    };

    for (index, genome_id) in genomes.iter().enumerate() {
        let genotype = match series.get(index) {
            Some(Some(SampleValue::Genotype(genotype))) => genotype.clone(),
            Some(Some(SampleValue::String(text))) => Genotype::from_str(text).map_err(|e| {
                ParseError::invalid(line_number, format!("invalid genotype '{text}' for {genome_id}: {e}"))
            })?,
            _ => continue,
        };

        let alleles = genotype.as_ref();
        let phased = alleles.iter().any(|allele| allele.phasing() == Phasing::Phased);
        for (haplotype, allele) in alleles.iter().enumerate() {
            let Some(allele) = allele.position() else {
                continue;
            };
            if allele == 0 {
                continue;
            }
            if allele > alternates.len() {
                return Err(ParseError::invalid(
                    line_number,
                    format!("genotype for {genome_id} refers to missing allele {allele}"),
                ));
            }
            let phase = if phased {
                let haplotype = u8::try_from(haplotype).map_err(|_| {
                    ParseError::invalid(line_number, format!("too many haplotypes for {genome_id}"))
                })?;
                Phase::Haplotype(haplotype)
            } else {
                Phase::Unphased
            };
            if let Some(record) = call(allele - 1, phase) {
                population.add_variant(record, std::slice::from_ref(genome_id));
            }
        }
    }
    Ok(())
}

/// INFO fields as key/value text; flags and missing values get an empty value
fn info_pairs(record: &RecordBuf) -> Vec<(String, String)> {
    record
        .info()
        .as_ref()
        .iter()
        .map(|(key, value)| (key.clone(), value.as_ref().map(info_value_text).unwrap_or_default()))
        .collect()
}

fn info_value_text(value: &InfoValue) -> String {
    match value {
        InfoValue::Integer(n) => n.to_string(),
        InfoValue::Float(n) => n.to_string(),
        InfoValue::Flag => String::new(),
        InfoValue::Character(c) => c.to_string(),
        InfoValue::String(s) => s.clone(),
        InfoValue::Array(InfoArray::Integer(values)) => join_values(values),
        InfoValue::Array(InfoArray::Float(values)) => join_values(values),
        InfoValue::Array(InfoArray::Character(values)) => join_values(values),
        InfoValue::Array(InfoArray::String(values)) => join_values(values),
    }
}

fn join_values<T: ToString>(values: &[Option<T>]) -> String {
    values
        .iter()
        .map(|value| value.as_ref().map_or_else(|| ".".to_string(), ToString::to_string))
        .collect::<Vec<_>>()
        .join(",")
}

/// FILTER column text: `.` when missing, otherwise `;`-joined
fn filter_text(record: &RecordBuf) -> String {
    let filters = record.filters().as_ref();
    if filters.is_empty() {
        ".".to_string()
    } else {
        filters.iter().map(String::as_str).collect::<Vec<_>>().join(";")
    }
}

/// Counts the lines consumed from the wrapped reader
struct LineCounter<R> {
    inner: R,
    lines: usize,
}

impl<R: BufRead> LineCounter<R> {
    fn new(inner: R) -> Self {
        Self { inner, lines: 0 }
    }

    fn consumed_lines(&self) -> usize {
        self.lines
    }

    fn count(bytes: &[u8]) -> usize {
        bytes.iter().filter(|&&b| b == b'\n').count()
    }
}

impl<R: BufRead> Read for LineCounter<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.lines += Self::count(&buf[..n]);
        Ok(n)
    }
}

impl<R: BufRead> BufRead for LineCounter<R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.inner.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        if let Ok(buf) = self.inner.fill_buf() {
            self.lines += Self::count(&buf[..amt.min(buf.len())]);
        }
        self.inner.consume(amt);
    }
}
