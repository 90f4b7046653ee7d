//! Command-line interface for variant-store.
//!
//! This module implements the CLI using clap. Available commands:
//!
//! - **summary**: Count genomes, contigs and calls in one or more VCFs
//! - **query**: List the calls of one genome in a contig window
//! - **filter**: Apply predicates and report before/after counts
//! - **compare**: Set algebra between the calls of two genomes
//! - **validate**: Check reference alleles against a FASTA
//!
//! ## Usage
//!
//! ```text
//! # Overview of a cohort VCF
//! variant-store summary cohort.vcf.gz
//!
//! # Calls on the first haplotype of HG01 in chr1:10000-20000
//! variant-store query cohort.vcf.gz --genome HG01 --contig chr1 --start 10000 --end 20000 --haplotype 0
//!
//! # Passing SNPs, reconciled to a diploid call set using gnomAD NFE frequencies
//! variant-store filter gnomad.vcf.gz --data-source gnomad --snp-only --pass-only --diploid --population-code nfe
//!
//! # JSON output for scripting
//! variant-store --format json compare cohort.vcf.gz --genome-a HG01 --genome-b HG02
//! ```

use std::path::Path;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};

use crate::core::types::{DataSource, GenomeId};
use crate::filter::engine::EngineConfig;
use crate::parsing::vcf::{parse_vcf_file, VcfOptions};
use crate::store::PopulationStore;

pub mod compare;
pub mod filter;
pub mod query;
pub mod summary;
pub mod validate;

#[derive(Parser)]
#[command(name = "variant-store")]
#[command(author = "Fulcrum Genomics")]
#[command(version)]
#[command(about = "Load, query and filter population variant calls in memory")]
#[command(
    long_about = "variant-store loads VCF genotypes into a hierarchical in-memory store (population, genome, contig, offset).\n\nIt provides:\n- Windowed queries that respect phase and overlapping deletions\n- Composable filters evaluated in parallel across genomes\n- Diploid reconciliation using population allele frequencies\n- Set algebra between genomes and reference allele validation"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Maximum worker threads (defaults to available parallelism)
    #[arg(short, long, global = true)]
    pub threads: Option<usize>,
}

impl Cli {
    #[must_use]
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            max_threads: self.threads,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Summarize the genomes and calls in VCF files
    Summary(summary::SummaryArgs),

    /// Show the calls of a genome in a contig window
    Query(query::QueryArgs),

    /// Filter calls and report what was kept
    Filter(filter::FilterArgs),

    /// Compare the calls of two genomes
    Compare(compare::CompareArgs),

    /// Validate reference alleles against a FASTA
    Validate(validate::ValidateArgs),
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Tsv,
}

/// Options shared by every command that loads a VCF
#[derive(Args, Debug, Clone)]
pub struct LoadArgs {
    /// Frequency field convention of the VCF
    #[arg(long, value_enum, default_value = "generic")]
    pub data_source: DataSource,

    /// Population id assigned to the loaded calls
    #[arg(long, default_value = "population")]
    pub population_id: String,

    /// Genome receiving the calls of a sites-only VCF
    #[arg(long, default_value = "sites")]
    pub sites_genome: String,
}

impl LoadArgs {
    fn options(&self) -> VcfOptions {
        VcfOptions {
            population_id: self.population_id.clone(),
            data_source: self.data_source,
            sites_genome: GenomeId::new(self.sites_genome.clone()),
        }
    }

    /// Load a VCF with these options
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(&self, path: &Path) -> anyhow::Result<PopulationStore> {
        parse_vcf_file(path, &self.options())
            .with_context(|| format!("Failed to load {}", path.display()))
    }
}
