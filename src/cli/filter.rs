use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use crate::cli::{LoadArgs, OutputFormat};
use crate::core::external::InfoFrequencyOracle;
use crate::core::types::{ContigId, VariantEquality};
use crate::filter::engine::{EngineConfig, ParallelFilterEngine};
use crate::filter::leaves::{ContigIdFilter, GenomeListFilter, PassFilter, RegionFilter, SnpFilter};
use crate::filter::predicate::Predicate;
use crate::store::FilterCounts;

#[derive(Args)]
pub struct FilterArgs {
    /// Input VCF file
    #[arg(required = true)]
    pub input: PathBuf,

    /// Keep only this contig
    #[arg(long)]
    pub contig: Option<String>,

    /// Keep only calls in a region, `contig:start-end` (0-based, half-open)
    #[arg(long)]
    pub region: Option<String>,

    /// Keep only single base substitutions
    #[arg(long)]
    pub snp_only: bool,

    /// Keep only calls whose FILTER is PASS or missing
    #[arg(long)]
    pub pass_only: bool,

    /// Keep only these genomes (repeatable)
    #[arg(long = "genome")]
    pub genomes: Vec<String>,

    /// Keep the first call of each distinct variant per genome
    #[arg(long)]
    pub unique: bool,

    /// Treat calls on different haplotypes as distinct for --unique
    #[arg(long)]
    pub phase_sensitive: bool,

    /// Reconcile each offset to a plausible diploid call set
    #[arg(long)]
    pub diploid: bool,

    /// Population code used for allele frequency lookups with --diploid
    #[arg(long, default_value = "")]
    pub population_code: String,

    #[command(flatten)]
    pub load: LoadArgs,
}

/// Outcome of the filter and optional reconciliation steps
#[derive(Debug, Clone, serde::Serialize)]
pub struct FilterReport {
    pub genomes_before: usize,
    pub genomes_after: usize,
    pub filter: FilterCounts,
    pub diploid: Option<FilterCounts>,
}

pub fn run(args: FilterArgs, format: OutputFormat, verbose: bool, config: &EngineConfig) -> anyhow::Result<()> {
    let mut population = args.load.load(&args.input)?;
    let engine = ParallelFilterEngine::with_config(config.clone());
    let predicate = build_predicate(&args)?;

    if verbose {
        eprintln!("Predicate: {predicate:?}");
    }

    let genomes_before = population.genome_count();
    let filter = population.filter_in_place_with(&engine, &predicate);
    let diploid = args.diploid.then(|| {
        let oracle = InfoFrequencyOracle::new(population.data_source());
        population.reconcile_diploid_with(&engine, &oracle, &args.population_code)
    });

    let report = FilterReport {
        genomes_before,
        genomes_after: population.genome_count(),
        filter,
        diploid,
    };

    match format {
        OutputFormat::Text => print_text_report(&report),
        OutputFormat::Json => print_json_report(&report)?,
        OutputFormat::Tsv => print_tsv_report(&report),
    }

    Ok(())
}

/// AND of every requested condition; `AlwaysTrue` when none are given
pub fn build_predicate(args: &FilterArgs) -> anyhow::Result<Predicate> {
    let mut conditions = Vec::new();

    if let Some(contig) = &args.contig {
        conditions.push(Predicate::contig(ContigIdFilter(ContigId::new(contig.clone()))));
    }
    if let Some(region) = &args.region {
        conditions.push(Predicate::variant(parse_region(region)?));
    }
    if args.snp_only {
        conditions.push(Predicate::variant(SnpFilter));
    }
    if args.pass_only {
        conditions.push(Predicate::variant(PassFilter));
    }
    if !args.genomes.is_empty() {
        conditions.push(Predicate::genome(GenomeListFilter::new(args.genomes.iter().cloned())));
    }
    if args.unique {
        let mode = if args.phase_sensitive {
            VariantEquality::PhaseSensitive
        } else {
            VariantEquality::PhaseInsensitive
        };
        conditions.push(Predicate::unique(mode));
    }

    Ok(conditions
        .into_iter()
        .reduce(Predicate::and)
        .unwrap_or(Predicate::AlwaysTrue))
}

/// Parse `contig:start-end`
///
/// # Errors
///
/// Returns an error if the region is malformed or empty.
pub fn parse_region(region: &str) -> anyhow::Result<RegionFilter> {
    let (contig, span) = region
        .rsplit_once(':')
        .ok_or_else(|| anyhow::anyhow!("Region '{}' must look like contig:start-end", region))?;
    let (start, end) = span
        .split_once('-')
        .ok_or_else(|| anyhow::anyhow!("Region '{}' must look like contig:start-end", region))?;
    let start: u64 = start
        .replace(',', "")
        .parse()
        .with_context(|| format!("Invalid region start in '{region}'"))?;
    let end: u64 = end
        .replace(',', "")
        .parse()
        .with_context(|| format!("Invalid region end in '{region}'"))?;
    if contig.is_empty() || start >= end {
        anyhow::bail!("Region '{}' is empty", region);
    }
    Ok(RegionFilter::new(contig, start, end))
}

fn print_text_report(report: &FilterReport) {
    println!("Filter Results");
    println!("{}", "=".repeat(60));
    println!("  Genomes: {} -> {}", report.genomes_before, report.genomes_after);
    println!(
        "  Calls: {} -> {} ({} removed)",
        report.filter.before,
        report.filter.after,
        report.filter.removed()
    );
    if let Some(diploid) = &report.diploid {
        println!(
            "  Diploid reconciliation: {} -> {} ({} removed)",
            diploid.before,
            diploid.after,
            diploid.removed()
        );
    }
}

fn print_json_report(report: &FilterReport) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

fn print_tsv_report(report: &FilterReport) {
    println!("step\tbefore\tafter\tremoved");
    println!(
        "filter\t{}\t{}\t{}",
        report.filter.before,
        report.filter.after,
        report.filter.removed()
    );
    if let Some(diploid) = &report.diploid {
        println!(
            "diploid\t{}\t{}\t{}",
            diploid.before,
            diploid.after,
            diploid.removed()
        );
    }
}
