use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use crate::cli::{LoadArgs, OutputFormat};
use crate::filter::engine::{EngineConfig, ParallelFilterEngine};
use crate::parsing::fasta::parse_fasta_file;
use crate::store::ValidationCounts;

#[derive(Args)]
pub struct ValidateArgs {
    /// Input VCF file
    #[arg(required = true)]
    pub input: PathBuf,

    /// Reference FASTA (plain or gzip compressed)
    #[arg(short, long)]
    pub reference: PathBuf,

    /// Exit with an error if any reference allele mismatches
    #[arg(long)]
    pub strict: bool,

    #[command(flatten)]
    pub load: LoadArgs,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct GenomeValidation {
    pub genome: String,
    #[serde(flatten)]
    pub counts: ValidationCounts,
    pub mismatched: usize,
}

pub fn run(args: ValidateArgs, format: OutputFormat, verbose: bool, config: &EngineConfig) -> anyhow::Result<()> {
    let population = args.load.load(&args.input)?;
    let reference = parse_fasta_file(&args.reference)
        .with_context(|| format!("Failed to load reference {}", args.reference.display()))?;

    if verbose {
        eprintln!("Reference: {} sequences", reference.len());
    }

    let engine = ParallelFilterEngine::with_config(config.clone());
    let mut results: Vec<GenomeValidation> = engine.map_genomes(&population, |genome| {
        let counts = genome.validate(&reference);
        GenomeValidation {
            genome: genome.genome_id().to_string(),
            counts,
            mismatched: counts.mismatched(),
        }
    });
    results.sort_by(|a, b| a.genome.cmp(&b.genome));

    match format {
        OutputFormat::Text => print_text_validation(&results),
        OutputFormat::Json => print_json_validation(&results)?,
        OutputFormat::Tsv => print_tsv_validation(&results),
    }

    let mismatched: usize = results.iter().map(|r| r.mismatched).sum();
    if args.strict && mismatched > 0 {
        anyhow::bail!("{} calls do not match the reference", mismatched);
    }
    Ok(())
}

fn print_text_validation(results: &[GenomeValidation]) {
    println!("Validation Results");
    println!("{}", "=".repeat(60));
    for result in results {
        println!(
            "  {}: {} of {} calls match the reference ({} mismatched)",
            result.genome, result.counts.matched, result.counts.examined, result.mismatched
        );
    }
}

fn print_json_validation(results: &[GenomeValidation]) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(results)?);
    Ok(())
}

fn print_tsv_validation(results: &[GenomeValidation]) {
    println!("genome\texamined\tmatched\tmismatched");
    for result in results {
        println!(
            "{}\t{}\t{}\t{}",
            result.genome, result.counts.examined, result.counts.matched, result.mismatched
        );
    }
}
