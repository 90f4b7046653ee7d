use std::collections::BTreeSet;
use std::path::PathBuf;

use clap::Args;

use crate::cli::{LoadArgs, OutputFormat};
use crate::filter::engine::{EngineConfig, ParallelFilterEngine};
use crate::store::{GenomeStore, PopulationStore};

#[derive(Args)]
pub struct SummaryArgs {
    /// Input VCF files (plain or gzip compressed)
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    #[command(flatten)]
    pub load: LoadArgs,
}

/// Counts reported for one input file
#[derive(Debug, Clone, serde::Serialize)]
pub struct Summary {
    pub path: String,
    pub genomes: usize,
    pub contigs: usize,
    pub variants: usize,
    pub distinct_variants: usize,
}

impl Summary {
    fn of(path: &std::path::Path, population: &PopulationStore, engine: &ParallelFilterEngine) -> Self {
        let contigs: BTreeSet<_> = population.with_genomes(|genomes| {
            genomes
                .values()
                .flat_map(GenomeStore::contig_ids)
                .collect()
        });
        let distinct = population.unique_genome_of_distinct_variants_with(engine);
        Self {
            path: path.display().to_string(),
            genomes: population.genome_count(),
            contigs: contigs.len(),
            variants: engine.variant_count(population),
            distinct_variants: engine.variant_count(&distinct),
        }
    }
}

pub fn run(args: SummaryArgs, format: OutputFormat, verbose: bool, config: &EngineConfig) -> anyhow::Result<()> {
    let engine = ParallelFilterEngine::with_config(config.clone());

    let mut summaries = Vec::with_capacity(args.inputs.len());
    for path in &args.inputs {
        let population = args.load.load(path)?;
        if verbose {
            eprintln!("Loaded {}: {} genomes", path.display(), population.genome_count());
        }
        summaries.push(Summary::of(path, &population, &engine));
    }

    match format {
        OutputFormat::Text => print_text_summaries(&summaries),
        OutputFormat::Json => print_json_summaries(&summaries)?,
        OutputFormat::Tsv => print_tsv_summaries(&summaries),
    }

    Ok(())
}

fn print_text_summaries(summaries: &[Summary]) {
    for summary in summaries {
        println!("{}", summary.path);
        println!("  Genomes: {}", summary.genomes);
        println!("  Contigs: {}", summary.contigs);
        println!("  Variants: {}", summary.variants);
        println!("  Distinct variants: {}", summary.distinct_variants);
    }
}

fn print_json_summaries(summaries: &[Summary]) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(summaries)?);
    Ok(())
}

fn print_tsv_summaries(summaries: &[Summary]) {
    println!("path\tgenomes\tcontigs\tvariants\tdistinct_variants");
    for summary in summaries {
        println!(
            "{}\t{}\t{}\t{}\t{}",
            summary.path, summary.genomes, summary.contigs, summary.variants, summary.distinct_variants
        );
    }
}
