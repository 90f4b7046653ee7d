use std::collections::BTreeSet;
use std::path::PathBuf;

use clap::Args;

use crate::cli::{LoadArgs, OutputFormat};
use crate::core::types::{ContigId, GenomeId, VariantEquality};
use crate::filter::engine::EngineConfig;
use crate::store::{ContigStore, GenomeStore, PopulationStore};

#[derive(Args)]
pub struct CompareArgs {
    /// Input VCF file
    #[arg(required = true)]
    pub input: PathBuf,

    /// First genome
    #[arg(long)]
    pub genome_a: String,

    /// Second genome
    #[arg(long)]
    pub genome_b: String,

    /// Calls on different haplotypes are different variants
    #[arg(long)]
    pub phase_sensitive: bool,

    #[command(flatten)]
    pub load: LoadArgs,
}

/// Set algebra sizes for one contig, or for all contigs summed
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ContigComparison {
    pub contig: String,
    pub a: usize,
    pub b: usize,
    pub intersection: usize,
    pub union: usize,
    pub a_only: usize,
    pub b_only: usize,
}

impl ContigComparison {
    fn of(contig_id: &ContigId, a: &ContigStore, b: &ContigStore, mode: VariantEquality) -> Self {
        Self {
            contig: contig_id.to_string(),
            a: a.variant_count(),
            b: b.variant_count(),
            intersection: a.set_intersection(b, mode).variant_count(),
            union: a.set_union(b, mode).variant_count(),
            a_only: a.set_complement(b, mode).variant_count(),
            b_only: b.set_complement(a, mode).variant_count(),
        }
    }

    fn add(&mut self, other: &ContigComparison) {
        self.a += other.a;
        self.b += other.b;
        self.intersection += other.intersection;
        self.union += other.union;
        self.a_only += other.a_only;
        self.b_only += other.b_only;
    }
}

pub fn run(args: CompareArgs, format: OutputFormat, verbose: bool, _config: &EngineConfig) -> anyhow::Result<()> {
    let population = args.load.load(&args.input)?;
    let mode = if args.phase_sensitive {
        VariantEquality::PhaseSensitive
    } else {
        VariantEquality::PhaseInsensitive
    };

    let genome_a = take_genome(&population, &args.genome_a)?;
    let genome_b = take_genome(&population, &args.genome_b)?;

    if verbose {
        eprintln!(
            "Genome {}: {} calls, genome {}: {} calls",
            args.genome_a,
            genome_a.variant_count(),
            args.genome_b,
            genome_b.variant_count()
        );
    }

    let comparisons = compare_genomes(&genome_a, &genome_b, mode);

    match format {
        OutputFormat::Text => print_text_comparison(&args, &comparisons),
        OutputFormat::Json => print_json_comparison(&args, mode, &comparisons)?,
        OutputFormat::Tsv => print_tsv_comparison(&comparisons),
    }

    Ok(())
}

fn take_genome(population: &PopulationStore, name: &str) -> anyhow::Result<GenomeStore> {
    population
        .with_genome(&GenomeId::new(name), GenomeStore::clone)
        .ok_or_else(|| anyhow::anyhow!("Genome '{}' not found", name))
}

/// Per-contig comparison over the union of both genomes' contigs, followed by
/// a total row
#[must_use]
pub fn compare_genomes(a: &GenomeStore, b: &GenomeStore, mode: VariantEquality) -> Vec<ContigComparison> {
    let contig_ids: BTreeSet<ContigId> = a.contig_ids().into_iter().chain(b.contig_ids()).collect();

    let mut total = ContigComparison {
        contig: "total".to_string(),
        ..ContigComparison::default()
    };
    let mut rows = Vec::with_capacity(contig_ids.len() + 1);
    for contig_id in &contig_ids {
        let left = a
            .with_contig(contig_id, ContigStore::clone)
            .unwrap_or_else(|| ContigStore::new(contig_id.clone()));
        let right = b
            .with_contig(contig_id, ContigStore::clone)
            .unwrap_or_else(|| ContigStore::new(contig_id.clone()));
        let row = ContigComparison::of(contig_id, &left, &right, mode);
        total.add(&row);
        rows.push(row);
    }
    rows.push(total);
    rows
}

fn print_text_comparison(args: &CompareArgs, comparisons: &[ContigComparison]) {
    println!("Comparison Results");
    println!("{}", "=".repeat(60));
    println!("\nGenome A: {}", args.genome_a);
    println!("Genome B: {}", args.genome_b);
    println!("Phase sensitive: {}", args.phase_sensitive);

    for row in comparisons {
        println!("\n{}:", row.contig);
        println!("  A: {}  B: {}", row.a, row.b);
        println!("  Shared: {}", row.intersection);
        println!("  Union: {}", row.union);
        println!("  A only: {}  B only: {}", row.a_only, row.b_only);
    }
}

fn print_json_comparison(
    args: &CompareArgs,
    mode: VariantEquality,
    comparisons: &[ContigComparison],
) -> anyhow::Result<()> {
    let output = serde_json::json!({
        "input": args.input.display().to_string(),
        "genome_a": args.genome_a,
        "genome_b": args.genome_b,
        "mode": mode,
        "contigs": comparisons,
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_tsv_comparison(comparisons: &[ContigComparison]) {
    println!("contig\ta\tb\tintersection\tunion\ta_only\tb_only");
    for row in comparisons {
        println!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
            row.contig, row.a, row.b, row.intersection, row.union, row.a_only, row.b_only
        );
    }
}
