use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::Args;

use crate::cli::{LoadArgs, OutputFormat};
use crate::core::types::{ContigId, GenomeId, Phase};
use crate::core::variant::VariantHandle;
use crate::filter::engine::EngineConfig;

#[derive(Args)]
pub struct QueryArgs {
    /// Input VCF file
    #[arg(required = true)]
    pub input: PathBuf,

    /// Genome (sample) to query
    #[arg(long)]
    pub genome: String,

    /// Contig to query
    #[arg(long)]
    pub contig: String,

    /// Window start (0-based, inclusive)
    #[arg(long, default_value = "0")]
    pub start: u64,

    /// Window end (0-based, exclusive)
    #[arg(long, default_value_t = u64::MAX)]
    pub end: u64,

    /// Haplotype to query; unphased calls when omitted
    #[arg(long)]
    pub haplotype: Option<u8>,

    #[command(flatten)]
    pub load: LoadArgs,
}

pub fn run(args: QueryArgs, format: OutputFormat, verbose: bool, _config: &EngineConfig) -> anyhow::Result<()> {
    let population = args.load.load(&args.input)?;
    let genome_id = GenomeId::new(args.genome.clone());
    let contig_id = ContigId::new(args.contig.clone());
    let phase = args.haplotype.map_or(Phase::Unphased, Phase::Haplotype);

    let window = population
        .with_genome(&genome_id, |genome| {
            genome.with_contig(&contig_id, |contig| {
                contig.get_sorted_variants(phase, args.start, args.end)
            })
        })
        .ok_or_else(|| anyhow::anyhow!("Genome '{}' not found in {}", args.genome, args.input.display()))?
        .unwrap_or_default();

    if verbose {
        eprintln!(
            "{} calls for {} on {} (phase {})",
            window.len(),
            genome_id,
            contig_id,
            phase
        );
    }

    match format {
        OutputFormat::Text => print_text_window(&args, &window),
        OutputFormat::Json => print_json_window(&args, phase, &window)?,
        OutputFormat::Tsv => print_tsv_window(&window),
    }

    Ok(())
}

fn print_text_window(args: &QueryArgs, window: &BTreeMap<u64, VariantHandle>) {
    println!("Genome {} on {} [{}, {})", args.genome, args.contig, args.start, args.end);
    if window.is_empty() {
        println!("  No calls");
        return;
    }
    for record in window.values() {
        println!(
            "  {}\t{}>{}\tphase {}",
            record.offset(),
            record.reference(),
            record.alternate(),
            record.phase()
        );
    }
}

fn print_json_window(
    args: &QueryArgs,
    phase: Phase,
    window: &BTreeMap<u64, VariantHandle>,
) -> anyhow::Result<()> {
    let records: Vec<&crate::core::variant::VariantRecord> = window.values().map(AsRef::as_ref).collect();
    let output = serde_json::json!({
        "genome": args.genome,
        "contig": args.contig,
        "start": args.start,
        "end": args.end,
        "phase": phase.to_string(),
        "variants": records,
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_tsv_window(window: &BTreeMap<u64, VariantHandle>) {
    println!("contig\toffset\tref\talt\tphase");
    for record in window.values() {
        println!(
            "{}\t{}\t{}\t{}\t{}",
            record.contig_id(),
            record.offset(),
            record.reference(),
            record.alternate(),
            record.phase()
        );
    }
}
