//! Store-wide properties and end-to-end scenarios
//!
//! Exercises the public API the way a caller assembling a population would:
//! shared records added to several genomes, copies and filters through the
//! parallel engine, set algebra between genomes and diploid reconciliation.

use std::sync::Arc;

use variant_store::filter::leaves::{GenomeListFilter, MinGenomeCountFilter, SnpFilter};
use variant_store::parsing::vcf::{parse_vcf_text, VcfOptions};
use variant_store::{
    ContigId, ContigStore, DataSource, EngineConfig, GenomeId, GenomeStore, InfoFrequencyOracle,
    OffsetStore, ParallelFilterEngine, Phase, PopulationStore, Predicate, TableFrequencyOracle,
    VariantEquality, VariantHandle, VariantRecord,
};

fn call(contig: &str, offset: u64, reference: &str, alt: &str, phase: Phase) -> VariantHandle {
    VariantRecord::new(ContigId::new(contig), offset, reference, alt, phase).into_handle()
}

fn ids(names: &[&str]) -> Vec<GenomeId> {
    names.iter().map(|n| GenomeId::new(*n)).collect()
}

/// Ten genomes sharing a handful of calls across three contigs
fn cohort() -> PopulationStore {
    let population = PopulationStore::new("cohort", DataSource::Generic);
    for g in 0..10u64 {
        let genome = [GenomeId::new(format!("HG{g:02}"))];
        for offset in 0..20u64 {
            if (offset + g) % 3 == 0 {
                continue;
            }
            let contig = ["chr1", "chr2", "chrX"][(offset % 3) as usize];
            let alt = if offset % 4 == 0 { "AT" } else { "G" };
            let phase = if g % 2 == 0 {
                Phase::Unphased
            } else {
                Phase::Haplotype((offset % 2) as u8)
            };
            assert!(population.add_variant(call(contig, offset * 10, "A", alt, phase), &genome));
        }
    }
    population
}

/// Offset key and record offset agree, and no empty offsets remain
fn assert_well_formed(population: &PopulationStore) {
    population.with_genomes(|genomes| {
        for genome in genomes.values() {
            genome.with_contigs(|contigs| {
                for contig in contigs.values() {
                    contig.with_offsets(|offsets| {
                        for (key, store) in offsets {
                            assert!(!store.is_empty(), "empty offset {key} in {}", contig.contig_id());
                            assert!(store.iter().all(|r| r.offset() == *key));
                        }
                    });
                }
            });
        }
    });
}

#[test]
fn test_deep_copy_preserves_counts() {
    let population = cohort();
    let copy = population.deep_copy();
    assert_eq!(copy.variant_count(), population.variant_count());
    assert_eq!(copy.genome_ids(), population.genome_ids());
    assert_well_formed(&copy);
}

#[test]
fn test_constant_predicates() {
    let population = cohort();

    let all = population.filter_copy(&Predicate::AlwaysTrue);
    assert_eq!(all.variant_count(), population.variant_count());
    assert_eq!(all.genome_count(), population.genome_count());

    let none = population.filter_copy(&Predicate::AlwaysFalse);
    assert_eq!(none.variant_count(), 0);
    assert_eq!(none.genome_count(), 0);

    let still_none = none.filter_copy(&Predicate::variant(SnpFilter).or(Predicate::AlwaysTrue));
    assert_eq!(still_none.variant_count(), 0);
}

#[test]
fn test_filter_copy_matches_filter_in_place() {
    let population = cohort();
    let predicate = Predicate::variant(SnpFilter)
        .and(Predicate::genome(GenomeListFilter::new(["HG01", "HG02", "HG07"])))
        .and(!Predicate::contig_fn(|c| c.contig_id().as_str() == "chrX"));

    let copy = population.filter_copy(&predicate);
    let mut in_place = population.deep_copy();
    let counts = in_place.filter_in_place(&predicate);

    assert_eq!(counts.before, population.variant_count());
    assert_eq!(counts.after, copy.variant_count());
    assert_eq!(in_place.genome_ids(), copy.genome_ids());
    assert_eq!(copy.genome_ids(), ids(&["HG01", "HG02", "HG07"]));
    assert_well_formed(&copy);
    assert_well_formed(&in_place);

    copy.with_genomes(|genomes| {
        for genome in genomes.values() {
            assert!(genome.variants().iter().all(|r| r.is_snp()));
            assert!(!genome.contig_ids().contains(&ContigId::new("chrX")));
        }
    });
}

#[test]
fn test_engine_thread_bound_does_not_change_results() {
    let population = cohort();
    let predicate = Predicate::variant_fn(|r| r.offset() % 20 == 0);
    let single = ParallelFilterEngine::with_config(EngineConfig { max_threads: Some(1) });
    let many = ParallelFilterEngine::with_config(EngineConfig { max_threads: Some(8) });

    let a = population.filter_copy_with(&single, &predicate);
    let b = population.filter_copy_with(&many, &predicate);
    assert_eq!(a.variant_count(), b.variant_count());
    assert_eq!(a.genome_ids(), b.genome_ids());
}

#[test]
fn test_population_leaf_evaluated_once() {
    let population = cohort();
    let big = Predicate::population(MinGenomeCountFilter(10)).and(Predicate::variant(SnpFilter));
    let small = Predicate::population(MinGenomeCountFilter(11)).and(Predicate::variant(SnpFilter));

    assert!(population.filter_copy(&big).variant_count() > 0);
    assert_eq!(population.filter_copy(&small).genome_count(), 0);
}

#[test]
fn test_unique_predicate_per_genome() {
    let population = PopulationStore::new("dups", DataSource::Generic);
    let record = call("chr1", 5, "A", "G", Phase::Unphased);
    for _ in 0..3 {
        population.add_variant(record.clone(), &ids(&["G1", "G2"]));
    }
    population.add_variant(call("chr1", 5, "A", "G", Phase::Haplotype(1)), &ids(&["G1"]));

    let unique = population.filter_copy(&Predicate::unique(VariantEquality::PhaseInsensitive));
    assert_eq!(unique.variant_count(), 2);

    let phased = population.filter_copy(&Predicate::unique(VariantEquality::PhaseSensitive));
    assert_eq!(phased.variant_count(), 3);
}

#[test]
fn test_set_algebra_sizes() {
    let population = cohort();
    let contig_id = ContigId::new("chr1");
    let get = |name: &str| {
        population
            .with_genome(&GenomeId::new(name), |g| g.with_contig(&contig_id, ContigStore::clone))
            .flatten()
            .unwrap_or_else(|| ContigStore::new(contig_id.clone()))
    };

    for mode in [VariantEquality::PhaseInsensitive, VariantEquality::PhaseSensitive] {
        for (x, y) in [("HG00", "HG01"), ("HG02", "HG05"), ("HG03", "HG03")] {
            let a = get(x);
            let b = get(y);
            let union = a.set_union(&b, mode).variant_count();
            let inter = a.set_intersection(&b, mode).variant_count();
            assert_eq!(union, a.variant_count() + b.variant_count() - inter);
            assert_eq!(
                a.set_complement(&b, mode).variant_count(),
                a.variant_count() - inter
            );
        }
    }
}

#[test]
fn test_set_algebra_sizes_with_repeated_calls() {
    let contig_with = |calls: &[VariantHandle]| {
        let contig = ContigStore::new(ContigId::new("chr1"));
        for record in calls {
            contig.add_variant(record.clone()).unwrap();
        }
        contig
    };
    let hap0 = call("chr1", 100, "A", "G", Phase::Haplotype(0));
    let hap1 = call("chr1", 100, "A", "G", Phase::Haplotype(1));
    let unphased = call("chr1", 200, "C", "T", Phase::Unphased);
    let homozygous_phased = contig_with(&[hap0.clone(), hap1.clone()]);
    let heterozygous = contig_with(&[hap0.clone()]);
    let homozygous_unphased = contig_with(&[unphased.clone(), unphased.clone()]);
    let single = contig_with(&[unphased.clone()]);

    for mode in [VariantEquality::PhaseInsensitive, VariantEquality::PhaseSensitive] {
        for (a, b) in [
            (&homozygous_phased, &heterozygous),
            (&heterozygous, &homozygous_phased),
            (&homozygous_unphased, &single),
            (&single, &homozygous_unphased),
        ] {
            let inter = a.set_intersection(b, mode).variant_count();
            assert_eq!(inter, 1);
            assert_eq!(
                a.set_union(b, mode).variant_count(),
                a.variant_count() + b.variant_count() - inter
            );
            assert_eq!(a.set_complement(b, mode).variant_count(), a.variant_count() - inter);
        }
    }

    let leftover = homozygous_phased.set_complement(&heterozygous, VariantEquality::PhaseInsensitive);
    assert!(Arc::ptr_eq(&leftover.offset_variants(100)[0], &hap1));
}

#[test]
fn test_intersection_and_complement_scenario() {
    let a = call("chr1", 100, "A", "G", Phase::Haplotype(0));
    let b = call("chr1", 100, "A", "T", Phase::Haplotype(0));

    let g1 = ContigStore::new(ContigId::new("chr1"));
    g1.add_variant(a.clone()).unwrap();
    g1.add_variant(b.clone()).unwrap();
    let g2 = ContigStore::new(ContigId::new("chr1"));
    g2.add_variant(a.clone()).unwrap();

    let inter = g1.set_intersection(&g2, VariantEquality::PhaseInsensitive);
    let comp = g1.set_complement(&g2, VariantEquality::PhaseInsensitive);

    let inter_at_100 = inter.offset_variants(100);
    assert_eq!(inter_at_100.len(), 1);
    assert!(Arc::ptr_eq(&inter_at_100[0], &a));

    let comp_at_100 = comp.offset_variants(100);
    assert_eq!(comp_at_100.len(), 1);
    assert!(Arc::ptr_eq(&comp_at_100[0], &b));
}

#[test]
fn test_upstream_deletion_scenario() {
    let contig = ContigStore::new(ContigId::new("chr1"));
    contig
        .add_variant(call("chr1", 95, "ACGTACGTACGTACGTACGT", "A", Phase::Unphased))
        .unwrap();
    contig.add_variant(call("chr1", 105, "C", "T", Phase::Unphased)).unwrap();

    let window = contig.get_sorted_variants(Phase::Unphased, 90, 110);
    assert_eq!(window.keys().copied().collect::<Vec<_>>(), vec![95]);

    let downstream = contig.get_sorted_variants(Phase::Unphased, 100, 110);
    assert_eq!(downstream.keys().copied().collect::<Vec<_>>(), vec![95]);
}

#[test]
fn test_square_contigs_scenario() {
    let population = PopulationStore::new("pop", DataSource::Generic);
    population.add_variant(call("chrA", 1, "A", "G", Phase::Unphased), &ids(&["G1", "G2"]));
    population.add_variant(call("chrB", 1, "A", "G", Phase::Unphased), &ids(&["G2"]));

    let before = population.variant_count();
    assert_eq!(population.square_contigs(), 2);
    assert_eq!(population.variant_count(), before);

    let g1_chr_b = population
        .with_genome(&GenomeId::new("G1"), |g| {
            g.with_contig(&ContigId::new("chrB"), ContigStore::variant_count)
        })
        .flatten();
    assert_eq!(g1_chr_b, Some(0));
}

#[test]
fn test_diploid_property() {
    let mut population = PopulationStore::new("pop", DataSource::Generic);
    let oracle = TableFrequencyOracle::new()
        .with_frequency("chr1:10:A>C", 0.1)
        .with_frequency("chr1:10:A>G", 0.4)
        .with_frequency("chr1:20:A>G", 0.3);

    let genome = ids(&["G1"]);
    for record in [
        call("chr1", 10, "A", "C", Phase::Haplotype(0)),
        call("chr1", 10, "A", "G", Phase::Haplotype(0)),
        call("chr1", 10, "A", "G", Phase::Haplotype(1)),
        call("chr1", 20, "A", "G", Phase::Unphased),
        call("chr1", 20, "A", "T", Phase::Haplotype(0)),
        call("chr1", 30, "A", "G", Phase::Unphased),
        call("chr1", 30, "A", "T", Phase::Unphased),
        call("chr1", 30, "A", "C", Phase::Unphased),
    ] {
        population.add_variant(record, &genome);
    }

    let counts = population.reconcile_diploid(&oracle, "");
    assert_eq!(counts.before, 8);

    population.with_genome(&genome[0], |g| {
        g.with_contigs(|contigs| {
            for contig in contigs.values() {
                contig.with_offsets(|offsets| {
                    for store in offsets.values() {
                        assert_diploid(store);
                    }
                });
            }
        });
    });

    let chr1 = population
        .with_genome(&genome[0], |g| g.with_contig(&ContigId::new("chr1"), ContigStore::clone))
        .flatten()
        .unwrap();
    let at_10: Vec<_> = chr1.offset_variants(10).iter().map(|r| r.alternate().to_string()).collect();
    assert_eq!(at_10, vec!["G", "G"]);
    let at_20: Vec<_> = chr1.offset_variants(20).iter().map(|r| r.alternate().to_string()).collect();
    assert_eq!(at_20, vec!["G"]);
    // No frequency data for three competing calls
    assert!(chr1.offset_variants(30).is_empty());
}

fn assert_diploid(store: &OffsetStore) {
    assert!(store.len() <= 2);
    if store.len() == 2 {
        let (a, b) = (store.variants()[0].phase(), store.variants()[1].phase());
        let both_unphased = !a.is_phased() && !b.is_phased();
        let distinct_haplotypes = a.is_phased() && b.is_phased() && a != b;
        assert!(both_unphased || distinct_haplotypes, "{a} / {b}");
    }
}

#[test]
fn test_vcf_to_diploid_with_info_frequencies() {
    let vcf = "\
##fileformat=VCFv4.2
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tHG01\tHG02
chr1\t11\t.\tA\tC,G\t.\tPASS\tAF_nfe=0.05,0.6\tGT\t1|2\t2|2
chr1\t11\t.\tA\tT\t.\tPASS\tAF_nfe=0.2\tGT\t1|0\t0|0
";
    let options = VcfOptions {
        data_source: DataSource::Gnomad,
        ..VcfOptions::default()
    };
    let mut population = parse_vcf_text(vcf, &options).unwrap();
    assert_eq!(population.variant_count(), 5);

    let oracle = InfoFrequencyOracle::new(population.data_source());
    population.reconcile_diploid(&oracle, "nfe");

    let hg01 = population
        .with_genome(&GenomeId::new("HG01"), GenomeStore::variants)
        .unwrap();
    let kept: Vec<_> = hg01.iter().map(|r| (r.alternate().to_string(), r.phase())).collect();
    assert_eq!(kept, vec![("G".to_string(), Phase::Haplotype(1))]);

    let hg02 = population
        .with_genome(&GenomeId::new("HG02"), GenomeStore::variants)
        .unwrap();
    assert_eq!(hg02.len(), 2);
}
