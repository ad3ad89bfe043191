//! Performance benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tractdose::output::matrix::{covariate_row, dosage_row};
use tractdose::tracts::IndicatorMatrix;
use tractdose::{SiteStatistics, StatsOptions, VariantRecord};

fn cohort(samples: usize, components: u16) -> (Vec<[f64; 2]>, IndicatorMatrix, IndicatorMatrix) {
    let haplotypes = (0..samples)
        .map(|s| [(s % 3) as f64 / 2.0, ((s + 1) % 2) as f64])
        .collect();
    let a = (0..samples).map(|s| (s % components as usize) as u16).collect();
    let b = (0..samples)
        .map(|s| ((s / 2) % components as usize) as u16)
        .collect();
    (
        haplotypes,
        IndicatorMatrix::from_assignment(a, components as usize),
        IndicatorMatrix::from_assignment(b, components as usize),
    )
}

fn benchmark_site_statistics(c: &mut Criterion) {
    let mut group = c.benchmark_group("site_statistics");
    let options = StatsOptions {
        r2: true,
        allow_flip: true,
    };
    for samples in [100usize, 1_000, 10_000] {
        let (haplotypes, a, b) = cohort(samples, 3);
        group.bench_with_input(BenchmarkId::from_parameter(samples), &samples, |bench, _| {
            bench.iter(|| SiteStatistics::compute(black_box(&haplotypes), &a, &b, options));
        });
    }
    group.finish();
}

fn benchmark_matrix_rows(c: &mut Criterion) {
    let (haplotypes, a, b) = cohort(1_000, 3);
    let stats = SiteStatistics::compute(&haplotypes, &a, &b, StatsOptions::default());
    let record = VariantRecord {
        chrom: "chr22".to_string(),
        pos: 16_050_075,
        id: "rs587697622".to_string(),
        reference: "A".to_string(),
        alternates: vec!["G".to_string()],
        haplotypes,
    };

    c.bench_function("matrix_rows_1000_samples", |bench| {
        bench.iter(|| {
            black_box(dosage_row(&record, &stats));
            black_box(covariate_row(&stats));
        });
    });
}

criterion_group!(benches, benchmark_site_statistics, benchmark_matrix_rows);
criterion_main!(benches);
