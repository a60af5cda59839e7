//! Criterion benchmarks for `dm-math`.
//!
//! Focus on the density kernels that dominate ranking and scoring.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use dm_math::math::integrate::trapezoid;
use dm_math::math::kde::GaussianKde;

fn synthetic_sample(n: usize, offset: f64) -> Vec<f64> {
    (0..n)
        .map(|i| offset + ((i * 7919) % 1000) as f64 / 100.0)
        .collect()
}

fn bench_kde_kernels(c: &mut Criterion) {
    let mut group = c.benchmark_group("kde");

    // Roughly the population sizes seen in cohort studies.
    for n in [50usize, 500, 2000] {
        let samples = synthetic_sample(n, 0.0);
        let kde = GaussianKde::new(&samples).unwrap();

        group.bench_with_input(BenchmarkId::new("fit", n), &samples, |b, s| {
            b.iter(|| black_box(GaussianKde::new(black_box(s)).unwrap()));
        });

        group.bench_with_input(BenchmarkId::new("density", n), &kde, |b, k| {
            b.iter(|| black_box(k.density(black_box(4.2))));
        });

        group.bench_with_input(BenchmarkId::new("divergence_grid", n), &n, |b, &n| {
            let other = GaussianKde::new(&synthetic_sample(n, 1.5)).unwrap();
            let mut grid = samples.clone();
            grid.extend(other.samples());
            grid.sort_by(f64::total_cmp);
            b.iter(|| {
                let diff: Vec<f64> = grid
                    .iter()
                    .map(|&x| (kde.density(x) - other.density(x)).abs())
                    .collect();
                black_box(trapezoid(&diff, &grid))
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_kde_kernels);
criterion_main!(benches);
