//! Criterion benchmarks for the dimorphism engine hot paths.
//!
//! Synthetic cohorts keep the runs deterministic.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use dm_core::dimorphism::{
    DivergenceEngine, LikelihoodScorer, PopulationModels, SampleMap, Subject, TailFraction,
    VariableSelector,
};
use std::collections::BTreeMap;

fn cohort(variables: usize, subjects: usize, shift: f64) -> SampleMap {
    (0..variables)
        .map(|v| {
            let samples = (0..subjects)
                .map(|i| shift * v as f64 / variables as f64 + ((i * 7919 + v * 31) % 997) as f64 / 100.0)
                .collect();
            (format!("region_{:03}", v), samples)
        })
        .collect()
}

fn bench_rank(c: &mut Criterion) {
    let mut group = c.benchmark_group("rank");
    group.sample_size(20);

    for variables in [10usize, 100] {
        let a = cohort(variables, 200, 0.0);
        let b = cohort(variables, 200, 3.0);
        for parallel in [false, true] {
            let engine = DivergenceEngine::new().with_parallel(parallel);
            let id = if parallel { "parallel" } else { "sequential" };
            group.bench_with_input(BenchmarkId::new(id, variables), &variables, |bench, _| {
                bench.iter(|| black_box(engine.rank(black_box(&a), black_box(&b)).unwrap()));
            });
        }
    }
    group.finish();
}

fn bench_select_and_score(c: &mut Criterion) {
    let a = cohort(50, 200, 0.0);
    let b = cohort(50, 200, 3.0);
    let report = DivergenceEngine::new().rank(&a, &b).unwrap();

    c.bench_function("selector_widen_10_to_40", |bench| {
        bench.iter(|| {
            let mut selector =
                VariableSelector::new(report.clone(), 10, TailFraction::default()).unwrap();
            selector.set_count(40).unwrap();
            black_box(selector.rules().len())
        });
    });

    let models = PopulationModels::fit(&a, &b, LikelihoodScorer::new()).unwrap();
    let values: BTreeMap<String, Option<f64>> =
        a.iter().map(|(k, v)| (k.clone(), v.first().copied())).collect();
    let subject = Subject::new("bench", "F", values);
    c.bench_function("score_subject_50_vars", |bench| {
        bench.iter(|| black_box(models.score_subject(black_box(&subject), false).unwrap()));
    });
}

criterion_group!(benches, bench_rank, bench_select_and_score);
criterion_main!(benches);
