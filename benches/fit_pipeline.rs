use std::hint::black_box;

use bcw_trainer::dataset::load_data;
use bcw_trainer::ml::build_model;
use bcw_trainer::ml::split::stratified_split;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

fn bench_fit(c: &mut Criterion) {
    let (table, targets) = load_data().expect("bundled dataset");
    c.bench_with_input(
        BenchmarkId::new("fit_pipeline", table.n_samples()),
        &(table, targets),
        |b, (table, targets)| {
            b.iter(|| {
                build_model()
                    .fit(black_box(table), black_box(targets))
                    .expect("fit");
            });
        },
    );
}

fn bench_split(c: &mut Criterion) {
    let (_, targets) = load_data().expect("bundled dataset");
    c.bench_function("stratified_split", |b| {
        b.iter(|| stratified_split(black_box(&targets.labels), 0.2, 42).expect("split"));
    });
}

criterion_group!(benches, bench_fit, bench_split);
criterion_main!(benches);
