use criterion::{black_box, criterion_group, criterion_main, Criterion};
use services_api::infra::{shutdown::Shutdown, workers::WorkerSet};

fn register_benchmark(c: &mut Criterion) {
    let workers = WorkerSet::new();
    c.bench_function("register", |b| {
        b.iter(|| drop(black_box(workers.register().unwrap())))
    });
}

fn trigger_benchmark(c: &mut Criterion) {
    c.bench_function("trigger", |b| b.iter(|| black_box(Shutdown::new().trigger())));
}

criterion_group!(benches, register_benchmark, trigger_benchmark);
criterion_main!(benches);
