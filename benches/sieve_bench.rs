use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use segsieve::base::generate_seeds;
use segsieve::{SieveConfig, Strategy, sieve};

fn bench_seeds(c: &mut Criterion) {
    c.bench_function("generate_seeds(1_000_000)", |b| {
        b.iter(|| generate_seeds(black_box(1_000_000)).unwrap());
    });
}

fn bench_strategies(c: &mut Criterion) {
    let limit = 10_000_000u64;
    let mut group = c.benchmark_group("sieve(10_000_000)");
    for strategy in [Strategy::Sequential, Strategy::detect()] {
        let config = SieveConfig::default().with_strategy(strategy);
        group.bench_with_input(BenchmarkId::from_parameter(strategy), &config, |b, config| {
            b.iter(|| sieve(black_box(limit), config).unwrap());
        });
    }
    group.finish();
}

fn bench_segment_sizes(c: &mut Criterion) {
    let limit = 10_000_000u64;
    let mut group = c.benchmark_group("segment_kib");
    for kib in [8usize, 32, 256] {
        let config = SieveConfig::sequential().with_segment_bytes(kib * 1024);
        group.bench_with_input(BenchmarkId::from_parameter(kib), &config, |b, config| {
            b.iter(|| sieve(black_box(limit), config).unwrap());
        });
    }
    group.finish();
}

criterion_group!(benches, bench_seeds, bench_strategies, bench_segment_sizes);
criterion_main!(benches);
