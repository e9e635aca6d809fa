//! # Weighted Merge Benchmarks
//!
//! Measures the sample-count-weighted merge across participant counts
//! and gradient dimensions.
//!
//! Run: `cargo bench --bench merge_bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use fedmesh_core::{GradientUpdate, InstitutionId, RoundId};
use fedmesh_round::weighted_merge;

fn updates(participants: usize, dimension: usize) -> Vec<GradientUpdate> {
    (0..participants)
        .map(|i| {
            let vector = (0..dimension)
                .map(|j| ((i * dimension + j) as f64 * 0.11).cos())
                .collect();
            GradientUpdate::new(
                InstitutionId(i as u64 + 1),
                RoundId(1),
                vector,
                100 + i as u32,
                0.5,
                1e-5,
            )
        })
        .collect()
}

fn bench_merge_by_participants(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge_participants");
    let dimension = 4096;
    for participants in [3, 10, 50, 200] {
        let set = updates(participants, dimension);
        group.throughput(Throughput::Elements((participants * dimension) as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(participants),
            &set,
            |b, set| b.iter(|| black_box(weighted_merge(set, dimension).unwrap())),
        );
    }
    group.finish();
}

fn bench_merge_by_dimension(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge_dimension");
    for dimension in [256, 4096, 65_536] {
        let set = updates(10, dimension);
        group.throughput(Throughput::Elements((10 * dimension) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(dimension), &set, |b, set| {
            b.iter(|| black_box(weighted_merge(set, dimension).unwrap()))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_merge_by_participants, bench_merge_by_dimension);
criterion_main!(benches);
