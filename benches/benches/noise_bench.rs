//! # Noise Mechanism Benchmarks
//!
//! Measures clipping and Gaussian perturbation throughput across
//! gradient dimensions.
//!
//! Run: `cargo bench --bench noise_bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use fedmesh_privacy::{calibrate_sigma, clip, NoiseGenerator};

const DIMENSIONS: &[usize] = &[16, 256, 4096, 65_536];

fn gradient(dimension: usize) -> Vec<f64> {
    (0..dimension).map(|i| (i as f64 * 0.37).sin()).collect()
}

fn bench_clip(c: &mut Criterion) {
    let mut group = c.benchmark_group("clip");
    for &dim in DIMENSIONS {
        let vector = gradient(dim);
        group.throughput(Throughput::Elements(dim as u64));
        group.bench_with_input(BenchmarkId::from_parameter(dim), &vector, |b, v| {
            b.iter(|| black_box(clip(v, 1.0)))
        });
    }
    group.finish();
}

fn bench_gaussian(c: &mut Criterion) {
    let mut group = c.benchmark_group("gaussian_noise");
    let sigma = calibrate_sigma(1.0, 0.5, 1e-5).unwrap();
    for &dim in DIMENSIONS {
        let vector = gradient(dim);
        group.throughput(Throughput::Elements(dim as u64));
        group.bench_with_input(BenchmarkId::from_parameter(dim), &vector, |b, v| {
            let mut gen = NoiseGenerator::with_seed(42);
            b.iter(|| black_box(gen.gaussian(v, sigma).unwrap()))
        });
    }
    group.finish();
}

fn bench_calibration(c: &mut Criterion) {
    c.bench_function("calibrate_sigma", |b| {
        b.iter(|| black_box(calibrate_sigma(1.0, 0.5, 1e-5).unwrap()))
    });
}

criterion_group!(benches, bench_clip, bench_gaussian, bench_calibration);
criterion_main!(benches);
