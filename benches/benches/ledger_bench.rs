//! # Privacy Ledger Benchmarks
//!
//! Measures the reserve/commit cycle and composition cost as spend
//! history grows.
//!
//! Run: `cargo bench --bench ledger_bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fedmesh_core::{InstitutionId, RoundId};
use fedmesh_privacy::{
    AdvancedComposition, BasicComposition, CompositionStrategy, LedgerConfig, PrivacyLedger,
};

fn ledger() -> PrivacyLedger {
    PrivacyLedger::new(LedgerConfig {
        global_epsilon: 1.0e9,
        global_delta: 1.0,
        per_institution_fraction: 1.0,
    })
}

fn bench_reserve_commit(c: &mut Criterion) {
    c.bench_function("reserve_commit", |b| {
        let mut led = ledger();
        let inst = InstitutionId(1);
        b.iter(|| {
            let id = led.reserve(inst, 0.01, 1e-9, 0.01, 1e-9).unwrap();
            black_box(led.commit(id, RoundId(1)).unwrap());
        })
    });
}

fn bench_composition(c: &mut Criterion) {
    let mut group = c.benchmark_group("marginal_cost");
    for history_len in [10usize, 1000, 100_000] {
        let episodes: Vec<(f64, f64)> = (0..history_len).map(|_| (0.01, 1e-9)).collect();

        group.bench_with_input(
            BenchmarkId::new("basic", history_len),
            &episodes,
            |b, eps| {
                let strategy = BasicComposition;
                b.iter(|| black_box(strategy.marginal_cost(eps, 0.01, 1e-9)))
            },
        );
        group.bench_with_input(
            BenchmarkId::new("advanced", history_len),
            &episodes,
            |b, eps| {
                let strategy = AdvancedComposition::new(1e-6);
                b.iter(|| black_box(strategy.marginal_cost(eps, 0.01, 1e-9)))
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_reserve_commit, bench_composition);
criterion_main!(benches);
