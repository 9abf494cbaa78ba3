use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use cachescope::cache::GenericSimulator;
use cachescope::config::{CacheGeometry, PolicyConfig};
use cachescope::{generators, reuse, trace};

/// Benchmarks the simulator and the reuse engine over a generated trace.
///
/// The trace is seeded, so runs are comparable across machines and commits
/// without external fixture files.
pub fn criterion_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("Engines");

    let entries = generators::zipf(4096, 1.2, 64, 100_000, 1.0, 7).unwrap();
    let addresses = trace::addresses(&entries);

    for policy in [
        PolicyConfig::LeastRecentlyUsed,
        PolicyConfig::FirstInFirstOut,
        PolicyConfig::Random,
        PolicyConfig::PseudoLru,
    ] {
        group.bench_with_input(
            BenchmarkId::new("simulate", format!("{policy:?}")),
            &addresses,
            |bench, addresses| {
                bench.iter(|| {
                    let geometry = CacheGeometry::new(64, 4, 64).unwrap();
                    let mut simulator = GenericSimulator::build(geometry, policy, Some(7)).unwrap();
                    for &address in addresses {
                        simulator.access(address);
                    }
                    simulator.hit_rate()
                });
            },
        );
    }

    group.bench_with_input(
        BenchmarkId::new("reuse", "compute"),
        &addresses,
        |bench, addresses| {
            bench.iter(|| reuse::compute(addresses, 64).unwrap());
        },
    );
}

criterion_group!(
    name = benches;
    config = Criterion::default().significance_level(0.1).sample_size(10);
    targets = criterion_benchmark
);
criterion_main!(benches);
