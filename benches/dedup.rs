// SPDX-License-Identifier: Apache-2.0

//! Criterion benchmarks for the duplicate-removal strategies.
//!
//! Every strategy runs against the same seeded dataset per size, so numbers
//! are comparable across strategies and across runs.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use dedupx::{generate, remove_duplicates, Strategy};

const SIZES: [usize; 3] = [1_000, 10_000, 100_000];

fn bench_cpu_strategies(c: &mut Criterion) {
    let mut group = c.benchmark_group("dedup_cpu");

    for &n in &SIZES {
        let values = generate(n, 0, n as i32, n as u64);

        for strategy in [
            Strategy::HashAccumulate,
            Strategy::SortThenHash,
            Strategy::SortScan,
            Strategy::Partitioned,
        ] {
            group.bench_with_input(
                BenchmarkId::new(strategy.name(), n),
                &values,
                |b, values| {
                    b.iter(|| {
                        let distinct = remove_duplicates(black_box(values), strategy)
                            .expect("cpu strategies are infallible");
                        black_box(distinct);
                    })
                },
            );
        }
    }

    group.finish();
}

#[cfg(has_cuda)]
fn bench_device_strategies(c: &mut Criterion) {
    use dedupx::{DeviceDedupPlan, DeviceKernel};

    let mut group = c.benchmark_group("dedup_gpu");

    for &n in &SIZES {
        let values = generate(n, 0, n as i32, n as u64);

        for kernel in [DeviceKernel::Tiled, DeviceKernel::Naive] {
            let Ok(plan) = DeviceDedupPlan::new(n, kernel) else {
                // no usable device at runtime; skip rather than abort
                return;
            };
            group.bench_with_input(
                BenchmarkId::new(kernel.entry_name(), n),
                &values,
                |b, values| {
                    b.iter(|| {
                        let distinct = plan.run(black_box(values)).expect("device run failed");
                        black_box(distinct);
                    })
                },
            );
        }
    }

    group.finish();
}

#[cfg(not(has_cuda))]
fn bench_device_strategies(_c: &mut Criterion) {}

criterion_group!(benches, bench_cpu_strategies, bench_device_strategies);
criterion_main!(benches);
