// SPDX-License-Identifier: Apache-2.0

//! Benchmark harness
//!
//! Times one invocation of each strategy after a fixed number of unmeasured
//! warm-up runs and reports elapsed wall-clock time plus the resulting
//! cardinality. Strategies are isolated: a failure (missing device, rejected
//! kernel, bad launch geometry) is recorded in that strategy's report and the
//! remaining strategies still run.

use std::time::Instant;

use log::{debug, warn};
use serde::Serialize;

use crate::constants::{
    DEFAULT_DATASET_LEN, DEFAULT_SEED, DEFAULT_VALUE_LOWER, DEFAULT_WORKERS, WARMUP_RUNS,
};
use crate::types::{Result, Strategy};
use crate::{dataset, dispatch, partitioned};

#[cfg(has_cuda)]
use crate::device::{DeviceDedupPlan, DeviceKernel};

/// Scope that writes elapsed wall-clock nanoseconds into `out` when dropped.
///
/// Drop runs on every exit path, so the measurement lands even when the timed
/// operation returns early with an error.
pub struct ScopedTimer<'a> {
    out: &'a mut u64,
    start: Instant,
}

impl<'a> ScopedTimer<'a> {
    pub fn new(out: &'a mut u64) -> Self {
        Self {
            out,
            start: Instant::now(),
        }
    }
}

impl Drop for ScopedTimer<'_> {
    fn drop(&mut self) {
        *self.out = self.start.elapsed().as_nanos() as u64;
    }
}

/// Benchmark configuration. `Default` reproduces the stock 100k-element run.
#[derive(Debug, Clone, Serialize)]
pub struct BenchConfig {
    pub n: usize,
    pub lower: i32,
    pub upper: i32,
    pub seed: u64,
    pub workers: usize,
    pub warmup_runs: usize,
}

impl Default for BenchConfig {
    fn default() -> Self {
        let n = DEFAULT_DATASET_LEN;
        Self {
            n,
            lower: DEFAULT_VALUE_LOWER,
            // Matching bounds to n keeps the distinct share around 63%,
            // which exercises both the duplicate and the unique paths.
            upper: n as i32,
            seed: DEFAULT_SEED,
            workers: DEFAULT_WORKERS,
            warmup_runs: WARMUP_RUNS,
        }
    }
}

/// One strategy's benchmark outcome.
#[derive(Debug, Clone, Serialize)]
pub struct StrategyReport {
    pub strategy: Strategy,
    pub name: &'static str,
    /// Elapsed wall-clock time of the single timed run, when it succeeded.
    pub elapsed_ns: Option<u64>,
    /// Cardinality of the produced distinct set, when the run succeeded.
    pub distinct: Option<usize>,
    /// Whether the cardinality matched the reference counter.
    pub matches_reference: Option<bool>,
    pub error: Option<String>,
}

/// Full harness output: the dataset facts plus one report per strategy.
#[derive(Debug, Clone, Serialize)]
pub struct BenchRun {
    pub config: BenchConfig,
    pub reference_distinct: usize,
    pub distinct_percentage: f64,
    pub reports: Vec<StrategyReport>,
}

fn timed<F>(warmup_runs: usize, mut op: F) -> Result<(u64, Vec<i32>)>
where
    F: FnMut() -> Result<Vec<i32>>,
{
    for _ in 0..warmup_runs {
        op()?;
    }
    let mut elapsed_ns = 0u64;
    let result = {
        let _bench = ScopedTimer::new(&mut elapsed_ns);
        op()?
    };
    Ok((elapsed_ns, result))
}

fn run_one(values: &[i32], strategy: Strategy, config: &BenchConfig) -> Result<(u64, Vec<i32>)> {
    match strategy {
        Strategy::Partitioned => timed(config.warmup_runs, || {
            Ok(partitioned::dedup_partitioned_with_workers(
                values,
                config.workers,
            ))
        }),
        #[cfg(has_cuda)]
        Strategy::DeviceTiled | Strategy::DeviceNaive => {
            let kernel = if strategy == Strategy::DeviceTiled {
                DeviceKernel::Tiled
            } else {
                DeviceKernel::Naive
            };
            // The plan (compiled kernel + device buffers) is created once and
            // reused across warm-up and the timed run, so only copies and the
            // launch are measured.
            let plan = DeviceDedupPlan::new(values.len(), kernel)?;
            timed(config.warmup_runs, || plan.run(values))
        }
        _ => timed(config.warmup_runs, || {
            dispatch::remove_duplicates(values, strategy)
        }),
    }
}

/// Benchmark every concrete strategy against one generated dataset.
pub fn run_benchmarks(config: &BenchConfig) -> BenchRun {
    let values = dataset::generate(config.n, config.lower, config.upper, config.seed);
    let reference_distinct = dataset::reference_distinct_count(&values);
    debug!(
        "DEDUPX BENCH: n={} reference_distinct={}",
        config.n, reference_distinct
    );

    let reports = Strategy::ALL
        .iter()
        .map(|&strategy| match run_one(&values, strategy, config) {
            Ok((elapsed_ns, result)) => {
                let distinct = result.len();
                let matches = distinct == reference_distinct;
                if !matches {
                    warn!(
                        "DEDUPX BENCH: {} produced {} distinct values, reference says {}",
                        strategy.name(),
                        distinct,
                        reference_distinct
                    );
                }
                StrategyReport {
                    strategy,
                    name: strategy.name(),
                    elapsed_ns: Some(elapsed_ns),
                    distinct: Some(distinct),
                    matches_reference: Some(matches),
                    error: None,
                }
            }
            Err(e) => {
                warn!("DEDUPX BENCH: {} failed: {}", strategy.name(), e);
                StrategyReport {
                    strategy,
                    name: strategy.name(),
                    elapsed_ns: None,
                    distinct: None,
                    matches_reference: None,
                    error: Some(e.to_string()),
                }
            }
        })
        .collect();

    BenchRun {
        config: config.clone(),
        reference_distinct,
        distinct_percentage: dataset::distinct_percentage(&values),
        reports,
    }
}
