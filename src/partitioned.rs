// SPDX-License-Identifier: Apache-2.0

//! Partitioned-parallel duplicate removal
//!
//! The dataset is split into `T` contiguous ranges. Each worker builds a
//! private frequency table over its range with no shared mutable state, so
//! the parallel phase needs no locks. After the join, the calling thread
//! merges tables 1..T into table 0 by summing counts and extracts the keys.
//! The merge is the serialization point that bounds speedup.

use std::collections::BTreeMap;
use std::thread;

use log::trace;

use crate::constants::DEFAULT_WORKERS;
use crate::sequential::frequency_table;

/// Index range owned by worker `t` of `workers`.
///
/// Workers 0..T-1 take even `n / T` slices; the last worker always runs to
/// `n`, absorbing the `n mod T` remainder. The range end is unconditional so
/// no trailing element can fall through regardless of how `n` divides.
pub(crate) fn worker_range(t: usize, workers: usize, n: usize) -> (usize, usize) {
    let chunk = n / workers;
    let start = t * chunk;
    let end = if t == workers - 1 { n } else { (t + 1) * chunk };
    (start, end.max(start))
}

/// Per-worker frequency tables before the merge. Exposed crate-internally so
/// tests can assert that every element is counted exactly once.
pub(crate) fn partition_frequency_tables(values: &[i32], workers: usize) -> Vec<BTreeMap<i32, u64>> {
    let workers = workers.max(1);
    let n = values.len();

    thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|t| {
                let (start, end) = worker_range(t, workers, n);
                let slice = &values[start..end];
                scope.spawn(move || frequency_table(slice))
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("dedup worker panicked"))
            .collect()
    })
}

/// Partition-and-merge duplicate removal with an explicit worker count.
///
/// The join barrier is the scope exit in [`partition_frequency_tables`];
/// the merge below runs strictly on the calling thread.
pub fn dedup_partitioned_with_workers(values: &[i32], workers: usize) -> Vec<i32> {
    let workers = workers.max(1);
    trace!(
        "DEDUP PARTITIONED: n={}, workers={}",
        values.len(),
        workers
    );

    let mut tables = partition_frequency_tables(values, workers);

    let (first, rest) = tables.split_at_mut(1);
    let merged = &mut first[0];
    for table in rest {
        for (value, count) in std::mem::take(table) {
            *merged.entry(value).or_insert(0) += count;
        }
    }

    std::mem::take(merged).into_keys().collect()
}

/// Partition-and-merge duplicate removal with the default worker pool size.
pub fn dedup_partitioned(values: &[i32]) -> Vec<i32> {
    dedup_partitioned_with_workers(values, DEFAULT_WORKERS)
}
