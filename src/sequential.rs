// SPDX-License-Identifier: Apache-2.0

//! Sequential duplicate-removal strategies
//!
//! Three single-threaded variants over the same contract: consume a dataset,
//! emit each distinct value exactly once. All are O(N log N); they differ in
//! constant factors and memory-access pattern, which is the point of
//! benchmarking them side by side.

use std::collections::BTreeMap;

use log::trace;

/// Build the transient value -> occurrence-count table used by the hash-based
/// strategies. `BTreeMap` keeps keys ordered, so extraction is ascending.
pub(crate) fn frequency_table(values: &[i32]) -> BTreeMap<i32, u64> {
    let mut counts: BTreeMap<i32, u64> = BTreeMap::new();
    for &v in values {
        *counts.entry(v).or_insert(0) += 1;
    }
    counts
}

/// Ordered-map accumulation in input order.
///
/// O(N log N) from map insertion; extra space proportional to the distinct
/// count. Output happens to be ascending because the backing map is ordered,
/// but callers must only rely on set-equality.
pub fn dedup_hash_accumulate(values: &[i32]) -> Vec<i32> {
    trace!("DEDUP HASH-ACCUMULATE: n={}", values.len());
    frequency_table(values).into_keys().collect()
}

/// Sort a copy first, then accumulate exactly as [`dedup_hash_accumulate`].
///
/// Sorting does not change the complexity class; it exists to show the
/// cache-locality difference against unsorted insertion.
pub fn dedup_sort_then_hash(values: &[i32]) -> Vec<i32> {
    trace!("DEDUP SORT-THEN-HASH: n={}", values.len());
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    frequency_table(&sorted).into_keys().collect()
}

/// Sort a copy, then one linear emit-on-change pass. Ascending output.
///
/// The fastest sequential variant: O(N log N) for the sort, O(1) extra space
/// beyond the sorted copy. The empty dataset is handled explicitly; the scan
/// below reads the first element unconditionally.
pub fn dedup_sort_scan(values: &[i32]) -> Vec<i32> {
    trace!("DEDUP SORT-SCAN: n={}", values.len());
    if values.is_empty() {
        return Vec::new();
    }

    let mut sorted = values.to_vec();
    sorted.sort_unstable();

    let mut result = Vec::new();
    let mut current = sorted[0];
    for &element in &sorted[1..] {
        if element != current {
            result.push(current);
            current = element;
        }
    }
    result.push(current);
    result
}
