// SPDX-License-Identifier: Apache-2.0

//! Dataset generation and ground-truth counting
//!
//! The generator produces a reproducible pseudo-random multiset of `i32`
//! values over a bounded non-negative range. Reproducibility matters for the
//! benchmark harness (identical input across strategies and across runs), so
//! the seed is an explicit argument rather than ambient entropy.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Generate `n` values uniformly drawn from `lower..=upper`.
///
/// Bounds are clamped so the range is never empty; `n == 0` yields an empty
/// dataset. The same `(n, lower, upper, seed)` always produces the same
/// sequence.
pub fn generate(n: usize, lower: i32, upper: i32, seed: u64) -> Vec<i32> {
    let upper = upper.max(lower);
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n).map(|_| rng.gen_range(lower..=upper)).collect()
}

/// Ground-truth count of distinct values, used to validate every strategy.
pub fn reference_distinct_count(values: &[i32]) -> usize {
    let mut counts: BTreeMap<i32, u64> = BTreeMap::new();
    for &v in values {
        *counts.entry(v).or_insert(0) += 1;
    }
    counts.len()
}

/// Share of distinct values in the dataset, as a percentage. Used by the
/// harness banner.
pub fn distinct_percentage(values: &[i32]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    100.0 * reference_distinct_count(values) as f64 / values.len() as f64
}
