// SPDX-License-Identifier: Apache-2.0

//! Common constants used across implementations
//!
//! This module centralizes dataset defaults, worker counts, thresholds, and
//! GPU launch geometry shared by the CPU and CUDA paths.

// =============================================================================
// DATASET DEFAULTS
// =============================================================================

/// Default dataset length for the benchmark harness.
pub const DEFAULT_DATASET_LEN: usize = 100_000;

/// Default lower bound (inclusive) for generated values.
pub const DEFAULT_VALUE_LOWER: i32 = 0;

/// Default seed so benchmark runs are reproducible across invocations.
pub const DEFAULT_SEED: u64 = 0x5EED_D0D0;

// =============================================================================
// CPU STRATEGY CONSTANTS
// =============================================================================

/// Worker count for the partitioned strategy when the caller does not choose.
pub const DEFAULT_WORKERS: usize = 10;

/// Unmeasured invocations before the timed run of each strategy.
pub const WARMUP_RUNS: usize = 10;

// =============================================================================
// DISPATCH THRESHOLDS
// =============================================================================

// When disable-dedupx is enabled, force the sequential path everywhere.
#[cfg(feature = "disable-dedupx")]
mod thresholds {
    pub const PARALLEL_THRESHOLD_DEDUP: usize = usize::MAX;
    pub const GPU_THRESHOLD_DEDUP: usize = usize::MAX;
}

#[cfg(not(feature = "disable-dedupx"))]
mod thresholds {
    /// Below this the thread-spawn cost dominates any partitioning win.
    pub const PARALLEL_THRESHOLD_DEDUP: usize = 4_096;
    /// Below this the host<->device copies dominate the kernel time.
    pub const GPU_THRESHOLD_DEDUP: usize = 8_192;
}

pub use thresholds::*;

// =============================================================================
// GPU/CUDA CONSTANTS
// =============================================================================

pub use gpu_constants::*;

mod gpu_constants {
    /// Threads per cooperative block; also the shared-memory tile width.
    pub const GPU_BLOCK_SIZE: usize = 256;

    /// Elements staged into shared memory per tile iteration. Must match the
    /// `.shared` array size declared in the tiled PTX kernel.
    pub const GPU_TILE_SIZE: usize = 256;

    /// Output slot marker for a tiled-kernel thread that is not the first
    /// occurrence of its value. Valid inputs are non-negative, so -1 can
    /// never collide with a kept value.
    pub const KEEP_NONE_SENTINEL: i32 = -1;

    /// Comparison value for device threads whose index is past the true
    /// element count. Such threads still reach every barrier but must never
    /// match a real input. Assumes generated values stay well above this
    /// magnitude; see the dataset generator's bounds.
    pub const OUT_OF_RANGE_SENTINEL: i32 = -100_000_000;
}
