// SPDX-License-Identifier: Apache-2.0

//! # dedupx dispatch framework
//!
//! The dispatch layer is the crate's public entry point: it routes a dataset
//! to one of the duplicate-removal strategies, either explicitly or by
//! picking one from detected hardware and input size. Strategies never depend
//! on each other; each consumes the dataset and emits the distinct set on its
//! own.

use log::trace;

use crate::constants::*;
use crate::types::{DedupxError, Result, Strategy};
use crate::{partitioned, sequential};

#[cfg(has_cuda)]
use crate::device::{DeviceDedupPlan, DeviceKernel};

// =============================================================================
//  HARDWARE DETECTION
// =============================================================================

/// Hardware capability detection used by the dedupx dispatch layer
pub struct HardwareCapabilities {
    pub has_cuda: bool,
    pub cpu_threads: usize,
}

impl HardwareCapabilities {
    #[inline]
    pub fn detect() -> Self {
        HardwareCapabilities {
            has_cuda: Self::detect_cuda(),
            cpu_threads: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        }
    }

    fn detect_cuda() -> bool {
        // Use a static atomic for one-time detection and caching
        use std::sync::atomic::{AtomicU8, Ordering};
        static CUDA_DETECTED: AtomicU8 = AtomicU8::new(2); // 2 = unknown, 1 = true, 0 = false

        let cached = CUDA_DETECTED.load(Ordering::Relaxed);
        if cached != 2 {
            return cached == 1;
        }

        #[cfg(has_cuda)]
        let has_cuda = crate::gpu::ensure_cuda_initialized().is_ok();
        #[cfg(not(has_cuda))]
        let has_cuda = false;

        CUDA_DETECTED.store(if has_cuda { 1 } else { 0 }, Ordering::Relaxed);
        has_cuda
    }
}

/// Get information about available hardware
#[inline]
pub fn get_hw_capabilities() -> HardwareCapabilities {
    HardwareCapabilities::detect()
}

// =============================================================================
//  STRATEGY DISPATCH
// =============================================================================

#[cfg(has_cuda)]
fn run_device(values: &[i32], kernel: DeviceKernel) -> Result<Vec<i32>> {
    if !get_hw_capabilities().has_cuda {
        return Err(DedupxError::Unsupported(
            "no CUDA device available at runtime".to_string(),
        ));
    }
    let plan = DeviceDedupPlan::new(values.len(), kernel)?;
    plan.run(values)
}

#[cfg(not(has_cuda))]
fn run_device_unavailable() -> Result<Vec<i32>> {
    Err(DedupxError::Unsupported(
        "dedupx was built without CUDA support".to_string(),
    ))
}

/// Remove duplicates with an explicitly chosen strategy.
///
/// Every strategy returns the same distinct values as a set; ordering is
/// ascending for the CPU strategies and discovery order for the device
/// strategies. Device strategies fail with
/// [`DedupxError::Unsupported`] when CUDA is absent; callers isolating
/// strategies (the benchmark harness does) treat that as a per-strategy
/// failure, not a fatal one.
pub fn remove_duplicates(values: &[i32], strategy: Strategy) -> Result<Vec<i32>> {
    trace!(
        "DEDUP DISPATCH: n={}, strategy={}",
        values.len(),
        strategy.name()
    );

    match strategy {
        Strategy::HashAccumulate => Ok(sequential::dedup_hash_accumulate(values)),
        Strategy::SortThenHash => Ok(sequential::dedup_sort_then_hash(values)),
        Strategy::SortScan => Ok(sequential::dedup_sort_scan(values)),
        Strategy::Partitioned => Ok(partitioned::dedup_partitioned(values)),
        Strategy::DeviceTiled => {
            #[cfg(has_cuda)]
            {
                run_device(values, DeviceKernel::Tiled)
            }
            #[cfg(not(has_cuda))]
            {
                run_device_unavailable()
            }
        }
        Strategy::DeviceNaive => {
            #[cfg(has_cuda)]
            {
                run_device(values, DeviceKernel::Naive)
            }
            #[cfg(not(has_cuda))]
            {
                run_device_unavailable()
            }
        }
        Strategy::Auto => remove_duplicates(values, choose_strategy(values.len())),
    }
}

/// Pick a concrete strategy for `Auto` dispatch.
///
/// Tiers mirror the measured crossover points: the device pays for its
/// copies only on large inputs, the worker pool pays for its spawns on
/// medium ones, and the linear scan wins everywhere below that.
pub fn choose_strategy(n: usize) -> Strategy {
    if n >= GPU_THRESHOLD_DEDUP && cfg!(has_cuda) && get_hw_capabilities().has_cuda {
        return Strategy::DeviceTiled;
    }
    if n >= PARALLEL_THRESHOLD_DEDUP && get_hw_capabilities().cpu_threads > 1 {
        return Strategy::Partitioned;
    }
    Strategy::SortScan
}
