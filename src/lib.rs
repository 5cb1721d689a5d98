// SPDX-License-Identifier: Apache-2.0

//! dedupx library
//!
//! A duplicate-removal engine: interchangeable strategies that take an
//! unordered multiset of `i32` values and produce the set of distinct values,
//! each trading off complexity, parallelism model, and memory-access pattern
//! differently.
//!
//! - Sequential strategies (hash accumulation, sort-then-hash, sort-then-scan)
//! - A partitioned worker-pool strategy with a sequential merge
//! - Two CUDA kernel variants (shared-memory tiled scan, naive all-pairs)
//! - A dataset generator, reference counter, and benchmark harness
//!
//! ## Hardware support
//! - **CUDA** is enabled when detected by `build.rs` (requires `nvcc`); the
//!   device strategies fail with `Unsupported` otherwise
//!
//! ## Usage
//!
//! ```rust
//! use dedupx::{remove_duplicates, Strategy};
//!
//! let data = vec![5, 3, 5, 3, 3, 7];
//! let distinct = remove_duplicates(&data, Strategy::SortScan).unwrap();
//! assert_eq!(distinct, vec![3, 5, 7]);
//!
//! // Let the dispatch layer pick based on size and hardware
//! let distinct = remove_duplicates(&data, Strategy::Auto).unwrap();
//! assert_eq!(distinct.len(), 3);
//! ```

pub mod bench;
pub mod constants;
pub mod dataset;
pub mod device;
pub mod dispatch;
#[cfg(has_cuda)]
pub mod gpu;
pub mod partitioned;
pub mod sequential;
pub mod types;

pub use types::*;

#[cfg(test)]
pub mod test_utils;

#[cfg(test)]
#[path = "tests/dataset_tests.rs"]
mod dataset_tests;
#[cfg(test)]
#[path = "tests/sequential_tests.rs"]
mod sequential_tests;
#[cfg(test)]
#[path = "tests/partitioned_tests.rs"]
mod partitioned_tests;
#[cfg(test)]
#[path = "tests/device_tests.rs"]
mod device_tests;
#[cfg(test)]
#[path = "tests/bench_tests.rs"]
mod bench_tests;

// Re-export the main API
pub use bench::{run_benchmarks, BenchConfig, BenchRun, ScopedTimer, StrategyReport};
pub use dataset::{distinct_percentage, generate, reference_distinct_count};
pub use dispatch::{choose_strategy, get_hw_capabilities, remove_duplicates, HardwareCapabilities};
pub use partitioned::{dedup_partitioned, dedup_partitioned_with_workers};
pub use sequential::{dedup_hash_accumulate, dedup_sort_scan, dedup_sort_then_hash};

#[cfg(has_cuda)]
pub use device::DeviceDedupPlan;
pub use device::{DeviceKernel, filter_non_negative, filter_non_sentinel};
#[cfg(has_cuda)]
pub use gpu::{get_gpu_properties, launch_ptx, GpuDeviceProperties};
