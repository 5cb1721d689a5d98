// SPDX-License-Identifier: Apache-2.0

// types.rs for dedupx
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DedupxError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CUDA error: {0}")]
    Cuda(String),
    #[error("Invalid PTX code: {0}")]
    InvalidPtx(String),
    #[error("Launch configuration error: {0}")]
    LaunchConfig(String),
    #[error("Internal error: {0}")]
    Internal(String),
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

pub type Result<T> = std::result::Result<T, DedupxError>;

/// The duplicate-removal strategies the engine can run.
///
/// Every strategy consumes the same dataset and produces the same distinct
/// values as a set; they differ in ordering, complexity class, and the
/// hardware they exercise. `Auto` lets the dispatch layer pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strategy {
    /// Single-threaded ordered-map accumulation, input order.
    HashAccumulate,
    /// Sort the copy first, then accumulate. Same complexity, better locality.
    SortThenHash,
    /// Sort the copy, then a single linear emit-on-change pass.
    SortScan,
    /// Fixed worker pool over contiguous ranges, sequential merge.
    Partitioned,
    /// GPU first-occurrence scan with shared-memory tiling.
    DeviceTiled,
    /// GPU brute-force O(N^2) first-occurrence scan.
    DeviceNaive,
    /// Let the dispatch layer choose based on size and hardware.
    Auto,
}

impl Strategy {
    /// All concrete strategies, in benchmark-report order. Excludes `Auto`.
    pub const ALL: [Strategy; 6] = [
        Strategy::HashAccumulate,
        Strategy::SortThenHash,
        Strategy::SortScan,
        Strategy::Partitioned,
        Strategy::DeviceTiled,
        Strategy::DeviceNaive,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Strategy::HashAccumulate => "cpu hash-accumulate",
            Strategy::SortThenHash => "cpu sort-then-hash",
            Strategy::SortScan => "cpu sort-then-scan",
            Strategy::Partitioned => "cpu partitioned",
            Strategy::DeviceTiled => "gpu tiled-cache",
            Strategy::DeviceNaive => "gpu brute-force O(N^2)",
            Strategy::Auto => "auto",
        }
    }

    /// Whether the strategy guarantees ascending output order.
    ///
    /// Hash-based strategies happen to emit ascending today because the
    /// backing map is ordered, but only sort-based strategies promise it.
    pub fn ordered_output(&self) -> bool {
        matches!(self, Strategy::SortThenHash | Strategy::SortScan)
    }

    pub fn needs_cuda(&self) -> bool {
        matches!(self, Strategy::DeviceTiled | Strategy::DeviceNaive)
    }
}
