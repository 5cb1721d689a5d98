// SPDX-License-Identifier: Apache-2.0

//! Duplicate-removal benchmark — all strategies on the same dataset
//!
//! Runs every strategy (CPU hash variants, sorted scan, partitioned worker
//! pool, and the CUDA kernels when available) against one reproducible
//! dataset, times a single invocation after warm-up, and prints the elapsed
//! time and the resulting cardinality per strategy.
//!
//! Usage:
//!   dedupx_bench [n] [--json]
//!
//!   n       dataset size (default 100000)
//!   --json  additionally emit the full report as JSON on stdout

use std::env;

use dedupx::bench::{run_benchmarks, BenchConfig};

fn main() {
    env_logger::init();

    let mut config = BenchConfig::default();
    let mut emit_json = false;
    for arg in env::args().skip(1) {
        if arg == "--json" {
            emit_json = true;
        } else if let Ok(n) = arg.parse::<usize>() {
            config.n = n;
            config.upper = n as i32;
        } else {
            eprintln!("usage: dedupx_bench [n] [--json]");
            std::process::exit(2);
        }
    }

    let caps = dedupx::get_hw_capabilities();
    eprintln!(
        "hardware: cpu_threads={} cuda={}",
        caps.cpu_threads, caps.has_cuda
    );
    #[cfg(has_cuda)]
    if caps.has_cuda {
        if let Ok(props) = dedupx::get_gpu_properties() {
            eprintln!(
                "device: {} ({} SMs, {:.1} GiB)",
                props.name,
                props.multiprocessor_count,
                props.total_memory as f64 / (1024.0 * 1024.0 * 1024.0)
            );
        }
    }

    let run = run_benchmarks(&config);

    println!("n={}", run.config.n);
    println!("number of unique elements = {}", run.reference_distinct);
    println!(
        "percentage of unique elements = {}%",
        run.distinct_percentage
    );
    println!("-------------------------------------------------");
    for report in &run.reports {
        match (&report.error, report.elapsed_ns, report.distinct) {
            (None, Some(ns), Some(distinct)) => {
                println!("{} ={}s", report.name, ns as f64 / 1_000_000_000.0);
                println!("number of uniques after duplicate removal = {}", distinct);
                if report.matches_reference == Some(false) {
                    println!("WARNING: cardinality does not match the reference counter");
                }
            }
            (Some(err), _, _) => {
                println!("{} skipped: {}", report.name, err);
            }
            _ => unreachable!("report carries either a result or an error"),
        }
        println!("-------------------------------------------------");
    }

    if emit_json {
        match serde_json::to_string_pretty(&run) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("failed to serialize report: {}", e),
        }
    }
}
