// SPDX-License-Identifier: Apache-2.0

// build.rs for dedupx
use std::env;
use std::path::Path;
use std::process::Command;

fn find_nvcc() -> Option<String> {
    let nvcc_candidates = [
        "nvcc",
        "/usr/local/cuda/bin/nvcc",
        "/opt/cuda/bin/nvcc",
        "/usr/bin/nvcc",
    ];

    if let Ok(cuda_home) = env::var("CUDA_HOME") {
        let cuda_nvcc = format!("{}/bin/nvcc", cuda_home);
        if Command::new(&cuda_nvcc).arg("--version").output().is_ok() {
            return Some(cuda_nvcc);
        }
    }

    for nvcc in &nvcc_candidates {
        if Command::new(nvcc).arg("--version").output().is_ok() {
            return Some(nvcc.to_string());
        }
    }

    None
}

fn main() {
    println!("cargo:rustc-check-cfg=cfg(has_cuda)");

    // All kernels are JIT-compiled from PTX text at runtime, so the CUDA
    // toolkit is only needed for the driver/runtime libraries, not for nvcc
    // codegen. nvcc presence is still the most reliable "CUDA lives here"
    // probe across distros.
    if find_nvcc().is_none() {
        return;
    }
    println!("cargo:rustc-cfg=has_cuda");

    let cuda_home = env::var("CUDA_HOME")
        .or_else(|_| env::var("CUDA_PATH"))
        .unwrap_or_else(|_| "/usr/local/cuda".to_string());

    let driver_candidates = [
        "/usr/lib/x86_64-linux-gnu",
        "/usr/lib64",
        "/usr/local/nvidia/lib64",
        "/usr/lib/wsl/lib",
    ];

    for dir in &driver_candidates {
        let p = Path::new(dir);
        if p.join("libcuda.so.1").exists() {
            println!("cargo:rustc-link-search=native={}", p.display());
            println!("cargo:rustc-link-arg=-Wl,-rpath,{}", p.display());
        }
    }

    let cuda_lib64 = Path::new(&cuda_home).join("lib64");
    if cuda_lib64.exists() {
        println!("cargo:rustc-link-search=native={}", cuda_lib64.display());
        println!("cargo:rustc-link-arg=-Wl,-rpath,{}", cuda_lib64.display());
    }

    println!("cargo:rustc-link-lib=dylib=cudart");
    println!("cargo:rustc-link-lib=dylib=cuda");
}
