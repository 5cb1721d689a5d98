// SPDX-License-Identifier: Apache-2.0

//! CUDA support for dedupx
//!
//! This module contains the CUDA-facing pieces used when `has_cuda` is enabled
//! (detected by `build.rs` when `nvcc` is available).
//!
//! It provides:
//! - One-time driver initialization and a process-wide context
//! - JIT compilation of PTX text with a content-keyed module cache
//! - A blocking launch helper that enforces the grid/block divisibility
//!   contract
//! - Device buffer allocation/copy helpers for `i32` arrays
//!
//! The context, properties cache, and module cache are process-wide resources
//! with an explicit init/compile lifecycle; callers go through the functions
//! here rather than touching driver state directly.

use crate::types::DedupxError;
use log::debug;
use std::collections::HashMap;
use std::ffi::{c_char, c_void, CStr, CString};
use std::ptr;
use std::sync::Mutex;

// CUDA runtime API declarations
unsafe extern "C" {
    fn cudaMalloc(ptr: *mut *mut c_void, size: usize) -> i32;
    fn cudaMemcpy(dst: *mut c_void, src: *const c_void, size: usize, kind: i32) -> i32;
    fn cudaFree(ptr: *mut c_void) -> i32;
}

// CUDA driver API declarations for raw FFI
#[repr(C)]
struct CUmod_st {
    _opaque: u8,
}
type CUmodule = *mut CUmod_st;

#[repr(C)]
struct CUfunc_st {
    _opaque: u8,
}
type CUfunction = *mut CUfunc_st;

#[repr(C)]
struct CUctx_st {
    _opaque: u8,
}
type CUcontext = *mut CUctx_st;

#[repr(C)]
struct CUstream_st {
    _opaque: u8,
}
type CUstream = *mut CUstream_st;

// Wrapper to make CUDA pointers Send - we know CUDA is thread-safe
struct SendModule(CUmodule);
unsafe impl Send for SendModule {}
unsafe impl Sync for SendModule {}

struct SendContext(CUcontext);
unsafe impl Send for SendContext {}
unsafe impl Sync for SendContext {}

#[allow(non_camel_case_types)]
type CUresult = i32;

// JIT option type and constants used
#[allow(non_camel_case_types)]
type CUjit_option = i32;

const CU_JIT_INFO_LOG_BUFFER: CUjit_option = 3;
const CU_JIT_INFO_LOG_BUFFER_SIZE_BYTES: CUjit_option = 4;
const CU_JIT_ERROR_LOG_BUFFER: CUjit_option = 5;
const CU_JIT_ERROR_LOG_BUFFER_SIZE_BYTES: CUjit_option = 6;
const CU_JIT_LOG_VERBOSE: CUjit_option = 12;

unsafe extern "C" {
    fn cuInit(flags: u32) -> CUresult;
    fn cuDeviceGet(device: *mut i32, ordinal: i32) -> CUresult;
    fn cuCtxCreate_v2(ctx: *mut CUcontext, flags: u32, dev: i32) -> CUresult;
    fn cuCtxSetCurrent(ctx: CUcontext) -> CUresult;
    fn cuModuleGetFunction(func: *mut CUfunction, module: CUmodule, name: *const c_char)
        -> CUresult;
    fn cuLaunchKernel(
        f: CUfunction,
        grid_dim_x: u32,
        grid_dim_y: u32,
        grid_dim_z: u32,
        block_dim_x: u32,
        block_dim_y: u32,
        block_dim_z: u32,
        shared_mem_bytes: u32,
        stream: CUstream,
        kernel_params: *mut *mut c_void,
        extra: *mut *mut c_void,
    ) -> CUresult;
    fn cuStreamCreate(stream: *mut CUstream, flags: u32) -> CUresult;
    fn cuStreamSynchronize(stream: CUstream) -> CUresult;

    // Device property functions
    fn cuDeviceGetAttribute(pi: *mut i32, attrib: i32, dev: i32) -> CUresult;
    fn cuDeviceGetName(name: *mut c_char, len: i32, dev: i32) -> CUresult;
    fn cuDeviceTotalMem_v2(bytes: *mut usize, dev: i32) -> CUresult;

    fn cuModuleLoadDataEx(
        module: *mut CUmodule,
        image: *const c_void,
        num_options: u32,
        options: *mut CUjit_option,
        option_values: *mut *mut c_void,
    ) -> CUresult;
}

// CUDA memory copy directions
const CUDA_MEMCPY_HOST_TO_DEVICE: i32 = 1;
const CUDA_MEMCPY_DEVICE_TO_HOST: i32 = 2;

// CUDA device attributes for cuDeviceGetAttribute
const CU_DEVICE_ATTRIBUTE_MULTIPROCESSOR_COUNT: i32 = 16;
const CU_DEVICE_ATTRIBUTE_MAX_THREADS_PER_BLOCK: i32 = 1;
const CU_DEVICE_ATTRIBUTE_WARP_SIZE: i32 = 10;
const CU_DEVICE_ATTRIBUTE_MAX_SHARED_MEMORY_PER_BLOCK: i32 = 8;
const CU_DEVICE_ATTRIBUTE_COMPUTE_CAPABILITY_MAJOR: i32 = 75;
const CU_DEVICE_ATTRIBUTE_COMPUTE_CAPABILITY_MINOR: i32 = 76;

// GPU device properties
#[derive(Debug, Clone)]
pub struct GpuDeviceProperties {
    pub name: String,
    pub total_memory: usize,
    pub multiprocessor_count: i32,
    pub max_threads_per_block: i32,
    pub warp_size: i32,
    pub shared_memory_per_block: usize,
    pub compute_capability_major: i32,
    pub compute_capability_minor: i32,
}

// Global module cache - can be accessed from any thread
lazy_static::lazy_static! {
  static ref MODULE_CACHE: Mutex<HashMap<String, SendModule>> = Mutex::new(HashMap::new());
  static ref CUDA_INITIALIZED: Mutex<bool> = Mutex::new(false);
  static ref GPU_PROPERTIES: Mutex<Option<GpuDeviceProperties>> = Mutex::new(None);
  static ref CUDA_CONTEXT: Mutex<Option<SendContext>> = Mutex::new(None);
  // Serialize context-set and module JIT to prevent race conditions
  static ref GPU_LAUNCH_MUTEX: Mutex<()> = Mutex::new(());
}

// Thread-local stream so each host thread launches on its own stream
thread_local! {
  static THREAD_STREAM: std::cell::RefCell<Option<CUstream>> = const { std::cell::RefCell::new(None) };
}

// Initialize CUDA if not already done
pub(crate) fn ensure_cuda_initialized() -> Result<(), DedupxError> {
    let mut initialized = CUDA_INITIALIZED.lock().unwrap();
    if !*initialized {
        unsafe {
            let result = cuInit(0);
            if result != 0 {
                debug!("DEDUPX GPU: cuInit failed code={}", result);
                return Err(DedupxError::Cuda(format!("cuInit failed: {}", result)));
            }

            let mut device = 0;
            let result = cuDeviceGet(&mut device, 0);
            if result != 0 {
                debug!("DEDUPX GPU: cuDeviceGet failed code={}", result);
                return Err(DedupxError::Cuda(format!("cuDeviceGet failed: {}", result)));
            }

            let mut ctx = ptr::null_mut();
            let result = cuCtxCreate_v2(&mut ctx, 0, device);
            if result != 0 {
                debug!("DEDUPX GPU: cuCtxCreate_v2 failed code={}", result);
                return Err(DedupxError::Cuda(format!("cuCtxCreate failed: {}", result)));
            }

            let mut ctx_cache = CUDA_CONTEXT.lock().unwrap();
            *ctx_cache = Some(SendContext(ctx));
        }
        *initialized = true;
    }
    // Always set context current for the calling thread
    unsafe {
        if let Some(ref ctx) = *CUDA_CONTEXT.lock().unwrap() {
            let result = cuCtxSetCurrent(ctx.0);
            if result != 0 {
                debug!("DEDUPX GPU: cuCtxSetCurrent (post-init) failed code={}", result);
                return Err(DedupxError::Cuda(format!(
                    "cuCtxSetCurrent failed: {}",
                    result
                )));
            }
        }
    }

    Ok(())
}

/// Get GPU device properties (cached after first call)
pub fn get_gpu_properties() -> Result<GpuDeviceProperties, DedupxError> {
    ensure_cuda_initialized()?;

    let mut props_cache = GPU_PROPERTIES.lock().unwrap();
    if let Some(ref props) = *props_cache {
        return Ok(props.clone());
    }

    unsafe {
        let device = 0i32; // Use device 0

        let mut name_bytes: Vec<c_char> = vec![0; 256];
        let result = cuDeviceGetName(name_bytes.as_mut_ptr(), 256, device);
        if result != 0 {
            return Err(DedupxError::Cuda(format!(
                "cuDeviceGetName failed: {}",
                result
            )));
        }

        // name_bytes is a fixed-size buffer returned by CUDA; interpret as C string without taking ownership
        let name = CStr::from_ptr(name_bytes.as_ptr())
            .to_string_lossy()
            .to_string();

        let mut total_memory = 0usize;
        let result = cuDeviceTotalMem_v2(&mut total_memory, device);
        if result != 0 {
            return Err(DedupxError::Cuda(format!(
                "cuDeviceTotalMem failed: {}",
                result
            )));
        }

        let get_attribute = |attr: i32| -> Result<i32, DedupxError> {
            let mut value = 0i32;
            let result = cuDeviceGetAttribute(&mut value, attr, device);
            if result != 0 {
                return Err(DedupxError::Cuda(format!(
                    "cuDeviceGetAttribute failed: {}",
                    result
                )));
            }
            Ok(value)
        };

        let props = GpuDeviceProperties {
            name,
            total_memory,
            multiprocessor_count: get_attribute(CU_DEVICE_ATTRIBUTE_MULTIPROCESSOR_COUNT)?,
            max_threads_per_block: get_attribute(CU_DEVICE_ATTRIBUTE_MAX_THREADS_PER_BLOCK)?,
            warp_size: get_attribute(CU_DEVICE_ATTRIBUTE_WARP_SIZE)?,
            shared_memory_per_block: get_attribute(CU_DEVICE_ATTRIBUTE_MAX_SHARED_MEMORY_PER_BLOCK)?
                as usize,
            compute_capability_major: get_attribute(CU_DEVICE_ATTRIBUTE_COMPUTE_CAPABILITY_MAJOR)?,
            compute_capability_minor: get_attribute(CU_DEVICE_ATTRIBUTE_COMPUTE_CAPABILITY_MINOR)?,
        };

        *props_cache = Some(props.clone());
        Ok(props)
    }
}

// Get or create a stream for this thread
fn get_thread_stream() -> Result<CUstream, DedupxError> {
    THREAD_STREAM.with(|stream_cell| {
        let mut stream_opt = stream_cell.borrow_mut();
        if stream_opt.is_none() {
            let mut stream = ptr::null_mut();
            unsafe {
                let result = cuStreamCreate(&mut stream, 0);
                if result != 0 {
                    return Err(DedupxError::Cuda(format!(
                        "cuStreamCreate failed: {}",
                        result
                    )));
                }
            }
            *stream_opt = Some(stream);
        }
        Ok(stream_opt.unwrap())
    })
}

// JIT-compile PTX text to a loaded module, or return the cached module.
// Cache key is a FNV-1a hash of the PTX content, not the kernel name, so two
// kernels sharing one source compile once.
fn get_or_compile_module(ptx_code: &'static str) -> Result<CUmodule, DedupxError> {
    // Acquire the GPU launch mutex only for context set and module cache/JIT
    let _gpu_lock = GPU_LAUNCH_MUTEX.lock().unwrap();

    unsafe {
        if let Some(ref ctx) = *CUDA_CONTEXT.lock().unwrap() {
            let result = cuCtxSetCurrent(ctx.0);
            if result != 0 {
                return Err(DedupxError::Cuda(format!(
                    "cuCtxSetCurrent failed: {}",
                    result
                )));
            }
        }
    }

    let mut hash: u64 = 0xcbf29ce484222325; // FNV-1a 64-bit offset basis
    let ptx_bytes = ptx_code.as_bytes();
    for &byte in &(ptx_bytes.len() as u64).to_le_bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    for &b in ptx_bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    let key = format!("ptx:{:016x}", hash);

    let mut cache = MODULE_CACHE.lock().unwrap();
    if let Some(module) = cache.get(&key) {
        debug!("DEDUPX GPU: module cache hit {}", key);
        return Ok(module.0);
    }

    // Keep logs alive for the whole JIT scope
    let mut error_log: Vec<i8> = vec![0; 8192];
    let mut info_log: Vec<i8> = vec![0; 8192];
    let error_log_size_u32: u32 = error_log.len() as u32;
    let info_log_size_u32: u32 = info_log.len() as u32;
    let verbose_flag_u32: u32 = 1;
    let mut options: [CUjit_option; 5] = [
        CU_JIT_ERROR_LOG_BUFFER,
        CU_JIT_ERROR_LOG_BUFFER_SIZE_BYTES,
        CU_JIT_INFO_LOG_BUFFER,
        CU_JIT_INFO_LOG_BUFFER_SIZE_BYTES,
        CU_JIT_LOG_VERBOSE,
    ];
    let mut option_values: [*mut c_void; 5] = [
        error_log.as_mut_ptr() as *mut c_void,
        (error_log_size_u32 as usize) as *mut c_void,
        info_log.as_mut_ptr() as *mut c_void,
        (info_log_size_u32 as usize) as *mut c_void,
        (verbose_flag_u32 as usize) as *mut c_void,
    ];

    let mut module = ptr::null_mut();
    let ptx_cstring = CString::new(ptx_code)
        .map_err(|e| DedupxError::InvalidPtx(format!("Invalid PTX code: {}", e)))?;
    unsafe {
        debug!("DEDUPX GPU: cuModuleLoadDataEx ({} bytes of PTX)", ptx_code.len());
        let result = cuModuleLoadDataEx(
            &mut module,
            ptx_cstring.as_ptr() as *const c_void,
            options.len() as u32,
            options.as_mut_ptr(),
            option_values.as_mut_ptr(),
        );
        if result != 0 {
            let len = error_log
                .iter()
                .position(|&c| c == 0)
                .unwrap_or(error_log.len());
            let err = {
                let ptr = error_log.as_ptr() as *const u8;
                let slice = std::slice::from_raw_parts(ptr, len);
                String::from_utf8_lossy(slice).to_string()
            };
            debug!(
                "DEDUPX GPU: cuModuleLoadDataEx failed (result={}) | error_log=\"{}\"",
                result, err
            );
            return Err(DedupxError::InvalidPtx(format!(
                "cuModuleLoadDataEx (PTX) failed: {} | {}",
                result, err
            )));
        }
        // Log any JIT info output for diagnostics
        let info_len = info_log
            .iter()
            .position(|&c| c == 0)
            .unwrap_or(info_log.len());
        if info_len > 0 {
            let info_msg = {
                let ptr = info_log.as_ptr() as *const u8;
                let slice = std::slice::from_raw_parts(ptr, info_len);
                String::from_utf8_lossy(slice).to_string()
            };
            debug!("DEDUPX GPU: load info: {}", info_msg);
        }
    }

    cache.insert(key.clone(), SendModule(module));
    debug!("DEDUPX GPU: module cache insert {} (len={})", key, cache.len());
    Ok(module)
}

/// JIT-compile PTX (or hit the module cache) without launching anything.
/// Lets a device plan surface compilation errors at creation time.
pub(crate) fn precompile_ptx(ptx_code: &'static str) -> Result<(), DedupxError> {
    ensure_cuda_initialized()?;
    get_or_compile_module(ptx_code).map(|_| ())
}

/// Launch a PTX kernel and block until it completes.
///
/// `global_threads` must be a multiple of `block_threads`; the launch fails
/// with [`DedupxError::LaunchConfig`] otherwise. `args` holds one pointer per
/// kernel parameter, each pointing at the host-resident parameter value.
pub fn launch_ptx(
    ptx_code: &'static str,
    kernel_name: &str,
    global_threads: u32,
    block_threads: u32,
    args: &[*const u8],
) -> Result<(), DedupxError> {
    debug!(
        "DEDUPX GPU: launch_ptx kernel={} global={} block={}",
        kernel_name, global_threads, block_threads
    );

    if block_threads == 0 || global_threads % block_threads != 0 {
        return Err(DedupxError::LaunchConfig(format!(
            "global thread count {} is not a multiple of block thread count {}",
            global_threads, block_threads
        )));
    }

    ensure_cuda_initialized()?;
    let module = get_or_compile_module(ptx_code)?;

    let kernel_cstring = CString::new(kernel_name)
        .map_err(|e| DedupxError::Internal(format!("Invalid kernel name: {}", e)))?;

    let mut function = ptr::null_mut();
    unsafe {
        debug!("DEDUPX GPU: cuModuleGetFunction({})", kernel_name);
        let result = cuModuleGetFunction(&mut function, module, kernel_cstring.as_ptr());
        if result != 0 {
            return Err(DedupxError::Cuda(format!(
                "cuModuleGetFunction failed: {}",
                result
            )));
        }
    }

    let stream = get_thread_stream()?;
    let blocks = global_threads / block_threads;

    unsafe {
        // CUDA expects an array of pointers to the actual parameter values;
        // args already holds those pointers.
        let mut kernel_params: Vec<*mut c_void> = Vec::with_capacity(args.len());
        for arg in args {
            kernel_params.push(*arg as *mut c_void);
        }

        debug!(
            "DEDUPX GPU: cuLaunchKernel blocks={} threads={} args={}",
            blocks,
            block_threads,
            kernel_params.len()
        );
        let result = cuLaunchKernel(
            function,
            blocks,
            1,
            1, // grid dimensions
            block_threads,
            1,
            1,      // block dimensions
            0,      // shared memory is statically declared in the PTX
            stream, // stream for this thread
            kernel_params.as_mut_ptr(),
            ptr::null_mut(),
        );

        if result != 0 {
            return Err(DedupxError::Cuda(format!(
                "cuLaunchKernel failed: {}",
                result
            )));
        }

        debug!("DEDUPX GPU: cuStreamSynchronize");
        let result = cuStreamSynchronize(stream);
        if result != 0 {
            return Err(DedupxError::Cuda(format!(
                "cuStreamSynchronize failed: {}",
                result
            )));
        }
    }

    Ok(())
}

/// A device-resident `i32` array with an owned allocation.
///
/// One buffer backs one named kernel parameter for the lifetime of a device
/// plan; it is allocated once and reused across warm-up and timed runs.
/// Not `Sync`: concurrent copies/launches against the same buffer must be
/// serialized by the caller.
pub struct DeviceBufferI32 {
    ptr: *mut i32,
    len: usize,
}

impl DeviceBufferI32 {
    pub fn alloc(len: usize) -> Result<Self, DedupxError> {
        ensure_cuda_initialized()?;
        let mut ptr: *mut i32 = ptr::null_mut();
        let size_bytes = len * std::mem::size_of::<i32>();
        let rc = unsafe {
            cudaMalloc(
                &mut ptr as *mut *mut i32 as *mut *mut c_void,
                size_bytes.max(std::mem::size_of::<i32>()),
            )
        };
        if rc != 0 {
            return Err(DedupxError::Internal(format!(
                "GPU memory allocation failed: {}",
                rc
            )));
        }
        Ok(Self { ptr, len })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Raw device pointer, for passing as a kernel parameter.
    pub fn device_ptr(&self) -> *mut i32 {
        self.ptr
    }

    /// Copy a host array of exactly `len` elements to the device.
    pub fn copy_from_host(&self, src: &[i32]) -> Result<(), DedupxError> {
        if src.len() != self.len {
            return Err(DedupxError::Internal(format!(
                "host->device copy length mismatch: {} vs {}",
                src.len(),
                self.len
            )));
        }
        let rc = unsafe {
            cudaMemcpy(
                self.ptr as *mut c_void,
                src.as_ptr() as *const c_void,
                self.len * std::mem::size_of::<i32>(),
                CUDA_MEMCPY_HOST_TO_DEVICE,
            )
        };
        if rc != 0 {
            return Err(DedupxError::Internal(format!(
                "GPU memory copy failed: {}",
                rc
            )));
        }
        Ok(())
    }

    /// Copy the device contents back into a host array of exactly `len` elements.
    pub fn copy_to_host(&self, dst: &mut [i32]) -> Result<(), DedupxError> {
        if dst.len() != self.len {
            return Err(DedupxError::Internal(format!(
                "device->host copy length mismatch: {} vs {}",
                dst.len(),
                self.len
            )));
        }
        let rc = unsafe {
            cudaMemcpy(
                dst.as_mut_ptr() as *mut c_void,
                self.ptr as *const c_void,
                self.len * std::mem::size_of::<i32>(),
                CUDA_MEMCPY_DEVICE_TO_HOST,
            )
        };
        if rc != 0 {
            return Err(DedupxError::Internal(format!(
                "GPU memory copy back failed: {}",
                rc
            )));
        }
        Ok(())
    }
}

impl Drop for DeviceBufferI32 {
    fn drop(&mut self) {
        unsafe {
            cudaFree(self.ptr as *mut c_void);
        }
    }
}
