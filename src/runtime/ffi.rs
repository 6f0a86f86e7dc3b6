//! Native cudart ABI definitions
//!
//! Just enough of the CUDA runtime's C interface to resolve the probe's
//! entry points and call them. None of these types are linked at build
//! time; they only describe what the loaded library is expected to export.

use std::ffi::{c_char, c_int, c_uchar};

/// Status code returned by every cudart entry point (`cudaError_t`)
pub type CudartReturn = c_int;

pub const CUDART_SUCCESS: CudartReturn = 0;
/// Returned for attributes the installed driver does not implement
pub const CUDART_UNSUPPORTED: CudartReturn = 1;
pub const CUDA_ERROR_INSUFFICIENT_DRIVER: CudartReturn = 35;
pub const CUDA_ERROR_NO_DEVICE: CudartReturn = 100;
pub const CUDA_ERROR_INVALID_DEVICE: CudartReturn = 101;

/// Device attribute identifier (`cudaDeviceAttr`)
pub type CudartDeviceAttr = c_int;

pub const DEV_ATTR_COMPUTE_CAPABILITY_MAJOR: CudartDeviceAttr = 75;
pub const DEV_ATTR_COMPUTE_CAPABILITY_MINOR: CudartDeviceAttr = 76;

pub type CudaSetDeviceFn = unsafe extern "C" fn(device: c_int) -> CudartReturn;
pub type CudaDeviceSynchronizeFn = unsafe extern "C" fn() -> CudartReturn;
pub type CudaDeviceResetFn = unsafe extern "C" fn() -> CudartReturn;
pub type CudaMemGetInfoFn = unsafe extern "C" fn(free: *mut usize, total: *mut usize) -> CudartReturn;
pub type CudaGetDeviceCountFn = unsafe extern "C" fn(count: *mut c_int) -> CudartReturn;
pub type CudaDeviceGetAttributeFn =
    unsafe extern "C" fn(value: *mut c_int, attr: CudartDeviceAttr, device: c_int) -> CudartReturn;
pub type CudaDriverGetVersionFn = unsafe extern "C" fn(version: *mut c_int) -> CudartReturn;
pub type CudaGetDevicePropertiesFn =
    unsafe extern "C" fn(prop: *mut CudaDeviceProp, device: c_int) -> CudartReturn;

/// `cudaUUID_t`
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CudaUuid {
    pub bytes: [c_uchar; 16],
}

/// `cudaDeviceProp` as laid out by the runtime.
///
/// Only `major` and `minor` are read, but every field must stay in place:
/// the runtime writes the whole record and any reordering would shift the
/// offsets of the two fields that matter.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CudaDeviceProp {
    pub name: [c_char; 256],
    pub uuid: CudaUuid,
    pub total_global_mem: usize,
    pub shared_mem_per_block: usize,
    pub regs_per_block: c_int,
    pub warp_size: c_int,
    pub mem_pitch: usize,
    pub max_threads_per_block: c_int,
    pub max_threads_dim: [c_int; 3],
    pub max_grid_size: [c_int; 3],
    pub clock_rate: c_int,
    pub total_const_mem: usize,
    pub major: c_int,
    pub minor: c_int,
    pub texture_alignment: usize,
    pub texture_pitch_alignment: usize,
    pub device_overlap: c_int,
    pub multi_processor_count: c_int,
    pub kernel_exec_timeout_enabled: c_int,
    pub integrated: c_int,
    pub can_map_host_memory: c_int,
    pub compute_mode: c_int,
    pub max_texture_1d: c_int,
    pub max_texture_1d_mipmap: c_int,
    pub max_texture_1d_linear: c_int,
    pub max_texture_2d: [c_int; 2],
    pub max_texture_2d_mipmap: [c_int; 2],
    pub max_texture_2d_linear: [c_int; 3],
    pub max_texture_2d_gather: [c_int; 2],
    pub max_texture_3d: [c_int; 3],
    pub max_texture_3d_alt: [c_int; 3],
    pub max_texture_cubemap: c_int,
    pub max_texture_1d_layered: [c_int; 2],
    pub max_texture_2d_layered: [c_int; 3],
    pub max_texture_cubemap_layered: [c_int; 2],
    pub max_surface_1d: c_int,
    pub max_surface_2d: [c_int; 2],
    pub max_surface_3d: [c_int; 3],
    pub max_surface_1d_layered: [c_int; 2],
    pub max_surface_2d_layered: [c_int; 3],
    pub max_surface_cubemap: c_int,
    pub max_surface_cubemap_layered: [c_int; 2],
    pub surface_alignment: usize,
    pub concurrent_kernels: c_int,
    pub ecc_enabled: c_int,
    pub pci_bus_id: c_int,
    pub pci_device_id: c_int,
    pub pci_domain_id: c_int,
    pub tcc_driver: c_int,
    pub async_engine_count: c_int,
    pub unified_addressing: c_int,
    pub memory_clock_rate: c_int,
    pub memory_bus_width: c_int,
    pub l2_cache_size: c_int,
    pub persisting_l2_cache_max_size: c_int,
    pub max_threads_per_multi_processor: c_int,
    pub stream_priorities_supported: c_int,
    pub global_l1_cache_supported: c_int,
    pub local_l1_cache_supported: c_int,
    pub shared_mem_per_multiprocessor: usize,
    pub regs_per_multiprocessor: c_int,
    pub managed_memory: c_int,
    pub is_multi_gpu_board: c_int,
    pub multi_gpu_board_group_id: c_int,
    pub single_to_double_precision_perf_ratio: c_int,
    pub pageable_memory_access: c_int,
    pub concurrent_managed_access: c_int,
    pub compute_preemption_supported: c_int,
    pub can_use_host_pointer_for_registered_mem: c_int,
    pub cooperative_launch: c_int,
    pub cooperative_multi_device_launch: c_int,
    pub pageable_memory_access_uses_host_page_tables: c_int,
    pub direct_managed_mem_access_from_host: c_int,
    pub access_policy_max_window_size: c_int,
}

/// Output buffer handed to `cudaGetDeviceProperties`.
///
/// Newer runtimes append fields to `cudaDeviceProp`; the trailing bytes
/// absorb those writes so they never land outside the allocation.
#[repr(C)]
pub struct DevicePropBuffer {
    pub prop: CudaDeviceProp,
    _reserved: [u8; 1024],
}

impl DevicePropBuffer {
    /// An all-zero buffer
    pub fn zeroed() -> Box<Self> {
        // SAFETY: every field is an integer or an array of integers, for
        // which the all-zero bit pattern is valid.
        Box::new(unsafe { std::mem::zeroed() })
    }
}
