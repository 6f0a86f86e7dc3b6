//! Stub runtime entry points for tests
//!
//! Behaves like a host with two devices, each reporting 2 GB free of 8 GB
//! and compute capability 8.6. Individual entries are swapped out with
//! struct update syntax to simulate driver quirks.

use crate::runtime::ffi::{
    CudaDeviceProp, CudartDeviceAttr, CudartReturn, CUDART_SUCCESS, CUDART_UNSUPPORTED,
    CUDA_ERROR_INSUFFICIENT_DRIVER, CUDA_ERROR_INVALID_DEVICE, CUDA_ERROR_NO_DEVICE,
    DEV_ATTR_COMPUTE_CAPABILITY_MAJOR, DEV_ATTR_COMPUTE_CAPABILITY_MINOR,
};
use crate::runtime::loader::CudartApi;

use std::ffi::c_int;

pub(crate) const STUB_DEVICES: c_int = 2;
pub(crate) const STUB_FREE: u64 = 2_000_000_000;
pub(crate) const STUB_TOTAL: u64 = 8_000_000_000;

pub(crate) fn stub_api() -> CudartApi {
    CudartApi {
        set_device: stub_set_device,
        device_synchronize: stub_ok,
        device_reset: stub_ok,
        mem_get_info: stub_mem_get_info,
        get_device_count: stub_count_two,
        device_get_attribute: stub_attribute,
        driver_get_version: stub_driver_version,
        get_device_properties: stub_properties,
    }
}

unsafe extern "C" fn stub_ok() -> CudartReturn {
    CUDART_SUCCESS
}

pub(crate) unsafe extern "C" fn stub_fails() -> CudartReturn {
    999
}

unsafe extern "C" fn stub_set_device(device: c_int) -> CudartReturn {
    if (0..STUB_DEVICES).contains(&device) {
        CUDART_SUCCESS
    } else {
        CUDA_ERROR_INVALID_DEVICE
    }
}

pub(crate) unsafe extern "C" fn stub_set_device_accepts_all(_device: c_int) -> CudartReturn {
    CUDART_SUCCESS
}

unsafe extern "C" fn stub_mem_get_info(free: *mut usize, total: *mut usize) -> CudartReturn {
    *free = STUB_FREE as usize;
    *total = STUB_TOTAL as usize;
    CUDART_SUCCESS
}

pub(crate) unsafe extern "C" fn stub_mem_get_info_fails(
    _free: *mut usize,
    _total: *mut usize,
) -> CudartReturn {
    2
}

pub(crate) unsafe extern "C" fn stub_mem_free_exceeds_total(
    free: *mut usize,
    total: *mut usize,
) -> CudartReturn {
    *free = 4096;
    *total = 1024;
    CUDART_SUCCESS
}

unsafe extern "C" fn stub_count_two(count: *mut c_int) -> CudartReturn {
    *count = STUB_DEVICES;
    CUDART_SUCCESS
}

pub(crate) unsafe extern "C" fn stub_count_insufficient_driver(count: *mut c_int) -> CudartReturn {
    *count = 0;
    CUDA_ERROR_INSUFFICIENT_DRIVER
}

pub(crate) unsafe extern "C" fn stub_count_no_device(count: *mut c_int) -> CudartReturn {
    *count = 0;
    CUDA_ERROR_NO_DEVICE
}

pub(crate) unsafe extern "C" fn stub_count_fails(_count: *mut c_int) -> CudartReturn {
    999
}

unsafe extern "C" fn stub_attribute(
    value: *mut c_int,
    attr: CudartDeviceAttr,
    device: c_int,
) -> CudartReturn {
    if !(0..STUB_DEVICES).contains(&device) {
        return CUDA_ERROR_INVALID_DEVICE;
    }
    match attr {
        DEV_ATTR_COMPUTE_CAPABILITY_MAJOR => *value = 8,
        DEV_ATTR_COMPUTE_CAPABILITY_MINOR => *value = 6,
        _ => return CUDART_UNSUPPORTED,
    }
    CUDART_SUCCESS
}

pub(crate) unsafe extern "C" fn stub_attribute_unsupported(
    _value: *mut c_int,
    _attr: CudartDeviceAttr,
    _device: c_int,
) -> CudartReturn {
    CUDART_UNSUPPORTED
}

pub(crate) unsafe extern "C" fn stub_attribute_fails(
    _value: *mut c_int,
    _attr: CudartDeviceAttr,
    _device: c_int,
) -> CudartReturn {
    999
}

unsafe extern "C" fn stub_driver_version(version: *mut c_int) -> CudartReturn {
    *version = 12020;
    CUDART_SUCCESS
}

pub(crate) unsafe extern "C" fn stub_driver_version_fails(_version: *mut c_int) -> CudartReturn {
    3
}

/// Reports compute capability 7.5 through the bulk properties record
unsafe extern "C" fn stub_properties(prop: *mut CudaDeviceProp, device: c_int) -> CudartReturn {
    if !(0..STUB_DEVICES).contains(&device) {
        return CUDA_ERROR_INVALID_DEVICE;
    }
    (*prop).major = 7;
    (*prop).minor = 5;
    (*prop).integrated = 0;
    CUDART_SUCCESS
}
