//! Per-device memory and attribute queries
//!
//! The `try_*` methods report every failure. The plain methods are what
//! enumeration loops use: a failing device degrades to the zero sentinel
//! and only [`ProbeError::InvalidHandleUse`] is returned as an error.

use crate::domain::{ComputeCapability, DeviceMemoryInfo, DriverVersion};
use crate::error::ProbeError;
use crate::runtime::ffi::{
    CudaDeviceProp, CudartDeviceAttr, CUDART_SUCCESS, CUDART_UNSUPPORTED,
    CUDA_ERROR_INVALID_DEVICE, DEV_ATTR_COMPUTE_CAPABILITY_MAJOR,
    DEV_ATTR_COMPUTE_CAPABILITY_MINOR, DevicePropBuffer,
};
use crate::runtime::handle::RuntimeHandle;
use crate::runtime::loader::CudartApi;

use std::ffi::c_int;

impl RuntimeHandle {
    /// Free/total/used memory of `device_id`, or the zero sentinel if the
    /// runtime rejects the query
    pub fn memory_info(&self, device_id: u32) -> Result<DeviceMemoryInfo, ProbeError> {
        recover(self.try_memory_info(device_id), device_id, DeviceMemoryInfo::zero())
    }

    /// Free/total/used memory of `device_id`.
    ///
    /// Switching the active device and reading memory happen under one
    /// lock so concurrent callers never see another device's numbers.
    pub fn try_memory_info(&self, device_id: u32) -> Result<DeviceMemoryInfo, ProbeError> {
        let api = self.api("memory_info")?;
        let device = native_device(device_id)?;

        let _context = self.lock_context();

        let status = unsafe { (api.set_device)(device) };
        self.trace_status("cudaSetDevice", status);
        if status != CUDART_SUCCESS {
            return Err(device_failure(device_id, "cudaSetDevice", status));
        }

        let mut free: usize = 0;
        let mut total: usize = 0;
        let status = unsafe { (api.mem_get_info)(&mut free, &mut total) };
        self.trace_status("cudaMemGetInfo", status);
        if status != CUDART_SUCCESS {
            return Err(device_failure(device_id, "cudaMemGetInfo", status));
        }

        DeviceMemoryInfo::from_free_total(free as u64, total as u64).ok_or_else(|| {
            log::warn!(
                "device {} reports {} bytes free of {} total",
                device_id,
                free,
                total
            );
            device_failure(device_id, "cudaMemGetInfo (free above total)", status)
        })
    }

    /// Compute capability of `device_id`, or `0.0` if the runtime rejects
    /// the query
    pub fn compute_capability(&self, device_id: u32) -> Result<ComputeCapability, ProbeError> {
        recover(
            self.try_compute_capability(device_id),
            device_id,
            ComputeCapability::default(),
        )
    }

    /// Compute capability of `device_id`.
    ///
    /// Reads the two capability attributes; if the driver does not support
    /// per-attribute queries, falls back to the bulk properties record.
    pub fn try_compute_capability(&self, device_id: u32) -> Result<ComputeCapability, ProbeError> {
        let api = self.api("compute_capability")?;
        let device = native_device(device_id)?;

        let lightweight = self
            .attribute(api, device_id, device, DEV_ATTR_COMPUTE_CAPABILITY_MAJOR)
            .and_then(|major| {
                let minor =
                    self.attribute(api, device_id, device, DEV_ATTR_COMPUTE_CAPABILITY_MINOR)?;
                Ok(ComputeCapability::new(major, minor))
            });

        match lightweight {
            Err(ProbeError::UnsupportedAttribute { .. }) => {
                self.capability_from_properties(api, device_id, device)
            }
            other => other,
        }
    }

    /// Driver version of the runtime. No fallback.
    pub fn driver_version(&self) -> Result<DriverVersion, ProbeError> {
        let api = self.api("driver_version")?;

        let mut raw: c_int = 0;
        let status = unsafe { (api.driver_get_version)(&mut raw) };
        self.trace_status("cudaDriverGetVersion", status);
        if status != CUDART_SUCCESS {
            return Err(ProbeError::RuntimeCallFailed {
                call: "cudaDriverGetVersion",
                status,
            });
        }

        Ok(DriverVersion::from_raw(raw))
    }

    /// Block until the active device has finished all work
    pub fn synchronize(&self) -> Result<(), ProbeError> {
        let api = self.api("synchronize")?;
        let status = unsafe { (api.device_synchronize)() };
        self.trace_status("cudaDeviceSynchronize", status);
        runtime_call("cudaDeviceSynchronize", status)
    }

    /// Destroy all state the runtime holds for `device_id` in this process.
    ///
    /// Never called implicitly; other processes sharing the device are
    /// unaffected but any allocation this process made on it is lost.
    pub fn reset_device(&self, device_id: u32) -> Result<(), ProbeError> {
        let api = self.api("reset_device")?;
        let device = native_device(device_id)?;

        let _context = self.lock_context();

        let status = unsafe { (api.set_device)(device) };
        self.trace_status("cudaSetDevice", status);
        if status != CUDART_SUCCESS {
            return Err(device_failure(device_id, "cudaSetDevice", status));
        }

        let status = unsafe { (api.device_reset)() };
        self.trace_status("cudaDeviceReset", status);
        runtime_call("cudaDeviceReset", status)
    }

    fn attribute(
        &self,
        api: &CudartApi,
        device_id: u32,
        device: c_int,
        attribute: CudartDeviceAttr,
    ) -> Result<i32, ProbeError> {
        let mut value: c_int = 0;
        let status = unsafe { (api.device_get_attribute)(&mut value, attribute, device) };
        self.trace_status("cudaDeviceGetAttribute", status);

        match status {
            CUDART_SUCCESS => Ok(value),
            CUDART_UNSUPPORTED => Err(ProbeError::UnsupportedAttribute {
                device_id,
                attribute,
            }),
            other => Err(device_failure(device_id, "cudaDeviceGetAttribute", other)),
        }
    }

    fn capability_from_properties(
        &self,
        api: &CudartApi,
        device_id: u32,
        device: c_int,
    ) -> Result<ComputeCapability, ProbeError> {
        let mut buffer = DevicePropBuffer::zeroed();
        let prop = std::ptr::addr_of_mut!(*buffer).cast::<CudaDeviceProp>();

        let status = unsafe { (api.get_device_properties)(prop, device) };
        self.trace_status("cudaGetDeviceProperties", status);
        if status != CUDART_SUCCESS {
            return Err(device_failure(device_id, "cudaGetDeviceProperties", status));
        }

        Ok(ComputeCapability::new(buffer.prop.major, buffer.prop.minor))
    }
}

/// Degrade per-device failures to `sentinel`; lifecycle misuse still errors
fn recover<T>(result: Result<T, ProbeError>, device_id: u32, sentinel: T) -> Result<T, ProbeError> {
    match result {
        Ok(value) => Ok(value),
        Err(e) if e.is_programming_error() => Err(e),
        Err(e) => {
            log::warn!("GPU {} query failed, reporting zeros: {}", device_id, e);
            Ok(sentinel)
        }
    }
}

fn native_device(device_id: u32) -> Result<c_int, ProbeError> {
    c_int::try_from(device_id).map_err(|_| ProbeError::DeviceQueryFailed {
        device_id,
        call: "device index",
        status: CUDA_ERROR_INVALID_DEVICE,
    })
}

fn device_failure(device_id: u32, call: &'static str, status: c_int) -> ProbeError {
    ProbeError::DeviceQueryFailed {
        device_id,
        call,
        status,
    }
}

fn runtime_call(call: &'static str, status: c_int) -> Result<(), ProbeError> {
    if status == CUDART_SUCCESS {
        Ok(())
    } else {
        Err(ProbeError::RuntimeCallFailed { call, status })
    }
}
