//! Trait definitions for runtime queries
//!
//! [`GpuRuntime`] abstracts a probed vendor runtime so enumeration can be
//! tested against a mock.

use crate::domain::{ComputeCapability, DeviceMemoryInfo, DriverVersion, GpuLibrary};
use crate::error::ProbeError;
use crate::runtime::RuntimeHandle;

/// A ready GPU runtime that answers per-device queries
///
/// Devices are addressed by position, `0..device_count()`. Per-device
/// methods degrade to zero sentinels on device failures and only return
/// `Err` for lifecycle misuse.
pub trait GpuRuntime: Send + Sync {
    /// Library family this runtime belongs to
    fn library(&self) -> GpuLibrary;

    /// Number of devices visible to the runtime
    fn device_count(&self) -> usize;

    /// Id reported to users for the device at `index`
    fn device_id(&self, index: u32) -> u32 {
        index
    }

    /// Memory split of one device
    fn memory_info(&self, device_id: u32) -> Result<DeviceMemoryInfo, ProbeError>;

    /// Compute capability of one device
    fn compute_capability(&self, device_id: u32) -> Result<ComputeCapability, ProbeError>;

    /// Runtime driver version
    fn driver_version(&self) -> Result<DriverVersion, ProbeError>;
}

impl GpuRuntime for RuntimeHandle {
    fn library(&self) -> GpuLibrary {
        GpuLibrary::Cuda
    }

    fn device_count(&self) -> usize {
        RuntimeHandle::device_count(self)
    }

    fn memory_info(&self, device_id: u32) -> Result<DeviceMemoryInfo, ProbeError> {
        RuntimeHandle::memory_info(self, device_id)
    }

    fn compute_capability(&self, device_id: u32) -> Result<ComputeCapability, ProbeError> {
        RuntimeHandle::compute_capability(self, device_id)
    }

    fn driver_version(&self) -> Result<DriverVersion, ProbeError> {
        RuntimeHandle::driver_version(self)
    }
}
