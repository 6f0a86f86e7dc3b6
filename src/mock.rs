//! Mock implementations for testing
//!
//! Provides a mock runtime for exercising enumeration without a GPU.

use crate::domain::{ComputeCapability, DeviceMemoryInfo, DriverVersion, GpuLibrary};
use crate::error::ProbeError;
use crate::runtime::{GpuRuntime, HandleStatus};

use std::sync::atomic::{AtomicBool, Ordering};

/// Mock device state
#[derive(Debug, Clone)]
pub struct MockDevice {
    pub memory: DeviceMemoryInfo,
    pub compute: ComputeCapability,
}

impl MockDevice {
    /// A device with `free` of `total` bytes and capability `major.minor`
    pub fn new(free: u64, total: u64, major: i32, minor: i32) -> Self {
        Self {
            memory: DeviceMemoryInfo::from_free_total(free, total).unwrap(),
            compute: ComputeCapability::new(major, minor),
        }
    }

    /// A device whose queries fail, as seen through the sentinel policy
    pub fn broken() -> Self {
        Self {
            memory: DeviceMemoryInfo::zero(),
            compute: ComputeCapability::default(),
        }
    }
}

/// Mock runtime holding a fixed device list
#[derive(Debug)]
pub struct MockRuntime {
    library: GpuLibrary,
    devices: Vec<MockDevice>,
    driver: DriverVersion,
    released: AtomicBool,
}

impl MockRuntime {
    pub fn new(devices: Vec<MockDevice>) -> Self {
        Self {
            library: GpuLibrary::Cuda,
            devices,
            driver: DriverVersion::from_raw(12020),
            released: AtomicBool::new(false),
        }
    }

    /// Report devices as belonging to `library`
    pub fn with_library(mut self, library: GpuLibrary) -> Self {
        self.library = library;
        self
    }

    /// Simulate the handle having been released
    pub fn release(&self) {
        self.released.store(true, Ordering::SeqCst);
    }

    fn check(&self, operation: &'static str) -> Result<(), ProbeError> {
        if self.released.load(Ordering::SeqCst) {
            Err(ProbeError::InvalidHandleUse {
                operation,
                state: HandleStatus::Released,
            })
        } else {
            Ok(())
        }
    }
}

impl GpuRuntime for MockRuntime {
    fn library(&self) -> GpuLibrary {
        self.library
    }

    fn device_count(&self) -> usize {
        self.devices.len()
    }

    fn memory_info(&self, device_id: u32) -> Result<DeviceMemoryInfo, ProbeError> {
        self.check("memory_info")?;
        Ok(self
            .devices
            .get(device_id as usize)
            .map(|d| d.memory)
            .unwrap_or_default())
    }

    fn compute_capability(&self, device_id: u32) -> Result<ComputeCapability, ProbeError> {
        self.check("compute_capability")?;
        Ok(self
            .devices
            .get(device_id as usize)
            .map(|d| d.compute)
            .unwrap_or_default())
    }

    fn driver_version(&self) -> Result<DriverVersion, ProbeError> {
        self.check("driver_version")?;
        Ok(self.driver)
    }
}
