//! Domain models for gpuprobe
//!
//! Plain value types produced by the runtime probe and the enumeration
//! service. Invalid combinations are rejected on construction.

pub mod gpu;
pub mod memory;

pub use gpu::{ComputeCapability, DriverVersion, GpuInfo, GpuInfoList, GpuLibrary};
pub use memory::DeviceMemoryInfo;
