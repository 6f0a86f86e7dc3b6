//! GPU identification domain types
//!
//! Compute capability and driver version as reported by a runtime, and the
//! per-GPU summary produced by enumeration.

use crate::domain::memory::DeviceMemoryInfo;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Instruction-set generation of a device (e.g. 8.6)
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ComputeCapability {
    pub major: i32,
    pub minor: i32,
}

impl ComputeCapability {
    pub fn new(major: i32, minor: i32) -> Self {
        Self { major, minor }
    }

    /// Whether this capability is at least `minimum`
    pub fn meets(&self, minimum: ComputeCapability) -> bool {
        *self >= minimum
    }

    /// The failed-query sentinel
    pub fn is_zero(&self) -> bool {
        self.major == 0 && self.minor == 0
    }
}

impl fmt::Display for ComputeCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Driver version, global to a runtime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DriverVersion {
    pub major: i32,
    pub minor: i32,
}

impl DriverVersion {
    /// Decode the runtime's packed integer, e.g. `12020` is 12.2
    pub fn from_raw(raw: i32) -> Self {
        Self {
            major: raw / 1000,
            minor: (raw % 1000) / 10,
        }
    }

    /// Parse a dotted kernel module version such as `6.3.6`
    pub fn parse(version: &str) -> Option<Self> {
        let mut parts = version.trim().split('.');
        let major = parts.next()?.parse().ok()?;
        let minor = parts.next().map_or(Some(0), |m| m.parse().ok())?;
        Some(Self { major, minor })
    }
}

impl fmt::Display for DriverVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Which library backs a [`GpuInfo`] entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GpuLibrary {
    Cuda,
    Rocm,
    Cpu,
}

impl fmt::Display for GpuLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuLibrary::Cuda => write!(f, "cuda"),
            GpuLibrary::Rocm => write!(f, "rocm"),
            GpuLibrary::Cpu => write!(f, "cpu"),
        }
    }
}

/// One usable compute device (or the host CPU fallback)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpuInfo {
    pub library: GpuLibrary,
    /// CPU vector variant, for the CPU fallback entry
    pub variant: Option<String>,
    /// Runtime device index as a string
    pub id: String,
    pub total_memory: u64,
    pub free_memory: u64,
    pub compute: Option<ComputeCapability>,
    /// Memory the runtime itself needs before any model can load
    pub minimum_memory: u64,
}

impl GpuInfo {
    /// A GPU entry reported by `library`
    pub fn gpu(
        library: GpuLibrary,
        device_id: u32,
        memory: DeviceMemoryInfo,
        compute: ComputeCapability,
    ) -> Self {
        Self {
            library,
            variant: None,
            id: device_id.to_string(),
            total_memory: memory.total,
            free_memory: memory.free,
            compute: Some(compute),
            minimum_memory: 0,
        }
    }

    /// The host-memory fallback entry
    pub fn cpu(variant: impl Into<String>, total_memory: u64, free_memory: u64) -> Self {
        Self {
            library: GpuLibrary::Cpu,
            variant: Some(variant.into()),
            id: "0".to_string(),
            total_memory,
            free_memory,
            compute: None,
            minimum_memory: 0,
        }
    }

    pub fn with_minimum_memory(mut self, bytes: u64) -> Self {
        self.minimum_memory = bytes;
        self
    }

    pub fn is_gpu(&self) -> bool {
        self.library != GpuLibrary::Cpu
    }
}

impl fmt::Display for GpuInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.id, self.library)
    }
}

/// Ordered enumeration result
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GpuInfoList(pub Vec<GpuInfo>);

impl GpuInfoList {
    pub fn iter(&self) -> std::slice::Iter<'_, GpuInfo> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first(&self) -> Option<&GpuInfo> {
        self.0.first()
    }

    /// Environment variable restricting a child process to these devices.
    ///
    /// Keyed on the first entry's library; returns `None` when no filter
    /// applies.
    pub fn visible_devices_env(&self) -> Option<(&'static str, String)> {
        let first = self.first()?;
        let variable = match first.library {
            GpuLibrary::Cuda => "CUDA_VISIBLE_DEVICES",
            GpuLibrary::Rocm => "HIP_VISIBLE_DEVICES",
            GpuLibrary::Cpu => {
                log::debug!("no device filter required for library {}", first.library);
                return None;
            }
        };

        let ids: Vec<&str> = self
            .iter()
            .filter(|g| g.library == first.library)
            .map(|g| g.id.as_str())
            .collect();
        Some((variable, ids.join(",")))
    }
}

impl From<Vec<GpuInfo>> for GpuInfoList {
    fn from(gpus: Vec<GpuInfo>) -> Self {
        Self(gpus)
    }
}
