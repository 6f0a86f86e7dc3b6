//! Configuration system
//!
//! Handles TOML config file parsing, environment overrides and CLI
//! argument merging.

pub mod builder;
pub mod file;

pub use builder::ConfigBuilder;
pub use file::ConfigFile;

use crate::domain::{ComputeCapability, GpuLibrary};
use serde::{Deserialize, Serialize};

const MIB: u64 = 1024 * 1024;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,
    /// Runtime library discovery
    pub discovery: DiscoveryConfig,
    /// Device acceptance limits
    pub limits: LimitsConfig,
}

/// General configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log every symbol resolution and native status code
    pub verbose: bool,
}

/// Runtime library discovery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Probe only this library path
    pub library: Option<String>,
    /// Extra glob patterns, searched before the built-in ones
    pub search_paths: Vec<String>,
    /// Include the built-in locations for this OS
    pub use_default_paths: bool,
    /// Enumerate AMD GPUs through the amdgpu driver
    pub rocm: bool,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            library: None,
            search_paths: Vec::new(),
            use_default_paths: true,
            rocm: true,
        }
    }
}

/// Device acceptance limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Minimum compute capability major version
    pub compute_major: i32,
    /// Minimum compute capability minor version
    pub compute_minor: i32,
    /// Oldest AMD graphics IP major version accepted
    pub rocm_gfx_major: i32,
    /// Memory reserved by the runtime itself, in MiB
    pub minimum_memory_mib: u64,
    /// Report this many bytes of VRAM instead of probing
    pub max_vram: Option<u64>,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            compute_major: 5,
            compute_minor: 0,
            rocm_gfx_major: 9,
            minimum_memory_mib: 457,
            max_vram: None,
        }
    }
}

impl LimitsConfig {
    /// Oldest compute capability accepted
    pub fn compute_min(&self) -> ComputeCapability {
        ComputeCapability::new(self.compute_major, self.compute_minor)
    }

    /// Oldest capability accepted for devices of `library`
    pub fn compute_min_for(&self, library: GpuLibrary) -> ComputeCapability {
        match library {
            GpuLibrary::Rocm => ComputeCapability::new(self.rocm_gfx_major, 0),
            _ => self.compute_min(),
        }
    }

    /// Runtime memory reservation in bytes
    pub fn minimum_memory(&self) -> u64 {
        self.minimum_memory_mib.saturating_mul(MIB)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(!config.general.verbose);
        assert!(config.discovery.use_default_paths);
        assert_eq!(config.limits.compute_min(), ComputeCapability::new(5, 0));
        assert_eq!(config.limits.minimum_memory(), 457 * MIB);
        assert!(config.limits.max_vram.is_none());
        assert!(config.discovery.rocm);
    }

    #[test]
    fn test_compute_min_per_library() {
        let limits = LimitsConfig::default();
        assert_eq!(limits.compute_min_for(GpuLibrary::Cuda), ComputeCapability::new(5, 0));
        assert_eq!(limits.compute_min_for(GpuLibrary::Rocm), ComputeCapability::new(9, 0));
    }

    #[test]
    fn test_minimum_memory_saturates() {
        let limits = LimitsConfig {
            minimum_memory_mib: u64::MAX,
            ..LimitsConfig::default()
        };
        assert_eq!(limits.minimum_memory(), u64::MAX);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [limits]
            compute_major = 6
            "#,
        )
        .unwrap();
        assert_eq!(config.limits.compute_min(), ComputeCapability::new(6, 0));
        assert_eq!(config.limits.minimum_memory_mib, 457);
        assert!(config.discovery.use_default_paths);
    }
}
