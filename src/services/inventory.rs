//! GPU inventory service
//!
//! Probes the host for a usable runtime, enumerates its devices and falls
//! back to host memory when no GPU qualifies.

use crate::config::{Config, LimitsConfig};
use crate::discovery::{candidate_libraries, load_first};
use crate::domain::{GpuInfo, GpuInfoList};
use crate::error::{AppError, ProbeError};
use crate::host;
use crate::rocm::RocmRuntime;
use crate::runtime::GpuRuntime;

use std::sync::{Mutex, PoisonError};

/// Serialises whole probe passes within the process
static PROBE_LOCK: Mutex<()> = Mutex::new(());

/// Enumerates usable compute devices
pub struct InventoryService<'a> {
    config: &'a Config,
}

impl<'a> InventoryService<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Probe the host and list every usable device.
    ///
    /// The runtime is loaded, enumerated and released within this call.
    pub fn gpu_info(&self) -> Result<GpuInfoList, ProbeError> {
        let _probe = PROBE_LOCK.lock().unwrap_or_else(PoisonError::into_inner);

        let variant = host::cpu_variant();
        let gpu_allowed = host::supports_gpu_builds(variant);
        if !gpu_allowed {
            log::warn!("CPU does not have AVX or AVX2, disabling GPU support.");
        }

        log::info!("Detecting GPUs");
        let candidates = candidate_libraries(&self.config.discovery);
        let mut gpus = Vec::new();

        if let Some(mut probed) = load_first(&candidates, self.config.general.verbose) {
            if let Some(path) = probed.handle.library_path() {
                log::debug!("enumerating {} devices from {}", probed.device_count, path.display());
            }
            let collected = if gpu_allowed {
                collect_devices(&probed.handle, &self.config.limits)
            } else {
                Ok(Vec::new())
            };
            probed.handle.release()?;
            gpus = collected?;
        }

        if self.config.discovery.rocm {
            if let Some(rocm) = RocmRuntime::detect() {
                gpus.extend(collect_devices(&rocm, &self.config.limits)?);
            }
        }

        Ok(with_cpu_fallback(gpus, variant))
    }

    /// Bytes of VRAM available to a workload
    pub fn check_vram(&self) -> Result<u64, AppError> {
        if let Some(bytes) = self.config.limits.max_vram {
            log::info!("using configured VRAM limit of {} bytes", bytes);
            return Ok(bytes);
        }
        first_gpu_free_memory(&self.gpu_info()?)
    }
}

/// Every device of `runtime` that passes `limits`, in device order.
///
/// Devices whose memory query degraded to the zero sentinel are skipped;
/// a single bad device never aborts the enumeration.
pub fn collect_devices<R: GpuRuntime + ?Sized>(
    runtime: &R,
    limits: &LimitsConfig,
) -> Result<Vec<GpuInfo>, ProbeError> {
    let library = runtime.library();
    let compute_min = limits.compute_min_for(library);
    let mut gpus = Vec::new();

    for index in 0..runtime.device_count() as u32 {
        let device_id = runtime.device_id(index);
        let memory = runtime.memory_info(index)?;
        if memory.is_zero() {
            log::info!("skipping {} GPU {}: memory lookup failed", library, device_id);
            continue;
        }

        let compute = runtime.compute_capability(index)?;
        if !compute.meets(compute_min) {
            log::info!(
                "[{}] {} GPU is too old. Compute Capability detected: {}",
                device_id,
                library,
                compute
            );
            continue;
        }

        gpus.push(
            GpuInfo::gpu(library, device_id, memory, compute)
                .with_minimum_memory(limits.minimum_memory()),
        );
    }

    Ok(gpus)
}

/// `gpus`, or a single host-memory entry if it is empty
pub fn with_cpu_fallback(gpus: Vec<GpuInfo>, variant: &str) -> GpuInfoList {
    if !gpus.is_empty() {
        return GpuInfoList::from(gpus);
    }

    match host::host_memory() {
        Ok(mem) => GpuInfoList::from(vec![GpuInfo::cpu(variant, mem.total, mem.free)]),
        Err(e) => {
            log::info!("error looking up CPU memory: {}", e);
            GpuInfoList::default()
        }
    }
}

/// Free memory of the first entry, if it is a GPU
pub fn first_gpu_free_memory(list: &GpuInfoList) -> Result<u64, AppError> {
    match list.first() {
        Some(gpu) if gpu.is_gpu() && gpu.free_memory > 0 => Ok(gpu.free_memory),
        _ => Err(AppError::NoGpusFound),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DiscoveryConfig;
    use crate::domain::GpuLibrary;
    use crate::mock::{MockDevice, MockRuntime};

    const GIB: u64 = 1024 * 1024 * 1024;

    #[test]
    fn test_collect_all_devices() {
        let runtime = MockRuntime::new(vec![
            MockDevice::new(2 * GIB, 8 * GIB, 8, 6),
            MockDevice::new(20 * GIB, 24 * GIB, 8, 9),
        ]);
        let gpus = collect_devices(&runtime, &LimitsConfig::default()).unwrap();

        assert_eq!(gpus.len(), 2);
        assert_eq!(gpus[0].id, "0");
        assert_eq!(gpus[0].total_memory, 8 * GIB);
        assert_eq!(gpus[1].free_memory, 20 * GIB);
        assert_eq!(gpus[1].minimum_memory, 457 * 1024 * 1024);
    }

    #[test]
    fn test_broken_device_does_not_abort_enumeration() {
        let runtime = MockRuntime::new(vec![
            MockDevice::broken(),
            MockDevice::new(GIB, 4 * GIB, 7, 5),
        ]);
        let gpus = collect_devices(&runtime, &LimitsConfig::default()).unwrap();

        assert_eq!(gpus.len(), 1);
        assert_eq!(gpus[0].id, "1");
    }

    #[test]
    fn test_old_devices_are_skipped() {
        let runtime = MockRuntime::new(vec![
            MockDevice::new(GIB, 4 * GIB, 3, 7),
            MockDevice::new(GIB, 4 * GIB, 5, 0),
        ]);
        let gpus = collect_devices(&runtime, &LimitsConfig::default()).unwrap();

        assert_eq!(gpus.len(), 1);
        assert_eq!(gpus[0].id, "1");
    }

    #[test]
    fn test_rocm_devices_use_gfx_minimum() {
        let runtime = MockRuntime::new(vec![
            MockDevice::new(GIB, 4 * GIB, 8, 3),
            MockDevice::new(6 * GIB, 16 * GIB, 9, 0),
            MockDevice::new(2 * GIB, 16 * GIB, 11, 0),
        ])
        .with_library(GpuLibrary::Rocm);
        let gpus = collect_devices(&runtime, &LimitsConfig::default()).unwrap();

        assert_eq!(gpus.len(), 2);
        assert!(gpus.iter().all(|g| g.library == GpuLibrary::Rocm));
        assert_eq!(gpus[0].id, "1");
        assert_eq!(gpus[0].free_memory, 6 * GIB);
    }

    #[test]
    fn test_released_runtime_is_reported() {
        let runtime = MockRuntime::new(vec![MockDevice::new(GIB, 4 * GIB, 8, 0)]);
        runtime.release();
        let err = collect_devices(&runtime, &LimitsConfig::default()).unwrap_err();
        assert!(err.is_programming_error());
    }

    #[test]
    fn test_cpu_fallback_keeps_gpus() {
        let gpus = vec![GpuInfo::gpu(
            GpuLibrary::Cuda,
            0,
            crate::domain::DeviceMemoryInfo::from_free_total(GIB, 2 * GIB).unwrap(),
            crate::domain::ComputeCapability::new(8, 0),
        )];
        let list = with_cpu_fallback(gpus, "avx2");
        assert_eq!(list.len(), 1);
        assert_eq!(list.first().unwrap().library, GpuLibrary::Cuda);
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn test_cpu_fallback_when_no_gpus() {
        let list = with_cpu_fallback(Vec::new(), "avx2");
        let entry = list.first().unwrap();
        assert_eq!(entry.library, GpuLibrary::Cpu);
        assert_eq!(entry.variant.as_deref(), Some("avx2"));
        assert!(entry.total_memory > 0);
    }

    #[test]
    fn test_first_gpu_free_memory() {
        let gpu = GpuInfo::gpu(
            GpuLibrary::Cuda,
            0,
            crate::domain::DeviceMemoryInfo::from_free_total(3 * GIB, 8 * GIB).unwrap(),
            crate::domain::ComputeCapability::new(8, 0),
        );
        assert_eq!(
            first_gpu_free_memory(&GpuInfoList::from(vec![gpu])).unwrap(),
            3 * GIB
        );

        let amd = GpuInfo::gpu(
            GpuLibrary::Rocm,
            0,
            crate::domain::DeviceMemoryInfo::from_free_total(5 * GIB, 16 * GIB).unwrap(),
            crate::domain::ComputeCapability::new(11, 0),
        );
        assert_eq!(
            first_gpu_free_memory(&GpuInfoList::from(vec![amd])).unwrap(),
            5 * GIB
        );

        let cpu_only = GpuInfoList::from(vec![GpuInfo::cpu("avx", 16 * GIB, 8 * GIB)]);
        assert!(matches!(
            first_gpu_free_memory(&cpu_only),
            Err(AppError::NoGpusFound)
        ));
    }

    #[test]
    fn test_check_vram_override() {
        let mut config = Config::default();
        config.limits.max_vram = Some(6 * GIB);
        assert_eq!(InventoryService::new(&config).check_vram().unwrap(), 6 * GIB);
    }

    #[test]
    fn test_gpu_info_without_runtime() {
        let config = Config {
            discovery: DiscoveryConfig {
                library: Some("/nonexistent/libcudart.so".to_string()),
                rocm: false,
                ..DiscoveryConfig::default()
            },
            ..Config::default()
        };
        let list = InventoryService::new(&config).gpu_info().unwrap();
        assert!(list.iter().all(|g| !g.is_gpu()));
    }
}
