//! AMD GPU enumeration from the amdgpu kernel driver
//!
//! The amdgpu driver publishes a KFD topology under sysfs with one node per
//! compute agent. CPU agents are listed first; every GPU node is numbered
//! after them, so the HIP device index is the node id minus the number of
//! CPU nodes seen before it.

use crate::discovery::search_dirs_from_env;
use crate::domain::{ComputeCapability, DeviceMemoryInfo, DriverVersion, GpuLibrary};
use crate::error::ProbeError;
use crate::runtime::GpuRuntime;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Mount point of sysfs
pub const SYSFS_ROOT: &str = "/sys";

const DRIVER_DIR: &str = "module/amdgpu";
const NODES_DIR: &str = "class/kfd/kfd/topology/nodes";

/// Devices with less memory than this are integrated GPUs
pub const IGPU_MEMORY_LIMIT: u64 = 1024 * 1024 * 1024;

/// Well-known ROCm install locations, searched after the loader path
pub const ROCM_LIB_DIRS: &[&str] = &["/opt/rocm/lib", "/usr/share/ollama/lib/rocm"];

/// Entries a directory must contain to count as a usable ROCm install
const ROCM_LIB_GLOBS: &[&str] = &["libhipblas.so.2*", "rocblas"];

/// Variables a user sets to pre-select devices, in precedence order
pub const VISIBLE_DEVICES_ENVS: &[&str] =
    &["HIP_VISIBLE_DEVICES", "ROCR_VISIBLE_DEVICES", "GPU_DEVICE_ORDINAL"];

/// Skips the supported-architecture check when set
pub const GFX_OVERRIDE_ENV: &str = "HSA_OVERRIDE_GFX_VERSION";

/// Graphics IP version of an AMD GPU (`gfx_target_version`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GfxVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl GfxVersion {
    /// Decode the packed sysfs value, e.g. `90010` is gfx90a
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.len() < 5 || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let l = raw.len();
        Some(Self {
            major: raw[..l - 4].parse().ok()?,
            minor: raw[l - 4..l - 2].parse().ok()?,
            patch: raw[l - 2..].parse().ok()?,
        })
    }

    pub fn capability(&self) -> ComputeCapability {
        ComputeCapability::new(self.major as i32, self.minor as i32)
    }
}

impl fmt::Display for GfxVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gfx{}{:x}{:x}", self.major, self.minor, self.patch)
    }
}

/// What a topology node describes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeKind {
    Cpu,
    Gpu(GfxVersion),
}

fn parse_node_kind(properties: &str) -> Option<NodeKind> {
    let value = property(properties, "gfx_target_version")?;
    if value == "0" {
        return Some(NodeKind::Cpu);
    }
    GfxVersion::parse(value).map(NodeKind::Gpu)
}

/// Value of `key` in a `key value` per line properties file
fn property<'a>(properties: &'a str, key: &str) -> Option<&'a str> {
    properties.lines().find_map(|line| {
        let mut fields = line.split_whitespace();
        match (fields.next(), fields.next(), fields.next()) {
            (Some(k), Some(v), None) if k == key => Some(v),
            _ => None,
        }
    })
}

/// One AMD GPU found in the topology
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RocmDevice {
    /// HIP device index
    pub id: u32,
    pub gfx: GfxVersion,
    pub memory: DeviceMemoryInfo,
}

/// AMD GPUs enumerated from sysfs
#[derive(Debug)]
pub struct RocmRuntime {
    devices: Vec<RocmDevice>,
    driver: Result<DriverVersion, ProbeError>,
}

impl RocmRuntime {
    /// Enumerate the host's AMD GPUs and keep those the installed ROCm
    /// libraries support. `None` when the driver or libraries are missing.
    pub fn detect() -> Option<Self> {
        let mut runtime = Self::from_sysfs(Path::new(SYSFS_ROOT))?;

        if let Some(visible) = visible_devices_from_env() {
            runtime.retain_visible(&visible);
        }
        if runtime.devices.is_empty() {
            log::info!("no compatible amdgpu devices detected");
            return None;
        }

        let mut search_dirs = search_dirs_from_env();
        search_dirs.extend(ROCM_LIB_DIRS.iter().map(PathBuf::from));
        let Some(lib_dir) = find_rocm_lib_dir(&search_dirs) else {
            log::warn!("amdgpu detected, but no compatible rocm library found");
            return None;
        };
        log::debug!("using rocm libraries from {}", lib_dir.display());

        match std::env::var(GFX_OVERRIDE_ENV) {
            Ok(value) if !value.is_empty() => {
                log::debug!("skipping rocm gfx compatibility check with {}={}", GFX_OVERRIDE_ENV, value);
            }
            _ => runtime.retain_supported(&supported_gfx(&lib_dir)),
        }

        Some(runtime)
    }

    /// Read the KFD topology below `root`, a sysfs mount point.
    ///
    /// Returns `None` when the amdgpu driver is not loaded. Integrated GPUs
    /// and devices reporting no memory are left out.
    pub fn from_sysfs(root: &Path) -> Option<Self> {
        let driver_dir = root.join(DRIVER_DIR);
        if !driver_dir.is_dir() {
            log::debug!("amdgpu driver not detected {}", driver_dir.display());
            return None;
        }

        let driver = read_driver_version(&driver_dir.join("version"));
        match &driver {
            Ok(version) => log::info!("AMD Driver: {}", version),
            Err(e) => log::warn!("amdgpu driver version unavailable: {}", e),
        }

        Some(Self {
            devices: read_topology(&root.join(NODES_DIR)),
            driver,
        })
    }

    pub fn devices(&self) -> &[RocmDevice] {
        &self.devices
    }

    /// Drop devices whose id is not in `visible`
    pub fn retain_visible(&mut self, visible: &[String]) {
        self.devices.retain(|device| {
            let keep = visible.iter().any(|v| v.trim() == device.id.to_string());
            if !keep {
                log::info!("filtering out device {} per user request {:?}", device.id, visible);
            }
            keep
        });
    }

    /// Drop devices whose architecture is not in `supported`
    pub fn retain_supported(&mut self, supported: &[String]) {
        log::debug!("rocm supported GPU types {:?}", supported);
        self.devices.retain(|device| {
            let gfx = device.gfx.to_string();
            let keep = supported.contains(&gfx);
            if keep {
                log::info!("amdgpu [{}] {} is supported", device.id, gfx);
            } else {
                log::warn!("[{}] amdgpu {} is not supported by {:?}", device.id, gfx, supported);
            }
            keep
        });
    }

    fn device(&self, index: u32) -> Option<&RocmDevice> {
        self.devices.get(index as usize)
    }
}

impl GpuRuntime for RocmRuntime {
    fn library(&self) -> GpuLibrary {
        GpuLibrary::Rocm
    }

    fn device_count(&self) -> usize {
        self.devices.len()
    }

    fn device_id(&self, index: u32) -> u32 {
        self.device(index).map_or(index, |d| d.id)
    }

    fn memory_info(&self, index: u32) -> Result<DeviceMemoryInfo, ProbeError> {
        Ok(self.device(index).map(|d| d.memory).unwrap_or_default())
    }

    fn compute_capability(&self, index: u32) -> Result<ComputeCapability, ProbeError> {
        Ok(self
            .device(index)
            .map(|d| d.gfx.capability())
            .unwrap_or_default())
    }

    fn driver_version(&self) -> Result<DriverVersion, ProbeError> {
        self.driver.clone()
    }
}

fn sysfs_error(path: &Path, reason: impl fmt::Display) -> ProbeError {
    ProbeError::SysfsReadFailed {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}

fn read_driver_version(path: &Path) -> Result<DriverVersion, ProbeError> {
    let content = fs::read_to_string(path).map_err(|e| sysfs_error(path, e))?;
    DriverVersion::parse(&content).ok_or_else(|| sysfs_error(path, "malformed version"))
}

/// Every GPU node under `nodes_dir`, in node order
fn read_topology(nodes_dir: &Path) -> Vec<RocmDevice> {
    let pattern = nodes_dir.join("*").join("properties").display().to_string();
    let mut nodes: Vec<(u32, PathBuf)> = glob_paths(&pattern)
        .into_iter()
        .filter_map(|properties| {
            let node_dir = properties.parent()?.to_path_buf();
            let id = node_dir.file_name()?.to_str()?.parse().ok()?;
            Some((id, node_dir))
        })
        .collect();
    nodes.sort_by_key(|(id, _)| *id);

    let mut devices = Vec::new();
    let mut cpu_count = 0u32;

    for (node_id, node_dir) in nodes {
        log::debug!("evaluating amdgpu node {}", node_dir.display());
        let properties_path = node_dir.join("properties");
        let properties = match fs::read_to_string(&properties_path) {
            Ok(content) => content,
            Err(e) => {
                log::debug!("failed to read {}: {}", properties_path.display(), e);
                continue;
            }
        };

        let gfx = match parse_node_kind(&properties) {
            Some(NodeKind::Cpu) => {
                log::debug!("detected CPU {}", node_dir.display());
                cpu_count += 1;
                continue;
            }
            Some(NodeKind::Gpu(gfx)) => gfx,
            None => {
                log::warn!("malformed gfx_target_version in {}", properties_path.display());
                continue;
            }
        };

        let Some(id) = node_id.checked_sub(cpu_count) else {
            log::error!("amdgpu node {} precedes {} CPU nodes", node_id, cpu_count);
            return Vec::new();
        };

        let total = bank_total(&node_dir);
        if total == 0 {
            log::warn!("amdgpu [{}] reports zero total memory", id);
            continue;
        }
        if total < IGPU_MEMORY_LIMIT {
            log::info!(
                "amdgpu [{}] appears to be an iGPU with {}M reported total memory, skipping",
                id,
                total / 1024 / 1024
            );
            continue;
        }

        let used = bank_used(&node_dir).min(total);
        let Some(memory) = DeviceMemoryInfo::from_free_total(total - used, total) else {
            continue;
        };
        log::info!("[{}] amdgpu {} {}", id, gfx, memory);
        devices.push(RocmDevice { id, gfx, memory });
    }

    devices
}

fn bank_total(node_dir: &Path) -> u64 {
    let pattern = node_dir.join("mem_banks/*/properties").display().to_string();
    glob_paths(&pattern)
        .iter()
        .filter_map(|path| match fs::read_to_string(path) {
            Ok(content) => property(&content, "size_in_bytes")?.parse::<u64>().ok(),
            Err(e) => {
                log::warn!("failed to read {}: {}", path.display(), e);
                None
            }
        })
        .fold(0, u64::saturating_add)
}

fn bank_used(node_dir: &Path) -> u64 {
    let pattern = node_dir.join("mem_banks/*/used_memory").display().to_string();
    glob_paths(&pattern)
        .iter()
        .filter_map(|path| {
            let content = fs::read_to_string(path).ok()?;
            match content.trim().parse::<u64>() {
                Ok(used) => Some(used),
                Err(e) => {
                    log::warn!("malformed used memory in {}: {}", path.display(), e);
                    None
                }
            }
        })
        .fold(0, u64::saturating_add)
}

fn glob_paths(pattern: &str) -> Vec<PathBuf> {
    match glob::glob(pattern) {
        Ok(paths) => paths.flatten().collect(),
        Err(e) => {
            log::debug!("ignoring bad pattern {}: {}", pattern, e);
            Vec::new()
        }
    }
}

/// Device ids the user restricted ROCm to, if any
pub fn visible_devices_from_env() -> Option<Vec<String>> {
    let values: Vec<Option<String>> = VISIBLE_DEVICES_ENVS
        .iter()
        .map(|name| std::env::var(name).ok())
        .collect();
    select_visible(&values)
}

/// First non-empty list among `values`, split on commas
fn select_visible(values: &[Option<String>]) -> Option<Vec<String>> {
    values
        .iter()
        .flatten()
        .find(|v| !v.is_empty())
        .map(|v| v.split(',').map(|id| id.trim().to_string()).collect())
}

/// First directory in `search_dirs` holding a usable ROCm install
pub fn find_rocm_lib_dir(search_dirs: &[PathBuf]) -> Option<PathBuf> {
    search_dirs
        .iter()
        .find(|dir| {
            ROCM_LIB_GLOBS.iter().all(|entry| {
                let pattern = dir.join(entry).display().to_string();
                !glob_paths(&pattern).is_empty()
            })
        })
        .cloned()
}

/// Architectures the rocBLAS kernels in `lib_dir` were built for
pub fn supported_gfx(lib_dir: &Path) -> Vec<String> {
    let pattern = lib_dir
        .join("rocblas/library/TensileLibrary_lazy_gfx*.dat")
        .display()
        .to_string();
    glob_paths(&pattern)
        .iter()
        .filter_map(|path| {
            let name = path.file_name()?.to_str()?;
            let gfx = name.strip_prefix("TensileLibrary_lazy_")?.strip_suffix(".dat")?;
            Some(gfx.to_string())
        })
        .collect()
}
