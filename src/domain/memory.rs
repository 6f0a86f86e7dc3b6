//! Device memory domain type
//!
//! [`DeviceMemoryInfo`] is the free/total/used VRAM split reported for one
//! device. An all-zero value is the sentinel for a failed query.

use serde::{Deserialize, Serialize};
use std::fmt;

const MIB: u64 = 1024 * 1024;
const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// VRAM split for a single device
///
/// # Examples
///
/// ```
/// use gpuprobe::domain::DeviceMemoryInfo;
///
/// let mem = DeviceMemoryInfo::from_free_total(2_000_000_000, 8_000_000_000).unwrap();
/// assert_eq!(mem.used, 6_000_000_000);
/// assert!(DeviceMemoryInfo::from_free_total(9, 8).is_none());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceMemoryInfo {
    /// Total memory in bytes
    pub total: u64,
    /// Free memory in bytes
    pub free: u64,
    /// Used memory in bytes (`total - free`)
    pub used: u64,
}

impl DeviceMemoryInfo {
    /// Build from the runtime's free/total pair.
    ///
    /// Returns `None` when the runtime reports more free than total memory.
    pub fn from_free_total(free: u64, total: u64) -> Option<Self> {
        let used = total.checked_sub(free)?;
        Some(Self { total, free, used })
    }

    /// The failed-query sentinel
    pub fn zero() -> Self {
        Self::default()
    }

    /// Whether this is the failed-query sentinel
    pub fn is_zero(&self) -> bool {
        self.total == 0 && self.free == 0 && self.used == 0
    }

    pub fn total_mb(&self) -> u64 {
        self.total / MIB
    }

    pub fn free_mb(&self) -> u64 {
        self.free / MIB
    }

    pub fn used_mb(&self) -> u64 {
        self.used / MIB
    }

    /// Total memory in GiB
    pub fn total_gb(&self) -> f32 {
        (self.total as f64 / GIB) as f32
    }

    /// Usage ratio (0.0 - 1.0)
    pub fn usage_ratio(&self) -> f32 {
        if self.total == 0 {
            0.0
        } else {
            (self.used as f64 / self.total as f64) as f32
        }
    }
}

impl fmt::Display for DeviceMemoryInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} MiB used / {} MiB total ({} MiB free)",
            self.used_mb(),
            self.total_mb(),
            self.free_mb()
        )
    }
}
