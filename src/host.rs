//! Host CPU and memory introspection
//!
//! Used for the CPU fallback entry when no GPU is usable.

use std::io;

/// Total and available host RAM in bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostMemory {
    pub total: u64,
    pub free: u64,
}

/// Read host RAM from `/proc/meminfo`
#[cfg(target_os = "linux")]
pub fn host_memory() -> io::Result<HostMemory> {
    let content = std::fs::read_to_string("/proc/meminfo")?;
    parse_meminfo(&content).ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidData, "malformed /proc/meminfo")
    })
}

#[cfg(not(target_os = "linux"))]
pub fn host_memory() -> io::Result<HostMemory> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "host memory lookup is only implemented for Linux",
    ))
}

/// Parse `MemTotal` and `MemAvailable` (or `MemFree` on old kernels)
pub fn parse_meminfo(content: &str) -> Option<HostMemory> {
    let mut total = None;
    let mut available = None;
    let mut free = None;

    for line in content.lines() {
        let mut fields = line.split_whitespace();
        let (Some(key), Some(value)) = (fields.next(), fields.next()) else {
            continue;
        };
        let Ok(kib) = value.parse::<u64>() else {
            continue;
        };
        match key {
            "MemTotal:" => total = Some(kib.saturating_mul(1024)),
            "MemAvailable:" => available = Some(kib.saturating_mul(1024)),
            "MemFree:" => free = Some(kib.saturating_mul(1024)),
            _ => {}
        }
    }

    Some(HostMemory {
        total: total?,
        free: available.or(free)?,
    })
}

/// Widest vector extension the CPU supports (`avx512`, `avx2`, `avx`),
/// or an empty string
pub fn cpu_variant() -> &'static str {
    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    {
        if is_x86_feature_detected!("avx512f") && is_x86_feature_detected!("avx512vnni") {
            return "avx512";
        }
        if is_x86_feature_detected!("avx2") {
            return "avx2";
        }
        if is_x86_feature_detected!("avx") {
            return "avx";
        }
    }
    ""
}

/// Whether GPU builds can run on this CPU. x86_64 GPU builds require AVX.
pub fn supports_gpu_builds(variant: &str) -> bool {
    !(cfg!(target_arch = "x86_64") && variant.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MEMINFO: &str = "MemTotal:       32768000 kB\n\
                           MemFree:         1024000 kB\n\
                           MemAvailable:   16384000 kB\n\
                           Buffers:          512000 kB\n";

    #[test]
    fn test_parse_meminfo() {
        let mem = parse_meminfo(MEMINFO).unwrap();
        assert_eq!(mem.total, 32768000 * 1024);
        assert_eq!(mem.free, 16384000 * 1024);
    }

    #[test]
    fn test_parse_meminfo_without_available() {
        let mem = parse_meminfo("MemTotal: 2048 kB\nMemFree: 1024 kB\n").unwrap();
        assert_eq!(mem.free, 1024 * 1024);
    }

    #[test]
    fn test_parse_meminfo_malformed() {
        assert!(parse_meminfo("garbage\n").is_none());
        assert!(parse_meminfo("MemFree: 10 kB\n").is_none());
    }

    #[test]
    fn test_parse_meminfo_huge_values_saturate() {
        let mem = parse_meminfo(
            "MemTotal: 18446744073709551615 kB\nMemAvailable: 18446744073709551615 kB\n",
        )
        .unwrap();
        assert_eq!(mem.total, u64::MAX);
        assert_eq!(mem.free, u64::MAX);
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn test_host_memory() {
        let mem = host_memory().unwrap();
        assert!(mem.total > 0);
        assert!(mem.free <= mem.total);
    }

    #[test]
    fn test_cpu_variant_is_known() {
        assert!(["avx512", "avx2", "avx", ""].contains(&cpu_variant()));
    }
}
