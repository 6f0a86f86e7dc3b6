//! Runtime library discovery
//!
//! Several copies of the runtime library may exist on a host and some of
//! them may not work, so discovery returns every candidate and the caller
//! tries them in order until one initialises.

use crate::config::DiscoveryConfig;
use crate::runtime::RuntimeHandle;

use std::path::{Path, PathBuf};

/// Well-known CUDA runtime locations on Linux
pub const LINUX_PATTERNS: &[&str] = &[
    "/usr/local/cuda/lib64/libcudart.so*",
    "/usr/lib/x86_64-linux-gnu/nvidia/current/libcudart.so*",
    "/usr/lib/x86_64-linux-gnu/libcudart.so*",
    "/usr/lib/wsl/lib/libcudart.so*",
    "/usr/lib/wsl/drivers/*/libcudart.so*",
    "/opt/cuda/lib64/libcudart.so*",
    "/usr/local/cuda*/targets/aarch64-linux/lib/libcudart.so*",
    "/usr/lib/aarch64-linux-gnu/nvidia/current/libcudart.so*",
    "/usr/lib/aarch64-linux-gnu/libcudart.so*",
    "/usr/local/cuda/lib*/libcudart.so*",
    "/usr/lib*/libcudart.so*",
    "/usr/local/lib*/libcudart.so*",
];

/// Well-known CUDA runtime locations on Windows
pub const WINDOWS_PATTERNS: &[&str] =
    &["c:\\Program Files\\NVIDIA GPU Computing Toolkit\\CUDA\\v*\\bin\\cudart64_*.dll"];

/// File name pattern of the runtime library on this OS
pub fn runtime_library_name() -> Option<&'static str> {
    if cfg!(target_os = "linux") {
        Some("libcudart.so*")
    } else if cfg!(target_os = "windows") {
        Some("cudart64_*.dll")
    } else {
        None
    }
}

/// Built-in search patterns for this OS
pub fn default_patterns() -> Vec<String> {
    let patterns: &[&str] = if cfg!(target_os = "linux") {
        LINUX_PATTERNS
    } else if cfg!(target_os = "windows") {
        WINDOWS_PATTERNS
    } else {
        &[]
    };
    patterns.iter().map(|p| p.to_string()).collect()
}

/// Directories from the dynamic loader's search path variable
pub fn search_dirs_from_env() -> Vec<PathBuf> {
    let var = if cfg!(target_os = "windows") {
        "PATH"
    } else {
        "LD_LIBRARY_PATH"
    };

    std::env::var_os(var)
        .map(|value| {
            std::env::split_paths(&value)
                .filter(|dir| !dir.as_os_str().is_empty())
                .filter_map(|dir| std::path::absolute(&dir).ok())
                .collect()
        })
        .unwrap_or_default()
}

/// Expand `patterns` plus `base_name` inside each of `search_dirs`.
///
/// Matches are resolved through symlinks and de-duplicated, keeping the
/// order in which they were first seen.
pub fn find_gpu_libs(base_name: &str, patterns: &[String], search_dirs: &[PathBuf]) -> Vec<PathBuf> {
    log::debug!("Searching for GPU runtime library {}", base_name);

    let mut all_patterns = patterns.to_vec();
    for dir in search_dirs {
        all_patterns.push(dir.join(base_name).display().to_string());
    }
    log::debug!("gpu library search paths: {:?}", all_patterns);

    let mut found: Vec<PathBuf> = Vec::new();
    for pattern in &all_patterns {
        let matches = match glob::glob(pattern) {
            Ok(paths) => paths,
            Err(e) => {
                log::debug!("ignoring bad search pattern {}: {}", pattern, e);
                continue;
            }
        };

        for entry in matches.flatten() {
            let Some(resolved) = resolve_links(&entry) else {
                continue;
            };
            if !found.contains(&resolved) {
                found.push(resolved);
            }
        }
    }

    log::debug!("discovered GPU libraries: {:?}", found);
    found
}

fn resolve_links(path: &Path) -> Option<PathBuf> {
    match std::fs::canonicalize(path) {
        Ok(resolved) => Some(resolved),
        Err(e) => {
            log::debug!("skipping unresolvable library {}: {}", path.display(), e);
            None
        }
    }
}

/// Candidate runtime libraries for `discovery`, in probe order
pub fn candidate_libraries(discovery: &DiscoveryConfig) -> Vec<PathBuf> {
    if let Some(library) = &discovery.library {
        return vec![PathBuf::from(library)];
    }

    let Some(base_name) = runtime_library_name() else {
        return Vec::new();
    };

    let mut patterns = discovery.search_paths.clone();
    if discovery.use_default_paths {
        patterns.extend(default_patterns());
    }

    find_gpu_libs(base_name, &patterns, &search_dirs_from_env())
}

/// A runtime that initialised successfully
#[derive(Debug)]
pub struct ProbedRuntime {
    pub handle: RuntimeHandle,
    pub device_count: usize,
}

/// Initialise each candidate in turn and keep the first that works
pub fn load_first(candidates: &[PathBuf], verbose: bool) -> Option<ProbedRuntime> {
    for path in candidates {
        match RuntimeHandle::init(path, verbose).into_result() {
            Ok((handle, device_count)) => {
                log::info!("{} reports {} GPUs present", path.display(), device_count);
                return Some(ProbedRuntime {
                    handle,
                    device_count,
                });
            }
            Err(e) => {
                log::debug!("Unable to load runtime {}: {}", path.display(), e);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_find_libs_in_search_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("libcudart.so.12"), b"").unwrap();
        fs::write(dir.path().join("libcublas.so.12"), b"").unwrap();

        let found = find_gpu_libs("libcudart.so*", &[], &[dir.path().to_path_buf()]);
        assert_eq!(found.len(), 1);
        assert!(found[0].ends_with("libcudart.so.12"));
    }

    #[test]
    #[cfg(unix)]
    fn test_symlinks_are_deduplicated() {
        let dir = tempfile::tempdir().unwrap();
        let real = dir.path().join("libcudart.so.12.2.140");
        fs::write(&real, b"").unwrap();
        std::os::unix::fs::symlink(&real, dir.path().join("libcudart.so.12")).unwrap();
        std::os::unix::fs::symlink("libcudart.so.12", dir.path().join("libcudart.so")).unwrap();

        let pattern = dir.path().join("libcudart.so*").display().to_string();
        let found = find_gpu_libs("libcudart.so*", &[pattern.clone(), pattern], &[]);
        assert_eq!(found, vec![fs::canonicalize(&real).unwrap()]);
    }

    #[test]
    fn test_pattern_order_is_preserved() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        fs::write(first.path().join("libcudart.so.11"), b"").unwrap();
        fs::write(second.path().join("libcudart.so.12"), b"").unwrap();

        let patterns = vec![
            second.path().join("libcudart.so*").display().to_string(),
            first.path().join("libcudart.so*").display().to_string(),
        ];
        let found = find_gpu_libs("libcudart.so*", &patterns, &[]);
        assert_eq!(found.len(), 2);
        assert!(found[0].ends_with("libcudart.so.12"));
        assert!(found[1].ends_with("libcudart.so.11"));
    }

    #[test]
    fn test_explicit_library_wins() {
        let discovery = DiscoveryConfig {
            library: Some("/opt/custom/libcudart.so".to_string()),
            ..DiscoveryConfig::default()
        };
        assert_eq!(
            candidate_libraries(&discovery),
            vec![PathBuf::from("/opt/custom/libcudart.so")]
        );
    }

    #[test]
    fn test_load_first_skips_unusable_candidates() {
        let dir = tempfile::tempdir().unwrap();
        let bogus = dir.path().join("libcudart.so.1");
        fs::write(&bogus, b"not a library").unwrap();

        let candidates = vec![PathBuf::from("/nonexistent/libcudart.so"), bogus];
        assert!(load_first(&candidates, false).is_none());
    }
}
