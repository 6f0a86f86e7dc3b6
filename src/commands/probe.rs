//! Probe command implementation
//!
//! Initialises runtime libraries one at a time and reports what each one
//! exposes, stopping at the first that works.

use crate::cli::args::OutputFormat;
use crate::cli::output::{print_output, DeviceReport, ProbeReport, ProbeSummary};
use crate::config::Config;
use crate::discovery::candidate_libraries;
use crate::error::{AppError, Result};
use crate::runtime::{InitResult, RuntimeHandle};

use std::path::Path;

/// Execute the probe command
pub fn run_probe(config: &Config, format: OutputFormat) -> Result<()> {
    let candidates = candidate_libraries(&config.discovery);

    if candidates.is_empty() {
        return Err(AppError::NoRuntimeLibrary);
    }

    let mut attempts = Vec::with_capacity(candidates.len());
    for path in &candidates {
        let init = RuntimeHandle::init(path, config.general.verbose);
        let ready = init.error.is_none();
        attempts.push(report(path, init)?);
        if ready {
            break;
        }
    }

    print_output(&ProbeSummary { attempts }, format)?;
    Ok(())
}

/// Query every device of an initialised runtime, then release it
fn report(path: &Path, init: InitResult) -> Result<ProbeReport> {
    let library = path.display().to_string();
    let error = init.error_message();
    let mut handle = init.handle;

    if error.is_some() {
        return Ok(ProbeReport {
            library,
            status: handle.status().to_string(),
            error,
            driver_version: None,
            device_count: 0,
            devices: Vec::new(),
        });
    }

    let status = handle.status().to_string();
    let driver_version = match handle.driver_version() {
        Ok(version) => Some(version.to_string()),
        Err(e) if e.is_programming_error() => return Err(e.into()),
        Err(e) => {
            log::debug!("{}: {}", library, e);
            None
        }
    };
    let mut devices = Vec::with_capacity(init.device_count);
    for device_id in 0..init.device_count as u32 {
        devices.push(DeviceReport {
            device_id,
            memory: handle.memory_info(device_id)?,
            compute: handle.compute_capability(device_id)?,
        });
    }
    handle.release()?;

    Ok(ProbeReport {
        library,
        status,
        error: None,
        driver_version,
        device_count: init.device_count,
        devices,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::stubs::{stub_api, stub_count_no_device, STUB_DEVICES, STUB_TOTAL};
    use crate::config::ConfigBuilder;
    use crate::runtime::CudartApi;

    #[test]
    fn test_report_ready_runtime() {
        let init = RuntimeHandle::init_with_api(stub_api(), false);
        let report = report(Path::new("/stub/libcudart.so"), init).unwrap();

        assert!(report.error.is_none());
        assert_eq!(report.status, "ready");
        assert_eq!(report.driver_version.as_deref(), Some("12.2"));
        assert_eq!(report.devices.len(), STUB_DEVICES as usize);
        assert_eq!(report.devices[0].memory.total, STUB_TOTAL);
        assert_eq!(report.devices[1].compute.to_string(), "8.6");
    }

    #[test]
    fn test_report_failed_init() {
        let api = CudartApi {
            get_device_count: stub_count_no_device,
            ..stub_api()
        };
        let init = RuntimeHandle::init_with_api(api, false);
        let report = report(Path::new("/stub/libcudart.so"), init).unwrap();

        assert_eq!(report.status, "failed");
        assert!(report.error.unwrap().starts_with("NoDevices"));
        assert!(report.devices.is_empty());
    }

    #[test]
    fn test_probe_missing_library() {
        let config = ConfigBuilder::new()
            .with_library(Some("/nonexistent/libcudart.so".to_string()))
            .build();
        assert!(run_probe(&config, OutputFormat::Compact).is_ok());
    }
}
