//! Output formatting utilities
//!
//! Provides table and JSON output formatting for CLI commands.

use crate::cli::args::OutputFormat;
use crate::domain::{ComputeCapability, DeviceMemoryInfo, GpuInfo, GpuInfoList};
use serde::Serialize;
use std::io::{self, Write};

const MIB: u64 = 1024 * 1024;

/// Format and print output based on the selected format
pub fn print_output<T: Serialize + TableDisplay>(data: &T, format: OutputFormat) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();

    match format {
        OutputFormat::Table => {
            writeln!(handle, "{}", data.to_table())?;
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(data).unwrap_or_else(|_| "{}".to_string());
            writeln!(handle, "{}", json)?;
        }
        OutputFormat::Compact => {
            writeln!(handle, "{}", data.to_compact())?;
        }
    }

    Ok(())
}

/// Trait for types that can be displayed as a table
pub trait TableDisplay {
    /// Format as a table string
    fn to_table(&self) -> String;

    /// Format as a compact single line
    fn to_compact(&self) -> String {
        self.to_table().replace('\n', " | ")
    }
}

impl TableDisplay for GpuInfo {
    fn to_table(&self) -> String {
        let mut output = format!("[{}] {}", self.id, self.library);
        if let Some(variant) = self.variant.as_deref().filter(|v| !v.is_empty()) {
            output.push_str(&format!(" ({})", variant));
        }
        if let Some(compute) = self.compute {
            output.push_str(&format!(" compute {}", compute));
        }
        output.push_str(&format!(
            "\n  Memory: {} MiB free / {} MiB total",
            self.free_memory / MIB,
            self.total_memory / MIB
        ));
        if self.minimum_memory > 0 {
            output.push_str(&format!(
                "\n  Runtime Overhead: {} MiB",
                self.minimum_memory / MIB
            ));
        }
        output
    }

    fn to_compact(&self) -> String {
        format!("{}:{}:{}MiB", self.library, self.id, self.free_memory / MIB)
    }
}

impl TableDisplay for GpuInfoList {
    fn to_table(&self) -> String {
        let gpus = self.iter().filter(|g| g.is_gpu()).count();
        let mut output = format!("GPUs Found: {}\n\n", gpus);

        for gpu in self.iter() {
            output.push_str(&gpu.to_table());
            output.push('\n');
        }

        output
    }

    fn to_compact(&self) -> String {
        self.iter()
            .map(|g| g.to_compact())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Per-device probe result
#[derive(Debug, Clone, Serialize)]
pub struct DeviceReport {
    pub device_id: u32,
    pub memory: DeviceMemoryInfo,
    pub compute: ComputeCapability,
}

impl TableDisplay for DeviceReport {
    fn to_table(&self) -> String {
        if self.memory.is_zero() && self.compute.is_zero() {
            return format!("[{}] query failed", self.device_id);
        }
        format!(
            "[{}] compute {}\n  Memory: {} MiB free / {} MiB total ({:.0}% used)",
            self.device_id,
            self.compute,
            self.memory.free_mb(),
            self.memory.total_mb(),
            self.memory.usage_ratio() * 100.0
        )
    }
}

/// Outcome of initialising one runtime library
#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    pub library: String,
    pub status: String,
    pub error: Option<String>,
    pub driver_version: Option<String>,
    pub device_count: usize,
    pub devices: Vec<DeviceReport>,
}

impl TableDisplay for ProbeReport {
    fn to_table(&self) -> String {
        let mut output = format!("Library: {}\n", self.library);
        output.push_str(&format!("Status: {}\n", self.status));

        if let Some(err) = &self.error {
            output.push_str(&format!("Error: {}\n", err));
            return output;
        }

        if let Some(version) = &self.driver_version {
            output.push_str(&format!("Driver Version: {}\n", version));
        }
        output.push_str(&format!("Devices: {}\n\n", self.device_count));

        for device in &self.devices {
            output.push_str(&device.to_table());
            output.push('\n');
        }

        output
    }

    fn to_compact(&self) -> String {
        match &self.error {
            Some(err) => format!("{}: {}", self.library, err),
            None => format!("{}: {} devices", self.library, self.device_count),
        }
    }
}

/// Every library tried by a probe, ending at the first that initialised
#[derive(Debug, Clone, Serialize)]
pub struct ProbeSummary {
    pub attempts: Vec<ProbeReport>,
}

impl TableDisplay for ProbeSummary {
    fn to_table(&self) -> String {
        self.attempts
            .iter()
            .map(|a| a.to_table())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn to_compact(&self) -> String {
        self.attempts
            .iter()
            .map(|a| a.to_compact())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Candidate runtime libraries in probe order
#[derive(Debug, Clone, Serialize)]
pub struct LibraryList {
    pub libraries: Vec<String>,
}

impl TableDisplay for LibraryList {
    fn to_table(&self) -> String {
        if self.libraries.is_empty() {
            return "No runtime libraries found".to_string();
        }

        let mut output = format!("Libraries Found: {}\n\n", self.libraries.len());
        for (i, lib) in self.libraries.iter().enumerate() {
            output.push_str(&format!("  {}. {}\n", i + 1, lib));
        }
        output
    }

    fn to_compact(&self) -> String {
        self.libraries.join(", ")
    }
}

/// Available VRAM on the first GPU
#[derive(Debug, Clone, Serialize)]
pub struct VramReport {
    pub bytes: u64,
}

impl TableDisplay for VramReport {
    fn to_table(&self) -> String {
        format!("Available VRAM: {} MiB ({} bytes)", self.bytes / MIB, self.bytes)
    }

    fn to_compact(&self) -> String {
        self.bytes.to_string()
    }
}

/// Device filter for child processes
#[derive(Debug, Clone, Serialize)]
pub struct EnvReport {
    pub variable: Option<String>,
    pub value: Option<String>,
}

impl TableDisplay for EnvReport {
    fn to_table(&self) -> String {
        match (&self.variable, &self.value) {
            (Some(var), Some(value)) => format!("{}={}", var, value),
            _ => "No device filter required".to_string(),
        }
    }
}
