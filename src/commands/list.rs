//! List command implementation
//!
//! Lists every usable GPU, or the CPU fallback entry.

use crate::cli::args::OutputFormat;
use crate::cli::output::print_output;
use crate::config::Config;
use crate::error::Result;
use crate::services::InventoryService;

/// Execute the list command
pub fn run_list(config: &Config, format: OutputFormat) -> Result<()> {
    let gpus = InventoryService::new(config).gpu_info()?;
    print_output(&gpus, format)?;
    Ok(())
}
