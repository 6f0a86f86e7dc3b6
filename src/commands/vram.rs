//! VRAM command implementation

use crate::cli::args::OutputFormat;
use crate::cli::output::{print_output, VramReport};
use crate::config::Config;
use crate::error::Result;
use crate::services::InventoryService;

/// Execute the vram command
pub fn run_vram(config: &Config, format: OutputFormat) -> Result<()> {
    let bytes = InventoryService::new(config).check_vram()?;
    print_output(&VramReport { bytes }, format)?;
    Ok(())
}
