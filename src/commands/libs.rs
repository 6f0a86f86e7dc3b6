//! Libs command implementation
//!
//! Shows the runtime libraries discovery would try, in order.

use crate::cli::args::OutputFormat;
use crate::cli::output::{print_output, LibraryList};
use crate::config::Config;
use crate::discovery::candidate_libraries;
use crate::error::Result;

/// Execute the libs command
pub fn run_libs(config: &Config, format: OutputFormat) -> Result<()> {
    let libraries = candidate_libraries(&config.discovery)
        .iter()
        .map(|p| p.display().to_string())
        .collect();
    print_output(&LibraryList { libraries }, format)?;
    Ok(())
}
