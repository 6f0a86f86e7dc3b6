//! Command handlers
//!
//! Each command handler orchestrates the execution of a CLI command.

pub mod env;
pub mod libs;
pub mod list;
pub mod probe;
pub mod vram;

pub use env::run_env;
pub use libs::run_libs;
pub use list::run_list;
pub use probe::run_probe;
pub use vram::run_vram;
