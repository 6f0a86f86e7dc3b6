//! gpuprobe - GPU capability probe library
//!
//! Loads a GPU compute runtime at run time, without linking against it,
//! and reports device count, per-device memory and compute capability,
//! and the driver version. A missing or broken runtime is never fatal:
//! callers get a structured error and can fall back to the CPU.
//!
//! # Modules
//!
//! - [`cli`]: Command-line interface definitions
//! - [`commands`]: Command handlers
//! - [`config`]: Configuration system
//! - [`discovery`]: Runtime library search
//! - [`domain`]: Device memory, capability and inventory types
//! - [`error`]: Error types
//! - [`host`]: Host CPU and memory introspection
//! - [`rocm`]: AMD GPU enumeration from sysfs
//! - [`runtime`]: Dynamic runtime loading and queries
//! - [`services`]: Inventory and VRAM checks

pub mod cli;
pub mod commands;
pub mod config;
pub mod discovery;
pub mod domain;
pub mod error;
pub mod host;
pub mod rocm;
pub mod runtime;
pub mod services;

#[cfg(test)]
pub mod mock;

pub use error::{AppError, Result};
