//! Unified error types for gpuprobe
//!
//! This module defines all error types used throughout the crate.
//! Uses thiserror for ergonomic error definitions.

use crate::runtime::HandleStatus;
use thiserror::Error;

/// Top-level application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from the runtime probe
    #[error("Probe error: {0}")]
    Probe(#[from] ProbeError),

    /// Error from configuration parsing/validation
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// No usable runtime library was found on this host
    #[error("No usable GPU runtime library found")]
    NoRuntimeLibrary,

    /// No GPUs detected in the system
    #[error("No GPUs detected")]
    NoGpusFound,

    /// IO error (file operations, output)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from loading and querying a GPU runtime library
///
/// Display strings start with the kind name so the message carried by an
/// [`InitResult`](crate::runtime::InitResult) identifies what went wrong.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    /// The path does not resolve to a loadable library
    #[error("LibraryNotFound: unable to load {path}: {reason}")]
    LibraryNotFound { path: String, reason: String },

    /// A required entry point is absent from the library
    #[error("SymbolNotFound: required symbol {0} missing from runtime library")]
    SymbolNotFound(String),

    /// The installed driver is older than the runtime library requires
    #[error("DriverInsufficient: the installed GPU driver is too old or missing for this runtime")]
    DriverInsufficient,

    /// The runtime reports that no compute-capable device is present
    #[error("NoDevices: the runtime reports no compute-capable devices")]
    NoDevices,

    /// The device count call returned a failure status
    #[error("DeviceCountFailed: unable to get device count (status {0})")]
    DeviceCountFailed(i32),

    /// A memory or attribute call failed for one device
    #[error("DeviceQueryFailed: {call} failed for device {device_id} (status {status})")]
    DeviceQueryFailed {
        device_id: u32,
        call: &'static str,
        status: i32,
    },

    /// The lightweight attribute call is not supported by the driver
    #[error("UnsupportedAttribute: attribute {attribute} unsupported for device {device_id}")]
    UnsupportedAttribute { device_id: u32, attribute: i32 },

    /// A device-independent runtime call failed
    #[error("RuntimeCallFailed: {call} failed (status {status})")]
    RuntimeCallFailed { call: &'static str, status: i32 },

    /// A kernel driver file could not be read or parsed
    #[error("SysfsReadFailed: unable to read {path}: {reason}")]
    SysfsReadFailed { path: String, reason: String },

    /// Operation invoked on a handle that is not ready
    #[error("InvalidHandleUse: {operation} called on a {state} handle")]
    InvalidHandleUse {
        operation: &'static str,
        state: HandleStatus,
    },
}

impl ProbeError {
    /// Whether this error indicates a lifecycle bug in the caller rather
    /// than an environmental condition
    pub fn is_programming_error(&self) -> bool {
        matches!(self, ProbeError::InvalidHandleUse { .. })
    }
}

/// Errors from configuration parsing and validation
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    /// Invalid config value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
