//! Configuration builder
//!
//! Merges configuration from files, the environment and CLI arguments.

use crate::config::{Config, ConfigFile};
use crate::error::ConfigError;

/// Enables verbose probing when set to any non-empty value
pub const DEBUG_ENV: &str = "GPUPROBE_DEBUG";
/// Overrides the probed VRAM amount, in bytes
pub const MAX_VRAM_ENV: &str = "GPUPROBE_MAX_VRAM";

/// Builder for merging configuration sources
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Load configuration from a file.
    ///
    /// An explicit path must exist and parse; default locations are
    /// best-effort.
    pub fn with_file(mut self, path: Option<&str>) -> Result<Self, ConfigError> {
        let file_config = match path {
            Some(path) => Some(ConfigFile::load(path)?),
            None => ConfigFile::load_default(),
        };

        if let Some(cfg) = file_config {
            self.config = cfg;
        }

        Ok(self)
    }

    /// Apply `GPUPROBE_DEBUG` and `GPUPROBE_MAX_VRAM`
    pub fn with_env(self) -> Result<Self, ConfigError> {
        let debug = std::env::var(DEBUG_ENV).ok();
        let max_vram = std::env::var(MAX_VRAM_ENV).ok();
        self.with_env_values(debug.as_deref(), max_vram.as_deref())
    }

    fn with_env_values(
        mut self,
        debug: Option<&str>,
        max_vram: Option<&str>,
    ) -> Result<Self, ConfigError> {
        if debug.is_some_and(|v| !v.is_empty()) {
            self.config.general.verbose = true;
        }

        if let Some(raw) = max_vram.filter(|v| !v.is_empty()) {
            let bytes = raw
                .trim()
                .parse::<u64>()
                .map_err(|e| ConfigError::InvalidValue {
                    key: MAX_VRAM_ENV.to_string(),
                    message: format!("{}: {}", raw, e),
                })?;
            log::info!("user override {}={}", MAX_VRAM_ENV, bytes);
            self.config.limits.max_vram = Some(bytes);
        }

        Ok(self)
    }

    /// Override with CLI verbose flag
    pub fn with_verbose(mut self, verbose: Option<bool>) -> Self {
        if let Some(v) = verbose {
            self.config.general.verbose = v;
        }
        self
    }

    /// Override with an explicit runtime library path
    pub fn with_library(mut self, library: Option<String>) -> Self {
        if let Some(l) = library {
            self.config.discovery.library = Some(l);
        }
        self
    }

    /// Override the VRAM amount
    pub fn with_max_vram(mut self, max_vram: Option<u64>) -> Self {
        if let Some(m) = max_vram {
            self.config.limits.max_vram = Some(m);
        }
        self
    }

    /// Build the final configuration
    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
