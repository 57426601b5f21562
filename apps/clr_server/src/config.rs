use std::path::Path;

use clr_host::config::load_validated;
use clr_host::{BridgeConfig, ResourceDescriptor, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::Level;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[schemars(title = "CLR Server Configuration")]
pub struct Config {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    #[schemars(description = "Logging verbosity level")]
    #[schemars(regex(pattern = r"^(trace|debug|info|warn|error)$"))]
    pub log_level: String,

    /// Tick rate in Hz
    #[serde(default = "default_tick_rate")]
    #[schemars(description = "Resource tick frequency in ticks per second", range(min = 1, max = 1000))]
    pub tick_rate: u64,

    /// Managed runtime settings
    #[serde(default)]
    pub bridge: BridgeConfig,

    /// Resources to load, in start order
    #[serde(default)]
    #[schemars(description = "Resources hosted by the bridge, started in the listed order")]
    pub resources: Vec<ResourceDescriptor>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_tick_rate() -> u64 {
    64
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            tick_rate: default_tick_rate(),
            bridge: BridgeConfig::default(),
            resources: Vec::new(),
        }
    }
}

impl Config {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        load_validated(path)
    }

    #[cfg(test)]
    pub fn from_json_str(json: &str) -> Result<Self> {
        clr_host::config::parse_validated(json)
    }

    /// Parsed log level, falling back to INFO
    pub fn level(&self) -> Level {
        clr_log::parse_level(&self.log_level).unwrap_or(Level::INFO)
    }
}
