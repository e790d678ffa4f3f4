//! Layered configuration.
//!
//! Settings resolve in order: built-in defaults, then `vigil.toml`, then
//! environment variable overrides.
//!
//! # Environment Variables
//!
//! Variables are prefixed with `VIGIL_` and use double underscores to
//! separate nested levels:
//! - `VIGIL_WATCH__BUFFER_SIZE=65536` sets `watch.buffer_size`
//! - `VIGIL_LOGGING__DEFAULT=debug` sets `logging.default`

use std::collections::HashMap;
use std::path::Path;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::{Figment, error::Error as FigmentError};
use serde::{Deserialize, Serialize};

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "vigil.toml";

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Settings {
    /// Watch and dispatch tuning.
    #[serde(default)]
    pub watch: WatchConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WatchConfig {
    /// Size in bytes of the channel read buffer. Must hold at least one
    /// maximal record (16-byte header plus a NAME_MAX name).
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Default event mask for watches created without one, as a hex
    /// string (e.g. `"0x00000fff"` for all events).
    #[serde(default = "default_mask")]
    pub default_mask: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Default log level: error, warn, info, debug, trace.
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module level overrides.
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            buffer_size: default_buffer_size(),
            default_mask: default_mask(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

fn default_buffer_size() -> usize {
    4096
}

fn default_mask() -> String {
    "0x00000fff".to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Settings {
    /// Load settings from defaults, `vigil.toml`, and `VIGIL_` env vars.
    pub fn load() -> Result<Self, FigmentError> {
        Self::figment(Path::new(CONFIG_FILE)).extract()
    }

    /// Load settings with an explicit config file path.
    pub fn load_from(path: &Path) -> Result<Self, FigmentError> {
        Self::figment(path).extract()
    }

    fn figment(config_file: &Path) -> Figment {
        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(config_file))
            .merge(Env::prefixed("VIGIL_").split("__"))
    }

    /// Parse `watch.default_mask` into a raw mask value.
    pub fn default_mask_bits(&self) -> Result<u32, std::num::ParseIntError> {
        let raw = self.watch.default_mask.trim_start_matches("0x");
        u32::from_str_radix(raw, 16)
    }
}
