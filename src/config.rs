//! Configuration system using Figment
//!
//! Settings are loaded from:
//! 1. `config/cg635.toml` (or a path given on the command line)
//! 2. Environment variables prefixed with `CG635_`
//!
//! Every key has a default, so a missing file yields a working configuration
//! for the instrument at GPIB address 23.
//!
//! # Environment Variable Overrides
//!
//! Nested keys are separated by a double underscore:
//!
//! ```text
//! CG635_LOG_LEVEL=debug
//! CG635_INSTRUMENT__RESOURCE="GPIB0::5::INSTR"
//! CG635_ECHO__FREQUENCY=false
//! ```
//!
//! # Example
//!
//! ```no_run
//! use srs_cg635::config::Settings;
//!
//! let settings = Settings::load()?;
//! println!("Resource: {}", settings.instrument.resource);
//! # Ok::<(), srs_cg635::config::ConfigError>(())
//! ```

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Default configuration file, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "config/cg635.toml";

/// GPIB primary address the CG635 ships configured with
pub const DEFAULT_GPIB_ADDRESS: u8 = 23;

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file or environment could not be parsed
    #[error("Configuration load error: {0}")]
    LoadError(#[from] Box<figment::Error>),
    /// Values parsed but are not usable
    #[error("Configuration validation error: {0}")]
    ValidationError(String),
}

/// Which transport implementation to open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// VISA resource manager (requires the `instrument_visa` feature)
    #[default]
    Visa,
    /// In-process simulated instrument
    Mock,
}

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Connection settings
    #[serde(default)]
    pub instrument: InstrumentSettings,
    /// Which query replies are echoed to stdout
    #[serde(default)]
    pub echo: EchoSettings,
    /// Script engine settings
    #[serde(default)]
    pub scripting: ScriptingSettings,
}

/// Connection settings for the instrument
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentSettings {
    /// VISA resource string (e.g., "GPIB0::23::INSTR")
    #[serde(default = "default_resource")]
    pub resource: String,
    /// Transport implementation
    #[serde(default)]
    pub backend: Backend,
    /// Timeout for opening the resource in milliseconds
    #[serde(default = "default_open_timeout")]
    pub open_timeout_ms: u64,
    /// Appended to every command
    #[serde(default = "default_terminator")]
    pub write_terminator: String,
    /// Stripped from every reply
    #[serde(default = "default_terminator")]
    pub read_terminator: String,
}

/// Per-query echo flags
///
/// The frequency query has always printed its reply, so it defaults to `true`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EchoSettings {
    /// Echo the `*IDN?` reply
    #[serde(default)]
    pub identify: bool,
    /// Echo the `DISP?` reply
    #[serde(default)]
    pub display: bool,
    /// Echo the `FREQ?` reply
    #[serde(default = "default_true")]
    pub frequency: bool,
}

/// Script engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptingSettings {
    /// Maximum number of Rhai operations per script execution
    #[serde(default = "default_max_operations")]
    pub max_operations: u64,
}

// ============================================================================
// Default value functions
// ============================================================================

fn default_log_level() -> String {
    "info".to_string()
}

fn default_resource() -> String {
    gpib_resource(DEFAULT_GPIB_ADDRESS)
}

fn default_open_timeout() -> u64 {
    5000
}

fn default_terminator() -> String {
    "\n".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_operations() -> u64 {
    1_000_000
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            instrument: InstrumentSettings::default(),
            echo: EchoSettings::default(),
            scripting: ScriptingSettings::default(),
        }
    }
}

impl Default for InstrumentSettings {
    fn default() -> Self {
        Self {
            resource: default_resource(),
            backend: Backend::default(),
            open_timeout_ms: default_open_timeout(),
            write_terminator: default_terminator(),
            read_terminator: default_terminator(),
        }
    }
}

impl Default for EchoSettings {
    fn default() -> Self {
        Self {
            identify: false,
            display: false,
            frequency: true,
        }
    }
}

impl Default for ScriptingSettings {
    fn default() -> Self {
        Self {
            max_operations: default_max_operations(),
        }
    }
}

/// VISA resource string for a GPIB primary address on board 0
pub fn gpib_resource(address: u8) -> String {
    format!("GPIB0::{}::INSTR", address)
}

// ============================================================================
// Configuration Loading and Validation
// ============================================================================

impl Settings {
    /// Load configuration from `config/cg635.toml` and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific file path
    ///
    /// Precedence (highest to lowest): `CG635_` environment variables, the
    /// file, built-in defaults. A missing file is not an error.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings: Self = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("CG635_").split("__"))
            .extract()
            .map_err(|e| ConfigError::LoadError(Box::new(e)))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            )));
        }

        if self.instrument.resource.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "'instrument.resource' cannot be empty".to_string(),
            ));
        }

        if self.scripting.max_operations == 0 {
            return Err(ConfigError::ValidationError(
                "'scripting.max_operations' must be > 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Render the effective settings as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}
