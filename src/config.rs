//! Configuration System using Figment
//!
//! Configuration is loaded from:
//! 1. a TOML file (base configuration, `config/force_daq.toml` by default)
//! 2. Environment variables prefixed with `FORCE_DAQ_`
//!
//! Every section and field has a default, so an absent file or an empty table yields
//! the stock device constants. Nested keys in environment variables are separated by a
//! double underscore so that field names keep their own underscores:
//! `FORCE_DAQ_MOTION__LOAD_KG=20`.
//!
//! # Example
//! ```no_run
//! use force_daq::config::DaqConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DaqConfig::load()?;
//! config.validate()?;
//! println!("Application: {}", config.application.name);
//! # Ok(())
//! # }
//! ```

use crate::data::motion;
use crate::data::trim::DEFAULT_MAX_FLAT;
use crate::decoders::encoder::{LEGACY_TERMINATOR, REVISED_TERMINATOR};
use crate::decoders::outlier::{DYNAMOMETER_MAX_ABS, ENCODER_MAX_ABS, PLATFORM_MAX_ABS};
use crate::decoders::platform::DEFAULT_1KHZ_HEX_THRESHOLD;
use crate::error::{AppResult, DaqError};
use crate::validation::{is_finite_positive, is_in_range, is_not_empty, is_valid_path};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "config/force_daq.toml";
/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "FORCE_DAQ_";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaqConfig {
    /// Application settings
    pub application: ApplicationConfig,
    /// Decoder bounds and framing
    pub decoders: DecoderConfig,
    /// Encoder signal conditioning
    pub motion: MotionConfig,
    /// Session finalization and export
    pub session: SessionConfig,
}

/// Application-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Application name
    pub name: String,
    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: "force_daq".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Decoder configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Plausibility bound for dynamometer readings
    pub dynamometer_max_abs: f64,
    /// Plausibility bound for each platform channel
    pub platform_max_abs: f64,
    /// Plausibility bound for raw encoder pulse counts
    pub encoder_max_abs: f64,
    /// The two accepted encoder token terminators
    pub encoder_terminators: [char; 2],
    /// Platform chunks with a longer hex representation are treated as 1 kHz bursts
    pub platform_1khz_hex_threshold: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            dynamometer_max_abs: DYNAMOMETER_MAX_ABS,
            platform_max_abs: PLATFORM_MAX_ABS,
            encoder_max_abs: ENCODER_MAX_ABS,
            encoder_terminators: [LEGACY_TERMINATOR, REVISED_TERMINATOR],
            platform_1khz_hex_threshold: DEFAULT_1KHZ_HEX_THRESHOLD,
        }
    }
}

/// Encoder motion pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Drum radius in metres
    pub drum_radius_m: f64,
    /// Encoder sampling period in seconds
    pub sample_period_s: f64,
    /// Length of each moving-average window
    pub window: usize,
    /// Number of initial outputs to discard
    pub warmup: u32,
    /// Load in kilograms, for the force estimate
    pub load_kg: f64,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            drum_radius_m: motion::DRUM_RADIUS_M,
            sample_period_s: motion::SAMPLE_PERIOD_S,
            window: motion::WINDOW,
            warmup: motion::WARMUP,
            load_kg: motion::LOAD_KG,
        }
    }
}

/// Session finalization configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Trailing identical samples kept when a session finishes
    pub max_flat_tail: usize,
    /// Directory for exports and session books
    pub output_dir: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_flat_tail: DEFAULT_MAX_FLAT,
            output_dir: PathBuf::from("data"),
        }
    }
}

impl SessionConfig {
    /// Place a relative export or book path under `output_dir`.
    ///
    /// Absolute paths are returned unchanged.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.output_dir.join(path)
        }
    }
}

impl DaqConfig {
    /// Load configuration from the default file and environment variables
    pub fn load() -> AppResult<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific file path
    ///
    /// A missing file is not an error; defaults and environment overrides still apply.
    pub fn load_from<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let config = Self::figment(path.as_ref()).extract()?;
        Ok(config)
    }

    /// The provider stack used by [`DaqConfig::load_from`].
    pub fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(DaqConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Render the configuration as TOML.
    pub fn to_toml(&self) -> AppResult<String> {
        toml::to_string_pretty(self).map_err(|e| DaqError::Configuration(e.to_string()))
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> AppResult<()> {
        let invalid = |field: &str, reason: &str| {
            DaqError::Configuration(format!("Invalid {field}: {reason}"))
        };

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.application.log_level.to_lowercase().as_str()) {
            return Err(DaqError::Configuration(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                valid_levels.join(", ")
            )));
        }
        is_not_empty(&self.application.name).map_err(|e| invalid("application.name", e))?;

        let d = &self.decoders;
        is_finite_positive(d.dynamometer_max_abs)
            .map_err(|e| invalid("decoders.dynamometer_max_abs", e))?;
        is_finite_positive(d.platform_max_abs).map_err(|e| invalid("decoders.platform_max_abs", e))?;
        is_finite_positive(d.encoder_max_abs).map_err(|e| invalid("decoders.encoder_max_abs", e))?;
        if d.encoder_terminators.iter().any(|c| c.is_ascii_digit() || matches!(*c, '-' | '.')) {
            return Err(invalid(
                "decoders.encoder_terminators",
                "terminators cannot be digits, '-' or '.'",
            ));
        }
        is_in_range(d.platform_1khz_hex_threshold, 1..=usize::MAX)
            .map_err(|e| invalid("decoders.platform_1khz_hex_threshold", e))?;

        let m = &self.motion;
        is_finite_positive(m.drum_radius_m).map_err(|e| invalid("motion.drum_radius_m", e))?;
        is_finite_positive(m.sample_period_s).map_err(|e| invalid("motion.sample_period_s", e))?;
        is_in_range(m.window, 1..=1024).map_err(|e| invalid("motion.window", e))?;
        is_finite_positive(m.load_kg).map_err(|e| invalid("motion.load_kg", e))?;

        is_valid_path(&self.session.output_dir.to_string_lossy())
            .map_err(|e| invalid("session.output_dir", e))?;

        Ok(())
    }
}
