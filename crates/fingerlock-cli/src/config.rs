//! TOML configuration file.
//!
//! Every key is optional. A missing file at the default location means
//! "use the defaults"; a missing file named with `--config` is an error.

use std::path::{Path, PathBuf};
use std::time::Duration;

use fingerlock_biometric::SerialSensorConfig;
use fingerlock_controller::{ControllerConfig, Timing};
use fingerlock_core::constants::{
    DEFAULT_BAUD_RATE, DEFAULT_CAPTURE_POLL_MS, DEFAULT_CAPTURE_TIMEOUT_MS,
    DEFAULT_RELAY_ACTIVE_LOW, DEFAULT_RELAY_GPIO, DEFAULT_REMOVAL_POLL_MS,
    DEFAULT_RESPONSE_TIMEOUT_MS, DEFAULT_SENSOR_ADDRESS, DEFAULT_SENSOR_PASSWORD,
    DEFAULT_SERIAL_PORT, DEFAULT_TICK_MS, DEFAULT_UNLOCK_HOLD_MS,
};
use serde::Deserialize;
use tracing::debug;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/fingerlock/config.toml";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}'", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{}'", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub sensor: SensorConfig,
    pub relay: RelayConfig,
    pub timing: TimingConfig,
    pub feedback: FeedbackConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SensorConfig {
    pub port: String,
    pub baud_rate: u32,
    pub address: u32,
    pub password: u32,
    pub response_timeout_ms: u64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_SERIAL_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            address: DEFAULT_SENSOR_ADDRESS,
            password: DEFAULT_SENSOR_PASSWORD,
            response_timeout_ms: DEFAULT_RESPONSE_TIMEOUT_MS,
        }
    }
}

/// Which relay driver to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelayBackend {
    #[default]
    Sysfs,

    /// Log relay changes without touching any GPIO.
    DryRun,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RelayConfig {
    pub backend: RelayBackend,
    pub gpio: u32,
    pub active_low: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            backend: RelayBackend::Sysfs,
            gpio: DEFAULT_RELAY_GPIO,
            active_low: DEFAULT_RELAY_ACTIVE_LOW,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimingConfig {
    pub tick_ms: u64,
    pub capture_timeout_ms: u64,
    pub capture_poll_ms: u64,
    pub removal_poll_ms: u64,
    pub unlock_hold_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            tick_ms: DEFAULT_TICK_MS,
            capture_timeout_ms: DEFAULT_CAPTURE_TIMEOUT_MS,
            capture_poll_ms: DEFAULT_CAPTURE_POLL_MS,
            removal_poll_ms: DEFAULT_REMOVAL_POLL_MS,
            unlock_hold_ms: DEFAULT_UNLOCK_HOLD_MS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FeedbackConfig {
    /// Print a line when a finger is read but not recognised.
    pub report_rejections: bool,
}

impl Config {
    /// Load from `path`, or from [`DEFAULT_CONFIG_PATH`] when it exists.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_PATH);
                if default.exists() {
                    Self::from_file(default)
                } else {
                    debug!(path = DEFAULT_CONFIG_PATH, "No config file, using defaults");
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;

        debug!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    /// Reject values that would make the control loop spin.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let polls = [
            ("timing.tick_ms", self.timing.tick_ms),
            ("timing.capture_poll_ms", self.timing.capture_poll_ms),
            ("timing.removal_poll_ms", self.timing.removal_poll_ms),
            ("sensor.response_timeout_ms", self.sensor.response_timeout_ms),
        ];
        for (key, value) in polls {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{key} must be greater than 0")));
            }
        }
        if self.sensor.baud_rate == 0 {
            return Err(ConfigError::Invalid(
                "sensor.baud_rate must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn controller_config(&self) -> ControllerConfig {
        let timing = Timing {
            tick: Duration::from_millis(self.timing.tick_ms),
            capture_timeout: Duration::from_millis(self.timing.capture_timeout_ms),
            capture_poll: Duration::from_millis(self.timing.capture_poll_ms),
            removal_poll: Duration::from_millis(self.timing.removal_poll_ms),
            unlock_hold: Duration::from_millis(self.timing.unlock_hold_ms),
        };

        ControllerConfig::default()
            .with_timing(timing)
            .with_active_low(self.relay.active_low)
            .with_report_rejections(self.feedback.report_rejections)
    }

    pub fn sensor_config(&self) -> SerialSensorConfig {
        SerialSensorConfig {
            address: self.sensor.address,
            password: self.sensor.password,
            response_timeout: Duration::from_millis(self.sensor.response_timeout_ms),
        }
    }
}
