//! Server configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use grideye_types::GRID_EYE_MANUFACTURER_ID;

/// Server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Background scanner settings.
    pub scanner: ScannerConfig,
}

impl Config {
    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = default_config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Read {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Validate the configuration and return any errors.
    ///
    /// This checks:
    /// - Server bind address is valid (host:port format)
    /// - Scan interval is within bounds (1s - 1 hour)
    /// - Scan window is within bounds (1s - 60s)
    /// - Expiry age, when set, is within bounds (1s - 1 year)
    ///
    /// # Example
    ///
    /// ```
    /// use grideye_service::Config;
    ///
    /// let config = Config::default();
    /// config.validate().expect("Default config should be valid");
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();
        errors.extend(self.server.validate());
        errors.extend(self.scanner.validate());

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:5000").
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:5000".to_string(),
        }
    }
}

impl ServerConfig {
    /// Validate server configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.bind.is_empty() {
            errors.push(ValidationError::new(
                "server.bind",
                "bind address cannot be empty",
            ));
            return errors;
        }

        let Some((_, port)) = self.bind.rsplit_once(':') else {
            errors.push(ValidationError::new(
                "server.bind",
                format!(
                    "invalid bind address '{}': expected format 'host:port'",
                    self.bind
                ),
            ));
            return errors;
        };

        match port.parse::<u16>() {
            Ok(0) => errors.push(ValidationError::new("server.bind", "port cannot be 0")),
            Err(_) => errors.push(ValidationError::new(
                "server.bind",
                format!("invalid port '{}': must be a number 1-65535", port),
            )),
            Ok(_) => {}
        }

        errors
    }
}

/// Minimum pause between scan cycles in seconds.
pub const MIN_SCAN_INTERVAL: u64 = 1;

/// Maximum pause between scan cycles in seconds (1 hour).
pub const MAX_SCAN_INTERVAL: u64 = 3600;

/// Minimum scan window in seconds.
pub const MIN_SCAN_DURATION: u64 = 1;

/// Maximum scan window in seconds.
pub const MAX_SCAN_DURATION: u64 = 60;

/// Maximum expiry age in seconds (1 year).
pub const MAX_EXPIRE_AFTER: u64 = 365 * 24 * 60 * 60;

/// Background scanner configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Pause after each cycle before the next one starts, in seconds.
    pub interval_secs: u64,
    /// How long each discovery pass listens for advertisements, in seconds.
    pub scan_duration_secs: u64,
    /// Manufacturer ID the sensors advertise their frame under.
    pub manufacturer_id: u16,
    /// Drop devices not refreshed for this many seconds. Unset keeps them forever.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expire_after_secs: Option<u64>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            interval_secs: 5,
            scan_duration_secs: 5,
            manufacturer_id: GRID_EYE_MANUFACTURER_ID,
            expire_after_secs: None,
        }
    }
}

impl ScannerConfig {
    /// Pause between cycles.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Discovery window per cycle.
    pub fn scan_duration(&self) -> Duration {
        Duration::from_secs(self.scan_duration_secs)
    }

    /// Maximum record age, if expiry is enabled.
    pub fn expire_after(&self) -> Option<Duration> {
        self.expire_after_secs.map(Duration::from_secs)
    }

    /// Validate scanner configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.interval_secs < MIN_SCAN_INTERVAL {
            errors.push(ValidationError::new(
                "scanner.interval_secs",
                format!(
                    "scan interval {} is too short (minimum {} second)",
                    self.interval_secs, MIN_SCAN_INTERVAL
                ),
            ));
        } else if self.interval_secs > MAX_SCAN_INTERVAL {
            errors.push(ValidationError::new(
                "scanner.interval_secs",
                format!(
                    "scan interval {} is too long (maximum {} seconds / 1 hour)",
                    self.interval_secs, MAX_SCAN_INTERVAL
                ),
            ));
        }

        if self.scan_duration_secs < MIN_SCAN_DURATION {
            errors.push(ValidationError::new(
                "scanner.scan_duration_secs",
                format!(
                    "scan duration {} is too short (minimum {} second)",
                    self.scan_duration_secs, MIN_SCAN_DURATION
                ),
            ));
        } else if self.scan_duration_secs > MAX_SCAN_DURATION {
            errors.push(ValidationError::new(
                "scanner.scan_duration_secs",
                format!(
                    "scan duration {} is too long (maximum {} seconds)",
                    self.scan_duration_secs, MAX_SCAN_DURATION
                ),
            ));
        }

        match self.expire_after_secs {
            Some(0) => errors.push(ValidationError::new(
                "scanner.expire_after_secs",
                "expiry age cannot be 0 (omit it to keep devices forever)",
            )),
            Some(secs) if secs > MAX_EXPIRE_AFTER => errors.push(ValidationError::new(
                "scanner.expire_after_secs",
                format!(
                    "expiry age {} is too long (maximum {} seconds / 1 year)",
                    secs, MAX_EXPIRE_AFTER
                ),
            )),
            _ => {}
        }

        errors
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),
}

/// A single validation error with context.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The field path (e.g., `server.bind` or `scanner.interval_secs`).
    pub field: String,
    /// Description of the validation failure.
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("grideye")
        .join("server.toml")
}
