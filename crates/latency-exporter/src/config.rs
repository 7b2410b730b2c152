//! Configuration loading and validation for the latency exporter

use latency_probe::{Destination, ProbeSettings};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::ffi::OsString;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;
use validator::{Validate, ValidationError, ValidationErrors};

/// Environment variable naming an explicit configuration file
pub const CONFIG_PATH_ENV: &str = "LATENCY_PARSER_CONFIG_PATH";

/// Configuration file used when no override is given
pub const DEFAULT_CONFIG_PATH: &str = "/var/latency-parser/config.yml";

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found in search paths")]
    FileNotFound,

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(#[from] ValidationErrors),
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub probe: ProbeSettings,

    #[serde(default)]
    pub logging: LoggingSettings,

    #[serde(default)]
    pub telemetry: TelemetrySettings,

    pub destinations: Vec<DestinationSettings>,
}

impl Validate for Config {
    fn validate(&self) -> Result<(), ValidationErrors> {
        self.server.validate()?;
        validate_probe(&self.probe)?;
        for destination in &self.destinations {
            destination.validate()?;
        }
        validate_unique_slugs(&self.destinations)?;
        Ok(())
    }
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ServerSettings {
    #[validate(custom = "validate_listen_addr")]
    pub listen_addr: String,

    /// Expose the exporter's own metrics on /internal/metrics
    pub self_metrics: bool,
}

/// One destination entry as written in the file
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DestinationSettings {
    #[validate(length(min = 1))]
    pub name: String,

    #[validate(length(min = 1))]
    pub endpoint: String,

    #[validate(length(min = 1))]
    pub method: String,

    #[validate(length(min = 1))]
    pub metrics_slug: String,
}

/// Logging settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingSettings {
    pub level: Option<String>,
    pub format: Option<String>,
}

/// OpenTelemetry export settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySettings {
    pub enabled: bool,
    pub service_name: String,
    pub otlp_endpoint: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            self_metrics: true,
        }
    }
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            service_name: "latency-exporter".to_string(),
            otlp_endpoint: "http://localhost:4317".to_string(),
        }
    }
}

impl From<DestinationSettings> for Destination {
    fn from(settings: DestinationSettings) -> Self {
        Destination::new(
            settings.name,
            settings.endpoint,
            settings.method,
            settings.metrics_slug,
        )
    }
}

// Custom validators

fn validate_listen_addr(addr: &str) -> Result<(), ValidationError> {
    addr.trim()
        .parse::<SocketAddr>()
        .map(|_| ())
        .map_err(|_| ValidationError::new("listen_addr_invalid"))
}

fn validate_probe(probe: &ProbeSettings) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let millis = probe.timeout.as_millis();
    if !(100..=60_000).contains(&millis) {
        errors.add("timeout", ValidationError::new("probe_timeout_out_of_range"));
    }
    if probe.ping_command.trim().is_empty() {
        errors.add("ping_command", ValidationError::new("ping_command_empty"));
    }
    if !(1..=1024).contains(&probe.max_concurrency) {
        errors.add(
            "max_concurrency",
            ValidationError::new("max_concurrency_out_of_range"),
        );
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

fn validate_unique_slugs(destinations: &[DestinationSettings]) -> Result<(), ValidationErrors> {
    let mut seen = HashSet::new();
    for destination in destinations {
        if !seen.insert(destination.metrics_slug.as_str()) {
            let mut error = ValidationError::new("duplicate_metrics_slug");
            error.add_param("metrics_slug".into(), &destination.metrics_slug);

            let mut errors = ValidationErrors::new();
            errors.add("destinations", error);
            return Err(errors);
        }
    }
    Ok(())
}

// Configuration loading implementation

impl Config {
    /// Resolve the configuration file from the override variable or the
    /// default search paths
    pub fn locate() -> Result<PathBuf, ConfigError> {
        Self::find_config_file(std::env::var_os(CONFIG_PATH_ENV))
            .ok_or(ConfigError::FileNotFound)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&contents)
    }

    /// Parse and validate a YAML document
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve the configuration file
    ///
    /// An explicit override is returned as-is so that a missing file surfaces
    /// as a read error rather than silently falling back.
    fn find_config_file(override_path: Option<OsString>) -> Option<PathBuf> {
        if let Some(path) = override_path.filter(|p| !p.is_empty()) {
            return Some(PathBuf::from(path));
        }

        let mut paths = vec![PathBuf::from(DEFAULT_CONFIG_PATH)];

        if let Some(home_path) = Self::home_config_path() {
            paths.push(home_path);
        }

        paths.push(PathBuf::from("./config.yml"));

        paths.into_iter().find(|p: &PathBuf| p.exists() && p.is_file())
    }

    /// Get home directory config path
    fn home_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".config/latency-exporter/config.yml"))
    }

    /// Destinations in file order
    pub fn destinations(&self) -> Vec<Destination> {
        self.destinations.iter().cloned().map(Destination::from).collect()
    }
}
