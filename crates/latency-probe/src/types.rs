//! Probe types: destinations, settings and normalized measurement results.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Default probe timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default external ICMP probing utility
pub const DEFAULT_PING_COMMAND: &str = "fping";

/// Default number of destinations measured at once
pub const DEFAULT_MAX_CONCURRENCY: usize = 16;

/// One configured probe target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    /// Display name
    pub name: String,

    /// Address or URL handed to the runner
    pub endpoint: String,

    /// Probe method identifier (http, https, icmp, ping)
    pub method: String,

    /// Lookup key, exposed as the `target` label
    pub metrics_slug: String,
}

impl Destination {
    /// Create a new destination
    pub fn new(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        method: impl Into<String>,
        metrics_slug: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            method: method.into(),
            metrics_slug: metrics_slug.into(),
        }
    }
}

/// Settings shared by every runner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeSettings {
    /// Upper bound for a single HTTP request or ping invocation
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Binary invoked for ICMP probes
    pub ping_command: String,

    /// Destinations measured concurrently by a batch
    pub max_concurrency: usize,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            ping_command: DEFAULT_PING_COMMAND.to_string(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

/// Method-specific side data attached to a result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ExtraData {
    /// Nothing beyond the base fields
    #[default]
    None,

    /// HTTP/HTTPS probe data
    Http {
        /// Response status, or 500 when the request never completed
        status_code: u16,
    },

    /// ICMP probe data
    Icmp {
        /// Host as reported by the ping utility
        host: String,
    },
}

/// Normalized outcome of a single probe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementResult {
    /// Whether the probe considered the target reachable
    pub success: bool,

    /// Round-trip latency in milliseconds
    pub latency_ms: f64,

    /// Error text, empty on success
    pub error_message: String,

    /// Method-specific data
    pub extra: ExtraData,
}

impl MeasurementResult {
    /// Create a result with no error text and no side data
    pub fn new(success: bool, latency_ms: f64) -> Self {
        Self {
            success,
            latency_ms,
            error_message: String::new(),
            extra: ExtraData::None,
        }
    }

    /// Create a successful result
    pub fn reachable(latency_ms: f64) -> Self {
        Self::new(true, latency_ms)
    }

    /// Create a failed result with zero latency
    pub fn unreachable(message: impl Into<String>) -> Self {
        Self {
            success: false,
            latency_ms: 0.0,
            error_message: message.into(),
            extra: ExtraData::None,
        }
    }

    /// Attach method-specific data
    pub fn with_extra(mut self, extra: ExtraData) -> Self {
        self.extra = extra;
        self
    }

    /// HTTP status code, if this is an HTTP result
    pub fn status_code(&self) -> Option<u16> {
        match self.extra {
            ExtraData::Http { status_code } => Some(status_code),
            _ => None,
        }
    }

    /// Latency converted to seconds
    pub fn latency_seconds(&self) -> f64 {
        self.latency_ms / 1000.0
    }
}

impl fmt::Display for MeasurementResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.success {
            write!(f, "OK {:.3}ms", self.latency_ms)
        } else if self.error_message.is_empty() {
            write!(f, "FAILED")
        } else {
            write!(f, "FAILED: {}", self.error_message)
        }
    }
}
