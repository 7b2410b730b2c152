//! Error types for probe execution.

use std::fmt;
use std::time::Duration;

/// A specialized Result type for probe operations.
pub type Result<T> = std::result::Result<T, ProbeError>;

/// Failures raised while running a probe.
///
/// Runners never surface these to their callers; they are folded into a
/// failed [`MeasurementResult`](crate::MeasurementResult).
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("command error: {0}")]
    Command(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("probe timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

impl ProbeError {
    /// Create a new command error.
    pub fn command(msg: impl fmt::Display) -> Self {
        ProbeError::Command(msg.to_string())
    }

    /// Create a new parse error.
    pub fn parse(msg: impl fmt::Display) -> Self {
        ProbeError::Parse(msg.to_string())
    }
}
