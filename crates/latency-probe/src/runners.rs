//! Probe runner implementations.

use crate::error::Result;
use crate::ping;
use crate::types::{ExtraData, MeasurementResult, ProbeSettings};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Status code reported when an HTTP request never produced a response
pub const TRANSPORT_FAILURE_STATUS: u16 = 500;

/// Probe runner trait
///
/// Implementations never fail: every error is encoded in the returned
/// [`MeasurementResult`].
#[async_trait]
pub trait Runner: Send + Sync {
    /// Measure a single endpoint
    async fn run(&self, endpoint: &str) -> MeasurementResult;

    /// Get the canonical method name of this runner
    fn method_name(&self) -> &'static str;
}

/// HTTP/HTTPS runner
pub struct HttpRunner {
    client: reqwest::Client,
}

impl HttpRunner {
    /// Create a new HTTP runner
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Runner for HttpRunner {
    async fn run(&self, endpoint: &str) -> MeasurementResult {
        let start = Instant::now();
        let response = self.client.get(endpoint).send().await;
        let elapsed = start.elapsed();

        match response {
            Ok(response) => {
                let status_code = response.status().as_u16();
                // Body is never read; dropping the response releases the connection
                drop(response);

                debug!(
                    endpoint,
                    status = status_code,
                    duration_ms = elapsed.as_millis(),
                    "HTTP probe completed"
                );
                MeasurementResult::reachable(elapsed.as_millis() as f64)
                    .with_extra(ExtraData::Http { status_code })
            }
            Err(e) => {
                warn!(endpoint, error = %e, "HTTP probe failed");
                MeasurementResult::new(false, 0.0).with_extra(ExtraData::Http {
                    status_code: TRANSPORT_FAILURE_STATUS,
                })
            }
        }
    }

    fn method_name(&self) -> &'static str {
        "http"
    }
}

/// ICMP runner backed by an external ping utility
pub struct IcmpRunner {
    command: String,
    timeout: Duration,
}

impl IcmpRunner {
    /// Create a new ICMP runner
    pub fn new(command: impl Into<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            timeout,
        }
    }
}

#[async_trait]
impl Runner for IcmpRunner {
    async fn run(&self, endpoint: &str) -> MeasurementResult {
        match ping::exec_ping(&self.command, endpoint, self.timeout).await {
            Ok(outcome) => {
                debug!(
                    endpoint,
                    host = %outcome.host,
                    alive = outcome.alive,
                    latency_ms = outcome.latency_ms,
                    "ICMP probe completed"
                );
                MeasurementResult::new(outcome.alive, outcome.latency_ms)
                    .with_extra(ExtraData::Icmp { host: outcome.host })
            }
            Err(e) => {
                warn!(endpoint, error = %e, "ICMP probe failed");
                MeasurementResult::unreachable(e.to_string())
            }
        }
    }

    fn method_name(&self) -> &'static str {
        "icmp"
    }
}

/// Method name to runner mapping
///
/// Several method names may share one runner instance.
#[derive(Clone, Default)]
pub struct RunnerRegistry {
    runners: HashMap<String, Arc<dyn Runner>>,
}

impl RunnerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in runners
    ///
    /// `http` and `https` share an [`HttpRunner`]; `icmp` and `ping` share an
    /// [`IcmpRunner`].
    pub fn with_defaults(settings: &ProbeSettings) -> Result<Self> {
        let http: Arc<dyn Runner> = Arc::new(HttpRunner::new(settings.timeout)?);
        let icmp: Arc<dyn Runner> = Arc::new(IcmpRunner::new(
            settings.ping_command.clone(),
            settings.timeout,
        ));

        let mut registry = Self::new();
        registry.register("http", http.clone());
        registry.register("https", http);
        registry.register("icmp", icmp.clone());
        registry.register("ping", icmp);
        Ok(registry)
    }

    /// Register a runner under a method name, replacing any previous entry
    pub fn register(&mut self, method: impl Into<String>, runner: Arc<dyn Runner>) {
        self.runners.insert(method.into(), runner);
    }

    /// Look up the runner for an exact method name
    pub fn get(&self, method: &str) -> Option<Arc<dyn Runner>> {
        self.runners.get(method).cloned()
    }

    /// Registered method names, sorted
    pub fn methods(&self) -> Vec<&str> {
        let mut methods: Vec<&str> = self.runners.keys().map(String::as_str).collect();
        methods.sort_unstable();
        methods
    }
}

impl std::fmt::Debug for RunnerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunnerRegistry")
            .field("methods", &self.methods())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_http_runner_connection_refused() {
        let runner = HttpRunner::new(Duration::from_millis(500)).unwrap();

        let result = runner.run("http://127.0.0.1:1/health").await;
        assert!(!result.success);
        assert_eq!(result.latency_ms, 0.0);
        assert!(result.error_message.is_empty());
        assert_eq!(result.extra, ExtraData::Http { status_code: 500 });
    }

    #[tokio::test]
    async fn test_http_runner_invalid_url() {
        let runner = HttpRunner::new(Duration::from_millis(500)).unwrap();

        let result = runner.run("not a url").await;
        assert!(!result.success);
        assert_eq!(result.status_code(), Some(TRANSPORT_FAILURE_STATUS));
    }

    #[tokio::test]
    async fn test_icmp_runner_missing_command() {
        let runner = IcmpRunner::new("latency-probe-no-such-binary", Duration::from_secs(1));

        let result = runner.run("127.0.0.1").await;
        assert!(!result.success);
        assert_eq!(result.latency_ms, 0.0);
        assert!(result.error_message.starts_with("command error"));
        assert_eq!(result.extra, ExtraData::None);
    }

    #[test]
    fn test_default_registry_methods() {
        let registry = RunnerRegistry::with_defaults(&ProbeSettings::default()).unwrap();
        assert_eq!(registry.methods(), vec!["http", "https", "icmp", "ping"]);

        assert_eq!(registry.get("https").unwrap().method_name(), "http");
        assert_eq!(registry.get("ping").unwrap().method_name(), "icmp");
        assert!(registry.get("HTTP").is_none());
        assert!(registry.get("tcp").is_none());
    }

    #[test]
    fn test_aliases_share_runner() {
        let registry = RunnerRegistry::with_defaults(&ProbeSettings::default()).unwrap();
        let http = registry.get("http").unwrap();
        let https = registry.get("https").unwrap();
        assert!(Arc::ptr_eq(&http, &https));
    }
}
