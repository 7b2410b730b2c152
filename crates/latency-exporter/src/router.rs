//! Destination lookup and measurement dispatch.

use crate::metrics::MetricsRegistry;
use futures::stream::{self, StreamExt};
use latency_probe::{Destination, MeasurementResult, ProbeSettings, Runner, RunnerRegistry};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors visible to callers of the router
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("unsupported measurement method: {0}")]
    UnsupportedMethod(String),

    #[error("destination with slug '{0}' not found")]
    DestinationNotFound(String),
}

impl RouterError {
    /// Label used when recording a skipped measurement
    pub fn reason(&self) -> &'static str {
        match self {
            RouterError::UnsupportedMethod(_) => "unsupported_method",
            RouterError::DestinationNotFound(_) => "not_found",
        }
    }
}

/// Routes destinations to the runner registered for their method
///
/// Both the registry and the destination list are fixed at construction.
pub struct Router {
    registry: RunnerRegistry,
    destinations: Vec<Destination>,
    max_concurrency: usize,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl Router {
    /// Create a router with the built-in runners
    pub fn new(
        destinations: Vec<Destination>,
        settings: &ProbeSettings,
        metrics: Option<Arc<MetricsRegistry>>,
    ) -> latency_probe::Result<Self> {
        let registry = RunnerRegistry::with_defaults(settings)?;
        Ok(Self::with_registry(registry, destinations, metrics)
            .max_concurrency(settings.max_concurrency))
    }

    /// Create a router over an explicit registry
    pub fn with_registry(
        registry: RunnerRegistry,
        destinations: Vec<Destination>,
        metrics: Option<Arc<MetricsRegistry>>,
    ) -> Self {
        info!(
            destinations = destinations.len(),
            methods = ?registry.methods(),
            "Router initialized"
        );

        if let Some(ref m) = metrics {
            m.set_destinations(destinations.len());
        }

        Self {
            registry,
            destinations,
            max_concurrency: latency_probe::types::DEFAULT_MAX_CONCURRENCY,
            metrics,
        }
    }

    /// Limit how many destinations [`Router::measure_all`] probes at once
    pub fn max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = limit.max(1);
        self
    }

    /// Get the runner registered for `method`
    pub fn get_runner(&self, method: &str) -> Result<Arc<dyn Runner>, RouterError> {
        self.registry
            .get(method)
            .ok_or_else(|| RouterError::UnsupportedMethod(method.to_string()))
    }

    /// Find a destination by its metrics slug
    ///
    /// The first destination in configuration order wins if slugs repeat.
    pub fn get_destination_by_slug(&self, slug: &str) -> Result<&Destination, RouterError> {
        self.destinations
            .iter()
            .find(|d| d.metrics_slug == slug)
            .ok_or_else(|| RouterError::DestinationNotFound(slug.to_string()))
    }

    /// All configured destinations, in configuration order
    pub fn get_all_destinations(&self) -> &[Destination] {
        &self.destinations
    }

    /// Run one measurement against `destination`
    pub async fn run_measurement(
        &self,
        destination: &Destination,
    ) -> Result<MeasurementResult, RouterError> {
        let runner = self.get_runner(&destination.method)?;

        let start = Instant::now();
        let result = runner.run(&destination.endpoint).await;

        debug!(
            slug = %destination.metrics_slug,
            method = %destination.method,
            result = %result,
            "Measurement finished"
        );

        if let Some(ref m) = self.metrics {
            m.record_probe(&destination.method, result.success, start.elapsed());
        }

        Ok(result)
    }

    /// Measure every destination
    ///
    /// Destinations whose measurement fails are logged and left out of the
    /// returned map; the rest of the batch is unaffected.
    pub async fn measure_all(&self) -> HashMap<String, MeasurementResult> {
        let measurements: Vec<_> = self
            .destinations
            .iter()
            .map(|destination| async move {
                (destination, self.run_measurement(destination).await)
            })
            .collect();

        let outcomes: Vec<_> = stream::iter(measurements)
            .buffered(self.max_concurrency)
            .collect()
            .await;

        let mut results = HashMap::with_capacity(outcomes.len());
        for (destination, outcome) in outcomes {
            match outcome {
                Ok(result) => {
                    results.insert(destination.metrics_slug.clone(), result);
                }
                Err(e) => {
                    warn!(
                        name = %destination.name,
                        slug = %destination.metrics_slug,
                        error = %e,
                        "Failed to measure destination"
                    );
                    self.record_skipped(&e);
                }
            }
        }
        results
    }

    /// Record a measurement that never reached a runner
    pub fn record_skipped(&self, error: &RouterError) {
        if let Some(ref m) = self.metrics {
            m.record_skipped(error.reason());
        }
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("registry", &self.registry)
            .field("destinations", &self.destinations.len())
            .field("max_concurrency", &self.max_concurrency)
            .finish_non_exhaustive()
    }
}
