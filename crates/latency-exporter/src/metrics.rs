//! Prometheus metrics describing the exporter itself.
//!
//! These series are served on `/internal/metrics` and are kept apart from the
//! probe exposition rendered by [`crate::exposition`].

use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::histogram::{Histogram, exponential_buckets};
use prometheus_client::registry::Registry;
use std::time::Duration;

/// Labels for probe counters
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ProbeLabels {
    /// Probe method as configured (http, https, icmp, ping)
    pub method: String,
    /// success or failure
    pub outcome: String,
}

/// Labels for probe duration
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct MethodLabels {
    pub method: String,
}

/// Labels for skipped measurements
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct SkipLabels {
    /// unsupported_method or not_found
    pub reason: String,
}

/// Metrics registry with all exporter self-metrics
pub struct MetricsRegistry {
    /// Prometheus registry
    pub registry: Registry,

    /// Probes executed
    probes_total: Family<ProbeLabels, Counter>,
    /// Wall time spent per probe
    probe_duration_seconds: Family<MethodLabels, Histogram>,
    /// Measurements that never reached a runner
    skipped_total: Family<SkipLabels, Counter>,
    /// Configured destinations
    destinations: Gauge,
}

impl MetricsRegistry {
    /// Create a new metrics registry
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let probes_total = Family::<ProbeLabels, Counter>::default();
        registry.register(
            "latency_exporter_probes",
            "Total probes executed",
            probes_total.clone(),
        );

        let probe_duration_seconds =
            Family::<MethodLabels, Histogram>::new_with_constructor(|| {
                // 1ms to ~16s
                Histogram::new(exponential_buckets(0.001, 2.0, 15))
            });
        registry.register(
            "latency_exporter_probe_duration_seconds",
            "Wall time spent running a probe",
            probe_duration_seconds.clone(),
        );

        let skipped_total = Family::<SkipLabels, Counter>::default();
        registry.register(
            "latency_exporter_skipped",
            "Measurements skipped before reaching a runner",
            skipped_total.clone(),
        );

        let destinations = Gauge::default();
        registry.register(
            "latency_exporter_destinations",
            "Number of configured destinations",
            destinations.clone(),
        );

        Self {
            registry,
            probes_total,
            probe_duration_seconds,
            skipped_total,
            destinations,
        }
    }

    /// Record a finished probe
    pub fn record_probe(&self, method: &str, success: bool, duration: Duration) {
        self.probes_total
            .get_or_create(&ProbeLabels {
                method: method.to_string(),
                outcome: if success { "success" } else { "failure" }.to_string(),
            })
            .inc();

        self.probe_duration_seconds
            .get_or_create(&MethodLabels {
                method: method.to_string(),
            })
            .observe(duration.as_secs_f64());
    }

    /// Record a measurement skipped for `reason`
    pub fn record_skipped(&self, reason: &str) {
        self.skipped_total
            .get_or_create(&SkipLabels {
                reason: reason.to_string(),
            })
            .inc();
    }

    /// Update configured destination count
    pub fn set_destinations(&self, count: usize) {
        self.destinations.set(count as i64);
    }

    /// Encode all metrics in the text format
    pub fn encode(&self) -> Result<String, std::fmt::Error> {
        let mut buffer = String::new();
        encode(&mut buffer, &self.registry)?;
        Ok(buffer)
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_probe() {
        let registry = MetricsRegistry::new();

        registry.record_probe("https", true, Duration::from_millis(50));
        registry.record_probe("https", false, Duration::from_millis(100));

        let text = registry.encode().unwrap();
        assert!(
            text.contains(r#"latency_exporter_probes_total{method="https",outcome="success"} 1"#)
        );
        assert!(
            text.contains(r#"latency_exporter_probes_total{method="https",outcome="failure"} 1"#)
        );
        assert!(
            text.contains(r#"latency_exporter_probe_duration_seconds_count{method="https"} 2"#)
        );
    }

    #[test]
    fn test_record_skipped() {
        let registry = MetricsRegistry::new();

        registry.record_skipped("unsupported_method");
        registry.record_skipped("unsupported_method");
        registry.record_skipped("not_found");

        let text = registry.encode().unwrap();
        assert!(text.contains(r#"latency_exporter_skipped_total{reason="unsupported_method"} 2"#));
        assert!(text.contains(r#"latency_exporter_skipped_total{reason="not_found"} 1"#));
    }

    #[test]
    fn test_destinations_gauge() {
        let registry = MetricsRegistry::new();

        registry.set_destinations(3);

        let text = registry.encode().unwrap();
        assert!(text.contains("latency_exporter_destinations 3"));
    }
}
