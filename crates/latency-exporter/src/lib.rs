//! Latency Exporter
//!
//! Probes a declarative list of destinations on demand and renders the
//! results in the Prometheus text format.
//!
//! # Components
//!
//! - **Config**: YAML destination list plus server, probe, logging and
//!   telemetry settings
//! - **Router**: resolves destinations by metrics slug and dispatches them to
//!   the runner registered for their method
//! - **Exposition**: renders results as `latency_measurement_*` gauges
//! - **HTTP server**: `/metrics`, `/metrics/:resource`, `/health`
//!
//! Probes themselves live in the `latency-probe` crate.

pub mod config;
pub mod exposition;
pub mod http_server;
pub mod metrics;
pub mod router;
pub mod telemetry;

pub use config::{Config, ConfigError};
pub use exposition::{format_all, format_one};
pub use http_server::{AppContext, ExporterServer, create_app};
pub use metrics::MetricsRegistry;
pub use router::{Router, RouterError};
pub use telemetry::{TelemetryGuard, init_tracing};
