//! Latency Exporter binary

use anyhow::Context;
use latency_exporter::{AppContext, Config, ExporterServer, MetricsRegistry, Router, init_tracing};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Configuration errors are fatal; tracing is not initialized yet
    let config_path = Config::locate().context("failed to locate configuration")?;
    let config = Config::load_from_file(&config_path).with_context(|| {
        format!("failed to load configuration from {}", config_path.display())
    })?;

    let _telemetry_guard = init_tracing(&config.logging, &config.telemetry)?;

    tracing::info!(
        config = %config_path.display(),
        destinations = config.destinations.len(),
        "Latency exporter starting"
    );

    let metrics = config
        .server
        .self_metrics
        .then(|| Arc::new(MetricsRegistry::new()));

    let router = Router::new(config.destinations(), &config.probe, metrics.clone())
        .context("failed to build probe runners")?;

    let context = Arc::new(AppContext::new(router, metrics));
    let server = ExporterServer::new(context, config.server.listen_addr.clone());

    server.run().await.context("HTTP server error")?;

    // Telemetry guard will flush spans on drop

    Ok(())
}
