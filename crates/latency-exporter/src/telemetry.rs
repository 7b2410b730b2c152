//! Tracing subscriber and OpenTelemetry setup.

use crate::config::{LoggingSettings, TelemetrySettings};
use anyhow::Context;
use opentelemetry::KeyValue;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    Resource, runtime,
    trace::{RandomIdGenerator, Sampler, Tracer, TracerProvider},
};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// OpenTelemetry tracer guard
///
/// When dropped, flushes all pending spans and shuts down the tracer
pub struct TelemetryGuard;

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        opentelemetry::global::shutdown_tracer_provider();
    }
}

/// Whether the configured log format asks for JSON lines
pub fn wants_json(logging: &LoggingSettings) -> bool {
    logging
        .format
        .as_deref()
        .is_some_and(|format| format.eq_ignore_ascii_case("json"))
}

/// Install the OTLP span exporter as the global tracer provider
///
/// Returns the SDK tracer for the tracing-opentelemetry layer.
fn init_otlp(telemetry: &TelemetrySettings) -> anyhow::Result<(TelemetryGuard, Tracer)> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(telemetry.otlp_endpoint.clone())
        .build()
        .map_err(|e| anyhow::anyhow!("failed to build OTLP exporter: {}", e))?;

    let resource = Resource::new(vec![
        KeyValue::new("service.name", telemetry.service_name.clone()),
        KeyValue::new("service.version", env!("CARGO_PKG_VERSION").to_string()),
    ]);

    let provider = TracerProvider::builder()
        .with_batch_exporter(exporter, runtime::Tokio)
        .with_config(
            opentelemetry_sdk::trace::Config::default()
                .with_sampler(Sampler::AlwaysOn)
                .with_id_generator(RandomIdGenerator::default())
                .with_resource(resource),
        )
        .build();

    let tracer = provider.tracer(telemetry.service_name.clone());
    opentelemetry::global::set_tracer_provider(provider);

    Ok((TelemetryGuard, tracer))
}

/// Setup tracing-subscriber, optionally exporting spans over OTLP
///
/// `RUST_LOG` takes precedence over the configured level. Must be called from
/// within a tokio runtime when telemetry is enabled.
pub fn init_tracing(
    logging: &LoggingSettings,
    telemetry: &TelemetrySettings,
) -> anyhow::Result<Option<TelemetryGuard>> {
    let level = logging.level.as_deref().unwrap_or("info");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let json = wants_json(logging);
    let text_layer = (!json).then(tracing_subscriber::fmt::layer);
    let json_layer = json.then(|| tracing_subscriber::fmt::layer().json());

    let (guard, otel_layer) = if telemetry.enabled {
        let (guard, tracer) = init_otlp(telemetry)?;
        let layer = tracing_opentelemetry::layer().with_tracer(tracer);
        (Some(guard), Some(layer))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(text_layer)
        .with(json_layer)
        .with(otel_layer)
        .try_init()
        .context("failed to install tracing subscriber")?;

    tracing::info!(json, opentelemetry = telemetry.enabled, "Tracing initialized");

    if telemetry.enabled {
        tracing::info!(
            service_name = %telemetry.service_name,
            otlp_endpoint = %telemetry.otlp_endpoint,
            "Exporting spans over OTLP"
        );
    }

    Ok(guard)
}
