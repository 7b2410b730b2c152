//! HTTP server exposing probe results.

use crate::exposition;
use crate::metrics::MetricsRegistry;
use crate::router::Router as ProbeRouter;
use axum::{
    Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// State shared by every request handler
pub struct AppContext {
    /// Destination router
    pub router: ProbeRouter,
    /// Self-metrics, served on /internal/metrics when present
    pub metrics: Option<Arc<MetricsRegistry>>,
}

impl AppContext {
    /// Create a new application context
    pub fn new(router: ProbeRouter, metrics: Option<Arc<MetricsRegistry>>) -> Self {
        Self { router, metrics }
    }
}

/// Build the axum application
pub fn create_app(context: Arc<AppContext>) -> Router {
    let mut app = Router::new()
        .route("/metrics", get(all_metrics_handler))
        .route("/metrics/:resource", get(resource_metrics_handler))
        .route("/health", get(health_handler));

    if context.metrics.is_some() {
        app = app.route("/internal/metrics", get(self_metrics_handler));
    }

    app.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CatchPanicLayer::new()),
    )
    .with_state(context)
}

/// HTTP server for the exporter
pub struct ExporterServer {
    /// Shared application state
    context: Arc<AppContext>,
    /// Listen address
    listen_addr: String,
}

impl ExporterServer {
    /// Create a new exporter server
    pub fn new(context: Arc<AppContext>, listen_addr: String) -> Self {
        Self {
            context,
            listen_addr,
        }
    }

    /// Run the HTTP server until a shutdown signal arrives
    pub async fn run(self) -> std::io::Result<()> {
        info!(listen_addr = %self.listen_addr, "Starting exporter HTTP server");

        let app = create_app(self.context);

        let listener = TcpListener::bind(&self.listen_addr).await?;
        info!(listen_addr = %self.listen_addr, "Exporter listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Exporter HTTP server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("Shutdown signal received");
}

fn text_response(status: StatusCode, body: String) -> Response {
    (status, [(header::CONTENT_TYPE, TEXT_PLAIN)], body).into_response()
}

/// Handler for /metrics/:resource
async fn resource_metrics_handler(
    State(context): State<Arc<AppContext>>,
    Path(resource): Path<String>,
) -> Response {
    let router = &context.router;

    let destination = match router.get_destination_by_slug(&resource) {
        Ok(destination) => destination,
        Err(e) => {
            router.record_skipped(&e);
            return text_response(
                StatusCode::NOT_FOUND,
                format!("Resource not found: {}", resource),
            );
        }
    };

    match router.run_measurement(destination).await {
        Ok(result) => text_response(StatusCode::OK, exposition::format_one(destination, &result)),
        Err(e) => {
            warn!(slug = %resource, error = %e, "Measurement failed");
            router.record_skipped(&e);
            text_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Measurement failed: {}", e),
            )
        }
    }
}

/// Handler for /metrics
async fn all_metrics_handler(State(context): State<Arc<AppContext>>) -> Response {
    let router = &context.router;
    let results = router.measure_all().await;
    let body = exposition::format_all(router.get_all_destinations(), &results);
    text_response(StatusCode::OK, body)
}

/// Handler for /health
async fn health_handler() -> &'static str {
    "OK"
}

/// Handler for /internal/metrics
async fn self_metrics_handler(State(context): State<Arc<AppContext>>) -> Response {
    let Some(ref registry) = context.metrics else {
        return StatusCode::NOT_FOUND.into_response();
    };

    match registry.encode() {
        Ok(buffer) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            buffer,
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to encode metrics");
            text_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
        }
    }
}
