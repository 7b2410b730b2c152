//! Prometheus text exposition of measurement results.
//!
//! Output is rendered by hand rather than through a metrics registry: the
//! values are point-in-time measurements that must be printed with fixed
//! precision (`%.6f` seconds) for compatibility with existing dashboards.

use latency_probe::{Destination, ExtraData, MeasurementResult};
use std::collections::HashMap;

/// Latency gauge
pub const LATENCY_METRIC: &str = "latency_measurement_seconds";

/// Success gauge
pub const SUCCESS_METRIC: &str = "latency_measurement_success";

/// HTTP status gauge
pub const HTTP_STATUS_METRIC: &str = "latency_measurement_http_status_code";

/// HELP/TYPE block emitted once by [`format_all`]
pub const PREAMBLE: &str = "\
# HELP latency_measurement_seconds Latency measurement in seconds
# TYPE latency_measurement_seconds gauge
# HELP latency_measurement_success Success indicator (1=success, 0=failure)
# TYPE latency_measurement_success gauge
# HELP latency_measurement_http_status_code HTTP status code for HTTP measurements
# TYPE latency_measurement_http_status_code gauge
";

/// Render one destination's result
pub fn format_one(destination: &Destination, result: &MeasurementResult) -> String {
    let mut output = String::new();
    write_one(&mut output, destination, result);
    output
}

/// Render every destination that has a result, preceded by [`PREAMBLE`]
///
/// Destinations are emitted in slice order; those missing from `results`
/// are omitted.
pub fn format_all(
    destinations: &[Destination],
    results: &HashMap<String, MeasurementResult>,
) -> String {
    let mut output = String::from(PREAMBLE);

    for destination in destinations {
        if let Some(result) = results.get(&destination.metrics_slug) {
            write_one(&mut output, destination, result);
        }
    }

    output.trim().to_string()
}

fn write_one(output: &mut String, destination: &Destination, result: &MeasurementResult) {
    let labels = labels(destination);

    output.push_str(&format!(
        "{}{{{}}} {:.6}\n",
        LATENCY_METRIC,
        labels,
        result.latency_seconds()
    ));
    output.push_str(&format!(
        "{}{{{}}} {}\n",
        SUCCESS_METRIC,
        labels,
        u8::from(result.success)
    ));

    if is_http_method(&destination.method) {
        match &result.extra {
            ExtraData::Http { status_code } => {
                output.push_str(&format!("{}{{{}}} {}\n", HTTP_STATUS_METRIC, labels, status_code));
            }
            ExtraData::Icmp { .. } | ExtraData::None => {}
        }
    }
}

fn is_http_method(method: &str) -> bool {
    matches!(method, "http" | "https")
}

fn labels(destination: &Destination) -> String {
    format!(
        r#"target="{}",method="{}",endpoint="{}",name="{}""#,
        escape_label_value(&destination.metrics_slug),
        escape_label_value(&destination.method),
        escape_label_value(&destination.endpoint),
        escape_label_value(&destination.name),
    )
}

/// Escape a label value for the text format
fn escape_label_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str(r"\\"),
            '"' => escaped.push_str(r#"\""#),
            '\n' => escaped.push_str(r"\n"),
            c => escaped.push(c),
        }
    }
    escaped
}
