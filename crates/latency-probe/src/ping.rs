//! fping invocation and report parsing.
//!
//! `fping -c1 <address>` prints a per-probe line on stdout and a statistics
//! summary on stderr. Which of the two is usable depends on reachability, so
//! both shapes are tried in order:
//!
//! ```text
//! 10.0.0.1 : [0], 64 bytes, 9.35 ms (9.35 avg, 0% loss)
//! 10.0.0.1 : xmt/rcv/%loss = 1/1/0%, min/avg/max = 9.35/9.35/9.35
//! ```
//!
//! Numeric fields that fail to parse degrade to zero instead of failing the
//! whole report.

use crate::error::{ProbeError, Result};
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Per-probe line: host, round trip, running average, loss.
static PROBE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\S+)\s+:.*?,\s+([\d.]+)\s+ms.*\(([\d.]+)\s+avg,\s+(\d+)% loss\)")
        .expect("probe line pattern is valid")
});

/// Summary line: host and the avg component of min/avg/max.
static SUMMARY_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\S+)\s+:.*avg/max\s+=\s+[\d.]+/([\d.]+)/[\d.]+")
        .expect("summary line pattern is valid")
});

/// Parsed outcome of one ping invocation
#[derive(Debug, Clone, PartialEq)]
pub struct PingOutcome {
    /// Host as printed by the utility
    pub host: String,

    /// Whether the host answered
    pub alive: bool,

    /// Average round trip in milliseconds
    pub latency_ms: f64,
}

/// Run `<command> -c1 <address>` and parse its combined output.
///
/// The child is killed if `timeout` elapses first.
pub async fn exec_ping(command: &str, address: &str, timeout: Duration) -> Result<PingOutcome> {
    let child = Command::new(command)
        .arg("-c1")
        .arg(address)
        .kill_on_drop(true)
        .output();

    let output = match tokio::time::timeout(timeout, child).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => return Err(ProbeError::command(format!("failed to run {}: {}", command, e))),
        Err(_) => return Err(ProbeError::Timeout(timeout)),
    };

    let text = format!(
        "{}\n{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );

    // fping exits nonzero for unreachable hosts but still reports them
    if !output.status.success() && text.trim().is_empty() {
        return Err(ProbeError::command(format!(
            "{} exited with {}",
            command, output.status
        )));
    }

    debug!(address, status = %output.status, "ping finished");
    parse_report(&text)
}

/// Parse an fping report into a [`PingOutcome`].
pub fn parse_report(output: &str) -> Result<PingOutcome> {
    let lines: Vec<&str> = output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    if lines.len() < 2 {
        return Err(ProbeError::parse(format!(
            "unexpected output: {}",
            output.trim()
        )));
    }

    if let Some(caps) = PROBE_LINE.captures(lines[0]) {
        let round_trip = parse_f64(&caps[2]);
        let avg = parse_f64(&caps[3]);
        let loss = caps[4].parse::<u32>().unwrap_or(0);

        return Ok(PingOutcome {
            host: caps[1].to_string(),
            alive: loss == 0 && round_trip > 0.0,
            latency_ms: avg,
        });
    }

    if let Some(caps) = SUMMARY_LINE.captures(lines[1]) {
        return Ok(PingOutcome {
            host: caps[1].to_string(),
            alive: true,
            latency_ms: parse_f64(&caps[2]),
        });
    }

    Err(ProbeError::parse(format!(
        "could not parse output: {}",
        output.trim()
    )))
}

fn parse_f64(field: &str) -> f64 {
    field.parse().unwrap_or(0.0)
}
