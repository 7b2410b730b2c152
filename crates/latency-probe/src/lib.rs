//! Latency probes for the latency exporter.
//!
//! This crate measures reachability and round-trip latency of a single
//! endpoint and normalizes the outcome into a [`MeasurementResult`].
//! Supported probe methods:
//! - HTTP/HTTPS GET requests (`http`, `https`)
//! - ICMP echo through the external `fping` utility (`icmp`, `ping`)
//!
//! Runners are looked up by method name through a [`RunnerRegistry`]. Adding
//! a probe method means implementing [`Runner`] and registering it.
//!
//! # Example
//!
//! ```no_run
//! use latency_probe::{ProbeSettings, RunnerRegistry};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = RunnerRegistry::with_defaults(&ProbeSettings::default())?;
//!
//! if let Some(runner) = registry.get("https") {
//!     let result = runner.run("https://example.com").await;
//!     println!("{} -> {}", runner.method_name(), result);
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod ping;
pub mod runners;
pub mod types;

pub use error::{ProbeError, Result};
pub use ping::{PingOutcome, exec_ping, parse_report};
pub use runners::{HttpRunner, IcmpRunner, Runner, RunnerRegistry};
pub use types::{Destination, ExtraData, MeasurementResult, ProbeSettings};
