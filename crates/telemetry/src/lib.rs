//! Telemetry for the funnel engine.
//!
//! Structured logging through `tracing`, plus lock-free counters and
//! latency histograms for analysis runs.

pub mod metrics;
pub mod tracing_setup;

pub use metrics::*;
pub use tracing_setup::*;
