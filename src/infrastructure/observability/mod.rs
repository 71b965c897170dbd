//! Push-based observability for the nozzle itself
//!
//! The nozzle's own counters live in a `TelemetryRegistry` and are pushed out by a
//! `TelemetryReporter`, either to the monitoring backend or as JSON lines on stdout.
//! No HTTP server is started.

pub mod metrics;
pub mod reporter;

pub use metrics::TelemetryRegistry;
pub use reporter::{LogTelemetrySink, TelemetryReporter};
