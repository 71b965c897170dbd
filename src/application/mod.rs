// Application metadata lookups and caching
pub mod app_info_cache;
pub mod label_maker;

// Envelope translation and delivery
pub mod log_sink;

// Telemetry export to the monitoring backend
pub mod metric_reporter;

// Pipeline assembly
pub mod system;
