// Platform event model
pub mod envelope;
pub mod log;

// Application metadata
pub mod app_info;

// Monitoring backend model
pub mod monitoring;

// In-process counters
pub mod telemetry;

// Port interfaces
pub mod ports;

// Domain-specific error types
pub mod errors;
