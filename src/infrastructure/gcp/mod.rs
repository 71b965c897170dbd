//! Google Cloud backends: Cloud Logging, Cloud Monitoring and the GCE metadata server.

pub mod logging;
pub mod metadata;
pub mod monitoring;

pub use logging::CloudLoggingAdapter;
pub use metadata::detect_monitored_resource;
pub use monitoring::CloudMonitoringClient;
