//! Periodic telemetry reporting
//!
//! `TelemetryReporter` hands the registry's series to every sink once at startup,
//! then pushes a snapshot on a fixed interval. Nothing here accepts requests.

use crate::domain::ports::TelemetrySink;
use crate::domain::telemetry::{MetricValue, Series};
use crate::infrastructure::observability::metrics::TelemetryRegistry;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{info, warn};

/// Drives `init` once and `report` on every tick for all sinks
pub struct TelemetryReporter {
    registry: TelemetryRegistry,
    sinks: Vec<Arc<dyn TelemetrySink>>,
    interval: Duration,
}

impl TelemetryReporter {
    pub fn new(registry: TelemetryRegistry, interval_seconds: u64) -> Self {
        Self {
            registry,
            sinks: Vec::new(),
            interval: Duration::from_secs(interval_seconds.max(1)),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn TelemetrySink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub async fn init(&self) {
        let registered = self.registry.snapshot();
        for sink in &self.sinks {
            sink.init(&registered).await;
        }
    }

    pub async fn report_once(&self) {
        let snapshot = self.registry.snapshot();
        for sink in &self.sinks {
            sink.report(&snapshot).await;
        }
    }

    /// Runs until `shutdown` flips to true, then pushes one last report
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(interval = ?self.interval, sinks = self.sinks.len(), "TelemetryReporter: starting");
        self.init().await;

        let start = tokio::time::Instant::now() + self.interval;
        let mut ticker = tokio::time::interval_at(start, self.interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => self.report_once().await,
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        self.report_once().await;
        info!("TelemetryReporter: stopped");
    }
}

#[derive(Serialize)]
#[serde(untagged)]
enum SnapshotValue {
    Count(i64),
    Entries(Vec<EntrySnapshot>),
    Text(String),
}

#[derive(Serialize)]
struct EntrySnapshot {
    labels: BTreeMap<String, String>,
    value: i64,
}

#[derive(Serialize)]
struct TelemetrySnapshot {
    timestamp: String,
    uptime_seconds: u64,
    version: &'static str,
    series: BTreeMap<String, SnapshotValue>,
}

/// Writes every snapshot as one JSON line on stdout
pub struct LogTelemetrySink {
    start_time: Instant,
}

impl LogTelemetrySink {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
        }
    }

    fn collect_snapshot(&self, snapshot: &[Series]) -> TelemetrySnapshot {
        let series = snapshot
            .iter()
            .map(|s| {
                let value = match &s.value {
                    MetricValue::Counter(counter) => SnapshotValue::Count(counter.value()),
                    MetricValue::CounterMap(map) => {
                        let mut entries: Vec<EntrySnapshot> = map
                            .entries()
                            .iter()
                            .map(|c| EntrySnapshot {
                                labels: c.labels().clone().into_iter().collect(),
                                value: c.value(),
                            })
                            .collect();
                        entries.sort_by(|a, b| a.labels.cmp(&b.labels));
                        SnapshotValue::Entries(entries)
                    }
                    MetricValue::Text(text) => SnapshotValue::Text(text.clone()),
                };
                (s.name.clone(), value)
            })
            .collect();

        TelemetrySnapshot {
            timestamp: chrono::Utc::now().to_rfc3339(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            version: env!("CARGO_PKG_VERSION"),
            series,
        }
    }
}

impl Default for LogTelemetrySink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TelemetrySink for LogTelemetrySink {
    async fn init(&self, registered: &[Series]) {
        let names: Vec<&str> = registered.iter().map(|s| s.name.as_str()).collect();
        info!(series = ?names, "LogTelemetrySink: registered series");
    }

    async fn report(&self, snapshot: &[Series]) {
        let snapshot = self.collect_snapshot(snapshot);
        match serde_json::to_string(&snapshot) {
            // Prefixed so the lines can be filtered out of the log stream
            Ok(json) => println!("TELEMETRY_JSON:{}", json),
            Err(e) => warn!("Failed to serialize telemetry: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingSink {
        inits: AtomicUsize,
        reports: AtomicUsize,
    }

    #[async_trait]
    impl TelemetrySink for CountingSink {
        async fn init(&self, _registered: &[Series]) {
            self.inits.fetch_add(1, Ordering::SeqCst);
        }
        async fn report(&self, _snapshot: &[Series]) {
            self.reports.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_snapshot_serialization() {
        let registry = TelemetryRegistry::new();
        registry.register_counter("posts", "x").unwrap().add(2);
        let events = registry
            .register_counter_map("events", "x", &["event_type"])
            .unwrap();
        events.add(&["Error"], 1).unwrap();
        registry.register_text("version", "1.2.3").unwrap();

        let snapshot = LogTelemetrySink::new().collect_snapshot(&registry.snapshot());
        let json = serde_json::to_value(&snapshot).unwrap();

        assert_eq!(json["series"]["stackdriver-nozzle/posts"], 2);
        assert_eq!(
            json["series"]["stackdriver-nozzle/events"][0]["labels"]["event_type"],
            "Error"
        );
        assert_eq!(json["series"]["stackdriver-nozzle/version"], "1.2.3");
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_reports_on_tick_and_shutdown() {
        let registry = TelemetryRegistry::new();
        let sink = Arc::new(CountingSink::default());
        let reporter = TelemetryReporter::new(registry, 10).with_sink(sink.clone());
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(reporter.run(rx));
        tokio::time::sleep(Duration::from_secs(25)).await;
        tx.send(true).unwrap();
        handle.await.unwrap();

        assert_eq!(sink.inits.load(Ordering::SeqCst), 1);
        // two ticks plus the final report
        assert_eq!(sink.reports.load(Ordering::SeqCst), 3);
    }
}
