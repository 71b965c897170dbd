//! Telemetry registry for the nozzle's own counters
//!
//! Every series lives under the `stackdriver-nozzle/` namespace and is kept in
//! registration order so snapshots are stable across reports.

use crate::domain::errors::TelemetryError;
use crate::domain::telemetry::{Counter, CounterMap, MetricValue, Series};
use prometheus::{Registry, TextEncoder};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

pub const NAMESPACE: &str = "stackdriver-nozzle";

/// Registry of named counters, snapshotted by the telemetry reporter
#[derive(Clone)]
pub struct TelemetryRegistry {
    registry: Arc<Registry>,
    series: Arc<RwLock<Vec<Series>>>,
}

impl TelemetryRegistry {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Registry::new()),
            series: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Fully-qualified series name for a short name
    pub fn qualify(short_name: &str) -> String {
        format!("{}/{}", NAMESPACE, short_name)
    }

    pub fn register_counter(&self, short_name: &str, help: &str) -> Result<Counter, TelemetryError> {
        self.register_labeled_counter(short_name, help, HashMap::new())
    }

    pub fn register_labeled_counter(
        &self,
        short_name: &str,
        help: &str,
        labels: HashMap<String, String>,
    ) -> Result<Counter, TelemetryError> {
        let name = Self::qualify(short_name);
        self.ensure_unique(&name)?;
        let counter = Counter::with_labels(&name, help, labels)?;
        self.registry.register(Box::new(counter.collector()))?;
        self.push(Series::new(name, MetricValue::Counter(counter.clone())));
        Ok(counter)
    }

    pub fn register_counter_map(
        &self,
        short_name: &str,
        help: &str,
        label_keys: &[&str],
    ) -> Result<Arc<CounterMap>, TelemetryError> {
        let name = Self::qualify(short_name);
        self.ensure_unique(&name)?;
        let map = Arc::new(CounterMap::new(&name, help, label_keys)?);
        self.registry.register(Box::new(map.collector()))?;
        self.push(Series::new(name, MetricValue::CounterMap(map.clone())));
        Ok(map)
    }

    /// Informational value; appears in snapshots but is never exported as a point
    pub fn register_text(&self, short_name: &str, value: &str) -> Result<(), TelemetryError> {
        let name = Self::qualify(short_name);
        self.ensure_unique(&name)?;
        self.push(Series::new(name, MetricValue::Text(value.to_string())));
        Ok(())
    }

    /// Every registered series in registration order
    pub fn snapshot(&self) -> Vec<Series> {
        self.series
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Render all counters in Prometheus text format
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder
            .encode_to_string(&metric_families)
            .unwrap_or_default()
    }

    fn ensure_unique(&self, name: &str) -> Result<(), TelemetryError> {
        let series = self.series.read().unwrap_or_else(PoisonError::into_inner);
        if series.iter().any(|s| s.name == name) {
            return Err(TelemetryError::Duplicate {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    fn push(&self, series: Series) {
        self.series
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(series);
    }
}

impl Default for TelemetryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_snapshot_order() {
        let registry = TelemetryRegistry::new();
        registry.register_counter("a", "first").unwrap();
        registry
            .register_counter_map("b", "second", &["event_type"])
            .unwrap();
        registry.register_text("version", "1.0").unwrap();

        let names: Vec<String> = registry.snapshot().into_iter().map(|s| s.name).collect();
        assert_eq!(
            names,
            vec![
                "stackdriver-nozzle/a",
                "stackdriver-nozzle/b",
                "stackdriver-nozzle/version"
            ]
        );
    }

    #[test]
    fn test_registry_rejects_duplicates() {
        let registry = TelemetryRegistry::new();
        registry.register_counter("dup", "x").unwrap();
        assert!(matches!(
            registry.register_counter("dup", "x"),
            Err(TelemetryError::Duplicate { .. })
        ));
    }

    #[test]
    fn test_render_contains_counters() {
        let registry = TelemetryRegistry::new();
        let counter = registry.register_counter("posts", "posts").unwrap();
        counter.add(3);
        let output = registry.render();
        assert!(output.contains("stackdriver_nozzle_posts 3"));
    }
}
