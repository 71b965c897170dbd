//! In-process cumulative counters.
//!
//! Counters are backed by prometheus collectors so they can also be rendered in the
//! text exposition format; the nozzle itself only ever pushes snapshots.

use crate::domain::errors::TelemetryError;
use prometheus::{IntCounter, IntCounterVec, Opts};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Monotonically non-decreasing integer with an optional fixed label set
#[derive(Clone)]
pub struct Counter {
    inner: IntCounter,
    labels: HashMap<String, String>,
}

impl Counter {
    pub fn new(name: &str, help: &str) -> Result<Self, TelemetryError> {
        Self::with_labels(name, help, HashMap::new())
    }

    pub fn with_labels(
        name: &str,
        help: &str,
        labels: HashMap<String, String>,
    ) -> Result<Self, TelemetryError> {
        let opts = Opts::new(collector_name(name), help).const_labels(labels.clone());
        let inner = IntCounter::with_opts(opts)?;
        Ok(Self { inner, labels })
    }

    fn from_parts(inner: IntCounter, labels: HashMap<String, String>) -> Self {
        Self { inner, labels }
    }

    pub(crate) fn collector(&self) -> IntCounter {
        self.inner.clone()
    }

    pub fn increment(&self) {
        self.inner.inc();
    }

    pub fn add(&self, delta: u64) {
        self.inner.inc_by(delta);
    }

    pub fn value(&self) -> i64 {
        i64::try_from(self.inner.get()).unwrap_or(i64::MAX)
    }

    pub fn labels(&self) -> &HashMap<String, String> {
        &self.labels
    }
}

impl std::fmt::Debug for Counter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Counter")
            .field("value", &self.value())
            .field("labels", &self.labels)
            .finish()
    }
}

/// Counters dimensioned by a fixed set of label keys; entries appear on first use
pub struct CounterMap {
    name: String,
    vec: IntCounterVec,
    label_keys: Vec<String>,
    entries: RwLock<HashMap<Vec<String>, Counter>>,
}

impl CounterMap {
    pub fn new(name: &str, help: &str, label_keys: &[&str]) -> Result<Self, TelemetryError> {
        let vec = IntCounterVec::new(Opts::new(collector_name(name), help), label_keys)?;
        Ok(Self {
            name: name.to_string(),
            vec,
            label_keys: label_keys.iter().map(|k| k.to_string()).collect(),
            entries: RwLock::new(HashMap::new()),
        })
    }

    pub(crate) fn collector(&self) -> IntCounterVec {
        self.vec.clone()
    }

    pub fn label_keys(&self) -> &[String] {
        &self.label_keys
    }

    /// Counter for the given label values, created on first use
    pub fn counter(&self, values: &[&str]) -> Result<Counter, TelemetryError> {
        if values.len() != self.label_keys.len() {
            return Err(TelemetryError::LabelArity {
                name: self.name.clone(),
                expected: self.label_keys.len(),
                actual: values.len(),
            });
        }

        let key: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        if let Some(counter) = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Ok(counter.clone());
        }

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(counter) = entries.get(&key) {
            return Ok(counter.clone());
        }
        let inner = self.vec.get_metric_with_label_values(values)?;
        let labels = self
            .label_keys
            .iter()
            .cloned()
            .zip(key.iter().cloned())
            .collect();
        let counter = Counter::from_parts(inner, labels);
        entries.insert(key, counter.clone());
        Ok(counter)
    }

    pub fn add(&self, values: &[&str], delta: u64) -> Result<(), TelemetryError> {
        self.counter(values)?.add(delta);
        Ok(())
    }

    /// Point-in-time copy of every entry; order is unspecified
    pub fn entries(&self) -> Vec<Counter> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }
}

impl std::fmt::Debug for CounterMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CounterMap")
            .field("name", &self.name)
            .field("label_keys", &self.label_keys)
            .field("entries", &self.entries())
            .finish()
    }
}

/// Value held by a registered series
#[derive(Debug, Clone)]
pub enum MetricValue {
    Counter(Counter),
    CounterMap(Arc<CounterMap>),
    /// Informational text (build version and the like); not exportable as a point
    Text(String),
}

impl MetricValue {
    pub fn kind(&self) -> &'static str {
        match self {
            MetricValue::Counter(_) => "counter",
            MetricValue::CounterMap(_) => "counter_map",
            MetricValue::Text(_) => "text",
        }
    }
}

/// Named entry of a telemetry snapshot
#[derive(Debug, Clone)]
pub struct Series {
    pub name: String,
    pub value: MetricValue,
}

impl Series {
    pub fn new(name: impl Into<String>, value: MetricValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Prometheus-safe rendering of a series name (`a-b/c.d` -> `a_b_c_d`)
pub fn collector_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_accumulates() {
        let counter = Counter::new("stackdriver-nozzle/test", "test").unwrap();
        counter.increment();
        counter.add(4);
        assert_eq!(counter.value(), 5);
        assert!(counter.labels().is_empty());
    }

    #[test]
    fn test_counter_map_entries_carry_labels() {
        let map = CounterMap::new("events", "test", &["event_type"]).unwrap();
        map.add(&["LogMessage"], 2).unwrap();
        map.add(&["Error"], 1).unwrap();
        map.add(&["LogMessage"], 1).unwrap();

        let mut entries = map.entries();
        entries.sort_by_key(|c| c.value());
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].labels()["event_type"], "Error");
        assert_eq!(entries[1].labels()["event_type"], "LogMessage");
        assert_eq!(entries[1].value(), 3);
    }

    #[test]
    fn test_counter_map_rejects_wrong_arity() {
        let map = CounterMap::new("events", "test", &["a", "b"]).unwrap();
        let err = map.counter(&["only-one"]).unwrap_err();
        assert!(matches!(
            err,
            TelemetryError::LabelArity {
                expected: 2,
                actual: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_collector_name() {
        assert_eq!(
            collector_name("stackdriver-nozzle/firehose.events"),
            "stackdriver_nozzle_firehose_events"
        );
    }
}
