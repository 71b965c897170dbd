//! Pushes telemetry snapshots to the monitoring backend as cumulative time series.

use crate::domain::errors::ReportError;
use crate::domain::monitoring::{
    CreateMetricDescriptorRequest, CreateTimeSeriesRequest, LabelDescriptor,
    ListMetricDescriptorsRequest, Metric, MetricDescriptor, MetricKind, MonitoredResource, Point,
    TimeInterval, TimeSeries, TypedValue, ValueType,
};
use crate::domain::ports::{Clock, MetricClient, SystemClock, TelemetrySink};
use crate::domain::telemetry::{MetricValue, Series};
use crate::infrastructure::observability::metrics::NAMESPACE;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Hard per-request ceiling imposed by the backend
pub const MAX_TIME_SERIES: usize = 200;

const METRIC_TYPE_DOMAIN: &str = "custom.googleapis.com";

/// `custom.googleapis.com/<name>`
pub fn metric_descriptor_type(name: &str) -> String {
    format!("{}/{}", METRIC_TYPE_DOMAIN, name)
}

/// Entry labels overlaid onto a copy of the global labels; entry labels win
pub fn merge_labels(
    global: &HashMap<String, String>,
    entry: &HashMap<String, String>,
) -> HashMap<String, String> {
    let mut merged = global.clone();
    merged.extend(entry.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

pub struct MetricReporter {
    project_path: String,
    labels: HashMap<String, String>,
    resource: MonitoredResource,
    client: Arc<dyn MetricClient>,
    clock: Arc<dyn Clock>,
    start_time: DateTime<Utc>,
}

impl MetricReporter {
    pub fn new(
        client: Arc<dyn MetricClient>,
        project_id: &str,
        subscription_id: &str,
        foundation: &str,
        resource: MonitoredResource,
    ) -> Self {
        Self::with_clock(
            client,
            project_id,
            subscription_id,
            foundation,
            resource,
            Arc::new(SystemClock),
        )
    }

    pub fn with_clock(
        client: Arc<dyn MetricClient>,
        project_id: &str,
        subscription_id: &str,
        foundation: &str,
        resource: MonitoredResource,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let labels = HashMap::from([
            ("subscription_id".to_string(), subscription_id.to_string()),
            ("foundation".to_string(), foundation.to_string()),
        ]);
        let start_time = clock.now();
        Self {
            project_path: format!("projects/{}", project_id),
            labels,
            resource,
            client,
            clock,
            start_time,
        }
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn project_path(&self) -> &str {
        &self.project_path
    }

    /// `projects/<id>/metricDescriptors/custom.googleapis.com/<name>`
    pub fn metric_descriptor_name(&self, name: &str) -> String {
        format!(
            "{}/metricDescriptors/{}",
            self.project_path,
            metric_descriptor_type(name)
        )
    }

    /// Creates descriptors for every series the backend does not know yet.
    /// Returns how many creations were attempted.
    pub async fn register_descriptors(&self, registered: &[Series]) -> usize {
        let request = ListMetricDescriptorsRequest {
            name: self.project_path.clone(),
            filter: format!(
                r#"metric.type = starts_with("{}")"#,
                metric_descriptor_type(NAMESPACE)
            ),
        };

        let existing = match self.client.list_metric_descriptors(&request).await {
            Ok(descriptors) => descriptors,
            Err(e) => {
                error!(error = ?e, req = ?request, "metricReporter.ListMetricDescriptors failed");
                Vec::new()
            }
        };
        let known: HashSet<String> = existing.into_iter().map(|d| d.name).collect();

        let mut attempted = 0;
        for series in registered {
            // Text series never become points
            if matches!(series.value, MetricValue::Text(_)) {
                continue;
            }
            let name = self.metric_descriptor_name(&series.name);
            if known.contains(&name) {
                continue;
            }

            let request = CreateMetricDescriptorRequest {
                name: self.project_path.clone(),
                metric_descriptor: MetricDescriptor {
                    name,
                    metric_type: metric_descriptor_type(&series.name),
                    display_name: series.name.clone(),
                    description: "stackdriver-nozzle created custom metric.".to_string(),
                    labels: self.label_schema(&series.value),
                    metric_kind: MetricKind::Cumulative,
                    value_type: ValueType::Int64,
                },
            };
            attempted += 1;
            if let Err(e) = self.client.create_metric_descriptor(&request).await {
                error!(error = ?e, req = ?request, "metricReporter.CreateMetricDescriptor failed");
            } else {
                debug!(metric = %series.name, "metric descriptor created");
            }
        }
        attempted
    }

    fn label_schema(&self, value: &MetricValue) -> Vec<LabelDescriptor> {
        let mut global: Vec<&String> = self.labels.keys().collect();
        global.sort();
        let mut labels: Vec<LabelDescriptor> =
            global.into_iter().map(|k| LabelDescriptor::string(k.as_str())).collect();

        if let MetricValue::CounterMap(map) = value {
            // Duplicate label keys are rejected by the backend
            for key in map.label_keys() {
                if !self.labels.contains_key(key) {
                    labels.push(LabelDescriptor::string(key.as_str()));
                }
            }
        }
        labels
    }

    fn new_request(&self) -> CreateTimeSeriesRequest {
        CreateTimeSeriesRequest {
            name: self.project_path.clone(),
            time_series: Vec::with_capacity(MAX_TIME_SERIES),
        }
    }

    /// Sends the snapshot in batches of at most `MAX_TIME_SERIES`.
    /// Returns how many batches were submitted.
    pub async fn report_series(&self, snapshot: &[Series]) -> usize {
        // One interval for the whole call keeps the points cumulative from start_time
        let interval = TimeInterval {
            start_time: self.start_time,
            end_time: self.clock.now(),
        };

        let mut request = self.new_request();
        let mut submitted = 0;
        for data in snapshot {
            if matches!(data.value, MetricValue::Text(_)) {
                continue;
            }
            let series = match self.time_series(&interval, data) {
                Ok(series) => series,
                Err(e) => {
                    error!(error = %e, value = ?data.value, "metricReporter.timeSeries skipped");
                    continue;
                }
            };

            for point in series {
                request.time_series.push(point);
                if request.time_series.len() == MAX_TIME_SERIES {
                    let full = std::mem::replace(&mut request, self.new_request());
                    self.submit(&full).await;
                    submitted += 1;
                }
            }
        }

        if !request.time_series.is_empty() {
            self.submit(&request).await;
            submitted += 1;
        }
        submitted
    }

    async fn submit(&self, request: &CreateTimeSeriesRequest) {
        if let Err(e) = self.client.post(request).await {
            error!(error = ?e, req = ?request, "metricReporter.Report failed");
        }
    }

    fn time_series(
        &self,
        interval: &TimeInterval,
        data: &Series,
    ) -> Result<Vec<TimeSeries>, ReportError> {
        let metric_type = metric_descriptor_type(&data.name);
        match &data.value {
            MetricValue::Counter(counter) => Ok(vec![self.time_series_int(
                &metric_type,
                interval,
                self.labels.clone(),
                counter.value(),
            )]),
            MetricValue::CounterMap(map) => Ok(map
                .entries()
                .iter()
                .map(|counter| {
                    self.time_series_int(
                        &metric_type,
                        interval,
                        merge_labels(&self.labels, counter.labels()),
                        counter.value(),
                    )
                })
                .collect()),
            other => Err(ReportError::UnsupportedValue {
                name: data.name.clone(),
                kind: other.kind(),
            }),
        }
    }

    fn time_series_int(
        &self,
        metric_type: &str,
        interval: &TimeInterval,
        labels: HashMap<String, String>,
        value: i64,
    ) -> TimeSeries {
        TimeSeries {
            metric: Metric {
                metric_type: metric_type.to_string(),
                labels,
            },
            resource: self.resource.clone(),
            metric_kind: MetricKind::Cumulative,
            value_type: ValueType::Int64,
            points: vec![Point {
                interval: *interval,
                value: TypedValue { int64_value: value },
            }],
        }
    }
}

#[async_trait]
impl TelemetrySink for MetricReporter {
    async fn init(&self, registered: &[Series]) {
        let created = self.register_descriptors(registered).await;
        info!(created, total = registered.len(), "metric descriptors registered");
    }

    async fn report(&self, snapshot: &[Series]) {
        let batches = self.report_series(snapshot).await;
        debug!(batches, "telemetry reported");
    }
}
