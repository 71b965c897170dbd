//! Monitoring backend model (descriptors, time series, requests).
//!
//! Serialized with the field names of the Cloud Monitoring v3 REST API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetricKind {
    Gauge,
    Delta,
    Cumulative,
    #[serde(other)]
    Unspecified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValueType {
    Bool,
    Int64,
    Double,
    String,
    Distribution,
    Money,
    #[serde(other)]
    Unspecified,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelDescriptor {
    pub key: String,
    #[serde(default = "string_value_type")]
    pub value_type: ValueType,
}

fn string_value_type() -> ValueType {
    ValueType::String
}

impl LabelDescriptor {
    pub fn string(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value_type: ValueType::String,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub metric_type: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub labels: Vec<LabelDescriptor>,
    #[serde(default = "unspecified_kind")]
    pub metric_kind: MetricKind,
    #[serde(default = "unspecified_value_type")]
    pub value_type: ValueType,
}

fn unspecified_kind() -> MetricKind {
    MetricKind::Unspecified
}

fn unspecified_value_type() -> ValueType {
    ValueType::Unspecified
}

/// Infrastructure tag attached to every reported point
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoredResource {
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub labels: HashMap<String, String>,
}

impl MonitoredResource {
    pub fn global() -> Self {
        Self {
            resource_type: "global".to_string(),
            labels: HashMap::new(),
        }
    }

    pub fn gce_instance(project_id: &str, instance_id: &str, zone: &str) -> Self {
        let labels = HashMap::from([
            ("project_id".to_string(), project_id.to_string()),
            ("instance_id".to_string(), instance_id.to_string()),
            ("zone".to_string(), zone.to_string()),
        ]);
        Self {
            resource_type: "gce_instance".to_string(),
            labels,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metric {
    #[serde(rename = "type")]
    pub metric_type: String,
    #[serde(default)]
    pub labels: HashMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeInterval {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// The REST encoding carries int64 values as decimal strings.
mod int64_string {
    use super::*;

    pub fn serialize<S: Serializer>(value: &i64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedValue {
    #[serde(with = "int64_string")]
    pub int64_value: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub interval: TimeInterval,
    pub value: TypedValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeries {
    pub metric: Metric,
    pub resource: MonitoredResource,
    pub metric_kind: MetricKind,
    pub value_type: ValueType,
    pub points: Vec<Point>,
}

impl TimeSeries {
    pub fn int64_value(&self) -> Option<i64> {
        self.points.first().map(|p| p.value.int64_value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListMetricDescriptorsRequest {
    pub name: String,
    pub filter: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateMetricDescriptorRequest {
    pub name: String,
    pub metric_descriptor: MetricDescriptor,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTimeSeriesRequest {
    #[serde(skip)]
    pub name: String,
    pub time_series: Vec<TimeSeries>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_series_rest_encoding() {
        let now = Utc::now();
        let series = TimeSeries {
            metric: Metric {
                metric_type: "custom.googleapis.com/x".to_string(),
                labels: HashMap::new(),
            },
            resource: MonitoredResource::global(),
            metric_kind: MetricKind::Cumulative,
            value_type: ValueType::Int64,
            points: vec![Point {
                interval: TimeInterval {
                    start_time: now,
                    end_time: now,
                },
                value: TypedValue { int64_value: 7 },
            }],
        };

        let json = serde_json::to_value(&series).unwrap();
        assert_eq!(json["metricKind"], "CUMULATIVE");
        assert_eq!(json["valueType"], "INT64");
        assert_eq!(json["metric"]["type"], "custom.googleapis.com/x");
        assert_eq!(json["resource"]["type"], "global");
        assert_eq!(json["points"][0]["value"]["int64Value"], "7");
    }

    #[test]
    fn test_descriptor_tolerates_unknown_kinds() {
        let json = r#"{"name":"projects/p/metricDescriptors/a","type":"a",
            "metricKind":"METRIC_KIND_UNSPECIFIED","valueType":"DOUBLE"}"#;
        let descriptor: MetricDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(descriptor.metric_kind, MetricKind::Unspecified);
        assert_eq!(descriptor.value_type, ValueType::Double);
        assert!(descriptor.labels.is_empty());
    }
}
