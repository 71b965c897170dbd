use crate::domain::log::LogRecord;
use crate::domain::monitoring::MonitoredResource;
use crate::domain::ports::LogAdapter;
use crate::infrastructure::core::{HttpClientFactory, send_checked};
use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LogEntry<'a> {
    json_payload: &'a Map<String, Value>,
    labels: &'a HashMap<String, String>,
    severity: crate::domain::log::Severity,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WriteLogEntriesRequest<'a> {
    log_name: &'a str,
    resource: &'a MonitoredResource,
    entries: Vec<LogEntry<'a>>,
}

/// Cloud Logging `entries:write`, one entry per call
pub struct CloudLoggingAdapter {
    client: Client,
    endpoint: String,
    log_name: String,
    resource: MonitoredResource,
}

impl CloudLoggingAdapter {
    pub fn new(
        endpoint: &str,
        project_id: &str,
        log_name: &str,
        access_token: &str,
        timeout_seconds: u64,
        resource: MonitoredResource,
    ) -> Self {
        Self {
            client: HttpClientFactory::create_client(timeout_seconds, access_token),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            log_name: format!("projects/{}/logs/{}", project_id, log_name),
            resource,
        }
    }

    pub fn log_name(&self) -> &str {
        &self.log_name
    }

    fn write_request<'a>(&'a self, log: &'a LogRecord) -> WriteLogEntriesRequest<'a> {
        WriteLogEntriesRequest {
            log_name: &self.log_name,
            resource: &self.resource,
            entries: vec![LogEntry {
                json_payload: &log.payload,
                labels: &log.labels,
                severity: log.severity,
            }],
        }
    }
}

#[async_trait]
impl LogAdapter for CloudLoggingAdapter {
    async fn post_log(&self, log: LogRecord) -> Result<()> {
        let body = self.write_request(&log);
        let url = format!("{}/v2/entries:write", self.endpoint);
        send_checked(self.client.post(&url).json(&body), "entries:write").await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::log::Severity;

    #[test]
    fn test_write_request_shape() {
        let mut payload = Map::new();
        payload.insert("message".to_string(), Value::String("hi".to_string()));
        let labels = HashMap::from([("origin".to_string(), "rep".to_string())]);
        let resource = MonitoredResource::global();
        let body = WriteLogEntriesRequest {
            log_name: "projects/p/logs/cf_logs",
            resource: &resource,
            entries: vec![LogEntry {
                json_payload: &payload,
                labels: &labels,
                severity: Severity::Error,
            }],
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["logName"], "projects/p/logs/cf_logs");
        assert_eq!(json["resource"]["type"], "global");
        assert_eq!(json["entries"][0]["jsonPayload"]["message"], "hi");
        assert_eq!(json["entries"][0]["severity"], "ERROR");
        assert_eq!(json["entries"][0]["labels"]["origin"], "rep");
    }

    fn adapter(resource: MonitoredResource) -> CloudLoggingAdapter {
        CloudLoggingAdapter::new("https://logging.googleapis.com/", "p", "cf_logs", "", 5, resource)
    }

    #[test]
    fn test_log_name() {
        assert_eq!(
            adapter(MonitoredResource::global()).log_name(),
            "projects/p/logs/cf_logs"
        );
    }

    #[test]
    fn test_entries_carry_detected_resource() {
        let adapter = adapter(MonitoredResource::gce_instance("p", "123", "us-east1-b"));
        let log = LogRecord {
            payload: Map::new(),
            labels: HashMap::new(),
            severity: Severity::Default,
        };

        let json = serde_json::to_value(adapter.write_request(&log)).unwrap();
        assert_eq!(json["resource"]["type"], "gce_instance");
        assert_eq!(json["resource"]["labels"]["instance_id"], "123");
        assert_eq!(json["resource"]["labels"]["zone"], "us-east1-b");
    }
}
