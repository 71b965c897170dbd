use crate::domain::monitoring::{
    CreateMetricDescriptorRequest, CreateTimeSeriesRequest, ListMetricDescriptorsRequest,
    MetricDescriptor,
};
use crate::domain::ports::MetricClient;
use crate::infrastructure::core::{HttpClientFactory, send_checked};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListMetricDescriptorsResponse {
    #[serde(default)]
    metric_descriptors: Vec<MetricDescriptor>,
    #[serde(default)]
    next_page_token: String,
}

/// Cloud Monitoring v3 REST client
pub struct CloudMonitoringClient {
    client: Client,
    endpoint: String,
}

impl CloudMonitoringClient {
    pub fn new(endpoint: &str, access_token: &str, timeout_seconds: u64) -> Self {
        Self {
            client: HttpClientFactory::create_client(timeout_seconds, access_token),
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, name: &str, collection: &str) -> String {
        format!("{}/v3/{}/{}", self.endpoint, name, collection)
    }
}

#[async_trait]
impl MetricClient for CloudMonitoringClient {
    async fn list_metric_descriptors(
        &self,
        request: &ListMetricDescriptorsRequest,
    ) -> Result<Vec<MetricDescriptor>> {
        let url = self.url(&request.name, "metricDescriptors");
        let mut descriptors = Vec::new();
        let mut page_token = String::new();

        loop {
            let mut query = vec![("filter", request.filter.as_str())];
            if !page_token.is_empty() {
                query.push(("pageToken", page_token.as_str()));
            }
            let response = send_checked(
                self.client.get(&url).query(&query),
                "metricDescriptors.list",
            )
            .await?;
            let page: ListMetricDescriptorsResponse = response
                .json()
                .await
                .context("Failed to decode metricDescriptors.list response")?;

            descriptors.extend(page.metric_descriptors);
            if page.next_page_token.is_empty() {
                break;
            }
            page_token = page.next_page_token;
        }

        Ok(descriptors)
    }

    async fn create_metric_descriptor(
        &self,
        request: &CreateMetricDescriptorRequest,
    ) -> Result<()> {
        let url = self.url(&request.name, "metricDescriptors");
        send_checked(
            self.client.post(&url).json(&request.metric_descriptor),
            "metricDescriptors.create",
        )
        .await?;
        Ok(())
    }

    async fn post(&self, request: &CreateTimeSeriesRequest) -> Result<()> {
        let url = self.url(&request.name, "timeSeries");
        send_checked(self.client.post(&url).json(request), "timeSeries.create").await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_urls() {
        let client = CloudMonitoringClient::new("https://monitoring.googleapis.com/", "", 5);
        assert_eq!(
            client.url("projects/p", "timeSeries"),
            "https://monitoring.googleapis.com/v3/projects/p/timeSeries"
        );
    }

    #[test]
    fn test_list_response_paging_fields() {
        let json = r#"{"metricDescriptors":[{"name":"projects/p/metricDescriptors/custom.googleapis.com/a",
            "type":"custom.googleapis.com/a","metricKind":"CUMULATIVE","valueType":"INT64"}],
            "nextPageToken":"t2"}"#;
        let page: ListMetricDescriptorsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(page.metric_descriptors.len(), 1);
        assert_eq!(page.next_page_token, "t2");

        let empty: ListMetricDescriptorsResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.metric_descriptors.is_empty());
    }
}
