use crate::domain::monitoring::MonitoredResource;
use anyhow::Result;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

pub const METADATA_HOST: &str = "http://metadata.google.internal";

/// Probes the GCE metadata server once; anything short of a full answer means `global`
pub async fn detect_monitored_resource(metadata_host: &str) -> MonitoredResource {
    let client = match Client::builder().timeout(Duration::from_secs(2)).build() {
        Ok(client) => client,
        Err(_) => return MonitoredResource::global(),
    };

    match query_instance(&client, metadata_host).await {
        Ok(resource) => {
            info!(labels = ?resource.labels, "running on GCE, reporting as gce_instance");
            resource
        }
        Err(e) => {
            debug!(error = %e, "metadata server unavailable, reporting as global");
            MonitoredResource::global()
        }
    }
}

async fn query_instance(client: &Client, metadata_host: &str) -> Result<MonitoredResource> {
    let project_id = get(client, metadata_host, "project/project-id").await?;
    let instance_id = get(client, metadata_host, "instance/id").await?;
    let zone = zone_name(&get(client, metadata_host, "instance/zone").await?);
    Ok(MonitoredResource::gce_instance(&project_id, &instance_id, &zone))
}

async fn get(client: &Client, metadata_host: &str, suffix: &str) -> Result<String> {
    let url = format!(
        "{}/computeMetadata/v1/{}",
        metadata_host.trim_end_matches('/'),
        suffix
    );
    let response = client
        .get(&url)
        .header("Metadata-Flavor", "Google")
        .send()
        .await?
        .error_for_status()?;
    Ok(response.text().await?.trim().to_string())
}

/// The zone endpoint answers `projects/<num>/zones/<zone>`
fn zone_name(raw: &str) -> String {
    raw.rsplit('/').next().unwrap_or(raw).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zone_name() {
        assert_eq!(zone_name("projects/1234/zones/us-central1-a"), "us-central1-a");
        assert_eq!(zone_name("europe-west1-b"), "europe-west1-b");
    }

    #[tokio::test]
    async fn test_unreachable_metadata_is_global() {
        // Reserved TEST-NET address; the connection fails or times out.
        let resource = detect_monitored_resource("http://192.0.2.1:1").await;
        assert_eq!(resource, MonitoredResource::global());
    }
}
