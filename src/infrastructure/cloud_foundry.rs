use crate::domain::app_info::AppMetadata;
use crate::domain::errors::BackendError;
use crate::domain::ports::AppInfoSource;
use crate::infrastructure::core::{HttpClientFactory, check_status};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use url::Url;

// ===== Cloud Controller v2 payloads (inline-relations-depth=2) =====

#[derive(Debug, Default, Deserialize)]
struct Metadata {
    #[serde(default)]
    guid: String,
}

#[derive(Debug, Default, Deserialize)]
struct OrgEntity {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct OrgResource {
    #[serde(default)]
    metadata: Metadata,
    #[serde(default)]
    entity: OrgEntity,
}

#[derive(Debug, Default, Deserialize)]
struct SpaceEntity {
    #[serde(default)]
    name: String,
    #[serde(default)]
    organization: OrgResource,
}

#[derive(Debug, Default, Deserialize)]
struct SpaceResource {
    #[serde(default)]
    metadata: Metadata,
    #[serde(default)]
    entity: SpaceEntity,
}

#[derive(Debug, Deserialize)]
struct AppEntity {
    name: String,
    #[serde(default)]
    space: SpaceResource,
}

#[derive(Debug, Deserialize)]
struct AppResource {
    entity: AppEntity,
}

impl From<AppResource> for AppMetadata {
    fn from(app: AppResource) -> Self {
        let space = app.entity.space;
        let org = space.entity.organization;
        AppMetadata {
            name: app.entity.name,
            space_guid: space.metadata.guid,
            space_name: space.entity.name,
            org_guid: org.metadata.guid,
            org_name: org.entity.name,
        }
    }
}

/// Application lookups against the Cloud Controller API
pub struct CloudControllerClient {
    client: Client,
    api_url: Url,
}

impl CloudControllerClient {
    pub fn new(api_url: &str, access_token: &str, timeout_seconds: u64) -> Result<Self> {
        let api_url =
            Url::parse(api_url).with_context(|| format!("Invalid CF_API_URL: {}", api_url))?;
        Ok(Self {
            client: HttpClientFactory::create_client(timeout_seconds, access_token),
            api_url,
        })
    }

    /// The guid is untrusted envelope data and always lands in a single path segment
    fn app_url(&self, guid: &str) -> Result<Url> {
        if matches!(guid, "" | "." | "..") {
            return Err(BackendError::AppNotFound {
                guid: guid.to_string(),
            }
            .into());
        }

        let mut url = self.api_url.clone();
        url.set_query(None);
        url.set_fragment(None);
        url.path_segments_mut()
            .map_err(|_| anyhow!("CF_API_URL cannot be a base: {}", self.api_url))?
            .clear()
            .extend(["v2", "apps", guid]);
        url.query_pairs_mut().append_pair("inline-relations-depth", "2");
        Ok(url)
    }
}

#[async_trait]
impl AppInfoSource for CloudControllerClient {
    async fn app_by_guid(&self, guid: &str) -> Result<AppMetadata> {
        let url = self.app_url(guid)?;
        let response = self.client.get(url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(BackendError::AppNotFound {
                guid: guid.to_string(),
            }
            .into());
        }
        let response = check_status(response, "apps.get").await?;
        let app: AppResource = response
            .json()
            .await
            .with_context(|| format!("Failed to decode app {}", guid))?;
        Ok(app.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_url() {
        let client = CloudControllerClient::new("https://api.sys.example.com", "", 5).unwrap();
        assert_eq!(
            client.app_url("abc-123").unwrap().as_str(),
            "https://api.sys.example.com/v2/apps/abc-123?inline-relations-depth=2"
        );
    }

    #[test]
    fn test_app_url_escapes_guid() {
        let client = CloudControllerClient::new("https://api.sys.example.com/", "", 5).unwrap();
        let url = client.app_url("a?b#c/../d").unwrap();

        assert_eq!(url.path(), "/v2/apps/a%3Fb%23c%2F..%2Fd");
        assert_eq!(url.query(), Some("inline-relations-depth=2"));
        assert_eq!(url.fragment(), None);
        assert_eq!(url.host_str(), Some("api.sys.example.com"));
    }

    #[test]
    fn test_app_url_rejects_dot_segments() {
        let client = CloudControllerClient::new("https://api.sys.example.com", "", 5).unwrap();
        for guid in ["", ".", ".."] {
            let err = client.app_url(guid).unwrap_err();
            assert!(matches!(
                err.downcast_ref::<BackendError>(),
                Some(BackendError::AppNotFound { .. })
            ));
        }
    }

    #[test]
    fn test_invalid_api_url() {
        assert!(CloudControllerClient::new("not a url", "", 5).is_err());
    }

    #[test]
    fn test_inline_relations_decoded() {
        let json = r#"{
            "metadata": {"guid": "app-guid"},
            "entity": {
                "name": "web",
                "space": {
                    "metadata": {"guid": "space-guid"},
                    "entity": {
                        "name": "prod",
                        "organization": {
                            "metadata": {"guid": "org-guid"},
                            "entity": {"name": "acme"}
                        }
                    }
                }
            }
        }"#;
        let app: AppResource = serde_json::from_str(json).unwrap();
        let metadata = AppMetadata::from(app);
        assert_eq!(metadata.name, "web");
        assert_eq!(metadata.space_guid, "space-guid");
        assert_eq!(metadata.space_name, "prod");
        assert_eq!(metadata.org_guid, "org-guid");
        assert_eq!(metadata.org_name, "acme");
    }
}
