use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Descriptive metadata for one application, as cached by the nozzle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppInfo {
    pub app_name: String,
    pub space_guid: String,
    pub space_name: String,
    pub org_guid: String,
    pub org_name: String,
    /// When the metadata source was last asked; `None` for an unresolved app
    pub last_queried: Option<DateTime<Utc>>,
}

impl AppInfo {
    pub fn from_metadata(metadata: AppMetadata, queried_at: DateTime<Utc>) -> Self {
        Self {
            app_name: metadata.name,
            space_guid: metadata.space_guid,
            space_name: metadata.space_name,
            org_guid: metadata.org_guid,
            org_name: metadata.org_name,
            last_queried: Some(queried_at),
        }
    }

    /// `/<org>/<space>/<app>`, or `None` when the app was never resolved
    pub fn path(&self) -> Option<String> {
        if self.app_name.is_empty() {
            return None;
        }
        Some(format!(
            "/{}/{}/{}",
            self.org_name, self.space_name, self.app_name
        ))
    }
}

/// Result of a metadata lookup against the platform API
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppMetadata {
    pub name: String,
    pub space_guid: String,
    pub space_name: String,
    pub org_guid: String,
    pub org_name: String,
}
