use crate::domain::envelope::Envelope;
use crate::domain::ports::{AppInfoRepository, LabelMaker};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Labels from the envelope header, enriched with the owning application's path
pub struct AppLabelMaker {
    foundation: String,
    app_info: Arc<dyn AppInfoRepository>,
}

impl AppLabelMaker {
    pub fn new(foundation: impl Into<String>, app_info: Arc<dyn AppInfoRepository>) -> Self {
        Self {
            foundation: foundation.into(),
            app_info,
        }
    }
}

fn insert_non_empty(labels: &mut HashMap<String, String>, key: &str, value: &str) {
    if !value.is_empty() {
        labels.insert(key.to_string(), value.to_string());
    }
}

#[async_trait]
impl LabelMaker for AppLabelMaker {
    async fn log_labels(&self, envelope: &Envelope) -> HashMap<String, String> {
        let mut labels = HashMap::new();
        insert_non_empty(&mut labels, "foundation", &self.foundation);
        insert_non_empty(&mut labels, "origin", &envelope.origin);
        insert_non_empty(&mut labels, "eventType", &envelope.event_type.to_string());
        insert_non_empty(&mut labels, "job", &envelope.job);
        insert_non_empty(&mut labels, "index", &envelope.index);
        insert_non_empty(&mut labels, "ip", &envelope.ip);

        if let Some(guid) = envelope.application_id() {
            let info = self.app_info.get_app_info(&guid).await;
            if let Some(path) = info.path() {
                labels.insert("applicationPath".to_string(), path);
            }
        }

        labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::app_info_cache::NullAppInfoRepository;
    use crate::domain::app_info::AppInfo;
    use crate::domain::envelope::{EventType, LogMessage, MessageType};

    struct KnownApp;

    #[async_trait]
    impl AppInfoRepository for KnownApp {
        async fn get_app_info(&self, guid: &str) -> AppInfo {
            if guid != "app-1" {
                return AppInfo::default();
            }
            AppInfo {
                app_name: "web".to_string(),
                space_name: "prod".to_string(),
                org_name: "acme".to_string(),
                ..Default::default()
            }
        }
    }

    #[tokio::test]
    async fn test_header_labels_skip_empty_values() {
        let maker = AppLabelMaker::new("", Arc::new(NullAppInfoRepository));
        let mut envelope = Envelope::new("gorouter", EventType::CounterEvent);
        envelope.job = "router".to_string();

        let labels = maker.log_labels(&envelope).await;
        assert_eq!(labels["origin"], "gorouter");
        assert_eq!(labels["eventType"], "CounterEvent");
        assert_eq!(labels["job"], "router");
        assert!(!labels.contains_key("foundation"));
        assert!(!labels.contains_key("ip"));
        assert!(!labels.contains_key("applicationPath"));
    }

    #[tokio::test]
    async fn test_application_path_from_metadata() {
        let maker = AppLabelMaker::new("cf-prod", Arc::new(KnownApp));
        let mut log = LogMessage::new("hello", MessageType::Out);
        log.app_id = "app-1".to_string();
        let envelope = Envelope::with_log_message("rep", log);

        let labels = maker.log_labels(&envelope).await;
        assert_eq!(labels["applicationPath"], "/acme/prod/web");
        assert_eq!(labels["foundation"], "cf-prod");
    }
}
