use crate::domain::app_info::AppMetadata;
use crate::domain::errors::BackendError;
use crate::domain::log::LogRecord;
use crate::domain::monitoring::{
    CreateMetricDescriptorRequest, CreateTimeSeriesRequest, ListMetricDescriptorsRequest,
    MetricDescriptor,
};
use crate::domain::ports::{AppInfoSource, Clock, LogAdapter, MetricClient};
use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::RwLock;

/// Log adapter that keeps every record it is given
#[derive(Clone, Default)]
pub struct MockLogAdapter {
    records: Arc<RwLock<Vec<LogRecord>>>,
    fail: Arc<AtomicBool>,
}

impl MockLogAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every subsequent post fails after being recorded
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub async fn records(&self) -> Vec<LogRecord> {
        self.records.read().await.clone()
    }
}

#[async_trait]
impl LogAdapter for MockLogAdapter {
    async fn post_log(&self, log: LogRecord) -> Result<()> {
        self.records.write().await.push(log);
        if self.fail.load(Ordering::SeqCst) {
            bail!("mock log backend unavailable");
        }
        Ok(())
    }
}

/// In-memory monitoring backend.
///
/// Created descriptors show up in later list calls, so registering the same
/// series twice only creates them once.
#[derive(Clone, Default)]
pub struct MockMetricClient {
    descriptors: Arc<RwLock<Vec<MetricDescriptor>>>,
    list_requests: Arc<RwLock<Vec<ListMetricDescriptorsRequest>>>,
    create_requests: Arc<RwLock<Vec<CreateMetricDescriptorRequest>>>,
    posts: Arc<RwLock<Vec<CreateTimeSeriesRequest>>>,
    fail_list: Arc<AtomicBool>,
    fail_post_at: Arc<Mutex<Option<usize>>>,
    fail_create_at: Arc<Mutex<Option<usize>>>,
}

impl MockMetricClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_list_failing(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    /// Makes the post with this zero-based index fail (it is still recorded)
    pub fn fail_post_at(&self, index: Option<usize>) {
        *self.fail_post_at.lock().unwrap_or_else(PoisonError::into_inner) = index;
    }

    /// Makes the descriptor creation with this zero-based index fail (recorded, not stored)
    pub fn fail_create_at(&self, index: Option<usize>) {
        *self.fail_create_at.lock().unwrap_or_else(PoisonError::into_inner) = index;
    }

    pub async fn descriptors(&self) -> Vec<MetricDescriptor> {
        self.descriptors.read().await.clone()
    }

    pub async fn list_requests(&self) -> Vec<ListMetricDescriptorsRequest> {
        self.list_requests.read().await.clone()
    }

    pub async fn create_requests(&self) -> Vec<CreateMetricDescriptorRequest> {
        self.create_requests.read().await.clone()
    }

    pub async fn posts(&self) -> Vec<CreateTimeSeriesRequest> {
        self.posts.read().await.clone()
    }
}

#[async_trait]
impl MetricClient for MockMetricClient {
    async fn list_metric_descriptors(
        &self,
        request: &ListMetricDescriptorsRequest,
    ) -> Result<Vec<MetricDescriptor>> {
        self.list_requests.write().await.push(request.clone());
        if self.fail_list.load(Ordering::SeqCst) {
            bail!("mock metricDescriptors.list unavailable");
        }
        Ok(self.descriptors.read().await.clone())
    }

    async fn create_metric_descriptor(
        &self,
        request: &CreateMetricDescriptorRequest,
    ) -> Result<()> {
        let mut requests = self.create_requests.write().await;
        let index = requests.len();
        requests.push(request.clone());

        let fail_at = *self.fail_create_at.lock().unwrap_or_else(PoisonError::into_inner);
        if fail_at == Some(index) {
            return Err(BackendError::Status {
                endpoint: "metricDescriptors.create".to_string(),
                status: 503,
                body: "mock outage".to_string(),
            }
            .into());
        }
        self.descriptors
            .write()
            .await
            .push(request.metric_descriptor.clone());
        Ok(())
    }

    async fn post(&self, request: &CreateTimeSeriesRequest) -> Result<()> {
        let mut posts = self.posts.write().await;
        let index = posts.len();
        posts.push(request.clone());

        let fail_at = *self.fail_post_at.lock().unwrap_or_else(PoisonError::into_inner);
        if fail_at == Some(index) {
            return Err(BackendError::Status {
                endpoint: "timeSeries.create".to_string(),
                status: 503,
                body: "mock outage".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// Application metadata source backed by a map, counting every lookup
#[derive(Clone, Default)]
pub struct MockAppInfoSource {
    apps: Arc<RwLock<HashMap<String, AppMetadata>>>,
    calls: Arc<AtomicUsize>,
}

impl MockAppInfoSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, guid: &str, metadata: AppMetadata) {
        self.apps.write().await.insert(guid.to_string(), metadata);
    }

    pub async fn remove(&self, guid: &str) {
        self.apps.write().await.remove(guid);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AppInfoSource for MockAppInfoSource {
    async fn app_by_guid(&self, guid: &str) -> Result<AppMetadata> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.apps.read().await.get(guid) {
            Some(metadata) => Ok(metadata.clone()),
            None => Err(BackendError::AppNotFound {
                guid: guid.to_string(),
            }
            .into()),
        }
    }
}

/// Clock that only moves when told to
#[derive(Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, by: TimeDelta) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::monitoring::{MetricKind, ValueType};

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::default();
        let start = clock.now();
        clock.advance(TimeDelta::seconds(10));
        assert_eq!(clock.now() - start, TimeDelta::seconds(10));
    }

    #[tokio::test]
    async fn test_created_descriptors_are_listed() {
        let client = MockMetricClient::new();
        let request = ListMetricDescriptorsRequest {
            name: "projects/p".to_string(),
            filter: String::new(),
        };
        assert!(client.list_metric_descriptors(&request).await.unwrap().is_empty());

        client
            .create_metric_descriptor(&CreateMetricDescriptorRequest {
                name: "projects/p".to_string(),
                metric_descriptor: MetricDescriptor {
                    name: "projects/p/metricDescriptors/custom.googleapis.com/x".to_string(),
                    metric_type: "custom.googleapis.com/x".to_string(),
                    display_name: "x".to_string(),
                    description: String::new(),
                    labels: Vec::new(),
                    metric_kind: MetricKind::Cumulative,
                    value_type: ValueType::Int64,
                },
            })
            .await
            .unwrap();
        assert_eq!(client.list_metric_descriptors(&request).await.unwrap().len(), 1);
    }
}
