use crate::domain::app_info::{AppInfo, AppMetadata};
use crate::domain::envelope::Envelope;
use crate::domain::log::LogRecord;
use crate::domain::monitoring::{
    CreateMetricDescriptorRequest, CreateTimeSeriesRequest, ListMetricDescriptorsRequest,
    MetricDescriptor,
};
use crate::domain::telemetry::Series;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Destination for translated log records
#[async_trait]
pub trait LogAdapter: Send + Sync {
    async fn post_log(&self, log: LogRecord) -> Result<()>;
}

/// Monitoring backend operations used by the metric reporter
#[async_trait]
pub trait MetricClient: Send + Sync {
    async fn list_metric_descriptors(
        &self,
        request: &ListMetricDescriptorsRequest,
    ) -> Result<Vec<MetricDescriptor>>;
    async fn create_metric_descriptor(&self, request: &CreateMetricDescriptorRequest)
    -> Result<()>;
    async fn post(&self, request: &CreateTimeSeriesRequest) -> Result<()>;
}

#[async_trait]
pub trait LabelMaker: Send + Sync {
    async fn log_labels(&self, envelope: &Envelope) -> HashMap<String, String>;
}

/// Slow platform lookup of an application's name, space and org
#[async_trait]
pub trait AppInfoSource: Send + Sync {
    async fn app_by_guid(&self, guid: &str) -> Result<AppMetadata>;
}

#[async_trait]
pub trait AppInfoRepository: Send + Sync {
    /// Never fails: unresolvable apps yield `AppInfo::default()`
    async fn get_app_info(&self, guid: &str) -> AppInfo;
}

/// Receiver of periodic telemetry snapshots
#[async_trait]
pub trait TelemetrySink: Send + Sync {
    async fn init(&self, registered: &[Series]);
    async fn report(&self, snapshot: &[Series]);
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
