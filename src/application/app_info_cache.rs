use crate::domain::app_info::AppInfo;
use crate::domain::ports::{AppInfoRepository, AppInfoSource, Clock, SystemClock};
use async_trait::async_trait;
use chrono::TimeDelta;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Freshness policy for cached application metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePeriod {
    Disabled,
    Forever,
    Seconds(i64),
}

impl CachePeriod {
    /// `0` disables caching, negative values cache forever
    pub fn from_seconds(seconds: i64) -> Self {
        match seconds {
            0 => CachePeriod::Disabled,
            s if s < 0 => CachePeriod::Forever,
            s => CachePeriod::Seconds(s),
        }
    }
}

/// Application metadata lookups shielded by a time-boxed cache
pub struct AppInfoCache {
    source: Arc<dyn AppInfoSource>,
    cache: RwLock<HashMap<String, AppInfo>>,
    period: CachePeriod,
    clock: Arc<dyn Clock>,
}

impl AppInfoCache {
    pub fn new(source: Arc<dyn AppInfoSource>, cache_period_seconds: i64) -> Self {
        Self::with_clock(source, cache_period_seconds, Arc::new(SystemClock))
    }

    pub fn with_clock(
        source: Arc<dyn AppInfoSource>,
        cache_period_seconds: i64,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            source,
            cache: RwLock::new(HashMap::new()),
            period: CachePeriod::from_seconds(cache_period_seconds),
            clock,
        }
    }

    pub fn period(&self) -> CachePeriod {
        self.period
    }

    async fn cached(&self, guid: &str) -> Option<AppInfo> {
        let info = self.cache.read().await.get(guid).cloned()?;
        match self.period {
            CachePeriod::Disabled => None,
            CachePeriod::Forever => Some(info),
            CachePeriod::Seconds(seconds) => {
                let last_queried = info.last_queried?;
                let elapsed = self.clock.now().signed_duration_since(last_queried);
                // Windows beyond TimeDelta's range never expire
                TimeDelta::try_seconds(seconds)
                    .is_none_or(|window| elapsed < window)
                    .then_some(info)
            }
        }
    }

    /// Ask the metadata source directly and refresh the cache on success
    pub async fn query(&self, guid: &str) -> AppInfo {
        match self.source.app_by_guid(guid).await {
            Ok(metadata) => {
                let info = AppInfo::from_metadata(metadata, self.clock.now());
                if self.period != CachePeriod::Disabled {
                    self.cache
                        .write()
                        .await
                        .insert(guid.to_string(), info.clone());
                }
                info
            }
            Err(e) => {
                warn!(guid, error = ?e, "app metadata lookup failed");
                AppInfo::default()
            }
        }
    }
}

#[async_trait]
impl AppInfoRepository for AppInfoCache {
    async fn get_app_info(&self, guid: &str) -> AppInfo {
        if self.period != CachePeriod::Disabled {
            if let Some(info) = self.cached(guid).await {
                debug!(guid, "app metadata served from cache");
                return info;
            }
        }
        self.query(guid).await
    }
}

/// Repository used when metadata enrichment is turned off
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAppInfoRepository;

#[async_trait]
impl AppInfoRepository for NullAppInfoRepository {
    async fn get_app_info(&self, _guid: &str) -> AppInfo {
        AppInfo::default()
    }
}
