use chrono::{TimeDelta, TimeZone, Utc};
use firehose_nozzle::application::app_info_cache::{AppInfoCache, CachePeriod};
use firehose_nozzle::domain::app_info::{AppInfo, AppMetadata};
use firehose_nozzle::domain::ports::{AppInfoRepository, Clock};
use firehose_nozzle::infrastructure::mock::{ManualClock, MockAppInfoSource};
use std::sync::Arc;

const GUID: &str = "6d0ee6f0-0a5e-4a7b-8a3c-2a1a5c0f3e11";

fn metadata() -> AppMetadata {
    AppMetadata {
        name: "web".to_string(),
        space_guid: "space-guid".to_string(),
        space_name: "prod".to_string(),
        org_guid: "org-guid".to_string(),
        org_name: "acme".to_string(),
    }
}

async fn setup(period: i64) -> (AppInfoCache, MockAppInfoSource, ManualClock) {
    let source = MockAppInfoSource::new();
    source.insert(GUID, metadata()).await;
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap());
    let cache = AppInfoCache::with_clock(Arc::new(source.clone()), period, Arc::new(clock.clone()));
    (cache, source, clock)
}

#[tokio::test]
async fn test_positive_window_serves_cache_until_expiry() {
    let (cache, source, clock) = setup(10).await;
    assert_eq!(cache.period(), CachePeriod::Seconds(10));

    let first = cache.get_app_info(GUID).await;
    assert_eq!(first.app_name, "web");
    assert_eq!(first.last_queried, Some(clock.now()));
    assert_eq!(source.calls(), 1);

    clock.advance(TimeDelta::seconds(9));
    let cached = cache.get_app_info(GUID).await;
    assert_eq!(cached, first);
    assert_eq!(source.calls(), 1);

    clock.advance(TimeDelta::seconds(1));
    let refreshed = cache.get_app_info(GUID).await;
    assert_eq!(source.calls(), 2);
    assert_eq!(refreshed.last_queried, Some(clock.now()));
}

#[tokio::test]
async fn test_zero_window_always_queries() {
    let (cache, source, _clock) = setup(0).await;
    assert_eq!(cache.period(), CachePeriod::Disabled);

    for _ in 0..3 {
        assert_eq!(cache.get_app_info(GUID).await.app_name, "web");
    }
    assert_eq!(source.calls(), 3);
}

#[tokio::test]
async fn test_negative_window_caches_forever() {
    let (cache, source, clock) = setup(-1).await;

    cache.get_app_info(GUID).await;
    clock.advance(TimeDelta::days(365));
    let info = cache.get_app_info(GUID).await;

    assert_eq!(info.org_name, "acme");
    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn test_failed_lookup_is_not_cached() {
    let (cache, source, _clock) = setup(60).await;

    let missing = cache.get_app_info("unknown").await;
    assert_eq!(missing, AppInfo::default());
    assert!(missing.path().is_none());

    source.insert("unknown", metadata()).await;
    let found = cache.get_app_info("unknown").await;
    assert_eq!(found.app_name, "web");
    assert_eq!(source.calls(), 2);
}

#[tokio::test]
async fn test_failed_refresh_returns_default() {
    let (cache, source, clock) = setup(10).await;

    cache.get_app_info(GUID).await;
    source.remove(GUID).await;
    clock.advance(TimeDelta::seconds(11));

    assert_eq!(cache.get_app_info(GUID).await, AppInfo::default());
    assert_eq!(source.calls(), 2);
}

#[tokio::test]
async fn test_query_bypasses_cache() {
    let (cache, source, _clock) = setup(-1).await;

    cache.get_app_info(GUID).await;
    let info = cache.query(GUID).await;

    assert_eq!(info.path().as_deref(), Some("/acme/prod/web"));
    assert_eq!(source.calls(), 2);
}

#[tokio::test]
async fn test_huge_window_does_not_overflow() {
    let (cache, source, clock) = setup(i64::MAX).await;
    assert_eq!(cache.period(), CachePeriod::Seconds(i64::MAX));

    cache.get_app_info(GUID).await;
    clock.advance(TimeDelta::days(365));
    let info = cache.get_app_info(GUID).await;

    assert_eq!(info.app_name, "web");
    assert_eq!(source.calls(), 1);
}
