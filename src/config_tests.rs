use crate::config::Config;
use std::env;
use std::sync::Mutex;
use std::sync::OnceLock;

// Global lock to prevent race conditions when modifying environment variables in tests
static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

fn get_env_lock() -> &'static Mutex<()> {
    ENV_LOCK.get_or_init(|| Mutex::new(()))
}

const VARS: &[&str] = &[
    "GCP_PROJECT_ID",
    "SUBSCRIPTION_ID",
    "FOUNDATION_NAME",
    "NEWLINE_TOKEN",
    "TELEMETRY_INTERVAL_SECONDS",
    "GCP_ACCESS_TOKEN",
    "LOGGING_ENDPOINT",
    "MONITORING_ENDPOINT",
    "LOG_NAME",
    "HTTP_TIMEOUT_SECONDS",
    "CF_API_URL",
    "CF_ACCESS_TOKEN",
    "ENRICH_APP_METADATA",
    "APP_METADATA_CACHE_PERIOD",
];

fn clear_env() {
    for var in VARS {
        unsafe { env::remove_var(var) };
    }
}

#[test]
fn test_config_defaults() {
    let _guard = get_env_lock().lock().unwrap();
    clear_env();

    let config = Config::from_env().unwrap();

    assert_eq!(config.nozzle.subscription_id, "firehose-nozzle");
    assert_eq!(config.nozzle.foundation_name, "cf");
    assert!(config.nozzle.newline_token.is_empty());
    assert_eq!(config.nozzle.telemetry_interval_seconds, 60);
    assert_eq!(config.backend.log_name, "cf_logs");
    assert_eq!(config.backend.http_timeout_seconds, 30);
    assert_eq!(config.cloud_foundry.app_metadata_cache_period, 300);
    assert!(config.cloud_foundry.enrich_app_metadata);
    // No Cloud Controller configured
    assert!(!config.cloud_foundry.enrichment_enabled());
}

#[test]
fn test_config_from_env() {
    let _guard = get_env_lock().lock().unwrap();
    clear_env();
    unsafe {
        env::set_var("GCP_PROJECT_ID", "my-project");
        env::set_var("FOUNDATION_NAME", "prod-east");
        env::set_var("NEWLINE_TOKEN", "%%%");
        env::set_var("APP_METADATA_CACHE_PERIOD", "-1");
        env::set_var("CF_API_URL", "https://api.sys.example.com");
        env::set_var("GCP_ACCESS_TOKEN", "ya29.token");
    }

    let config = Config::from_env().unwrap();

    assert_eq!(config.nozzle.project_id, "my-project");
    assert_eq!(config.nozzle.foundation_name, "prod-east");
    assert_eq!(config.nozzle.newline_token, "%%%");
    assert_eq!(config.cloud_foundry.app_metadata_cache_period, -1);
    assert!(config.cloud_foundry.enrichment_enabled());
    assert!(config.validate().is_ok());

    clear_env();
}

#[test]
fn test_config_invalid_number() {
    let _guard = get_env_lock().lock().unwrap();
    clear_env();
    unsafe { env::set_var("APP_METADATA_CACHE_PERIOD", "five minutes") };

    let err = Config::from_env().unwrap_err();
    assert!(err.to_string().contains("APP_METADATA_CACHE_PERIOD"));

    clear_env();
}

#[test]
fn test_validate_requires_project() {
    let _guard = get_env_lock().lock().unwrap();
    clear_env();

    let config = Config::from_env().unwrap();
    assert!(config.validate().is_err());
}
