//! Google Cloud endpoints and credentials.

use anyhow::{Context, Result};
use std::env;

#[derive(Debug, Clone)]
pub struct BackendEnvConfig {
    pub access_token: String,
    pub logging_endpoint: String,
    pub monitoring_endpoint: String,
    pub log_name: String,
    pub http_timeout_seconds: u64,
}

impl Default for BackendEnvConfig {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            logging_endpoint: "https://logging.googleapis.com".to_string(),
            monitoring_endpoint: "https://monitoring.googleapis.com".to_string(),
            log_name: "cf_logs".to_string(),
            http_timeout_seconds: 30,
        }
    }
}

impl BackendEnvConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            access_token: env::var("GCP_ACCESS_TOKEN").unwrap_or_default(),
            logging_endpoint: env::var("LOGGING_ENDPOINT")
                .unwrap_or_else(|_| "https://logging.googleapis.com".to_string()),
            monitoring_endpoint: env::var("MONITORING_ENDPOINT")
                .unwrap_or_else(|_| "https://monitoring.googleapis.com".to_string()),
            log_name: env::var("LOG_NAME").unwrap_or_else(|_| "cf_logs".to_string()),
            http_timeout_seconds: env::var("HTTP_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| "30".to_string())
                .parse::<u64>()
                .context("Failed to parse HTTP_TIMEOUT_SECONDS")?,
        })
    }
}
