//! Nozzle identity and translation settings.

use anyhow::{Context, Result};
use std::env;

/// What the nozzle calls itself and how it shapes records
#[derive(Debug, Clone)]
pub struct NozzleEnvConfig {
    pub project_id: String,
    pub subscription_id: String,
    pub foundation_name: String,
    /// Replaced by `\n` in log message text; empty disables the substitution
    pub newline_token: String,
    pub telemetry_interval_seconds: u64,
}

impl Default for NozzleEnvConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            subscription_id: "firehose-nozzle".to_string(),
            foundation_name: "cf".to_string(),
            newline_token: String::new(),
            telemetry_interval_seconds: 60,
        }
    }
}

impl NozzleEnvConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            project_id: env::var("GCP_PROJECT_ID").unwrap_or_default(),
            subscription_id: env::var("SUBSCRIPTION_ID")
                .unwrap_or_else(|_| "firehose-nozzle".to_string()),
            foundation_name: env::var("FOUNDATION_NAME").unwrap_or_else(|_| "cf".to_string()),
            newline_token: env::var("NEWLINE_TOKEN").unwrap_or_default(),
            telemetry_interval_seconds: env::var("TELEMETRY_INTERVAL_SECONDS")
                .unwrap_or_else(|_| "60".to_string())
                .parse::<u64>()
                .context("Failed to parse TELEMETRY_INTERVAL_SECONDS")?,
        })
    }
}
