//! Cloud Controller access for application metadata enrichment.

use anyhow::{Context, Result};
use std::env;

#[derive(Debug, Clone)]
pub struct CloudFoundryEnvConfig {
    pub api_url: String,
    pub access_token: String,
    pub enrich_app_metadata: bool,
    /// Seconds; `0` never caches, negative caches forever
    pub app_metadata_cache_period: i64,
}

impl Default for CloudFoundryEnvConfig {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            access_token: String::new(),
            enrich_app_metadata: true,
            app_metadata_cache_period: 300,
        }
    }
}

impl CloudFoundryEnvConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            api_url: env::var("CF_API_URL").unwrap_or_default(),
            access_token: env::var("CF_ACCESS_TOKEN").unwrap_or_default(),
            enrich_app_metadata: env::var("ENRICH_APP_METADATA")
                .unwrap_or_else(|_| "true".to_string())
                .parse::<bool>()
                .context("Failed to parse ENRICH_APP_METADATA")?,
            app_metadata_cache_period: env::var("APP_METADATA_CACHE_PERIOD")
                .unwrap_or_else(|_| "300".to_string())
                .parse::<i64>()
                .context("Failed to parse APP_METADATA_CACHE_PERIOD")?,
        })
    }

    /// Enrichment needs both the switch and somewhere to ask
    pub fn enrichment_enabled(&self) -> bool {
        self.enrich_app_metadata && !self.api_url.is_empty()
    }
}
