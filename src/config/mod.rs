//! Configuration loaded from environment variables.
//!
//! Split by concern: nozzle identity, Google Cloud backends and the Cloud
//! Controller used for metadata enrichment.

mod backend_config;
mod cloud_foundry_config;
mod nozzle_config;

pub use backend_config::BackendEnvConfig;
pub use cloud_foundry_config::CloudFoundryEnvConfig;
pub use nozzle_config::NozzleEnvConfig;

use anyhow::{Result, bail};

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub nozzle: NozzleEnvConfig,
    pub backend: BackendEnvConfig,
    pub cloud_foundry: CloudFoundryEnvConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            nozzle: NozzleEnvConfig::from_env()?,
            backend: BackendEnvConfig::from_env()?,
            cloud_foundry: CloudFoundryEnvConfig::from_env()?,
        })
    }

    /// Settings a live run cannot do without
    pub fn validate(&self) -> Result<()> {
        if self.nozzle.project_id.is_empty() {
            bail!("GCP_PROJECT_ID must be set");
        }
        if self.backend.access_token.is_empty() {
            bail!("GCP_ACCESS_TOKEN must be set");
        }
        if self.nozzle.telemetry_interval_seconds == 0 {
            bail!("TELEMETRY_INTERVAL_SECONDS must be positive");
        }
        Ok(())
    }
}
