use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

use crate::application::app_info_cache::{AppInfoCache, NullAppInfoRepository};
use crate::application::label_maker::AppLabelMaker;
use crate::application::log_sink::{EnvelopeTranslator, LogSink, LogSinkMetrics};
use crate::application::metric_reporter::MetricReporter;
use crate::config::Config;
use crate::domain::envelope::Envelope;
use crate::domain::monitoring::MonitoredResource;
use crate::domain::ports::{
    AppInfoRepository, AppInfoSource, LogAdapter, MetricClient, TelemetrySink,
};
use crate::infrastructure::cloud_foundry::CloudControllerClient;
use crate::infrastructure::gcp::{
    CloudLoggingAdapter, CloudMonitoringClient, detect_monitored_resource,
    metadata::METADATA_HOST,
};
use crate::infrastructure::observability::{
    LogTelemetrySink, TelemetryRegistry, TelemetryReporter,
};
use crate::infrastructure::stdout::StdoutLogAdapter;

/// Backend seams the pipeline is assembled from
pub struct NozzleParts {
    pub log_adapter: Arc<dyn LogAdapter>,
    /// `None` keeps telemetry on stdout only
    pub metric_client: Option<Arc<dyn MetricClient>>,
    /// `None` turns metadata enrichment off
    pub app_info_source: Option<Arc<dyn AppInfoSource>>,
    pub resource: MonitoredResource,
}

/// The assembled envelope pipeline plus its telemetry
pub struct Nozzle {
    pub config: Config,
    pub registry: TelemetryRegistry,
    pub log_sink: Arc<LogSink>,
    pub app_info: Arc<dyn AppInfoRepository>,
    telemetry_sinks: Vec<Arc<dyn TelemetrySink>>,
}

impl Nozzle {
    /// Builds against the real backends, or stdout-only ones for a dry run
    pub async fn build(config: Config, dry_run: bool) -> Result<Self> {
        info!(
            foundation = %config.nozzle.foundation_name,
            dry_run,
            "Building firehose nozzle..."
        );

        let app_info_source: Option<Arc<dyn AppInfoSource>> =
            if config.cloud_foundry.enrichment_enabled() {
                info!(api = %config.cloud_foundry.api_url, "Using Cloud Controller for app metadata");
                Some(Arc::new(CloudControllerClient::new(
                    &config.cloud_foundry.api_url,
                    &config.cloud_foundry.access_token,
                    config.backend.http_timeout_seconds,
                )?))
            } else {
                info!("App metadata enrichment disabled");
                None
            };

        let parts = if dry_run {
            info!("Using stdout log adapter and telemetry (dry run)");
            NozzleParts {
                log_adapter: Arc::new(StdoutLogAdapter::new()),
                metric_client: None,
                app_info_source,
                resource: MonitoredResource::global(),
            }
        } else {
            config.validate()?;
            let backend = &config.backend;
            info!(
                logging = %backend.logging_endpoint,
                monitoring = %backend.monitoring_endpoint,
                "Using Google Cloud backends"
            );
            let resource = detect_monitored_resource(METADATA_HOST).await;
            NozzleParts {
                log_adapter: Arc::new(CloudLoggingAdapter::new(
                    &backend.logging_endpoint,
                    &config.nozzle.project_id,
                    &backend.log_name,
                    &backend.access_token,
                    backend.http_timeout_seconds,
                    resource.clone(),
                )),
                metric_client: Some(Arc::new(CloudMonitoringClient::new(
                    &backend.monitoring_endpoint,
                    &backend.access_token,
                    backend.http_timeout_seconds,
                ))),
                app_info_source,
                resource,
            }
        };

        Self::from_parts(config, parts)
    }

    pub fn from_parts(config: Config, parts: NozzleParts) -> Result<Self> {
        let registry = TelemetryRegistry::new();
        registry
            .register_text("version", env!("CARGO_PKG_VERSION"))
            .context("Failed to register version")?;
        let metrics =
            LogSinkMetrics::register(&registry).context("Failed to register log sink counters")?;

        let app_info: Arc<dyn AppInfoRepository> = match parts.app_info_source {
            Some(source) => Arc::new(AppInfoCache::new(
                source,
                config.cloud_foundry.app_metadata_cache_period,
            )),
            None => Arc::new(NullAppInfoRepository),
        };

        let label_maker = Arc::new(AppLabelMaker::new(
            config.nozzle.foundation_name.clone(),
            app_info.clone(),
        ));
        let translator = EnvelopeTranslator::new(label_maker, config.nozzle.newline_token.clone());
        let log_sink = Arc::new(LogSink::new(translator, parts.log_adapter, metrics));

        let mut telemetry_sinks: Vec<Arc<dyn TelemetrySink>> =
            vec![Arc::new(LogTelemetrySink::new())];
        if let Some(client) = parts.metric_client {
            telemetry_sinks.push(Arc::new(MetricReporter::new(
                client,
                &config.nozzle.project_id,
                &config.nozzle.subscription_id,
                &config.nozzle.foundation_name,
                parts.resource,
            )));
        }

        Ok(Self {
            config,
            registry,
            log_sink,
            app_info,
            telemetry_sinks,
        })
    }

    /// Periodic reporter over this nozzle's registry and sinks
    pub fn telemetry_reporter(&self) -> TelemetryReporter {
        self.telemetry_sinks.iter().fold(
            TelemetryReporter::new(
                self.registry.clone(),
                self.config.nozzle.telemetry_interval_seconds,
            ),
            |reporter, sink| reporter.with_sink(sink.clone()),
        )
    }

    /// Feeds every envelope to the log sink until the channel closes.
    /// Returns how many items were received.
    pub async fn run(&self, mut envelopes: mpsc::Receiver<Option<Envelope>>) -> u64 {
        let mut received = 0;
        while let Some(envelope) = envelopes.recv().await {
            received += 1;
            self.log_sink.receive(envelope).await;
        }
        info!(received, "envelope stream closed");
        received
    }
}
