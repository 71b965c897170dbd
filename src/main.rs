//! firehose-nozzle: platform envelopes to Google Cloud Logging and Monitoring
//!
//! Reads newline-delimited JSON envelopes from stdin (or `--input`), posts one log
//! entry per envelope and pushes the nozzle's own counters on a fixed interval.
//!
//! # Usage
//! ```sh
//! GCP_PROJECT_ID=my-project GCP_ACCESS_TOKEN=... firehose-nozzle < envelopes.ndjson
//! firehose-nozzle --dry-run --input envelopes.ndjson
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use firehose_nozzle::application::system::Nozzle;
use firehose_nozzle::config::Config;
use firehose_nozzle::infrastructure::spawn_envelope_reader;
use std::path::PathBuf;
use tokio::io::BufReader;
use tokio::sync::watch;
use tracing::{Level, debug, info, warn};
use tracing_subscriber::prelude::*;

const ENVELOPE_BUFFER: usize = 1024;

#[derive(Parser, Debug)]
#[command(author, version, about = "Platform event stream to Google Cloud nozzle", long_about = None)]
struct Cli {
    /// Newline-delimited JSON envelopes; stdin when omitted
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Print records and telemetry to stdout instead of calling Google Cloud
    #[arg(long)]
    dry_run: bool,

    /// Emit the nozzle's own logs as JSON
    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(json: bool) {
    let filter =
        tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into());
    let registry = tracing_subscriber::registry().with(filter);

    // stdout belongs to dry-run records and telemetry lines
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .pretty()
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    info!("firehose-nozzle {} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    info!(
        "Configuration loaded: Foundation={}, Project={}, CachePeriod={}s",
        config.nozzle.foundation_name,
        config.nozzle.project_id,
        config.cloud_foundry.app_metadata_cache_period
    );

    let nozzle = Nozzle::build(config, cli.dry_run).await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let reporter = tokio::spawn(nozzle.telemetry_reporter().run(shutdown_rx));

    let envelopes = match &cli.input {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open {}", path.display()))?;
            info!("Reading envelopes from {}", path.display());
            spawn_envelope_reader(BufReader::new(file), ENVELOPE_BUFFER)
        }
        None => {
            info!("Reading envelopes from stdin");
            spawn_envelope_reader(BufReader::new(tokio::io::stdin()), ENVELOPE_BUFFER)
        }
    };

    info!("Nozzle running. Press Ctrl+C to shutdown.");
    tokio::select! {
        received = nozzle.run(envelopes) => {
            info!(received, "Input exhausted. Shutting down...");
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("Shutdown signal received. Exiting...");
        }
    }

    // One final report flushes the counters gathered since the last tick
    let _ = shutdown_tx.send(true);
    if let Err(e) = reporter.await {
        warn!(error = %e, "telemetry reporter did not stop cleanly");
    }
    debug!(exposition = %nozzle.registry.render(), "final counters");

    Ok(())
}
