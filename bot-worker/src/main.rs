//! dicbot Worker - queue consumer for dictionary jobs.
//!
//! Consumes dictionary fetch jobs from the dictionary_jobs queue, runs
//! the download/extract/transcode pipeline, and reports results to the
//! requesting user via Discord webhook follow-ups.

use anyhow::Result;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use dicbot::{consumer, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    tracing::info!("worker_starting");

    // Load configuration from environment
    let config = Config::from_env();
    tracing::info!(
        cloudamqp_url_set = !config.cloudamqp_url.is_empty(),
        dictionary_url = %config.dictionary_url,
        download_timeout_ms = config.download_timeout_ms,
        max_attachment_bytes = config.max_attachment_bytes,
        "config_loaded"
    );

    // Start the consumer
    consumer::run(config).await?;

    Ok(())
}
