//! RabbitMQ consumer for dictionary jobs.
//!
//! Connects to the broker, consumes from the dictionary_jobs queue, and
//! hands each delivery to the per-record processor. Records are handled
//! strictly one at a time (prefetch 1, no per-record task spawning):
//! follow-up ordering is part of the contract and artifact work is
//! heavy enough that fan-out buys nothing.

use std::sync::Arc;

use anyhow::{Context, Result};
use futures::StreamExt;
use lapin::{
    message::Delivery,
    options::{BasicAckOptions, BasicConsumeOptions, BasicQosOptions, QueueDeclareOptions},
    types::{AMQPValue, FieldTable},
    Connection, ConnectionProperties,
};
use reqwest::Client;
use tokio::signal;
use tracing::{error, info, warn};

use crate::dedup::DedupSet;
use crate::pipeline::select_codec;
use crate::queue::{QueueRecord, DICTIONARY_QUEUE};
use crate::{processor, Config};

/// How many delivery keys the dedup set remembers.
const DEDUP_CAPACITY: usize = 1024;

/// Run the dictionary job consumer until shutdown.
///
/// This function:
/// 1. Connects to RabbitMQ and declares the queue (idempotent)
/// 2. Sets prefetch to 1 so records arrive strictly sequentially
/// 3. Selects the dictionary codec once, by capability probe
/// 4. Processes each record inline and acknowledges it
/// 5. Handles graceful shutdown on SIGINT/SIGTERM
pub async fn run(config: Config) -> Result<()> {
    let config = Arc::new(config);

    info!(url_length = config.cloudamqp_url.len(), "rabbitmq_connecting");

    let conn = Connection::connect(&config.cloudamqp_url, ConnectionProperties::default())
        .await
        .context("Failed to connect to RabbitMQ")?;

    info!("rabbitmq_connected");

    let channel = conn
        .create_channel()
        .await
        .context("Failed to create channel")?;

    // Sequential processing is a contract, not a tuning choice.
    channel
        .basic_qos(1, BasicQosOptions::default())
        .await
        .context("Failed to set QoS")?;

    channel
        .queue_declare(
            DICTIONARY_QUEUE,
            QueueDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await
        .context("Failed to declare queue")?;

    info!(queue = DICTIONARY_QUEUE, "rabbitmq_queue_declared");

    let client = Client::builder()
        .build()
        .context("Failed to create HTTP client")?;

    let codec = select_codec();
    let mut dedup = DedupSet::new(DEDUP_CAPACITY);

    let mut consumer = channel
        .basic_consume(
            DICTIONARY_QUEUE,
            "dicbot-worker",
            BasicConsumeOptions::default(),
            FieldTable::default(),
        )
        .await
        .context("Failed to start consumer")?;

    info!(queue = DICTIONARY_QUEUE, "rabbitmq_consumer_started");
    info!("worker_ready");

    // Create shutdown signal future
    let shutdown = async {
        let ctrl_c = async {
            signal::ctrl_c()
                .await
                .expect("Failed to install Ctrl+C handler");
        };

        #[cfg(unix)]
        let terminate = async {
            signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("Failed to install SIGTERM handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => info!("Received SIGINT"),
            _ = terminate => info!("Received SIGTERM"),
        }
    };

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("worker_stopping");
                break;
            }
            delivery = consumer.next() => {
                match delivery {
                    Some(Ok(delivery)) => {
                        let delivery_tag = delivery.delivery_tag;
                        let record = record_from_delivery(&delivery);

                        // Processed inline: per-record failures are
                        // handled (and reported to the user) inside the
                        // processor, so the delivery is always acked.
                        processor::process_record(
                            &client,
                            &config,
                            codec.as_ref(),
                            &mut dedup,
                            &record,
                        )
                        .await;

                        if let Err(e) = channel
                            .basic_ack(delivery_tag, BasicAckOptions::default())
                            .await
                        {
                            error!(
                                delivery_tag = delivery_tag,
                                error = %e,
                                "rabbitmq_ack_failed"
                            );
                        }
                    }
                    Some(Err(e)) => {
                        error!(error = %e, "rabbitmq_delivery_error");
                    }
                    None => {
                        warn!("rabbitmq_consumer_closed");
                        break;
                    }
                }
            }
        }
    }

    info!("worker_shutdown_complete");
    Ok(())
}

/// Map a broker delivery onto the transport-neutral record shape.
fn record_from_delivery(delivery: &Delivery) -> QueueRecord {
    let message_id = delivery
        .properties
        .message_id()
        .as_ref()
        .map(|s| s.to_string())
        .unwrap_or_else(|| format!("tag-{}", delivery.delivery_tag));

    QueueRecord {
        message_id,
        receive_count: receive_count(delivery),
        body: delivery.data.clone(),
    }
}

/// Delivery count for this record, starting at 1 for the first attempt.
///
/// Quorum queues expose an `x-delivery-count` header counting prior
/// attempts; classic queues only expose the `redelivered` flag.
fn receive_count(delivery: &Delivery) -> u32 {
    let from_header = delivery
        .properties
        .headers()
        .as_ref()
        .and_then(|headers| {
            headers
                .inner()
                .iter()
                .find(|(key, _)| key.as_str() == "x-delivery-count")
                .map(|(_, value)| value)
        })
        .and_then(|value| match value {
            AMQPValue::LongLongInt(n) => u32::try_from(*n).ok(),
            AMQPValue::LongInt(n) => u32::try_from(*n).ok(),
            AMQPValue::LongUInt(n) => Some(*n),
            AMQPValue::ShortInt(n) => u32::try_from(*n).ok(),
            AMQPValue::ShortShortInt(n) => u32::try_from(*n).ok(),
            _ => None,
        });

    match from_header {
        Some(prior_attempts) => prior_attempts + 1,
        None if delivery.redelivered => 2,
        None => 1,
    }
}
