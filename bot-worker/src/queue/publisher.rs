//! Async RabbitMQ publisher for enqueueing dictionary jobs.
//!
//! The publisher maintains a persistent connection and channel to
//! RabbitMQ, reconnecting lazily on failure, and can be cloned cheaply
//! into handler state.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use lapin::{
    options::{BasicPublishOptions, QueueDeclareOptions},
    types::FieldTable,
    BasicProperties, Channel, Connection, ConnectionProperties,
};
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::types::{DictionaryJob, DICTIONARY_QUEUE};

/// Anything that can enqueue a dictionary job.
///
/// The web handlers depend on this trait rather than on the concrete
/// broker client, so command dispatch can be tested without RabbitMQ.
#[async_trait]
pub trait Enqueue: Send + Sync {
    async fn enqueue(&self, job: &DictionaryJob) -> Result<()>;
}

/// Async RabbitMQ publisher with connection management.
#[derive(Clone)]
pub struct Publisher {
    inner: Arc<PublisherInner>,
}

struct PublisherInner {
    url: String,
    connection: RwLock<Option<Connection>>,
    channel: RwLock<Option<Channel>>,
}

impl Publisher {
    /// Create a new publisher with the given RabbitMQ URL.
    pub fn new(url: String) -> Self {
        Self {
            inner: Arc::new(PublisherInner {
                url,
                connection: RwLock::new(None),
                channel: RwLock::new(None),
            }),
        }
    }

    /// Ensure we have a valid connection and channel.
    async fn ensure_connected(&self) -> Result<Channel> {
        // Check if we have a valid channel
        {
            let channel = self.inner.channel.read().await;
            if let Some(ch) = channel.as_ref() {
                if ch.status().connected() {
                    return Ok(ch.clone());
                }
            }
        }

        // Need to reconnect
        let mut connection = self.inner.connection.write().await;
        let mut channel = self.inner.channel.write().await;

        // Double-check after acquiring write lock
        if let Some(ch) = channel.as_ref() {
            if ch.status().connected() {
                return Ok(ch.clone());
            }
        }

        info!("rabbitmq_publisher_connecting");

        let conn = Connection::connect(&self.inner.url, ConnectionProperties::default())
            .await
            .context("Failed to connect to RabbitMQ")?;

        info!("rabbitmq_publisher_connected");

        let ch = conn
            .create_channel()
            .await
            .context("Failed to create channel")?;

        // Declare the queue (idempotent operation)
        ch.queue_declare(
            DICTIONARY_QUEUE,
            QueueDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await
        .context("Failed to declare dictionary queue")?;

        info!(queue = DICTIONARY_QUEUE, "rabbitmq_queue_declared");

        *connection = Some(conn);
        *channel = Some(ch.clone());

        Ok(ch)
    }

    /// Close the connection gracefully.
    pub async fn close(&self) {
        let mut connection = self.inner.connection.write().await;
        let mut channel = self.inner.channel.write().await;

        if let Some(ch) = channel.take() {
            if let Err(e) = ch.close(200, "Normal shutdown").await {
                warn!(error = %e, "rabbitmq_channel_close_error");
            }
        }

        if let Some(conn) = connection.take() {
            if let Err(e) = conn.close(200, "Normal shutdown").await {
                warn!(error = %e, "rabbitmq_connection_close_error");
            }
        }

        info!("rabbitmq_publisher_closed");
    }
}

#[async_trait]
impl Enqueue for Publisher {
    /// Publish a dictionary job to the dictionary_jobs queue.
    async fn enqueue(&self, job: &DictionaryJob) -> Result<()> {
        let channel = self.ensure_connected().await?;

        let body = serde_json::to_vec(job).context("Failed to serialize job")?;

        // Message id ties queue-side diagnostics back to the request.
        let message_id = format!("dic-{}-{}", job.user_id, job.enqueued_at.timestamp_millis());

        channel
            .basic_publish(
                "",
                DICTIONARY_QUEUE,
                BasicPublishOptions::default(),
                &body,
                BasicProperties::default()
                    .with_delivery_mode(2) // Persistent
                    .with_content_type("application/json".into())
                    .with_message_id(message_id.clone().into()),
            )
            .await
            .context("Failed to publish to dictionary queue")?
            .await
            .context("Failed to confirm publish")?;

        info!(
            queue = DICTIONARY_QUEUE,
            message_id = %message_id,
            user_id = %job.user_id,
            body_length = body.len(),
            "rabbitmq_job_published"
        );

        Ok(())
    }
}
