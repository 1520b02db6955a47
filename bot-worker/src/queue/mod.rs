//! Queue module for RabbitMQ operations.
//!
//! ```text
//! Web Server → dictionary_jobs queue → Worker
//! ```

pub mod publisher;
pub mod types;

pub use publisher::{Enqueue, Publisher};
pub use types::{DictionaryJob, QueueRecord, DICTIONARY_QUEUE};
