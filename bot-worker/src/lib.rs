//! dicbot - Discord dictionary bot backend.
//!
//! This library provides shared modules for the two dicbot binaries:
//! - `dicbot-web`: Thin web server for the Discord interactions endpoint
//! - `dicbot-worker`: Queue consumer running the dictionary pipeline
//!
//! ## Architecture
//!
//! ```text
//! Discord → Web Server → dictionary_jobs → Worker → Discord follow-ups
//! ```

pub mod config;
pub mod consumer;
pub mod dedup;
pub mod error;
pub mod followup;
pub mod pipeline;
pub mod processor;
pub mod queue;
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use dedup::DedupSet;
pub use error::JobError;
pub use followup::FollowupClient;
pub use queue::{DictionaryJob, Enqueue, Publisher, QueueRecord, DICTIONARY_QUEUE};
pub use web::AppState;
