//! Queue message types.
//!
//! One queue, one job type: `dictionary_jobs` carries requests from the
//! web server's `get-dictionary` command to the worker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Queue name for dictionary fetch jobs.
pub const DICTIONARY_QUEUE: &str = "dictionary_jobs";

/// A dictionary fetch job enqueued at command-dispatch time.
///
/// The job's lifecycle is the queue message's lifecycle: it is created
/// by the web server, delivered (possibly more than once) to the worker,
/// and has no storage of its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DictionaryJob {
    /// Discord application id, used to address follow-up webhooks
    pub application_id: String,
    /// Ephemeral interaction token for follow-up delivery
    pub token: String,
    /// Id of the invoking user
    pub user_id: String,
    /// When the command was dispatched (RFC 3339)
    #[serde(rename = "timestamp")]
    pub enqueued_at: DateTime<Utc>,
}

impl DictionaryJob {
    /// Create a job for the given interaction credentials, stamped now.
    pub fn new(application_id: String, token: String, user_id: String) -> Self {
        Self {
            application_id,
            token,
            user_id,
            enqueued_at: Utc::now(),
        }
    }

    /// Logical identity of this request, independent of queue redelivery.
    ///
    /// Two physical deliveries of the same enqueued job share this key.
    pub fn logical_key(&self) -> String {
        format!("{}:{}", self.user_id, self.enqueued_at.to_rfc3339())
    }
}

/// One physical delivery from the queue, as seen by the worker.
///
/// `message_id` is queue-assigned and unique per delivery attempt;
/// `receive_count` is incremented by the broker on redelivery. Both are
/// read-only metadata used for deduplication and diagnostics.
#[derive(Debug, Clone)]
pub struct QueueRecord {
    pub message_id: String,
    pub receive_count: u32,
    pub body: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_round_trip() {
        let job = DictionaryJob::new(
            "app-1".to_string(),
            "tok-1".to_string(),
            "user-1".to_string(),
        );

        let json = serde_json::to_string(&job).unwrap();
        assert!(json.contains("\"applicationId\""));
        assert!(json.contains("\"userId\""));
        assert!(json.contains("\"timestamp\""));

        let parsed: DictionaryJob = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.application_id, "app-1");
        assert_eq!(parsed.user_id, "user-1");
        assert_eq!(parsed.logical_key(), job.logical_key());
    }

    #[test]
    fn test_logical_key_distinguishes_users_and_times() {
        let a = DictionaryJob::new("app".into(), "tok".into(), "user-a".into());
        let mut b = a.clone();
        b.user_id = "user-b".to_string();
        assert_ne!(a.logical_key(), b.logical_key());

        let mut later = a.clone();
        later.enqueued_at = a.enqueued_at + chrono::Duration::seconds(1);
        assert_ne!(a.logical_key(), later.logical_key());
    }
}
