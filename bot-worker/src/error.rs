//! Tagged error type for dictionary job processing.
//!
//! Every failure inside the worker pipeline carries an explicit category,
//! set at the point of failure. The per-record handler maps each category
//! to a distinct user-facing apology instead of inspecting message text.

use thiserror::Error;

/// Errors raised while processing a single dictionary job.
#[derive(Debug, Error)]
pub enum JobError {
    /// The dictionary host answered with a non-success status or the
    /// transfer failed mid-stream.
    #[error("dictionary download failed (status {status:?}): {detail}")]
    Download {
        /// HTTP status if the server answered at all.
        status: Option<u16>,
        detail: String,
    },

    /// The download did not complete within the configured deadline.
    #[error("dictionary download timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The downloaded archive contained no entries.
    #[error("dictionary archive is empty")]
    EmptyArchive,

    /// The archive could not be opened or the extracted text could not
    /// be decoded.
    #[error("dictionary decode failed: {0}")]
    Decode(String),

    /// An expected local artifact was missing.
    #[error("missing file: {0}")]
    MissingFile(String),

    /// An allocation-size guard tripped while transcoding.
    #[error("out of memory while transcoding dictionary")]
    OutOfMemory,

    /// Local resources (disk, file handles) were exhausted.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// A follow-up call to Discord was rejected.
    #[error("follow-up delivery failed (status {status}): {body}")]
    Delivery { status: u16, body: String },

    /// Anything that does not fit the categories above.
    #[error("internal error: {0}")]
    Internal(String),
}

impl JobError {
    /// User-facing apology for this error category.
    ///
    /// Category-specific wording is part of the operability contract:
    /// users (and operators reading screenshots) can tell a timeout from
    /// a missing upstream file.
    pub fn user_message(&self) -> String {
        match self {
            JobError::Download { status: Some(404), .. } => {
                "The dictionary file was not found on the upstream server. \
                 Please try again later."
                    .to_string()
            }
            JobError::Download { .. } => {
                "Failed to download the dictionary data. Please try again later.".to_string()
            }
            JobError::Timeout { .. } => {
                "Dictionary processing timed out. Please try again later.".to_string()
            }
            JobError::EmptyArchive => {
                "The dictionary archive was empty. Please try again later.".to_string()
            }
            JobError::Decode(_) => {
                "The dictionary data could not be decoded. Please try again later.".to_string()
            }
            JobError::MissingFile(_) => {
                "A dictionary file went missing during processing. Please try again later."
                    .to_string()
            }
            JobError::OutOfMemory => {
                "The dictionary was too large to process. Please try again later.".to_string()
            }
            JobError::ResourceExhausted(_) => {
                "The worker ran out of resources while processing. Please try again later."
                    .to_string()
            }
            JobError::Delivery { .. } => {
                "Processing finished but the result could not be delivered.".to_string()
            }
            JobError::Internal(_) => {
                "Error fetching dictionary data. Please try again later.".to_string()
            }
        }
    }
}

impl From<std::io::Error> for JobError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound => JobError::MissingFile(e.to_string()),
            std::io::ErrorKind::OutOfMemory => JobError::OutOfMemory,
            _ => JobError::ResourceExhausted(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_download_has_distinct_wording() {
        let not_found = JobError::Download {
            status: Some(404),
            detail: "not found".to_string(),
        };
        let server_error = JobError::Download {
            status: Some(500),
            detail: "boom".to_string(),
        };
        assert!(not_found.user_message().contains("not found"));
        assert_ne!(not_found.user_message(), server_error.user_message());
    }

    #[test]
    fn test_categories_have_distinct_messages() {
        let timeout = JobError::Timeout { timeout_ms: 60000 };
        let oom = JobError::OutOfMemory;
        let missing = JobError::MissingFile("dic.txt".to_string());
        assert_ne!(timeout.user_message(), oom.user_message());
        assert_ne!(oom.user_message(), missing.user_message());
        assert_ne!(timeout.user_message(), missing.user_message());
    }

    #[test]
    fn test_io_error_mapping() {
        let nf = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert!(matches!(JobError::from(nf), JobError::MissingFile(_)));

        let full = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        assert!(matches!(JobError::from(full), JobError::ResourceExhausted(_)));
    }
}
