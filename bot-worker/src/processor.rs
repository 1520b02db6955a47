//! Per-record job processing.
//!
//! For each queue delivery: decide idempotently whether to process it,
//! run the dictionary pipeline in a fresh scratch directory, and report
//! the outcome through follow-up messages. One record's failure never
//! escapes this module; the consumer loop stays alive for the rest of
//! the batch.

use reqwest::Client;
use tracing::{error, info, warn};

use crate::dedup::DedupSet;
use crate::error::JobError;
use crate::followup::FollowupClient;
use crate::pipeline::{self, Artifact, DictionaryCodec};
use crate::queue::{DictionaryJob, QueueRecord};
use crate::Config;

/// Whether an artifact fits under the attachment ceiling.
///
/// The boundary is inclusive: a file of exactly `max_bytes` is still
/// delivered.
fn fits_attachment_limit(size: u64, max_bytes: u64) -> bool {
    size <= max_bytes
}

/// Process one queue record end to end.
///
/// Never returns an error: every failure is converted into a user-facing
/// follow-up message (or, failing even that, a log line). Dedup keys are
/// inserted *before* any side-effecting work starts.
pub async fn process_record(
    client: &Client,
    config: &Config,
    codec: &dyn DictionaryCodec,
    dedup: &mut DedupSet,
    record: &QueueRecord,
) {
    info!(
        message_id = %record.message_id,
        receive_count = record.receive_count,
        body_length = record.body.len(),
        "dictionary_record_received"
    );

    if dedup.contains(&record.message_id) {
        info!(
            message_id = %record.message_id,
            receive_count = record.receive_count,
            "dictionary_record_duplicate_delivery"
        );
        return;
    }

    let job: DictionaryJob = match serde_json::from_slice(&record.body) {
        Ok(job) => job,
        Err(e) => {
            error!(
                message_id = %record.message_id,
                error = %e,
                "dictionary_record_parse_failed"
            );
            return;
        }
    };

    let logical_key = job.logical_key();
    if dedup.contains(&logical_key) {
        info!(
            message_id = %record.message_id,
            user_id = %job.user_id,
            "dictionary_record_duplicate_request"
        );
        return;
    }

    // Marked as seen before any work begins, so a crash mid-processing
    // cannot turn a redelivery into a double-send.
    dedup.insert(&record.message_id);
    dedup.insert(&logical_key);

    info!(user_id = %job.user_id, "dictionary_job_start");

    let followup = FollowupClient::new(
        client.clone(),
        config.discord_api_base.clone(),
        std::time::Duration::from_millis(config.request_timeout_ms),
    );

    match run_job(client, config, codec, &followup, &job).await {
        Ok(()) => {
            info!(user_id = %job.user_id, "dictionary_job_complete");
        }
        Err(e) => {
            error!(
                user_id = %job.user_id,
                error = %e,
                "dictionary_job_failed"
            );
            if let Err(delivery_err) = followup
                .edit_original(&job.application_id, &job.token, &e.user_message())
                .await
            {
                error!(
                    user_id = %job.user_id,
                    error = %delivery_err,
                    "dictionary_failure_report_undeliverable"
                );
            }
        }
    }
}

/// Run the pipeline and deliver results, inside a per-job scratch dir.
async fn run_job(
    client: &Client,
    config: &Config,
    codec: &dyn DictionaryCodec,
    followup: &FollowupClient,
    job: &DictionaryJob,
) -> Result<(), JobError> {
    // Unique directory per record: concurrent or interleaved jobs can
    // never collide on artifact paths.
    let scratch = tempfile::tempdir()?;

    let result = run_job_in(scratch.path(), client, config, codec, followup, job).await;

    // Artifacts are removed on success and failure alike.
    if let Err(e) = scratch.close() {
        warn!(error = %e, "dictionary_scratch_cleanup_failed");
    }

    result
}

async fn run_job_in(
    scratch: &std::path::Path,
    client: &Client,
    config: &Config,
    codec: &dyn DictionaryCodec,
    followup: &FollowupClient,
    job: &DictionaryJob,
) -> Result<(), JobError> {
    let output = pipeline::run(client, config, codec, scratch).await?;

    // The size summary always goes out before any file delivery.
    let summary = size_summary(&output.content_type, &output.artifacts);
    followup
        .edit_original(&job.application_id, &job.token, &summary)
        .await?;

    for artifact in &output.artifacts {
        if !fits_attachment_limit(artifact.size, config.max_attachment_bytes) {
            warn!(
                label = artifact.label,
                size = artifact.size,
                limit = config.max_attachment_bytes,
                "dictionary_artifact_over_limit"
            );
            let notice = format!(
                "The {} file is too large to attach ({} bytes, limit {}).",
                artifact.label, artifact.size, config.max_attachment_bytes
            );
            if let Err(e) = followup
                .post_text(&job.application_id, &job.token, &notice)
                .await
            {
                error!(label = artifact.label, error = %e, "dictionary_limit_notice_failed");
            }
            continue;
        }

        let content = format!("Here is the {} file.", artifact.label);
        match followup
            .post_file(&job.application_id, &job.token, &content, &artifact.path)
            .await
        {
            Ok(()) => {
                info!(label = artifact.label, size = artifact.size, "dictionary_file_delivered");
            }
            Err(e) => {
                // One file's failure must not block the rest.
                error!(label = artifact.label, error = %e, "dictionary_file_delivery_failed");
                let fallback = format!(
                    "The {} file could not be delivered. {}",
                    artifact.label,
                    e.user_message()
                );
                if let Err(fallback_err) = followup
                    .post_text(&job.application_id, &job.token, &fallback)
                    .await
                {
                    error!(
                        label = artifact.label,
                        error = %fallback_err,
                        "dictionary_fallback_notice_failed"
                    );
                }
            }
        }
    }

    Ok(())
}

fn size_summary(content_type: &Option<String>, artifacts: &[Artifact]) -> String {
    let mut summary = format!(
        "Dictionary fetch completed!\nContent-Type: {}",
        content_type.as_deref().unwrap_or("unknown")
    );
    for artifact in artifacts {
        summary.push_str(&format!("\n{}: {} bytes", artifact.label, artifact.size));
    }
    summary
}
