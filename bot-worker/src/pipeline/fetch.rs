//! Dictionary archive download.
//!
//! Streams the HTTP response body straight to a scratch file so the
//! archive never has to fit in memory, and wraps the whole transfer in
//! an explicit deadline so a stalled upstream is reported as a timeout
//! rather than a generic network error.

use std::path::Path;
use std::time::Duration;

use futures::StreamExt;
use reqwest::Client;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::error::JobError;

/// Download `url` to `dest`.
///
/// Returns the response `Content-Type`, if the server sent one. A
/// non-2xx status is a hard `Download` failure; exceeding `timeout` is a
/// distinct `Timeout` failure. Partial files are removed on every
/// failure path.
pub async fn fetch_archive(
    client: &Client,
    url: &str,
    dest: &Path,
    timeout: Duration,
) -> Result<Option<String>, JobError> {
    let timeout_ms = timeout.as_millis() as u64;

    let result = tokio::time::timeout(timeout, fetch_inner(client, url, dest)).await;

    match result {
        Ok(Ok(content_type)) => Ok(content_type),
        Ok(Err(e)) => {
            remove_partial(dest).await;
            Err(e)
        }
        Err(_) => {
            warn!(url = %url, timeout_ms = timeout_ms, "dictionary_download_timeout");
            remove_partial(dest).await;
            Err(JobError::Timeout { timeout_ms })
        }
    }
}

async fn fetch_inner(client: &Client, url: &str, dest: &Path) -> Result<Option<String>, JobError> {
    let response = client.get(url).send().await.map_err(|e| JobError::Download {
        status: None,
        detail: e.to_string(),
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(JobError::Download {
            status: Some(status.as_u16()),
            detail: "unexpected status from dictionary host".to_string(),
        });
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    let mut file = File::create(dest).await?;
    let mut stream = response.bytes_stream();
    let mut total: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| JobError::Download {
            status: None,
            detail: format!("transfer interrupted: {e}"),
        })?;
        total += chunk.len() as u64;
        file.write_all(&chunk).await?;
    }

    file.flush().await?;

    info!(
        url = %url,
        bytes = total,
        content_type = ?content_type,
        "dictionary_download_complete"
    );

    Ok(content_type)
}

async fn remove_partial(dest: &Path) {
    if let Err(e) = tokio::fs::remove_file(dest).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %dest.display(), error = %e, "dictionary_partial_cleanup_failed");
        }
    }
}
