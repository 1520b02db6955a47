//! Discord webhook follow-up delivery.
//!
//! After the deferred interaction response, the worker talks back to the
//! user through the interaction's webhook:
//!
//! - `edit_original` PATCHes `/webhooks/{app}/{token}/messages/@original`
//!   (the first, summary message edits the deferred placeholder)
//! - `post_text` / `post_file` POST `/webhooks/{app}/{token}` as new
//!   follow-up messages, the file variant as multipart/form-data

use std::path::Path;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde_json::json;
use tracing::info;

use crate::error::JobError;

/// Client for the interaction's follow-up webhook endpoints.
#[derive(Clone)]
pub struct FollowupClient {
    client: Client,
    base: String,
    timeout: Duration,
}

impl FollowupClient {
    /// Create a client against the given Discord API base URL.
    pub fn new(client: Client, base: String, timeout: Duration) -> Self {
        Self {
            client,
            base: base.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    /// Edit the original (deferred) interaction response with text.
    pub async fn edit_original(
        &self,
        application_id: &str,
        token: &str,
        content: &str,
    ) -> Result<(), JobError> {
        let url = format!(
            "{}/webhooks/{}/{}/messages/@original",
            self.base, application_id, token
        );

        let response = self
            .client
            .patch(&url)
            .timeout(self.timeout)
            .json(&json!({ "content": content }))
            .send()
            .await
            .map_err(|e| JobError::Internal(format!("follow-up request failed: {e}")))?;

        ensure_success(response).await?;

        info!(content_length = content.len(), "followup_text_sent");
        Ok(())
    }

    /// Post a new text follow-up message.
    pub async fn post_text(
        &self,
        application_id: &str,
        token: &str,
        content: &str,
    ) -> Result<(), JobError> {
        let url = format!("{}/webhooks/{}/{}", self.base, application_id, token);

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(&json!({ "content": content }))
            .send()
            .await
            .map_err(|e| JobError::Internal(format!("follow-up request failed: {e}")))?;

        ensure_success(response).await?;

        info!(content_length = content.len(), "followup_post_sent");
        Ok(())
    }

    /// Post a new follow-up message carrying one file attachment.
    ///
    /// Multipart body: a `content` text field plus a `files[0]` field
    /// with the file's base name and a generic binary content type.
    pub async fn post_file(
        &self,
        application_id: &str,
        token: &str,
        content: &str,
        file_path: &Path,
    ) -> Result<(), JobError> {
        let url = format!("{}/webhooks/{}/{}", self.base, application_id, token);

        let bytes = tokio::fs::read(file_path).await?;
        let file_name = file_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("attachment.bin")
            .to_string();

        let part = Part::bytes(bytes)
            .file_name(file_name.clone())
            .mime_str("application/octet-stream")
            .map_err(|e| JobError::Internal(format!("multipart build failed: {e}")))?;

        let form = Form::new()
            .text("content", content.to_string())
            .part("files[0]", part);

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .multipart(form)
            .send()
            .await
            .map_err(|e| JobError::Internal(format!("follow-up request failed: {e}")))?;

        ensure_success(response).await?;

        info!(file = %file_name, "followup_file_sent");
        Ok(())
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<(), JobError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }

    let body = response.text().await.unwrap_or_default();
    Err(JobError::Delivery {
        status: status.as_u16(),
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_edit_original_patches_json_content() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/webhooks/app-1/tok-1/messages/@original"))
            .and(body_json(json!({"content": "done"})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let followup = FollowupClient::new(Client::new(), server.uri(), Duration::from_secs(5));
        followup.edit_original("app-1", "tok-1", "done").await.unwrap();
    }

    #[tokio::test]
    async fn test_post_file_sends_multipart() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/webhooks/app-1/tok-1"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("dictionary.txt");
        tokio::fs::write(&file, b"payload").await.unwrap();

        let followup = FollowupClient::new(Client::new(), server.uri(), Duration::from_secs(5));
        followup
            .post_file("app-1", "tok-1", "here you go", &file)
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        let content_type = requests[0]
            .headers
            .get("content-type")
            .unwrap()
            .to_str()
            .unwrap();
        assert!(content_type.starts_with("multipart/form-data"));

        let body = String::from_utf8_lossy(&requests[0].body);
        assert!(body.contains("name=\"content\""));
        assert!(body.contains("name=\"files[0]\""));
        assert!(body.contains("filename=\"dictionary.txt\""));
        assert!(body.contains("payload"));
    }

    #[tokio::test]
    async fn test_non_success_is_delivery_error_with_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let followup = FollowupClient::new(Client::new(), server.uri(), Duration::from_secs(5));
        let err = followup
            .edit_original("app-1", "tok-1", "x")
            .await
            .unwrap_err();

        match err {
            JobError::Delivery { status, body } => {
                assert_eq!(status, 429);
                assert_eq!(body, "rate limited");
            }
            other => panic!("expected Delivery, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_file_is_missing_file_error() {
        let server = MockServer::start().await;
        let followup = FollowupClient::new(Client::new(), server.uri(), Duration::from_secs(5));
        let err = followup
            .post_file("app", "tok", "x", Path::new("/nonexistent/file.txt"))
            .await
            .unwrap_err();
        assert!(matches!(err, JobError::MissingFile(_)));
    }
}
