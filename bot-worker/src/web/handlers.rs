//! Interaction endpoint handlers.
//!
//! The endpoint is designed to answer within Discord's few-second
//! budget: it verifies the signature, routes the command, and for the
//! long-running `get-dictionary` command enqueues a job and returns a
//! deferred response immediately. All heavy work happens in the worker.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::queue::{DictionaryJob, Enqueue};
use crate::web::interaction::{
    Interaction, InteractionResponse, INTERACTION_APPLICATION_COMMAND, INTERACTION_PING,
};
use crate::web::signature::verify_signature;
use crate::Config;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub enqueuer: Arc<dyn Enqueue>,
}

impl AppState {
    pub fn new(config: Config, enqueuer: Arc<dyn Enqueue>) -> Self {
        Self {
            config: Arc::new(config),
            enqueuer,
        }
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// Interactions
// =============================================================================

/// Discord interactions endpoint.
///
/// This handler:
/// 1. Verifies the Ed25519 request signature against the raw body
/// 2. Acknowledges handshake pings
/// 3. Dispatches slash commands, deferring the long-running one
pub async fn interactions(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let signature = header_str(&headers, "x-signature-ed25519");
    let timestamp = header_str(&headers, "x-signature-timestamp");

    let (status, response) = handle_interaction(
        &state.config,
        state.enqueuer.as_ref(),
        signature,
        timestamp,
        &body,
    )
    .await;

    (status, Json(response))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Verify, classify, and dispatch one inbound interaction.
///
/// Always produces exactly one response; there is no "no response" path.
/// Separated from the axum plumbing so it can be exercised directly in
/// tests.
pub async fn handle_interaction(
    config: &Config,
    enqueuer: &dyn Enqueue,
    signature: Option<&str>,
    timestamp: Option<&str>,
    body: &[u8],
) -> (StatusCode, Value) {
    let public_key = config.discord_public_key.as_deref().unwrap_or("");
    let verified = verify_signature(
        public_key,
        signature.unwrap_or(""),
        timestamp.unwrap_or(""),
        body,
    );

    if !verified {
        warn!(body_length = body.len(), "interaction_signature_invalid");
        return (
            StatusCode::UNAUTHORIZED,
            json!({"error": "Invalid signature"}),
        );
    }

    // The body is parsed only after the signature gate.
    let interaction: Interaction = match serde_json::from_slice(body) {
        Ok(i) => i,
        Err(e) => {
            warn!(error = %e, "interaction_body_malformed");
            return (
                StatusCode::BAD_REQUEST,
                json!({"error": "Unknown interaction type"}),
            );
        }
    };

    match interaction.interaction_type {
        INTERACTION_PING => {
            info!("interaction_handshake");
            respond(InteractionResponse::pong())
        }
        INTERACTION_APPLICATION_COMMAND => dispatch_command(&interaction, enqueuer).await,
        other => {
            warn!(interaction_type = other, "interaction_type_unknown");
            (
                StatusCode::BAD_REQUEST,
                json!({"error": "Unknown interaction type"}),
            )
        }
    }
}

/// Dispatch a slash command by name.
async fn dispatch_command(interaction: &Interaction, enqueuer: &dyn Enqueue) -> (StatusCode, Value) {
    let name = interaction
        .data
        .as_ref()
        .map(|d| d.name.as_str())
        .unwrap_or("");

    info!(command = %name, "interaction_command_received");

    match name {
        "ping" => respond(InteractionResponse::message("Pong! 🏓")),

        "hello" => {
            let username = interaction
                .invoking_user()
                .map(|u| u.username.as_str())
                .unwrap_or("there");
            respond(InteractionResponse::message(format!(
                "Hello, {username}! 👋"
            )))
        }

        "get-dictionary" => {
            let user_id = interaction
                .invoking_user()
                .map(|u| u.id.clone())
                .unwrap_or_default();

            let job = DictionaryJob::new(
                interaction.application_id.clone(),
                interaction.token.clone(),
                user_id,
            );

            match enqueuer.enqueue(&job).await {
                Ok(()) => {
                    info!(user_id = %job.user_id, "dictionary_job_enqueued");
                    respond(InteractionResponse::deferred())
                }
                Err(e) => {
                    // Transport faults stay on our side; the user gets an
                    // inline error instead of a 5xx.
                    error!(error = %e, user_id = %job.user_id, "dictionary_enqueue_failed");
                    respond(InteractionResponse::message(
                        "Failed to start dictionary fetch. Please try again later.",
                    ))
                }
            }
        }

        _ => {
            info!(command = %name, "interaction_command_unknown");
            respond(InteractionResponse::message("Unknown command"))
        }
    }
}

fn respond(response: InteractionResponse) -> (StatusCode, Value) {
    // Serialization of our own response types cannot fail.
    let value = serde_json::to_value(&response).unwrap_or(Value::Null);
    (StatusCode::OK, value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use ed25519_dalek::{Signer, SigningKey};
    use rand::rngs::OsRng;
    use tokio::sync::Mutex;

    struct RecordingEnqueuer {
        jobs: Mutex<Vec<DictionaryJob>>,
        fail: bool,
    }

    impl RecordingEnqueuer {
        fn new(fail: bool) -> Self {
            Self {
                jobs: Mutex::new(Vec::new()),
                fail,
            }
        }
    }

    #[async_trait]
    impl Enqueue for RecordingEnqueuer {
        async fn enqueue(&self, job: &DictionaryJob) -> anyhow::Result<()> {
            if self.fail {
                return Err(anyhow!("broker unavailable"));
            }
            self.jobs.lock().await.push(job.clone());
            Ok(())
        }
    }

    struct Signed {
        config: Config,
        signature: String,
        timestamp: String,
        body: Vec<u8>,
    }

    fn sign_body(body: &[u8]) -> Signed {
        let signing_key = SigningKey::generate(&mut OsRng);
        let timestamp = "1700000000".to_string();

        let mut message = timestamp.as_bytes().to_vec();
        message.extend_from_slice(body);
        let signature = hex::encode(signing_key.sign(&message).to_bytes());

        let mut config = Config::from_env();
        config.discord_public_key = Some(hex::encode(signing_key.verifying_key().to_bytes()));

        Signed {
            config,
            signature,
            timestamp,
            body: body.to_vec(),
        }
    }

    async fn run(signed: &Signed, enqueuer: &dyn Enqueue) -> (StatusCode, Value) {
        handle_interaction(
            &signed.config,
            enqueuer,
            Some(&signed.signature),
            Some(&signed.timestamp),
            &signed.body,
        )
        .await
    }

    #[tokio::test]
    async fn test_invalid_signature_is_401_and_body_never_parsed() {
        let enqueuer = RecordingEnqueuer::new(false);
        let config = Config::from_env();

        // Body is not even valid JSON; the gate must trip first.
        let (status, value) =
            handle_interaction(&config, &enqueuer, Some("ab"), Some("1"), b"not json").await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(value, json!({"error": "Invalid signature"}));
        assert!(enqueuer.jobs.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_handshake_acknowledged() {
        let signed = sign_body(br#"{"type":1}"#);
        let enqueuer = RecordingEnqueuer::new(false);

        let (status, value) = run(&signed, &enqueuer).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(value, json!({"type": 1}));
    }

    #[tokio::test]
    async fn test_ping_command() {
        let signed = sign_body(br#"{"type":2,"data":{"name":"ping"}}"#);
        let enqueuer = RecordingEnqueuer::new(false);

        let (status, value) = run(&signed, &enqueuer).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(value, json!({"type": 4, "data": {"content": "Pong! 🏓"}}));
    }

    #[tokio::test]
    async fn test_hello_command_greets_member_user() {
        let signed = sign_body(
            br#"{"type":2,"data":{"name":"hello"},"member":{"user":{"id":"1","username":"alice"}}}"#,
        );
        let enqueuer = RecordingEnqueuer::new(false);

        let (_, value) = run(&signed, &enqueuer).await;

        assert_eq!(
            value,
            json!({"type": 4, "data": {"content": "Hello, alice! 👋"}})
        );
    }

    #[tokio::test]
    async fn test_unknown_command_is_200_message() {
        let signed = sign_body(br#"{"type":2,"data":{"name":"frobnicate"}}"#);
        let enqueuer = RecordingEnqueuer::new(false);

        let (status, value) = run(&signed, &enqueuer).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(value, json!({"type": 4, "data": {"content": "Unknown command"}}));
    }

    #[tokio::test]
    async fn test_get_dictionary_enqueues_and_defers() {
        let signed = sign_body(
            br#"{"type":2,"data":{"name":"get-dictionary"},"user":{"id":"42","username":"bob"},"application_id":"app-9","token":"tok-9"}"#,
        );
        let enqueuer = RecordingEnqueuer::new(false);

        let (status, value) = run(&signed, &enqueuer).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(value, json!({"type": 5}));

        let jobs = enqueuer.jobs.lock().await;
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].user_id, "42");
        assert_eq!(jobs[0].application_id, "app-9");
        assert_eq!(jobs[0].token, "tok-9");
    }

    #[tokio::test]
    async fn test_enqueue_failure_becomes_inline_error() {
        let signed = sign_body(
            br#"{"type":2,"data":{"name":"get-dictionary"},"user":{"id":"42","username":"bob"}}"#,
        );
        let enqueuer = RecordingEnqueuer::new(true);

        let (status, value) = run(&signed, &enqueuer).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["type"], json!(4));
        assert!(value["data"]["content"]
            .as_str()
            .unwrap()
            .contains("Failed to start"));
    }

    #[tokio::test]
    async fn test_unrecognized_type_is_400() {
        let signed = sign_body(br#"{"type":9}"#);
        let enqueuer = RecordingEnqueuer::new(false);

        let (status, _) = run(&signed, &enqueuer).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
