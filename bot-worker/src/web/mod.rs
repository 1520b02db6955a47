//! Web server module for the Discord interactions endpoint.
//!
//! This module provides a thin, fast web server that:
//! - Verifies interaction request signatures (Ed25519)
//! - Answers handshake pings and synchronous commands inline
//! - Enqueues the long-running dictionary command and defers the reply
//!
//! The dictionary work itself happens in the background worker.

pub mod handlers;
pub mod interaction;
pub mod signature;

pub use handlers::{handle_interaction, health, interactions, AppState, HealthResponse};
pub use interaction::{Interaction, InteractionResponse};
pub use signature::verify_signature;
