//! Discord interaction wire types.
//!
//! Only the fields this bot reads are modeled; Discord sends many more.

use serde::{Deserialize, Serialize};

/// Interaction type: handshake ping.
pub const INTERACTION_PING: u8 = 1;

/// Interaction type: slash command invocation.
pub const INTERACTION_APPLICATION_COMMAND: u8 = 2;

/// Response type: handshake acknowledgement.
pub const RESPONSE_PONG: u8 = 1;

/// Response type: immediate message with content.
pub const RESPONSE_CHANNEL_MESSAGE: u8 = 4;

/// Response type: deferred - a follow-up will arrive later.
pub const RESPONSE_DEFERRED: u8 = 5;

/// An inbound interaction payload.
#[derive(Debug, Clone, Deserialize)]
pub struct Interaction {
    #[serde(rename = "type")]
    pub interaction_type: u8,
    #[serde(default)]
    pub data: Option<InteractionData>,
    /// Present for interactions invoked inside a guild.
    #[serde(default)]
    pub member: Option<GuildMember>,
    /// Present for interactions invoked in a DM.
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub application_id: String,
    /// Ephemeral credential for follow-up delivery. Never logged.
    #[serde(default)]
    pub token: String,
}

impl Interaction {
    /// The invoking user, wherever Discord put it.
    pub fn invoking_user(&self) -> Option<&User> {
        self.member
            .as_ref()
            .map(|m| &m.user)
            .or(self.user.as_ref())
    }
}

/// Command payload of an application-command interaction.
#[derive(Debug, Clone, Deserialize)]
pub struct InteractionData {
    pub name: String,
}

/// Guild membership wrapper around the invoking user.
#[derive(Debug, Clone, Deserialize)]
pub struct GuildMember {
    pub user: User,
}

/// The invoking Discord user.
#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
}

/// Outbound interaction response body.
#[derive(Debug, Clone, Serialize)]
pub struct InteractionResponse {
    #[serde(rename = "type")]
    pub response_type: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ResponseData>,
}

/// Content payload of a channel-message response.
#[derive(Debug, Clone, Serialize)]
pub struct ResponseData {
    pub content: String,
}

impl InteractionResponse {
    /// `{type:1}` - handshake acknowledgement.
    pub fn pong() -> Self {
        Self {
            response_type: RESPONSE_PONG,
            data: None,
        }
    }

    /// `{type:4, data:{content}}` - immediate message.
    pub fn message(content: impl Into<String>) -> Self {
        Self {
            response_type: RESPONSE_CHANNEL_MESSAGE,
            data: Some(ResponseData {
                content: content.into(),
            }),
        }
    }

    /// `{type:5}` - deferred, a follow-up will arrive later.
    pub fn deferred() -> Self {
        Self {
            response_type: RESPONSE_DEFERRED,
            data: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interaction_deserialization_guild() {
        let json = r#"{
            "type": 2,
            "data": {"name": "get-dictionary"},
            "member": {"user": {"id": "42", "username": "alice"}},
            "application_id": "app-1",
            "token": "tok-1"
        }"#;

        let interaction: Interaction = serde_json::from_str(json).unwrap();
        assert_eq!(interaction.interaction_type, INTERACTION_APPLICATION_COMMAND);
        assert_eq!(interaction.data.as_ref().unwrap().name, "get-dictionary");
        assert_eq!(interaction.invoking_user().unwrap().username, "alice");
    }

    #[test]
    fn test_interaction_deserialization_dm() {
        let json = r#"{
            "type": 2,
            "data": {"name": "hello"},
            "user": {"id": "7", "username": "bob"},
            "application_id": "app-1",
            "token": "tok-1"
        }"#;

        let interaction: Interaction = serde_json::from_str(json).unwrap();
        assert_eq!(interaction.invoking_user().unwrap().id, "7");
    }

    #[test]
    fn test_handshake_deserialization_minimal() {
        let interaction: Interaction = serde_json::from_str(r#"{"type":1}"#).unwrap();
        assert_eq!(interaction.interaction_type, INTERACTION_PING);
        assert!(interaction.invoking_user().is_none());
    }

    #[test]
    fn test_response_serialization() {
        let pong = serde_json::to_value(InteractionResponse::pong()).unwrap();
        assert_eq!(pong, serde_json::json!({"type": 1}));

        let msg = serde_json::to_value(InteractionResponse::message("hi")).unwrap();
        assert_eq!(msg, serde_json::json!({"type": 4, "data": {"content": "hi"}}));

        let deferred = serde_json::to_value(InteractionResponse::deferred()).unwrap();
        assert_eq!(deferred, serde_json::json!({"type": 5}));
    }
}
