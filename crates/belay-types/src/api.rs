use serde::{Deserialize, Serialize};

use crate::models::{ChannelId, MessageId, MessageView, UserId};

// -- JWT Claims --

/// Bearer token claims. `sub` is the decimal id of the user the token speaks for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub username: String,
    pub iat: i64,
    pub exp: i64,
}

// -- Auth --

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

/// Shared by `credentials-check` and `create-user`. The optional fields are
/// only present on success.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl AuthResponse {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            user: None,
            id: None,
            token: None,
        }
    }
}

// -- Channels --

#[derive(Debug, Deserialize)]
pub struct CreateChannelRequest {
    #[serde(alias = "name")]
    pub channel_name: String,
}

// -- Messages --

#[derive(Debug, Deserialize)]
pub struct WriteMessageRequest {
    #[serde(alias = "body")]
    pub message_body: String,
    #[serde(alias = "author_id")]
    pub user_id: UserId,
    pub channel_id: ChannelId,
}

#[derive(Debug, Deserialize)]
pub struct WriteReplyRequest {
    #[serde(alias = "body")]
    pub reply_body: String,
    pub user_id: UserId,
    pub msg_id: MessageId,
}

/// `{success, message}` envelope returned by every write endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub success: bool,
    pub message: String,
}

impl StatusResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

pub const NO_MESSAGES_YET: &str = "no messages yet";
pub const UNDEFINED_CHANNEL: &str = "undefined channel";

/// Body of `get-messages`: either the timeline or a sentinel status string.
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimelineResponse {
    Messages(Vec<MessageView>),
    Sentinel { response: String },
}

impl TimelineResponse {
    pub fn sentinel(response: &str) -> Self {
        Self::Sentinel {
            response: response.to_string(),
        }
    }
}
