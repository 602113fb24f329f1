use std::sync::{Arc, LazyLock};

use axum::{Extension, Json, extract::State};
use regex::Regex;

use belay_db::Database;
use belay_db::models::MessageRow;
use belay_types::BelayError;
use belay_types::api::{Claims, StatusResponse, WriteMessageRequest};
use belay_types::models::{ChannelId, MessageId, MessageView, UserId};

use crate::error::{ApiError, unavailable};
use crate::extract::ApiJson;
use crate::state::AppState;
use crate::tokens::subject;

/// An http(s) link whose path ends in .png, .jpg or .jpeg, optionally followed
/// by a query or fragment. The extension must end the link: what follows is
/// whitespace, end of input, a sentence-ending period, or punctuation that
/// cannot continue a URL path or host.
static IMAGE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?P<url>(?i:https?)://\S+?\.(?i:png|jpe?g)(?:[?#][^\s()<>"']*)?)(?:\.?(?:\s|$)|[^\w./?#-])"#,
    )
    .expect("image url pattern is valid")
});

/// Image links mentioned in a message body, in order of appearance.
pub fn extract_images(body: &str) -> Vec<String> {
    IMAGE_URL
        .captures_iter(body)
        .filter_map(|c| c.name("url"))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Append-only store of channel messages.
#[derive(Clone)]
pub struct MessageLedger {
    db: Arc<Database>,
}

impl MessageLedger {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn write(
        &self,
        channel_id: ChannelId,
        author_id: UserId,
        body: &str,
    ) -> Result<MessageId, BelayError> {
        if body.trim().is_empty() {
            return Err(BelayError::InvalidInput("message must not be empty".into()));
        }

        self.db
            .insert_message(channel_id.0, author_id.0, body)
            .map_err(unavailable)?
            .map(MessageId)
            .ok_or_else(|| BelayError::NotFound("channel or author".into()))
    }

    /// Messages of a channel in insertion order, without replies.
    ///
    /// `channel_id` is the raw path segment; anything that is not an integer is
    /// rejected before the store is touched.
    pub fn list_for_channel(&self, channel_id: &str) -> Result<Vec<MessageView>, BelayError> {
        let channel_id: i64 = channel_id
            .trim()
            .parse()
            .map_err(|_| BelayError::InvalidChannel)?;

        let rows = self.db.messages_for_channel(channel_id).map_err(unavailable)?;
        Ok(rows.into_iter().map(message_view).collect())
    }
}

fn message_view(row: MessageRow) -> MessageView {
    MessageView {
        id: MessageId(row.id),
        channel_id: ChannelId(row.channel_id),
        author_id: UserId(row.user_id),
        author: row.user_name,
        images: extract_images(&row.body),
        body: row.body,
        sent_time: row.sent_time,
        replies: Vec::new(),
    }
}

pub async fn write_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<WriteMessageRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    if subject(&claims)? != req.user_id {
        return Err(BelayError::Unauthenticated.into());
    }

    let messages = state.messages.clone();
    state
        .run_blocking(move || messages.write(req.channel_id, req.user_id, &req.message_body))
        .await?;

    Ok(Json(StatusResponse::ok("wrote message")))
}
