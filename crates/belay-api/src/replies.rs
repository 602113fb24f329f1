use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
};

use belay_db::Database;
use belay_types::BelayError;
use belay_types::api::{Claims, StatusResponse, WriteReplyRequest};
use belay_types::models::{MessageId, ReplyId, ReplyView, UserId};

use crate::error::{ApiError, unavailable};
use crate::extract::ApiJson;
use crate::state::AppState;
use crate::tokens::subject;

/// Append-only store of replies. A reply points back at its message by id;
/// messages never hold their replies.
#[derive(Clone)]
pub struct ReplyLedger {
    db: Arc<Database>,
}

impl ReplyLedger {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn write(&self, msg_id: MessageId, user_id: UserId, body: &str) -> Result<ReplyId, BelayError> {
        if body.trim().is_empty() {
            return Err(BelayError::InvalidInput("reply must not be empty".into()));
        }

        self.db
            .insert_reply(msg_id.0, user_id.0, body)
            .map_err(unavailable)?
            .map(ReplyId)
            .ok_or_else(|| BelayError::NotFound("message or user".into()))
    }

    pub fn list_for_message(&self, msg_id: MessageId) -> Result<Vec<ReplyView>, BelayError> {
        let rows = self.db.replies_for_message(msg_id.0).map_err(unavailable)?;
        Ok(rows
            .into_iter()
            .map(|row| ReplyView {
                reply_id: ReplyId(row.id),
                author: row.user_name,
                body: row.body,
                sent_time: row.sent_time,
            })
            .collect())
    }
}

pub async fn write_reply(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<WriteReplyRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    if subject(&claims)? != req.user_id {
        return Err(BelayError::Unauthenticated.into());
    }

    let replies = state.replies.clone();
    state
        .run_blocking(move || replies.write(req.msg_id, req.user_id, &req.reply_body))
        .await?;

    Ok(Json(StatusResponse::ok("wrote reply")))
}

/// Replies to one message; a malformed id simply has none.
pub async fn get_replies(
    State(state): State<AppState>,
    Path(message_id): Path<String>,
) -> Result<Json<Vec<ReplyView>>, ApiError> {
    let Ok(message_id) = message_id.parse::<i64>() else {
        return Ok(Json(Vec::new()));
    };

    let replies = state.replies.clone();
    let views = state
        .run_blocking(move || replies.list_for_message(MessageId(message_id)))
        .await?;
    Ok(Json(views))
}
