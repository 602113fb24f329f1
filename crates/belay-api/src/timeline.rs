use axum::{
    Json,
    extract::{Path, State},
};

use belay_types::BelayError;
use belay_types::api::{NO_MESSAGES_YET, TimelineResponse, UNDEFINED_CHANNEL};
use belay_types::models::{Channel, MessageView};

use crate::channels::ChannelDirectory;
use crate::error::ApiError;
use crate::messages::MessageLedger;
use crate::replies::ReplyLedger;
use crate::state::AppState;

/// The two read views callers need, assembled from the ledgers.
#[derive(Clone)]
pub struct QueryFacade {
    channels: ChannelDirectory,
    messages: MessageLedger,
    replies: ReplyLedger,
}

impl QueryFacade {
    pub fn new(channels: ChannelDirectory, messages: MessageLedger, replies: ReplyLedger) -> Self {
        Self {
            channels,
            messages,
            replies,
        }
    }

    pub fn channel_list(&self) -> Result<Vec<Channel>, BelayError> {
        self.channels.list()
    }

    /// Messages of a channel with their replies nested under them.
    // TODO: one query per message; fetch replies with a single `msg_id IN (...)` batch.
    pub fn channel_timeline(&self, channel_id: &str) -> Result<Vec<MessageView>, BelayError> {
        let mut messages = self.messages.list_for_channel(channel_id)?;
        for message in &mut messages {
            message.replies = self.replies.list_for_message(message.id)?;
        }
        Ok(messages)
    }
}

pub async fn get_messages(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
) -> Result<Json<TimelineResponse>, ApiError> {
    let timeline = state.timeline.clone();
    let result = state
        .run_blocking(move || timeline.channel_timeline(&channel_id))
        .await;

    let response = match result {
        Ok(messages) if messages.is_empty() => TimelineResponse::sentinel(NO_MESSAGES_YET),
        Ok(messages) => TimelineResponse::Messages(messages),
        Err(BelayError::InvalidChannel) => TimelineResponse::sentinel(UNDEFINED_CHANNEL),
        Err(e) => return Err(e.into()),
    };
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use belay_db::Database;
    use belay_types::models::{ChannelId, UserId};

    use super::*;

    fn facade() -> (QueryFacade, ChannelId, UserId) {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let user = UserId(db.create_user("ada", "hash").unwrap().unwrap());
        let channels = ChannelDirectory::new(db.clone());
        let channel = channels.create("general").unwrap();
        let facade = QueryFacade::new(
            channels,
            MessageLedger::new(db.clone()),
            ReplyLedger::new(db),
        );
        (facade, channel, user)
    }

    #[test]
    fn replies_nest_under_their_message() {
        let (facade, channel, user) = facade();
        let root = facade.messages.write(channel, user, "root").unwrap();
        let other = facade.messages.write(channel, user, "other").unwrap();
        facade.replies.write(root, user, "one").unwrap();
        facade.replies.write(root, user, "two").unwrap();

        let timeline = facade.channel_timeline(&channel.to_string()).unwrap();
        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline[0].id, root);
        let bodies: Vec<&str> = timeline[0].replies.iter().map(|r| r.body.as_str()).collect();
        assert_eq!(bodies, vec!["one", "two"]);
        assert_eq!(timeline[1].id, other);
        assert!(timeline[1].replies.is_empty());
    }

    #[test]
    fn malformed_channel_is_invalid() {
        let (facade, ..) = facade();
        assert_eq!(facade.channel_timeline("abc").unwrap_err(), BelayError::InvalidChannel);
    }

    #[test]
    fn channel_list_delegates_to_directory() {
        let (facade, channel, _) = facade();
        let channels = facade.channel_list().unwrap();
        assert_eq!(channels, vec![Channel { id: channel, name: "general".into() }]);
    }
}
