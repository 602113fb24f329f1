use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
};
use tracing::info;

use belay_db::Database;
use belay_types::BelayError;
use belay_types::api::{CreateChannelRequest, StatusResponse};
use belay_types::models::{Channel, ChannelId};

use crate::error::{ApiError, unavailable};
use crate::extract::ApiJson;
use crate::state::AppState;

/// Channel name → id mapping. Names are unique and never change.
#[derive(Clone)]
pub struct ChannelDirectory {
    db: Arc<Database>,
}

impl ChannelDirectory {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn create(&self, name: &str) -> Result<ChannelId, BelayError> {
        if name.trim().is_empty() {
            return Err(BelayError::InvalidInput("channel name must not be empty".into()));
        }

        match self.db.create_channel(name).map_err(unavailable)? {
            Some(id) => {
                info!("Created channel {} ({})", id, name);
                Ok(ChannelId(id))
            }
            None => Err(BelayError::NameTaken(name.to_string())),
        }
    }

    /// All channels, by name ascending.
    pub fn list(&self) -> Result<Vec<Channel>, BelayError> {
        let rows = self.db.list_channels().map_err(unavailable)?;
        Ok(rows
            .into_iter()
            .map(|row| Channel {
                id: ChannelId(row.id),
                name: row.name,
            })
            .collect())
    }

    pub fn get_name(&self, id: ChannelId) -> Result<Option<String>, BelayError> {
        self.db.get_channel_name(id.0).map_err(unavailable)
    }
}

pub async fn create_channel(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateChannelRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    let channels = state.channels.clone();
    let name = req.channel_name.clone();
    state.run_blocking(move || channels.create(&name)).await?;

    Ok(Json(StatusResponse::ok(format!(
        "Successfully created {}",
        req.channel_name
    ))))
}

pub async fn get_channels(State(state): State<AppState>) -> Result<Json<Vec<Channel>>, ApiError> {
    let timeline = state.timeline.clone();
    let channels = state.run_blocking(move || timeline.channel_list()).await?;
    Ok(Json(channels))
}

/// Channel name, or `""` when the id is unknown or not a number.
pub async fn get_channel(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<String>, ApiError> {
    let Ok(id) = id.parse::<i64>() else {
        return Ok(Json(String::new()));
    };

    let channels = state.channels.clone();
    let name = state
        .run_blocking(move || channels.get_name(ChannelId(id)))
        .await?;
    Ok(Json(name.unwrap_or_default()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory() -> ChannelDirectory {
        ChannelDirectory::new(Arc::new(Database::open_in_memory().unwrap()))
    }

    #[test]
    fn create_and_look_up() {
        let channels = directory();
        let id = channels.create("general").unwrap();
        assert_eq!(channels.get_name(id).unwrap().as_deref(), Some("general"));
    }

    #[test]
    fn duplicate_name_is_taken() {
        let channels = directory();
        channels.create("general").unwrap();
        assert_eq!(
            channels.create("general").unwrap_err(),
            BelayError::NameTaken("general".into())
        );
    }

    #[test]
    fn blank_names_are_rejected() {
        let channels = directory();
        for name in ["", "   ", "\t\n"] {
            assert!(
                matches!(channels.create(name), Err(BelayError::InvalidInput(_))),
                "{:?}",
                name
            );
        }
        assert!(channels.list().unwrap().is_empty());
    }

    #[test]
    fn missing_id_is_empty_not_error() {
        assert_eq!(directory().get_name(ChannelId(99)).unwrap(), None);
    }

    #[test]
    fn list_is_sorted_case_sensitively() {
        let channels = directory();
        for name in ["rust", "General", "announcements"] {
            channels.create(name).unwrap();
        }

        let names: Vec<String> = channels.list().unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["General", "announcements", "rust"]);
    }
}
