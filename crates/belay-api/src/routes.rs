use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::middleware::require_auth;
use crate::state::AppState;
use crate::{channels, credentials, messages, replies, timeline};

pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/credentials-check", post(credentials::credentials_check))
        .route("/create-user", post(credentials::create_user));

    let protected_routes = Router::new()
        .route("/create-channel", post(channels::create_channel))
        .route("/write-message", post(messages::write_message))
        .route("/write-reply", post(replies::write_reply))
        .route("/get-channels", get(channels::get_channels))
        .route("/get-channel/{id}", get(channels::get_channel))
        .route("/get-messages/{channel_id}", get(timeline::get_messages))
        .route("/get-replies/{message_id}", get(replies::get_replies))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
