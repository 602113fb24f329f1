//! Request body extraction that fails the same way the handlers do.

use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
};
use serde::de::DeserializeOwned;
use tracing::warn;

use belay_types::BelayError;

use crate::error::ApiError;

/// JSON body extractor whose rejection is an [`ApiError`], so a malformed
/// body gets the usual `{success: false, message}` envelope instead of
/// axum's plain-text rejection.
#[derive(Debug, Clone)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| ApiError(BelayError::InvalidInput(rejection_message(&e))))?;
        Ok(ApiJson(value))
    }
}

fn rejection_message(e: &JsonRejection) -> String {
    warn!("Rejected request body: {}", e.body_text());
    match e {
        JsonRejection::MissingJsonContentType(_) => "expected a JSON body".into(),
        _ => "malformed request body".into(),
    }
}
