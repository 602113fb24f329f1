use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

use belay_types::BelayError;
use belay_types::api::StatusResponse;

/// HTTP rendering of [`BelayError`].
///
/// Business failures stay `200 {success: false, message}` the way clients of
/// this API expect; only auth and store failures change the status code.
#[derive(Debug)]
pub struct ApiError(pub BelayError);

impl From<BelayError> for ApiError {
    fn from(e: BelayError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            BelayError::Unauthenticated => StatusCode::UNAUTHORIZED,
            BelayError::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::OK,
        };
        (status, Json(StatusResponse::failure(self.0.to_string()))).into_response()
    }
}

/// Log a store failure and collapse it so its text never reaches a caller.
pub(crate) fn unavailable(e: anyhow::Error) -> BelayError {
    error!("Store failure: {:#}", e);
    BelayError::StoreUnavailable
}
