use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};

use belay_types::BelayError;

use crate::error::ApiError;
use crate::state::AppState;

/// Validate the bearer token and hand its claims to the handler.
pub async fn require_auth(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let TypedHeader(Authorization(bearer)) = bearer.ok_or(BelayError::Unauthenticated)?;
    let claims = state.tokens.authenticate(bearer.token())?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
