use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use data_model_lens::models::UserId;
use tracing::debug;

use super::token::{token_from_headers, verify_token};
use crate::errors::AuthError;
use crate::state::AppState;

/// The verified caller, inserted into request extensions by [`require_identity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity(pub UserId);

/// Middleware that requires a valid token for an existing user.
/// The token is read from `Authorization: Bearer` or the session cookie.
pub async fn require_identity(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let Some(token) = token_from_headers(request.headers()) else {
        debug!("Request has no token, returning 401");
        return Err(AuthError::Unauthenticated);
    };

    let user_id = verify_token(&token, &state.auth.token_secret, state.auth.token_duration_seconds).map_err(|e| {
        debug!("Token rejected: {}", e);
        AuthError::Unauthenticated
    })?;

    // A deleted account's tokens stop working immediately.
    if state.users.find_user(user_id).await?.is_none() {
        debug!("Token for unknown user {}, returning 401", user_id);
        return Err(AuthError::Unauthenticated);
    }

    request.extensions_mut().insert(Identity(user_id));
    Ok(next.run(request).await)
}
