use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::IntoResponse,
};
use data_model_lens::api::{JobIdsPayload, ProfileResponse, RowsDeletedResponse, UserProfile};
use tracing::info;

use crate::auth::{Identity, token::create_logout_cookie};
use crate::errors::ApiError;
use crate::state::AppState;

/// GET /api/profile
/// The caller's account and a summary of each of their analyses, oldest first.
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(Identity(caller)): Extension<Identity>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let user = state.users.find_user(caller).await?.ok_or(ApiError::UnknownUser)?;
    let analyses = state.pipeline.list(caller).await?;

    Ok(Json(ProfileResponse {
        user: UserProfile::from(&user),
        analyses,
    }))
}

/// DELETE /api/profile/analyses
/// Deletes the caller's jobs among `ids`. Ids of other users' jobs are ignored.
pub async fn delete_profile_analyses(
    State(state): State<AppState>,
    Extension(Identity(caller)): Extension<Identity>,
    payload: Result<Json<JobIdsPayload>, JsonRejection>,
) -> Result<Json<RowsDeletedResponse>, ApiError> {
    let Json(payload) = payload?;
    let rows_deleted = state.pipeline.delete_many(caller, &payload.ids).await?;
    Ok(Json(RowsDeletedResponse { rows_deleted }))
}

/// DELETE /api/profile
/// Deletes the account together with all of its jobs and clears the session cookie.
pub async fn delete_profile(
    State(state): State<AppState>,
    Extension(Identity(caller)): Extension<Identity>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.users.delete_user(caller).await? {
        return Err(ApiError::UnknownUser);
    }
    info!("Deleted user {} and their analyses", caller);

    Ok((
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, create_logout_cookie().to_string())],
    ))
}
