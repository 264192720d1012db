use axum::{
    Extension, Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use core_lens::Transition;
use data_model_lens::api::{
    BatchReport, CreateJobsResponse, DeletedResponse, JobIdsPayload, TogglePauseResponse, UrlsPayload,
};
use data_model_lens::models::JobRecord;
use uuid::Uuid;

use crate::auth::Identity;
use crate::errors::ApiError;
use crate::state::AppState;

/// POST /api/analyses
/// Analyzes and stores each URL the caller has not submitted before.
///
/// 201 if any job was created, 200 if every URL already existed, and 502 if
/// an analysis failed (jobs created before the failure are still listed).
pub async fn post_analyses(
    State(state): State<AppState>,
    Extension(Identity(caller)): Extension<Identity>,
    payload: Result<Json<UrlsPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateJobsResponse>), ApiError> {
    let Json(payload) = payload?;
    if payload.urls.is_empty() {
        return Err(ApiError::InvalidRequest("urls must not be empty".to_string()));
    }
    if payload.urls.iter().any(|url| url.trim().is_empty()) {
        return Err(ApiError::InvalidRequest("urls must not contain blank entries".to_string()));
    }

    let response = state.pipeline.create(caller, &payload.urls).await?;
    let status = if response.failed.is_some() {
        StatusCode::BAD_GATEWAY
    } else if response.created.is_empty() {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(response)))
}

/// GET /api/analyses/{id}
pub async fn get_analysis(
    State(state): State<AppState>,
    Extension(Identity(caller)): Extension<Identity>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<JobRecord>, ApiError> {
    let Path(id) = id?;
    Ok(Json(state.pipeline.detail(caller, id).await?))
}

/// DELETE /api/analyses/{id}
pub async fn delete_analysis(
    State(state): State<AppState>,
    Extension(Identity(caller)): Extension<Identity>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let Path(id) = id?;
    state.pipeline.delete(caller, id).await?;
    Ok(Json(DeletedResponse { deleted: id }))
}

/// POST /api/analyses/{id}/toggle_pause
pub async fn post_toggle_pause(
    State(state): State<AppState>,
    Extension(Identity(caller)): Extension<Identity>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<TogglePauseResponse>, ApiError> {
    let Path(id) = id?;
    let job = state.pipeline.toggle_pause(caller, id).await?;
    Ok(Json(TogglePauseResponse {
        id: job.id,
        url: job.url,
        pause_requested: job.pause_requested,
    }))
}

/// POST /api/analyses/queued
pub async fn post_queued(
    state: State<AppState>,
    identity: Extension<Identity>,
    payload: Result<Json<JobIdsPayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    run_batch(state, identity, payload, Transition::Enqueue).await
}

/// POST /api/analyses/running
pub async fn post_running(
    state: State<AppState>,
    identity: Extension<Identity>,
    payload: Result<Json<JobIdsPayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    run_batch(state, identity, payload, Transition::MarkRunning).await
}

/// POST /api/analyses/result
/// Finalizes each job as `done`, or back to `queued` where a pause was requested.
pub async fn post_result(
    state: State<AppState>,
    identity: Extension<Identity>,
    payload: Result<Json<JobIdsPayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    run_batch(state, identity, payload, Transition::Finalize).await
}

async fn run_batch(
    State(state): State<AppState>,
    Extension(Identity(caller)): Extension<Identity>,
    payload: Result<Json<JobIdsPayload>, JsonRejection>,
    transition: Transition,
) -> Result<(StatusCode, Json<BatchReport>), ApiError> {
    let Json(payload) = payload?;
    let report = state
        .pipeline
        .run_batch(caller, &payload.ids, transition, payload.on_failure)
        .await?;

    let status = if report.failed.is_empty() {
        StatusCode::OK
    } else {
        StatusCode::BAD_GATEWAY
    };
    Ok((status, Json(report)))
}
