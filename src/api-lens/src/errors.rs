//! Error bodies returned by the API: `{"error": <kind>, "details": <payload>}`.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::IntoResponse,
};
use core_lens::{BatchAborted, PipelineError};
use data_model_lens::api::{BatchReport, FailedItem};
use data_model_lens::store::StoreError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Error for the identity endpoints and for requests without a valid identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "error", content = "details")]
pub enum AuthError {
    /// No token, or a token that is forged, expired or for a deleted user
    #[serde(rename = "unauthenticated")]
    Unauthenticated,
    /// Login with an unknown identifier or a wrong password
    #[serde(rename = "invalid_credentials")]
    InvalidCredentials,
    /// Malformed request body
    #[serde(rename = "invalid_request")]
    InvalidRequest(String),
    /// Registration payload failed validation
    #[serde(rename = "invalid_registration")]
    InvalidRegistration(String),
    /// Username or email is taken
    #[serde(rename = "already_registered")]
    AlreadyRegistered,
    #[serde(rename = "unknown")]
    Unknown(String),
}

/// Error for the job and profile endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "error", content = "details")]
pub enum ApiError {
    /// Malformed body or path
    #[serde(rename = "invalid_request")]
    InvalidRequest(String),
    /// The job id was not found
    #[serde(rename = "unknown_id")]
    UnknownId(Uuid),
    /// The caller's account no longer exists
    #[serde(rename = "unknown_user")]
    UnknownUser,
    /// The job belongs to another user
    #[serde(rename = "forbidden")]
    Forbidden(Uuid),
    /// A batch hit a job owned by another user. `report` holds what was committed before it.
    #[serde(rename = "batch_forbidden")]
    BatchForbidden { job_id: Uuid, report: BatchReport },
    /// The remote page could not be analyzed; the job is now in `error`
    #[serde(rename = "analysis_failed")]
    AnalysisFailed(FailedItem),
    /// Unknown error occurred
    #[serde(rename = "unknown")]
    Unknown(String),
}

macro_rules! from_error {
    ($lib_err:path, $err_type:tt) => {
        /// Converts a `$lib_err` into an `$err_type::Unknown`.
        impl From<$lib_err> for $err_type {
            fn from(e: $lib_err) -> Self {
                tracing::error!("{}", e);
                $err_type::Unknown(e.to_string())
            }
        }
    };
}

macro_rules! from_rejection {
    ($rejection:path, $err_type:tt) => {
        /// Converts a `$rejection` into an `$err_type::InvalidRequest`.
        impl From<$rejection> for $err_type {
            fn from(rejection: $rejection) -> Self {
                $err_type::InvalidRequest(rejection.body_text())
            }
        }
    };
}

// AuthError

impl IntoResponse for AuthError {
    fn into_response(self) -> axum::response::Response {
        let status = match self {
            AuthError::Unauthenticated | AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AuthError::InvalidRequest(_) | AuthError::InvalidRegistration(_) => StatusCode::BAD_REQUEST,
            AuthError::AlreadyRegistered => StatusCode::CONFLICT,
            AuthError::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(_) => AuthError::AlreadyRegistered,
            other => {
                tracing::error!("{}", other);
                AuthError::Unknown(other.to_string())
            }
        }
    }
}

from_error!(crate::auth::password::PasswordError, AuthError);
from_error!(crate::auth::token::TokenError, AuthError);

// ApiError

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self {
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::UnknownId(_) | ApiError::UnknownUser => StatusCode::NOT_FOUND,
            ApiError::Forbidden(_) | ApiError::BatchForbidden { .. } => StatusCode::FORBIDDEN,
            ApiError::AnalysisFailed(_) => StatusCode::BAD_GATEWAY,
            ApiError::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        match e {
            PipelineError::NotFound(id) => ApiError::UnknownId(id),
            PipelineError::Forbidden(id) => ApiError::Forbidden(id),
            PipelineError::Analysis { job_id, source } => ApiError::AnalysisFailed(FailedItem {
                id: Some(job_id),
                url: source.url().to_string(),
                reason: source.to_string(),
            }),
            PipelineError::Store(e) => e.into(),
        }
    }
}

impl From<BatchAborted> for ApiError {
    fn from(aborted: BatchAborted) -> Self {
        match aborted.error {
            PipelineError::Forbidden(job_id) => ApiError::BatchForbidden {
                job_id,
                report: aborted.report,
            },
            other => other.into(),
        }
    }
}

from_error!(StoreError, ApiError);
from_rejection!(JsonRejection, ApiError);
from_rejection!(JsonRejection, AuthError);
from_rejection!(PathRejection, ApiError);
