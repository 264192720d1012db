//! Request and response bodies shared by the API server and its clients.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{JobSummary, User, UserId};

// =============================================================================
// Jobs
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlsPayload {
    pub urls: Vec<String>,
}

/// What a batch does after an analyzer failure on one of its items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop at the failing item. Later items are not touched.
    #[default]
    Abort,
    /// Record the failure and carry on with the next item.
    Continue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobIdsPayload {
    pub ids: Vec<Uuid>,
    #[serde(default)]
    pub on_failure: FailurePolicy,
}

/// One item of a batch or create request that could not be analyzed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedItem {
    /// Absent when the failure happened before a job existed (create).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub url: String,
    pub reason: String,
}

/// Outcome of a create request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateJobsResponse {
    /// Jobs newly created by this request, in input order.
    pub created: Vec<JobSummary>,
    /// Jobs the caller already had for one of the submitted URLs.
    pub existing: Vec<JobSummary>,
    /// The URL that stopped the request, if any. URLs after it were not processed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed: Option<FailedItem>,
}

/// Outcome of a batch transition (enqueue, mark running, finalize).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Jobs committed by this batch, in input order.
    pub updated: Vec<JobSummary>,
    pub failed: Vec<FailedItem>,
    /// True when processing stopped before the end of the id list.
    pub halted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TogglePauseResponse {
    pub id: Uuid,
    pub url: String,
    pub pause_requested: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedResponse {
    pub deleted: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowsDeletedResponse {
    pub rows_deleted: usize,
}

// =============================================================================
// Identity & profile
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterPayload {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginPayload {
    /// Username or email.
    pub identifier: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub user_id: UserId,
    pub token: String,
    /// Seconds until the token stops being accepted.
    pub expires_in: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    pub email: String,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        UserProfile {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub user: UserProfile,
    pub analyses: Vec<JobSummary>,
}
