//! Persistence client interfaces.
//!
//! The job pipeline and the HTTP layer only ever talk to storage through these
//! traits. The process entry point decides which implementation to construct
//! ([`crate::pg_store::PgStore`] in production) and injects it.

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{JobRecord, JobSummary, PageSnapshot, StatusRule, User, UserId};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("Record already exists: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(diesel::result::Error),

    #[error("Database pool error: {0}")]
    Pool(String),
}

impl From<diesel::result::Error> for StoreError {
    fn from(error: diesel::result::Error) -> Self {
        match error {
            diesel::result::Error::DatabaseError(diesel::result::DatabaseErrorKind::UniqueViolation, info) => {
                Self::Conflict(info.message().to_string())
            }
            _ => Self::Database(error),
        }
    }
}

// PoolError
impl<E: std::fmt::Debug> From<deadpool::managed::PoolError<E>> for StoreError {
    fn from(error: deadpool::managed::PoolError<E>) -> Self {
        Self::Pool(format!("{:?}", error))
    }
}

/// Durable storage of job records, keyed by job id.
///
/// Every write is atomic per record. Methods addressing a single job return
/// `Ok(None)` / `Ok(false)` when the job does not exist.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn find_job(&self, id: Uuid) -> Result<Option<JobRecord>, StoreError>;

    /// The caller's job for exactly this URL, if one was created before.
    async fn find_job_by_url(&self, owner: UserId, url: &str) -> Result<Option<JobRecord>, StoreError>;

    /// Fails with [`StoreError::Conflict`] if the owner already has a job for the URL.
    async fn insert_job(&self, job: &JobRecord) -> Result<(), StoreError>;

    /// Replaces all derived fields with `snapshot`. The pause flag is read under the
    /// same row lock as the write and fed to `rule`, which decides status and pause flag.
    async fn commit_snapshot(
        &self,
        id: Uuid,
        snapshot: PageSnapshot,
        rule: StatusRule,
    ) -> Result<Option<JobRecord>, StoreError>;

    /// Sets `status = error`, leaving the previous snapshot untouched.
    async fn mark_error(&self, id: Uuid) -> Result<Option<JobRecord>, StoreError>;

    /// Flips `pause_requested` in place and returns the updated record.
    async fn toggle_pause(&self, id: Uuid) -> Result<Option<JobRecord>, StoreError>;

    async fn delete_job(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Deletes those of `ids` that belong to `owner`. Returns how many rows went away.
    async fn delete_owned_jobs(&self, owner: UserId, ids: &[Uuid]) -> Result<usize, StoreError>;

    /// Summaries of all of the owner's jobs, oldest first.
    async fn list_jobs(&self, owner: UserId) -> Result<Vec<JobSummary>, StoreError>;
}

/// Durable storage of users, keyed by user id.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with [`StoreError::Conflict`] if the username or email is taken.
    async fn insert_user(&self, user: &User) -> Result<(), StoreError>;

    async fn find_user(&self, id: UserId) -> Result<Option<User>, StoreError>;

    /// Looks a user up by username or email.
    async fn find_user_by_identifier(&self, identifier: &str) -> Result<Option<User>, StoreError>;

    /// Deletes the user together with all of their jobs.
    async fn delete_user(&self, id: UserId) -> Result<bool, StoreError>;
}
