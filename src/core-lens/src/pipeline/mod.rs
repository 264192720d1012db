//! The URL analysis job pipeline.
//!
//! Every operation takes the caller's [`UserId`] explicitly and runs the
//! ownership guard before any side effect, including before any page fetch.
//! The lifecycle transitions (enqueue, mark running, finalize) share one code
//! path; they differ only in the [`StatusRule`] applied when the fresh
//! snapshot is committed.

mod batch;

use std::sync::Arc;

use data_model_lens::api::{CreateJobsResponse, FailedItem};
use data_model_lens::models::{JobRecord, JobStatus, JobSummary, StatusRule, UserId};
use data_model_lens::store::{JobStore, StoreError};
use uuid::Uuid;

use crate::analyzer::{AnalyzeError, PageAnalyzer};

pub use batch::BatchAborted;

/// A lifecycle transition that re-analyzes the page before committing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Enqueue,
    MarkRunning,
    /// Commits `done`, or `queued` if a pause was requested.
    Finalize,
}

impl Transition {
    pub fn status_rule(&self) -> StatusRule {
        match self {
            Transition::Enqueue => StatusRule::Reset(JobStatus::Queued),
            Transition::MarkRunning => StatusRule::Reset(JobStatus::Running),
            Transition::Finalize => StatusRule::PauseWins,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Transition::Enqueue => "enqueue",
            Transition::MarkRunning => "mark-running",
            Transition::Finalize => "finalize",
        }
    }
}

impl std::fmt::Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Job {0} not found")]
    NotFound(Uuid),

    #[error("Job {0} belongs to another user")]
    Forbidden(Uuid),

    /// The job was moved to `error`; its previous snapshot is untouched.
    #[error("Analysis of job {job_id} failed: {source}")]
    Analysis {
        job_id: Uuid,
        #[source]
        source: AnalyzeError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Owns the job store and the page analyzer. Constructed once by the process
/// entry point and shared (behind an `Arc`) by every request.
pub struct JobPipeline {
    jobs: Arc<dyn JobStore>,
    analyzer: PageAnalyzer,
}

impl JobPipeline {
    pub fn new(jobs: Arc<dyn JobStore>, analyzer: PageAnalyzer) -> Self {
        Self { jobs, analyzer }
    }

    /// Loads the job and checks that `caller` owns it.
    async fn load_owned(&self, caller: UserId, id: Uuid) -> Result<JobRecord, PipelineError> {
        let job = self
            .jobs
            .find_job(id)
            .await
            .inspect_err(|e| tracing::error!("[job: {}] failed to load: {}", id, e))?
            .ok_or(PipelineError::NotFound(id))?;

        if !job.is_owned_by(caller) {
            tracing::warn!("[job: {}] user {} is not the owner", id, caller);
            return Err(PipelineError::Forbidden(id));
        }
        Ok(job)
    }

    /// Creates one job per URL the caller does not already have, analyzing each page once.
    ///
    /// URLs the caller already submitted are reported under `existing` without a fetch.
    /// The first analysis failure stops the request: it is reported under `failed`
    /// and no later URL is processed. Jobs created before it stay created.
    pub async fn create(&self, caller: UserId, urls: &[String]) -> Result<CreateJobsResponse, PipelineError> {
        let mut response = CreateJobsResponse::default();

        for url in urls.iter().map(|u| u.trim()) {
            if let Some(existing) = self.jobs.find_job_by_url(caller, url).await? {
                tracing::debug!("[job: {}] {} already submitted", existing.id, url);
                response.existing.push(existing.summary());
                continue;
            }

            let snapshot = match self.analyzer.analyze(url).await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    tracing::warn!("Analysis of new URL {} failed: {}", e.url(), e);
                    response.failed = Some(FailedItem {
                        id: None,
                        url: url.to_string(),
                        reason: e.to_string(),
                    });
                    break;
                }
            };

            let job = JobRecord::new(caller, url.to_string(), snapshot);
            match self.jobs.insert_job(&job).await {
                Ok(()) => {
                    tracing::info!("[job: {}] created for {}", job.id, url);
                    response.created.push(job.summary());
                }
                // A concurrent request created it first.
                Err(StoreError::Conflict(_)) => match self.jobs.find_job_by_url(caller, url).await? {
                    Some(existing) => response.existing.push(existing.summary()),
                    None => return Err(StoreError::Conflict(url.to_string()).into()),
                },
                Err(e) => {
                    tracing::error!("Failed to store job for {}: {}", url, e);
                    return Err(e.into());
                }
            }
        }

        Ok(response)
    }

    /// Re-analyzes the job's page and commits the fresh snapshot under the transition's rule.
    /// On analysis failure the job is marked `error` and the failure is returned.
    pub async fn transition(&self, caller: UserId, id: Uuid, transition: Transition) -> Result<JobRecord, PipelineError> {
        let job = self.load_owned(caller, id).await?;
        tracing::debug!("[job: {}] {} {}", id, transition, job.url);

        match self.analyzer.analyze(&job.url).await {
            Ok(snapshot) => {
                let committed = self
                    .jobs
                    .commit_snapshot(id, snapshot, transition.status_rule())
                    .await
                    .inspect_err(|e| tracing::error!("[job: {}] failed to commit {}: {}", id, transition, e))?
                    .ok_or(PipelineError::NotFound(id))?;
                tracing::info!(
                    "[job: {}] {} committed: status={} pause_requested={}",
                    id,
                    transition,
                    committed.status,
                    committed.pause_requested
                );
                Ok(committed)
            }
            Err(source) => {
                tracing::warn!("[job: {}] {} failed: {}", id, transition, source);
                self.jobs
                    .mark_error(id)
                    .await
                    .inspect_err(|e| tracing::error!("[job: {}] failed to record error: {}", id, e))?;
                Err(PipelineError::Analysis { job_id: id, source })
            }
        }
    }

    /// Full detail of one of the caller's jobs.
    pub async fn detail(&self, caller: UserId, id: Uuid) -> Result<JobRecord, PipelineError> {
        self.load_owned(caller, id).await
    }

    /// Flips the pause flag. Never touches `status` and never fetches.
    pub async fn toggle_pause(&self, caller: UserId, id: Uuid) -> Result<JobRecord, PipelineError> {
        self.load_owned(caller, id).await?;
        let job = self.jobs.toggle_pause(id).await?.ok_or(PipelineError::NotFound(id))?;
        tracing::info!("[job: {}] pause_requested={}", id, job.pause_requested);
        Ok(job)
    }

    /// Deletes one of the caller's jobs, whatever its status.
    pub async fn delete(&self, caller: UserId, id: Uuid) -> Result<(), PipelineError> {
        self.load_owned(caller, id).await?;
        if !self.jobs.delete_job(id).await? {
            return Err(PipelineError::NotFound(id));
        }
        tracing::info!("[job: {}] deleted", id);
        Ok(())
    }

    /// Deletes those of `ids` the caller owns; others are left alone. Returns the number deleted.
    pub async fn delete_many(&self, caller: UserId, ids: &[Uuid]) -> Result<usize, PipelineError> {
        let deleted = self.jobs.delete_owned_jobs(caller, ids).await?;
        tracing::info!("User {} deleted {} of {} requested jobs", caller, deleted, ids.len());
        Ok(deleted)
    }

    pub async fn list(&self, caller: UserId) -> Result<Vec<JobSummary>, PipelineError> {
        Ok(self.jobs.list_jobs(caller).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_status_rules() {
        assert_eq!(Transition::Enqueue.status_rule(), StatusRule::Reset(JobStatus::Queued));
        assert_eq!(Transition::MarkRunning.status_rule(), StatusRule::Reset(JobStatus::Running));
        assert_eq!(Transition::Finalize.status_rule(), StatusRule::PauseWins);
    }

    #[test]
    fn test_finalize_honors_pause() {
        assert_eq!(Transition::Finalize.status_rule().resolve(true), (JobStatus::Queued, true));
        assert_eq!(Transition::Finalize.status_rule().resolve(false), (JobStatus::Done, false));
        assert_eq!(Transition::Enqueue.status_rule().resolve(true), (JobStatus::Queued, false));
    }

    #[test]
    fn test_pipeline_error_display() {
        let id = Uuid::nil();
        assert_eq!(
            PipelineError::Forbidden(id).to_string(),
            "Job 00000000-0000-0000-0000-000000000000 belongs to another user"
        );
        let err = PipelineError::Analysis {
            job_id: id,
            source: AnalyzeError::Status {
                url: "https://example.com/".to_string(),
                status: 500,
            },
        };
        assert!(err.to_string().contains("returned HTTP 500"));
    }
}
