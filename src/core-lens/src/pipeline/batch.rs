use data_model_lens::api::{BatchReport, FailedItem, FailurePolicy};
use data_model_lens::models::UserId;
use uuid::Uuid;

use super::{JobPipeline, PipelineError, Transition};

/// A batch stopped by an ownership violation or a storage failure.
/// `report` holds what was committed before the stop; later ids were not touched.
#[derive(Debug, thiserror::Error)]
#[error("Batch aborted: {error}")]
pub struct BatchAborted {
    pub report: BatchReport,
    #[source]
    pub error: PipelineError,
}

impl JobPipeline {
    /// Applies `transition` to each id in order, one at a time.
    ///
    /// * Unknown ids are skipped.
    /// * A job owned by someone else aborts the batch immediately.
    /// * An analysis failure is recorded in `failed`; `policy` decides whether
    ///   the batch stops there or moves on to the next id.
    pub async fn run_batch(
        &self,
        caller: UserId,
        ids: &[Uuid],
        transition: Transition,
        policy: FailurePolicy,
    ) -> Result<BatchReport, BatchAborted> {
        let mut report = BatchReport::default();

        for (index, &id) in ids.iter().enumerate() {
            let remaining = index + 1 < ids.len();

            match self.transition(caller, id, transition).await {
                Ok(job) => report.updated.push(job.summary()),
                Err(PipelineError::NotFound(_)) => {
                    tracing::debug!("[job: {}] not found, skipping", id);
                }
                Err(PipelineError::Analysis { job_id, source }) => {
                    report.failed.push(FailedItem {
                        id: Some(job_id),
                        url: source.url().to_string(),
                        reason: source.to_string(),
                    });
                    if policy == FailurePolicy::Abort {
                        report.halted = remaining;
                        break;
                    }
                }
                Err(error) => {
                    report.halted = remaining;
                    tracing::warn!(
                        "{} batch aborted at job {} after {} committed: {}",
                        transition,
                        id,
                        report.updated.len(),
                        error
                    );
                    return Err(BatchAborted { report, error });
                }
            }
        }

        tracing::info!(
            "{} batch: {} updated, {} failed, halted={}",
            transition,
            report.updated.len(),
            report.failed.len(),
            report.halted
        );
        Ok(report)
    }
}
