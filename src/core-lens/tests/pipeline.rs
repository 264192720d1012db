//! Integration tests for the job pipeline
//!
//! Drives create / transition / batch / toggle / delete against the in-memory
//! store and a mock page fetcher, so neither Postgres nor network is needed.

use std::sync::Arc;

use core_lens::analyzer::mock::MockFetcher;
use core_lens::{JobPipeline, PageAnalyzer, PipelineError, Transition};
use data_model_lens::api::FailurePolicy;
use data_model_lens::models::{JobRecord, JobStatus, UserId};
use data_model_lens::store::{JobStore, StoreError};
use data_model_lens::test_helpers::{MemoryStore, create_test_user};
use uuid::Uuid;

const HOME: &str = "https://example.com/";
const BLOG: &str = "https://example.com/blog";
const SHOP: &str = "https://shop.example.org/";

fn page(title: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
        <html><head><title>{title}</title></head>
        <body>
          <h1>{title}</h1><h2>Intro</h2><h2>More</h2>
          <a href="/about">About</a>
          <a href="https://docs.example.com/">Docs</a>
          <a href="https://other.com">Other</a>
          <a href="not a url">Broken</a>
          <form><input type="password"></form>
        </body></html>"#
    )
}

struct Harness {
    store: Arc<MemoryStore>,
    fetcher: Arc<MockFetcher>,
    pipeline: JobPipeline,
}

fn harness(fetcher: MockFetcher) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let fetcher = Arc::new(fetcher);
    let pipeline = JobPipeline::new(store.clone(), PageAnalyzer::new(fetcher.clone()));
    Harness {
        store,
        fetcher,
        pipeline,
    }
}

fn default_harness() -> Harness {
    harness(
        MockFetcher::new()
            .with_page(HOME, &page("Home"))
            .with_page(BLOG, &page("Blog"))
            .with_page(SHOP, &page("Shop")),
    )
}

/// Creates one job through the pipeline and returns its full record.
async fn create_job(h: &Harness, owner: UserId, url: &str) -> JobRecord {
    let response = h.pipeline.create(owner, &[url.to_string()]).await.unwrap();
    let id = response.created[0].id;
    h.store.find_job(id).await.unwrap().unwrap()
}

fn assert_counts_match(job: &JobRecord) {
    assert_eq!(job.internal_links_count as usize, job.internal_links.len());
    assert_eq!(job.external_links_count as usize, job.external_links.len());
    assert_eq!(job.inaccessible_links_count as usize, job.inaccessible_links.len());
}

//
// create
//

#[tokio::test]
async fn test_create_analyzes_and_stores_queued_job() {
    let h = default_harness();
    let owner = create_test_user(h.store.as_ref(), "alice").await.id;

    let job = create_job(&h, owner, HOME).await;

    assert_eq!(job.status, JobStatus::Queued);
    assert!(!job.pause_requested);
    assert_eq!(job.title, "Home");
    assert_eq!(job.html_version, "HTML5");
    assert_eq!(job.heading_counts.get("h1"), Some(1));
    assert_eq!(job.heading_counts.get("h2"), Some(2));
    assert_eq!(job.internal_links_count, 2);
    assert_eq!(job.external_links_count, 1);
    assert_eq!(job.inaccessible_links_count, 1);
    assert!(job.has_login_form);
    assert_counts_match(&job);
    assert_eq!(h.fetcher.fetched(), vec![HOME.to_string()]);
}

#[tokio::test]
async fn test_create_dedups_by_owner_and_url() {
    let h = default_harness();
    let alice = UserId::new();
    let bob = UserId::new();
    let first = create_job(&h, alice, HOME).await;

    let response = h
        .pipeline
        .create(alice, &[HOME.to_string(), BLOG.to_string()])
        .await
        .unwrap();

    assert_eq!(response.existing.len(), 1);
    assert_eq!(response.existing[0].id, first.id);
    assert_eq!(response.created.len(), 1);
    assert_eq!(response.created[0].url, BLOG);
    // The existing URL was not fetched again.
    assert_eq!(h.fetcher.fetched(), vec![HOME.to_string(), BLOG.to_string()]);

    // Dedup is per owner.
    let response = h.pipeline.create(bob, &[HOME.to_string()]).await.unwrap();
    assert_eq!(response.created.len(), 1);
    assert_ne!(response.created[0].id, first.id);
}

#[tokio::test]
async fn test_create_repeated_url_in_one_request() {
    let h = default_harness();
    let owner = UserId::new();

    let response = h
        .pipeline
        .create(owner, &[HOME.to_string(), HOME.to_string()])
        .await
        .unwrap();

    assert_eq!(response.created.len(), 1);
    assert_eq!(response.existing.len(), 1);
    assert_eq!(response.created[0].id, response.existing[0].id);
    assert_eq!(h.store.job_count().await, 1);
}

#[tokio::test]
async fn test_create_stops_at_first_analysis_failure() {
    let h = harness(
        MockFetcher::new()
            .with_page(HOME, &page("Home"))
            .with_status("https://down.example.com/", 503)
            .with_page(BLOG, &page("Blog")),
    );
    let owner = UserId::new();

    let response = h
        .pipeline
        .create(
            owner,
            &[HOME.to_string(), "https://down.example.com/".to_string(), BLOG.to_string()],
        )
        .await
        .unwrap();

    assert_eq!(response.created.len(), 1);
    let failed = response.failed.unwrap();
    assert_eq!(failed.url, "https://down.example.com/");
    assert!(failed.reason.contains("503"));
    assert_eq!(failed.id, None);
    assert!(!h.fetcher.fetched().contains(&BLOG.to_string()));
    assert_eq!(h.store.job_count().await, 1);
}

#[tokio::test]
async fn test_create_rejects_invalid_url_without_storing() {
    let h = default_harness();

    let response = h.pipeline.create(UserId::new(), &["not a url".to_string()]).await.unwrap();

    assert!(response.created.is_empty());
    assert_eq!(response.failed.unwrap().url, "not a url");
    assert_eq!(h.store.job_count().await, 0);
    assert!(h.fetcher.fetched().is_empty());
}

//
// transitions
//

#[tokio::test]
async fn test_mark_running_is_idempotent() {
    let h = default_harness();
    let owner = UserId::new();
    let job = create_job(&h, owner, HOME).await;

    let first = h.pipeline.transition(owner, job.id, Transition::MarkRunning).await.unwrap();
    let second = h.pipeline.transition(owner, job.id, Transition::MarkRunning).await.unwrap();

    assert_eq!(first.status, JobStatus::Running);
    assert_eq!(second.status, JobStatus::Running);
    assert_eq!(first.title, second.title);
    assert_eq!(first.heading_counts, second.heading_counts);
    assert_eq!(first.internal_links, second.internal_links);
    assert_eq!(first.external_links, second.external_links);
    assert_eq!(first.inaccessible_links, second.inaccessible_links);
    assert_eq!(first.has_login_form, second.has_login_form);
}

#[tokio::test]
async fn test_transition_replaces_snapshot_with_fresh_analysis() {
    let h = default_harness();
    let owner = UserId::new();
    let job = create_job(&h, owner, HOME).await;

    h.fetcher.set_page(HOME, "<html><head><title>Rewritten</title></head><body></body></html>");
    let updated = h.pipeline.transition(owner, job.id, Transition::Enqueue).await.unwrap();

    assert_eq!(updated.title, "Rewritten");
    assert_eq!(updated.html_version, "Unknown");
    assert!(updated.heading_counts.0.is_empty());
    assert_eq!(updated.internal_links_count, 0);
    assert!(!updated.has_login_form);
    assert_counts_match(&updated);
    assert_eq!(updated.created_at, job.created_at);
    assert!(updated.updated_at >= job.updated_at);
}

#[tokio::test]
async fn test_finalize_without_pause_is_done() {
    let h = default_harness();
    let owner = UserId::new();
    let job = create_job(&h, owner, HOME).await;

    let done = h.pipeline.transition(owner, job.id, Transition::Finalize).await.unwrap();

    assert_eq!(done.status, JobStatus::Done);
    assert!(!done.pause_requested);
}

#[tokio::test]
async fn test_finalize_pause_wins() {
    let h = default_harness();
    let owner = UserId::new();
    let job = create_job(&h, owner, HOME).await;
    h.pipeline.transition(owner, job.id, Transition::MarkRunning).await.unwrap();

    let paused = h.pipeline.toggle_pause(owner, job.id).await.unwrap();
    assert!(paused.pause_requested);
    assert_eq!(paused.status, JobStatus::Running);

    h.fetcher.set_page(HOME, &page("Fresh"));
    let finalized = h.pipeline.transition(owner, job.id, Transition::Finalize).await.unwrap();

    assert_eq!(finalized.status, JobStatus::Queued);
    assert!(finalized.pause_requested);
    // The fresh snapshot is still stored.
    assert_eq!(finalized.title, "Fresh");
}

#[tokio::test]
async fn test_enqueue_clears_pause_request() {
    let h = default_harness();
    let owner = UserId::new();
    let job = create_job(&h, owner, HOME).await;
    h.pipeline.toggle_pause(owner, job.id).await.unwrap();

    let queued = h.pipeline.transition(owner, job.id, Transition::Enqueue).await.unwrap();

    assert_eq!(queued.status, JobStatus::Queued);
    assert!(!queued.pause_requested);
}

#[tokio::test]
async fn test_analysis_failure_marks_error_and_keeps_snapshot() {
    let h = default_harness();
    let owner = UserId::new();
    let job = create_job(&h, owner, HOME).await;

    h.fetcher.set_status(HOME, 500);
    let err = h.pipeline.transition(owner, job.id, Transition::MarkRunning).await.unwrap_err();

    match err {
        PipelineError::Analysis { job_id, source } => {
            assert_eq!(job_id, job.id);
            assert_eq!(source.url(), HOME);
        }
        other => panic!("Expected analysis failure, got {:?}", other),
    }

    let stored = h.store.find_job(job.id).await.unwrap().unwrap();
    assert_eq!(stored.status, JobStatus::Error);
    assert_eq!(stored.title, job.title);
    assert_eq!(stored.heading_counts, job.heading_counts);
    assert_eq!(stored.internal_links, job.internal_links);
    assert_eq!(stored.internal_links_count, job.internal_links_count);
    assert_eq!(stored.has_login_form, job.has_login_form);
}

#[tokio::test]
async fn test_errored_job_recovers_on_retry() {
    let h = default_harness();
    let owner = UserId::new();
    let job = create_job(&h, owner, HOME).await;

    h.fetcher.set_status(HOME, 502);
    assert!(h.pipeline.transition(owner, job.id, Transition::Finalize).await.is_err());

    h.fetcher.set_page(HOME, &page("Back"));
    let done = h.pipeline.transition(owner, job.id, Transition::Finalize).await.unwrap();
    assert_eq!(done.status, JobStatus::Done);
    assert_eq!(done.title, "Back");
}

//
// ownership
//

#[tokio::test]
async fn test_non_owner_cannot_touch_job() {
    let h = default_harness();
    let alice = UserId::new();
    let mallory = UserId::new();
    let job = create_job(&h, alice, HOME).await;
    let fetches_before = h.fetcher.fetched().len();

    for transition in [Transition::Enqueue, Transition::MarkRunning, Transition::Finalize] {
        let err = h.pipeline.transition(mallory, job.id, transition).await.unwrap_err();
        assert!(matches!(err, PipelineError::Forbidden(id) if id == job.id));
    }
    assert!(matches!(
        h.pipeline.toggle_pause(mallory, job.id).await,
        Err(PipelineError::Forbidden(_))
    ));
    assert!(matches!(
        h.pipeline.detail(mallory, job.id).await,
        Err(PipelineError::Forbidden(_))
    ));
    assert!(matches!(
        h.pipeline.delete(mallory, job.id).await,
        Err(PipelineError::Forbidden(_))
    ));

    // Rejected before any fetch, and nothing changed.
    assert_eq!(h.fetcher.fetched().len(), fetches_before);
    let stored = h.store.find_job(job.id).await.unwrap().unwrap();
    assert_eq!(stored, job);
}

#[tokio::test]
async fn test_unknown_job_is_not_found() {
    let h = default_harness();
    let id = Uuid::new_v4();

    assert!(matches!(
        h.pipeline.transition(UserId::new(), id, Transition::Enqueue).await,
        Err(PipelineError::NotFound(missing)) if missing == id
    ));
    assert!(matches!(
        h.pipeline.toggle_pause(UserId::new(), id).await,
        Err(PipelineError::NotFound(_))
    ));
}

//
// batches
//

#[tokio::test]
async fn test_batch_aborts_on_foreign_job() {
    let h = default_harness();
    let alice = UserId::new();
    let bob = UserId::new();
    let a = create_job(&h, alice, HOME).await;
    let b = create_job(&h, bob, BLOG).await;
    let c = create_job(&h, alice, SHOP).await;
    let fetches_before = h.fetcher.fetched().len();

    let aborted = h
        .pipeline
        .run_batch(alice, &[a.id, b.id, c.id], Transition::MarkRunning, FailurePolicy::Continue)
        .await
        .unwrap_err();

    assert!(matches!(aborted.error, PipelineError::Forbidden(id) if id == b.id));
    assert!(aborted.report.halted);
    assert_eq!(aborted.report.updated.len(), 1);
    assert_eq!(aborted.report.updated[0].id, a.id);

    // A committed, B and C untouched, C never fetched.
    assert_eq!(h.store.find_job(a.id).await.unwrap().unwrap().status, JobStatus::Running);
    assert_eq!(h.store.find_job(b.id).await.unwrap().unwrap(), b);
    assert_eq!(h.store.find_job(c.id).await.unwrap().unwrap(), c);
    assert_eq!(h.fetcher.fetched()[fetches_before..], [HOME.to_string()]);
}

#[tokio::test]
async fn test_batch_skips_unknown_ids() {
    let h = default_harness();
    let owner = UserId::new();
    let a = create_job(&h, owner, HOME).await;
    let b = create_job(&h, owner, BLOG).await;

    let report = h
        .pipeline
        .run_batch(owner, &[a.id, Uuid::new_v4(), b.id], Transition::Finalize, FailurePolicy::Abort)
        .await
        .unwrap();

    assert_eq!(report.updated.iter().map(|j| j.id).collect::<Vec<_>>(), vec![a.id, b.id]);
    assert!(report.updated.iter().all(|j| j.status == JobStatus::Done));
    assert!(report.failed.is_empty());
    assert!(!report.halted);
}

#[tokio::test]
async fn test_batch_abort_policy_stops_at_analysis_failure() {
    let h = default_harness();
    let owner = UserId::new();
    let a = create_job(&h, owner, HOME).await;
    let b = create_job(&h, owner, BLOG).await;
    let c = create_job(&h, owner, SHOP).await;
    h.fetcher.set_status(BLOG, 404);

    let report = h
        .pipeline
        .run_batch(owner, &[a.id, b.id, c.id], Transition::Enqueue, FailurePolicy::Abort)
        .await
        .unwrap();

    assert_eq!(report.updated.len(), 1);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].id, Some(b.id));
    assert_eq!(report.failed[0].url, BLOG);
    assert!(report.halted);
    assert_eq!(h.store.find_job(b.id).await.unwrap().unwrap().status, JobStatus::Error);
    assert_eq!(h.store.find_job(c.id).await.unwrap().unwrap(), c);
}

#[tokio::test]
async fn test_batch_continue_policy_processes_every_id() {
    let h = default_harness();
    let owner = UserId::new();
    let a = create_job(&h, owner, HOME).await;
    let b = create_job(&h, owner, BLOG).await;
    let c = create_job(&h, owner, SHOP).await;
    h.fetcher.set_status(BLOG, 404);

    let report = h
        .pipeline
        .run_batch(owner, &[a.id, b.id, c.id], Transition::MarkRunning, FailurePolicy::Continue)
        .await
        .unwrap();

    assert_eq!(report.updated.iter().map(|j| j.id).collect::<Vec<_>>(), vec![a.id, c.id]);
    assert_eq!(report.failed.len(), 1);
    assert!(!report.halted);
    assert_eq!(h.store.find_job(c.id).await.unwrap().unwrap().status, JobStatus::Running);
}

#[tokio::test]
async fn test_batch_store_failure_aborts() {
    let h = default_harness();
    let owner = UserId::new();
    let a = create_job(&h, owner, HOME).await;
    h.store.set_unavailable(true);

    let aborted = h
        .pipeline
        .run_batch(owner, &[a.id], Transition::Enqueue, FailurePolicy::Abort)
        .await
        .unwrap_err();

    assert!(matches!(aborted.error, PipelineError::Store(StoreError::Pool(_))));
    assert!(aborted.report.updated.is_empty());
}

//
// toggle / delete / list
//

#[tokio::test]
async fn test_toggle_pause_flips_without_fetching() {
    let h = default_harness();
    let owner = UserId::new();
    let job = create_job(&h, owner, HOME).await;
    let fetches_before = h.fetcher.fetched().len();

    let on = h.pipeline.toggle_pause(owner, job.id).await.unwrap();
    let off = h.pipeline.toggle_pause(owner, job.id).await.unwrap();

    assert!(on.pause_requested);
    assert!(!off.pause_requested);
    assert_eq!(on.status, job.status);
    assert_eq!(off.status, job.status);
    assert_eq!(h.fetcher.fetched().len(), fetches_before);
}

#[tokio::test]
async fn test_delete_any_status() {
    let h = default_harness();
    let owner = UserId::new();
    let job = create_job(&h, owner, HOME).await;
    h.pipeline.transition(owner, job.id, Transition::MarkRunning).await.unwrap();

    h.pipeline.delete(owner, job.id).await.unwrap();

    assert!(h.store.find_job(job.id).await.unwrap().is_none());
    assert!(matches!(
        h.pipeline.delete(owner, job.id).await,
        Err(PipelineError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_delete_many_only_deletes_own_jobs() {
    let h = default_harness();
    let alice = UserId::new();
    let bob = UserId::new();
    let a = create_job(&h, alice, HOME).await;
    let b = create_job(&h, alice, BLOG).await;
    let foreign = create_job(&h, bob, SHOP).await;

    let deleted = h.pipeline.delete_many(alice, &[a.id, b.id, foreign.id]).await.unwrap();

    assert_eq!(deleted, 2);
    assert!(h.pipeline.list(alice).await.unwrap().is_empty());
    assert_eq!(h.pipeline.list(bob).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_list_returns_summaries_in_creation_order() {
    let h = default_harness();
    let owner = UserId::new();
    let first = create_job(&h, owner, HOME).await;
    let second = create_job(&h, owner, BLOG).await;

    let listed = h.pipeline.list(owner).await.unwrap();

    assert_eq!(listed, vec![first.summary(), second.summary()]);
}
