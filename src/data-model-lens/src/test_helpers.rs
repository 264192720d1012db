//! Test utilities: an in-memory store, record builders and test database access.
//!
//! [`MemoryStore`] implements both persistence traits with the same observable
//! semantics as the Postgres store (uniqueness, cascading user deletion,
//! pause-flag resolution), so pipeline and route tests run without a database.
//! Tests against Postgres itself go through [`test_db_pool`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::db::{DbPool, connect_pool};
use crate::models::{
    HeadingCounts, JobRecord, JobStatus, JobSummary, LinkDetail, LinkList, PageSnapshot, StatusRule, User, UserId,
};
use crate::schema;
use crate::store::{JobStore, StoreError, UserStore};

#[derive(Default)]
pub struct MemoryStore {
    jobs: RwLock<HashMap<Uuid, JobRecord>>,
    users: RwLock<HashMap<UserId, User>>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail with [`StoreError::Pool`], as if the database went away.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Pool("store unavailable".to_string()));
        }
        Ok(())
    }

    /// Inserts or overwrites a job as-is. Bypasses uniqueness checks.
    pub async fn put_job(&self, job: JobRecord) {
        self.jobs.write().await.insert(job.id, job);
    }

    pub async fn job_count(&self) -> usize {
        self.jobs.read().await.len()
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn find_job(&self, id: Uuid) -> Result<Option<JobRecord>, StoreError> {
        self.check_available()?;
        Ok(self.jobs.read().await.get(&id).cloned())
    }

    async fn find_job_by_url(&self, owner: UserId, url: &str) -> Result<Option<JobRecord>, StoreError> {
        self.check_available()?;
        let jobs = self.jobs.read().await;
        Ok(jobs.values().find(|job| job.owner_id == owner && job.url == url).cloned())
    }

    async fn insert_job(&self, job: &JobRecord) -> Result<(), StoreError> {
        self.check_available()?;
        let mut jobs = self.jobs.write().await;
        if jobs.values().any(|j| j.owner_id == job.owner_id && j.url == job.url) || jobs.contains_key(&job.id) {
            return Err(StoreError::Conflict(format!("job for {} already exists", job.url)));
        }
        jobs.insert(job.id, job.clone());
        Ok(())
    }

    async fn commit_snapshot(
        &self,
        id: Uuid,
        snapshot: PageSnapshot,
        rule: StatusRule,
    ) -> Result<Option<JobRecord>, StoreError> {
        self.check_available()?;
        // Holding the write lock across read and write mirrors the row lock.
        let mut jobs = self.jobs.write().await;
        let Some(job) = jobs.get_mut(&id) else {
            return Ok(None);
        };
        let (status, pause_requested) = rule.resolve(job.pause_requested);
        job.apply_snapshot(snapshot, status, pause_requested, Utc::now());
        Ok(Some(job.clone()))
    }

    async fn mark_error(&self, id: Uuid) -> Result<Option<JobRecord>, StoreError> {
        self.check_available()?;
        let mut jobs = self.jobs.write().await;
        Ok(jobs.get_mut(&id).map(|job| {
            job.status = JobStatus::Error;
            job.updated_at = Utc::now();
            job.clone()
        }))
    }

    async fn toggle_pause(&self, id: Uuid) -> Result<Option<JobRecord>, StoreError> {
        self.check_available()?;
        let mut jobs = self.jobs.write().await;
        Ok(jobs.get_mut(&id).map(|job| {
            job.pause_requested = !job.pause_requested;
            job.clone()
        }))
    }

    async fn delete_job(&self, id: Uuid) -> Result<bool, StoreError> {
        self.check_available()?;
        Ok(self.jobs.write().await.remove(&id).is_some())
    }

    async fn delete_owned_jobs(&self, owner: UserId, ids: &[Uuid]) -> Result<usize, StoreError> {
        self.check_available()?;
        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|id, job| !(job.owner_id == owner && ids.contains(id)));
        Ok(before - jobs.len())
    }

    async fn list_jobs(&self, owner: UserId) -> Result<Vec<JobSummary>, StoreError> {
        self.check_available()?;
        let jobs = self.jobs.read().await;
        let mut owned: Vec<&JobRecord> = jobs.values().filter(|job| job.owner_id == owner).collect();
        owned.sort_by_key(|job| (job.created_at, job.id));
        Ok(owned.into_iter().map(JobRecord::summary).collect())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        self.check_available()?;
        let mut users = self.users.write().await;
        if users
            .values()
            .any(|u| u.username == user.username || u.email == user.email)
        {
            return Err(StoreError::Conflict(format!("user {} already exists", user.username)));
        }
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        self.check_available()?;
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_user_by_identifier(&self, identifier: &str) -> Result<Option<User>, StoreError> {
        self.check_available()?;
        let users = self.users.read().await;
        Ok(users.values().find(|user| user.matches_identifier(identifier)).cloned())
    }

    async fn delete_user(&self, id: UserId) -> Result<bool, StoreError> {
        self.check_available()?;
        let removed = self.users.write().await.remove(&id).is_some();
        if removed {
            self.jobs.write().await.retain(|_, job| job.owner_id != id);
        }
        Ok(removed)
    }
}

// =============================================================================
// Database Test Helpers
// =============================================================================

const SCHEMA_SQL: &str = include_str!("../migrations/2026-01-05-120000_create_users_and_jobs/up.sql");

/// A small pool on TEST_DATABASE_URL, or `None` when the variable is unset so
/// database tests can return early on machines without Postgres.
///
/// Creates the tables on first use if the database is empty. The database is
/// wiped by [`clean_test_db`], so never point this at one holding real data.
pub async fn test_db_pool() -> Option<DbPool> {
    use diesel::sql_types::Bool;
    use diesel_async::{RunQueryDsl, SimpleAsyncConnection};

    let database_url = std::env::var("TEST_DATABASE_URL").ok()?;

    let pool = connect_pool(&database_url, 4)
        .await
        .expect("Failed to create test database pool - is the test database running?");

    let mut conn = pool.get().await.expect("Failed to get database connection");
    let migrated: bool = diesel::select(diesel::dsl::sql::<Bool>("to_regclass('public.jobs') IS NOT NULL"))
        .get_result(&mut conn)
        .await
        .expect("Failed to inspect test database schema");
    if !migrated {
        conn.batch_execute(SCHEMA_SQL)
            .await
            .expect("Failed to create test database schema");
    }
    drop(conn);

    Some(pool)
}

/// Deletes every job and user.
pub async fn clean_test_db(pool: &DbPool) {
    use diesel_async::RunQueryDsl;

    let mut conn = pool.get().await.expect("Failed to get database connection");

    // Jobs first, they reference users
    diesel::delete(schema::jobs::table)
        .execute(&mut conn)
        .await
        .expect("Failed to clean jobs table");

    diesel::delete(schema::users::table)
        .execute(&mut conn)
        .await
        .expect("Failed to clean users table");
}

// =============================================================================
// Record builders
// =============================================================================

/// A snapshot with one of everything, titled `title`.
pub fn sample_snapshot(title: &str) -> PageSnapshot {
    let mut heading_counts = HeadingCounts::default();
    heading_counts.increment("h1");
    PageSnapshot {
        html_version: "HTML5".to_string(),
        title: title.to_string(),
        heading_counts,
        internal_links: LinkList(vec![LinkDetail::new("https://example.com/about", "About")]),
        external_links: LinkList(vec![LinkDetail::new("https://other.org/", "Other")]),
        inaccessible_links: LinkList::default(),
        has_login_form: false,
    }
}

/// Inserts a user with a placeholder password hash.
pub async fn create_test_user<S: UserStore + ?Sized>(store: &S, username: &str) -> User {
    let user = User::new(
        username.to_string(),
        format!("{}@example.com", username),
        "not-a-real-hash".to_string(),
    );
    store.insert_user(&user).await.expect("Failed to insert test user");
    user
}

/// Inserts a job for `owner` with the given status and a [`sample_snapshot`].
pub async fn create_test_job<S: JobStore + ?Sized>(store: &S, owner: UserId, url: &str, status: JobStatus) -> JobRecord {
    let mut job = JobRecord::new(owner, url.to_string(), sample_snapshot("Sample"));
    job.status = status;
    store.insert_job(&job).await.expect("Failed to insert test job");
    job
}
