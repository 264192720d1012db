use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};
use uuid::Uuid;

use crate::db::DbPool;
use crate::models::{JobRecord, JobStatus, JobSummary, PageSnapshot, SnapshotChangeset, StatusRule, User, UserId};
use crate::schema::{jobs, users};
use crate::store::{JobStore, StoreError, UserStore};

/// Postgres-backed store. Cheap to clone: clones share the connection pool.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for PgStore {
    async fn find_job(&self, id: Uuid) -> Result<Option<JobRecord>, StoreError> {
        let mut conn = self.pool.get().await?;
        let job = jobs::table
            .find(id)
            .select(JobRecord::as_select())
            .first(&mut conn)
            .await
            .optional()?;
        Ok(job)
    }

    async fn find_job_by_url(&self, owner: UserId, url: &str) -> Result<Option<JobRecord>, StoreError> {
        let mut conn = self.pool.get().await?;
        let job = jobs::table
            .filter(jobs::owner_id.eq(owner))
            .filter(jobs::url.eq(url))
            .select(JobRecord::as_select())
            .first(&mut conn)
            .await
            .optional()?;
        Ok(job)
    }

    async fn insert_job(&self, job: &JobRecord) -> Result<(), StoreError> {
        let mut conn = self.pool.get().await?;
        diesel::insert_into(jobs::table).values(job).execute(&mut conn).await?;
        Ok(())
    }

    async fn commit_snapshot(
        &self,
        id: Uuid,
        snapshot: PageSnapshot,
        rule: StatusRule,
    ) -> Result<Option<JobRecord>, StoreError> {
        let mut conn = self.pool.get().await?;
        conn.transaction::<_, StoreError, _>(move |conn| {
            async move {
                // Lock the row so a concurrent pause toggle lands either before our read or after our write.
                let pause_requested: Option<bool> = jobs::table
                    .find(id)
                    .select(jobs::pause_requested)
                    .for_update()
                    .first(conn)
                    .await
                    .optional()?;

                let Some(pause_requested) = pause_requested else {
                    return Ok(None);
                };

                let (status, pause_requested) = rule.resolve(pause_requested);
                let changes = SnapshotChangeset::new(snapshot, status, pause_requested, Utc::now());

                let job = diesel::update(jobs::table.find(id))
                    .set(&changes)
                    .returning(JobRecord::as_returning())
                    .get_result(conn)
                    .await?;

                Ok(Some(job))
            }
            .scope_boxed()
        })
        .await
    }

    async fn mark_error(&self, id: Uuid) -> Result<Option<JobRecord>, StoreError> {
        let mut conn = self.pool.get().await?;
        let job = diesel::update(jobs::table.find(id))
            .set((jobs::status.eq(JobStatus::Error), jobs::updated_at.eq(Utc::now())))
            .returning(JobRecord::as_returning())
            .get_result(&mut conn)
            .await
            .optional()?;
        Ok(job)
    }

    async fn toggle_pause(&self, id: Uuid) -> Result<Option<JobRecord>, StoreError> {
        let mut conn = self.pool.get().await?;
        let job = diesel::update(jobs::table.find(id))
            .set(jobs::pause_requested.eq(diesel::dsl::not(jobs::pause_requested)))
            .returning(JobRecord::as_returning())
            .get_result(&mut conn)
            .await
            .optional()?;
        Ok(job)
    }

    async fn delete_job(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut conn = self.pool.get().await?;
        let deleted = diesel::delete(jobs::table.find(id)).execute(&mut conn).await?;
        Ok(deleted > 0)
    }

    async fn delete_owned_jobs(&self, owner: UserId, ids: &[Uuid]) -> Result<usize, StoreError> {
        let mut conn = self.pool.get().await?;
        let deleted = diesel::delete(
            jobs::table
                .filter(jobs::owner_id.eq(owner))
                .filter(jobs::id.eq_any(ids.to_vec())),
        )
        .execute(&mut conn)
        .await?;
        Ok(deleted)
    }

    async fn list_jobs(&self, owner: UserId) -> Result<Vec<JobSummary>, StoreError> {
        let mut conn = self.pool.get().await?;
        let summaries = jobs::table
            .filter(jobs::owner_id.eq(owner))
            .order((jobs::created_at.asc(), jobs::id.asc()))
            .select(JobSummary::as_select())
            .load(&mut conn)
            .await?;
        Ok(summaries)
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        let mut conn = self.pool.get().await?;
        diesel::insert_into(users::table).values(user).execute(&mut conn).await?;
        Ok(())
    }

    async fn find_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let mut conn = self.pool.get().await?;
        let user = users::table
            .find(id)
            .select(User::as_select())
            .first(&mut conn)
            .await
            .optional()?;
        Ok(user)
    }

    async fn find_user_by_identifier(&self, identifier: &str) -> Result<Option<User>, StoreError> {
        let mut conn = self.pool.get().await?;
        let user = users::table
            .filter(users::username.eq(identifier).or(users::email.eq(identifier)))
            .select(User::as_select())
            .first(&mut conn)
            .await
            .optional()?;
        Ok(user)
    }

    async fn delete_user(&self, id: UserId) -> Result<bool, StoreError> {
        let mut conn = self.pool.get().await?;
        // jobs.owner_id is ON DELETE CASCADE
        let deleted = diesel::delete(users::table.find(id)).execute(&mut conn).await?;
        Ok(deleted > 0)
    }
}
