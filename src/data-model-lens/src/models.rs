use chrono::{DateTime, Utc};
use diesel::deserialize::{self, FromSql, FromSqlRow};
use diesel::expression::AsExpression;
use diesel::pg::{Pg, PgValue};
use diesel::prelude::*;
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::{Jsonb, SqlType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use uuid::Uuid;

// SQL type definitions for custom enums
// Note: These types use snake_case to match PostgreSQL type names
#[allow(non_camel_case_types)]
#[derive(SqlType, diesel::query_builder::QueryId, Debug, Clone, Copy)]
#[diesel(postgres_type(name = "job_status"))]
pub struct Job_status;

// JobStatus enum
/// Lifecycle status of a submitted URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = Job_status)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Waiting for (re)analysis to be started.
    Queued,
    /// Analysis is being (re)performed.
    Running,
    /// Terminal success: a fresh snapshot is available.
    Done,
    /// Terminal failure: the last analysis attempt failed.
    Error,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Done => "done",
            JobStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ToSql<Job_status, Pg> for JobStatus {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<Job_status, Pg> for JobStatus {
    fn from_sql(bytes: PgValue) -> deserialize::Result<Self> {
        match bytes.as_bytes() {
            b"queued" => Ok(JobStatus::Queued),
            b"running" => Ok(JobStatus::Running),
            b"done" => Ok(JobStatus::Done),
            b"error" => Ok(JobStatus::Error),
            _ => Err("Unrecognized enum variant".into()),
        }
    }
}

/// How a successful analysis decides the job's next status and pause flag.
///
/// This is the single place where the lifecycle state machine is written down:
/// every store implementation resolves the outcome of an analysis through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusRule {
    /// Move to the given status and clear any pending pause request.
    Reset(JobStatus),
    /// Finalize: `done`, unless a pause was requested, in which case the job
    /// goes back to `queued` and keeps its pause request.
    PauseWins,
}

impl StatusRule {
    /// Resolves to `(status, pause_requested)` given the pause flag read at commit time.
    pub fn resolve(&self, pause_requested: bool) -> (JobStatus, bool) {
        match self {
            StatusRule::Reset(status) => (*status, false),
            StatusRule::PauseWins if pause_requested => (JobStatus::Queued, true),
            StatusRule::PauseWins => (JobStatus::Done, false),
        }
    }
}

/// Identifier of a registered user. Produced by identity verification and
/// threaded explicitly through every job operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = diesel::sql_types::Uuid)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new() -> Self {
        UserId(Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for UserId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(UserId)
    }
}

impl ToSql<diesel::sql_types::Uuid, Pg> for UserId {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        <Uuid as ToSql<diesel::sql_types::Uuid, Pg>>::to_sql(&self.0, out)
    }
}

impl FromSql<diesel::sql_types::Uuid, Pg> for UserId {
    fn from_sql(bytes: PgValue) -> deserialize::Result<Self> {
        <Uuid as FromSql<diesel::sql_types::Uuid, Pg>>::from_sql(bytes).map(UserId)
    }
}

/// A link found on an analyzed page: the (resolved) target and its anchor text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkDetail {
    pub url: String,
    /// Anchor text, whitespace-collapsed. Empty when the anchor has none.
    #[serde(default)]
    pub text: String,
}

impl LinkDetail {
    pub fn new(url: impl Into<String>, text: impl Into<String>) -> Self {
        LinkDetail {
            url: url.into(),
            text: text.into(),
        }
    }
}

/// Stores a serde type as a JSONB column: a version byte (1) followed by the JSON text.
macro_rules! jsonb_newtype {
    ($name:ident, $inner:ty) => {
        #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, AsExpression, FromSqlRow)]
        #[diesel(sql_type = Jsonb)]
        #[serde(transparent)]
        pub struct $name(pub $inner);

        impl ToSql<Jsonb, Pg> for $name {
            fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
                out.write_all(&[1])?;
                serde_json::to_writer(out, &self.0)?;
                Ok(IsNull::No)
            }
        }

        impl FromSql<Jsonb, Pg> for $name {
            fn from_sql(bytes: PgValue) -> deserialize::Result<Self> {
                match bytes.as_bytes().split_first() {
                    Some((&1, json)) => Ok($name(serde_json::from_slice(json)?)),
                    _ => Err("Unsupported JSONB encoding version".into()),
                }
            }
        }
    };
}

jsonb_newtype!(HeadingCounts, BTreeMap<String, u32>);
jsonb_newtype!(LinkList, Vec<LinkDetail>);

impl HeadingCounts {
    /// Counts one more occurrence of the heading level (e.g. "h2").
    pub fn increment(&mut self, level: &str) {
        *self.0.entry(level.to_string()).or_insert(0) += 1;
    }

    pub fn get(&self, level: &str) -> Option<u32> {
        self.0.get(level).copied()
    }
}

impl LinkList {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, link: LinkDetail) {
        self.0.push(link)
    }

    /// Length as stored in the denormalized count columns.
    pub fn count(&self) -> i32 {
        i32::try_from(self.0.len()).unwrap_or(i32::MAX)
    }
}

/// Everything a single page analysis produces.
///
/// Link counts are never stored separately here: they are always the lengths
/// of the link sequences, so the two cannot diverge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSnapshot {
    pub html_version: String,
    pub title: String,
    pub heading_counts: HeadingCounts,
    pub internal_links: LinkList,
    pub external_links: LinkList,
    pub inaccessible_links: LinkList,
    pub has_login_form: bool,
}

impl PageSnapshot {
    pub fn internal_links_count(&self) -> i32 {
        self.internal_links.count()
    }

    pub fn external_links_count(&self) -> i32 {
        self.external_links.count()
    }

    pub fn inaccessible_links_count(&self) -> i32 {
        self.inaccessible_links.count()
    }
}

// jobs table model (database representation)
/// The persisted state of one submitted URL's analysis lifecycle.
#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::jobs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct JobRecord {
    pub id: Uuid,
    pub owner_id: UserId,
    pub url: String,
    pub status: JobStatus,
    pub pause_requested: bool,
    pub title: String,
    pub html_version: String,
    pub heading_counts: HeadingCounts,
    pub internal_links: LinkList,
    pub external_links: LinkList,
    pub inaccessible_links: LinkList,
    pub internal_links_count: i32,
    pub external_links_count: i32,
    pub inaccessible_links_count: i32,
    pub has_login_form: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    /// A freshly created job: `queued`, no pause request, derived fields from `snapshot`.
    pub fn new(owner_id: UserId, url: String, snapshot: PageSnapshot) -> Self {
        let now = Utc::now();
        let mut job = JobRecord {
            id: Uuid::new_v4(),
            owner_id,
            url,
            status: JobStatus::Queued,
            pause_requested: false,
            title: String::new(),
            html_version: String::new(),
            heading_counts: HeadingCounts::default(),
            internal_links: LinkList::default(),
            external_links: LinkList::default(),
            inaccessible_links: LinkList::default(),
            internal_links_count: 0,
            external_links_count: 0,
            inaccessible_links_count: 0,
            has_login_form: false,
            created_at: now,
            updated_at: now,
        };
        job.apply_snapshot(snapshot, JobStatus::Queued, false, now);
        job
    }

    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.owner_id == user
    }

    /// Replaces every derived field at once, together with the lifecycle fields.
    pub fn apply_snapshot(&mut self, snapshot: PageSnapshot, status: JobStatus, pause_requested: bool, at: DateTime<Utc>) {
        let changes = SnapshotChangeset::new(snapshot, status, pause_requested, at);
        self.status = changes.status;
        self.pause_requested = changes.pause_requested;
        self.title = changes.title;
        self.html_version = changes.html_version;
        self.heading_counts = changes.heading_counts;
        self.internal_links = changes.internal_links;
        self.external_links = changes.external_links;
        self.inaccessible_links = changes.inaccessible_links;
        self.internal_links_count = changes.internal_links_count;
        self.external_links_count = changes.external_links_count;
        self.inaccessible_links_count = changes.inaccessible_links_count;
        self.has_login_form = changes.has_login_form;
        self.updated_at = changes.updated_at;
    }

    pub fn summary(&self) -> JobSummary {
        JobSummary {
            id: self.id,
            owner_id: self.owner_id,
            url: self.url.clone(),
            status: self.status,
            pause_requested: self.pause_requested,
            title: self.title.clone(),
            html_version: self.html_version.clone(),
            internal_links_count: self.internal_links_count,
            external_links_count: self.external_links_count,
            inaccessible_links_count: self.inaccessible_links_count,
            has_login_form: self.has_login_form,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// All columns written by a committed analysis. Built only from a [`PageSnapshot`],
/// so the count columns always match the link sequences.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = crate::schema::jobs)]
pub struct SnapshotChangeset {
    pub status: JobStatus,
    pub pause_requested: bool,
    pub title: String,
    pub html_version: String,
    pub heading_counts: HeadingCounts,
    pub internal_links: LinkList,
    pub external_links: LinkList,
    pub inaccessible_links: LinkList,
    pub internal_links_count: i32,
    pub external_links_count: i32,
    pub inaccessible_links_count: i32,
    pub has_login_form: bool,
    pub updated_at: DateTime<Utc>,
}

impl SnapshotChangeset {
    pub fn new(snapshot: PageSnapshot, status: JobStatus, pause_requested: bool, at: DateTime<Utc>) -> Self {
        SnapshotChangeset {
            status,
            pause_requested,
            internal_links_count: snapshot.internal_links_count(),
            external_links_count: snapshot.external_links_count(),
            inaccessible_links_count: snapshot.inaccessible_links_count(),
            title: snapshot.title,
            html_version: snapshot.html_version,
            heading_counts: snapshot.heading_counts,
            internal_links: snapshot.internal_links,
            external_links: snapshot.external_links,
            inaccessible_links: snapshot.inaccessible_links,
            has_login_form: snapshot.has_login_form,
            updated_at: at,
        }
    }
}

/// List projection of a job: everything except the link-detail sequences.
#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::jobs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct JobSummary {
    pub id: Uuid,
    pub owner_id: UserId,
    pub url: String,
    pub status: JobStatus,
    pub pause_requested: bool,
    pub title: String,
    pub html_version: String,
    pub internal_links_count: i32,
    pub external_links_count: i32,
    pub inaccessible_links_count: i32,
    pub has_login_form: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// users table model (database representation)
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Insertable)]
#[diesel(table_name = crate::schema::users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(username: String, email: String, password_hash: String) -> Self {
        User {
            id: UserId::new(),
            username,
            email,
            password_hash,
            created_at: Utc::now(),
        }
    }

    /// True if `identifier` is either this user's username or email.
    pub fn matches_identifier(&self, identifier: &str) -> bool {
        self.username == identifier || self.email == identifier
    }
}
