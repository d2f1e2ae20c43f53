//! rchub Store: durable records of dispatched transfer jobs
//!
//! # Overview
//!
//! Every copy/move/sync the hub hands to an agent becomes one [`Job`] row,
//! keyed by its caller-visible id. Records survive restarts; nothing here ever
//! deletes one.
//!
//! # Example
//!
//! ```no_run
//! use rchub_store::{Job, JobKind, JobStatus, JobStore, TransferFlags};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = rchub_store::open("hub.db").await?;
//!
//!     let job = Job::new(
//!         "7f1d9c1e".to_string(),
//!         "home-nas".to_string(),
//!         JobKind::Copy,
//!         "local:/tmp/a".to_string(),
//!         "remote:/backup/a".to_string(),
//!         TransferFlags::default(),
//!         Some(42),
//!         1_700_000_000,
//!     );
//!     store.upsert(&job).await?;
//!
//!     store.update_status("7f1d9c1e", JobStatus::Stopped, 1_700_000_060).await?;
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod backends;
pub mod error;
pub mod flags;

pub use backends::sqlite::SqliteStore;
pub use error::{Result, StoreError};
pub use flags::{BwLimit, TransferFlags};

/// Kind of transfer operation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Copy,
    Move,
    Sync,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Copy => "copy",
            JobKind::Move => "move",
            JobKind::Sync => "sync",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobKind {
    type Err = StoreError;

    /// Case-sensitive: the API only accepts the lowercase names
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "copy" => Ok(JobKind::Copy),
            "move" => Ok(JobKind::Move),
            "sync" => Ok(JobKind::Sync),
            _ => Err(StoreError::InvalidValue(format!("Unsupported job type: {}", s))),
        }
    }
}

/// Last known state of a job
///
/// `Running -> Stopped` is the only transition the hub performs. Jobs that
/// finish on the agent on their own are not detected and stay `Running`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Running,
    Stopped,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Running => write!(f, "running"),
            JobStatus::Stopped => write!(f, "stopped"),
        }
    }
}

impl std::str::FromStr for JobStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "running" => Ok(JobStatus::Running),
            "stopped" => Ok(JobStatus::Stopped),
            _ => Err(StoreError::InvalidValue(format!("Invalid job status: {}", s))),
        }
    }
}

/// A dispatched transfer operation
///
/// Serializes to the shape returned by `GET /v1/jobs/{uid}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    /// Caller-visible id (generated, or the idempotency key)
    pub uid: String,
    /// Node the operation was dispatched to
    pub node: String,
    pub kind: JobKind,
    pub src: String,
    pub dst: String,
    /// Whitelisted flags forwarded to the agent
    pub flags: TransferFlags,
    /// Job handle assigned by the agent
    pub rc_jobid: Option<i64>,
    pub status: JobStatus,
    /// Never updated after creation
    #[serde(rename = "bytesDone")]
    pub bytes_done: i64,
    /// Never updated after creation
    #[serde(rename = "filesDone")]
    pub files_done: i64,
    /// Unix epoch seconds
    #[serde(rename = "createdAt")]
    pub created_at: i64,
    /// Unix epoch seconds
    #[serde(rename = "updatedAt")]
    pub updated_at: i64,
}

impl Job {
    /// Create a freshly dispatched job: `Running`, zero progress
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        uid: String,
        node: String,
        kind: JobKind,
        src: String,
        dst: String,
        flags: TransferFlags,
        rc_jobid: Option<i64>,
        now: i64,
    ) -> Self {
        Self {
            uid,
            node,
            kind,
            src,
            dst,
            flags,
            rc_jobid,
            status: JobStatus::Running,
            bytes_done: 0,
            files_done: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == JobStatus::Running
    }
}

/// Core trait for durable job storage
///
/// Every mutation must be visible to the next read from any caller and must
/// survive a restart. Concurrent writers to one record are last-writer-wins.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert or replace a job keyed by its uid
    async fn upsert(&self, job: &Job) -> Result<()>;

    /// Fetch a job by uid
    async fn get(&self, uid: &str) -> Result<Option<Job>>;

    /// Fetch the job created under an idempotency key
    ///
    /// The key becomes the job's uid, so this is a plain uid lookup.
    async fn find_by_idempotency_key(&self, key: &str) -> Result<Option<Job>> {
        self.get(key).await
    }

    /// Set a job's status and last-update timestamp
    ///
    /// Returns `StoreError::JobNotFound` if no such job exists.
    async fn update_status(&self, uid: &str, status: JobStatus, updated_at: i64) -> Result<()>;
}

/// Open the default (SQLite) job store at the specified path
pub async fn open(path: &str) -> Result<Box<dyn JobStore>> {
    let store = SqliteStore::open(path).await?;
    Ok(Box::new(store))
}
