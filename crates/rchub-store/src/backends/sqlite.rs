//! SQLite backend implementation
//!
//! WAL journal mode, one statement per mutation, no explicit transactions:
//! every write is committed before the call returns.

use crate::error::{Result, StoreError};
use crate::{Job, JobStatus, JobStore, TransferFlags};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::str::FromStr;
use tracing::{debug, info};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS jobs (
    uid TEXT PRIMARY KEY NOT NULL,
    node TEXT NOT NULL,
    kind TEXT NOT NULL,
    src TEXT NOT NULL,
    dst TEXT NOT NULL,
    flags TEXT NOT NULL DEFAULT '{}',
    rc_jobid INTEGER,
    status TEXT NOT NULL DEFAULT 'running',
    bytes_done INTEGER NOT NULL DEFAULT 0,
    files_done INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL DEFAULT 0,
    updated_at INTEGER NOT NULL DEFAULT 0
)
"#;

/// SQLite-backed job store
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open or create a SQLite database at the specified path
    ///
    /// Creates the `jobs` table if it does not exist.
    pub async fn open(path: &str) -> Result<Self> {
        let db_url = if path.starts_with("sqlite:") {
            path.to_string()
        } else {
            format!("sqlite://{}", path)
        };

        let options = SqliteConnectOptions::from_str(&db_url)?
            .journal_mode(SqliteJournalMode::Wal)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        sqlx::query(SCHEMA).execute(&pool).await?;

        info!("Job store opened at {}", path);
        Ok(Self { pool })
    }

    /// Get the underlying pool (for advanced usage)
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn row_to_job(row: &SqliteRow) -> Result<Job> {
    let kind: String = row.try_get("kind")?;
    let status: String = row.try_get("status")?;
    let flags: String = row.try_get("flags")?;

    let flags: TransferFlags = if flags.is_empty() {
        TransferFlags::default()
    } else {
        serde_json::from_str(&flags)?
    };

    Ok(Job {
        uid: row.try_get("uid")?,
        node: row.try_get("node")?,
        kind: kind.parse()?,
        src: row.try_get("src")?,
        dst: row.try_get("dst")?,
        flags,
        rc_jobid: row.try_get("rc_jobid")?,
        status: JobStatus::from_str(&status)?,
        bytes_done: row.try_get("bytes_done")?,
        files_done: row.try_get("files_done")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl JobStore for SqliteStore {
    async fn upsert(&self, job: &Job) -> Result<()> {
        let flags = serde_json::to_string(&job.flags)?;

        sqlx::query(
            "INSERT INTO jobs (uid, node, kind, src, dst, flags, rc_jobid, status, bytes_done, files_done, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT (uid) DO UPDATE SET
                node = excluded.node,
                kind = excluded.kind,
                src = excluded.src,
                dst = excluded.dst,
                flags = excluded.flags,
                rc_jobid = excluded.rc_jobid,
                status = excluded.status,
                bytes_done = excluded.bytes_done,
                files_done = excluded.files_done,
                created_at = excluded.created_at,
                updated_at = excluded.updated_at",
        )
        .bind(&job.uid)
        .bind(&job.node)
        .bind(job.kind.as_str())
        .bind(&job.src)
        .bind(&job.dst)
        .bind(flags)
        .bind(job.rc_jobid)
        .bind(job.status.to_string())
        .bind(job.bytes_done)
        .bind(job.files_done)
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(&self.pool)
        .await?;

        debug!("Saved job {} ({})", job.uid, job.status);
        Ok(())
    }

    async fn get(&self, uid: &str) -> Result<Option<Job>> {
        let row = sqlx::query(
            "SELECT uid, node, kind, src, dst, flags, rc_jobid, status,
                    bytes_done, files_done, created_at, updated_at
             FROM jobs WHERE uid = ?",
        )
        .bind(uid)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_job).transpose()
    }

    async fn update_status(&self, uid: &str, status: JobStatus, updated_at: i64) -> Result<()> {
        let result = sqlx::query("UPDATE jobs SET status = ?, updated_at = ? WHERE uid = ?")
            .bind(status.to_string())
            .bind(updated_at)
            .bind(uid)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::JobNotFound(uid.to_string()));
        }

        debug!("Job {} is now {}", uid, status);
        Ok(())
    }
}
