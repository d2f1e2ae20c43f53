//! Error types for the job store

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    /// A kind or status string that does not map to a known value
    #[error("{0}")]
    InvalidValue(String),
}
