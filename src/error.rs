/*!
 * Error types for the rchub binary
 */

use rchub_connect::{ConnectError, GatewayError};
use rchub_store::StoreError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Config file exists but could not be read
    #[error("Failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON config {path}: {source}")]
    ConfigJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid TOML config {path}: {source}")]
    ConfigToml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Logging could not be set up
    #[error("Logging error: {0}")]
    Logging(String),

    #[error(transparent)]
    Registry(#[from] ConnectError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
