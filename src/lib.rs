/*!
 * rchub - control plane for a fleet of rclone agents
 *
 * Wraps the remote-control API of many rclone instances behind one HTTP API:
 * - copy / move / sync jobs dispatched to a named node
 * - idempotent submission via the `Idempotency-Key` header
 * - durable job records in SQLite
 * - a live NDJSON stream of per-node transfer stats
 *
 * The heavy lifting lives in the `rchub-connect`, `rchub-store` and
 * `rchub-server` crates; this crate loads configuration, sets up logging and
 * wires everything together.
 */

pub mod config;
pub mod error;
pub mod hub;
pub mod logging;

// Re-export commonly used types
pub use config::HubConfig;
pub use error::{Error, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
