//! API endpoints module

pub mod jobs;
pub mod nodes;
pub mod stream;

pub use jobs::{create_job, get_job, stop_job, JobCreated};
pub use nodes::{list_nodes, list_remotes, RemotesQuery};
pub use stream::stream_stats;
