//! rchub Connect: talking to the rclone agents in the fleet
//!
//! This crate provides the client-side half of the hub: it knows which agents
//! exist and how to invoke a remote-control operation on one of them.
//!
//! # Architecture
//!
//! - **NodeRegistry**: immutable snapshots of the configured agents, swapped
//!   atomically on reload
//! - **RcClient**: the seam used by the hub to invoke an operation on an agent
//! - **HttpGateway**: the `RcClient` that POSTs JSON to `http://{ip}:{port}/rc/{path}`
//!
//! # Example
//!
//! ```rust,no_run
//! use rchub_connect::{paths, HttpGateway, Node, NodeRegistry, RcClient};
//!
//! async fn example() -> anyhow::Result<()> {
//!     let registry = NodeRegistry::new(vec![Node::new("home-nas", "100.64.0.7", 5572)])?;
//!     let gateway = HttpGateway::new()?;
//!
//!     let node = registry.lookup("home-nas").await?;
//!     let stats = gateway.call(&node, paths::CORE_STATS, None, None).await?;
//!     println!("{stats}");
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod gateway;
pub mod registry;

pub use error::{ConnectError, GatewayError};
pub use gateway::{paths, HttpGateway, RcClient, DEFAULT_RC_TIMEOUT, RC_PATH_PREFIX};
pub use registry::{Node, NodeRegistry, RegistrySnapshot};
