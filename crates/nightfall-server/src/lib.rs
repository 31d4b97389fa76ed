//! Nightfall Server - HTTP front end for the game engine
//!
//! A single-process game node. It owns an in-memory engine and exposes
//! the full game surface over HTTP: joining, chat, voting, and the
//! phase clock that clients poll continuously.
//!
//! # Architecture
//!
//! - **Node**: Configuration from `NIGHTFALL_*` env vars and process lifecycle
//! - **API**: HTTP endpoints for joining, chat, votes, and the phase clock
//! - **Names**: Pseudonym generation for joining agents
//!
//! # Example
//!
//! ```no_run
//! use nightfall_server::{NightfallConfig, NightfallNode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = NightfallConfig::default();
//!     let node = NightfallNode::new(config)?;
//!     node.run().await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod error;
pub mod names;
pub mod node;

pub use error::{Error, Result};
pub use node::{NightfallConfig, NightfallNode, NodeState};
