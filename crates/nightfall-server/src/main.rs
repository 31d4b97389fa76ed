//! Nightfall Node binary
//!
//! Serves one in-memory game engine over HTTP.

use nightfall_server::{NightfallConfig, NightfallNode};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nightfall_node=info,nightfall=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Nightfall Node");

    // Load config (TODO: from args/file)
    let config = NightfallConfig::default();

    // Create and run node
    let node = NightfallNode::new(config)?;
    node.run().await?;

    Ok(())
}
