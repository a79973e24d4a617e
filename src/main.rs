//! Namechain Node
//!
//! Runs the consensus actor, mines according to the configured policy and
//! logs every block released for announcement.
//!
//! Usage: `namechain-node [config.json]`

use namechain::config::NodeConfig;
use namechain::node::run_node;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => NodeConfig::from_file(&path)?,
        None => NodeConfig::default(),
    };

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "cannot listen for Ctrl-C");
        }
    };
    run_node(config, shutdown).await?;
    Ok(())
}
