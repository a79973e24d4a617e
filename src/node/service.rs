//! Node service loop
//!
//! Runs a consensus actor, hands every released block to the relay for
//! announcement and stops when the shutdown future resolves.

use std::future::Future;
use tokio::task::JoinError;
use tracing::{debug, error, info};
use crate::config::NodeConfig;
use crate::p2p::Relay;
use super::{ChainStatus, ConsensusActor, NodeError};

/// Run a node until `shutdown` resolves
///
/// `shutdown` is polled for the whole run, including while a release is
/// being announced. Returns the chain status at shutdown.
pub async fn run_node<F>(config: NodeConfig, shutdown: F) -> Result<ChainStatus, NodeError>
where
    F: Future<Output = ()>,
{
    info!(
        mode = ?config.mining_mode,
        queue = config.channel_capacity,
        "starting namechain node"
    );

    let (chain, mut releases, mut actor) = ConsensusActor::spawn(config);
    let relay = Relay::new(chain.clone());
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            released = releases.recv() => {
                let Some(release) = released else {
                    return Err(actor_stopped((&mut actor).await));
                };
                let packet = relay.announce(release.block);
                let status = chain.status().await?;
                info!(
                    block = %packet.key().short(),
                    hops = packet.hop_limit(),
                    delay_ms = release.delay.as_millis() as u64,
                    head = %status.head.short(),
                    length = %status.length,
                    names = status.names,
                    "block released"
                );
            }
            result = &mut actor => return Err(actor_stopped(result)),
            _ = &mut shutdown => {
                info!("shutdown signal received, stopping node");
                break;
            }
        }
    }

    let status = chain.status().await?;
    debug!("CHAIN {}", chain.dump_chain().await?);

    // Dropping the last handles lets the actor drain and exit
    drop(relay);
    drop(chain);
    match actor.await {
        Ok(result) => result?,
        Err(e) => return Err(e.into()),
    }

    info!(
        head = %status.head.short(),
        length = %status.length,
        blocks = status.blocks,
        orphans = status.orphans,
        "node stopped"
    );
    Ok(status)
}

/// The actor only returns early on a fatal error
fn actor_stopped(result: Result<Result<(), NodeError>, JoinError>) -> NodeError {
    let e = match result {
        Ok(Ok(())) => NodeError::ChannelClosed,
        Ok(Err(e)) => e,
        Err(e) => e.into(),
    };
    error!(error = %e, "consensus actor failed");
    e
}
