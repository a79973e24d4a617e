//! Relay between the gossip layer and the consensus actor
//! 
//! Every announce is treated at most once per content hash. Accepted
//! announces are committed to the chain and handed back for re-flooding.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::debug;
use crate::consensus::Block;
use crate::crypto::Hash;
use crate::node::{ChainHandle, NodeError};
use crate::validation::Transaction;
use super::{BlockAnnounce, GossipPacket, NamePublishAnnounce};

/// Set of announce keys already treated
#[derive(Debug, Default)]
pub struct BroadcastCache {
    seen: Mutex<HashSet<Hash>>,
}

impl BroadcastCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `key` as seen; true only the first time
    pub fn can_treat(&self, key: &Hash) -> bool {
        let mut seen = self.seen.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        seen.insert(*key)
    }

    pub fn len(&self) -> usize {
        self.seen.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Routes announces through admission and commit
#[derive(Debug, Clone)]
pub struct Relay {
    cache: Arc<BroadcastCache>,
    chain: ChainHandle,
}

impl Relay {
    pub fn new(chain: ChainHandle) -> Self {
        Self {
            cache: Arc::new(BroadcastCache::new()),
            chain,
        }
    }

    /// Handle an announce received from a peer
    ///
    /// Returns the envelope to forward, if it was accepted and has hops left.
    pub async fn receive(&self, packet: GossipPacket) -> Result<Option<GossipPacket>, NodeError> {
        let key = packet.key();
        if !self.cache.can_treat(&key) {
            debug!(key = %key.short(), command = packet.command(), "duplicate announce dropped");
            return Ok(None);
        }

        if !self.admit(&packet).await? {
            return Ok(None);
        }
        Ok(packet.next_hop())
    }

    /// Wrap a released local block for announcement
    pub fn announce(&self, block: Block) -> GossipPacket {
        let packet = GossipPacket::Block(BlockAnnounce::new(block));
        // Echoes coming back from peers are already known
        self.cache.can_treat(&packet.key());
        packet
    }

    /// Publish a name from this node
    ///
    /// Returns the announce to flood, or `None` if the name is taken.
    pub async fn publish_name(
        &self,
        name: impl Into<String>,
        content_hash: Vec<u8>,
        size: i64,
    ) -> Result<Option<GossipPacket>, NodeError> {
        let packet = GossipPacket::NamePublish(NamePublishAnnounce::new(Transaction::new(
            name,
            content_hash,
            size,
        )));
        self.cache.can_treat(&packet.key());

        if !self.admit(&packet).await? {
            return Ok(None);
        }
        Ok(Some(packet))
    }

    /// Admission check, then commit when accepted
    async fn admit(&self, packet: &GossipPacket) -> Result<bool, NodeError> {
        let accepted = match packet {
            GossipPacket::Block(announce) => {
                let accepted = self.chain.try_block(announce.block.clone()).await?;
                if accepted {
                    self.chain.add_block(announce.block.clone()).await?;
                }
                accepted
            }
            GossipPacket::NamePublish(announce) => {
                let accepted = self.chain.try_tx_publish(announce.transaction.clone()).await?;
                if accepted {
                    self.chain.add_tx_publish(announce.transaction.clone()).await?;
                }
                accepted
            }
        };
        if !accepted {
            debug!(key = %packet.key().short(), command = packet.command(), "announce rejected");
        }
        Ok(accepted)
    }
}
