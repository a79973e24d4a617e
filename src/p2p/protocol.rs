//! Gossip envelopes
//! 
//! Blocks and name publications are flooded with a hop limit that every
//! relay decrements before forwarding.

use serde::{Deserialize, Serialize};
use crate::consensus::Block;
use crate::constants::BLOCK_HOP_LIMIT;
use crate::crypto::Hash;
use crate::validation::Transaction;

/// Announcement of a new block
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlockAnnounce {
    pub block: Block,
    pub hop_limit: u32,
}

impl BlockAnnounce {
    pub fn new(block: Block) -> Self {
        Self { block, hop_limit: BLOCK_HOP_LIMIT }
    }
}

/// Announcement of a name publication
///
/// The hop limit travels inside the transaction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NamePublishAnnounce {
    pub transaction: Transaction,
}

impl NamePublishAnnounce {
    pub fn new(transaction: Transaction) -> Self {
        Self { transaction }
    }
}

/// Any message flooded with a hop limit
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum GossipPacket {
    Block(BlockAnnounce),
    NamePublish(NamePublishAnnounce),
}

impl GossipPacket {
    /// Duplicate-suppression key (content hash of the payload)
    pub fn key(&self) -> Hash {
        match self {
            GossipPacket::Block(announce) => announce.block.hash(),
            GossipPacket::NamePublish(announce) => announce.transaction.hash(),
        }
    }

    pub fn hop_limit(&self) -> u32 {
        match self {
            GossipPacket::Block(announce) => announce.hop_limit,
            GossipPacket::NamePublish(announce) => announce.transaction.hop_limit,
        }
    }

    /// The envelope to forward, or `None` once the hop limit is spent
    pub fn next_hop(&self) -> Option<GossipPacket> {
        if self.hop_limit() <= 1 {
            return None;
        }
        let mut next = self.clone();
        match &mut next {
            GossipPacket::Block(announce) => announce.hop_limit -= 1,
            GossipPacket::NamePublish(announce) => announce.transaction.hop_limit -= 1,
        }
        Some(next)
    }

    /// Get the command name for this packet
    pub fn command(&self) -> &'static str {
        match self {
            GossipPacket::Block(_) => "block",
            GossipPacket::NamePublish(_) => "publish",
        }
    }
}
