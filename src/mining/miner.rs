//! Block miner implementation
//! 
//! Draws random nonces until the block hash meets the difficulty target.
//! The search has no stop signal: it runs until it succeeds, so the caller
//! must keep it off the consensus task.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::info;
use crate::consensus::Block;
use crate::constants::NONCE_LEN;
use crate::crypto::Hash;
use crate::validation::Transaction;

/// When the node starts a mining task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MiningMode {
    /// Mine only while there are unbound transactions waiting
    Opportunistic,
    /// Always keep one task running, even over an empty block
    #[default]
    Continuous,
}

impl MiningMode {
    /// Whether a new task should start given the transactions available
    pub fn should_mine(&self, available: &[Transaction]) -> bool {
        match self {
            MiningMode::Opportunistic => !available.is_empty(),
            MiningMode::Continuous => true,
        }
    }
}

/// A successfully mined block
#[derive(Debug, Clone)]
pub struct MinedBlock {
    pub block: Block,
    /// Wall-clock time spent searching
    pub elapsed: Duration,
    /// Nonces tried
    pub attempts: u64,
}

/// Block miner
#[derive(Debug, Clone, Copy, Default)]
pub struct Miner;

impl Miner {
    /// Create a new miner
    pub fn new() -> Self {
        Self
    }

    /// Mine a block on top of `prev_hash`
    ///
    /// Blocks the calling thread until a valid nonce is found.
    pub fn mine(&self, transactions: Vec<Transaction>, prev_hash: Hash) -> MinedBlock {
        let start = Instant::now();
        let mut rng = rand::thread_rng();
        let mut block = Block::new(prev_hash, [0u8; NONCE_LEN], transactions);
        let mut attempts = 0u64;

        loop {
            rng.fill_bytes(&mut block.nonce);
            attempts += 1;

            if block.is_valid() {
                let elapsed = start.elapsed();
                info!(
                    hash = %block.hash().short(),
                    parent = %prev_hash.short(),
                    attempts,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "FOUND-BLOCK"
                );
                return MinedBlock { block, elapsed, attempts };
            }
        }
    }
}
