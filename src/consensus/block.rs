//! Block structure for the name chain
//! 
//! A block is a parent hash, a 32-byte nonce and an ordered list of
//! name-binding transactions.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use crate::constants::{DIFFICULTY_ZERO_BYTES, NONCE_LEN};
use crate::crypto::{finalize, Hash};
use crate::validation::Transaction;

/// A complete block
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Block {
    /// Hash of the parent block (zero for a child of genesis)
    pub prev_hash: Hash,
    /// Proof-of-work nonce
    pub nonce: [u8; NONCE_LEN],
    /// Name bindings carried by this block
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Create a new block
    pub fn new(prev_hash: Hash, nonce: [u8; NONCE_LEN], transactions: Vec<Transaction>) -> Self {
        Self { prev_hash, nonce, transactions }
    }

    /// Calculate the block hash
    ///
    /// Covers the parent hash, the nonce, the transaction count and every
    /// transaction hash in order.
    pub fn hash(&self) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update(self.prev_hash.0);
        hasher.update(self.nonce);
        hasher.update((self.transactions.len() as u32).to_le_bytes());
        for tx in &self.transactions {
            hasher.update(tx.hash().0);
        }
        finalize(hasher)
    }

    /// Check if this block extends genesis directly
    pub fn extends_genesis(&self) -> bool {
        self.prev_hash.is_zero()
    }

    /// Check the proof of work (first two hash bytes are zero)
    pub fn is_valid(&self) -> bool {
        meets_difficulty(&self.hash())
    }

    /// Names bound by this block, comma separated
    pub fn names(&self) -> String {
        self.transactions
            .iter()
            .map(|tx| tx.file_name.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Whether a block hash satisfies the fixed difficulty target
pub fn meets_difficulty(hash: &Hash) -> bool {
    hash.0[..DIFFICULTY_ZERO_BYTES].iter().all(|b| *b == 0)
}
