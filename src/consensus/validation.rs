//! Block admission checks
//! 
//! Pure functions deciding whether a candidate block would be accepted.

use crate::consensus::Block;
use crate::crypto::Hash;
use crate::storage::ChainStore;
use thiserror::Error;

/// Validation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid proof of work")]
    InvalidPoW,
    #[error("Block already known: {0}")]
    AlreadyKnown(Hash),
}

/// Validate proof of work
pub fn validate_pow(block: &Block) -> Result<(), ValidationError> {
    if !block.is_valid() {
        return Err(ValidationError::InvalidPoW);
    }
    Ok(())
}

/// Validate a block against the local chain store
///
/// Accepts valid blocks whose hash is not stored yet. A missing parent is
/// not a rejection: such blocks are parked as orphans.
pub fn validate_block(block: &Block, store: &ChainStore) -> Result<(), ValidationError> {
    validate_pow(block)?;

    let hash = block.hash();
    if store.contains(&hash) {
        return Err(ValidationError::AlreadyKnown(hash));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mining::Miner;

    #[test]
    fn test_unmined_block_rejected() {
        // Find a nonce whose hash misses the target
        let mut nonce = [0u8; 32];
        let block = loop {
            let candidate = Block::new(Hash::zero(), nonce, vec![]);
            if !candidate.is_valid() {
                break candidate;
            }
            nonce[0] += 1;
        };
        assert_eq!(validate_pow(&block), Err(ValidationError::InvalidPoW));
        assert_eq!(
            validate_block(&block, &ChainStore::new()),
            Err(ValidationError::InvalidPoW)
        );
    }

    #[test]
    fn test_known_block_rejected() {
        let mined = Miner::new().mine(vec![], Hash::zero());
        let mut store = ChainStore::new();
        assert!(validate_block(&mined.block, &store).is_ok());

        store.insert(mined.block.clone());
        assert_eq!(
            validate_block(&mined.block, &store),
            Err(ValidationError::AlreadyKnown(mined.block.hash()))
        );
    }

    #[test]
    fn test_orphan_is_admissible() {
        let mined = Miner::new().mine(vec![], crate::crypto::hash_bytes(b"unknown parent"));
        assert!(validate_block(&mined.block, &ChainStore::new()).is_ok());
    }
}
