//! Transaction structure
//! 
//! A transaction binds a human-readable file name to the hash of the file's
//! metadata. It is the only kind of transaction the chain carries.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use crate::constants::TX_HOP_LIMIT;
use crate::crypto::{finalize, Hash};

/// A name -> content hash binding
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Transaction {
    /// Name being claimed
    pub file_name: String,
    /// Fingerprint of the named content
    pub content_hash: Vec<u8>,
    /// File size in bytes
    pub size: i64,
    /// Remaining relay hops
    pub hop_limit: u32,
}

impl Transaction {
    /// Create a new publication with the default hop limit
    pub fn new(file_name: impl Into<String>, content_hash: Vec<u8>, size: i64) -> Self {
        Self {
            file_name: file_name.into(),
            content_hash,
            size,
            hop_limit: TX_HOP_LIMIT,
        }
    }

    /// Calculate transaction hash
    ///
    /// Covers the name (length-prefixed) and the content hash only. Size and
    /// hop limit are not part of the identity.
    pub fn hash(&self) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update((self.file_name.len() as u32).to_le_bytes());
        hasher.update(self.file_name.as_bytes());
        hasher.update(&self.content_hash);
        finalize(hasher)
    }

    /// Content hash as a fixed-size digest
    pub fn bound_hash(&self) -> Hash {
        Hash::from_slice(&self.content_hash)
    }
}
