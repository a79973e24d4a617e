//! Name ledger
//! 
//! Derived index from file name to bound content hash. Each entry counts
//! how many blocks of the active chain bind the name; the name is free
//! again once that count drops to zero.

use std::collections::{BTreeMap, HashMap};
use serde::{Deserialize, Serialize};
use crate::consensus::Block;
use crate::crypto::Hash;
use super::ChainError;

/// A bound name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Content hash of the first active binding
    pub bound_hash: Hash,
    /// Active-chain blocks binding this name
    pub active_count: usize,
}

/// Reference-counted name index
#[derive(Debug, Default)]
pub struct NameLedger {
    entries: HashMap<String, LedgerEntry>,
}

/// Distinct names bound by a block, with the first content hash seen for each
fn block_bindings(block: &Block) -> BTreeMap<&str, Hash> {
    let mut bindings = BTreeMap::new();
    for tx in &block.transactions {
        bindings
            .entry(tx.file_name.as_str())
            .or_insert_with(|| tx.bound_hash());
    }
    bindings
}

impl NameLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Check if a name is bound on the active chain
    pub fn is_bound(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Get the entry for a name
    pub fn get(&self, name: &str) -> Option<&LedgerEntry> {
        self.entries.get(name)
    }

    /// Content hash bound to a name
    pub fn resolve(&self, name: &str) -> Option<Hash> {
        self.entries.get(name).map(|entry| entry.bound_hash)
    }

    /// Commit the bindings of a block joining the active chain
    pub fn apply_block(&mut self, block: &Block) {
        for (name, hash) in block_bindings(block) {
            self.entries
                .entry(name.to_string())
                .or_insert(LedgerEntry {
                    bound_hash: hash,
                    active_count: 0,
                })
                .active_count += 1;
        }
    }

    /// Undo the bindings of a block leaving the active chain
    ///
    /// Exact inverse of `apply_block`.
    pub fn revert_block(&mut self, block: &Block) -> Result<(), ChainError> {
        for name in block_bindings(block).into_keys() {
            let entry = self
                .entries
                .get_mut(name)
                .ok_or_else(|| ChainError::LedgerUnderflow(name.to_string()))?;
            entry.active_count -= 1;
            if entry.active_count == 0 {
                self.entries.remove(name);
            }
        }
        Ok(())
    }

    /// Bound names in lexical order
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of bound names
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
