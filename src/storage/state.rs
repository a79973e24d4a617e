//! Chain state management
//! 
//! Owns the block tree, the name ledger and the head pointer. The ledger is
//! kept equal to the bindings of the blocks between genesis and the head:
//! whenever the head moves to another branch the abandoned blocks are
//! reverted and the new ones applied, oldest first.

use std::collections::HashSet;
use tracing::{debug, info, warn};
use crate::consensus::{is_better_chain, Block, ChainLength};
use crate::crypto::Hash;
use super::{ChainError, ChainStore, NameLedger};

/// What a head switch did to the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Reorg {
    /// Blocks reverted from the old branch
    pub rewound: usize,
    /// Blocks applied from the new branch
    pub applied: usize,
}

/// What appending a block did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendOutcome {
    pub hash: Hash,
    /// False if the block was already stored (nothing changed)
    pub is_new: bool,
    /// Parent already had another child
    pub fork: bool,
    /// Parent missing, block parked as orphan
    pub orphaned: bool,
    /// Orphans attached below this block
    pub adopted: usize,
    /// Head switches caused by this append
    pub head_switches: usize,
    /// Total blocks rewound by those switches
    pub rewound: usize,
}

/// Complete chain state
#[derive(Debug, Default)]
pub struct ChainState {
    store: ChainStore,
    ledger: NameLedger,
    head: Hash,
}

impl ChainState {
    /// Create a state holding only genesis
    pub fn new() -> Self {
        Self {
            store: ChainStore::new(),
            ledger: NameLedger::new(),
            head: Hash::zero(),
        }
    }

    /// Hash of the current head
    pub fn head(&self) -> Hash {
        self.head
    }

    /// Length of the active chain
    pub fn head_length(&self) -> ChainLength {
        self.store.compute_length(&self.head)
    }

    pub fn store(&self) -> &ChainStore {
        &self.store
    }

    pub fn ledger(&self) -> &NameLedger {
        &self.ledger
    }

    /// Length of the chain ending at `hash`
    pub fn compute_length(&self, hash: &Hash) -> ChainLength {
        self.store.compute_length(hash)
    }

    /// Check if a name is bound on the active chain
    pub fn is_name_bound(&self, name: &str) -> bool {
        self.ledger.is_bound(name)
    }

    /// Add a block to the tree and follow the longest chain
    ///
    /// Appending a block that is already stored is a no-op.
    pub fn append_block(&mut self, block: Block) -> Result<AppendOutcome, ChainError> {
        let prev_hash = block.prev_hash;
        let mut outcome = AppendOutcome {
            hash: block.hash(),
            is_new: false,
            fork: false,
            orphaned: false,
            adopted: 0,
            head_switches: 0,
            rewound: 0,
        };
        let Some(inserted) = self.store.insert(block) else {
            debug!(hash = %outcome.hash.short(), "block already known, ignoring");
            return Ok(outcome);
        };
        let hash = inserted.hash;
        outcome.is_new = true;
        outcome.fork = inserted.fork;
        outcome.orphaned = inserted.orphaned;

        if inserted.fork {
            warn!(hash = %hash.short(), parent = %prev_hash.short(), "FORK-SHORTER");
        }
        if inserted.orphaned {
            debug!(hash = %hash.short(), parent = %prev_hash.short(), "parent unknown, block parked as orphan");
        }

        // The new block must join the active chain before any adopted descendants
        if let Some(reorg) = self.update_head(hash)? {
            outcome.head_switches += 1;
            outcome.rewound += reorg.rewound;
        }

        let adopted = self.store.adopt_orphans(&hash)?;
        if !adopted.is_empty() {
            outcome.adopted = adopted.len();
            debug!(hash = %hash.short(), adopted = adopted.len(), "orphans attached to their parent");
            for leaf in self.store.leaves_from(&hash) {
                if let Some(reorg) = self.update_head(leaf)? {
                    outcome.head_switches += 1;
                    outcome.rewound += reorg.rewound;
                }
            }
        }

        Ok(outcome)
    }

    /// Move the head to `candidate` if its chain is strictly longer
    ///
    /// Returns the reorg performed, or `None` if the head stayed.
    pub fn update_head(&mut self, candidate: Hash) -> Result<Option<Reorg>, ChainError> {
        let candidate_length = self.store.compute_length(&candidate);
        let head_length = self.head_length();
        if !is_better_chain(candidate_length, head_length) {
            return Ok(None);
        }

        // Everything on the candidate's branch, down to genesis
        let mut seen = HashSet::new();
        let mut current = candidate;
        while seen.insert(current) {
            if current.is_zero() {
                break;
            }
            match self.store.get(&current) {
                Some(node) => current = node.parent,
                None => break,
            }
        }

        // Unwind the old head until it meets the candidate's branch
        let mut rewound = 0;
        let mut current = self.head;
        while !seen.contains(&current) {
            let node = self.store.get(&current).ok_or(ChainError::MissingNode(current))?;
            let block = node.block.as_ref().ok_or(ChainError::MissingNode(current))?;
            self.ledger.revert_block(block)?;
            rewound += 1;
            current = node.parent;
        }
        let ancestor = current;

        // Replay the new branch, ancestor side first
        let mut branch = Vec::new();
        let mut current = candidate;
        while current != ancestor {
            let node = self.store.get(&current).ok_or(ChainError::MissingNode(current))?;
            branch.push(current);
            current = node.parent;
        }
        for hash in branch.iter().rev() {
            let block = self.store.block(hash).ok_or(ChainError::MissingNode(*hash))?;
            self.ledger.apply_block(block);
        }

        if rewound > 0 {
            info!(rewound, ancestor = %ancestor.short(), "FORK-LONGER rewind {} blocks", rewound);
        }
        debug!(
            head = %candidate.short(),
            length = %candidate_length,
            applied = branch.len(),
            "head updated"
        );
        self.head = candidate;

        Ok(Some(Reorg { rewound, applied: branch.len() }))
    }

    /// Hashes of the active chain, head first
    pub fn active_path(&self) -> Vec<Hash> {
        self.store.ancestors(self.head).map(|(hash, _)| hash).collect()
    }

    /// Diagnostic dump of the active chain, head first
    ///
    /// One `hash:parent:name,name` record per block, space separated.
    pub fn chain_to_string(&self) -> String {
        self.store
            .ancestors(self.head)
            .filter_map(|(hash, node)| {
                node.block.as_ref().map(|block| {
                    format!("{}:{}:{}", hash.short(), block.prev_hash.short(), block.names())
                })
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::Transaction;

    fn block(prev: Hash, tag: u8, names: &[&str]) -> Block {
        let txs = names
            .iter()
            .map(|n| Transaction::new(*n, n.as_bytes().to_vec(), 1))
            .collect();
        Block::new(prev, [tag; 32], txs)
    }

    #[test]
    fn test_genesis_initialization() {
        let state = ChainState::new();
        assert_eq!(state.head(), Hash::zero());
        assert_eq!(state.head_length(), ChainLength::GENESIS);
        assert!(state.ledger().is_empty());
        assert_eq!(state.chain_to_string(), "");
    }

    #[test]
    fn test_sequential_appends_extend_head() {
        let mut state = ChainState::new();
        let mut prev = Hash::zero();
        for i in 0..10u8 {
            let outcome = state.append_block(block(prev, i, &[])).unwrap();
            assert!(outcome.is_new);
            assert_eq!(outcome.head_switches, 1);
            assert_eq!(outcome.rewound, 0);
            prev = outcome.hash;
        }
        assert_eq!(state.head(), prev);
        assert_eq!(state.head_length(), ChainLength::new(10));
    }

    #[test]
    fn test_duplicate_append_has_no_effect() {
        let mut state = ChainState::new();
        let a = block(Hash::zero(), 1, &["x"]);
        state.append_block(a.clone()).unwrap();
        let again = state.append_block(a).unwrap();

        assert!(!again.is_new);
        assert_eq!(state.ledger().get("x").unwrap().active_count, 1);
        assert_eq!(state.store().block_count(), 1);
    }

    #[test]
    fn test_tie_keeps_incumbent() {
        let mut state = ChainState::new();
        let a = state.append_block(block(Hash::zero(), 1, &[])).unwrap().hash;
        let b1 = state.append_block(block(a, 2, &["one"])).unwrap();
        let b2 = state.append_block(block(a, 3, &["two"])).unwrap();

        assert_eq!(b1.head_switches, 1);
        assert!(b2.fork);
        assert_eq!(b2.head_switches, 0);
        assert_eq!(state.head(), b1.hash);
        assert!(state.is_name_bound("one"));
        assert!(!state.is_name_bound("two"));
    }

    #[test]
    fn test_longer_branch_reorganizes_ledger() {
        let mut state = ChainState::new();
        let a = state.append_block(block(Hash::zero(), 1, &["base"])).unwrap().hash;
        let b = state.append_block(block(a, 2, &["x"])).unwrap().hash;
        let c = state.append_block(block(a, 3, &[])).unwrap().hash;
        assert_eq!(state.head(), b);

        let d = state.append_block(block(c, 4, &["y"])).unwrap();
        assert_eq!(d.rewound, 1);
        assert_eq!(state.head(), d.hash);
        assert!(state.is_name_bound("y"));
        assert!(state.is_name_bound("base"));
        assert!(!state.is_name_bound("x"));
        assert_eq!(state.active_path(), vec![d.hash, c, a]);
    }

    #[test]
    fn test_orphan_chain_resolves_into_head() {
        let mut state = ChainState::new();
        let a = block(Hash::zero(), 1, &["a"]);
        let b = block(a.hash(), 2, &["b"]);
        let c = block(b.hash(), 3, &["c"]);

        let c_out = state.append_block(c.clone()).unwrap();
        assert!(c_out.orphaned);
        assert_eq!(state.compute_length(&c.hash()), ChainLength::UNKNOWN);
        let b_out = state.append_block(b.clone()).unwrap();
        assert!(b_out.orphaned);
        assert_eq!(state.head(), Hash::zero());
        assert!(state.ledger().is_empty());

        let a_out = state.append_block(a).unwrap();
        assert_eq!(a_out.adopted, 1);
        assert_eq!(state.head(), c.hash());
        assert_eq!(state.head_length(), ChainLength::new(3));
        assert_eq!(state.ledger().names(), vec!["a", "b", "c"]);
        assert_eq!(state.store().orphan_count(), 0);
    }

    #[test]
    fn test_orphan_subtree_picks_longest_leaf() {
        let mut state = ChainState::new();
        let a = block(Hash::zero(), 1, &[]);
        let short = block(a.hash(), 2, &["short"]);
        let long1 = block(a.hash(), 3, &[]);
        let long2 = block(long1.hash(), 4, &["long"]);

        state.append_block(short).unwrap();
        state.append_block(long2.clone()).unwrap();
        state.append_block(long1).unwrap();
        state.append_block(a).unwrap();

        assert_eq!(state.head(), long2.hash());
        assert!(state.is_name_bound("long"));
        assert!(!state.is_name_bound("short"));
    }

    #[test]
    fn test_chain_to_string() {
        let mut state = ChainState::new();
        let a = state.append_block(block(Hash::zero(), 1, &["f1", "f2"])).unwrap().hash;
        let b = state.append_block(block(a, 2, &[])).unwrap().hash;

        let dump = state.chain_to_string();
        assert_eq!(
            dump,
            format!(
                "{}:{}: {}:{}:f1,f2",
                b.short(),
                a.short(),
                a.short(),
                Hash::zero().short()
            )
        );
    }
}
