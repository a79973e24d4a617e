//! In-memory block tree
//! 
//! Every received block becomes a node keyed by its hash. Nodes point to
//! their parent and children by hash only. Blocks whose parent has not
//! arrived yet are remembered in the orphan table until it does.

use std::collections::{BTreeSet, HashMap};
use thiserror::Error;
use crate::consensus::{Block, ChainLength};
use crate::crypto::Hash;

/// Chain invariant violations
///
/// None of these can happen while a single owner drives the store, and
/// none can be recovered from locally.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChainError {
    #[error("Missing chain node: {0}")]
    MissingNode(Hash),
    #[error("Broken parent link: {child} does not point to {parent}")]
    BrokenLink { child: Hash, parent: Hash },
    #[error("Ledger underflow for name {0:?}")]
    LedgerUnderflow(String),
}

/// A node of the block tree
#[derive(Debug, Clone)]
pub struct ChainNode {
    /// Parent key (zero for genesis and its children)
    pub parent: Hash,
    /// Known children, ordered for deterministic walks
    pub children: BTreeSet<Hash>,
    /// The block itself; `None` only for genesis
    pub block: Option<Block>,
}

impl ChainNode {
    fn genesis() -> Self {
        Self {
            parent: Hash::zero(),
            children: BTreeSet::new(),
            block: None,
        }
    }
}

/// Result of linking a new block into the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inserted {
    pub hash: Hash,
    /// The parent already had a child (or pending orphan) before this one
    pub fork: bool,
    /// The parent is unknown; the block was parked as an orphan
    pub orphaned: bool,
}

/// Block tree with orphan table
#[derive(Debug)]
pub struct ChainStore {
    /// Node arena: hash -> node
    nodes: HashMap<Hash, ChainNode>,
    /// Missing parent -> children already received for it
    orphans: HashMap<Hash, BTreeSet<Hash>>,
}

impl Default for ChainStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ChainStore {
    /// Create a store holding only the genesis node
    pub fn new() -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(Hash::zero(), ChainNode::genesis());
        Self {
            nodes,
            orphans: HashMap::new(),
        }
    }

    /// Check if a node exists for this hash
    pub fn contains(&self, hash: &Hash) -> bool {
        self.nodes.contains_key(hash)
    }

    /// Get a node by hash
    pub fn get(&self, hash: &Hash) -> Option<&ChainNode> {
        self.nodes.get(hash)
    }

    /// Get a block by hash
    pub fn block(&self, hash: &Hash) -> Option<&Block> {
        self.nodes.get(hash).and_then(|node| node.block.as_ref())
    }

    /// Number of blocks stored (genesis excluded)
    pub fn block_count(&self) -> usize {
        self.nodes.len() - 1
    }

    /// Number of missing parents still awaited
    pub fn orphan_count(&self) -> usize {
        self.orphans.len()
    }

    /// Children parked under a missing parent
    pub fn orphans_of(&self, parent: &Hash) -> Option<&BTreeSet<Hash>> {
        self.orphans.get(parent)
    }

    /// Link a block into the tree
    ///
    /// Returns `None` if the block is already stored.
    pub fn insert(&mut self, block: Block) -> Option<Inserted> {
        let hash = block.hash();
        if self.nodes.contains_key(&hash) {
            return None;
        }
        let parent = block.prev_hash;

        let (fork, orphaned) = match self.nodes.get_mut(&parent) {
            Some(parent_node) => {
                let fork = !parent_node.children.is_empty();
                parent_node.children.insert(hash);
                (fork, false)
            }
            None => {
                let waiting = self.orphans.entry(parent).or_default();
                let fork = !waiting.is_empty();
                waiting.insert(hash);
                (fork, true)
            }
        };

        self.nodes.insert(
            hash,
            ChainNode {
                parent,
                children: BTreeSet::new(),
                block: Some(block),
            },
        );

        Some(Inserted { hash, fork, orphaned })
    }

    /// Attach the children that were waiting for `hash`
    ///
    /// Returns the attached children; empty if nobody was waiting.
    pub fn adopt_orphans(&mut self, hash: &Hash) -> Result<Vec<Hash>, ChainError> {
        let Some(waiting) = self.orphans.remove(hash) else {
            return Ok(Vec::new());
        };

        for child in &waiting {
            let node = self.nodes.get(child).ok_or(ChainError::MissingNode(*child))?;
            if node.parent != *hash {
                return Err(ChainError::BrokenLink { child: *child, parent: *hash });
            }
        }

        let node = self.nodes.get_mut(hash).ok_or(ChainError::MissingNode(*hash))?;
        node.children.extend(waiting.iter().copied());
        Ok(waiting.into_iter().collect())
    }

    /// Length of the chain ending at `hash`
    ///
    /// 0 for genesis, `ChainLength::UNKNOWN` if any ancestor is missing.
    pub fn compute_length(&self, hash: &Hash) -> ChainLength {
        let mut length = 0u64;
        let mut current = *hash;
        loop {
            if current.is_zero() {
                return ChainLength::new(length);
            }
            match self.nodes.get(&current) {
                Some(node) => {
                    length += 1;
                    current = node.parent;
                }
                None => return ChainLength::UNKNOWN,
            }
        }
    }

    /// Every leaf of the subtree rooted at `hash`
    pub fn leaves_from(&self, hash: &Hash) -> Vec<Hash> {
        let mut leaves = Vec::new();
        let mut stack = vec![*hash];
        while let Some(current) = stack.pop() {
            match self.nodes.get(&current) {
                Some(node) if !node.children.is_empty() => {
                    // Reverse so leaves come out in ascending hash order
                    stack.extend(node.children.iter().rev().copied());
                }
                Some(_) => leaves.push(current),
                None => {}
            }
        }
        leaves
    }

    /// Hashes from `hash` back towards genesis (genesis excluded)
    ///
    /// Stops early at the first unknown ancestor.
    pub fn ancestors(&self, hash: Hash) -> Ancestors<'_> {
        Ancestors { store: self, current: hash }
    }
}

/// Iterator over a chain, newest block first
pub struct Ancestors<'a> {
    store: &'a ChainStore,
    current: Hash,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = (Hash, &'a ChainNode);

    fn next(&mut self) -> Option<Self::Item> {
        if self.current.is_zero() {
            return None;
        }
        let hash = self.current;
        let node = self.store.nodes.get(&hash)?;
        self.current = node.parent;
        Some((hash, node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(prev: Hash, tag: u8) -> Block {
        Block::new(prev, [tag; 32], vec![])
    }

    #[test]
    fn test_new_store_has_genesis() {
        let store = ChainStore::new();
        assert!(store.contains(&Hash::zero()));
        assert_eq!(store.block_count(), 0);
        assert_eq!(store.compute_length(&Hash::zero()), ChainLength::GENESIS);
        assert!(store.block(&Hash::zero()).is_none());
    }

    #[test]
    fn test_linear_length() {
        let mut store = ChainStore::new();
        let mut prev = Hash::zero();
        for i in 0..5u8 {
            let b = block(prev, i);
            prev = store.insert(b).unwrap().hash;
        }
        assert_eq!(store.compute_length(&prev), ChainLength::new(5));
        assert_eq!(store.ancestors(prev).count(), 5);
    }

    #[test]
    fn test_duplicate_insert_ignored() {
        let mut store = ChainStore::new();
        let b = block(Hash::zero(), 1);
        assert!(store.insert(b.clone()).is_some());
        assert!(store.insert(b).is_none());
        assert_eq!(store.block_count(), 1);
    }

    #[test]
    fn test_fork_flag_on_second_child() {
        let mut store = ChainStore::new();
        let a = store.insert(block(Hash::zero(), 1)).unwrap();
        assert!(!a.fork);

        let b1 = store.insert(block(a.hash, 2)).unwrap();
        assert!(!b1.fork);
        let b2 = store.insert(block(a.hash, 3)).unwrap();
        assert!(b2.fork);
    }

    #[test]
    fn test_orphan_parked_and_adopted() {
        let mut store = ChainStore::new();
        let a = block(Hash::zero(), 1);
        let d = block(a.hash(), 2);

        let parked = store.insert(d.clone()).unwrap();
        assert!(parked.orphaned);
        assert!(!parked.fork);
        assert_eq!(store.compute_length(&d.hash()), ChainLength::UNKNOWN);
        assert!(store.orphans_of(&a.hash()).unwrap().contains(&d.hash()));

        // A sibling orphan counts as a fork
        let d2 = store.insert(block(a.hash(), 3)).unwrap();
        assert!(d2.fork);

        store.insert(a.clone()).unwrap();
        let adopted = store.adopt_orphans(&a.hash()).unwrap();
        assert_eq!(adopted.len(), 2);
        assert!(store.orphans_of(&a.hash()).is_none());
        assert_eq!(store.compute_length(&d.hash()), ChainLength::new(2));
        assert_eq!(store.get(&a.hash()).unwrap().children.len(), 2);
    }

    #[test]
    fn test_adopt_without_orphans() {
        let mut store = ChainStore::new();
        let a = store.insert(block(Hash::zero(), 1)).unwrap();
        assert!(store.adopt_orphans(&a.hash).unwrap().is_empty());
    }

    #[test]
    fn test_leaves_from() {
        let mut store = ChainStore::new();
        let a = store.insert(block(Hash::zero(), 1)).unwrap().hash;
        let b = store.insert(block(a, 2)).unwrap().hash;
        let c = store.insert(block(a, 3)).unwrap().hash;
        let d = store.insert(block(c, 4)).unwrap().hash;

        let mut leaves = store.leaves_from(&a);
        leaves.sort();
        let mut expected = vec![b, d];
        expected.sort();
        assert_eq!(leaves, expected);
        assert_eq!(store.leaves_from(&d), vec![d]);
    }

    #[test]
    fn test_ancestors_stop_at_unknown() {
        let mut store = ChainStore::new();
        let missing = block(Hash::zero(), 9).hash();
        let e = store.insert(block(missing, 1)).unwrap().hash;
        let f = store.insert(block(e, 2)).unwrap().hash;
        let walked: Vec<Hash> = store.ancestors(f).map(|(h, _)| h).collect();
        assert_eq!(walked, vec![f, e]);
    }
}
