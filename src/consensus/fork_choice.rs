//! Longest-chain fork choice
//! 
//! Chain lengths are counted in blocks from genesis. A chain whose ancestry
//! is not fully known yet has the `UNKNOWN` length, which never beats a
//! real chain.

use std::fmt;

/// Number of blocks between genesis and a chain node
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChainLength(i64);

impl ChainLength {
    /// Length of the genesis node
    pub const GENESIS: ChainLength = ChainLength(0);

    /// Sentinel for chains with a missing ancestor; shorter than any real chain
    pub const UNKNOWN: ChainLength = ChainLength(i64::MIN);

    pub fn new(blocks: u64) -> Self {
        ChainLength(blocks.min(i64::MAX as u64) as i64)
    }

    pub fn is_known(&self) -> bool {
        *self != Self::UNKNOWN
    }

    /// Block count, `None` for the sentinel
    pub fn blocks(&self) -> Option<u64> {
        self.is_known().then_some(self.0 as u64)
    }
}

impl fmt::Display for ChainLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.blocks() {
            Some(n) => write!(f, "{}", n),
            None => write!(f, "unknown"),
        }
    }
}

/// Whether a candidate should replace the current head
///
/// Only a strictly longer chain wins; on a tie the incumbent stays.
pub fn is_better_chain(candidate: ChainLength, head: ChainLength) -> bool {
    candidate.is_known() && candidate > head
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_is_shortest() {
        assert!(ChainLength::UNKNOWN < ChainLength::GENESIS);
        assert!(ChainLength::UNKNOWN < ChainLength::new(1));
        assert!(!ChainLength::UNKNOWN.is_known());
        assert_eq!(ChainLength::UNKNOWN.blocks(), None);
    }

    #[test]
    fn test_strictly_longer_wins() {
        let two = ChainLength::new(2);
        let three = ChainLength::new(3);
        assert!(is_better_chain(three, two));
        assert!(!is_better_chain(two, two));
        assert!(!is_better_chain(two, three));
    }

    #[test]
    fn test_unknown_never_wins() {
        assert!(!is_better_chain(ChainLength::UNKNOWN, ChainLength::GENESIS));
        assert!(!is_better_chain(ChainLength::UNKNOWN, ChainLength::UNKNOWN));
    }

    #[test]
    fn test_display() {
        assert_eq!(ChainLength::new(7).to_string(), "7");
        assert_eq!(ChainLength::UNKNOWN.to_string(), "unknown");
    }
}
