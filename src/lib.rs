//! Namechain Core Library
//! 
//! A peer-to-peer ledger of file name -> content hash bindings secured by
//! proof-of-work. Every node keeps a tree of received blocks, follows the
//! longest chain and derives its name ledger from the active branch.

pub mod config;
pub mod consensus;
pub mod crypto;
pub mod validation;
pub mod storage;
pub mod p2p;
pub mod mining;
pub mod node;

/// Protocol constants - shared by every node on the network
pub mod constants {
    /// Number of leading zero bytes a block hash needs (16 bits of difficulty)
    pub const DIFFICULTY_ZERO_BYTES: usize = 2;

    /// Initial hop limit of a block announce
    pub const BLOCK_HOP_LIMIT: u32 = 20;

    /// Initial hop limit of a name publication
    pub const TX_HOP_LIMIT: u32 = 10;

    /// Release delay for blocks mined directly on genesis (seconds)
    pub const GENESIS_RELEASE_DELAY_SECS: u64 = 5;

    /// Release delay for other blocks, as a multiple of their mining time
    pub const RELEASE_DELAY_FACTOR: u32 = 2;

    /// Default depth of the consensus request queue
    pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

    /// Length of the nonce carried by every block
    pub const NONCE_LEN: usize = 32;
}
