//! Mining module - Proof-of-work search and mining policy

mod miner;

pub use miner::*;
