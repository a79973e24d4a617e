//! Node module - The consensus actor and its request handle
//!
//! One task owns the chain state, the pending transactions and the mining
//! flag. Everything else talks to it through a [`ChainHandle`].

mod actor;
mod handle;
mod service;

pub use actor::*;
pub use handle::*;
pub use service::*;
